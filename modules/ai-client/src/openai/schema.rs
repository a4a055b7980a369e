use schemars::{schema_for, JsonSchema};
use serde_json::Value;

/// Types whose JSON shape can be handed to a model as a response contract.
///
/// Implemented for any `JsonSchema`. The generated schema
/// is self-contained: `$ref`s are inlined, every object is closed with
/// `additionalProperties: false` and lists all of its properties as required.
pub trait StructuredOutput: JsonSchema {
    fn openai_schema() -> Value {
        let mut root = serde_json::to_value(schema_for!(Self)).unwrap_or_default();
        let definitions = match &mut root {
            Value::Object(map) => {
                map.remove("$schema");
                map.remove("definitions").unwrap_or(Value::Null)
            }
            _ => Value::Null,
        };
        close_objects(&mut root, &definitions);
        root
    }
}

impl<T: JsonSchema> StructuredOutput for T {}

fn close_objects(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(path)) = map.get("$ref") {
                let target = path
                    .strip_prefix("#/definitions/")
                    .and_then(|name| definitions.get(name))
                    .cloned();
                if let Some(def) = target {
                    *value = def;
                    close_objects(value, definitions);
                    return;
                }
            }

            if let Some(Value::Array(all_of)) = map.get("allOf") {
                if let [single] = all_of.as_slice() {
                    *value = single.clone();
                    close_objects(value, definitions);
                    return;
                }
            }

            if map.get("type").and_then(Value::as_str) == Some("object") {
                map.insert("additionalProperties".into(), Value::Bool(false));
                let keys: Vec<Value> = map
                    .get("properties")
                    .and_then(Value::as_object)
                    .map(|props| props.keys().cloned().map(Value::String).collect())
                    .unwrap_or_default();
                map.insert("required".into(), Value::Array(keys));
            }

            for child in map.values_mut() {
                close_objects(child, definitions);
            }
        }
        Value::Array(items) => {
            for item in items {
                close_objects(item, definitions);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    #[derive(JsonSchema)]
    struct Insight {
        headline: String,
        detail: Option<String>,
    }

    #[allow(dead_code)]
    #[derive(JsonSchema)]
    struct Analysis {
        score: u32,
        insights: Vec<Insight>,
        primary: Insight,
    }

    #[test]
    fn schema_has_no_definitions_or_meta() {
        let schema = Analysis::openai_schema();
        let obj = schema.as_object().unwrap();
        assert!(!obj.contains_key("definitions"));
        assert!(!obj.contains_key("$schema"));
        assert!(!schema.to_string().contains("$ref"));
    }

    #[test]
    fn optional_fields_are_still_required() {
        let schema = Insight::openai_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(required.contains(&"headline"));
        assert!(required.contains(&"detail"));
        assert_eq!(schema["additionalProperties"], Value::Bool(false));
    }

    #[test]
    fn nested_objects_are_inlined_and_closed() {
        let schema = Analysis::openai_schema();
        let primary = &schema["properties"]["primary"];
        assert_eq!(primary["type"], "object");
        assert_eq!(primary["additionalProperties"], Value::Bool(false));
        let item = &schema["properties"]["insights"]["items"];
        assert_eq!(item["type"], "object");
    }
}
