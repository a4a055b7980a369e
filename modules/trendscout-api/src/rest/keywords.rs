use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use serde::{Deserialize, Serialize};

use trendscout::UsageFeature;

use super::{guard_quota, record_usage, Caller};
use crate::error::ApiError;
use crate::AppState;

#[derive(Deserialize)]
pub struct KeywordsRequest {
    #[serde(default)]
    topic: String,
}

#[derive(Serialize)]
pub struct KeywordsResponse {
    ok: bool,
    topic: String,
    keyword: String,
    variants: Vec<String>,
}

pub async fn api_keywords(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    body: Result<Json<KeywordsRequest>, JsonRejection>,
) -> Result<Json<KeywordsResponse>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::invalid_input(e.body_text()))?;

    if let Some(user_id) = caller.user_id.as_deref() {
        guard_quota(state.quota.as_ref(), user_id, UsageFeature::Keywords).await?;
    }

    let normalized = state
        .service
        .keywords(&body.topic)
        .map_err(|e| ApiError::from_trend(e, state.expose_internal_errors))?;

    if let Some(user_id) = caller.user_id.as_deref() {
        record_usage(state.quota.as_ref(), user_id, UsageFeature::Keywords).await;
    }

    Ok(Json(KeywordsResponse {
        ok: true,
        topic: body.topic.trim().to_string(),
        keyword: normalized.keyword,
        variants: normalized.variants,
    }))
}
