// Scorer: metrics + topic → ScoreBundle.
//
// Live scoring asks a completion model for a JSON bundle. Any failure on
// that path (transport, parse, out-of-contract reply) demotes the request
// to the deterministic fallback, which is a pure function of its inputs.

use std::sync::Arc;

use ai_client::{extract_json_object, truncate_to_char_boundary, Completion, Message, StructuredOutput};
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use trendscout_common::{create_seed, seeded_random, NormalizedMetrics, ScoreBundle, ScoringPath};

#[derive(Clone)]
pub enum ScoringStrategy {
    Live(Arc<dyn Completion>),
    Fallback,
}

#[derive(Clone)]
pub struct Scorer {
    strategy: ScoringStrategy,
}

impl Scorer {
    pub fn new(strategy: ScoringStrategy) -> Self {
        Self { strategy }
    }

    pub fn live(completion: Arc<dyn Completion>) -> Self {
        Self::new(ScoringStrategy::Live(completion))
    }

    pub fn fallback() -> Self {
        Self::new(ScoringStrategy::Fallback)
    }

    pub fn is_live(&self) -> bool {
        matches!(self.strategy, ScoringStrategy::Live(_))
    }

    pub async fn score(&self, metrics: &NormalizedMetrics, topic: &str) -> (ScoreBundle, ScoringPath) {
        let ScoringStrategy::Live(completion) = &self.strategy else {
            return (fallback_score(metrics, topic), ScoringPath::Fallback);
        };

        match live_score(completion.as_ref(), metrics, topic).await {
            Ok(bundle) => (bundle, ScoringPath::Live),
            Err(e) => {
                warn!(topic, model = completion.model(), error = %e, "Live scoring failed, using fallback");
                (fallback_score(metrics, topic), ScoringPath::Fallback)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Live path
// ---------------------------------------------------------------------------

fn system_prompt() -> String {
    let schema = serde_json::to_string_pretty(&ScoreBundle::openai_schema()).unwrap_or_default();
    format!(
        "You are a market-trend analyst for SaaS and digital products. \
         Given a topic and cross-source popularity metrics, rate its growth, \
         market potential and your confidence on a 0-100 scale, and give concrete, \
         topic-specific advice.\n\n\
         Respond with a single JSON object and nothing else. It must match this schema:\n{schema}\n\n\
         Every list must contain at least one entry."
    )
}

fn user_prompt(metrics: &NormalizedMetrics, topic: &str) -> Result<String> {
    let metrics_json = serde_json::to_string_pretty(metrics).context("serializing metrics")?;
    Ok(format!("Topic: {topic}\n\nMetrics:\n{metrics_json}"))
}

async fn live_score(
    completion: &dyn Completion,
    metrics: &NormalizedMetrics,
    topic: &str,
) -> Result<ScoreBundle> {
    let messages = [
        Message::system(system_prompt()),
        Message::user(user_prompt(metrics, topic)?),
    ];
    let reply = completion
        .complete(&messages)
        .await
        .context("completion request failed")?;
    debug!(topic, chars = reply.len(), "Completion reply received");
    parse_bundle(&reply)
        .with_context(|| format!("unusable reply: {}", truncate_to_char_boundary(reply.trim(), 160)))
}

/// Lenient wire shape: scores may arrive as floats or out of range.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplyBundle {
    growth_score: f64,
    market_potential: f64,
    confidence_level: f64,
    actionable_insights: Vec<String>,
    potential_pitfalls: Vec<String>,
    recommended_strategy: String,
    next_steps: Vec<String>,
}

/// Strip fences, parse, clamp scores and require non-empty narrative.
pub fn parse_bundle(reply: &str) -> Result<ScoreBundle> {
    let body = extract_json_object(reply).ok_or_else(|| anyhow!("reply contains no JSON object"))?;
    let parsed: ReplyBundle = serde_json::from_str(body).context("reply does not match the score bundle")?;

    let non_empty = |list: Vec<String>, field: &str| -> Result<Vec<String>> {
        let list: Vec<String> = list
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if list.is_empty() {
            bail!("{field} is empty");
        }
        Ok(list)
    };

    let recommended_strategy = parsed.recommended_strategy.trim().to_string();
    if recommended_strategy.is_empty() {
        bail!("recommendedStrategy is empty");
    }

    Ok(ScoreBundle {
        growth_score: clamp_score(parsed.growth_score),
        market_potential: clamp_score(parsed.market_potential),
        confidence_level: clamp_score(parsed.confidence_level),
        actionable_insights: non_empty(parsed.actionable_insights, "actionableInsights")?,
        potential_pitfalls: non_empty(parsed.potential_pitfalls, "potentialPitfalls")?,
        recommended_strategy,
        next_steps: non_empty(parsed.next_steps, "nextSteps")?,
    })
}

fn clamp_score(x: f64) -> u8 {
    if x.is_nan() {
        return 0;
    }
    x.round().clamp(0.0, 100.0) as u8
}

// ---------------------------------------------------------------------------
// Fallback path
// ---------------------------------------------------------------------------

const INSIGHTS: &[&str] = &[
    "Search interest around {kw} is steady enough to support content-led acquisition.",
    "Communities discussing {kw} ask recurring questions that a focused product can answer.",
    "New launches in {kw} cluster around a few features; differentiation is still open.",
    "Video creators covering {kw} drive discovery, so partnerships can shortcut distribution.",
    "Buyers compare {kw} options on price first; a clear free tier lowers friction.",
    "Long-tail queries around {kw} are underserved by current landing pages.",
];

const PITFALLS: &[&str] = &[
    "Interest in {kw} may be seasonal; validate demand across more than one period.",
    "Established players in {kw} can copy simple features quickly.",
    "Signals for {kw} come from a few sources; treat the estimate as directional.",
    "Paid acquisition for {kw} can get expensive before retention is proven.",
];

const NEXT_STEPS: &[&str] = &[
    "Interview five people who recently searched for {kw}.",
    "Publish a landing page for a {kw} offer and measure sign-up intent.",
    "List the top ten {kw} competitors with pricing and positioning.",
    "Draft three content pieces targeting long-tail {kw} queries.",
    "Set up weekly tracking of {kw} search and community volume.",
];

/// Deterministic bundle: identical `(metrics, topic)` always yields an
/// identical result.
pub fn fallback_score(metrics: &NormalizedMetrics, topic: &str) -> ScoreBundle {
    let seed = create_seed(topic);
    let raw = metrics.raw_growth_estimate;

    let growth = 0.7 * raw + 0.3 * (seeded_random(seed) * 100.0) + metrics.velocity * 0.2;
    let market = 0.6 * raw + 0.4 * (seeded_random(seed + 1) * 100.0);
    let confidence = 20.0
        + 15.0 * f64::from(metrics.source_diversity)
        + f64::from(metrics.mention_volume.min(40)) / 2.0;

    let growth_score = clamp_score(growth);
    let keyword = topic.trim().to_lowercase();

    ScoreBundle {
        growth_score,
        market_potential: clamp_score(market),
        confidence_level: clamp_score(confidence),
        actionable_insights: pick(INSIGHTS, 3, seed + 2, &keyword),
        potential_pitfalls: pick(PITFALLS, 2, seed + 3, &keyword),
        recommended_strategy: strategy_for(growth_score, &keyword),
        next_steps: pick(NEXT_STEPS, 3, seed + 4, &keyword),
    }
}

/// `count` consecutive templates starting at a seeded offset.
fn pick(templates: &[&str], count: usize, seed: u64, keyword: &str) -> Vec<String> {
    let start = (seeded_random(seed) * templates.len() as f64) as usize % templates.len();
    (0..count.min(templates.len()))
        .map(|i| templates[(start + i) % templates.len()].replace("{kw}", keyword))
        .collect()
}

fn strategy_for(growth: u8, keyword: &str) -> String {
    match growth {
        70..=100 => format!(
            "Move fast on {keyword}: ship a narrow MVP within weeks and invest in acquisition while interest is climbing."
        ),
        45..=69 => format!(
            "Validate {keyword} with a lightweight offer first, then double down on the channel that converts."
        ),
        _ => format!(
            "Treat {keyword} as a niche play: target a specific segment and keep costs low until demand is proven."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedCompletion;
    use std::collections::BTreeMap;
    use trendscout_common::SourceType;

    fn metrics() -> NormalizedMetrics {
        NormalizedMetrics {
            raw_growth_estimate: 72.4,
            velocity: 12.5,
            source_diversity: 3,
            mention_volume: 54,
            source_scores: BTreeMap::from([("google".to_string(), 80.0)]),
            sources_used: vec![
                SourceType::SearchVolume,
                SourceType::ForumMentions,
                SourceType::VideoPlatform,
            ],
        }
    }

    const GOOD_REPLY: &str = r#"```json
{
  "growthScore": 81.6,
  "marketPotential": 140,
  "confidenceLevel": -5,
  "actionableInsights": ["Target solo founders"],
  "potentialPitfalls": ["Crowded app stores"],
  "recommendedStrategy": "Niche down on runners",
  "nextSteps": ["Ship a waitlist"]
}
```"#;

    #[test]
    fn fallback_is_deterministic() {
        let a = fallback_score(&metrics(), "fitness apps");
        let b = fallback_score(&metrics(), "fitness apps");
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn fallback_confidence_tracks_diversity_and_volume() {
        // 20 + 15 * 3 + min(54, 40) / 2
        assert_eq!(fallback_score(&metrics(), "fitness apps").confidence_level, 85);
        let empty = fallback_score(&NormalizedMetrics::default(), "fitness apps");
        assert_eq!(empty.confidence_level, 20);
    }

    #[test]
    fn fallback_scores_stay_in_range_and_narrative_is_filled() {
        for topic in ["fitness apps", "crm", "ai writing", "meal prep kits"] {
            let bundle = fallback_score(&metrics(), topic);
            assert!(bundle.growth_score <= 100);
            assert!(bundle.market_potential <= 100);
            assert_eq!(bundle.actionable_insights.len(), 3);
            assert_eq!(bundle.potential_pitfalls.len(), 2);
            assert_eq!(bundle.next_steps.len(), 3);
            assert!(bundle.actionable_insights.iter().all(|s| s.contains(topic)));
            assert!(bundle.recommended_strategy.contains(topic));
        }
    }

    #[test]
    fn parse_strips_fences_and_clamps() {
        let bundle = parse_bundle(GOOD_REPLY).unwrap();
        assert_eq!(bundle.growth_score, 82);
        assert_eq!(bundle.market_potential, 100);
        assert_eq!(bundle.confidence_level, 0);
        assert_eq!(bundle.next_steps, vec!["Ship a waitlist".to_string()]);
    }

    #[test]
    fn parse_rejects_empty_narrative() {
        let reply = r#"{"growthScore": 50, "marketPotential": 50, "confidenceLevel": 50,
            "actionableInsights": [" "], "potentialPitfalls": ["x"],
            "recommendedStrategy": "y", "nextSteps": ["z"]}"#;
        assert!(parse_bundle(reply).is_err());
        assert!(parse_bundle("I cannot help with that.").is_err());
    }

    #[tokio::test]
    async fn live_path_uses_completion_reply() {
        let completion = Arc::new(ScriptedCompletion::new().reply(GOOD_REPLY));
        let scorer = Scorer::live(completion.clone());

        let (bundle, path) = scorer.score(&metrics(), "fitness apps").await;

        assert_eq!(path, ScoringPath::Live);
        assert_eq!(bundle.recommended_strategy, "Niche down on runners");
        assert_eq!(completion.calls(), 1);
        let prompt = completion.last_user_prompt().unwrap();
        assert!(prompt.contains("fitness apps"));
        assert!(prompt.contains("rawGrowthEstimate"));
    }

    #[tokio::test]
    async fn bad_reply_demotes_to_fallback() {
        let scorer = Scorer::live(Arc::new(ScriptedCompletion::new().reply("{\"growthScore\": \"high\"}")));
        let (bundle, path) = scorer.score(&metrics(), "fitness apps").await;
        assert_eq!(path, ScoringPath::Fallback);
        assert_eq!(bundle, fallback_score(&metrics(), "fitness apps"));
    }

    #[tokio::test]
    async fn completion_error_demotes_to_fallback() {
        let scorer = Scorer::live(Arc::new(ScriptedCompletion::new().fail("upstream 502")));
        let (_, path) = scorer.score(&metrics(), "fitness apps").await;
        assert_eq!(path, ScoringPath::Fallback);
    }
}
