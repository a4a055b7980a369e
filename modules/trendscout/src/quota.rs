//! Monthly per-user feature quotas.
//!
//! Plan resolution happens only inside a `QuotaGovernor`; callers ask
//! "may this user do X" and "record that they did".

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Pro,
    Business,
}

impl Plan {
    /// Unknown plan names fall back to free.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "pro" => Plan::Pro,
            "business" => Plan::Business,
            _ => Plan::Free,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UsageFeature {
    TrendSearches,
    Products,
    Offers,
    Ads,
    LaunchPlans,
    Keywords,
}

pub struct PlanLimits;

impl PlanLimits {
    pub fn limit(plan: Plan, feature: UsageFeature) -> u32 {
        use UsageFeature::*;
        match (plan, feature) {
            (Plan::Free, TrendSearches) => 10,
            (Plan::Free, Products | Offers | Ads) => 5,
            (Plan::Free, LaunchPlans) => 2,
            (Plan::Free, Keywords) => 15,

            (Plan::Pro, TrendSearches) => 100,
            (Plan::Pro, Products | Offers | Ads) => 60,
            (Plan::Pro, LaunchPlans) => 30,
            (Plan::Pro, Keywords) => 120,

            (Plan::Business, TrendSearches) => 500,
            (Plan::Business, Products | Offers | Ads) => 200,
            (Plan::Business, LaunchPlans) => 120,
            (Plan::Business, Keywords) => 600,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaCheck {
    pub allowed: bool,
    pub remaining: u32,
    pub limit: u32,
}

/// Usage period key, `YYYY-MM`.
pub fn period_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m").to_string()
}

#[async_trait]
pub trait QuotaGovernor: Send + Sync {
    async fn check(&self, user_id: &str, feature: UsageFeature) -> Result<QuotaCheck>;

    /// Add `amount` to this period's usage and return the new count.
    async fn increment(&self, user_id: &str, feature: UsageFeature, amount: u32) -> Result<u32>;
}

type UsageKey = (String, UsageFeature, String);

pub struct MemoryQuotaGovernor {
    plans: Mutex<HashMap<String, Plan>>,
    usage: Mutex<HashMap<UsageKey, u32>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryQuotaGovernor {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl MemoryQuotaGovernor {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            plans: Mutex::new(HashMap::new()),
            usage: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn with_plan(self, user_id: impl Into<String>, plan: Plan) -> Self {
        if let Ok(mut plans) = self.plans.lock() {
            plans.insert(user_id.into(), plan);
        }
        self
    }

    fn resolve_plan(&self, user_id: &str) -> Plan {
        self.plans
            .lock()
            .ok()
            .and_then(|plans| plans.get(user_id).copied())
            .unwrap_or_default()
    }

    fn key(&self, user_id: &str, feature: UsageFeature) -> UsageKey {
        (user_id.to_string(), feature, period_key(self.clock.now()))
    }
}

#[async_trait]
impl QuotaGovernor for MemoryQuotaGovernor {
    async fn check(&self, user_id: &str, feature: UsageFeature) -> Result<QuotaCheck> {
        let limit = PlanLimits::limit(self.resolve_plan(user_id), feature);
        let used = self
            .usage
            .lock()
            .map_err(|_| anyhow::anyhow!("quota usage lock poisoned"))?
            .get(&self.key(user_id, feature))
            .copied()
            .unwrap_or(0);
        let remaining = limit.saturating_sub(used);
        Ok(QuotaCheck {
            allowed: remaining > 0,
            remaining,
            limit,
        })
    }

    async fn increment(&self, user_id: &str, feature: UsageFeature, amount: u32) -> Result<u32> {
        let key = self.key(user_id, feature);
        let mut usage = self
            .usage
            .lock()
            .map_err(|_| anyhow::anyhow!("quota usage lock poisoned"))?;
        let count = usage.entry(key).or_insert(0);
        *count = count.saturating_add(amount);
        Ok(*count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ManualClock;
    use chrono::Duration;

    #[test]
    fn limits_per_plan() {
        assert_eq!(PlanLimits::limit(Plan::Free, UsageFeature::TrendSearches), 10);
        assert_eq!(PlanLimits::limit(Plan::Pro, UsageFeature::TrendSearches), 100);
        assert_eq!(PlanLimits::limit(Plan::Business, UsageFeature::TrendSearches), 500);
        assert_eq!(PlanLimits::limit(Plan::Free, UsageFeature::LaunchPlans), 2);
        assert_eq!(PlanLimits::limit(Plan::Business, UsageFeature::Keywords), 600);
    }

    #[test]
    fn period_is_year_month() {
        let at: DateTime<Utc> = "2025-03-31T23:59:59Z".parse().unwrap();
        assert_eq!(period_key(at), "2025-03");
    }

    #[test]
    fn unknown_plans_are_free() {
        assert_eq!(Plan::parse("enterprise"), Plan::Free);
        assert_eq!(Plan::parse("PRO"), Plan::Pro);
    }

    #[tokio::test]
    async fn free_user_runs_out_after_ten_searches() {
        let governor = MemoryQuotaGovernor::default();
        for _ in 0..9 {
            governor.increment("u1", UsageFeature::TrendSearches, 1).await.unwrap();
        }
        let check = governor.check("u1", UsageFeature::TrendSearches).await.unwrap();
        assert_eq!(check, QuotaCheck { allowed: true, remaining: 1, limit: 10 });

        assert_eq!(governor.increment("u1", UsageFeature::TrendSearches, 1).await.unwrap(), 10);
        let check = governor.check("u1", UsageFeature::TrendSearches).await.unwrap();
        assert!(!check.allowed);
        assert_eq!(check.remaining, 0);
    }

    #[tokio::test]
    async fn plan_is_resolved_by_the_governor() {
        let governor = MemoryQuotaGovernor::default().with_plan("vip", Plan::Business);
        let check = governor.check("vip", UsageFeature::TrendSearches).await.unwrap();
        assert_eq!(check.limit, 500);
    }

    #[tokio::test]
    async fn usage_resets_each_month() {
        let clock = Arc::new(ManualClock::at("2025-03-31T12:00:00Z"));
        let governor = MemoryQuotaGovernor::new(clock.clone());
        governor.increment("u1", UsageFeature::Keywords, 15).await.unwrap();
        assert!(!governor.check("u1", UsageFeature::Keywords).await.unwrap().allowed);

        clock.advance(Duration::days(1));
        let check = governor.check("u1", UsageFeature::Keywords).await.unwrap();
        assert_eq!(check.remaining, 15);
    }
}
