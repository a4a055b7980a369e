//! Fixed-window request guard, one window per caller identity.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// Identity used when a request carries neither a user id nor an address.
pub const ANONYMOUS: &str = "anonymous";

/// Expired identities are pruned once the map grows past this.
const PRUNE_THRESHOLD: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub window: Duration,
    pub max_requests: u32,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            max_requests: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitState {
    pub count: u32,
    pub reset_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

/// Advance one identity's window for a hit at `now`. Rejected hits leave
/// the state untouched.
pub fn apply_hit(
    state: Option<RateLimitState>,
    now: DateTime<Utc>,
    policy: &RateLimitPolicy,
) -> (RateLimitState, RateDecision) {
    let fresh = RateLimitState {
        count: 1,
        reset_at: window_end(now, policy.window),
    };
    let allowed = |s: RateLimitState| {
        let remaining = policy.max_requests.saturating_sub(s.count);
        (s, RateDecision::Allowed { remaining })
    };

    match state {
        None => allowed(fresh),
        Some(s) if now > s.reset_at => allowed(fresh),
        Some(s) if s.count >= policy.max_requests => (
            s,
            RateDecision::Limited {
                retry_after: (s.reset_at - now).to_std().unwrap_or_default(),
            },
        ),
        Some(s) => allowed(RateLimitState {
            count: s.count + 1,
            ..s
        }),
    }
}

fn window_end(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(window)
        .ok()
        .and_then(|w| now.checked_add_signed(w))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Storage for per-identity windows. `hit` must be atomic per identity.
pub trait RateLimitStore: Send + Sync {
    fn hit(&self, identity: &str, now: DateTime<Utc>, policy: &RateLimitPolicy) -> RateDecision;
}

#[derive(Default)]
pub struct MemoryRateLimitStore {
    entries: Mutex<HashMap<String, RateLimitState>>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RateLimitStore for MemoryRateLimitStore {
    fn hit(&self, identity: &str, now: DateTime<Utc>, policy: &RateLimitPolicy) -> RateDecision {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if entries.len() > PRUNE_THRESHOLD {
            entries.retain(|_, s| s.reset_at >= now);
        }

        let (state, decision) = apply_hit(entries.get(identity).copied(), now, policy);
        entries.insert(identity.to_string(), state);
        decision
    }
}

/// Shared handle; construct once and clone into every request path.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    policy: RateLimitPolicy,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, policy: RateLimitPolicy) -> Self {
        Self { store, policy }
    }

    pub fn in_memory(policy: RateLimitPolicy) -> Self {
        Self::new(Arc::new(MemoryRateLimitStore::new()), policy)
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    /// Count a hit for `identity` at `now`, taken from the caller's clock.
    pub fn check(&self, identity: &str, now: DateTime<Utc>) -> RateDecision {
        self.store.hit(identity, now, &self.policy)
    }
}

/// User id, else client address, else [`ANONYMOUS`].
pub fn caller_identity<'a>(user_id: Option<&'a str>, client_addr: Option<&'a str>) -> &'a str {
    user_id
        .filter(|s| !s.trim().is_empty())
        .or(client_addr.filter(|s| !s.trim().is_empty()))
        .unwrap_or(ANONYMOUS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter {
        RateLimiter::in_memory(RateLimitPolicy::default())
    }

    fn start_time() -> DateTime<Utc> {
        "2025-03-10T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn eleventh_request_in_window_is_limited() {
        let limiter = limiter();
        let start = start_time();
        for i in 0..10 {
            let decision = limiter.check("user-1", start + TimeDelta::seconds(i));
            assert_eq!(decision, RateDecision::Allowed { remaining: 9 - i as u32 });
        }
        let decision = limiter.check("user-1", start + TimeDelta::seconds(30));
        assert_eq!(
            decision,
            RateDecision::Limited {
                retry_after: Duration::from_secs(30)
            }
        );
    }

    #[test]
    fn window_resets_after_expiry() {
        let limiter = limiter();
        let start = start_time();
        for _ in 0..11 {
            limiter.check("user-1", start);
        }
        // reset_at itself is still inside the window
        assert!(!limiter.check("user-1", start + TimeDelta::seconds(60)).is_allowed());
        assert_eq!(
            limiter.check("user-1", start + TimeDelta::seconds(61)),
            RateDecision::Allowed { remaining: 9 }
        );
    }

    #[test]
    fn identities_are_independent() {
        let limiter = limiter();
        let now = start_time();
        for _ in 0..10 {
            limiter.check("a", now);
        }
        assert!(!limiter.check("a", now).is_allowed());
        assert!(limiter.check("b", now).is_allowed());
    }

    #[test]
    fn rejections_do_not_extend_the_count() {
        let policy = RateLimitPolicy {
            window: Duration::from_secs(60),
            max_requests: 2,
        };
        let now = start_time();
        let (s1, _) = apply_hit(None, now, &policy);
        let (s2, _) = apply_hit(Some(s1), now, &policy);
        let (s3, d3) = apply_hit(Some(s2), now, &policy);
        assert!(!d3.is_allowed());
        assert_eq!(s3, s2);
    }

    #[test]
    fn memory_store_prunes_expired_identities() {
        let store = MemoryRateLimitStore::new();
        let policy = RateLimitPolicy::default();
        let start = start_time();
        for i in 0..=PRUNE_THRESHOLD {
            store.hit(&format!("ip-{i}"), start, &policy);
        }
        assert_eq!(store.len(), PRUNE_THRESHOLD + 1);

        store.hit("late", start + TimeDelta::seconds(120), &policy);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn identity_prefers_user_then_address() {
        assert_eq!(caller_identity(Some("u1"), Some("10.0.0.1")), "u1");
        assert_eq!(caller_identity(Some(" "), Some("10.0.0.1")), "10.0.0.1");
        assert_eq!(caller_identity(None, None), ANONYMOUS);
    }
}
