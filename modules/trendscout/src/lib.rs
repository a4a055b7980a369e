pub mod aggregator;
pub mod cache;
pub mod clock;
pub mod keyword;
pub mod merge;
pub mod normalizer;
pub mod quota;
pub mod rate_limit;
pub mod scorer;
pub mod service;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use quota::{MemoryQuotaGovernor, Plan, QuotaCheck, QuotaGovernor, UsageFeature};
pub use service::{TrendDeps, TrendRequest, TrendService};
