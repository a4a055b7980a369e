pub mod adapter;
pub mod error;
pub mod live;
pub mod strategy;
pub mod synthetic;

pub use adapter::{FetchOutcome, SourceAdapter};
pub use error::{Result, SourceError};
pub use live::LiveFeed;
pub use strategy::{sources_from_config, SourceStrategy, StrategySource};
pub use synthetic::{generate_trend_items, SyntheticProfile};
