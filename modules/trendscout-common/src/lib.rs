pub mod config;
pub mod error;
pub mod seed;
pub mod types;

pub use config::{Config, SourceMode};
pub use error::{ErrorBody, ErrorKind, TrendError};
pub use seed::{create_seed, seeded_random, title_case};
pub use types::*;
