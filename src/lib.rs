pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{
    cli::{LocalItemStore, LocalStorage},
    CliConfig,
};
pub use config::LocalConfig;

#[cfg(feature = "lambda")]
pub use config::lambda::{DynamoItemStore, LambdaConfig, S3Storage};

pub use core::{
    orchestrator::{CurrencyNormalizer, NormalizerSettings},
    rates::{RateFeedClient, RateTable},
};
pub use domain::model::{InvocationResponse, InvocationSummary, ObjectRef, Record, S3Event};
pub use utils::error::{NormalizerError, Result};
