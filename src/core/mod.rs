pub mod batch;
pub mod csv_codec;
pub mod normalizer;
pub mod orchestrator;
pub mod persistence;
pub mod rates;

pub use crate::domain::model::{ObjectRef, Record};
pub use crate::domain::ports::{ConfigProvider, ItemStore, RateSource, Storage};
pub use crate::utils::error::Result;
