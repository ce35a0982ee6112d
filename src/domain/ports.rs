use crate::domain::model::ExchangeSnapshot;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Blob store holding raw uploads and processed archives.
pub trait Storage: Send + Sync {
    fn read_file(
        &self,
        bucket: &str,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// One item destined for the key-value store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreItem {
    pub key: String,
    pub attributes: HashMap<String, String>,
}

/// Key-value store with a batched write facility.
///
/// `put_batch` returns the keys the store left unprocessed; a whole-batch
/// failure is an `Err`.
pub trait ItemStore: Send + Sync {
    fn put_batch(
        &self,
        table: &str,
        items: &[StoreItem],
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
}

#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<ExchangeSnapshot>;
}

pub trait ConfigProvider: Send + Sync {
    fn source_bucket(&self) -> &str;
    fn processed_bucket(&self) -> &str;
    fn table_name(&self) -> &str;
    fn rate_endpoint(&self) -> &str;
    fn rate_access_key(&self) -> &str;
    fn reference_currency(&self) -> &str;
    fn processed_prefix(&self) -> &str;
    fn rate_timeout_seconds(&self) -> Option<u64>;
}
