use aws_config::{BehaviorVersion, Region};
use currency_normalizer::core::{ItemStore, RateSource, Storage};
use currency_normalizer::domain::model::IDENTIFIER_FIELD;
use currency_normalizer::utils::{logger, validation::Validate};
use currency_normalizer::{
    CurrencyNormalizer, DynamoItemStore, InvocationResponse, LambdaConfig, NormalizerSettings,
    RateFeedClient, S3Event, S3Storage,
};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};

async fn function_handler<R: RateSource, S: Storage, K: ItemStore>(
    normalizer: &CurrencyNormalizer<R, S, K>,
    config: &LambdaConfig,
    event: LambdaEvent<S3Event>,
) -> Result<InvocationResponse, Error> {
    let objects = event.payload.object_refs();
    tracing::info!(
        request_id = %event.context.request_id,
        "Received {} object notification(s)",
        objects.len()
    );

    for object in objects.iter().filter(|o| o.bucket != config.source_bucket) {
        tracing::warn!(
            "Notification for bucket {} does not match RAW_PROPERTIES_BUCKET ({}), processing anyway",
            object.bucket,
            config.source_bucket
        );
    }

    // 只有匯率表建立失敗才會讓整次呼叫失敗
    normalizer
        .run(&objects)
        .await
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;

    Ok(InvocationResponse::complete())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();

    let config = LambdaConfig::from_env()?;
    config.validate()?;

    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &config.region {
        loader = loader.region(Region::new(region.clone()));
    }
    let aws = loader.load().await;

    let normalizer = CurrencyNormalizer::new(
        RateFeedClient::from_config(&config)?,
        S3Storage::new(aws_sdk_s3::Client::new(&aws)),
        DynamoItemStore::new(aws_sdk_dynamodb::Client::new(&aws), IDENTIFIER_FIELD),
        NormalizerSettings::from_config(&config),
    );

    let normalizer = &normalizer;
    let config = &config;
    run(service_fn(move |event: LambdaEvent<S3Event>| async move {
        function_handler(normalizer, config, event).await
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use currency_normalizer::domain::model::ExchangeSnapshot;
    use currency_normalizer::domain::ports::StoreItem;
    use currency_normalizer::NormalizerError;
    use lambda_runtime::Context;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    struct FixedRates(Option<ExchangeSnapshot>);

    #[async_trait]
    impl RateSource for FixedRates {
        async fn fetch_snapshot(&self) -> currency_normalizer::Result<ExchangeSnapshot> {
            self.0.clone().ok_or_else(|| NormalizerError::RateFetch {
                message: "feed unavailable".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct MemoryStorage {
        files: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl Storage for MemoryStorage {
        async fn read_file(&self, bucket: &str, key: &str) -> currency_normalizer::Result<Vec<u8>> {
            self.files
                .lock()
                .await
                .get(&format!("{}/{}", bucket, key))
                .cloned()
                .ok_or_else(|| NormalizerError::Storage {
                    message: format!("no such object {}/{}", bucket, key),
                })
        }

        async fn write_file(&self, bucket: &str, key: &str, data: &[u8]) -> currency_normalizer::Result<()> {
            self.files.lock().await.insert(format!("{}/{}", bucket, key), data.to_vec());
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryItems {
        items: Mutex<HashMap<String, HashMap<String, String>>>,
    }

    impl ItemStore for MemoryItems {
        async fn put_batch(&self, _table: &str, items: &[StoreItem]) -> currency_normalizer::Result<Vec<String>> {
            let mut stored = self.items.lock().await;
            for item in items {
                stored.insert(item.key.clone(), item.attributes.clone());
            }
            Ok(Vec::new())
        }
    }

    fn config() -> LambdaConfig {
        LambdaConfig::from_lookup(|name: &str| match name {
            "RAW_PROPERTIES_BUCKET" => Some("raw".to_string()),
            "PROCESSED_PROPERTIES_BUCKET" => Some("processed".to_string()),
            "PROPERTIES_TABLE_NAME" => Some("properties".to_string()),
            "EXCHANGE_API_KEY" => Some("key".to_string()),
            _ => None,
        })
        .unwrap()
    }

    fn normalizer(
        snapshot: Option<ExchangeSnapshot>,
        storage: MemoryStorage,
    ) -> CurrencyNormalizer<FixedRates, MemoryStorage, MemoryItems> {
        CurrencyNormalizer::new(
            FixedRates(snapshot),
            storage,
            MemoryItems::default(),
            NormalizerSettings::from_config(&config()),
        )
    }

    fn snapshot() -> ExchangeSnapshot {
        ExchangeSnapshot::new(HashMap::from([
            ("USD".to_string(), Some(dec!(1.1))),
            ("EUR".to_string(), Some(dec!(1))),
        ]))
    }

    fn event(keys: &[&str]) -> LambdaEvent<S3Event> {
        let records: Vec<serde_json::Value> = keys
            .iter()
            .map(|key| serde_json::json!({"s3": {"bucket": {"name": "raw"}, "object": {"key": key}}}))
            .collect();
        let payload: S3Event = serde_json::from_value(serde_json::json!({ "Records": records })).unwrap();
        LambdaEvent::new(payload, Context::default())
    }

    #[tokio::test]
    async fn test_handler_processes_decoded_keys() {
        let storage = MemoryStorage::default();
        storage
            .write_file("raw", "uploads/new listings.csv", b"zpid,price,currency\n1,100,EUR\n")
            .await
            .unwrap();
        let normalizer = normalizer(Some(snapshot()), storage);

        let response = function_handler(&normalizer, &config(), event(&["uploads/new+listings.csv"]))
            .await
            .unwrap();

        assert_eq!(response, InvocationResponse::complete());
        let archive = normalizer_archive(&normalizer, "processed/processed_uploads/new listings.csv").await;
        assert!(archive.starts_with("zpid,price,currency,creationDate\r\n1,110.00,USD,"));
    }

    #[tokio::test]
    async fn test_handler_completes_when_files_fail() {
        let normalizer = normalizer(Some(snapshot()), MemoryStorage::default());

        let response = function_handler(&normalizer, &config(), event(&["missing.csv"]))
            .await
            .unwrap();

        assert_eq!(response, InvocationResponse::complete());
    }

    #[tokio::test]
    async fn test_handler_fails_when_rates_unavailable() {
        let normalizer = normalizer(None, MemoryStorage::default());

        let result = function_handler(&normalizer, &config(), event(&["a.csv"])).await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("feed unavailable"));
    }

    async fn normalizer_archive(
        normalizer: &CurrencyNormalizer<FixedRates, MemoryStorage, MemoryItems>,
        path: &str,
    ) -> String {
        let (bucket, key) = path.split_once('/').unwrap();
        let bytes = normalizer.storage().read_file(bucket, key).await.unwrap();
        String::from_utf8(bytes).unwrap()
    }
}
