use crate::config::{validate_common, DEFAULT_RATE_ENDPOINT};
use crate::core::persistence::DEFAULT_PROCESSED_PREFIX;
use crate::core::rates::DEFAULT_REFERENCE_CURRENCY;
use crate::domain::ports::{ConfigProvider, ItemStore, Storage, StoreItem};
use crate::utils::error::{NormalizerError, Result};
use crate::utils::validation::{self, Validate};
use aws_sdk_dynamodb::types::{AttributeValue, PutRequest, WriteRequest};
use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_s3::Client as S3Client;
use std::collections::HashMap;
use std::env;

#[derive(Clone)]
pub struct LambdaConfig {
    pub source_bucket: String,
    pub processed_bucket: String,
    pub table_name: String,
    pub rate_endpoint: String,
    pub rate_access_key: String,
    pub reference_currency: String,
    pub processed_prefix: String,
    pub region: Option<String>,
    pub rate_timeout_seconds: Option<u64>,
}

impl LambdaConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable lookup, so tests do not have
    /// to touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| -> Result<String> {
            let value = lookup(name).filter(|v| !v.trim().is_empty());
            validation::validate_required_field(name, &value).cloned()
        };

        let rate_timeout_seconds = match lookup("RATE_TIMEOUT_SECONDS") {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|e| {
                NormalizerError::InvalidConfigValueError {
                    field: "RATE_TIMEOUT_SECONDS".to_string(),
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?),
            None => None,
        };

        Ok(Self {
            source_bucket: required("RAW_PROPERTIES_BUCKET")?,
            processed_bucket: required("PROCESSED_PROPERTIES_BUCKET")?,
            table_name: required("PROPERTIES_TABLE_NAME")?,
            rate_access_key: required("EXCHANGE_API_KEY")?,
            rate_endpoint: lookup("EXCHANGE_API_URL").unwrap_or_else(|| DEFAULT_RATE_ENDPOINT.to_string()),
            reference_currency: lookup("REFERENCE_CURRENCY")
                .unwrap_or_else(|| DEFAULT_REFERENCE_CURRENCY.to_string()),
            processed_prefix: lookup("PROCESSED_PREFIX")
                .unwrap_or_else(|| DEFAULT_PROCESSED_PREFIX.to_string()),
            region: lookup("AWS_REGION").or_else(|| lookup("S3_REGION")),
            rate_timeout_seconds,
        })
    }
}

impl std::fmt::Debug for LambdaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LambdaConfig")
            .field("source_bucket", &self.source_bucket)
            .field("processed_bucket", &self.processed_bucket)
            .field("table_name", &self.table_name)
            .field("rate_endpoint", &self.rate_endpoint)
            .field("rate_access_key", &"***")
            .field("reference_currency", &self.reference_currency)
            .field("processed_prefix", &self.processed_prefix)
            .field("region", &self.region)
            .field("rate_timeout_seconds", &self.rate_timeout_seconds)
            .finish()
    }
}

impl ConfigProvider for LambdaConfig {
    fn source_bucket(&self) -> &str {
        &self.source_bucket
    }

    fn processed_bucket(&self) -> &str {
        &self.processed_bucket
    }

    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn rate_endpoint(&self) -> &str {
        &self.rate_endpoint
    }

    fn rate_access_key(&self) -> &str {
        &self.rate_access_key
    }

    fn reference_currency(&self) -> &str {
        &self.reference_currency
    }

    fn processed_prefix(&self) -> &str {
        &self.processed_prefix
    }

    fn rate_timeout_seconds(&self) -> Option<u64> {
        self.rate_timeout_seconds
    }
}

impl Validate for LambdaConfig {
    fn validate(&self) -> Result<()> {
        validate_s3_bucket_name("RAW_PROPERTIES_BUCKET", &self.source_bucket)?;
        validate_s3_bucket_name("PROCESSED_PROPERTIES_BUCKET", &self.processed_bucket)?;
        validate_common(self)?;

        if let Some(region) = &self.region {
            validate_aws_region("AWS_REGION", region)?;
        }

        tracing::info!("✅ Lambda configuration validation passed");
        Ok(())
    }
}

fn validate_s3_bucket_name(field_name: &str, bucket_name: &str) -> Result<()> {
    let reason = if bucket_name.len() < 3 || bucket_name.len() > 63 {
        Some("S3 bucket name must be between 3 and 63 characters")
    } else if !bucket_name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        Some("S3 bucket name can only contain lowercase letters, numbers, hyphens, and dots")
    } else if bucket_name.starts_with('-') || bucket_name.ends_with('-') {
        Some("S3 bucket name cannot start or end with a hyphen")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(NormalizerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: bucket_name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

fn validate_aws_region(field_name: &str, region: &str) -> Result<()> {
    validation::validate_non_empty_string(field_name, region)?;

    if !region
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(NormalizerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: region.to_string(),
            reason: "AWS region can only contain lowercase letters, numbers, and hyphens"
                .to_string(),
        });
    }

    Ok(())
}

#[derive(Debug, Clone)]
pub struct S3Storage {
    client: S3Client,
}

impl S3Storage {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }
}

impl Storage for S3Storage {
    async fn read_file(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| NormalizerError::Storage {
                message: format!(
                    "Failed to read s3://{}/{}: {}",
                    bucket,
                    key,
                    aws_sdk_s3::error::DisplayErrorContext(&e)
                ),
            })?;

        let data = resp.body.collect().await.map_err(|e| NormalizerError::Storage {
            message: format!("Failed to collect s3://{}/{}: {}", bucket, key, e),
        })?;

        Ok(data.into_bytes().to_vec())
    }

    async fn write_file(&self, bucket: &str, key: &str, data: &[u8]) -> Result<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type("text/csv; charset=utf-8")
            .body(data.to_vec().into())
            .send()
            .await
            .map_err(|e| NormalizerError::Storage {
                message: format!(
                    "Failed to write s3://{}/{}: {}",
                    bucket,
                    key,
                    aws_sdk_s3::error::DisplayErrorContext(&e)
                ),
            })?;

        Ok(())
    }
}

/// DynamoDB table accessed through `BatchWriteItem`. Unprocessed items are
/// reported back, not retried.
#[derive(Debug, Clone)]
pub struct DynamoItemStore {
    client: DynamoClient,
    key_attribute: String,
}

impl DynamoItemStore {
    pub fn new(client: DynamoClient, key_attribute: impl Into<String>) -> Self {
        Self {
            client,
            key_attribute: key_attribute.into(),
        }
    }

    fn write_request(item: &StoreItem) -> Result<WriteRequest> {
        let attributes: HashMap<String, AttributeValue> = item
            .attributes
            .iter()
            .map(|(name, value)| (name.clone(), AttributeValue::S(value.clone())))
            .collect();

        let put = PutRequest::builder()
            .set_item(Some(attributes))
            .build()
            .map_err(|e| NormalizerError::ItemStore {
                message: format!("invalid item '{}': {}", item.key, e),
            })?;

        Ok(WriteRequest::builder().put_request(put).build())
    }
}

impl ItemStore for DynamoItemStore {
    async fn put_batch(&self, table: &str, items: &[StoreItem]) -> Result<Vec<String>> {
        let requests = items
            .iter()
            .map(Self::write_request)
            .collect::<Result<Vec<_>>>()?;

        let output = self
            .client
            .batch_write_item()
            .request_items(table, requests)
            .send()
            .await
            .map_err(|e| NormalizerError::ItemStore {
                message: format!(
                    "BatchWriteItem on {} failed: {}",
                    table,
                    aws_sdk_dynamodb::error::DisplayErrorContext(&e)
                ),
            })?;

        let unprocessed = output
            .unprocessed_items()
            .and_then(|tables| tables.get(table))
            .map(|requests| {
                requests
                    .iter()
                    .filter_map(|request| request.put_request())
                    .filter_map(|put| put.item().get(&self.key_attribute))
                    .filter_map(|value| value.as_s().ok().cloned())
                    .collect()
            })
            .unwrap_or_default();

        Ok(unprocessed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name: &str| {
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        }
    }

    const BASE: &[(&str, &str)] = &[
        ("RAW_PROPERTIES_BUCKET", "raw-properties"),
        ("PROCESSED_PROPERTIES_BUCKET", "processed-properties"),
        ("PROPERTIES_TABLE_NAME", "Properties"),
        ("EXCHANGE_API_KEY", "key-123"),
    ];

    #[test]
    fn test_from_lookup_defaults() {
        let config = LambdaConfig::from_lookup(lookup(BASE)).unwrap();

        assert_eq!(config.rate_endpoint, DEFAULT_RATE_ENDPOINT);
        assert_eq!(config.reference_currency, "USD");
        assert_eq!(config.processed_prefix, "processed_");
        assert!(config.validate().is_ok());
        assert!(!format!("{:?}", config).contains("key-123"));
    }

    #[test]
    fn test_from_lookup_requires_table_and_key() {
        let err = LambdaConfig::from_lookup(lookup(&[
            ("RAW_PROPERTIES_BUCKET", "raw-properties"),
            ("PROCESSED_PROPERTIES_BUCKET", "processed-properties"),
            ("EXCHANGE_API_KEY", "k"),
        ]))
        .unwrap_err();

        assert!(matches!(err, NormalizerError::MissingConfigError { ref field } if field == "PROPERTIES_TABLE_NAME"));
    }

    #[test]
    fn test_validate_bucket_names() {
        assert!(validate_s3_bucket_name("b", "raw-properties").is_ok());
        assert!(validate_s3_bucket_name("b", "Raw_Properties").is_err());
        assert!(validate_s3_bucket_name("b", "ab").is_err());
        assert!(validate_s3_bucket_name("b", "-raw").is_err());
    }

    #[test]
    fn test_write_request_carries_string_attributes() {
        let item = StoreItem {
            key: "123".to_string(),
            attributes: HashMap::from([
                ("zpid".to_string(), "123".to_string()),
                ("price".to_string(), "110.00".to_string()),
            ]),
        };

        let request = DynamoItemStore::write_request(&item).unwrap();
        let put = request.put_request().unwrap();

        assert_eq!(put.item().get("zpid"), Some(&AttributeValue::S("123".to_string())));
        assert_eq!(put.item().get("price"), Some(&AttributeValue::S("110.00".to_string())));
    }
}
