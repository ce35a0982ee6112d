use crate::core::csv_codec::write_records;
use crate::domain::model::{PersistReport, Record, IDENTIFIER_FIELD};
use crate::domain::ports::{ItemStore, Storage, StoreItem};
use crate::utils::error::{NormalizerError, Result};
use std::collections::HashMap;

/// DynamoDB accepts at most 25 put requests per batch write.
pub const MAX_BATCH_WRITE_ITEMS: usize = 25;

pub const DEFAULT_PROCESSED_PREFIX: &str = "processed_";

/// Where one file's normalized records go.
#[derive(Debug, Clone, Copy)]
pub struct PersistTarget<'a> {
    pub table: &'a str,
    pub archive_bucket: &'a str,
    pub archive_key: &'a str,
}

pub struct PersistenceDispatcher<'a, S: Storage, K: ItemStore> {
    storage: &'a S,
    items: &'a K,
}

impl<'a, S: Storage, K: ItemStore> PersistenceDispatcher<'a, S, K> {
    pub fn new(storage: &'a S, items: &'a K) -> Self {
        Self { storage, items }
    }

    /// Writes records to the key-value store, then archives them as CSV.
    ///
    /// Item failures are logged one by one and never stop the remaining items.
    /// An archive failure is logged and leaves the key-value writes in place.
    pub async fn persist(&self, records: &[Record], target: PersistTarget<'_>) -> PersistReport {
        let mut report = self.store_items(records, target.table).await;

        report.archived = match self.write_archive(records, target).await {
            Ok(archived) => archived,
            Err(e) => {
                tracing::error!(
                    bucket = target.archive_bucket,
                    key = target.archive_key,
                    "❌ Failed to write processed file {}/{}: {}",
                    target.archive_bucket,
                    target.archive_key,
                    e
                );
                false
            }
        };

        report
    }

    async fn store_items(&self, records: &[Record], table: &str) -> PersistReport {
        let mut report = PersistReport::default();
        let mut chunk: Vec<StoreItem> = Vec::with_capacity(MAX_BATCH_WRITE_ITEMS);
        let mut positions: HashMap<String, usize> = HashMap::new();

        for record in records {
            let item = match to_store_item(record) {
                Ok(item) => item,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!("❌ Error uploading item to {}: {}", table, e);
                    continue;
                }
            };

            // 同一批次內不可有重複主鍵，後出現的資料覆蓋先前的
            if let Some(&position) = positions.get(&item.key) {
                tracing::debug!("Duplicate {} '{}' in batch, keeping the later row", IDENTIFIER_FIELD, item.key);
                chunk[position] = item;
                continue;
            }

            positions.insert(item.key.clone(), chunk.len());
            chunk.push(item);

            if chunk.len() == MAX_BATCH_WRITE_ITEMS {
                self.flush(table, &chunk, &mut report).await;
                chunk.clear();
                positions.clear();
            }
        }

        if !chunk.is_empty() {
            self.flush(table, &chunk, &mut report).await;
        }

        report
    }

    async fn flush(&self, table: &str, chunk: &[StoreItem], report: &mut PersistReport) {
        match self.items.put_batch(table, chunk).await {
            Ok(unprocessed) => {
                for key in &unprocessed {
                    tracing::error!("❌ Item {}='{}' was not processed by {}", IDENTIFIER_FIELD, key, table);
                }
                let unprocessed = unprocessed.len().min(chunk.len());
                report.failed += unprocessed;
                report.stored += chunk.len() - unprocessed;
            }
            Err(e) => {
                for item in chunk {
                    tracing::error!("❌ Error uploading item {}='{}' to {}: {}", IDENTIFIER_FIELD, item.key, table, e);
                }
                report.failed += chunk.len();
            }
        }
    }

    async fn write_archive(&self, records: &[Record], target: PersistTarget<'_>) -> Result<bool> {
        let Some(text) = write_records(records)? else {
            tracing::debug!("No records for {}, skipping processed file", target.archive_key);
            return Ok(false);
        };

        self.storage
            .write_file(target.archive_bucket, target.archive_key, text.as_bytes())
            .await?;
        tracing::info!(
            "📁 Processed file written to {}/{} ({} records)",
            target.archive_bucket,
            target.archive_key,
            records.len()
        );
        Ok(true)
    }
}

/// Keys the item by its identifier exactly as it appears in the row, so the
/// item and the archived CSV agree. Blank identifiers are rejected.
pub fn to_store_item(record: &Record) -> Result<StoreItem> {
    let key = record
        .get(IDENTIFIER_FIELD)
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| NormalizerError::ItemStore {
            message: format!("record has no '{}' value", IDENTIFIER_FIELD),
        })?
        .to_string();

    let attributes: HashMap<String, String> = record
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

    Ok(StoreItem { key, attributes })
}

pub fn archive_key(prefix: &str, source_key: &str) -> String {
    format!("{}{}", prefix, source_key)
}
