use crate::core::batch::process_batch;
use crate::core::csv_codec::parse_records;
use crate::core::persistence::{archive_key, PersistTarget, PersistenceDispatcher};
use crate::core::rates::{fetch_rates, RateTable};
use crate::domain::model::{FileReport, InvocationSummary, ObjectRef};
use crate::domain::ports::{ConfigProvider, ItemStore, RateSource, Storage};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Per-invocation settings the orchestrator needs from configuration.
#[derive(Debug, Clone)]
pub struct NormalizerSettings {
    pub reference_currency: String,
    pub table_name: String,
    pub processed_bucket: String,
    pub processed_prefix: String,
}

impl NormalizerSettings {
    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        Self {
            reference_currency: config.reference_currency().to_string(),
            table_name: config.table_name().to_string(),
            processed_bucket: config.processed_bucket().to_string(),
            processed_prefix: config.processed_prefix().to_string(),
        }
    }
}

/// Drives one invocation: rates first, then every file in order.
pub struct CurrencyNormalizer<R: RateSource, S: Storage, K: ItemStore> {
    rates: R,
    storage: S,
    items: K,
    settings: NormalizerSettings,
    monitor: SystemMonitor,
}

impl<R: RateSource, S: Storage, K: ItemStore> CurrencyNormalizer<R, S, K> {
    pub fn new(rates: R, storage: S, items: K, settings: NormalizerSettings) -> Self {
        Self::new_with_monitoring(rates, storage, items, settings, false)
    }

    pub fn new_with_monitoring(
        rates: R,
        storage: S,
        items: K,
        settings: NormalizerSettings,
        monitor_enabled: bool,
    ) -> Self {
        Self {
            rates,
            storage,
            items,
            settings,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Fails only when no rate table can be built; every per-file problem is
    /// logged and counted in the summary instead.
    pub async fn run(&self, objects: &[ObjectRef]) -> Result<InvocationSummary> {
        tracing::info!("🚀 Starting currency normalization for {} file(s)", objects.len());
        self.monitor.log_stats("Start");

        let rates = fetch_rates(&self.rates, &self.settings.reference_currency).await?;
        self.monitor.log_stats("Rates fetched");

        let mut summary = InvocationSummary {
            files_total: objects.len(),
            ..Default::default()
        };

        for object in objects {
            match self.process_file(object, &rates).await {
                Ok(report) => {
                    tracing::info!(
                        "✅ {}: {} rows, {} dropped, {} stored, {} item failures",
                        object,
                        report.rows_read,
                        report.rows_dropped,
                        report.persisted.stored,
                        report.persisted.failed
                    );
                    summary.record_file(&report);
                }
                Err(e) => {
                    summary.files_failed += 1;
                    tracing::error!(
                        bucket = %object.bucket,
                        key = %object.key,
                        "❌ Error processing file {} from bucket {}: {}",
                        object.key,
                        object.bucket,
                        e
                    );
                }
            }
            self.monitor.log_stats(&object.key);
        }

        tracing::info!(
            "🏁 Currency normalization finished: {}/{} files ok, {} items stored, {} rows dropped, {} item failures",
            summary.files_total - summary.files_failed,
            summary.files_total,
            summary.items_stored,
            summary.rows_dropped,
            summary.items_failed
        );
        self.monitor.log_final_stats();

        Ok(summary)
    }

    async fn process_file(&self, object: &ObjectRef, rates: &RateTable) -> Result<FileReport> {
        tracing::debug!("Reading {}", object);
        let raw = self.storage.read_file(&object.bucket, &object.key).await?;
        let rows = parse_records(&raw)?;

        let source = object.to_string();
        let batch = process_batch(&source, &rows, rates);

        let archive_key = archive_key(&self.settings.processed_prefix, &object.key);
        let target = PersistTarget {
            table: &self.settings.table_name,
            archive_bucket: &self.settings.processed_bucket,
            archive_key: &archive_key,
        };
        let persisted = PersistenceDispatcher::new(&self.storage, &self.items)
            .persist(&batch.records, target)
            .await;

        Ok(FileReport {
            rows_read: rows.len(),
            rows_dropped: batch.dropped,
            persisted,
        })
    }
}
