use clap::Parser;
use currency_normalizer::config::cli::discover_csv_files;
use currency_normalizer::core::ConfigProvider;
use currency_normalizer::utils::error::ErrorSeverity;
use currency_normalizer::utils::{logger, validation::Validate};
use currency_normalizer::{
    CliConfig, CurrencyNormalizer, LocalItemStore, LocalStorage, NormalizerError,
    NormalizerSettings, ObjectRef, RateFeedClient,
};
use std::path::Path;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose);
    tracing::info!("Starting currency-normalizer CLI");

    if let Err(e) = run(cli).await {
        tracing::error!(
            "❌ Currency normalization failed: {} (Scope: {:?}, Severity: {:?})",
            e,
            e.scope(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        std::process::exit(exit_code);
    }
}

async fn run(cli: CliConfig) -> Result<(), NormalizerError> {
    let config = cli.resolve()?;
    config.validate()?;
    tracing::debug!("Resolved config: {:?}", config);

    let files = if config.files.is_empty() {
        discover_csv_files(Path::new(&config.input_dir))?
    } else {
        config.files.clone()
    };
    if files.is_empty() {
        tracing::warn!("No CSV files found in {}", config.input_dir);
    }

    let objects: Vec<ObjectRef> = files
        .iter()
        .map(|file| ObjectRef::new(config.source_bucket(), file.as_str()))
        .collect();

    // 創建匯率來源、存儲與管道
    let rates = RateFeedClient::from_config(&config)?;
    let storage = LocalStorage::new(".");
    let items = LocalItemStore::new(&config.output_dir);
    let normalizer = CurrencyNormalizer::new_with_monitoring(
        rates,
        storage,
        items,
        NormalizerSettings::from_config(&config),
        cli.monitor,
    );

    let summary = normalizer.run(&objects).await?;

    println!(
        "✅ Processed {} file(s): {} failed, {} records stored, {} rows dropped",
        summary.files_total, summary.files_failed, summary.items_stored, summary.rows_dropped
    );
    println!(
        "📁 Output saved to: {} (items in {})",
        config.output_dir,
        Path::new(&config.output_dir)
            .join(format!("{}.json", config.table_name))
            .display()
    );

    Ok(())
}
