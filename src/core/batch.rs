use crate::core::normalizer::normalize;
use crate::core::rates::RateTable;
use crate::domain::model::{BatchResult, Record, IDENTIFIER_FIELD, PRICE_FIELD};
use chrono::{DateTime, Utc};

/// Normalizes every row of one file, stamping each row with the time it was
/// processed. Rows the normalizer rejects are logged and left out.
pub fn process_batch(source: &str, rows: &[Record], rates: &RateTable) -> BatchResult {
    process_batch_with_clock(source, rows, rates, Utc::now)
}

pub fn process_batch_with_clock<F>(
    source: &str,
    rows: &[Record],
    rates: &RateTable,
    mut clock: F,
) -> BatchResult
where
    F: FnMut() -> DateTime<Utc>,
{
    let mut result = BatchResult {
        records: Vec::with_capacity(rows.len()),
        dropped: 0,
    };

    for (index, row) in rows.iter().enumerate() {
        match normalize(row, rates, clock()) {
            Ok(record) => result.records.push(record),
            Err(e) => {
                result.dropped += 1;
                tracing::warn!(
                    source = source,
                    row = index + 1,
                    zpid = row.get(IDENTIFIER_FIELD).unwrap_or("<none>"),
                    price = row.get(PRICE_FIELD).unwrap_or("<none>"),
                    "⚠️ Dropping row {} of {}: {}",
                    index + 1,
                    source,
                    e
                );
            }
        }
    }

    tracing::debug!(
        "Processed {} rows from {}: {} kept, {} dropped",
        rows.len(),
        source,
        result.records.len(),
        result.dropped
    );

    result
}
