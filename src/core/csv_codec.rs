use crate::domain::model::Record;
use crate::utils::error::{NormalizerError, Result};

/// Parses an uploaded listing file (UTF-8, comma separated, header row).
///
/// Short rows keep only the fields they actually carry. Cells past the end of
/// the header have no field name and are dropped.
pub fn parse_records(data: &[u8]) -> Result<Vec<Record>> {
    let text = std::str::from_utf8(data).map_err(|e| NormalizerError::InvalidEncoding {
        message: e.to_string(),
    })?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let mut records = Vec::new();

    for (index, row) in reader.records().enumerate() {
        let row = row?;
        if row.len() > headers.len() {
            tracing::warn!(
                "Row {} has {} cells but the header has {}, extra cells ignored",
                index + 1,
                row.len(),
                headers.len()
            );
        }

        let record: Record = headers.iter().zip(row.iter()).collect();
        records.push(record);
    }

    Ok(records)
}

/// Serializes normalized records for the processed archive.
///
/// Returns `None` when there is nothing to write. The header is the field set
/// of the first record; a later record missing a column writes an empty cell
/// and a record carrying a column outside the header is rejected.
pub fn write_records(records: &[Record]) -> Result<Option<String>> {
    let Some(first) = records.first() else {
        return Ok(None);
    };
    let header: Vec<&str> = first.field_names().collect();

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());
    writer.write_record(&header)?;

    for (index, record) in records.iter().enumerate() {
        if let Some(unknown) = record.field_names().find(|name| !header.contains(name)) {
            return Err(NormalizerError::Archive {
                message: format!(
                    "record {} has field '{}' which is not in the header",
                    index + 1,
                    unknown
                ),
            });
        }
        writer.write_record(header.iter().map(|name| record.get(name).unwrap_or("")))?;
    }

    let bytes = writer.into_inner().map_err(|e| NormalizerError::Archive {
        message: format!("failed to flush CSV writer: {}", e.error()),
    })?;
    let text = String::from_utf8(bytes).map_err(|e| NormalizerError::Archive {
        message: e.to_string(),
    })?;

    Ok(Some(text))
}
