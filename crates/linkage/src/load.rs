//! Delimited text tables into record sets.

use crate::config::SourceConfig;
use crate::error::LinkError;
use crate::model::{Record, RecordSet, Side};

/// Parse a header-first delimited table. Values are trimmed; the id column
/// must exist and be non-empty and unique.
pub fn load_records(
    side: Side,
    data: &str,
    source: &SourceConfig,
    delimiter: u8,
) -> Result<RecordSet, LinkError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(data.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let id_idx = headers
        .iter()
        .position(|h| *h == source.id)
        .ok_or_else(|| LinkError::MissingColumn {
            side,
            column: source.id.clone(),
        })?;

    let mut set = RecordSet::new(side, headers.clone());
    for (row_idx, result) in reader.records().enumerate() {
        let row = result?;
        let id = row.get(id_idx).unwrap_or("").trim();
        if id.is_empty() {
            // 1-based, header is line 1
            return Err(LinkError::MissingId { side, row: row_idx + 2 });
        }
        let mut record = Record::new(id);
        for (header, value) in headers.iter().zip(row.iter()) {
            if *header != source.id {
                record.fields.insert(header.clone(), value.trim().to_string());
            }
        }
        set.push(record)?;
    }

    if let Some(col) = source.count_column.as_deref() {
        set.require_columns([col])?;
    }
    Ok(set)
}
