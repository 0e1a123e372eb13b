use crate::error::UploadError;

use super::types::{RawRow, RawValue};

/// Metadata describing an uploaded file, checked before any parsing happens.
#[derive(Debug, Clone, Copy)]
pub struct UploadMeta<'a> {
    pub file_name: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub size: u64,
}

/// Reject uploads that are not CSV-typed or exceed the size ceiling.
pub fn validate_upload(meta: &UploadMeta<'_>, max_bytes: u64) -> Result<(), UploadError> {
    let csv_type = meta
        .content_type
        .map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or("")
                .trim()
                .eq_ignore_ascii_case("text/csv")
        })
        .unwrap_or(false);
    let csv_name = meta
        .file_name
        .map(|name| name.to_ascii_lowercase().ends_with(".csv"))
        .unwrap_or(false);

    if !csv_type && !csv_name {
        return Err(UploadError::NotCsv);
    }
    if meta.size > max_bytes {
        return Err(UploadError::TooLarge {
            size: meta.size,
            limit: max_bytes,
        });
    }
    Ok(())
}

/// Parse CSV bytes (header row required) into dynamically typed rows.
///
/// Blank cells are dropped and rows left with no values are discarded, so every
/// returned row has at least one field.
pub fn parse_rows(data: &[u8]) -> Result<Vec<RawRow>, UploadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for result in reader.records() {
        let record = result?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .filter(|(header, cell)| !header.is_empty() && !cell.is_empty())
            .map(|(header, cell)| (header.to_string(), RawValue::infer(cell)))
            .collect();

        if row.is_empty() {
            skipped += 1;
            continue;
        }
        rows.push(row);
    }

    tracing::debug!(
        rows = rows.len(),
        skipped,
        columns = headers.len(),
        "Parsed CSV upload"
    );
    Ok(rows)
}
