//! CSV decoding into data tables

use csv::{ReaderBuilder, Trim};

use crate::domain::{DataTable, DomainError};

/// Parse a UTF-8 CSV document with a header row
pub fn parse_csv(bytes: &[u8]) -> Result<DataTable, DomainError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| DomainError::invalid_params(format!("Invalid CSV header: {}", e)))?
        .iter()
        .map(str::to_string)
        .collect();

    if headers.iter().all(String::is_empty) {
        return Err(DomainError::invalid_params("CSV document has no header row"));
    }

    let rows = reader
        .records()
        .map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect::<Vec<_>>())
                .map_err(|e| DomainError::invalid_params(format!("Invalid CSV: {}", e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    DataTable::new(headers, rows)
}
