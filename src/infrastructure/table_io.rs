//! CSV input and output
//!
//! Input is tried with ',' first and ';' second. A parse "fails" when the csv
//! reader reports an error (unequal record lengths, invalid UTF-8, ...). When both
//! delimiters fail the load fails; this is the only fatal input condition.

use std::path::Path;
use tracing::{info, warn};

use crate::domain::table::SourceTable;
use crate::infrastructure::errors::TableError;

/// Load a table from disk
pub fn load_table(path: &Path) -> Result<SourceTable, TableError> {
    let bytes = std::fs::read(path).map_err(|source| TableError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let table = parse_table(&bytes)?;
    info!(
        "Loaded {:?}: {} rows, {} columns",
        path,
        table.row_count(),
        table.column_count()
    );
    Ok(table)
}

/// Parse CSV bytes, falling back from ',' to ';'
pub fn parse_table(bytes: &[u8]) -> Result<SourceTable, TableError> {
    let comma_error = match parse_with_delimiter(bytes, b',') {
        Ok(table) => return Ok(table),
        Err(e) => e,
    };
    warn!("Comma-separated parse failed ({}), retrying with ';'", comma_error);

    parse_with_delimiter(bytes, b';').map_err(|semicolon_error| TableError::UnparseableTable {
        comma: comma_error.to_string(),
        semicolon: semicolon_error.to_string(),
    })
}

fn parse_with_delimiter(bytes: &[u8], delimiter: u8) -> Result<SourceTable, TableError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(TableError::MissingHeader);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
                .collect(),
        );
    }

    Ok(SourceTable::new(headers, rows))
}

/// Write headers and rows as comma-separated UTF-8
pub fn write_csv<W: std::io::Write>(
    writer: W,
    headers: &[String],
    rows: &[Vec<String>],
) -> Result<(), TableError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush().map_err(|e| TableError::Csv(e.into()))?;
    Ok(())
}

/// Write headers and rows to a file
pub fn write_table(path: &Path, headers: &[String], rows: &[Vec<String>]) -> Result<(), TableError> {
    let file = std::fs::File::create(path).map_err(|source| TableError::Io {
        path: path.display().to_string(),
        source,
    })?;
    write_csv(std::io::BufWriter::new(file), headers, rows)?;
    info!("Wrote {} rows to {:?}", rows.len(), path);
    Ok(())
}
