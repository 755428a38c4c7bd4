//! Export composition
//!
//! The exported document is the source table with a `MATCH` column carrying the
//! operator's judgment for every row. Absent cells are written as empty strings.

use serde::Serialize;
use std::path::Path;
use tracing::info;

use crate::domain::judgment::JudgmentStore;
use crate::domain::table::SourceTable;
use crate::infrastructure::errors::TableError;
use crate::infrastructure::table_io::write_table;

pub const MATCH_COLUMN: &str = "MATCH";

/// Rendered export document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ExportTable {
    pub fn matched_count(&self) -> usize {
        let Some(index) = self.headers.iter().rposition(|h| h == MATCH_COLUMN) else {
            return 0;
        };
        self.rows
            .iter()
            .filter(|row| row.get(index).is_some_and(|v| v == "True"))
            .count()
    }

    pub fn write_to(&self, path: &Path) -> Result<(), TableError> {
        write_table(path, &self.headers, &self.rows)
    }
}

pub struct ExportComposer;

impl ExportComposer {
    /// Build the export document.
    ///
    /// A source table that already has a `MATCH` column gets its values replaced in
    /// place; otherwise the column is appended after the last source column.
    pub fn compose(table: &SourceTable, judgments: &JudgmentStore) -> ExportTable {
        let existing = table.column_index(MATCH_COLUMN);

        let mut headers = table.headers().to_vec();
        if existing.is_none() {
            headers.push(MATCH_COLUMN.to_string());
        }

        let rows = table
            .raw_rows()
            .iter()
            .enumerate()
            .map(|(row_id, cells)| {
                let mut out: Vec<String> = cells
                    .iter()
                    .map(|cell| cell.clone().unwrap_or_default())
                    .collect();
                let flag = format_match(judgments.get(row_id)).to_string();
                match existing {
                    Some(index) => out[index] = flag,
                    None => out.push(flag),
                }
                out
            })
            .collect();

        ExportTable { headers, rows }
    }

    /// Compose and write to `path`
    pub fn export(
        table: &SourceTable,
        judgments: &JudgmentStore,
        path: &Path,
    ) -> Result<ExportTable, TableError> {
        let export = Self::compose(table, judgments);
        export.write_to(path)?;
        info!(
            "📤 Exported {} rows ({} matched) to {:?}",
            export.rows.len(),
            export.matched_count(),
            path
        );
        Ok(export)
    }
}

fn format_match(matched: bool) -> &'static str {
    if matched { "True" } else { "False" }
}
