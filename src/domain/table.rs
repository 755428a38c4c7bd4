//! Source table and column selection
//!
//! The loaded table is immutable. Each row keeps the positional index it received at
//! load time; that index is the row identity used by judgments and export.

use serde::Serialize;
use std::ops::Range;

use crate::infrastructure::errors::TableError;

/// Stable positional index of a row in the loaded table
pub type RowId = usize;

/// Headers plus rows of optional cell values (empty cells are absent)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceTable {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl SourceTable {
    /// Build a table; short rows are padded with absent cells, long rows are cut to the header width
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn row(&self, id: RowId) -> Option<Row<'_>> {
        self.rows.get(id).map(|values| Row {
            id,
            table: self,
            values,
        })
    }

    /// Rows whose identity falls in `range`, clipped to the table
    pub fn rows_in(&self, range: Range<RowId>) -> impl Iterator<Item = Row<'_>> {
        let end = range.end.min(self.rows.len());
        let start = range.start.min(end);
        (start..end).filter_map(move |id| self.row(id))
    }

    pub fn raw_rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }
}

/// Borrowed view of one row
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    id: RowId,
    table: &'a SourceTable,
    values: &'a [Option<String>],
}

impl<'a> Row<'a> {
    pub fn id(&self) -> RowId {
        self.id
    }

    /// Raw cell value; `None` when the column is unknown or the cell is absent
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let index = self.table.column_index(column)?;
        self.values.get(index)?.as_deref()
    }

    /// Trimmed cell value, `None` when absent or blank
    pub fn text(&self, column: &str) -> Option<&'a str> {
        self.get(column).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn values(&self) -> &'a [Option<String>] {
        self.values
    }
}

/// Columns chosen by the operator for a review session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSelection {
    /// Column holding the primary product page URL
    pub primary_url: String,
    /// Column holding the secondary image URL
    pub secondary_image: String,
    /// Optional column holding a direct primary image URL
    pub primary_image: Option<String>,
    /// Extra columns shown next to each row
    pub details: Vec<String>,
}

impl ColumnSelection {
    pub fn new(primary_url: impl Into<String>, secondary_image: impl Into<String>) -> Self {
        Self {
            primary_url: primary_url.into(),
            secondary_image: secondary_image.into(),
            primary_image: None,
            details: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_primary_image(mut self, column: Option<String>) -> Self {
        self.primary_image = column;
        self
    }

    #[must_use]
    pub fn with_details(mut self, columns: Vec<String>) -> Self {
        self.details = columns;
        self
    }

    /// Every selected column must exist; detail columns may not repeat a selected column
    pub fn validate(&self, table: &SourceTable) -> Result<(), TableError> {
        let required = [Some(&self.primary_url), Some(&self.secondary_image), self.primary_image.as_ref()];
        for column in required.into_iter().flatten().chain(self.details.iter()) {
            if table.column_index(column).is_none() {
                return Err(TableError::UnknownColumn(column.clone()));
            }
        }
        Ok(())
    }

    /// Columns still available as detail columns
    pub fn detail_candidates(&self, table: &SourceTable) -> Vec<String> {
        table
            .headers()
            .iter()
            .filter(|h| {
                **h != self.primary_url
                    && **h != self.secondary_image
                    && self.primary_image.as_deref() != Some(h.as_str())
            })
            .cloned()
            .collect()
    }

    /// Detail columns with the selected image/URL columns removed
    pub fn effective_details(&self, table: &SourceTable) -> Vec<String> {
        let candidates = self.detail_candidates(table);
        self.details
            .iter()
            .filter(|c| candidates.contains(c))
            .cloned()
            .collect()
    }
}
