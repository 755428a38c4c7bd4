//! Pagination over the loaded table.
//!
//! Pages are 1-based. Row identities never change with paging: page `p` simply
//! shows rows `(p - 1) * page_size .. min(total_rows, p * page_size)`.

use std::ops::Range;

use crate::domain::table::RowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    total_rows: usize,
    page_size: usize,
}

impl Pagination {
    /// A zero page size is treated as one row per page
    pub fn new(total_rows: usize, page_size: usize) -> Self {
        Self {
            total_rows,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    /// Always at least one page, even for an empty table
    pub fn total_pages(&self) -> usize {
        self.total_rows.div_ceil(self.page_size).max(1)
    }

    /// Clamp any requested page number into `1..=total_pages`
    pub fn clamp_page(&self, page: usize) -> usize {
        page.clamp(1, self.total_pages())
    }

    /// Row identities shown on `page` (after clamping)
    pub fn page_range(&self, page: usize) -> Range<RowId> {
        let page = self.clamp_page(page);
        let start = ((page - 1) * self.page_size).min(self.total_rows);
        let end = (start + self.page_size).min(self.total_rows);
        start..end
    }
}
