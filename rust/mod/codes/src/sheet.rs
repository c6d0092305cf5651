//! Printable sheets: unused codes laid out on a fixed grid, page by page.

use serde::{Deserialize, Serialize};

use crate::error::CodeError;
use crate::model::CodeEntry;

/// Grid dimensions of one printed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetLayout {
    pub columns: usize,
    pub rows: usize,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            columns: 4,
            rows: 5,
        }
    }
}

/// One grid position holding a code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetCell {
    pub row: usize,
    pub column: usize,
    pub id: String,
}

/// One page; `number` starts at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetPage {
    pub number: usize,
    pub cells: Vec<SheetCell>,
}

impl SheetLayout {
    pub fn validate(&self) -> Result<(), CodeError> {
        if self.columns == 0 || self.rows == 0 {
            return Err(CodeError::Validation(format!(
                "sheet layout must be at least 1x1, got {}x{}",
                self.columns, self.rows
            )));
        }
        if self.columns.checked_mul(self.rows).is_none() {
            return Err(CodeError::Validation(format!(
                "sheet layout {}x{} is too large",
                self.columns, self.rows
            )));
        }
        Ok(())
    }

    pub fn cells_per_page(&self) -> usize {
        self.columns.saturating_mul(self.rows)
    }

    /// Lay out the unused entries in order, row-major, filling each page
    /// before starting the next. Used entries are skipped.
    pub fn paginate(&self, entries: &[CodeEntry]) -> Vec<SheetPage> {
        let per_page = self.cells_per_page().max(1);
        let columns = self.columns.max(1);
        let unused: Vec<&CodeEntry> = entries.iter().filter(|e| !e.is_used()).collect();

        unused
            .chunks(per_page)
            .enumerate()
            .map(|(page, chunk)| SheetPage {
                number: page + 1,
                cells: chunk
                    .iter()
                    .enumerate()
                    .map(|(i, entry)| SheetCell {
                        row: i / columns,
                        column: i % columns,
                        id: entry.id.clone(),
                    })
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;

    fn entries(n: usize) -> Vec<CodeEntry> {
        (0..n)
            .map(|i| CodeEntry::unused(format!("CODE{:04}", i), "B1".into(), Utc::now()))
            .collect()
    }

    #[test]
    fn default_layout_is_four_by_five() {
        let layout = SheetLayout::default();
        assert_eq!(layout.cells_per_page(), 20);
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn fills_pages_row_major() {
        let pages = SheetLayout::default().paginate(&entries(45));
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].number, 1);
        assert_eq!(pages[0].cells.len(), 20);
        assert_eq!(pages[2].cells.len(), 5);

        let cell = &pages[0].cells[5];
        assert_eq!((cell.row, cell.column), (1, 1));
        assert_eq!(cell.id, "CODE0005");

        let last = pages[0].cells.last().unwrap();
        assert_eq!((last.row, last.column), (4, 3));
        assert_eq!(pages[1].cells[0].id, "CODE0020");
        assert_eq!((pages[1].cells[0].row, pages[1].cells[0].column), (0, 0));
    }

    #[test]
    fn used_entries_are_not_printed() {
        let mut list = entries(3);
        list[1] = list[1].redeemed_at(Utc::now());
        let pages = SheetLayout::default().paginate(&list);
        let ids: Vec<&str> = pages[0].cells.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["CODE0000", "CODE0002"]);
        assert_eq!((pages[0].cells[1].row, pages[0].cells[1].column), (0, 1));
    }

    #[test]
    fn empty_input_has_no_pages() {
        assert!(SheetLayout::default().paginate(&[]).is_empty());
    }

    #[test]
    fn zero_sized_layout_is_invalid() {
        let layout = SheetLayout { columns: 0, rows: 5 };
        assert!(layout.validate().is_err());
    }

    #[test]
    fn overflowing_layout_is_invalid() {
        let layout = SheetLayout {
            columns: usize::MAX,
            rows: 2,
        };
        assert!(matches!(layout.validate(), Err(CodeError::Validation(_))));
        assert_eq!(layout.cells_per_page(), usize::MAX);
    }
}
