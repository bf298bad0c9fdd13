use crate::error::{Result, StatementError};
use crate::schema::{Cell, RawSheet};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::ops::Range;

const START_MARKERS: [&str; 2] = ["date", "narration"];
const END_MARKER: &str = "statement summary";

/// Row span of the transaction table inside a raw sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRegion {
    /// Row holding the column titles
    pub header_row: usize,
    /// First transaction row
    pub start: usize,
    /// One past the last transaction row
    pub end: usize,
    /// Row holding the summary marker, if the statement had one
    pub summary_row: Option<usize>,
}

impl TableRegion {
    pub fn rows(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn is_header_row(row: &[Cell]) -> bool {
    let labels: Vec<String> = row
        .iter()
        .filter_map(Cell::to_text)
        .map(|s| s.to_lowercase())
        .collect();
    START_MARKERS
        .iter()
        .all(|marker| labels.iter().any(|label| label == marker))
}

/// Finds the first Date/Narration header row and the first summary marker
/// after it. Without a summary marker the table runs to the end of the sheet.
pub fn locate_transaction_table(sheet: &RawSheet) -> Result<TableRegion> {
    let header_row = sheet
        .rows()
        .iter()
        .position(|row| is_header_row(row))
        .ok_or(StatementError::TableNotFound)?;

    let summary_row = (header_row + 1..sheet.len())
        .find(|&idx| sheet.row_text(idx).to_lowercase().contains(END_MARKER));

    if summary_row.is_none() {
        debug!("No summary marker found; transaction table extends to end of sheet");
    }

    let region = TableRegion {
        header_row,
        start: header_row + 1,
        end: summary_row.unwrap_or(sheet.len()),
        summary_row,
    };

    info!(
        "Transaction table located at rows {}..{} ({} rows)",
        region.start,
        region.end,
        region.len()
    );

    Ok(region)
}
