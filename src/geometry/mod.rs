//! Per-sheet source geometry
//!
//! Facts read once from the input file and never mutated: column widths,
//! row heights (both in points, in sheet order) and an existing print area.

pub mod reader;

use serde::{Deserialize, Serialize};

use crate::error::{Error, GeometryIssue, Result};

pub use reader::{GeometrySource, SourceFormat};

/// Rectangle of a sheet designated for printing (1-based, inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintArea {
    pub first_row: u32,
    pub last_row: u32,
    pub first_column: u32,
    pub last_column: u32,
}

/// Immutable geometry of one sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceGeometry {
    pub sheet_name: String,
    /// One width per in-use column, left to right
    pub column_widths: Vec<f64>,
    /// One height per in-use row, top to bottom
    pub row_heights: Vec<f64>,
    #[serde(default)]
    pub print_area: Option<PrintArea>,
}

impl SourceGeometry {
    pub fn new(sheet_name: impl Into<String>, column_widths: Vec<f64>, row_heights: Vec<f64>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            column_widths,
            row_heights,
            print_area: None,
        }
    }

    pub fn with_print_area(mut self, area: PrintArea) -> Self {
        self.print_area = Some(area);
        self
    }

    pub fn row_count(&self) -> usize {
        self.row_heights.len()
    }

    pub fn column_count(&self) -> usize {
        self.column_widths.len()
    }

    fn issue(&self, issue: GeometryIssue) -> Error {
        Error::geometry(&self.sheet_name, issue)
    }

    /// Check that the geometry can be planned
    ///
    /// Widths and heights must be finite and non-negative (zero is a hidden
    /// column or row), the columns must have some total width, and a print
    /// area must lie inside the sheet. A sheet without rows passes: it plans
    /// to no pages.
    pub fn validate(&self) -> Result<()> {
        if let Some((index, &height)) = self
            .row_heights
            .iter()
            .enumerate()
            .find(|(_, h)| !h.is_finite() || **h < 0.0)
        {
            return Err(self.issue(GeometryIssue::InvalidRowHeight { index: index + 1, height }));
        }

        if self.row_heights.is_empty() {
            return Ok(());
        }

        if let Some((index, &width)) = self
            .column_widths
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(self.issue(GeometryIssue::InvalidColumnWidth { index: index + 1, width }));
        }

        if self.column_widths.iter().sum::<f64>() <= 0.0 {
            return Err(self.issue(GeometryIssue::NoColumns));
        }

        if let Some(area) = self.print_area {
            let rows_ok = area.first_row >= 1
                && area.first_row <= area.last_row
                && area.last_row as usize <= self.row_count();
            let cols_ok = area.first_column >= 1
                && area.first_column <= area.last_column
                && area.last_column as usize <= self.column_count();
            if !rows_ok || !cols_ok {
                return Err(self.issue(GeometryIssue::PrintAreaOutOfBounds {
                    first_row: area.first_row,
                    last_row: area.last_row,
                    first_column: area.first_column,
                    last_column: area.last_column,
                }));
            }
        }

        Ok(())
    }
}
