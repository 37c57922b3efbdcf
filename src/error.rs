//! Error types for the layout planner

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// What is wrong with a sheet's extracted geometry
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryIssue {
    #[error("sheet has no columns")]
    NoColumns,

    #[error("column {index} has invalid width {width}")]
    InvalidColumnWidth { index: usize, width: f64 },

    #[error("row {index} has invalid height {height}")]
    InvalidRowHeight { index: usize, height: f64 },

    #[error("another sheet in the same file is already named like this")]
    DuplicateSheetName,

    #[error("print area rows {first_row}-{last_row}, columns {first_column}-{last_column} lies outside the sheet")]
    PrintAreaOutOfBounds {
        first_row: u32,
        last_row: u32,
        first_column: u32,
        last_column: u32,
    },
}

/// Main error type for the layout planner
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration could not be loaded or holds an unrecognized value
    #[error("Config error: {0}")]
    Config(String),

    /// Global defaults handed to the resolver are not total
    #[error("Config error: global defaults are missing `{field}`")]
    IncompleteDefaults { field: &'static str },

    /// Invalid glob pattern
    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(String),

    /// The sheet's geometry cannot be planned
    #[error("Geometry error in sheet '{sheet}': {issue}")]
    Geometry { sheet: String, issue: GeometryIssue },

    /// Column planning was asked to choose from an empty paper ladder
    #[error("No paper sizes to choose from")]
    NoPaperCandidates,

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Input is neither a spreadsheet nor a geometry manifest
    #[error("Unsupported input format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Two inputs would be rendered to the same output file
    #[error("Output {} is already taken by {}", .output.display(), .taken_by.display())]
    OutputCollision { output: PathBuf, taken_by: PathBuf },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Spreadsheet could not be read
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Errors that abort a whole run rather than a single sheet
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::IncompleteDefaults { .. } | Error::InvalidGlob(_)
        )
    }

    pub(crate) fn geometry(sheet: &str, issue: GeometryIssue) -> Self {
        Error::Geometry {
            sheet: sheet.to_string(),
            issue,
        }
    }
}
