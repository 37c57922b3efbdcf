//! doc2pdf layout library
//!
//! Plans how spreadsheet sheets are paginated before they are exported to PDF.
//! This library provides functionality to:
//! - Resolve per-sheet layout settings from defaults and pattern rules
//! - Read sheet geometry (column widths, row heights, print areas)
//! - Pick a paper size and scale so every column fits on one page width
//! - Split rows into pages and attach sheet | rows | file headers
//! - Plan many sheets concurrently and render layout proofs with lopdf
//!
//! # Example
//!
//! ```no_run
//! use doc2pdf_layout::batch::BatchPlanner;
//! use doc2pdf_layout::config::LayoutConfig;
//! use doc2pdf_layout::geometry::GeometrySource;
//! use std::path::Path;
//!
//! let config = LayoutConfig::load(Path::new("config.yml")).expect("bad config");
//! let planner = BatchPlanner::new(config, None).expect("no worker pool");
//! let source = GeometrySource::open(Path::new("report.xlsx")).expect("unsupported input");
//! let workbook = planner.plan_source(&source).expect("planning failed");
//! println!("{} pages", workbook.page_count());
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod pdf;
pub mod planner;
pub mod report;

// Re-export commonly used items
pub use error::{Error, Result};
