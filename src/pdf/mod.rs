//! PDF output: the renderer boundary and reading rendered files back

pub mod metadata;
pub mod render;

// Re-export commonly used items
pub use metadata::{count_pages, inspect_pdf, PdfSummary};
pub use render::{LayoutProofRenderer, OutputLayout, PageRenderer};
