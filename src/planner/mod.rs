//! Smart page layout synthesis
//!
//! Data flows one way: the column planner picks a paper size and scale, the
//! row partitioner splits rows into pages using that scale, headers are
//! synthesized per page and the builder assembles the pagination plan.

pub mod builder;
pub mod columns;
pub mod header;
pub mod rows;

use serde::Serialize;
use std::fmt;

pub use builder::{
    build, build_staged, LegibilityWarning, PageDescriptor, PaginationPlan, PlanSource, PlanStage,
};
pub use columns::{plan_columns, ColumnFit};
pub use header::{synthesize, PageHeader};
pub use rows::{partition_rows, row_height_budget};

/// Inclusive 1-based span of rows or columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct IndexRange {
    pub first: u32,
    pub last: u32,
}

impl IndexRange {
    pub fn new(first: u32, last: u32) -> Self {
        Self { first, last }
    }

    pub fn len(&self) -> usize {
        (self.last - self.first + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Zero-based slice bounds into a per-index vector
    pub fn as_slice_range(&self) -> std::ops::Range<usize> {
        (self.first as usize - 1)..(self.last as usize)
    }
}

impl fmt::Display for IndexRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.first, self.last)
    }
}
