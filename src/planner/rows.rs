//! Row partitioning into pages

use crate::config::RowPolicy;
use crate::layout::{printable_height, Length, Margins};

use super::IndexRange;

/// Source row height that fits on one page once rendered at `scale`
///
/// This is the printable height of the uncropped paper divided by the
/// column scale, so rows shrink exactly as much as the columns do.
pub fn row_height_budget(nominal_height: Length, margins: &Margins, scale: f64) -> f64 {
    printable_height(nominal_height, margins) / scale
}

/// Split `heights.len()` rows into consecutive 1-based page ranges
///
/// The ranges are contiguous, never overlap and cover every row once, in
/// order. No rows gives no ranges. `budget` is only consulted by
/// [`RowPolicy::Automatic`].
pub fn partition_rows(heights: &[f64], policy: RowPolicy, budget: f64) -> Vec<IndexRange> {
    let total = heights.len() as u32;
    if total == 0 {
        return Vec::new();
    }

    match policy {
        RowPolicy::FitAllRowsOnOnePage => vec![IndexRange::new(1, total)],
        RowPolicy::FixedRowsPerPage(n) => {
            let n = n.get();
            (0..total.div_ceil(n))
                .map(|page| IndexRange::new(page * n + 1, ((page + 1) * n).min(total)))
                .collect()
        }
        RowPolicy::Automatic => {
            let mut ranges = Vec::new();
            let mut first = 1u32;
            let mut used = 0.0;
            for (i, &height) in heights.iter().enumerate() {
                let row = i as u32 + 1;
                // A row taller than the budget still gets a page of its own
                if row > first && used + height > budget {
                    ranges.push(IndexRange::new(first, row - 1));
                    first = row;
                    used = 0.0;
                }
                used += height;
            }
            ranges.push(IndexRange::new(first, total));
            ranges
        }
    }
}
