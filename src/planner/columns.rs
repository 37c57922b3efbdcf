//! Column fit planning
//!
//! Every column must fit across the page. The planner walks the paper
//! ladder from the smallest size and stops at the first one that needs no
//! more shrinking than the legibility floor allows. Columns are never
//! enlarged: a sheet narrower than the paper keeps scale 1 and the page is
//! trimmed to the content width instead.

use tracing::debug;

use crate::error::{Error, Result};
use crate::layout::{printable_width, Length, Margins, Orientation, PaperSize};

/// Outcome of column planning, shared by every page of a sheet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnFit {
    /// Factor applied to column widths, in (0, 1]
    pub scale: f64,
    pub paper: PaperSize,
    /// Physical page width (paper width, or less when the content is narrower)
    pub page_width: Length,
    /// Paper height in the chosen orientation, before any cropping
    pub nominal_height: Length,
    /// The scale fell below the legibility floor on the largest paper
    pub below_floor: bool,
}

fn scale_for(total_width: f64, printable: f64) -> f64 {
    if total_width <= printable || total_width <= 0.0 {
        1.0
    } else {
        printable / total_width
    }
}

/// Choose a paper size and horizontal scale for the given columns
///
/// `candidates` are tried in order; the first whose scale stays at or above
/// `min_scale` wins. When none does, the widest candidate is used and the
/// result is flagged `below_floor`: fitting every column is mandatory,
/// legibility is best effort.
pub fn plan_columns(
    widths: &[f64],
    orientation: Orientation,
    candidates: &[PaperSize],
    margins: &Margins,
    min_scale: f64,
) -> Result<ColumnFit> {
    let total: f64 = widths.iter().sum();

    let fit_on = |paper: &PaperSize, below_floor: bool| {
        let dims = paper.oriented(orientation);
        let scale = scale_for(total, printable_width(dims.width, margins));
        let content = total * scale + margins.horizontal_pt();
        ColumnFit {
            scale,
            paper: *paper,
            page_width: Length::from_pt(content.min(dims.width.pt())),
            nominal_height: dims.height,
            below_floor,
        }
    };

    let chosen = candidates
        .iter()
        .map(|paper| fit_on(paper, false))
        .find(|fit| fit.scale >= min_scale);

    let fit = match chosen {
        Some(fit) => fit,
        None => {
            let widest = candidates
                .iter()
                .max_by(|a, b| {
                    let wa = a.oriented(orientation).width.pt();
                    let wb = b.oriented(orientation).width.pt();
                    wa.total_cmp(&wb)
                })
                .ok_or(Error::NoPaperCandidates)?;
            fit_on(widest, true)
        }
    };

    debug!(
        total_width = total,
        paper = fit.paper.name,
        scale = fit.scale,
        page_width_pt = fit.page_width.pt(),
        "planned columns"
    );

    Ok(fit)
}
