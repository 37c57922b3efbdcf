//! Pagination plan assembly
//!
//! A sheet moves forward through [`PlanStage`]s, one per component, and ends
//! with an immutable [`PaginationPlan`] that is handed to a renderer. Plans
//! are pure functions of their inputs: the same geometry and spec always
//! produce the same pages in the same order.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::columns::{plan_columns, ColumnFit};
use super::header::{synthesize, PageHeader};
use super::rows::{partition_rows, row_height_budget};
use super::IndexRange;
use crate::config::SheetLayoutSpec;
use crate::error::Result;
use crate::geometry::SourceGeometry;
use crate::layout::{Length, Margins, Orientation, PaperSize};

/// Where a sheet is in planning
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum PlanStage {
    Unresolved,
    ConfigResolved,
    GeometryRead,
    Planned,
    HeadersAttached,
    Final,
}

impl PlanStage {
    /// The following stage; `Final` stays put
    pub fn next(self) -> Self {
        match self {
            PlanStage::Unresolved => PlanStage::ConfigResolved,
            PlanStage::ConfigResolved => PlanStage::GeometryRead,
            PlanStage::GeometryRead => PlanStage::Planned,
            PlanStage::Planned => PlanStage::HeadersAttached,
            PlanStage::HeadersAttached | PlanStage::Final => PlanStage::Final,
        }
    }
}

impl fmt::Display for PlanStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlanStage::Unresolved => "unresolved",
            PlanStage::ConfigResolved => "config resolved",
            PlanStage::GeometryRead => "geometry read",
            PlanStage::Planned => "planned",
            PlanStage::HeadersAttached => "headers attached",
            PlanStage::Final => "final",
        };
        f.write_str(name)
    }
}

/// One physical PDF page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageDescriptor {
    pub sheet_name: String,
    pub row_range: IndexRange,
    pub column_range: IndexRange,
    pub scale: f64,
    pub orientation: Orientation,
    /// Name of the paper size the page was cut from
    pub paper: &'static str,
    pub page_width: Length,
    pub page_height: Length,
    pub margins: Margins,
    pub header: Option<PageHeader>,
}

impl PageDescriptor {
    /// Height of the rendered rows, in points
    pub fn content_height(&self) -> f64 {
        self.page_height.pt() - self.margins.vertical_pt()
    }

    /// Width available to the rendered columns, in points
    pub fn content_width(&self) -> f64 {
        self.page_width.pt() - self.margins.horizontal_pt()
    }
}

/// Whether a plan was synthesized or taken from the source's print setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    Synthesized,
    ExistingPrintArea,
}

/// Columns had to shrink past the legibility floor to fit the widest paper
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegibilityWarning {
    pub sheet: String,
    pub scale: f64,
    pub min_scale: f64,
    pub paper: &'static str,
}

impl fmt::Display for LegibilityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sheet '{}' is scaled to {:.2} on {} paper, below the legibility floor of {:.2}",
            self.sheet, self.scale, self.paper, self.min_scale
        )
    }
}

/// Pages for one sheet in reading order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaginationPlan {
    pub sheet_name: String,
    pub source: PlanSource,
    pub pages: Vec<PageDescriptor>,
    pub warnings: Vec<LegibilityWarning>,
}

impl PaginationPlan {
    fn empty(sheet_name: &str) -> Self {
        Self {
            sheet_name: sheet_name.to_string(),
            source: PlanSource::Synthesized,
            pages: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Build the pagination plan for one sheet
///
/// `file_name` is printed in the right header when metadata is enabled.
pub fn build(
    geometry: &SourceGeometry,
    spec: &SheetLayoutSpec,
    paper_candidates: &[PaperSize],
    file_name: &str,
) -> Result<PaginationPlan> {
    let mut stage = PlanStage::ConfigResolved;
    build_staged(geometry, spec, paper_candidates, file_name, &mut stage)
}

/// [`build`], recording in `stage` how far the sheet got
///
/// `stage` must be [`PlanStage::ConfigResolved`] on entry. On success it is
/// [`PlanStage::Final`]; on failure it is the last stage completed.
pub fn build_staged(
    geometry: &SourceGeometry,
    spec: &SheetLayoutSpec,
    paper_candidates: &[PaperSize],
    file_name: &str,
    stage: &mut PlanStage,
) -> Result<PaginationPlan> {
    debug_assert_eq!(*stage, PlanStage::ConfigResolved);

    geometry.validate()?;
    *stage = stage.next();

    let mut plan = lay_out(geometry, spec, paper_candidates)?;
    *stage = stage.next();

    for page in &mut plan.pages {
        page.header = synthesize(&page.sheet_name, page.row_range, file_name, spec.metadata_enabled);
    }
    *stage = stage.next();

    *stage = stage.next();
    info!(
        sheet = %plan.sheet_name,
        pages = plan.pages.len(),
        source = ?plan.source,
        "pagination plan ready"
    );
    Ok(plan)
}

fn lay_out(
    geometry: &SourceGeometry,
    spec: &SheetLayoutSpec,
    paper_candidates: &[PaperSize],
) -> Result<PaginationPlan> {
    let sheet = geometry.sheet_name.as_str();
    if geometry.row_count() == 0 {
        debug!(sheet, "sheet has no rows, nothing to paginate");
        return Ok(PaginationPlan::empty(sheet));
    }

    let margins = Margins::for_sheet(spec.metadata_enabled);

    if let (Some(area), false) = (geometry.print_area, spec.smart_layout) {
        let columns = IndexRange::new(area.first_column, area.last_column);
        let rows = IndexRange::new(area.first_row, area.last_row);
        let fit = plan_columns(
            &geometry.column_widths[columns.as_slice_range()],
            spec.orientation,
            paper_candidates,
            &margins,
            spec.min_scale,
        )?;
        debug!(sheet, %rows, %columns, "using the print area declared by the source");
        return Ok(PaginationPlan {
            sheet_name: sheet.to_string(),
            source: PlanSource::ExistingPrintArea,
            pages: vec![page(geometry, spec, &fit, &margins, rows, columns)],
            warnings: legibility(sheet, spec, &fit),
        });
    }

    let fit = plan_columns(
        &geometry.column_widths,
        spec.orientation,
        paper_candidates,
        &margins,
        spec.min_scale,
    )?;
    let budget = row_height_budget(fit.nominal_height, &margins, fit.scale);
    let columns = IndexRange::new(1, geometry.column_count() as u32);

    let pages = partition_rows(&geometry.row_heights, spec.row_policy, budget)
        .into_iter()
        .map(|rows| page(geometry, spec, &fit, &margins, rows, columns))
        .collect();

    Ok(PaginationPlan {
        sheet_name: sheet.to_string(),
        source: PlanSource::Synthesized,
        pages,
        warnings: legibility(sheet, spec, &fit),
    })
}

fn legibility(sheet: &str, spec: &SheetLayoutSpec, fit: &ColumnFit) -> Vec<LegibilityWarning> {
    if !fit.below_floor {
        return Vec::new();
    }
    let warning = LegibilityWarning {
        sheet: sheet.to_string(),
        scale: fit.scale,
        min_scale: spec.min_scale,
        paper: fit.paper.name,
    };
    warn!("{warning}");
    vec![warning]
}

/// Page cropped to the height of its rows
fn page(
    geometry: &SourceGeometry,
    spec: &SheetLayoutSpec,
    fit: &ColumnFit,
    margins: &Margins,
    rows: IndexRange,
    columns: IndexRange,
) -> PageDescriptor {
    let content: f64 = geometry.row_heights[rows.as_slice_range()].iter().sum::<f64>() * fit.scale;
    PageDescriptor {
        sheet_name: geometry.sheet_name.clone(),
        row_range: rows,
        column_range: columns,
        scale: fit.scale,
        orientation: spec.orientation,
        paper: fit.paper.name,
        page_width: fit.page_width,
        page_height: Length::from_pt(content + margins.vertical_pt()),
        margins: *margins,
        header: None,
    }
}
