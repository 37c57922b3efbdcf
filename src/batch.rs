//! Planning every sheet of a workbook on a bounded worker pool
//!
//! Reading geometry is the only blocking step and happens up front. Every
//! sheet's layout is then resolved before any planning starts, so a
//! configuration error aborts the run without emitting partial plans. The
//! sheets themselves are independent: a geometry error fails that sheet
//! alone and the rest still plan.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use rayon::ThreadPool;
use serde::Serialize;
use tracing::{error, info};

use crate::config::{LayoutConfig, SheetLayoutSpec};
use crate::error::{Error, GeometryIssue, Result};
use crate::geometry::{GeometrySource, SourceGeometry};
use crate::layout::{paper_ladder, PaperSize};
use crate::planner::{build_staged, PaginationPlan, PlanStage};

/// A planned sheet together with the inputs it was planned from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetPlan {
    pub geometry: SourceGeometry,
    pub spec: SheetLayoutSpec,
    pub plan: PaginationPlan,
}

/// A sheet that could not be planned
#[derive(Debug)]
pub struct SheetFailure {
    pub path: PathBuf,
    pub sheet: String,
    /// Last stage the sheet completed
    pub stage: PlanStage,
    pub error: Error,
}

/// Plans for every sheet of one source file
#[derive(Debug, Default)]
pub struct WorkbookPlan {
    pub path: PathBuf,
    pub sheets: BTreeMap<String, SheetPlan>,
    /// Sheet names in workbook order
    pub order: Vec<String>,
    pub failures: Vec<SheetFailure>,
}

impl WorkbookPlan {
    /// Planned sheets in workbook order
    pub fn in_workbook_order(&self) -> impl Iterator<Item = &SheetPlan> {
        self.order.iter().filter_map(|name| self.sheets.get(name))
    }

    pub fn page_count(&self) -> usize {
        self.sheets.values().map(|s| s.plan.pages.len()).sum()
    }
}

/// Plans workbooks against one configuration
pub struct BatchPlanner {
    config: LayoutConfig,
    paper: Vec<PaperSize>,
    pool: ThreadPool,
}

impl BatchPlanner {
    /// `jobs` bounds the worker pool; `None` uses the available parallelism
    pub fn new(config: LayoutConfig, jobs: Option<usize>) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs.unwrap_or(0))
            .thread_name(|i| format!("sheet-planner-{i}"))
            .build()
            .map_err(|e| Error::General(format!("failed to start worker pool: {e}")))?;
        Ok(Self {
            config,
            paper: paper_ladder(),
            pool,
        })
    }

    /// Replace the paper ladder tried by the column planner
    pub fn with_paper(mut self, paper: Vec<PaperSize>) -> Self {
        self.paper = paper;
        self
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Read a source file and plan all of its sheets
    pub fn plan_source(&self, source: &GeometrySource) -> Result<WorkbookPlan> {
        let sheets = source.read_sheets()?;
        self.plan_geometries(source.path(), sheets)
    }

    /// Plan sheets whose geometry has already been read from `path`
    pub fn plan_geometries(&self, path: &Path, sheets: Vec<SourceGeometry>) -> Result<WorkbookPlan> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        // A later sheet reusing a name would overwrite the earlier plan
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        let mut selected = Vec::new();
        for geometry in sheets {
            if !self.config.selects_sheet(&geometry.sheet_name) {
                continue;
            }
            if seen.insert(geometry.sheet_name.clone()) {
                selected.push(geometry);
            } else {
                error!(file = %path.display(), sheet = %geometry.sheet_name, "duplicate sheet name");
                duplicates.push(SheetFailure {
                    path: path.to_path_buf(),
                    error: Error::geometry(&geometry.sheet_name, GeometryIssue::DuplicateSheetName),
                    sheet: geometry.sheet_name,
                    stage: PlanStage::Unresolved,
                });
            }
        }
        let order: Vec<String> = selected.iter().map(|g| g.sheet_name.clone()).collect();

        // Resolve everything first: a config error must not leave partial plans behind
        let resolved = selected
            .into_iter()
            .map(|geometry| {
                let spec = self.config.resolve_sheet(path, &geometry.sheet_name)?;
                Ok((geometry, spec))
            })
            .collect::<Result<Vec<_>>>()?;

        let outcomes: Vec<std::result::Result<SheetPlan, SheetFailure>> = self.pool.install(|| {
            resolved
                .into_par_iter()
                .map(|(geometry, spec)| self.plan_sheet(path, &file_name, geometry, spec))
                .collect()
        });

        let mut workbook = WorkbookPlan {
            path: path.to_path_buf(),
            order,
            failures: duplicates,
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                Ok(sheet) => {
                    workbook.sheets.insert(sheet.plan.sheet_name.clone(), sheet);
                }
                Err(failure) => workbook.failures.push(failure),
            }
        }

        info!(
            file = %path.display(),
            sheets = workbook.sheets.len(),
            pages = workbook.page_count(),
            failed = workbook.failures.len(),
            "planned workbook"
        );
        Ok(workbook)
    }

    fn plan_sheet(
        &self,
        path: &Path,
        file_name: &str,
        geometry: SourceGeometry,
        spec: SheetLayoutSpec,
    ) -> std::result::Result<SheetPlan, SheetFailure> {
        let mut stage = PlanStage::Unresolved.next();
        match build_staged(&geometry, &spec, &self.paper, file_name, &mut stage) {
            Ok(plan) => Ok(SheetPlan { geometry, spec, plan }),
            Err(e) => {
                error!(
                    file = %path.display(),
                    sheet = %geometry.sheet_name,
                    %stage,
                    error = %e,
                    "sheet planning failed"
                );
                Err(SheetFailure {
                    path: path.to_path_buf(),
                    sheet: geometry.sheet_name,
                    stage,
                    error: e,
                })
            }
        }
    }
}
