//! Run summaries
//!
//! A [`RunReport`] collects what happened to every input of a run and can be
//! printed to the console or written as `summary_<timestamp>.txt` (plus an
//! `error_<timestamp>.txt` when anything failed) into a reports directory.
//! Failed inputs can be copied aside with [`RunReport::copy_failed_sources`].

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::batch::WorkbookPlan;
use crate::error::{Error, Result};
use crate::planner::PlanStage;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Page count and warnings for one planned sheet
#[derive(Debug, Clone, PartialEq)]
pub struct SheetSummary {
    pub name: String,
    pub pages: usize,
    pub paper: Option<&'static str>,
    pub scale: Option<f64>,
    pub warnings: Vec<String>,
}

/// A sheet that failed, flattened for reporting
#[derive(Debug, Clone, PartialEq)]
pub struct FailureSummary {
    pub sheet: String,
    pub stage: PlanStage,
    pub message: String,
}

/// Outcome for one input file
#[derive(Debug, Clone, PartialEq)]
pub struct FileSummary {
    pub path: PathBuf,
    pub sheets: Vec<SheetSummary>,
    pub failures: Vec<FailureSummary>,
    /// Rendered output and its page count, if the file was rendered
    pub output: Option<(PathBuf, usize)>,
}

/// Everything that happened during one run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started: DateTime<Local>,
    pub files: Vec<FileSummary>,
    /// Inputs that could not be read at all
    pub file_errors: Vec<(PathBuf, String)>,
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started: Local::now(),
            files: Vec::new(),
            file_errors: Vec::new(),
        }
    }

    /// Record a planned workbook, and where it was rendered to if it was
    pub fn record_workbook(&mut self, workbook: &WorkbookPlan, output: Option<(PathBuf, usize)>) {
        let sheets = workbook
            .in_workbook_order()
            .map(|sheet| {
                let first = sheet.plan.pages.first();
                SheetSummary {
                    name: sheet.plan.sheet_name.clone(),
                    pages: sheet.plan.pages.len(),
                    paper: first.map(|p| p.paper),
                    scale: first.map(|p| p.scale),
                    warnings: sheet.plan.warnings.iter().map(ToString::to_string).collect(),
                }
            })
            .collect();
        let failures = workbook
            .failures
            .iter()
            .map(|f| FailureSummary {
                sheet: f.sheet.clone(),
                stage: f.stage,
                message: f.error.to_string(),
            })
            .collect();

        self.files.push(FileSummary {
            path: workbook.path.clone(),
            sheets,
            failures,
            output,
        });
    }

    pub fn record_file_error(&mut self, path: &Path, error: &Error) {
        self.file_errors.push((path.to_path_buf(), error.to_string()));
    }

    pub fn sheet_count(&self) -> usize {
        self.files.iter().map(|f| f.sheets.len()).sum()
    }

    pub fn page_count(&self) -> usize {
        self.files.iter().flat_map(|f| &f.sheets).map(|s| s.pages).sum()
    }

    pub fn failure_count(&self) -> usize {
        self.file_errors.len() + self.files.iter().map(|f| f.failures.len()).sum::<usize>()
    }

    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }

    /// Write the summary (and the error log, if needed) into `dir`
    ///
    /// Returns the path of the summary file.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let stamp = self.started.format(TIMESTAMP_FORMAT);

        let summary_path = dir.join(format!("summary_{stamp}.txt"));
        fs::write(&summary_path, self.to_string())?;

        if self.has_failures() {
            let error_path = dir.join(format!("error_{stamp}.txt"));
            fs::write(&error_path, self.error_log())?;
            info!(path = %error_path.display(), "wrote error log");
        }

        info!(path = %summary_path.display(), "wrote run summary");
        Ok(summary_path)
    }

    /// Inputs with a file error or at least one failed sheet, in report order
    pub fn failed_sources(&self) -> Vec<&Path> {
        let mut sources: Vec<&Path> = Vec::new();
        let failed = self
            .file_errors
            .iter()
            .map(|(path, _)| path.as_path())
            .chain(self.files.iter().filter(|f| !f.failures.is_empty()).map(|f| f.path.as_path()));
        for path in failed {
            if !sources.contains(&path) {
                sources.push(path);
            }
        }
        sources
    }

    /// Copy every failed input that still exists into `dir` for a later retry
    ///
    /// Copies are named after the source file. A clash gets a `_2`, `_3`, ...
    /// suffix before the extension. Returns the paths written.
    pub fn copy_failed_sources(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut copied = Vec::new();
        for source in self.failed_sources() {
            if !source.is_file() {
                warn!(file = %source.display(), "failed input is gone, not copied");
                continue;
            }
            let Some(name) = source.file_name() else {
                continue;
            };
            fs::create_dir_all(dir)?;

            let mut target = dir.join(name);
            let mut n = 2;
            while target.exists() || copied.contains(&target) {
                let stem = Path::new(name).file_stem().unwrap_or(name).to_string_lossy();
                target = match Path::new(name).extension() {
                    Some(ext) => dir.join(format!("{stem}_{n}.{}", ext.to_string_lossy())),
                    None => dir.join(format!("{stem}_{n}")),
                };
                n += 1;
            }

            fs::copy(source, &target)?;
            info!(from = %source.display(), to = %target.display(), "copied failed input");
            copied.push(target);
        }
        Ok(copied)
    }

    /// One line per failed file or sheet
    pub fn error_log(&self) -> String {
        let mut log = String::new();
        for (path, message) in &self.file_errors {
            log.push_str(&format!("{}: {}\n", path.display(), message));
        }
        for file in &self.files {
            for failure in &file.failures {
                log.push_str(&format!(
                    "{} [{}] after {}: {}\n",
                    file.path.display(),
                    failure.sheet,
                    failure.stage,
                    failure.message
                ));
            }
        }
        log
    }
}

/// `1 page`, `3 pages`
pub fn counted(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run started {}", self.started.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(
            f,
            "Files: {}  Sheets: {}  Pages: {}  Failures: {}",
            self.files.len() + self.file_errors.len(),
            self.sheet_count(),
            self.page_count(),
            self.failure_count()
        )?;

        for file in &self.files {
            writeln!(f)?;
            write!(f, "{}", file.path.display())?;
            match &file.output {
                Some((output, pages)) => {
                    writeln!(f, " -> {} ({})", output.display(), counted(*pages, "page"))?
                }
                None => writeln!(f)?,
            }
            for sheet in &file.sheets {
                match (sheet.paper, sheet.scale) {
                    (Some(paper), Some(scale)) => writeln!(
                        f,
                        "  {}: {} on {} at {:.0}%",
                        sheet.name,
                        counted(sheet.pages, "page"),
                        paper,
                        scale * 100.0
                    )?,
                    _ => writeln!(f, "  {}: empty", sheet.name)?,
                }
                for warning in &sheet.warnings {
                    writeln!(f, "    warning: {warning}")?;
                }
            }
            for failure in &file.failures {
                writeln!(f, "  {}: FAILED after {}: {}", failure.sheet, failure.stage, failure.message)?;
            }
        }

        for (path, message) in &self.file_errors {
            writeln!(f)?;
            writeln!(f, "{}: FAILED: {}", path.display(), message)?;
        }
        Ok(())
    }
}
