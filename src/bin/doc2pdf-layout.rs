//! doc2pdf-layout CLI tool
//!
//! Plans spreadsheet pagination and renders layout proofs.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use glob::{glob, Pattern};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use doc2pdf_layout::batch::{BatchPlanner, SheetPlan, WorkbookPlan};
use doc2pdf_layout::config::file::CONFIG_FILE;
use doc2pdf_layout::config::LayoutConfig;
use doc2pdf_layout::geometry::reader::is_supported;
use doc2pdf_layout::geometry::GeometrySource;
use doc2pdf_layout::pdf::{inspect_pdf, LayoutProofRenderer, OutputLayout, PageRenderer};
use doc2pdf_layout::planner::PlanStage;
use doc2pdf_layout::report::{counted, RunReport};

/// doc2pdf-layout - Smart page layout for spreadsheet to PDF conversion
#[derive(Parser)]
#[command(name = "doc2pdf-layout")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Show how every sheet of a workbook will be paginated
    doc2pdf-layout plan report.xlsx

    # Plan a whole directory with a specific config, as JSON
    doc2pdf-layout plan --config layouts.yml --json input/

    # Render layout proofs and keep a run summary
    doc2pdf-layout render -o out --report-dir reports \"input/*.xlsx\"

    # Render a directory tree, mirroring its subdirectories under out/
    doc2pdf-layout render -o out --errors-dir errors input/

    # Check a rendered file
    doc2pdf-layout info out/report.pdf")]
struct Cli {
    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the pagination plan of every sheet
    Plan {
        /// Input files or directories. Supports glob patterns like "*.xlsx"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Layout configuration (defaults to ./config.yml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Maximum number of sheets planned at once
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Print plans as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render a layout proof PDF for every input
    Render {
        /// Input files or directories. Supports glob patterns like "*.xlsx"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output directory for the PDFs
        #[arg(short, long)]
        output: PathBuf,

        /// Layout configuration (defaults to ./config.yml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Maximum number of sheets planned at once
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Write summary_<timestamp>.txt into this directory
        #[arg(long)]
        report_dir: Option<PathBuf>,

        /// Copy inputs that failed into this directory
        #[arg(long)]
        errors_dir: Option<PathBuf>,
    },

    /// Show page count and page sizes of a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Plan {
            inputs,
            config,
            jobs,
            json,
        } => cmd_plan(inputs, config, jobs, json),
        Commands::Render {
            inputs,
            output,
            config,
            jobs,
            report_dir,
            errors_dir,
        } => cmd_render(inputs, output, config, jobs, report_dir, errors_dir),
        Commands::Info { input } => cmd_info(input).map(|()| true),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<LayoutConfig> {
    match path {
        Some(path) => {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            LayoutConfig::load(&path).with_context(|| format!("loading {}", path.display()))
        }
        None => LayoutConfig::load(Path::new(CONFIG_FILE)).context("loading config.yml"),
    }
}

/// An input file and its path below the directory it was found in
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct InputFile {
    path: PathBuf,
    /// Directory inputs keep their subdirectories, everything else is just the file name
    relative: PathBuf,
}

impl InputFile {
    fn flat(path: PathBuf) -> Self {
        let relative = path.file_name().map(PathBuf::from).unwrap_or_else(|| path.clone());
        Self { path, relative }
    }

    fn under(root: &Path, path: PathBuf) -> Self {
        match path.strip_prefix(root) {
            Ok(relative) => Self {
                relative: relative.to_path_buf(),
                path,
            },
            Err(_) => Self::flat(path),
        }
    }
}

/// Expand directories and glob patterns into a sorted list of input files
fn expand_inputs(inputs: Vec<String>) -> Result<Vec<InputFile>> {
    let mut files = Vec::new();

    for input in inputs {
        let as_path = PathBuf::from(&input);
        if as_path.is_dir() {
            let pattern = format!("{}/**/*", Pattern::escape(&as_path.to_string_lossy()));
            for entry in glob(&pattern)? {
                match entry {
                    Ok(path) if path.is_file() && is_supported(&path) && !is_config_file(&path) => {
                        files.push(InputFile::under(&as_path, path))
                    }
                    Ok(_) => {}
                    Err(e) => warn!("glob error under {}: {}", input, e),
                }
            }
        } else if input.contains('*') || input.contains('?') || input.contains('[') {
            let mut matched = false;
            for entry in glob(&input)? {
                match entry {
                    Ok(path) => {
                        files.push(InputFile::flat(path));
                        matched = true;
                    }
                    Err(e) => warn!("glob error for {}: {}", input, e),
                }
            }
            if !matched {
                bail!("No files matched pattern: {}", input);
            }
        } else {
            files.push(InputFile::flat(as_path));
        }
    }

    // Sort paths for consistent ordering
    files.sort();
    files.dedup_by(|a, b| a.path == b.path);

    Ok(files)
}

fn is_config_file(path: &Path) -> bool {
    path.file_name().is_some_and(|n| n == CONFIG_FILE)
}

/// Plan every input, stopping the run only on configuration errors
fn plan_all<F>(planner: &BatchPlanner, inputs: &[InputFile], report: &mut RunReport, mut on_plan: F) -> Result<()>
where
    F: FnMut(&InputFile, WorkbookPlan, &mut RunReport) -> Result<()>,
{
    for input in inputs {
        let path = &input.path;
        let planned = GeometrySource::open(path).and_then(|source| planner.plan_source(&source));
        match planned {
            Ok(workbook) => on_plan(input, workbook, report)?,
            Err(e) if e.is_config() => {
                return Err(e).with_context(|| format!("resolving layout for {}", path.display()))
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping input");
                report.record_file_error(path, &e);
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonWorkbook<'a> {
    path: &'a Path,
    sheets: Vec<&'a SheetPlan>,
    failures: Vec<JsonFailure>,
}

#[derive(Serialize)]
struct JsonFailure {
    sheet: String,
    stage: PlanStage,
    error: String,
}

/// Print pagination plans
fn cmd_plan(inputs: Vec<String>, config: Option<PathBuf>, jobs: Option<usize>, json: bool) -> Result<bool> {
    let inputs = expand_inputs(inputs)?;
    let planner = BatchPlanner::new(load_config(config)?, jobs)?;
    let mut report = RunReport::new();
    let mut workbooks = Vec::new();

    plan_all(&planner, &inputs, &mut report, |_, workbook, report| {
        report.record_workbook(&workbook, None);
        workbooks.push(workbook);
        Ok(())
    })?;

    if json {
        let out: Vec<JsonWorkbook> = workbooks
            .iter()
            .map(|w| JsonWorkbook {
                path: &w.path,
                sheets: w.in_workbook_order().collect(),
                failures: w
                    .failures
                    .iter()
                    .map(|f| JsonFailure {
                        sheet: f.sheet.clone(),
                        stage: f.stage,
                        error: f.error.to_string(),
                    })
                    .collect(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for workbook in &workbooks {
            print_workbook(workbook);
        }
        eprintln!();
        eprint!("{report}");
    }

    Ok(!report.has_failures())
}

fn print_workbook(workbook: &WorkbookPlan) {
    println!("{}", workbook.path.display());
    for sheet in workbook.in_workbook_order() {
        if sheet.plan.is_empty() {
            println!("  {}: no pages", sheet.plan.sheet_name);
            continue;
        }
        for (i, page) in sheet.plan.pages.iter().enumerate() {
            println!(
                "  {:<20} page {:>3}  rows {:<11} cols {:<7} {} {:<9} {:>6.1} x {:>6.1} pt  scale {:>3.0}%",
                page.sheet_name,
                i + 1,
                page.row_range.to_string(),
                page.column_range.to_string(),
                page.paper,
                page.orientation.to_string(),
                page.page_width.pt(),
                page.page_height.pt(),
                page.scale * 100.0
            );
        }
        for warning in &sheet.plan.warnings {
            println!("  warning: {warning}");
        }
    }
    for failure in &workbook.failures {
        println!("  {}: failed after {}: {}", failure.sheet, failure.stage, failure.error);
    }
}

/// Render layout proofs
fn cmd_render(
    inputs: Vec<String>,
    output: PathBuf,
    config: Option<PathBuf>,
    jobs: Option<usize>,
    report_dir: Option<PathBuf>,
    errors_dir: Option<PathBuf>,
) -> Result<bool> {
    let inputs = expand_inputs(inputs)?;
    let planner = BatchPlanner::new(load_config(config)?, jobs)?;
    let renderer = LayoutProofRenderer::default();
    let mut report = RunReport::new();

    std::fs::create_dir_all(&output)
        .with_context(|| format!("creating output directory {}", output.display()))?;

    eprintln!("Rendering {}...", counted(inputs.len(), "input file"));

    let mut layout = OutputLayout::new(&output);
    plan_all(&planner, &inputs, &mut report, |input, workbook, report| {
        let target = match layout.claim(&input.path, &input.relative) {
            Ok(target) => target,
            Err(e) => {
                warn!(file = %input.path.display(), error = %e, "not rendered");
                report.record_workbook(&workbook, None);
                report.record_file_error(&input.path, &e);
                return Ok(());
            }
        };

        match renderer.render(&workbook, &target) {
            Ok(0) => report.record_workbook(&workbook, None),
            Ok(pages) => {
                info!(output = %target.display(), pages, "rendered");
                report.record_workbook(&workbook, Some((target, pages)));
            }
            Err(e) => {
                report.record_workbook(&workbook, None);
                report.record_file_error(&workbook.path, &e);
            }
        }
        Ok(())
    })?;

    eprint!("{report}");

    if let Some(dir) = report_dir {
        let summary = report
            .write_to(&dir)
            .with_context(|| format!("writing report to {}", dir.display()))?;
        eprintln!("Summary: {}", summary.display());
    }

    if let Some(dir) = errors_dir {
        let copied = report
            .copy_failed_sources(&dir)
            .with_context(|| format!("copying failed inputs to {}", dir.display()))?;
        if !copied.is_empty() {
            eprintln!("Copied {} to {}", counted(copied.len(), "failed input"), dir.display());
        }
    }

    Ok(!report.has_failures())
}

/// Show information about a PDF
fn cmd_info(input: PathBuf) -> Result<()> {
    let summary = inspect_pdf(&input).with_context(|| format!("reading {}", input.display()))?;

    println!("File: {}", input.display());
    if let Some(title) = &summary.title {
        println!("Title: {title}");
    }
    println!("Pages: {}", summary.page_count);
    for (i, (width, height)) in summary.page_sizes.iter().enumerate() {
        println!(
            "  page {:>3}: {:.1} x {:.1} pt ({:.2} x {:.2} in)",
            i + 1,
            width,
            height,
            width / 72.0,
            height / 72.0
        );
    }

    Ok(())
}
