//! Integration tests for the doc2pdf layout library

use doc2pdf_layout::batch::{BatchPlanner, WorkbookPlan};
use doc2pdf_layout::config::{LayoutConfig, RowPolicy, SheetLayoutSpec};
use doc2pdf_layout::geometry::{GeometrySource, SourceGeometry};
use doc2pdf_layout::layout::{paper_ladder, printable_width, Margins, Orientation};
use doc2pdf_layout::pdf::{count_pages, inspect_pdf, LayoutProofRenderer, OutputLayout, PageRenderer};
use doc2pdf_layout::planner::{build, PlanSource};
use doc2pdf_layout::Error;
use pretty_assertions::assert_eq;
use rust_xlsxwriter::Workbook;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FINANCE_CONFIG: &str = r#"
defaults:
  orientation: portrait
  row_dimensions: null
  metadata: true

rules:
  - sheet_name: Summary
    priority: 5
    settings:
      orientation: landscape
  - pattern: "*finance*"
    priority: 1
    settings:
      row_dimensions: 10
  - sheet_name: "CONFIDENTIAL*"
    priority: 10
    settings:
      metadata: false
"#;

const FINANCE_MANIFEST: &str = r#"
sheets:
  - name: Summary
    column_widths: [64, 120, 80, 80]
    row_count: 25
  - name: CONFIDENTIAL notes
    column_widths: [200]
    row_heights: [15, 30, 15]
  - name: Scratch
    column_widths: [48]
    row_count: 4
    hidden: true
  - name: Empty
    column_widths: []
    row_heights: []
"#;

/// Write `contents` to `dir/name`, creating parent directories
fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, contents).unwrap();
    path
}

fn plan_manifest(dir: &TempDir) -> WorkbookPlan {
    let config_path = write_file(dir.path(), "config.yml", FINANCE_CONFIG);
    let manifest = write_file(dir.path(), "finance/q1.yml", FINANCE_MANIFEST);

    let config = LayoutConfig::load(&config_path).unwrap();
    let planner = BatchPlanner::new(config, Some(2)).unwrap();
    let source = GeometrySource::open(&manifest).unwrap();
    planner.plan_source(&source).unwrap()
}

fn spec(orientation: Orientation, row_policy: RowPolicy) -> SheetLayoutSpec {
    SheetLayoutSpec {
        orientation,
        row_policy,
        metadata_enabled: true,
        min_scale: 0.8,
        smart_layout: false,
    }
}

fn fixed(n: u32) -> RowPolicy {
    RowPolicy::FixedRowsPerPage(NonZeroU32::new(n).unwrap())
}

#[test]
fn test_config_rules_resolve_per_field() {
    let dir = TempDir::new().unwrap();
    let workbook = plan_manifest(&dir);

    // Hidden sheets never reach the planner
    assert_eq!(workbook.order, vec!["Summary", "CONFIDENTIAL notes", "Empty"]);
    assert!(workbook.failures.is_empty());

    let summary = &workbook.sheets["Summary"];
    assert_eq!(summary.spec.orientation, Orientation::Landscape);
    assert_eq!(summary.spec.row_policy, fixed(10));
    assert!(summary.spec.metadata_enabled);

    let ranges: Vec<String> = summary.plan.pages.iter().map(|p| p.row_range.to_string()).collect();
    assert_eq!(ranges, vec!["1-10", "11-20", "21-25"]);

    let header = summary.plan.pages[1].header.as_ref().unwrap();
    assert_eq!(
        (header.left.as_str(), header.center.as_str(), header.right.as_str()),
        ("Summary", "11-20", "q1.yml")
    );

    let confidential = &workbook.sheets["CONFIDENTIAL notes"];
    assert_eq!(confidential.spec.orientation, Orientation::Portrait);
    assert!(!confidential.spec.metadata_enabled);
    assert!(confidential.plan.pages.iter().all(|p| p.header.is_none()));

    assert!(workbook.sheets["Empty"].plan.is_empty());
}

#[test]
fn test_unrecognized_option_fails_config_load() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "config.yml", "defaults:\n  orientation: sideways\n");
    let err = LayoutConfig::load(&path).unwrap_err();
    assert!(err.is_config());
    assert!(err.to_string().contains("config.yml"));

    let path = write_file(dir.path(), "negative.yml", "defaults:\n  row_dimensions: -3\n");
    assert!(LayoutConfig::load(&path).unwrap_err().is_config());
}

#[test]
fn test_geometry_error_is_reported_with_sheet_and_file() {
    let dir = TempDir::new().unwrap();
    let manifest = write_file(
        dir.path(),
        "broken.json",
        r#"{"sheets": [
            {"name": "Good", "column_widths": [48, 48], "row_count": 3},
            {"name": "Bad", "column_widths": [48, -2], "row_count": 3},
            {"name": "NoCols", "column_widths": [], "row_count": 3}
        ]}"#,
    );

    let planner = BatchPlanner::new(LayoutConfig::default(), None).unwrap();
    let workbook = planner.plan_source(&GeometrySource::open(&manifest).unwrap()).unwrap();

    assert_eq!(workbook.sheets.len(), 1);
    let mut failed: Vec<&str> = workbook.failures.iter().map(|f| f.sheet.as_str()).collect();
    failed.sort();
    assert_eq!(failed, vec!["Bad", "NoCols"]);
    for failure in &workbook.failures {
        assert_eq!(failure.path, manifest);
        assert!(matches!(failure.error, Error::Geometry { .. }));
        assert!(failure.error.to_string().contains(&failure.sheet));
    }
}

#[test]
fn test_row_ranges_cover_every_row_once() {
    let heights: Vec<f64> = (0..137).map(|i| 12.0 + (i % 7) as f64 * 9.0).collect();
    let widths = vec![72.0; 9];
    let geometry = SourceGeometry::new("Data", widths, heights.clone());

    for policy in [RowPolicy::Automatic, RowPolicy::FitAllRowsOnOnePage, fixed(1), fixed(10), fixed(500)] {
        for orientation in [Orientation::Portrait, Orientation::Landscape] {
            let plan = build(&geometry, &spec(orientation, policy), &paper_ladder(), "data.xlsx").unwrap();

            let mut next = 1;
            for page in &plan.pages {
                assert_eq!(page.row_range.first, next, "{policy:?} {orientation}");
                assert!(page.row_range.last >= page.row_range.first);
                next = page.row_range.last + 1;
            }
            assert_eq!(next as usize, heights.len() + 1, "{policy:?} {orientation}");
        }
    }
}

#[test]
fn test_columns_never_overflow() {
    let cases = [vec![48.0; 3], vec![90.0; 12], vec![150.0; 40], vec![2000.0; 30]];
    for widths in cases {
        let total: f64 = widths.iter().sum();
        let geometry = SourceGeometry::new("Wide", widths, vec![15.0; 50]);
        for orientation in [Orientation::Portrait, Orientation::Landscape] {
            let plan = build(&geometry, &spec(orientation, RowPolicy::Automatic), &paper_ladder(), "w.xlsx").unwrap();
            for page in &plan.pages {
                let printable = printable_width(page.page_width, &page.margins);
                assert!(page.scale * total <= printable + 1e-6);
                assert!(page.scale <= 1.0);
            }
        }
    }
}

#[test]
fn test_fit_all_rows_is_one_cropped_page() {
    let heights = vec![15.0, 30.0, 12.5, 45.0];
    let geometry = SourceGeometry::new("Fit", vec![100.0; 3], heights.clone());
    let plan = build(
        &geometry,
        &spec(Orientation::Landscape, RowPolicy::FitAllRowsOnOnePage),
        &paper_ladder(),
        "fit.xlsx",
    )
    .unwrap();

    assert_eq!(plan.pages.len(), 1);
    let page = &plan.pages[0];
    let summed: f64 = heights.iter().sum();
    assert!((page.content_height() - summed * page.scale).abs() < 1e-6);
    assert!((page.page_height.pt() - (summed * page.scale + page.margins.vertical_pt())).abs() < 1e-6);
}

#[test]
fn test_build_is_idempotent() {
    let geometry = SourceGeometry::new("Same", vec![55.0, 120.0, 300.0, 80.0], vec![15.0; 300]);
    let spec = spec(Orientation::Portrait, RowPolicy::Automatic);
    let first = build(&geometry, &spec, &paper_ladder(), "same.xlsx").unwrap();
    let second = build(&geometry, &spec, &paper_ladder(), "same.xlsx").unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_wide_sheet_moves_to_larger_paper() {
    // Too wide for Letter at 80%, fits the next size up
    let geometry = SourceGeometry::new("Wide", vec![100.0; 12], vec![15.0; 10]);
    let plan = build(
        &geometry,
        &spec(Orientation::Landscape, RowPolicy::Automatic),
        &paper_ladder(),
        "w.xlsx",
    )
    .unwrap();
    assert_ne!(plan.pages[0].paper, "Letter");
    assert!(plan.warnings.is_empty());

    // Too wide for anything: still planned, with a warning
    let geometry = SourceGeometry::new("Huge", vec![500.0; 40], vec![15.0; 10]);
    let plan = build(
        &geometry,
        &spec(Orientation::Landscape, RowPolicy::Automatic),
        &paper_ladder(),
        "h.xlsx",
    )
    .unwrap();
    assert_eq!(plan.pages[0].paper, "Arch E");
    assert_eq!(plan.warnings.len(), 1);
    assert!(plan.warnings[0].scale < 0.8);
}

#[test]
fn test_render_proof_matches_plan() {
    let dir = TempDir::new().unwrap();
    let workbook = plan_manifest(&dir);
    let output = dir.path().join("out").join("q1.pdf");

    let pages = LayoutProofRenderer::default().render(&workbook, &output).unwrap();
    assert_eq!(pages, 4);
    assert_eq!(count_pages(&output).unwrap(), 4);

    let summary = inspect_pdf(&output).unwrap();
    assert_eq!(summary.page_count, 4);
    assert_eq!(summary.title.as_deref(), Some("q1.yml"));

    let expected: Vec<(f64, f64)> = workbook
        .in_workbook_order()
        .flat_map(|s| &s.plan.pages)
        .map(|p| (p.page_width.pt(), p.page_height.pt()))
        .collect();
    assert_eq!(summary.page_sizes.len(), expected.len());
    for ((w, h), (ew, eh)) in summary.page_sizes.iter().zip(&expected) {
        assert!((w - ew).abs() < 0.01 && (h - eh).abs() < 0.01);
    }
}

#[test]
fn test_render_keeps_non_ascii_title() {
    let dir = TempDir::new().unwrap();
    let planner = BatchPlanner::new(LayoutConfig::default(), None).unwrap();
    let workbook = planner
        .plan_geometries(
            Path::new("Übersicht 2024.xlsx"),
            vec![SourceGeometry::new("Daten", vec![48.0; 2], vec![15.0; 3])],
        )
        .unwrap();

    let output = dir.path().join("uebersicht.pdf");
    assert_eq!(LayoutProofRenderer::default().render(&workbook, &output).unwrap(), 1);
    let summary = inspect_pdf(&output).unwrap();
    assert_eq!(summary.title.as_deref(), Some("Übersicht 2024.xlsx"));
}

#[test]
fn test_same_stem_inputs_render_to_separate_files() {
    let dir = TempDir::new().unwrap();
    let input_root = dir.path().join("in");
    let manifests = [
        write_file(&input_root, "a/report.yml", FINANCE_MANIFEST),
        write_file(&input_root, "b/report.yml", FINANCE_MANIFEST),
    ];
    let planner = BatchPlanner::new(LayoutConfig::default(), Some(1)).unwrap();
    let renderer = LayoutProofRenderer::default();
    let mut layout = OutputLayout::new(dir.path().join("out"));

    let mut outputs = Vec::new();
    for manifest in &manifests {
        let relative = manifest.strip_prefix(&input_root).unwrap();
        let target = layout.claim(manifest, relative).unwrap();
        let workbook = planner.plan_source(&GeometrySource::open(manifest).unwrap()).unwrap();
        assert!(renderer.render(&workbook, &target).unwrap() > 0);
        outputs.push(target);
    }

    assert_eq!(outputs[0], dir.path().join("out/a/report.pdf"));
    assert_eq!(outputs[1], dir.path().join("out/b/report.pdf"));
    assert!(outputs.iter().all(|p| p.exists()));

    // Flattened to bare file names the two inputs would overwrite each other
    let mut flat = OutputLayout::new(dir.path().join("flat"));
    flat.claim(&manifests[0], Path::new("report.yml")).unwrap();
    let err = flat.claim(&manifests[1], Path::new("report.yml")).unwrap_err();
    assert!(matches!(err, Error::OutputCollision { .. }));
}

#[test]
fn test_render_nothing_writes_no_file() {
    let dir = TempDir::new().unwrap();
    let planner = BatchPlanner::new(LayoutConfig::default(), None).unwrap();
    let workbook = planner
        .plan_geometries(Path::new("blank.xlsx"), vec![SourceGeometry::new("Blank", vec![], vec![])])
        .unwrap();

    let output = dir.path().join("blank.pdf");
    assert_eq!(LayoutProofRenderer::default().render(&workbook, &output).unwrap(), 0);
    assert!(!output.exists());
}

#[test]
fn test_xlsx_geometry_and_print_area() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sales.xlsx");

    let mut book = Workbook::new();
    let data = book.add_worksheet();
    data.set_name("Data").unwrap();
    data.write_string(0, 0, "Region").unwrap();
    data.write_string(0, 1, "A fairly long customer name").unwrap();
    for row in 1..40u32 {
        data.write_number(row, 0, row as f64).unwrap();
        data.write_string(row, 1, "x").unwrap();
    }
    data.write_string(5, 2, "line one\nline two").unwrap();

    let printed = book.add_worksheet();
    printed.set_name("Printed").unwrap();
    for row in 0..30u32 {
        for col in 0..6u16 {
            printed.write_number(row, col, 1.0).unwrap();
        }
    }
    printed.set_print_area(0, 0, 9, 2).unwrap();

    let hidden = book.add_worksheet();
    hidden.set_name("Lookup").unwrap();
    hidden.write_string(0, 0, "secret").unwrap();
    hidden.set_hidden(true);
    book.save(&path).unwrap();

    let source = GeometrySource::open(&path).unwrap();
    let sheets = source.read_sheets().unwrap();
    let names: Vec<&str> = sheets.iter().map(|s| s.sheet_name.as_str()).collect();
    assert_eq!(names, vec!["Data", "Printed"]);

    let data = &sheets[0];
    assert_eq!(data.row_count(), 40);
    assert_eq!(data.column_count(), 3);
    assert_eq!(data.column_widths[0], 48.0);
    assert_eq!(data.column_widths[1], 27.0 * 6.0 + 6.0);
    assert_eq!(data.row_heights[5], 30.0);
    assert!(data.print_area.is_none());

    let printed = &sheets[1];
    let area = printed.print_area.unwrap();
    assert_eq!((area.first_row, area.last_row), (1, 10));
    assert_eq!((area.first_column, area.last_column), (1, 3));

    let planner = BatchPlanner::new(LayoutConfig::default(), None).unwrap();
    let workbook = planner.plan_source(&source).unwrap();
    let plan = &workbook.sheets["Printed"].plan;
    assert_eq!(plan.source, PlanSource::ExistingPrintArea);
    assert_eq!(plan.pages.len(), 1);
    assert_eq!(plan.pages[0].row_range.to_string(), "1-10");
    assert_eq!(plan.pages[0].column_range.to_string(), "1-3");
}

#[test]
fn test_smart_layout_ignores_print_area() {
    let area_geometry = SourceGeometry::new("P", vec![48.0; 6], vec![15.0; 100]).with_print_area(
        doc2pdf_layout::geometry::PrintArea {
            first_row: 1,
            last_row: 10,
            first_column: 1,
            last_column: 3,
        },
    );
    let mut smart = spec(Orientation::Landscape, fixed(25));
    smart.smart_layout = true;

    let plan = build(&area_geometry, &smart, &paper_ladder(), "p.xlsx").unwrap();
    assert_eq!(plan.source, PlanSource::Synthesized);
    assert_eq!(plan.pages.len(), 4);
    assert_eq!(plan.pages[0].column_range.to_string(), "1-6");
}

#[test]
fn test_margins_follow_metadata_flag() {
    let with_header = Margins::for_sheet(true);
    let without = Margins::for_sheet(false);
    assert!(with_header.top.pt() > without.top.pt());
    assert_eq!(with_header.bottom, without.bottom);
}
