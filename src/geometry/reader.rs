//! Reading sheet geometry from input files
//!
//! Spreadsheets go through calamine. Cell content does not carry column
//! widths or row heights, so those are estimated from the text the cells
//! hold. Exact geometry can be supplied instead through a manifest file
//! (YAML or JSON) describing each sheet.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader, SheetVisible};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{PrintArea, SourceGeometry};
use crate::error::{Error, Result};

/// Height of an unformatted row, in points
pub const DEFAULT_ROW_HEIGHT_PT: f64 = 15.0;
/// Width of an unformatted column, in points
pub const DEFAULT_COLUMN_WIDTH_PT: f64 = 48.0;
/// Approximate advance of one character at the default font, in points
pub const CHAR_WIDTH_PT: f64 = 6.0;
/// Widest column a spreadsheet allows, in characters
pub const MAX_COLUMN_CHARS: usize = 255;
const CELL_PADDING_PT: f64 = 6.0;

/// Input formats the planner understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Xlsx,
    Xlsm,
    Xlsb,
    Xls,
    Ods,
    Manifest,
}

impl SourceFormat {
    /// Detect the format from the file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" => Some(SourceFormat::Xlsx),
            "xlsm" => Some(SourceFormat::Xlsm),
            "xlsb" => Some(SourceFormat::Xlsb),
            "xls" => Some(SourceFormat::Xls),
            "ods" => Some(SourceFormat::Ods),
            "yml" | "yaml" | "json" => Some(SourceFormat::Manifest),
            _ => None,
        }
    }
}

/// Where a file's sheet geometry comes from
///
/// Planning is identical for every format; only geometry extraction differs.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometrySource {
    Workbook { path: PathBuf, format: SourceFormat },
    Manifest { path: PathBuf },
}

impl GeometrySource {
    /// Pick the reader for `path`
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        match SourceFormat::from_path(path) {
            Some(SourceFormat::Manifest) => Ok(GeometrySource::Manifest {
                path: path.to_path_buf(),
            }),
            Some(format) => Ok(GeometrySource::Workbook {
                path: path.to_path_buf(),
                format,
            }),
            None => Err(Error::UnsupportedFormat(path.to_path_buf())),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            GeometrySource::Workbook { path, .. } | GeometrySource::Manifest { path } => path,
        }
    }

    /// Read the geometry of every visible sheet, in workbook order
    pub fn read_sheets(&self) -> Result<Vec<SourceGeometry>> {
        match self {
            GeometrySource::Workbook { path, .. } => read_workbook(path),
            GeometrySource::Manifest { path } => read_manifest(path),
        }
    }
}

/// Whether the file has an extension some reader accepts
pub fn is_supported(path: &Path) -> bool {
    SourceFormat::from_path(path).is_some()
}

fn read_workbook(path: &Path) -> Result<Vec<SourceGeometry>> {
    let mut workbook = open_workbook_auto(path)?;

    let visible: Vec<String> = workbook
        .sheets_metadata()
        .iter()
        .filter(|sheet| {
            let shown = sheet.visible == SheetVisible::Visible;
            if !shown {
                warn!(sheet = %sheet.name, "skipping hidden sheet");
            }
            shown
        })
        .map(|sheet| sheet.name.clone())
        .collect();

    let print_areas: HashMap<String, CellSpan> = workbook
        .defined_names()
        .iter()
        .filter(|(name, _)| is_print_area_name(name))
        .filter_map(|(_, formula)| parse_print_area(formula))
        .collect();

    let mut sheets = Vec::with_capacity(visible.len());
    for name in visible {
        let range = match workbook.worksheet_range(&name) {
            Ok(range) => range,
            Err(e) => {
                // Chart sheets and the like carry no cell range
                warn!(sheet = %name, error = %e, "sheet has no readable cells, skipping");
                continue;
            }
        };

        let (rows, cols) = match range.end() {
            Some((row, col)) if !range.is_empty() => (row as usize + 1, col as usize + 1),
            _ => (0, 0),
        };
        let (start_row, start_col) = range.start().unwrap_or((0, 0));

        let mut column_widths = vec![DEFAULT_COLUMN_WIDTH_PT; cols];
        let mut row_heights = vec![DEFAULT_ROW_HEIGHT_PT; rows];
        for (r, c, cell) in range.used_cells() {
            let row = start_row as usize + r;
            let col = start_col as usize + c;
            let text = cell_text(cell);
            column_widths[col] = column_widths[col].max(estimate_column_width(&text));
            row_heights[row] = row_heights[row].max(estimate_row_height(&text));
        }

        let mut geometry = SourceGeometry::new(name.clone(), column_widths, row_heights);
        if let Some(span) = print_areas.get(&name) {
            geometry.print_area = span.clamp_to(rows, cols);
            if geometry.print_area.is_none() {
                warn!(sheet = %name, "print area lies outside the used range, ignoring it");
            }
        }

        debug!(
            sheet = %geometry.sheet_name,
            rows = geometry.row_count(),
            columns = geometry.column_count(),
            print_area = ?geometry.print_area,
            "read sheet geometry"
        );
        sheets.push(geometry);
    }

    Ok(sheets)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        // Dates and error values render at roughly this width
        _ => "0000-00-00 00:00".to_string(),
    }
}

/// Column width needed to show `text` on its longest line, in points
pub fn estimate_column_width(text: &str) -> f64 {
    let chars = text
        .lines()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0)
        .min(MAX_COLUMN_CHARS);
    (chars as f64 * CHAR_WIDTH_PT + CELL_PADDING_PT).max(DEFAULT_COLUMN_WIDTH_PT)
}

/// Row height needed to show every line of `text`, in points
pub fn estimate_row_height(text: &str) -> f64 {
    let lines = text.lines().count().max(1);
    lines as f64 * DEFAULT_ROW_HEIGHT_PT
}

fn is_print_area_name(name: &str) -> bool {
    let bare = name.strip_prefix("_xlnm.").unwrap_or(name);
    bare.eq_ignore_ascii_case("Print_Area")
}

/// A print area as written, before it is fitted to the sheet's used range
///
/// Whole-row references leave the columns open and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSpan {
    pub rows: Option<(u32, u32)>,
    pub columns: Option<(u32, u32)>,
}

impl CellSpan {
    /// Fit the span to a sheet of `rows` × `cols`, or `None` if nothing is left
    pub fn clamp_to(&self, rows: usize, cols: usize) -> Option<PrintArea> {
        let (first_row, last_row) = self.rows.unwrap_or((1, rows as u32));
        let (first_column, last_column) = self.columns.unwrap_or((1, cols as u32));
        let last_row = last_row.min(rows as u32);
        let last_column = last_column.min(cols as u32);
        if first_row == 0 || first_column == 0 || first_row > last_row || first_column > last_column {
            return None;
        }
        Some(PrintArea {
            first_row,
            last_row,
            first_column,
            last_column,
        })
    }
}

/// Parse a print area formula such as `'My Sheet'!$A$1:$D$20`
///
/// Returns the sheet name and the first area. Whole rows (`$1:$20`) and whole
/// columns (`$A:$D`) are understood.
pub fn parse_print_area(formula: &str) -> Option<(String, CellSpan)> {
    let formula = formula.trim().trim_start_matches('=');
    let (sheet, rest) = split_sheet(formula)?;
    let area = rest.split(',').next()?.trim();

    let (start, end) = area.split_once(':').unwrap_or((area, area));
    let start = parse_ref(start)?;
    let end = parse_ref(end)?;

    let span = match (start, end) {
        (CellRef::Cell(r1, c1), CellRef::Cell(r2, c2)) => CellSpan {
            rows: Some((r1.min(r2), r1.max(r2))),
            columns: Some((c1.min(c2), c1.max(c2))),
        },
        (CellRef::Row(r1), CellRef::Row(r2)) => CellSpan {
            rows: Some((r1.min(r2), r1.max(r2))),
            columns: None,
        },
        (CellRef::Column(c1), CellRef::Column(c2)) => CellSpan {
            rows: None,
            columns: Some((c1.min(c2), c1.max(c2))),
        },
        _ => return None,
    };
    Some((sheet, span))
}

fn split_sheet(formula: &str) -> Option<(String, &str)> {
    if let Some(quoted) = formula.strip_prefix('\'') {
        // Quotes inside the name are doubled
        let mut name = String::new();
        let mut chars = quoted.char_indices().peekable();
        while let Some((i, ch)) = chars.next() {
            if ch == '\'' {
                if let Some((_, '\'')) = chars.peek() {
                    name.push('\'');
                    chars.next();
                    continue;
                }
                let rest = quoted[i + 1..].strip_prefix('!')?;
                return Some((name, rest));
            }
            name.push(ch);
        }
        None
    } else {
        let (name, rest) = formula.split_once('!')?;
        Some((name.to_string(), rest))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CellRef {
    Cell(u32, u32),
    Row(u32),
    Column(u32),
}

fn parse_ref(reference: &str) -> Option<CellRef> {
    let cleaned: String = reference.chars().filter(|c| *c != '$').collect();
    let split = cleaned.find(|c: char| c.is_ascii_digit()).unwrap_or(cleaned.len());
    let (letters, digits) = cleaned.split_at(split);

    let column = if letters.is_empty() {
        None
    } else {
        Some(column_index(letters)?)
    };
    let row = if digits.is_empty() {
        None
    } else {
        Some(digits.parse::<u32>().ok().filter(|r| *r > 0)?)
    };

    match (row, column) {
        (Some(r), Some(c)) => Some(CellRef::Cell(r, c)),
        (Some(r), None) => Some(CellRef::Row(r)),
        (None, Some(c)) => Some(CellRef::Column(c)),
        (None, None) => None,
    }
}

/// 1-based index of a column name (`A` = 1, `AA` = 27)
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    letters.chars().try_fold(0u32, |acc, ch| {
        let ch = ch.to_ascii_uppercase();
        ch.is_ascii_uppercase()
            .then(|| acc * 26 + (ch as u32 - 'A' as u32 + 1))
    })
}

#[derive(Debug, Deserialize)]
struct Manifest {
    sheets: Vec<ManifestSheet>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestSheet {
    name: String,
    column_widths: Vec<f64>,
    #[serde(default)]
    row_heights: Option<Vec<f64>>,
    #[serde(default)]
    row_count: Option<usize>,
    #[serde(default)]
    row_height: Option<f64>,
    #[serde(default)]
    print_area: Option<PrintArea>,
    #[serde(default)]
    hidden: bool,
}

fn read_manifest(path: &Path) -> Result<Vec<SourceGeometry>> {
    let text = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let manifest: Manifest = if is_json {
        serde_json::from_str(&text)?
    } else {
        serde_yaml::from_str(&text)?
    };

    let mut sheets = Vec::with_capacity(manifest.sheets.len());
    for sheet in manifest.sheets {
        if sheet.hidden {
            warn!(sheet = %sheet.name, "skipping hidden sheet");
            continue;
        }
        let row_heights = match (sheet.row_heights, sheet.row_count) {
            (Some(heights), None) => heights,
            (None, Some(count)) => vec![sheet.row_height.unwrap_or(DEFAULT_ROW_HEIGHT_PT); count],
            (None, None) => Vec::new(),
            (Some(_), Some(_)) => {
                return Err(Error::General(format!(
                    "{}: sheet '{}' sets both row_heights and row_count",
                    path.display(),
                    sheet.name
                )))
            }
        };
        sheets.push(SourceGeometry {
            sheet_name: sheet.name,
            column_widths: sheet.column_widths,
            row_heights,
            print_area: sheet.print_area,
        });
    }
    Ok(sheets)
}
