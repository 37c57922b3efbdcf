//! Rendering pagination plans to PDF
//!
//! The office-automation exporter that draws real cell content lives outside
//! this crate and plugs in through [`PageRenderer`]. [`LayoutProofRenderer`]
//! writes a proof of the plan instead: pages at the planned size, the header
//! text in the top band and the scaled row/column grid inside the printable
//! area. It is meant for checking a layout before a full export.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::{debug, warn};

use crate::batch::{SheetPlan, WorkbookPlan};
use crate::error::{Error, Result};
use crate::planner::PageDescriptor;

/// Where each input's PDF goes under an output directory
///
/// An input keeps its path relative to the directory it was found in, with a
/// `.pdf` extension, so `a/report.xlsx` and `b/report.xlsx` stay apart.
#[derive(Debug)]
pub struct OutputLayout {
    dir: PathBuf,
    claimed: HashMap<PathBuf, PathBuf>,
}

impl OutputLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            claimed: HashMap::new(),
        }
    }

    /// Reserve the output path for `source`, found at `relative` below its input root
    ///
    /// Fails with [`Error::OutputCollision`] if another source already maps there.
    pub fn claim(&mut self, source: &Path, relative: &Path) -> Result<PathBuf> {
        let target = self.dir.join(relative).with_extension("pdf");
        if let Some(taken_by) = self.claimed.get(&target) {
            return Err(Error::OutputCollision {
                output: target,
                taken_by: taken_by.clone(),
            });
        }
        self.claimed.insert(target.clone(), source.to_path_buf());
        Ok(target)
    }
}

/// Consumes pagination plans and produces a PDF
pub trait PageRenderer {
    /// Render every page of every planned sheet to `output`
    ///
    /// Sheets render in workbook order and pages in plan order. Returns the
    /// number of pages written; nothing is written when there are none.
    fn render(&self, workbook: &WorkbookPlan, output: &Path) -> Result<usize>;
}

/// Draws the planned page geometry with lopdf
#[derive(Debug, Clone)]
pub struct LayoutProofRenderer {
    /// Header font size in points
    pub header_font_size: f32,
    /// Draw the scaled row and column boundaries
    pub draw_grid: bool,
}

impl Default for LayoutProofRenderer {
    fn default() -> Self {
        Self {
            header_font_size: 10.0,
            draw_grid: true,
        }
    }
}

impl PageRenderer for LayoutProofRenderer {
    fn render(&self, workbook: &WorkbookPlan, output: &Path) -> Result<usize> {
        let sheets: Vec<&SheetPlan> = workbook.in_workbook_order().collect();
        let page_count: usize = sheets.iter().map(|s| s.plan.pages.len()).sum();
        if page_count == 0 {
            warn!(file = %workbook.path.display(), "no pages to render");
            return Ok(0);
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = use_helvetica_font(&mut doc);

        let mut fonts = Dictionary::new();
        fonts.set("F1", Object::Reference(font_id));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(fonts));
        let resources_id = doc.add_object(Object::Dictionary(resources));

        let mut kids = Vec::with_capacity(page_count);
        for sheet in sheets {
            for page in &sheet.plan.pages {
                let content = self.page_content(sheet, page);
                let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
                let page_id = add_page(&mut doc, pages_id, content_id, resources_id, page);
                kids.push(Object::Reference(page_id));
            }
        }

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Kids", Object::Array(kids));
        pages.set("Count", Object::Integer(page_count as i64));
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(Object::Dictionary(catalog));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let title = workbook
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut info = Dictionary::new();
        info.set("Title", text_string(&title));
        info.set(
            "Producer",
            Object::String(b"doc2pdf-layout".to_vec(), StringFormat::Literal),
        );
        let info_id = doc.add_object(Object::Dictionary(info));
        doc.trailer.set("Info", Object::Reference(info_id));

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        doc.compress();
        doc.save(output)?;

        debug!(output = %output.display(), pages = page_count, "wrote layout proof");
        Ok(page_count)
    }
}

impl LayoutProofRenderer {
    /// Content stream for one page
    fn page_content(&self, sheet: &SheetPlan, page: &PageDescriptor) -> String {
        let mut content = String::new();
        let page_width = page.page_width.pt();
        let page_height = page.page_height.pt();
        let left = page.margins.left.pt();
        let bottom = page.margins.bottom.pt();
        let width = page.content_width();
        let height = page.content_height();
        let top = bottom + height;

        // Printable area frame
        content.push_str("0.4 G\n0.75 w\n");
        content.push_str(&format!("{left:.2} {bottom:.2} {width:.2} {height:.2} re S\n"));

        if self.draw_grid {
            content.push_str("0.8 G\n0.25 w\n");

            let mut x = left;
            let columns = &sheet.geometry.column_widths[page.column_range.as_slice_range()];
            for w in columns.iter().take(columns.len().saturating_sub(1)) {
                x += w * page.scale;
                content.push_str(&format!("{x:.2} {bottom:.2} m {x:.2} {top:.2} l S\n"));
            }

            let mut y = top;
            let rows = &sheet.geometry.row_heights[page.row_range.as_slice_range()];
            for h in rows.iter().take(rows.len().saturating_sub(1)) {
                y -= h * page.scale;
                content.push_str(&format!("{left:.2} {y:.2} m {:.2} {y:.2} l S\n", left + width));
            }
        }

        if let Some(header) = &page.header {
            let size = self.header_font_size;
            // Centered vertically in the top margin band
            let y = page_height - page.margins.top.pt() / 2.0 - f64::from(size) / 3.0;
            let right_edge = page_width - page.margins.right.pt();

            content.push_str("0 g\n");
            let placements = [
                (&header.left, left),
                (&header.center, (page_width - estimate_text_width(&header.center, size)) / 2.0),
                (&header.right, right_edge - estimate_text_width(&header.right, size)),
            ];
            for (text, x) in placements {
                if text.is_empty() {
                    continue;
                }
                content.push_str("BT\n");
                content.push_str(&format!("/F1 {size} Tf\n"));
                content.push_str(&format!("1 0 0 1 {x:.2} {y:.2} Tm\n"));
                content.push_str(&format!("({}) Tj\n", escape_pdf_string(text)));
                content.push_str("ET\n");
            }
        }

        content
    }
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    content_id: ObjectId,
    resources_id: ObjectId,
    page: &PageDescriptor,
) -> ObjectId {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"Page".to_vec()));
    dict.set("Parent", Object::Reference(pages_id));
    dict.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(page.page_width.pt() as f32),
            Object::Real(page.page_height.pt() as f32),
        ]),
    );
    dict.set("Contents", Object::Reference(content_id));
    dict.set("Resources", Object::Reference(resources_id));
    doc.add_object(Object::Dictionary(dict))
}

/// Helvetica is one of the 14 standard PDF fonts, so nothing is embedded
fn use_helvetica_font(doc: &mut Document) -> ObjectId {
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
    font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    doc.add_object(Object::Dictionary(font))
}

/// A PDF text string: plain literal for ASCII, UTF-16BE with a byte order mark otherwise
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        Object::String(text.as_bytes().to_vec(), StringFormat::Literal)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

/// Escape special characters in PDF strings
///
/// Characters outside the standard font's range print as `?`.
fn escape_pdf_string(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() { c } else { '?' })
        .collect::<String>()
        .replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
        .replace('\r', "\\r")
        .replace('\n', "\\n")
}

/// Estimate text width for Helvetica
fn estimate_text_width(text: &str, font_size: f32) -> f64 {
    // Average Helvetica advance is roughly 0.5 em
    text.chars().count() as f64 * f64::from(font_size) * 0.5
}
