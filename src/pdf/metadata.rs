//! Reading back rendered PDFs

use std::path::Path;

use lopdf::{Document, Object};

use crate::error::{Error, Result};

/// Count pages by reading the Count field from the Pages dictionary
fn count_pages_from_catalog(doc: &Document) -> Result<usize> {
    let catalog_id = match doc.trailer.get(b"Root")? {
        Object::Reference(id) => *id,
        _ => return Err(Error::General("Root is not a reference".to_string())),
    };
    let catalog = doc.get_dictionary(catalog_id)?;

    let pages_id = match catalog.get(b"Pages")? {
        Object::Reference(id) => *id,
        _ => return Err(Error::General("Pages is not a reference".to_string())),
    };
    let pages = doc.get_dictionary(pages_id)?;

    match pages.get(b"Count")? {
        Object::Integer(n) => Ok(*n as usize),
        _ => Err(Error::General("Count is not an integer".to_string())),
    }
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(n) => Some(*n as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

/// Decode a PDF text string written either as UTF-16BE with a byte order mark or as plain bytes
fn decode_text_string(bytes: &[u8]) -> Option<String> {
    match bytes.strip_prefix(b"\xFE\xFF") {
        Some(utf16) => {
            let units: Vec<u16> = utf16
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16(&units).ok()
        }
        None => String::from_utf8(bytes.to_vec()).ok(),
    }
}

/// What a rendered PDF contains
#[derive(Debug, Clone)]
pub struct PdfSummary {
    /// Number of pages in the PDF
    pub page_count: usize,
    /// Document title (if present)
    pub title: Option<String>,
    /// Width and height of each page in points, in page order
    pub page_sizes: Vec<(f64, f64)>,
}

/// Read page count, title and page sizes from a PDF file
pub fn inspect_pdf(path: &Path) -> Result<PdfSummary> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    let page_count = count_pages_from_catalog(&doc)?;

    let mut page_sizes = Vec::with_capacity(page_count);
    for page_id in doc.get_pages().into_values() {
        let media_box = doc.get_dictionary(page_id)?.get(b"MediaBox")?.as_array()?;
        let coords: Vec<f64> = media_box.iter().filter_map(number).collect();
        if coords.len() != 4 {
            return Err(Error::General(format!("page {page_id:?} has a malformed MediaBox")));
        }
        page_sizes.push((coords[2] - coords[0], coords[3] - coords[1]));
    }

    let title = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|info| info.as_reference().ok())
        .and_then(|id| doc.get_dictionary(id).ok())
        .and_then(|info| info.get(b"Title").ok())
        .and_then(|title| title.as_str().ok())
        .and_then(decode_text_string);

    Ok(PdfSummary {
        page_count,
        title,
        page_sizes,
    })
}

/// Count the number of pages in a PDF file
pub fn count_pages(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    count_pages_from_catalog(&doc)
}
