//! Metadata header text for each page

use serde::Serialize;

use super::IndexRange;

/// Header text printed left, center and right at the top of a page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PageHeader {
    pub left: String,
    pub center: String,
    pub right: String,
}

/// Build the header for a page: sheet name | row range | file name
///
/// Returns `None` when metadata headers are turned off.
pub fn synthesize(
    sheet_name: &str,
    rows: IndexRange,
    file_name: &str,
    metadata_enabled: bool,
) -> Option<PageHeader> {
    metadata_enabled.then(|| PageHeader {
        left: sheet_name.to_string(),
        center: rows.to_string(),
        right: file_name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_fields() {
        let header = synthesize("Q1", IndexRange::new(11, 20), "report.xlsx", true).unwrap();
        assert_eq!(header.left, "Q1");
        assert_eq!(header.center, "11-20");
        assert_eq!(header.right, "report.xlsx");
    }

    #[test]
    fn test_first_page_range() {
        let header = synthesize("Data", IndexRange::new(1, 10), "a.xlsx", true).unwrap();
        assert_eq!(header.center, "1-10");
    }

    #[test]
    fn test_disabled() {
        assert_eq!(synthesize("Q1", IndexRange::new(1, 1), "report.xlsx", false), None);
    }
}
