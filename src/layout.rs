//! Physical page geometry: lengths, paper sizes, orientation and margins

use serde::{Deserialize, Serialize};
use std::fmt;

/// Simple length type in millimeters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Length(pub f64);

impl Length {
    /// Create a length from inches
    pub fn from_inches(inches: f64) -> Self {
        Length(inches * 25.4)
    }

    /// Create a length from points (1/72 inch)
    pub fn from_pt(pt: f64) -> Self {
        Length(pt * 25.4 / 72.0)
    }

    /// Get the value in millimeters
    pub fn mm(&self) -> f64 {
        self.0
    }

    /// Get the value in inches
    pub fn inches(&self) -> f64 {
        self.0 / 25.4
    }

    /// Get the value in points (1/72 inch)
    pub fn pt(&self) -> f64 {
        self.0 * 72.0 / 25.4
    }
}

/// Page orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Portrait => f.write_str("portrait"),
            Orientation::Landscape => f.write_str("landscape"),
        }
    }
}

/// Page dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageDimensions {
    pub width: Length,
    pub height: Length,
}

/// A named paper size, stored in portrait form
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaperSize {
    pub name: &'static str,
    pub portrait: PageDimensions,
}

impl PaperSize {
    const fn mm(name: &'static str, width: f64, height: f64) -> Self {
        Self {
            name,
            portrait: PageDimensions {
                width: Length(width),
                height: Length(height),
            },
        }
    }

    /// US Letter (8.5" × 11")
    pub const LETTER: PaperSize = PaperSize::mm("Letter", 215.9, 279.4);
    /// A3 (11.69" × 16.54")
    pub const A3: PaperSize = PaperSize::mm("A3", 296.926, 420.116);
    /// Architectural C (17" × 22")
    pub const ARCH_C: PaperSize = PaperSize::mm("Arch C", 431.8, 558.8);
    /// Architectural D (22" × 34")
    pub const ARCH_D: PaperSize = PaperSize::mm("Arch D", 558.8, 863.6);
    /// Architectural E (34" × 44")
    pub const ARCH_E: PaperSize = PaperSize::mm("Arch E", 863.6, 1117.6);

    /// Dimensions of this paper when laid out in `orientation`
    pub fn oriented(&self, orientation: Orientation) -> PageDimensions {
        match orientation {
            Orientation::Portrait => self.portrait,
            Orientation::Landscape => PageDimensions {
                width: self.portrait.height,
                height: self.portrait.width,
            },
        }
    }
}

/// Paper sizes tried by the column planner, smallest first
pub fn paper_ladder() -> Vec<PaperSize> {
    vec![
        PaperSize::LETTER,
        PaperSize::A3,
        PaperSize::ARCH_C,
        PaperSize::ARCH_D,
        PaperSize::ARCH_E,
    ]
}

/// Margins for page content
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: Length,
    pub bottom: Length,
    pub left: Length,
    pub right: Length,
}

impl Margins {
    /// Create margins with same value on all sides
    pub fn uniform(margin: Length) -> Self {
        Self {
            top: margin,
            bottom: margin,
            left: margin,
            right: margin,
        }
    }

    /// Narrow margins (0.5 inches)
    pub fn narrow() -> Self {
        Self::uniform(Length::from_inches(0.5))
    }

    /// Narrow margins with a 1 inch top band when a header is printed
    pub fn for_sheet(metadata_enabled: bool) -> Self {
        let mut margins = Self::narrow();
        if metadata_enabled {
            margins.top = Length::from_inches(1.0);
        }
        margins
    }

    /// Left plus right margin, in points
    pub fn horizontal_pt(&self) -> f64 {
        self.left.pt() + self.right.pt()
    }

    /// Top plus bottom margin, in points
    pub fn vertical_pt(&self) -> f64 {
        self.top.pt() + self.bottom.pt()
    }
}

/// Width left for content once the side margins are taken off, in points
pub fn printable_width(page_width: Length, margins: &Margins) -> f64 {
    (page_width.pt() - margins.horizontal_pt()).max(0.0)
}

/// Height left for content once the top and bottom margins are taken off, in points
pub fn printable_height(page_height: Length, margins: &Margins) -> f64 {
    (page_height.pt() - margins.vertical_pt()).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_conversions() {
        let len = Length::from_inches(1.0);
        assert!((len.mm() - 25.4).abs() < 0.01);
        assert!((len.pt() - 72.0).abs() < 0.01);
        assert!((Length::from_pt(36.0).inches() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_letter_size() {
        let letter = PaperSize::LETTER.portrait;
        // 8.5 inches = 215.9 mm
        assert!((letter.width.mm() - 215.9).abs() < 0.1);
        // 11 inches = 279.4 mm
        assert!((letter.height.mm() - 279.4).abs() < 0.1);
    }

    #[test]
    fn test_landscape_swaps_dimensions() {
        let landscape = PaperSize::LETTER.oriented(Orientation::Landscape);
        assert!((landscape.width.pt() - 792.0).abs() < 0.01);
        assert!((landscape.height.pt() - 612.0).abs() < 0.01);
    }

    #[test]
    fn test_ladder_is_ascending_in_both_orientations() {
        for orientation in [Orientation::Portrait, Orientation::Landscape] {
            let widths: Vec<f64> = paper_ladder()
                .iter()
                .map(|p| p.oriented(orientation).width.pt())
                .collect();
            assert!(widths.windows(2).all(|w| w[0] < w[1]), "{orientation}: {widths:?}");
        }
    }

    #[test]
    fn test_sheet_margins() {
        let plain = Margins::for_sheet(false);
        assert!((plain.top.pt() - 36.0).abs() < 1e-9);
        let with_header = Margins::for_sheet(true);
        assert!((with_header.top.pt() - 72.0).abs() < 1e-9);
        assert!((with_header.horizontal_pt() - 72.0).abs() < 1e-9);
        assert!((with_header.vertical_pt() - 108.0).abs() < 1e-9);
    }

    #[test]
    fn test_printable_width() {
        let letter = PaperSize::LETTER.oriented(Orientation::Portrait);
        let width = printable_width(letter.width, &Margins::narrow());
        assert!((width - 540.0).abs() < 0.01);
    }
}
