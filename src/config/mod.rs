//! Pattern-priority configuration resolution
//!
//! A sheet's layout is decided by layering override rules over global
//! defaults. Each field is resolved on its own: the highest-priority matching
//! rule that sets a field wins that field, and fields no matching rule sets
//! fall back to the defaults.

pub mod file;

use std::num::NonZeroU32;
use std::path::Path;

use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::layout::Orientation;

pub use file::LayoutConfig;

/// How a sheet's rows are split across pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowPolicy {
    /// Pack rows by accumulated height so text stays legible
    Automatic,
    /// Everything on one page, grown to the content height
    FitAllRowsOnOnePage,
    /// A fixed number of rows per page (the last page may be short)
    FixedRowsPerPage(NonZeroU32),
}

impl RowPolicy {
    /// Map the configuration value `row_dimensions` onto a policy
    ///
    /// `null` is automatic, `0` fits all rows on one page and a positive
    /// count fixes the rows per page. Negative counts are rejected.
    pub fn from_dimensions(value: Option<i64>) -> Result<Self> {
        match value {
            None => Ok(RowPolicy::Automatic),
            Some(0) => Ok(RowPolicy::FitAllRowsOnOnePage),
            Some(n) if n > 0 => u32::try_from(n)
                .ok()
                .and_then(NonZeroU32::new)
                .map(RowPolicy::FixedRowsPerPage)
                .ok_or_else(|| Error::Config(format!("row_dimensions {n} is too large"))),
            Some(n) => Err(Error::Config(format!(
                "row_dimensions must be null, 0 or a positive count, got {n}"
            ))),
        }
    }

    /// Inverse of [`RowPolicy::from_dimensions`]
    pub fn dimensions(&self) -> Option<u32> {
        match self {
            RowPolicy::Automatic => None,
            RowPolicy::FitAllRowsOnOnePage => Some(0),
            RowPolicy::FixedRowsPerPage(n) => Some(n.get()),
        }
    }
}

/// Fully resolved layout configuration for one sheet
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SheetLayoutSpec {
    pub orientation: Orientation,
    pub row_policy: RowPolicy,
    pub metadata_enabled: bool,
    /// Smallest acceptable horizontal scale (legibility floor)
    pub min_scale: f64,
    /// Synthesize a layout even when the source declares a print area
    pub smart_layout: bool,
}

/// A partial layout: any subset of fields may be set
///
/// Used for override rule settings and for the global defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutSettings {
    #[serde(default)]
    pub orientation: Option<Orientation>,
    #[serde(
        default,
        rename = "row_dimensions",
        alias = "rowDimensions",
        deserialize_with = "deserialize_row_dimensions"
    )]
    pub row_policy: Option<RowPolicy>,
    #[serde(default, alias = "metadata_header")]
    pub metadata: Option<bool>,
    #[serde(default, alias = "min_shrink_factor")]
    pub min_scale: Option<f64>,
    #[serde(default)]
    pub smart_layout: Option<bool>,
}

fn deserialize_row_dimensions<'de, D>(deserializer: D) -> std::result::Result<Option<RowPolicy>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?;
    RowPolicy::from_dimensions(raw)
        .map(Some)
        .map_err(serde::de::Error::custom)
}

impl LayoutSettings {
    /// Built-in defaults: landscape, automatic rows, metadata header on
    pub fn builtin() -> Self {
        Self {
            orientation: Some(Orientation::Landscape),
            row_policy: Some(RowPolicy::Automatic),
            metadata: Some(true),
            min_scale: Some(0.8),
            smart_layout: Some(false),
        }
    }

    /// Fields set here win, the rest come from `base`
    pub fn layered_over(&self, base: &LayoutSettings) -> LayoutSettings {
        LayoutSettings {
            orientation: self.orientation.or(base.orientation),
            row_policy: self.row_policy.or(base.row_policy),
            metadata: self.metadata.or(base.metadata),
            min_scale: self.min_scale.or(base.min_scale),
            smart_layout: self.smart_layout.or(base.smart_layout),
        }
    }

    /// Reject values that parse but make no sense
    pub fn validate(&self) -> Result<()> {
        if let Some(min_scale) = self.min_scale {
            if !(min_scale > 0.0 && min_scale <= 1.0) {
                return Err(Error::Config(format!(
                    "min_scale must be in (0, 1], got {min_scale}"
                )));
            }
        }
        Ok(())
    }
}

impl TryFrom<&LayoutSettings> for SheetLayoutSpec {
    type Error = Error;

    fn try_from(settings: &LayoutSettings) -> Result<Self> {
        settings.validate()?;
        Ok(SheetLayoutSpec {
            orientation: settings
                .orientation
                .ok_or(Error::IncompleteDefaults { field: "orientation" })?,
            row_policy: settings
                .row_policy
                .ok_or(Error::IncompleteDefaults { field: "row_dimensions" })?,
            metadata_enabled: settings
                .metadata
                .ok_or(Error::IncompleteDefaults { field: "metadata" })?,
            min_scale: settings
                .min_scale
                .ok_or(Error::IncompleteDefaults { field: "min_scale" })?,
            smart_layout: settings
                .smart_layout
                .ok_or(Error::IncompleteDefaults { field: "smart_layout" })?,
        })
    }
}

/// An override that applies to files and/or sheets matching its patterns
#[derive(Debug, Clone)]
pub struct OverrideRule {
    /// Glob over the file path (forward slashes, `*` may cross directories)
    pub path_pattern: Option<Pattern>,
    /// Glob over the sheet name; a literal pattern is an exact match
    pub sheet_pattern: Option<Pattern>,
    pub priority: i64,
    pub settings: LayoutSettings,
}

const PATH_MATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

fn compile(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern).map_err(|e| Error::InvalidGlob(format!("{pattern}: {e}")))
}

impl OverrideRule {
    /// A rule that matches every sheet of every file until narrowed
    pub fn new(priority: i64, settings: LayoutSettings) -> Self {
        Self {
            path_pattern: None,
            sheet_pattern: None,
            priority,
            settings,
        }
    }

    /// Restrict the rule to files whose path matches `pattern`
    pub fn for_path(mut self, pattern: &str) -> Result<Self> {
        self.path_pattern = Some(compile(pattern)?);
        Ok(self)
    }

    /// Restrict the rule to sheets whose name matches `pattern`
    pub fn for_sheet(mut self, pattern: &str) -> Result<Self> {
        self.sheet_pattern = Some(compile(pattern)?);
        Ok(self)
    }

    /// Every pattern the rule sets has to match
    pub fn matches(&self, file_path: &Path, sheet_name: &str) -> bool {
        let path_ok = self.path_pattern.as_ref().map_or(true, |pattern| {
            let normalized = file_path.to_string_lossy().replace('\\', "/");
            pattern.matches_with(&normalized, PATH_MATCH)
        });
        let sheet_ok = self
            .sheet_pattern
            .as_ref()
            .map_or(true, |pattern| pattern.matches(sheet_name));
        path_ok && sheet_ok
    }
}

/// Which of two equal-priority rules wins
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    #[default]
    FirstDeclared,
    LastDeclared,
}

/// Override rules in declaration order
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub rules: Vec<OverrideRule>,
    pub tie_break: TieBreak,
}

impl RuleSet {
    pub fn new(rules: Vec<OverrideRule>) -> Self {
        Self {
            rules,
            tie_break: TieBreak::default(),
        }
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Rules from strongest to weakest: priority descending, then tie break
    pub fn by_precedence(&self) -> Vec<&OverrideRule> {
        let mut ordered: Vec<(usize, &OverrideRule)> = self.rules.iter().enumerate().collect();
        ordered.sort_by(|(ia, a), (ib, b)| {
            let by_index = match self.tie_break {
                TieBreak::FirstDeclared => ia.cmp(ib),
                TieBreak::LastDeclared => ib.cmp(ia),
            };
            b.priority.cmp(&a.priority).then(by_index)
        });
        ordered.into_iter().map(|(_, rule)| rule).collect()
    }
}

fn strongest<T>(rules: &[&OverrideRule], field: impl Fn(&LayoutSettings) -> Option<T>) -> Option<T> {
    rules.iter().find_map(|rule| field(&rule.settings))
}

/// Resolve the layout for one sheet of one file
///
/// `defaults` must set every field, otherwise the result is
/// [`Error::IncompleteDefaults`] whether or not a rule would have filled the gap.
pub fn resolve(
    file_path: &Path,
    sheet_name: &str,
    defaults: &LayoutSettings,
    rules: &RuleSet,
) -> Result<SheetLayoutSpec> {
    let base = SheetLayoutSpec::try_from(defaults)?;

    let matching: Vec<&OverrideRule> = rules
        .by_precedence()
        .into_iter()
        .filter(|rule| rule.matches(file_path, sheet_name))
        .collect();

    let spec = SheetLayoutSpec {
        orientation: strongest(&matching, |s| s.orientation).unwrap_or(base.orientation),
        row_policy: strongest(&matching, |s| s.row_policy).unwrap_or(base.row_policy),
        metadata_enabled: strongest(&matching, |s| s.metadata).unwrap_or(base.metadata_enabled),
        min_scale: strongest(&matching, |s| s.min_scale).unwrap_or(base.min_scale),
        smart_layout: strongest(&matching, |s| s.smart_layout).unwrap_or(base.smart_layout),
    };

    debug!(
        file = %file_path.display(),
        sheet = sheet_name,
        matched_rules = matching.len(),
        ?spec,
        "resolved sheet layout"
    );

    Ok(spec)
}
