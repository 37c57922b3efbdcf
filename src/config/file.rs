//! Loading layout configuration from `config.yml`

use std::path::Path;

use glob::Pattern;
use serde::Deserialize;
use tracing::{debug, info};

use super::{resolve, LayoutSettings, OverrideRule, RuleSet, SheetLayoutSpec, TieBreak};
use crate::error::{Error, Result};

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE: &str = "config.yml";

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    defaults: LayoutSettings,
    #[serde(default, alias = "sheetName")]
    sheet_name: Option<String>,
    #[serde(default)]
    tie_break: TieBreak,
    #[serde(default)]
    rules: Vec<RawRule>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRule {
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default, alias = "sheetName")]
    sheet_name: Option<String>,
    #[serde(default)]
    priority: i64,
    #[serde(default)]
    settings: LayoutSettings,
}

/// Everything needed to resolve sheet layouts for a run
///
/// Read-only once loaded; shared by reference across sheet tasks.
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Total defaults (file defaults layered over the built-in ones)
    pub defaults: LayoutSettings,
    pub rules: RuleSet,
    /// Only sheets whose name matches are planned
    pub sheet_filter: Option<Pattern>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            defaults: LayoutSettings::builtin(),
            rules: RuleSet::default(),
            sheet_filter: None,
        }
    }
}

impl LayoutConfig {
    /// Load configuration from a YAML file
    ///
    /// A missing file yields the built-in configuration. Anything
    /// unreadable or unrecognized is a [`Error::Config`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "no config file, using built-in defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_yaml_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), strip_prefix(&e))))?;

        debug!(
            path = %path.display(),
            rules = config.rules.rules.len(),
            "loaded layout config"
        );
        Ok(config)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let raw: RawConfig = if text.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str(text).map_err(|e| Error::Config(e.to_string()))?
        };

        raw.defaults.validate()?;
        let defaults = raw.defaults.layered_over(&LayoutSettings::builtin());

        let mut rules = Vec::with_capacity(raw.rules.len());
        for entry in raw.rules {
            entry.settings.validate()?;
            let mut rule = OverrideRule::new(entry.priority, entry.settings);
            if let Some(pattern) = entry.pattern.as_deref().filter(|p| *p != "*") {
                rule = rule.for_path(pattern)?;
            }
            if let Some(pattern) = entry.sheet_name.as_deref().filter(|p| *p != "*") {
                rule = rule.for_sheet(pattern)?;
            }
            rules.push(rule);
        }

        let sheet_filter = raw
            .sheet_name
            .as_deref()
            .map(|p| Pattern::new(p).map_err(|e| Error::InvalidGlob(format!("{p}: {e}"))))
            .transpose()?;

        Ok(Self {
            defaults,
            rules: RuleSet::new(rules).with_tie_break(raw.tie_break),
            sheet_filter,
        })
    }

    /// Resolve the layout of one sheet
    pub fn resolve_sheet(&self, file_path: &Path, sheet_name: &str) -> Result<SheetLayoutSpec> {
        resolve(file_path, sheet_name, &self.defaults, &self.rules)
    }

    /// Whether the sheet filter lets this sheet through
    pub fn selects_sheet(&self, sheet_name: &str) -> bool {
        self.sheet_filter
            .as_ref()
            .map_or(true, |pattern| pattern.matches(sheet_name))
    }
}

fn strip_prefix(err: &Error) -> String {
    match err {
        Error::Config(message) => message.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RowPolicy;
    use crate::layout::Orientation;
    use std::io::Write;

    const SAMPLE: &str = r#"
defaults:
  orientation: portrait
  metadata: true
tie_break: last_declared
rules:
  - sheet_name: "*Summary*"
    priority: 50
    settings:
      row_dimensions: 0
  - pattern: "**/CONFIDENTIAL/**"
    priority: 100
    settings:
      metadata_header: false
      rowDimensions: null
"#;

    #[test]
    fn test_parse_sample() {
        let config = LayoutConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(config.rules.rules.len(), 2);
        assert_eq!(config.rules.tie_break, TieBreak::LastDeclared);
        assert_eq!(config.defaults.orientation, Some(Orientation::Portrait));
        // Not set in the file, so taken from the built-in defaults
        assert_eq!(config.defaults.min_scale, Some(0.8));

        let spec = config
            .resolve_sheet(Path::new("in/CONFIDENTIAL/q.xlsx"), "Year Summary")
            .unwrap();
        assert_eq!(spec.orientation, Orientation::Portrait);
        assert!(!spec.metadata_enabled);
        // An explicit null is a setting (automatic), not an absence
        assert_eq!(spec.row_policy, RowPolicy::Automatic);

        let spec = config.resolve_sheet(Path::new("in/q.xlsx"), "Year Summary").unwrap();
        assert_eq!(spec.row_policy, RowPolicy::FitAllRowsOnOnePage);
        assert!(spec.metadata_enabled);
    }

    #[test]
    fn test_empty_text_is_builtin() {
        let config = LayoutConfig::from_yaml_str("").unwrap();
        assert_eq!(config.defaults, LayoutSettings::builtin());
        assert!(config.rules.rules.is_empty());
    }

    #[test]
    fn test_unrecognized_values_are_config_errors() {
        for text in [
            "defaults:\n  orientation: sideways\n",
            "defaults:\n  row_dimensions: -3\n",
            "defaults:\n  min_scale: 2.0\n",
            "defaults:\n  colour: red\n",
            "rules:\n  - priority: 1\n    settings:\n      metadata: maybe\n",
            "rules:\n  - sheet_name: \"[\"\n",
        ] {
            let err = LayoutConfig::from_yaml_str(text).unwrap_err();
            assert!(err.is_config(), "{text:?} gave {err}");
        }
    }

    #[test]
    fn test_sheet_filter() {
        let config = LayoutConfig::from_yaml_str("sheet_name: \"Q*\"\n").unwrap();
        assert!(config.selects_sheet("Q1"));
        assert!(!config.selects_sheet("Notes"));
        assert!(LayoutConfig::default().selects_sheet("Notes"));
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let config = LayoutConfig::load(Path::new("definitely/not/here.yml")).unwrap();
        assert_eq!(config.defaults, LayoutSettings::builtin());
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"defaults:\n  row_dimensions: 25\n").unwrap();

        let config = LayoutConfig::load(&path).unwrap();
        assert_eq!(config.defaults.row_policy.and_then(|p| p.dimensions()), Some(25));

        std::fs::write(&path, "defaults: [unclosed").unwrap();
        let err = LayoutConfig::load(&path).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("config.yml"));
    }
}
