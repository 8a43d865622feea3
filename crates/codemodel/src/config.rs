//! Mode configuration.
//!
//! Every field has a default, so a partial YAML document only overrides what it names:
//!
//! ```yaml
//! tab_size: 4
//! fold_style: markbegin
//! ```

use crate::error::CodeModelError;
use crate::fold::FoldStyle;
use serde::{Deserialize, Serialize};

/// Tunables shared by the language modes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeConfig {
    /// Width of one indentation level in columns.
    pub tab_size: usize,
    /// Indent with spaces instead of a tab character.
    pub soft_tabs: bool,
    /// Maximum rows a backward bracket walk may cover.
    pub max_lookback_rows: usize,
    /// Maximum rows searched back for a control keyword.
    pub keyword_lookback_rows: usize,
    /// Maximum rows the textual lookaround heuristics may scan.
    pub max_lookaround_rows: usize,
    /// Maximum rows a fold range may span.
    pub max_fold_rows: usize,
    /// Which fold widgets are shown.
    pub fold_style: FoldStyle,
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            tab_size: 2,
            soft_tabs: true,
            max_lookback_rows: 200,
            keyword_lookback_rows: 10,
            max_lookaround_rows: 50,
            max_fold_rows: 10_000,
            fold_style: FoldStyle::MarkBeginEnd,
        }
    }
}

impl ModeConfig {
    /// Parse a YAML document.
    pub fn from_yaml_str(input: &str) -> Result<Self, CodeModelError> {
        let config: Self = serde_yaml::from_str(input)?;
        Ok(config.normalized())
    }

    fn normalized(mut self) -> Self {
        if self.tab_size == 0 {
            tracing::debug!("tab_size of 0 replaced with 1");
            self.tab_size = 1;
        }
        self
    }

    /// The string inserted for one indentation level.
    pub fn tab_string(&self) -> String {
        if self.soft_tabs {
            " ".repeat(self.tab_size.max(1))
        } else {
            "\t".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ModeConfig::from_yaml_str("tab_size: 4\nfold_style: markbegin\n").unwrap();
        assert_eq!(config.tab_size, 4);
        assert_eq!(config.fold_style, FoldStyle::MarkBegin);
        assert_eq!(config.max_lookback_rows, 200);
        assert_eq!(config.tab_string(), "    ");
    }

    #[test]
    fn test_hard_tabs_and_bad_input() {
        let config = ModeConfig::from_yaml_str("soft_tabs: false\ntab_size: 0").unwrap();
        assert_eq!(config.tab_string(), "\t");
        assert_eq!(config.tab_size, 1);

        let err = ModeConfig::from_yaml_str("fold_style: sideways").unwrap_err();
        assert!(matches!(err, CodeModelError::Config(_)));
    }

    #[test]
    fn test_default_round_trips_through_yaml() {
        let yaml = serde_yaml::to_string(&ModeConfig::default()).unwrap();
        assert!(yaml.contains("fold_style: markbeginend"));
        assert_eq!(ModeConfig::from_yaml_str(&yaml).unwrap(), ModeConfig::default());
    }
}
