// src/config.rs
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::error::{ReportError, Result};

/// Which side of the permitted flow counts as a violation.
///
/// There is deliberately no default: a downstream-release licence and a
/// consumption cap are different business rules over the same data, and every
/// deployment has to say which one it enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdRule {
    /// Irregular when the day's flow is strictly below the permitted flow
    /// (mandated minimum release downstream).
    IrregularBelow,
    /// Irregular when the day's flow is strictly above the permitted flow
    /// (consumption cap).
    IrregularAbove,
}

impl ThresholdRule {
    /// True when `daily_flow` breaks the rule for `permitted_flow`.
    pub fn is_violation(&self, daily_flow: f64, permitted_flow: f64) -> bool {
        match self {
            ThresholdRule::IrregularBelow => daily_flow < permitted_flow,
            ThresholdRule::IrregularAbove => daily_flow > permitted_flow,
        }
    }
}

/// How the reading column of each CSV member is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnLayout {
    /// `;` anywhere in the first line means semicolon-delimited with the
    /// reading at field 4; otherwise comma-delimited with the reading at field 5.
    #[default]
    Sniff,
    /// Same delimiter and reading position for every member.
    Fixed { delimiter: char, reading_column: usize },
}

impl ColumnLayout {
    /// The six-column comma export used by single-generator deployments.
    pub const FIXED_COMMA: ColumnLayout = ColumnLayout::Fixed {
        delimiter: ',',
        reading_column: 5,
    };

    pub const FIXED_SEMICOLON: ColumnLayout = ColumnLayout::Fixed {
        delimiter: ';',
        reading_column: 4,
    };

    /// Widest reading position a fixed layout may name.
    pub const MAX_READING_COLUMN: usize = 1024;

    /// Delimiter must be one ASCII byte usable by the CSV reader; the reading
    /// position must be a plausible column index.
    pub fn validate(&self) -> Result<()> {
        if let ColumnLayout::Fixed {
            delimiter,
            reading_column,
        } = *self
        {
            if !delimiter.is_ascii() || matches!(delimiter, '"' | '\n' | '\r') {
                return Err(ReportError::InvalidSettings(format!(
                    "delimiter must be a single ASCII character other than a quote or newline (got {:?})",
                    delimiter
                )));
            }
            if reading_column > Self::MAX_READING_COLUMN {
                return Err(ReportError::InvalidSettings(format!(
                    "reading_column must be at most {} (got {})",
                    Self::MAX_READING_COLUMN,
                    reading_column
                )));
            }
        }
        Ok(())
    }
}

/// Immutable per-run settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportSettings {
    pub permitted_flow: f64,
    pub rule: ThresholdRule,
    #[serde(default)]
    pub layout: ColumnLayout,
}

impl ReportSettings {
    pub fn new(permitted_flow: f64, rule: ThresholdRule, layout: ColumnLayout) -> Result<Self> {
        let settings = Self {
            permitted_flow,
            rule,
            layout,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.permitted_flow.is_finite() || self.permitted_flow < 0.0 {
            return Err(ReportError::InvalidSettings(format!(
                "permitted_flow must be a finite, non-negative number (got {})",
                self.permitted_flow
            )));
        }
        self.layout.validate()
    }
}

/// A deployment profile as stored on disk. Every field is optional so the
/// command line can fill or override parts of it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsProfile {
    pub permitted_flow: Option<f64>,
    pub rule: Option<ThresholdRule>,
    pub layout: Option<ColumnLayout>,
}

impl SettingsProfile {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| ReportError::InvalidSettings(format!("bad profile: {}", e)))
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            ReportError::InvalidSettings(format!("cannot read profile {:?}: {}", path, e))
        })?;
        Self::from_yaml_str(&text)
    }

    /// Fill the gaps with `default_flow` / `ColumnLayout::Sniff`. The rule has
    /// no fallback and must be present by now.
    pub fn into_settings(self, default_flow: f64) -> Result<ReportSettings> {
        let rule = self.rule.ok_or_else(|| {
            ReportError::InvalidSettings(
                "no threshold rule given: choose irregular_below or irregular_above".to_string(),
            )
        })?;
        ReportSettings::new(
            self.permitted_flow.unwrap_or(default_flow),
            rule,
            self.layout.unwrap_or_default(),
        )
    }
}
