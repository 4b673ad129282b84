// src/cli.rs
//! Pieces shared by the binaries: settings flags and logging setup.

use clap::{Args, ValueEnum};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{ColumnLayout, ReportSettings, SettingsProfile, ThresholdRule};
use crate::error::Result;

/// Threshold offered when neither the flags nor the profile give one.
pub const DEFAULT_PERMITTED_FLOW: f64 = 9600.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RuleArg {
    IrregularBelow,
    IrregularAbove,
}

impl From<RuleArg> for ThresholdRule {
    fn from(arg: RuleArg) -> Self {
        match arg {
            RuleArg::IrregularBelow => ThresholdRule::IrregularBelow,
            RuleArg::IrregularAbove => ThresholdRule::IrregularAbove,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LayoutArg {
    Sniff,
    FixedComma,
    FixedSemicolon,
}

#[derive(Debug, Clone, Args)]
pub struct SettingsArgs {
    /// YAML deployment profile; flags below override its fields
    #[arg(long, env = "FLOWMETER_PROFILE")]
    pub profile: Option<PathBuf>,

    /// Permitted daily flow in m³ [default: 9600]
    #[arg(long, env = "FLOWMETER_PERMITTED_FLOW")]
    pub permitted_flow: Option<f64>,

    /// Which side of the permitted flow is a violation
    #[arg(long, value_enum, env = "FLOWMETER_RULE")]
    pub rule: Option<RuleArg>,

    /// How the reading column is located in each CSV
    #[arg(long, value_enum, env = "FLOWMETER_LAYOUT")]
    pub layout: Option<LayoutArg>,

    /// Reading column (0-based) for the fixed layouts
    #[arg(long)]
    pub reading_column: Option<usize>,
}

impl SettingsArgs {
    pub fn resolve(&self) -> Result<ReportSettings> {
        let mut profile = match &self.profile {
            Some(path) => SettingsProfile::from_yaml_file(path)?,
            None => SettingsProfile::default(),
        };

        if let Some(flow) = self.permitted_flow {
            profile.permitted_flow = Some(flow);
        }
        if let Some(rule) = self.rule {
            profile.rule = Some(rule.into());
        }
        if let Some(layout) = self.layout {
            profile.layout = Some(self.column_layout(layout));
        } else if self.reading_column.is_some() {
            warn!("--reading-column only applies together with a fixed --layout; ignored");
        }

        profile.into_settings(DEFAULT_PERMITTED_FLOW)
    }

    fn column_layout(&self, layout: LayoutArg) -> ColumnLayout {
        match layout {
            LayoutArg::Sniff => {
                if self.reading_column.is_some() {
                    warn!("--reading-column has no effect with --layout sniff");
                }
                ColumnLayout::Sniff
            }
            LayoutArg::FixedComma => ColumnLayout::Fixed {
                delimiter: ',',
                reading_column: self.reading_column.unwrap_or(5),
            },
            LayoutArg::FixedSemicolon => ColumnLayout::Fixed {
                delimiter: ';',
                reading_column: self.reading_column.unwrap_or(4),
            },
        }
    }
}

/// stderr logging filtered by `RUST_LOG`, `info` when unset.
pub fn init_tracing() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();
}
