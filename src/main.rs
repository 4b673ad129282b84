use anyhow::{anyhow, Context, Result};
use clap::Parser;
use flowmeter_report::{
    cli::{self, SettingsArgs},
    generate_report, ReportRequest,
};
use std::{fs, path::PathBuf, time::Instant};
use tracing::info;

/// Build the monthly compliance workbook from a ZIP of daily flow-meter CSVs.
#[derive(Debug, Parser)]
#[command(name = "flowmeter-report", version)]
struct Cli {
    /// ZIP archive with one CSV export per day
    archive: PathBuf,

    /// Directory the workbook is written to
    #[arg(long, env = "FLOWMETER_OUT_DIR", default_value = ".")]
    out_dir: PathBuf,

    #[command(flatten)]
    settings: SettingsArgs,
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    cli::init_tracing();
    let args = Cli::parse();

    // ─── 2) settings + input ─────────────────────────────────────────
    let settings = args
        .settings
        .resolve()
        .map_err(|e| anyhow!(e.user_message()))?;
    let archive = fs::read(&args.archive)
        .with_context(|| format!("Failed to read archive {:?}", args.archive))?;
    info!(
        archive = %args.archive.display(),
        permitted_flow = settings.permitted_flow,
        rule = ?settings.rule,
        layout = ?settings.layout,
        "startup"
    );

    // ─── 3) run the pipeline ─────────────────────────────────────────
    let start = Instant::now();
    let request = ReportRequest {
        archive: &archive,
        settings,
    };
    let output = generate_report(&request).map_err(|e| anyhow!(e.user_message()))?;

    // ─── 4) write the workbook ───────────────────────────────────────
    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating output directory {:?}", args.out_dir))?;
    let out_path = args.out_dir.join(output.file_name());
    fs::write(&out_path, &output.workbook)
        .with_context(|| format!("writing workbook {:?}", out_path))?;

    info!(
        path = %out_path.display(),
        days = output.table.len(),
        irregular = output.table.irregular_days(),
        elapsed = ?start.elapsed(),
        "report written"
    );
    Ok(())
}
