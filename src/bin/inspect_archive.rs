// src/bin/inspect_archive.rs
//
// Dry run: shows what each member of an archive contributes and the table the
// report would contain, as JSON on stdout. No workbook is written.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use flowmeter_report::{
    cli::{self, SettingsArgs},
    summarize, ReportRequest,
};
use serde_json::json;
use std::{fs, path::PathBuf};

#[derive(Debug, Parser)]
#[command(name = "inspect-archive", version)]
struct Cli {
    /// ZIP archive with one CSV export per day
    archive: PathBuf,

    #[command(flatten)]
    settings: SettingsArgs,
}

fn main() -> Result<()> {
    cli::init_tracing();
    let args = Cli::parse();

    let settings = args
        .settings
        .resolve()
        .map_err(|e| anyhow!(e.user_message()))?;
    let archive = fs::read(&args.archive)
        .with_context(|| format!("Failed to read archive {:?}", args.archive))?;

    let request = ReportRequest {
        archive: &archive,
        settings,
    };
    let (batch, table) = match summarize(&request) {
        Ok(v) => v,
        Err(e) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "error": e.kind(),
                    "message": e.user_message(),
                    "details": e.to_string(),
                }))?
            );
            return Err(anyhow!(e.user_message()));
        }
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "settings": settings,
            "members": batch.members,
            "warnings": batch.warnings(),
            "table": table,
        }))?
    );
    Ok(())
}
