// src/pipeline.rs
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::aggregate::{build_table, MonthlyTable};
use crate::archive::CsvArchive;
use crate::config::ReportSettings;
use crate::error::Result;
use crate::extract::{extract_member, DailyRecord, MemberOutcome, SkipReason};
use crate::report;

/// Everything a run needs. Built by the caller, never mutated by the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct ReportRequest<'a> {
    pub archive: &'a [u8],
    pub settings: ReportSettings,
}

/// Per-member results, in archive order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub members: Vec<(String, MemberOutcome)>,
}

impl BatchReport {
    pub fn extracted(&self) -> impl Iterator<Item = &DailyRecord> {
        self.members.iter().filter_map(|(_, o)| match o {
            MemberOutcome::Extracted(r) => Some(r),
            MemberOutcome::Skipped(_) => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&str, &SkipReason)> {
        self.members.iter().filter_map(|(name, o)| match o {
            MemberOutcome::Skipped(reason) => Some((name.as_str(), reason)),
            MemberOutcome::Extracted(_) => None,
        })
    }

    /// Members skipped for structural reasons; these are worth showing the user.
    pub fn warnings(&self) -> Vec<String> {
        self.skipped()
            .filter_map(|(name, reason)| match reason {
                SkipReason::Malformed { columns, required } => Some(format!(
                    "File '{}' has an unexpected format ({} columns, {} required) and was ignored.",
                    name, columns, required
                )),
                _ => None,
            })
            .collect()
    }
}

/// A finished report.
#[derive(Debug, Clone)]
pub struct ReportOutput {
    pub workbook: Vec<u8>,
    pub batch: BatchReport,
    pub table: MonthlyTable,
}

impl ReportOutput {
    pub fn file_name(&self) -> &'static str {
        report::REPORT_FILE_NAME
    }

    pub fn content_type(&self) -> &'static str {
        report::REPORT_CONTENT_TYPE
    }
}

/// Read every CSV member and reduce it to an outcome.
#[instrument(level = "info", skip(request), fields(bytes = request.archive.len()))]
pub fn read_batch(request: &ReportRequest<'_>) -> Result<BatchReport> {
    request.settings.validate()?;
    let mut archive = CsvArchive::open(request.archive)?;
    let names = archive.members().to_vec();

    let mut batch = BatchReport::default();
    for name in names {
        let bytes = archive.read_member(&name)?;
        let outcome = extract_member(
            &name,
            &bytes,
            request.settings.layout,
            request.settings.permitted_flow,
        )?;
        batch.members.push((name, outcome));
    }
    Ok(batch)
}

/// The computation half: archive to classified table, no spreadsheet involved.
pub fn summarize(request: &ReportRequest<'_>) -> Result<(BatchReport, MonthlyTable)> {
    let batch = read_batch(request)?;
    for warning in batch.warnings() {
        warn!("{}", warning);
    }
    let records: Vec<DailyRecord> = batch.extracted().cloned().collect();
    let table = build_table(records, request.settings.rule)?;
    Ok((batch, table))
}

/// Run the whole pipeline. On failure nothing is returned but the error; its
/// details are logged here so callers only need `user_message()`.
pub fn generate_report(request: &ReportRequest<'_>) -> Result<ReportOutput> {
    let result = summarize(request).and_then(|(batch, table)| {
        let workbook = report::render(&table)?;
        Ok(ReportOutput {
            workbook,
            batch,
            table,
        })
    });

    match &result {
        Ok(out) => info!(
            days = out.table.len(),
            irregular = out.table.irregular_days(),
            skipped = out.batch.skipped().count(),
            "report generated"
        ),
        Err(e) => error!(kind = e.kind().as_str(), error = %e, "report generation failed"),
    }
    result
}
