// src/aggregate.rs
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, instrument};

use crate::config::ThresholdRule;
use crate::error::{ReportError, Result};
use crate::extract::DailyRecord;

/// Format the meters write dates in.
pub const SOURCE_DATE_FORMAT: &str = "%Y/%m/%d";
/// Format dates are shown in on the report.
pub const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";
pub const TOTALS_LABEL: &str = "TOTAL MENSAL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    Regular,
    Irregular,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Regular => "Regular",
            Status::Irregular => "Irregular",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyEntry {
    pub source: String,
    pub date: NaiveDate,
    pub hour_final: String,
    pub reading_final: f64,
    pub daily_flow: f64,
    pub permitted_flow: f64,
    pub status: Status,
}

impl DailyEntry {
    pub fn display_date(&self) -> String {
        self.date.format(DISPLAY_DATE_FORMAT).to_string()
    }
}

/// Trailing display-only row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalsRow {
    pub label: &'static str,
    pub daily_flow: f64,
    pub permitted_flow: f64,
}

impl TotalsRow {
    fn from_entries(entries: &[DailyEntry]) -> Self {
        Self {
            label: TOTALS_LABEL,
            daily_flow: entries.iter().map(|e| e.daily_flow).sum(),
            permitted_flow: entries.iter().map(|e| e.permitted_flow).sum(),
        }
    }
}

/// Days in ascending date order plus their totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTable {
    pub rule: ThresholdRule,
    pub entries: Vec<DailyEntry>,
    pub totals: TotalsRow,
}

impl MonthlyTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn irregular_days(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == Status::Irregular)
            .count()
    }
}

/// Strict `YYYY/MM/DD`; anything else is `None`.
pub fn parse_record_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), SOURCE_DATE_FORMAT).ok()
}

/// Turn extracted records into the classified monthly table.
///
/// Records come in archive member order. Undated records are dropped, the
/// rest are sorted by date (ties keep member order) and differenced in a
/// single pass. The first day has nothing to diff against, so its flow is 0
/// and it is always Regular.
#[instrument(level = "info", skip(records), fields(records = records.len()))]
pub fn build_table(records: Vec<DailyRecord>, rule: ThresholdRule) -> Result<MonthlyTable> {
    if records.is_empty() {
        return Err(ReportError::NoValidData);
    }
    let extracted = records.len();

    let mut dated: Vec<(NaiveDate, DailyRecord)> = records
        .into_iter()
        .filter_map(|r| match parse_record_date(&r.date) {
            Some(d) => Some((d, r)),
            None => {
                debug!(source = %r.source, date = %r.date, "dropping record with unparseable date");
                None
            }
        })
        .collect();

    if dated.is_empty() {
        return Err(ReportError::NoValidDates { records: extracted });
    }

    // stable: equal dates stay in member order
    dated.sort_by_key(|(d, _)| *d);

    let mut entries = Vec::with_capacity(dated.len());
    let mut previous: Option<f64> = None;
    for (date, r) in dated {
        let (daily_flow, status) = match previous {
            None => (0.0, Status::Regular),
            Some(prev) => {
                let flow = r.reading_final - prev;
                let status = if rule.is_violation(flow, r.permitted_flow) {
                    Status::Irregular
                } else {
                    Status::Regular
                };
                (flow, status)
            }
        };
        previous = Some(r.reading_final);
        entries.push(DailyEntry {
            source: r.source,
            date,
            hour_final: r.hour_final,
            reading_final: r.reading_final,
            daily_flow,
            permitted_flow: r.permitted_flow,
            status,
        });
    }

    let totals = TotalsRow::from_entries(&entries);
    let table = MonthlyTable {
        rule,
        entries,
        totals,
    };
    info!(
        days = table.len(),
        dropped = extracted - table.len(),
        irregular = table.irregular_days(),
        "monthly table built"
    );
    Ok(table)
}
