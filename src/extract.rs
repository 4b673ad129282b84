// src/extract.rs
use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::config::ColumnLayout;
use crate::error::{ReportError, Result};

/// Delimiter and reading position in effect for one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedLayout {
    pub delimiter: u8,
    pub reading_column: usize,
}

impl ResolvedLayout {
    pub const SEMICOLON: Self = Self {
        delimiter: b';',
        reading_column: 4,
    };
    pub const COMMA: Self = Self {
        delimiter: b',',
        reading_column: 5,
    };

    /// The two meter exports disagree on both delimiter and column count;
    /// a `;` in the first line identifies the semicolon one.
    pub fn sniff(first_line: &str) -> Self {
        if first_line.contains(';') {
            Self::SEMICOLON
        } else {
            Self::COMMA
        }
    }

    pub fn resolve(layout: ColumnLayout, text: &str) -> Result<Self> {
        layout.validate()?;
        match layout {
            ColumnLayout::Sniff => Ok(Self::sniff(text.lines().next().unwrap_or(""))),
            ColumnLayout::Fixed {
                delimiter,
                reading_column,
            } => {
                let delimiter = u8::try_from(delimiter).map_err(|_| {
                    ReportError::InvalidSettings(format!(
                        "delimiter {:?} is not a single byte",
                        delimiter
                    ))
                })?;
                Ok(Self {
                    delimiter,
                    reading_column,
                })
            }
        }
    }

    /// Minimum number of columns a member needs to carry a reading.
    pub fn required_columns(&self) -> usize {
        self.reading_column.saturating_add(1)
    }
}

/// One member reduced to its boundary values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRecord {
    /// Member the record came from.
    pub source: String,
    /// Raw date text of the first valid row; parsed by the aggregator.
    pub date: String,
    pub hour_final: String,
    pub reading_final: f64,
    pub permitted_flow: f64,
}

/// Why a member contributed no record. None of these stop the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// No rows at all.
    Empty,
    /// The widest row is too narrow to hold the reading column.
    Malformed { columns: usize, required: usize },
    /// Rows were present but none had a numeric reading.
    NoValidReadings { rows: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum MemberOutcome {
    Extracted(DailyRecord),
    Skipped(SkipReason),
}

/// The four fields of a row that matter downstream. Missing fields in a
/// short row read as empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRow<'r> {
    pub id: &'r str,
    pub date: &'r str,
    pub hour: &'r str,
    pub reading: &'r str,
}

impl<'r> RawRow<'r> {
    pub fn project(record: &'r StringRecord, reading_column: usize) -> Self {
        let field = |i: usize| record.get(i).unwrap_or("");
        Self {
            id: field(0),
            date: field(1),
            hour: field(2),
            reading: field(reading_column),
        }
    }
}

/// ISO-8859-1: every byte is the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Accepts `1234,56` and `1234.56` alike. Unparseable or non-finite values
/// are treated as missing.
pub fn parse_reading(raw: &str) -> Option<f64> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Reduce one CSV member to a `DailyRecord`, or say why it was skipped.
#[instrument(level = "debug", skip(bytes, layout, permitted_flow), fields(bytes = bytes.len()))]
pub fn extract_member(
    member: &str,
    bytes: &[u8],
    layout: ColumnLayout,
    permitted_flow: f64,
) -> Result<MemberOutcome> {
    let text = decode_latin1(bytes);
    let resolved = ResolvedLayout::resolve(layout, &text)?;

    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(resolved.delimiter)
        .from_reader(text.as_bytes());

    let mut rows = 0usize;
    let mut columns = 0usize;
    let mut first_date: Option<String> = None;
    let mut last: Option<(String, f64)> = None;

    for result in rdr.records() {
        let record = result.map_err(|source| ReportError::Csv {
            member: member.to_string(),
            source,
        })?;
        rows += 1;
        columns = columns.max(record.len());

        let row = RawRow::project(&record, resolved.reading_column);
        let Some(reading) = parse_reading(row.reading) else {
            continue;
        };
        if first_date.is_none() {
            first_date = Some(row.date.trim().to_string());
        }
        last = Some((row.hour.trim().to_string(), reading));
    }

    if rows == 0 {
        debug!(member, "empty member skipped");
        return Ok(MemberOutcome::Skipped(SkipReason::Empty));
    }

    if columns < resolved.required_columns() {
        warn!(
            member,
            columns,
            required = resolved.required_columns(),
            "member has an unexpected format and was skipped"
        );
        return Ok(MemberOutcome::Skipped(SkipReason::Malformed {
            columns,
            required: resolved.required_columns(),
        }));
    }

    match (first_date, last) {
        (Some(date), Some((hour_final, reading_final))) => {
            debug!(member, %date, reading_final, "member extracted");
            Ok(MemberOutcome::Extracted(DailyRecord {
                source: member.to_string(),
                date,
                hour_final,
                reading_final,
                permitted_flow,
            }))
        }
        _ => {
            debug!(member, rows, "no numeric readings, member skipped");
            Ok(MemberOutcome::Skipped(SkipReason::NoValidReadings { rows }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(content: &[u8], layout: ColumnLayout) -> MemberOutcome {
        extract_member("day.csv", content, layout, 9600.0).expect("extraction should not fail")
    }

    fn record(outcome: MemberOutcome) -> DailyRecord {
        match outcome {
            MemberOutcome::Extracted(r) => r,
            other => panic!("expected a record, got {:?}", other),
        }
    }

    #[test]
    fn sniff_picks_position_from_first_line() {
        assert_eq!(
            ResolvedLayout::sniff("1;2024/03/15;00:00;A;10,5"),
            ResolvedLayout::SEMICOLON
        );
        assert_eq!(ResolvedLayout::SEMICOLON.reading_column, 4);
        assert_eq!(
            ResolvedLayout::sniff("1,2024/03/15,00:00,A,B,10.5"),
            ResolvedLayout::COMMA
        );
        assert_eq!(ResolvedLayout::COMMA.reading_column, 5);
    }

    #[test]
    fn fixed_layout_ignores_first_line() -> anyhow::Result<()> {
        let resolved = ResolvedLayout::resolve(ColumnLayout::FIXED_COMMA, "a;b;c\n")?;
        assert_eq!(resolved, ResolvedLayout::COMMA);
        Ok(())
    }

    #[test]
    fn unusable_fixed_layout_is_an_error_not_a_panic() {
        let bad = [
            ColumnLayout::Fixed {
                delimiter: '§',
                reading_column: 5,
            },
            ColumnLayout::Fixed {
                delimiter: ',',
                reading_column: usize::MAX,
            },
        ];
        for layout in bad {
            let err = extract_member("a.csv", b"1,2024/03/01,00:00,A,B,5\n", layout, 1.0)
                .unwrap_err();
            assert!(matches!(err, ReportError::InvalidSettings(_)), "{:?}", layout);
        }
    }

    #[test]
    fn required_columns_saturates() {
        let resolved = ResolvedLayout {
            delimiter: b',',
            reading_column: usize::MAX,
        };
        assert_eq!(resolved.required_columns(), usize::MAX);
    }

    #[test]
    fn reading_coercion_handles_both_separators() {
        assert_eq!(parse_reading("1234,56"), Some(1234.56));
        assert_eq!(parse_reading("1234.56"), Some(1234.56));
        assert_eq!(parse_reading(" 42 "), Some(42.0));
        assert_eq!(parse_reading(""), None);
        assert_eq!(parse_reading("n/a"), None);
        assert_eq!(parse_reading("1.234,56"), None);
        assert_eq!(parse_reading("NaN"), None);
    }

    #[test]
    fn latin1_decoding_keeps_accents() {
        // "Vazão" in ISO-8859-1
        let bytes = [0x56, 0x61, 0x7A, 0xE3, 0x6F];
        assert_eq!(decode_latin1(&bytes), "Vazão");
    }

    #[test]
    fn semicolon_member_reduces_to_boundary_values() {
        let content = "\
7;2024/03/15;00:00;X;1000,5
7;2024/03/15;12:00;X;1100,25
7;2024/03/15;23:59;X;1200,75
";
        let r = record(extract(content.as_bytes(), ColumnLayout::Sniff));
        assert_eq!(r.date, "2024/03/15");
        assert_eq!(r.hour_final, "23:59");
        assert_eq!(r.reading_final, 1200.75);
        assert_eq!(r.permitted_flow, 9600.0);
        assert_eq!(r.source, "day.csv");
    }

    #[test]
    fn comma_member_uses_column_five() {
        let content = "\
7,2024/03/15,00:00,X,Y,500.0
7,2024/03/15,23:00,X,Y,\"650,5\"
";
        let r = record(extract(content.as_bytes(), ColumnLayout::Sniff));
        assert_eq!(r.reading_final, 650.5);
        assert_eq!(r.hour_final, "23:00");
    }

    #[test]
    fn header_and_bad_rows_are_dropped_not_the_file() {
        let mut content = b"ID;Data;Hora;Tipo;Vaz\xE3o\n".to_vec();
        content.extend_from_slice(b"1;2024/03/16;00:10;A;10,0\n");
        content.extend_from_slice(b"1;2024/03/16;00:20;A;erro\n");
        content.extend_from_slice(b"1;2024/03/16;00:30;A;30,0\n");
        content.extend_from_slice(b"1;2024/03/16;00:40;A;\n");
        let r = record(extract(&content, ColumnLayout::Sniff));
        assert_eq!(r.date, "2024/03/16");
        assert_eq!(r.hour_final, "00:30");
        assert_eq!(r.reading_final, 30.0);
    }

    #[test]
    fn narrow_member_is_malformed() {
        let content = "1;2024/03/15;00:00;10,0\n";
        assert_eq!(
            extract(content.as_bytes(), ColumnLayout::Sniff),
            MemberOutcome::Skipped(SkipReason::Malformed {
                columns: 4,
                required: 5
            })
        );
    }

    #[test]
    fn member_without_numeric_readings_is_skipped() {
        let content = "1;2024/03/15;00:00;A;--\n1;2024/03/15;01:00;A;--\n";
        assert_eq!(
            extract(content.as_bytes(), ColumnLayout::Sniff),
            MemberOutcome::Skipped(SkipReason::NoValidReadings { rows: 2 })
        );
    }

    #[test]
    fn empty_member_is_skipped() {
        assert_eq!(
            extract(b"", ColumnLayout::Sniff),
            MemberOutcome::Skipped(SkipReason::Empty)
        );
    }

    #[test]
    fn ragged_rows_use_widest_row_for_the_guard() {
        let content = "\
1;2024/03/15;00:00
1;2024/03/15;06:00;A;15,0
";
        let r = record(extract(content.as_bytes(), ColumnLayout::Sniff));
        assert_eq!(r.reading_final, 15.0);
        assert_eq!(r.hour_final, "06:00");
    }

    #[test]
    fn fixed_semicolon_layout_with_custom_column() {
        let layout = ColumnLayout::Fixed {
            delimiter: ';',
            reading_column: 3,
        };
        let content = "1;2024/03/15;08:00;77,7\n";
        let r = record(extract(content.as_bytes(), layout));
        assert_eq!(r.reading_final, 77.7);
    }
}
