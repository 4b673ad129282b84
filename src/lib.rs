//! Monthly flow-compliance reports from zipped daily flow-meter CSV exports.
//!
//! The pipeline runs archive → extract → aggregate → report. Each stage is a
//! plain module so the computation half can be exercised without producing a
//! workbook.

pub mod aggregate;
pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod report;

pub use aggregate::{DailyEntry, MonthlyTable, Status, TotalsRow};
pub use config::{ColumnLayout, ReportSettings, SettingsProfile, ThresholdRule};
pub use error::{ErrorKind, ReportError};
pub use extract::{DailyRecord, MemberOutcome, SkipReason};
pub use pipeline::{generate_report, summarize, BatchReport, ReportOutput, ReportRequest};
pub use report::{REPORT_CONTENT_TYPE, REPORT_FILE_NAME};

#[cfg(test)]
pub(crate) mod testutil {
    use std::io::{Cursor, Write};
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    use zip::write::SimpleFileOptions;
    use zip::CompressionMethod;

    pub fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,flowmeter_report=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    /// In-memory ZIP with the given members; names ending in `/` become
    /// directory entries.
    pub fn build_zip(entries: &[(&str, &[u8])]) -> anyhow::Result<Vec<u8>> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            for (name, content) in entries {
                if name.ends_with('/') {
                    zip.add_directory(*name, options)?;
                } else {
                    zip.start_file(*name, options)?;
                    zip.write_all(content)?;
                }
            }
            zip.finish()?;
        }
        Ok(buf)
    }
}
