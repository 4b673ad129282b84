// src/error.rs
use serde::Serialize;
use thiserror::Error;

/// Machine-readable classification of a failed run, handed to whatever shell
/// drives the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidSettings,
    NoMatchingMembers,
    NoValidData,
    NoValidDates,
    RenderFailure,
    UnexpectedFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidSettings => "invalid_settings",
            ErrorKind::NoMatchingMembers => "no_matching_members",
            ErrorKind::NoValidData => "no_valid_data",
            ErrorKind::NoValidDates => "no_valid_dates",
            ErrorKind::RenderFailure => "render_failure",
            ErrorKind::UnexpectedFailure => "unexpected_failure",
        }
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("invalid report settings: {0}")]
    InvalidSettings(String),

    #[error("no .csv members found in the archive")]
    NoMatchingMembers,

    #[error("no CSV member produced a valid reading")]
    NoValidData,

    #[error("none of the {records} extracted records has a YYYY/MM/DD date")]
    NoValidDates { records: usize },

    #[error("failed to write workbook: {0}")]
    Render(#[from] rust_xlsxwriter::XlsxError),

    #[error("failed to read archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("failed to read member {member}: {source}")]
    MemberIo {
        member: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in member {member}: {source}")]
    Csv {
        member: String,
        #[source]
        source: csv::Error,
    },
}

impl ReportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReportError::InvalidSettings(_) => ErrorKind::InvalidSettings,
            ReportError::NoMatchingMembers => ErrorKind::NoMatchingMembers,
            ReportError::NoValidData => ErrorKind::NoValidData,
            ReportError::NoValidDates { .. } => ErrorKind::NoValidDates,
            ReportError::Render(_) => ErrorKind::RenderFailure,
            ReportError::Archive(_) | ReportError::MemberIo { .. } | ReportError::Csv { .. } => {
                ErrorKind::UnexpectedFailure
            }
        }
    }

    /// Text safe to show an end user. Internal faults are redacted; the full
    /// detail stays in `Display` for the logs.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::InvalidSettings => self.to_string(),
            ErrorKind::NoMatchingMembers => {
                "No .csv or .CSV file was found inside the ZIP archive.".to_string()
            }
            ErrorKind::NoValidData => {
                "Processing finished, but no CSV file with valid data was found.".to_string()
            }
            ErrorKind::NoValidDates => {
                "No valid date was found. Check that the files contain dates in YYYY/MM/DD format."
                    .to_string()
            }
            ErrorKind::RenderFailure => "The spreadsheet report could not be generated.".to_string(),
            ErrorKind::UnexpectedFailure => {
                "An unexpected error occurred while processing the archive.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_stable_codes() {
        assert_eq!(ReportError::NoMatchingMembers.kind().as_str(), "no_matching_members");
        assert_eq!(
            ReportError::NoValidDates { records: 3 }.kind(),
            ErrorKind::NoValidDates
        );
        let io = ReportError::MemberIo {
            member: "a.csv".into(),
            source: std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated"),
        };
        assert_eq!(io.kind(), ErrorKind::UnexpectedFailure);
    }

    #[test]
    fn unexpected_failures_are_redacted() {
        let err = ReportError::MemberIo {
            member: "secret/path.csv".into(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "inflate failed"),
        };
        assert!(err.to_string().contains("secret/path.csv"));
        assert!(!err.user_message().contains("secret/path.csv"));
        assert!(!err.user_message().contains("inflate"));
    }

    #[test]
    fn settings_errors_keep_their_detail() {
        let err = ReportError::InvalidSettings("permitted_flow must be non-negative".into());
        assert!(err.user_message().contains("non-negative"));
    }
}
