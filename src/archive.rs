// src/archive.rs
use std::io::{Cursor, Read};
use tracing::{debug, info, instrument};
use zip::ZipArchive;

use crate::error::{ReportError, Result};

/// Upper bound on what a member's declared size may pre-allocate; larger
/// members still read fine, the buffer just grows as data arrives.
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// Capacity to reserve for a member whose header claims `declared` bytes.
/// The header is untrusted input.
fn initial_capacity(declared: u64) -> usize {
    declared.min(MAX_PREALLOC) as usize
}

/// True for member names ending in `.csv`, any case.
pub fn is_csv_name(name: &str) -> bool {
    name.to_lowercase().ends_with(".csv")
}

/// An uploaded ZIP held in memory, together with its CSV members in name order.
pub struct CsvArchive<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
    members: Vec<String>,
}

impl<'a> CsvArchive<'a> {
    /// Open `bytes` as a ZIP and list the CSV members, sorted by name.
    ///
    /// Fails with `NoMatchingMembers` when there are none; the caller should
    /// not retry.
    #[instrument(level = "info", skip(bytes), fields(bytes = bytes.len()))]
    pub fn open(bytes: &'a [u8]) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(bytes))?;

        let mut members: Vec<String> = archive
            .file_names()
            .filter(|name| !name.ends_with('/') && is_csv_name(name))
            .map(str::to_string)
            .collect();
        members.sort();

        info!(
            entries = archive.len(),
            csv_members = members.len(),
            "opened archive"
        );

        if members.is_empty() {
            return Err(ReportError::NoMatchingMembers);
        }

        Ok(Self { archive, members })
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Read one member fully into memory. Content is not decoded here.
    pub fn read_member(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut entry = self.archive.by_name(name)?;
        let mut buf = Vec::with_capacity(initial_capacity(entry.size()));
        entry
            .read_to_end(&mut buf)
            .map_err(|source| ReportError::MemberIo {
                member: name.to_string(),
                source,
            })?;
        debug!(member = name, bytes = buf.len(), "read member");
        Ok(buf)
    }
}
