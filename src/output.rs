//! Report Output
//!
//! Where rendered reports end up. The walker hands every snapshot and the
//! final report to a [`ReportSink`]; [`FileReportWriter`] stores each one in a
//! freshly named file so that snapshots of one run never overwrite each other
//! and an interrupted run still leaves its latest snapshot behind.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::progress::Progress;

/// Characters used in file labels; no 0/O or 1/I
pub const LABEL_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub const LABEL_LENGTH: usize = 8;

/// Receives rendered reports and progress notifications
#[cfg_attr(test, mockall::automock)]
pub trait ReportSink {
    /// Store one rendered report; `hint` names the kind of report
    fn write_report(&mut self, lines: &[String], hint: &str) -> Result<PathBuf>;

    /// Observe the position of the pass at a snapshot
    fn report_progress(&mut self, progress: &Progress);
}

/// Random file label of distinct characters drawn from [`LABEL_ALPHABET`]
pub fn random_label() -> String {
    let uuid = Uuid::new_v4();
    let bytes = uuid.as_bytes();
    let mut alphabet = *LABEL_ALPHABET;
    // Partial Fisher-Yates shuffle. Bytes 6 and 8 carry the version and variant bits.
    for (i, b) in bytes[..6]
        .iter()
        .chain(&bytes[9..9 + LABEL_LENGTH - 6])
        .enumerate()
    {
        let j = i + (*b as usize) % (alphabet.len() - i);
        alphabet.swap(i, j);
    }
    alphabet[..LABEL_LENGTH].iter().map(|&c| c as char).collect()
}

/// Writes each report to `<directory>/<hint>-<LABEL>.txt`
#[derive(Debug, Clone)]
pub struct FileReportWriter {
    directory: PathBuf,
    written: Vec<PathBuf>,
}

impl FileReportWriter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            written: Vec::new(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Every file written so far, oldest first
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn next_path(&self, hint: &str) -> PathBuf {
        loop {
            let path = self
                .directory
                .join(format!("{}-{}.txt", hint, random_label()));
            if !path.exists() {
                return path;
            }
        }
    }
}

impl ReportSink for FileReportWriter {
    fn write_report(&mut self, lines: &[String], hint: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.directory)?;
        let path = self.next_path(hint);

        let mut writer = BufWriter::new(fs::File::create(&path)?);
        for line in lines {
            writeln!(writer, "{}", line)?;
        }
        writer.flush()?;

        info!("Wrote {} lines to {}", lines.len(), path.display());
        self.written.push(path.clone());
        Ok(path)
    }

    fn report_progress(&mut self, progress: &Progress) {
        info!("Progress: {}", progress);
    }
}
