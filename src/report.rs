//! Reporting sinks: progress notices, the batch summary and the exception
//! reporter.
//!
//! These are acquired once per invocation and closed once at the end of it,
//! whatever happened to the individual units in between.

use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{DecompileError, ErrorKind, describe};
use crate::types::TypeName;

pub trait ProgressSink {
    fn analysing_path(&mut self, path: &Path);
    fn analysing_type(&mut self, ty: &TypeName);
}

pub trait SummarySink {
    fn notify(&mut self, text: &str);
    fn close(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionRecord {
    pub path: PathBuf,
    pub context: Option<String>,
    pub kind: ErrorKind,
    pub message: String,
}

pub trait ExceptionReporter {
    fn note_exception(&mut self, path: &Path, context: Option<&str>, error: &DecompileError);
    fn records(&self) -> &[ExceptionRecord];
}

/// Writes `Processing ...` lines to stderr, keeping stdout for source.
#[derive(Debug, Default)]
pub struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn analysing_path(&mut self, path: &Path) {
        eprintln!("Processing {}", path.display());
    }

    fn analysing_type(&mut self, ty: &TypeName) {
        eprintln!("Processing {ty}");
    }
}

#[derive(Debug, Default)]
pub struct NopSummary;

impl SummarySink for NopSummary {
    fn notify(&mut self, _text: &str) {}

    fn close(&mut self) {}
}

/// `summary.txt` in the output directory.
#[derive(Debug)]
pub struct FileSummary {
    path: PathBuf,
    out: Option<BufWriter<File>>,
}

impl FileSummary {
    pub fn create(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            out: Some(BufWriter::new(file)),
        })
    }
}

impl SummarySink for FileSummary {
    fn notify(&mut self, text: &str) {
        let Some(out) = self.out.as_mut() else {
            warn!(path = %self.path.display(), "summary notice after close dropped");
            return;
        };
        if let Err(err) = writeln!(out, "{text}") {
            warn!(path = %self.path.display(), error = %err, "failed to write summary");
        }
    }

    fn close(&mut self) {
        if let Some(mut out) = self.out.take()
            && let Err(err) = out.flush()
        {
            warn!(path = %self.path.display(), error = %err, "failed to flush summary");
        }
    }
}

/// Keeps every record and echoes it to stderr.
#[derive(Debug, Default)]
pub struct ExceptionLog {
    records: Vec<ExceptionRecord>,
    quiet: bool,
}

impl ExceptionLog {
    pub fn quiet() -> Self {
        Self {
            records: Vec::new(),
            quiet: true,
        }
    }
}

impl ExceptionReporter for ExceptionLog {
    fn note_exception(&mut self, path: &Path, context: Option<&str>, error: &DecompileError) {
        let record = ExceptionRecord {
            path: path.to_path_buf(),
            context: context.map(str::to_string),
            kind: error.kind(),
            message: describe(error),
        };
        if !self.quiet {
            match &record.context {
                Some(context) => eprintln!("{context} {}: {}", path.display(), record.message),
                None => eprintln!("Exception processing {}: {}", path.display(), record.message),
            }
        }
        self.records.push(record);
    }

    fn records(&self) -> &[ExceptionRecord] {
        &self.records
    }
}
