//! Per-unit output sinks and the factories that create them.
//!
//! A unit's sink slot starts empty and only holds a sink once acquisition
//! succeeded. [`SinkGuard`] closes whatever it holds exactly once, either
//! through [`SinkGuard::release`] or when it is dropped on an error path.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::error::SinkError;
use crate::printer::IdentifierPolicy;
use crate::report::{
    ExceptionLog, ExceptionReporter, FileSummary, NopSummary, ProgressSink, StderrProgress, SummarySink,
};
use crate::types::TypeName;
use crate::usage::TypeUsage;

/// Write-only destination bound to one unit's output.
pub trait Dumper {
    fn print(&mut self, text: &str) -> io::Result<()>;
    fn type_usage(&self) -> &TypeUsage;
    fn identifier_policy(&self) -> IdentifierPolicy;
    fn close(&mut self) -> io::Result<()>;
}

/// Creates per-unit sinks and hands out the session's reporting sinks.
pub trait DumperFactory {
    fn top_level_dumper(
        &mut self,
        ty: &TypeName,
        summary: &mut dyn SummarySink,
        usage: TypeUsage,
        policy: IdentifierPolicy,
    ) -> Result<Box<dyn Dumper>, SinkError>;

    fn summary_sink(&mut self) -> Result<Box<dyn SummarySink>, SinkError>;

    fn progress(&mut self) -> &mut dyn ProgressSink;

    fn exceptions(&mut self) -> &mut dyn ExceptionReporter;
}

/// A [`Dumper`] over any writer.
pub struct WriterDumper<W: Write> {
    out: W,
    usage: TypeUsage,
    policy: IdentifierPolicy,
}

impl<W: Write> WriterDumper<W> {
    pub fn new(out: W, usage: TypeUsage, policy: IdentifierPolicy) -> Self {
        Self { out, usage, policy }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Dumper for WriterDumper<W> {
    fn print(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes())
    }

    fn type_usage(&self) -> &TypeUsage {
        &self.usage
    }

    fn identifier_policy(&self) -> IdentifierPolicy {
        self.policy
    }

    fn close(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// The sink slot of the unit being processed.
#[derive(Default)]
pub struct SinkGuard {
    sink: Option<Box<dyn Dumper>>,
}

impl SinkGuard {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Stores a freshly acquired sink and returns it for writing. A sink
    /// already held is closed first.
    pub fn install(&mut self, sink: Box<dyn Dumper>) -> &mut dyn Dumper {
        if let Err(err) = self.release() {
            warn!(error = %err, "failed to close replaced output sink");
        }
        self.sink.insert(sink).as_mut()
    }

    pub fn get(&mut self) -> Option<&mut (dyn Dumper + 'static)> {
        self.sink.as_deref_mut()
    }

    pub fn is_acquired(&self) -> bool {
        self.sink.is_some()
    }

    /// Closes the held sink, if any. Calling it again is a no-op.
    pub fn release(&mut self) -> io::Result<()> {
        match self.sink.take() {
            Some(mut sink) => sink.close(),
            None => Ok(()),
        }
    }
}

impl Drop for SinkGuard {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!(error = %err, "failed to close output sink");
        }
    }
}

/// Passes output through while hashing it.
pub struct DigestDumper<'a> {
    inner: &'a mut dyn Dumper,
    hasher: Sha256,
}

impl<'a> DigestDumper<'a> {
    pub fn new(inner: &'a mut dyn Dumper) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
        }
    }

    /// Hex SHA-256 of everything printed so far.
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

impl Dumper for DigestDumper<'_> {
    fn print(&mut self, text: &str) -> io::Result<()> {
        self.hasher.update(text.as_bytes());
        self.inner.print(text)
    }

    fn type_usage(&self) -> &TypeUsage {
        self.inner.type_usage()
    }

    fn identifier_policy(&self) -> IdentifierPolicy {
        self.inner.identifier_policy()
    }

    fn close(&mut self) -> io::Result<()> {
        // The guard owns the real sink and closes it.
        Ok(())
    }
}

/// Prints every unit to stdout.
#[derive(Debug, Default)]
pub struct StdoutDumperFactory {
    progress: StderrProgress,
    exceptions: ExceptionLog,
}

impl StdoutDumperFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DumperFactory for StdoutDumperFactory {
    fn top_level_dumper(
        &mut self,
        ty: &TypeName,
        _summary: &mut dyn SummarySink,
        usage: TypeUsage,
        policy: IdentifierPolicy,
    ) -> Result<Box<dyn Dumper>, SinkError> {
        debug!(class = %ty, "writing to stdout");
        Ok(Box::new(WriterDumper::new(io::stdout(), usage, policy)))
    }

    fn summary_sink(&mut self) -> Result<Box<dyn SummarySink>, SinkError> {
        Ok(Box::new(NopSummary))
    }

    fn progress(&mut self) -> &mut dyn ProgressSink {
        &mut self.progress
    }

    fn exceptions(&mut self) -> &mut dyn ExceptionReporter {
        &mut self.exceptions
    }
}

pub const SUMMARY_FILE: &str = "summary.txt";

/// Writes `<root>/<package path>/<Simple>.java` per unit and a
/// `summary.txt` at the root.
#[derive(Debug)]
pub struct DirectoryDumperFactory {
    root: PathBuf,
    clobber: bool,
    progress: StderrProgress,
    exceptions: ExceptionLog,
}

impl DirectoryDumperFactory {
    pub fn new(root: impl Into<PathBuf>, clobber: bool) -> Self {
        Self {
            root: root.into(),
            clobber,
            progress: StderrProgress,
            exceptions: ExceptionLog::default(),
        }
    }
}

impl DumperFactory for DirectoryDumperFactory {
    fn top_level_dumper(
        &mut self,
        ty: &TypeName,
        summary: &mut dyn SummarySink,
        usage: TypeUsage,
        policy: IdentifierPolicy,
    ) -> Result<Box<dyn Dumper>, SinkError> {
        let target = self.root.join(ty.source_path());
        let sink_error = |source| SinkError { ty: ty.clone(), source };

        if target.exists() && !self.clobber {
            summary.notify(&format!("Not overwriting {} (use --clobber)", target.display()));
            return Ok(Box::new(WriterDumper::new(io::sink(), usage, policy)));
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(sink_error)?;
        }
        let file = File::create(&target).map_err(sink_error)?;
        debug!(class = %ty, path = %target.display(), "writing source file");
        Ok(Box::new(WriterDumper::new(BufWriter::new(file), usage, policy)))
    }

    fn summary_sink(&mut self) -> Result<Box<dyn SummarySink>, SinkError> {
        let path = self.root.join(SUMMARY_FILE);
        let summary = FileSummary::create(&path).map_err(|source| SinkError {
            ty: TypeName::new(SUMMARY_FILE),
            source,
        })?;
        Ok(Box::new(summary))
    }

    fn progress(&mut self) -> &mut dyn ProgressSink {
        &mut self.progress
    }

    fn exceptions(&mut self) -> &mut dyn ExceptionReporter {
        &mut self.exceptions
    }
}
