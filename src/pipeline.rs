//! Drives units through resolve, name, analyse, collect usage and dump.
//!
//! [`decompile_one_unit`] never fails: whatever goes wrong is recorded
//! against the input path. [`decompile_collection`] isolates failures per
//! archive member and only gives up when no sink can be created.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::cache::UnitId;
use crate::error::{DecompileError, ErrorKind, describe};
use crate::output::{DigestDumper, Dumper, DumperFactory, SinkGuard};
use crate::printer::{TOOL_NAME, TOOL_VERSION, dump_class, dump_method};
use crate::report::{NopSummary, SummarySink};
use crate::session::AnalysisSession;
use crate::types::TypeName;
use crate::usage::TypeUsage;

const ARCHIVE_CONTEXT: &str = "Exception analysing jar";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UnitOutcome {
    Dumped {
        #[serde(rename = "type")]
        ty: TypeName,
        /// SHA-256 of the text written for this unit.
        digest: String,
    },
    SkippedInner {
        #[serde(rename = "type")]
        ty: TypeName,
    },
    Recovered {
        #[serde(rename = "type")]
        ty: TypeName,
        kind: ErrorKind,
        note: String,
    },
    Failed {
        path: PathBuf,
        kind: ErrorKind,
        message: String,
    },
}

impl UnitOutcome {
    pub fn is_dumped(&self) -> bool {
        matches!(self, UnitOutcome::Dumped { .. })
    }

    pub fn digest(&self) -> Option<&str> {
        match self {
            UnitOutcome::Dumped { digest, .. } => Some(digest),
            _ => None,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, UnitOutcome::Failed { kind: ErrorKind::Fatal, .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub archive: PathBuf,
    /// Types left after the archive filter.
    pub candidates: usize,
    pub units: Vec<UnitOutcome>,
}

impl BatchReport {
    pub fn dumped(&self) -> usize {
        self.units.iter().filter(|u| u.is_dumped()).count()
    }

    pub fn recovered(&self) -> usize {
        self.units
            .iter()
            .filter(|u| matches!(u, UnitOutcome::Recovered { .. }))
            .count()
    }

    pub fn skipped_inner(&self) -> usize {
        self.units
            .iter()
            .filter(|u| matches!(u, UnitOutcome::SkippedInner { .. }))
            .count()
    }
}

/// Decompiles the class file at `path`.
///
/// With `skip_if_inner`, a class that says it is nested produces nothing at
/// all. Failures are handed to the factory's exception reporter.
pub fn decompile_one_unit(
    session: &mut AnalysisSession,
    path: &Path,
    skip_if_inner: bool,
    factory: &mut dyn DumperFactory,
) -> UnitOutcome {
    match dump_one(session, path, skip_if_inner, factory) {
        Ok(outcome) => outcome,
        Err(err) => {
            factory.exceptions().note_exception(path, None, &err);
            UnitOutcome::Failed {
                path: path.to_path_buf(),
                kind: err.kind(),
                message: describe(&err),
            }
        }
    }
}

fn dump_one(
    session: &mut AnalysisSession,
    path: &Path,
    skip_if_inner: bool,
    factory: &mut dyn DumperFactory,
) -> Result<UnitOutcome, DecompileError> {
    let by_path = session.cache_mut().resolve_by_path(path)?;
    let ty = session.cache().unit(by_path).ty.clone();
    if skip_if_inner && session.cache().unit(by_path).is_inner_class() {
        debug!(class = %ty, "skipping inner class");
        return Ok(UnitOutcome::SkippedInner { ty });
    }
    factory.progress().analysing_type(&ty);

    // Prefer the cached unit for this identity over whatever file we were given.
    let id = match session.cache_mut().resolve_by_identity(&ty) {
        Ok(id) => id,
        Err(err) if err.is_cannot_load() => by_path,
        Err(err) => return Err(err.into()),
    };

    if session.options().decompile_inner_classes {
        session.cache_mut().load_inner_classes(id);
    }
    if session.options().renames_members() {
        let loaded = session.cache().list_loaded();
        session.resolve_names(&loaded);
    }

    session
        .analyse(id)
        .map_err(|source| DecompileError::Analysis { ty: ty.clone(), source })?;
    let model = session
        .model(id)
        .map_err(|source| DecompileError::Analysis { ty: ty.clone(), source })?;
    let usage = TypeUsage::collect(model);

    let methods = match &session.options().method_filter {
        Some(name) => {
            let found: Vec<_> = model.methods_named(name).collect();
            if found.is_empty() {
                return Err(DecompileError::NoSuchMethod(name.clone()));
            }
            Some(found)
        }
        None => None,
    };

    let mut guard = SinkGuard::empty();
    let sink = factory.top_level_dumper(
        &ty,
        &mut NopSummary,
        usage,
        session.options().identifier_policy(),
    )?;
    let sink = guard.install(sink);
    let mut digesting = DigestDumper::new(sink);
    let written = match methods {
        Some(methods) => methods
            .into_iter()
            .try_for_each(|method| dump_method(model, method, &mut digesting)),
        None => dump_class(model, &mut digesting),
    };
    written.map_err(|source| DecompileError::Dump { ty: ty.clone(), source })?;
    let digest = digesting.finish();
    guard
        .release()
        .map_err(|source| DecompileError::Dump { ty: ty.clone(), source })?;

    session.mark_dumped(id);
    Ok(UnitOutcome::Dumped { ty, digest })
}

/// Decompiles every top-level class of the archive at `archive`.
///
/// Returns `Err` only when the run had to stop: the archive could not be
/// read, or the factory could not create a sink. That error has already been
/// recorded and noted in the summary.
pub fn decompile_collection(
    session: &mut AnalysisSession,
    archive: &Path,
    factory: &mut dyn DumperFactory,
) -> Result<BatchReport, DecompileError> {
    let mut summary = match factory.summary_sink() {
        Ok(summary) => summary,
        Err(err) => {
            let err = DecompileError::from(err);
            factory.exceptions().note_exception(archive, Some(ARCHIVE_CONTEXT), &err);
            return Err(err);
        }
    };

    let result = dump_collection(session, archive, factory, summary.as_mut());
    match &result {
        Ok(report) => summary.notify(&format!(
            "Dumped {} of {} classes ({} recovered, {} inner skipped)",
            report.dumped(),
            report.candidates,
            report.recovered(),
            report.skipped_inner()
        )),
        Err(err) => {
            factory.exceptions().note_exception(archive, Some(ARCHIVE_CONTEXT), err);
            summary.notify(&format!("{ARCHIVE_CONTEXT} {}", describe(err)));
        }
    }
    summary.close();
    result
}

fn dump_collection(
    session: &mut AnalysisSession,
    archive: &Path,
    factory: &mut dyn DumperFactory,
    summary: &mut dyn SummarySink,
) -> Result<BatchReport, DecompileError> {
    summary.notify(&format!("Summary for {}", archive.display()));
    summary.notify(&format!("Decompiled with {TOOL_NAME} {TOOL_VERSION}"));
    factory.progress().analysing_path(archive);

    let types = session.cache_mut().load_archive(archive)?;
    let candidates: Vec<TypeName> = types
        .into_iter()
        .filter(|ty| session.options().archive_filter.accepts(ty))
        .collect();
    debug!(archive = %archive.display(), candidates = candidates.len(), "filtered archive classes");

    report_collisions(session, &candidates, summary);

    if session.options().renames_members() {
        let ids: Vec<UnitId> = candidates.iter().filter_map(|ty| session.cache().get(ty)).collect();
        session.resolve_names(&ids);
    }

    let mut report = BatchReport {
        archive: archive.to_path_buf(),
        candidates: candidates.len(),
        units: Vec::with_capacity(candidates.len()),
    };
    for ty in &candidates {
        let outcome = dump_member(session, archive, ty, factory, summary)?;
        report.units.push(outcome);
    }
    Ok(report)
}

fn dump_member(
    session: &mut AnalysisSession,
    archive: &Path,
    ty: &TypeName,
    factory: &mut dyn DumperFactory,
    summary: &mut dyn SummarySink,
) -> Result<UnitOutcome, DecompileError> {
    let mut guard = SinkGuard::empty();
    match dump_member_into(session, ty, factory, summary, &mut guard) {
        Ok(outcome) => Ok(outcome),
        Err(err) if err.is_fatal() => Err(err),
        Err(err) => {
            let context = format!("Exception analysing {ty} in");
            factory.exceptions().note_exception(archive, Some(&context), &err);
            let note = describe(&err);
            // The notice belongs in the unit's own output, even when the
            // failure struck before that output was opened.
            if !guard.is_acquired() && session.cache().get(ty).is_some() {
                let sink = factory.top_level_dumper(
                    ty,
                    summary,
                    TypeUsage::default(),
                    session.options().identifier_policy(),
                )?;
                guard.install(sink);
            }
            if let Some(sink) = guard.get()
                && let Err(write_err) = sink.print(&format!("/* {note} */\n\n\n"))
            {
                warn!(class = %ty, error = %write_err, "could not write failure notice");
            }
            if let Err(close_err) = guard.release() {
                warn!(class = %ty, error = %close_err, "failed to close output sink");
            }
            Ok(UnitOutcome::Recovered {
                ty: ty.clone(),
                kind: err.kind(),
                note,
            })
        }
    }
}

fn dump_member_into(
    session: &mut AnalysisSession,
    ty: &TypeName,
    factory: &mut dyn DumperFactory,
    summary: &mut dyn SummarySink,
    guard: &mut SinkGuard,
) -> Result<UnitOutcome, DecompileError> {
    let id = session.cache_mut().resolve_by_identity(ty)?;
    // Ask the class, not the name: `$` is legal in top-level names.
    if session.cache().unit(id).is_inner_class() {
        return Ok(UnitOutcome::SkippedInner { ty: ty.clone() });
    }
    if !session.options().silent {
        factory.progress().analysing_type(ty);
    }
    if session.options().decompile_inner_classes {
        session.cache_mut().load_inner_classes(id);
    }

    session
        .analyse(id)
        .map_err(|source| DecompileError::Analysis { ty: ty.clone(), source })?;
    let model = session
        .model(id)
        .map_err(|source| DecompileError::Analysis { ty: ty.clone(), source })?;
    let usage = TypeUsage::collect(model);

    let sink = factory.top_level_dumper(ty, summary, usage, session.options().identifier_policy())?;
    let sink = guard.install(sink);
    let mut digesting = DigestDumper::new(sink);
    dump_class(model, &mut digesting)
        .and_then(|()| digesting.print("\n"))
        .and_then(|()| digesting.print("\n"))
        .map_err(|source| DecompileError::Dump { ty: ty.clone(), source })?;
    let digest = digesting.finish();
    guard
        .release()
        .map_err(|source| DecompileError::Dump { ty: ty.clone(), source })?;

    session.mark_dumped(id);
    if session.options().low_memory {
        session.cache_mut().release_heavy_state(id);
    }
    Ok(UnitOutcome::Dumped {
        ty: ty.clone(),
        digest,
    })
}

/// Notes top-level candidates whose output files would clash on a
/// case-insensitive file system. Nothing is renamed.
fn report_collisions(session: &AnalysisSession, candidates: &[TypeName], summary: &mut dyn SummarySink) {
    let top_level = candidates.iter().filter(|ty| {
        session
            .cache()
            .get(ty)
            .is_some_and(|id| !session.cache().unit(id).is_inner_class())
    });
    for group in collisions(top_level) {
        let names: Vec<&str> = group.iter().map(|ty| ty.raw_name()).collect();
        summary.notify(&format!("Case-insensitive name collision: {}", names.join(", ")));
    }
}

fn collisions<'a>(types: impl Iterator<Item = &'a TypeName>) -> Vec<Vec<&'a TypeName>> {
    let mut by_folded: BTreeMap<String, Vec<&TypeName>> = BTreeMap::new();
    for ty in types {
        let folded = ty.source_path().to_string_lossy().to_lowercase();
        by_folded.entry(folded).or_default().push(ty);
    }
    by_folded.into_values().filter(|group| group.len() > 1).collect()
}
