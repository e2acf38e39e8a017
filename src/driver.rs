use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::archive::is_archive_path;
use crate::output::DumperFactory;
use crate::pipeline::{BatchReport, UnitOutcome, decompile_collection, decompile_one_unit};
use crate::report::ExceptionRecord;
use crate::scan::scan_class_files;
use crate::session::AnalysisSession;

#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub batches: Vec<BatchReport>,
    pub units: Vec<UnitOutcome>,
    pub exceptions: Vec<ExceptionRecord>,
    /// A fatal output error stopped the run before every path was handled.
    pub aborted: bool,
}

/// Dispatches every input path: archives as a batch, directories as every
/// class file found under them, anything else as a single class file.
pub fn run_paths(session: &mut AnalysisSession, paths: &[PathBuf], factory: &mut dyn DumperFactory) -> RunReport {
    let mut run = RunReport::default();
    let skip_lone_inner = paths.len() > 1;

    'paths: for path in paths {
        if is_archive_path(path) {
            match decompile_collection(session, path, factory) {
                Ok(batch) => run.batches.push(batch),
                Err(err) if err.is_fatal() => {
                    run.aborted = true;
                    break;
                }
                Err(err) => warn!(archive = %path.display(), error = %err, "archive skipped"),
            }
        } else if path.is_dir() {
            let files = scan_class_files(path);
            info!(dir = %path.display(), classes = files.len(), "decompiling directory");
            for file in files {
                let outcome = decompile_one_unit(session, &file, true, factory);
                let fatal = outcome.is_fatal();
                run.units.push(outcome);
                if fatal {
                    run.aborted = true;
                    break 'paths;
                }
            }
        } else {
            let outcome = decompile_one_unit(session, path, skip_lone_inner, factory);
            let fatal = outcome.is_fatal();
            run.units.push(outcome);
            if fatal {
                run.aborted = true;
                break;
            }
        }
    }

    run.exceptions = factory.exceptions().records().to_vec();
    run
}
