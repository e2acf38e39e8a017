use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// Every `.class` file under `base_path`, sorted so runs are reproducible.
pub fn scan_class_files(base_path: &Path) -> Vec<PathBuf> {
    let (tx, rx) = mpsc::channel();

    let walker = WalkBuilder::new(base_path)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .build_parallel();

    walker.run(|| {
        let tx = tx.clone();
        Box::new(move |entry| {
            if let Ok(entry) = entry {
                let path = entry.path();
                if path.is_file() && path.extension().is_some_and(|e| e == "class") {
                    let _ = tx.send(path.to_path_buf());
                }
            }
            ignore::WalkState::Continue
        })
    });

    drop(tx);
    let mut found: Vec<PathBuf> = rx.iter().collect();
    found.sort();
    found
}

/// The class root a file sits under, given the package its class declares.
///
/// `/out/a/b/C.class` holding `a.b.C` has root `/out`. Returns `None` when
/// the directory layout does not match the package.
pub fn class_root_for(path: &Path, package: Option<&str>) -> Option<PathBuf> {
    let mut dir = path.parent()?.to_path_buf();
    if let Some(pkg) = package {
        for part in pkg.rsplit('.') {
            if dir.file_name()?.to_str()? != part {
                return None;
            }
            dir.pop();
        }
    }
    Some(dir)
}
