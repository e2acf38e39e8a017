use memmap2::Mmap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::LoadError;

const ARCHIVE_EXTENSIONS: [&str; 4] = ["jar", "zip", "war", "ear"];

pub fn is_archive_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| ARCHIVE_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// A memory-mapped jar/zip that class bytes are read from on demand.
pub struct ClassArchive {
    path: PathBuf,
    zip: ZipArchive<Cursor<Mmap>>,
}

impl std::fmt::Debug for ClassArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassArchive")
            .field("path", &self.path)
            .field("entries", &self.zip.len())
            .finish()
    }
}

impl ClassArchive {
    pub fn open(path: &Path) -> Result<Self, LoadError> {
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        // SAFETY: The file is opened read-only and the map is owned by the
        // archive, so it outlives every read through the cursor.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let zip = ZipArchive::new(Cursor::new(mmap)).map_err(|source| LoadError::Archive {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            zip,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every class entry, in archive order. Multi-release overlays under
    /// `META-INF/versions/` are left out.
    pub fn class_entries(&mut self) -> Result<Vec<String>, LoadError> {
        let mut entries = Vec::new();
        for i in 0..self.zip.len() {
            let entry = self.zip.by_index(i).map_err(|source| LoadError::Archive {
                path: self.path.clone(),
                source,
            })?;
            let name = entry.name();
            if !name.ends_with(".class") || entry.is_dir() {
                continue;
            }
            if name.starts_with("META-INF/") {
                continue;
            }
            entries.push(name.to_string());
        }
        Ok(entries)
    }

    /// Reads one entry; `Ok(None)` when the archive has no such entry.
    pub fn read(&mut self, entry: &str) -> Result<Option<Vec<u8>>, LoadError> {
        let mut file = match self.zip.by_name(entry) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(source) => {
                return Err(LoadError::Archive {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let mut bytes = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut bytes).map_err(|source| LoadError::Io {
            path: self.path.join(entry),
            source,
        })?;
        Ok(Some(bytes))
    }
}
