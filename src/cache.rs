//! Session-scoped class cache.
//!
//! Units live in an arena and are referred to by [`UnitId`]; the cache keys
//! them by type identity. Class roots (directories found next to loaded files,
//! loaded archives, extra classpath entries) back identity resolution.

use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::analysis::ClassModel;
use crate::archive::{ClassArchive, is_archive_path};
use crate::classfile::ClassFile;
use crate::error::LoadError;
use crate::scan::class_root_for;
use crate::types::TypeName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    File(PathBuf),
    Archive { archive: PathBuf, entry: String },
}

impl Origin {
    pub fn path(&self) -> PathBuf {
        match self {
            Origin::File(path) => path.clone(),
            Origin::Archive { archive, entry } => archive.join(entry),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Loaded,
    Analysed,
    Dumped,
    Released,
}

#[derive(Debug)]
pub struct ClassUnit {
    pub ty: TypeName,
    pub origin: Origin,
    inner: bool,
    pub state: UnitState,
    pub class_file: ClassFile,
    pub inner_units: Vec<UnitId>,
    pub model: Option<ClassModel>,
    inner_loaded: bool,
}

impl ClassUnit {
    fn new(class_file: ClassFile, origin: Origin) -> Self {
        Self {
            ty: class_file.this_class.clone(),
            inner: class_file.is_inner_class(),
            origin,
            state: UnitState::Loaded,
            class_file,
            inner_units: Vec::new(),
            model: None,
            inner_loaded: false,
        }
    }

    /// Answered by the class file, never by the name.
    pub fn is_inner_class(&self) -> bool {
        self.inner
    }

    pub fn is_released(&self) -> bool {
        self.state == UnitState::Released
    }
}

#[derive(Debug)]
enum ClassRoot {
    Directory(PathBuf),
    Archive(ClassArchive),
}

impl ClassRoot {
    fn same_location(&self, path: &Path) -> bool {
        match self {
            ClassRoot::Directory(dir) => dir == path,
            ClassRoot::Archive(archive) => archive.path() == path,
        }
    }
}

#[derive(Debug, Default)]
pub struct ClassCache {
    units: Vec<ClassUnit>,
    by_type: HashMap<TypeName, UnitId>,
    roots: Vec<ClassRoot>,
}

impl ClassCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory or archive consulted by identity resolution.
    pub fn add_classpath(&mut self, path: &Path) -> Result<(), LoadError> {
        if self.roots.iter().any(|r| r.same_location(path)) {
            return Ok(());
        }
        if is_archive_path(path) {
            let archive = ClassArchive::open(path)?;
            self.roots.push(ClassRoot::Archive(archive));
        } else {
            self.roots.push(ClassRoot::Directory(path.to_path_buf()));
        }
        debug!(path = %path.display(), "added class root");
        Ok(())
    }

    /// Loads the class file at `path`. When its type is already cached the
    /// cached unit is returned instead.
    pub fn resolve_by_path(&mut self, path: &Path) -> Result<UnitId, LoadError> {
        let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let class_file = ClassFile::parse(&bytes).map_err(|source| LoadError::Format {
            origin: path.display().to_string(),
            source,
        })?;

        if let Some(root) = class_root_for(path, class_file.this_class.package())
            && !self.roots.iter().any(|r| r.same_location(&root))
        {
            debug!(root = %root.display(), "registering class root");
            self.roots.push(ClassRoot::Directory(root));
        }

        if let Some(&id) = self.by_type.get(&class_file.this_class) {
            return Ok(id);
        }
        Ok(self.insert(ClassUnit::new(class_file, Origin::File(path.to_path_buf()))))
    }

    pub fn resolve_by_identity(&mut self, ty: &TypeName) -> Result<UnitId, LoadError> {
        if let Some(&id) = self.by_type.get(ty) {
            return Ok(id);
        }
        match self.find_on_roots(ty)? {
            Some((class_file, origin)) => {
                debug!(class = %ty, "loaded by identity");
                Ok(self.insert(ClassUnit::new(class_file, origin)))
            }
            None => Err(LoadError::CannotLoad(ty.clone())),
        }
    }

    fn find_on_roots(&mut self, ty: &TypeName) -> Result<Option<(ClassFile, Origin)>, LoadError> {
        let entry = ty.entry_path();
        for root in &mut self.roots {
            let (bytes, origin) = match root {
                ClassRoot::Directory(dir) => {
                    let path = dir.join(&entry);
                    if !path.is_file() {
                        continue;
                    }
                    let bytes = std::fs::read(&path).map_err(|source| LoadError::Io {
                        path: path.clone(),
                        source,
                    })?;
                    (bytes, Origin::File(path))
                }
                ClassRoot::Archive(archive) => match archive.read(&entry)? {
                    Some(bytes) => (
                        bytes,
                        Origin::Archive {
                            archive: archive.path().to_path_buf(),
                            entry: entry.clone(),
                        },
                    ),
                    None => continue,
                },
            };
            let class_file = ClassFile::parse(&bytes).map_err(|source| LoadError::Format {
                origin: origin.path().display().to_string(),
                source,
            })?;
            if class_file.this_class != *ty {
                warn!(wanted = %ty, found = %class_file.this_class, "class root holds a different type");
                continue;
            }
            return Ok(Some((class_file, origin)));
        }
        Ok(None)
    }

    /// Loads every class of an archive and returns the types in archive
    /// order. Entries are parsed in parallel; an entry that fails to parse
    /// still contributes its entry-derived type, which then fails to resolve.
    pub fn load_archive(&mut self, path: &Path) -> Result<Vec<TypeName>, LoadError> {
        let mut archive = ClassArchive::open(path)?;
        let entries = archive.class_entries()?;
        let mut raw = Vec::with_capacity(entries.len());
        for entry in entries {
            if let Some(bytes) = archive.read(&entry)? {
                raw.push((entry, bytes));
            }
        }

        let parsed: Vec<(String, Result<ClassFile, _>)> = raw
            .into_par_iter()
            .map(|(entry, bytes)| {
                let parsed = ClassFile::parse(&bytes);
                (entry, parsed)
            })
            .collect();

        let mut types = Vec::with_capacity(parsed.len());
        let mut listed = HashSet::new();
        for (entry, result) in parsed {
            let ty = match result {
                Ok(class_file) => {
                    let ty = class_file.this_class.clone();
                    if !self.by_type.contains_key(&ty) {
                        let origin = Origin::Archive {
                            archive: path.to_path_buf(),
                            entry: entry.clone(),
                        };
                        self.insert(ClassUnit::new(class_file, origin));
                    }
                    ty
                }
                Err(err) => {
                    warn!(archive = %path.display(), entry = %entry, error = %err, "unparseable class entry");
                    TypeName::from_entry(&entry)
                }
            };
            // First entry wins; a type is listed once however many entries declare it.
            if listed.insert(ty.clone()) {
                types.push(ty);
            } else {
                warn!(archive = %path.display(), entry = %entry, class = %ty, "duplicate class entry ignored");
            }
        }
        debug!(archive = %path.display(), classes = types.len(), "archive loaded");

        if !self.roots.iter().any(|r| r.same_location(path)) {
            self.roots.push(ClassRoot::Archive(archive));
        }
        Ok(types)
    }

    /// Every unit loaded so far, in load order.
    pub fn list_loaded(&self) -> Vec<UnitId> {
        (0..self.units.len()).map(UnitId).collect()
    }

    pub fn get(&self, ty: &TypeName) -> Option<UnitId> {
        self.by_type.get(ty).copied()
    }

    pub fn unit(&self, id: UnitId) -> &ClassUnit {
        &self.units[id.0]
    }

    pub fn unit_mut(&mut self, id: UnitId) -> &mut ClassUnit {
        &mut self.units[id.0]
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Resolves the classes nested in `id`, recursively. A nested class that
    /// cannot be found is logged and left out.
    pub fn load_inner_classes(&mut self, id: UnitId) {
        let mut visited = HashSet::new();
        self.load_inner_recursive(id, &mut visited);
    }

    fn load_inner_recursive(&mut self, id: UnitId, visited: &mut HashSet<UnitId>) {
        if !visited.insert(id) || self.units[id.0].inner_loaded {
            return;
        }
        let wanted: Vec<TypeName> = self.units[id.0]
            .class_file
            .declared_inner_classes()
            .map(|e| e.inner.clone())
            .collect();

        let mut found = Vec::with_capacity(wanted.len());
        for ty in wanted {
            match self.resolve_by_identity(&ty) {
                Ok(inner) if inner != id => found.push(inner),
                Ok(_) => {}
                Err(err) => warn!(class = %ty, error = %err, "could not load inner class"),
            }
        }
        for &inner in &found {
            self.load_inner_recursive(inner, visited);
        }

        let unit = &mut self.units[id.0];
        unit.inner_units = found;
        unit.inner_loaded = true;
    }

    /// Drops method bodies and the analysed model of `id` and its nested
    /// units. Identity, inner flag and declarations stay.
    pub fn release_heavy_state(&mut self, id: UnitId) {
        let mut pending = vec![id];
        let mut visited = HashSet::new();
        while let Some(next) = pending.pop() {
            if !visited.insert(next) {
                continue;
            }
            let unit = &mut self.units[next.0];
            unit.class_file.release_code();
            unit.model = None;
            unit.state = UnitState::Released;
            pending.extend(unit.inner_units.iter().copied());
        }
        debug!(class = %self.units[id.0].ty, "released heavy state");
    }

    fn insert(&mut self, unit: ClassUnit) -> UnitId {
        let id = UnitId(self.units.len());
        self.by_type.insert(unit.ty.clone(), id);
        self.units.push(unit);
        id
    }
}
