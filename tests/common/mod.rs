#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use javadump::error::SinkError;
use javadump::output::{Dumper, DumperFactory};
use javadump::printer::IdentifierPolicy;
use javadump::report::{ExceptionLog, ExceptionReporter, ProgressSink, SummarySink};
use javadump::types::TypeName;
use javadump::usage::TypeUsage;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_ENUM: u16 = 0x4000;

pub fn temp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!(
        "javadump_it_{}_{}_{}",
        std::process::id(),
        nanos,
        name
    ))
}

pub fn write_jar(path: &Path, entries: &[(&str, Vec<u8>)]) -> anyhow::Result<()> {
    use zip::write::FileOptions;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (name, content) in entries {
        zip.start_file(*name, options)?;
        zip.write_all(content)?;
    }
    zip.finish()?;
    Ok(())
}

pub fn write_file(path: &Path, content: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// Writes just enough of a class file for the loader: declarations, `Code`
/// bodies and an `InnerClasses` table.
pub struct ClassWriter {
    name: String,
    access: u16,
    super_name: String,
    fields: Vec<(u16, String, String)>,
    methods: Vec<(u16, String, String, Option<Vec<u8>>)>,
    nested: Vec<(String, Option<String>, Option<String>, u16)>,
}

impl ClassWriter {
    pub fn new(internal_name: &str) -> Self {
        Self {
            name: internal_name.to_string(),
            access: ACC_PUBLIC | 0x0020,
            super_name: "java/lang/Object".to_string(),
            fields: Vec::new(),
            methods: Vec::new(),
            nested: Vec::new(),
        }
    }

    pub fn access(mut self, access: u16) -> Self {
        self.access = access;
        self
    }

    pub fn extends(mut self, internal_name: &str) -> Self {
        self.super_name = internal_name.to_string();
        self
    }

    pub fn field(mut self, access: u16, name: &str, descriptor: &str) -> Self {
        self.fields.push((access, name.to_string(), descriptor.to_string()));
        self
    }

    /// A method with a one-instruction body.
    pub fn method(mut self, name: &str, descriptor: &str) -> Self {
        self.methods
            .push((ACC_PUBLIC, name.to_string(), descriptor.to_string(), Some(vec![0xb1])));
        self
    }

    pub fn nested(mut self, inner: &str, outer: Option<&str>, simple: Option<&str>, access: u16) -> Self {
        self.nested.push((
            inner.to_string(),
            outer.map(str::to_string),
            simple.map(str::to_string),
            access,
        ));
        self
    }

    pub fn bytes(self) -> Vec<u8> {
        let mut pool = Pool::default();
        let mut body = Vec::new();
        let this = pool.class(&self.name);
        let sup = pool.class(&self.super_name);
        push_u2(&mut body, self.access);
        push_u2(&mut body, this);
        push_u2(&mut body, sup);
        push_u2(&mut body, 0);

        push_u2(&mut body, self.fields.len() as u16);
        for (access, name, descriptor) in &self.fields {
            push_u2(&mut body, *access);
            push_u2(&mut body, pool.utf8(name));
            push_u2(&mut body, pool.utf8(descriptor));
            push_u2(&mut body, 0);
        }

        push_u2(&mut body, self.methods.len() as u16);
        for (access, name, descriptor, code) in &self.methods {
            push_u2(&mut body, *access);
            push_u2(&mut body, pool.utf8(name));
            push_u2(&mut body, pool.utf8(descriptor));
            match code {
                Some(code) => {
                    push_u2(&mut body, 1);
                    push_u2(&mut body, pool.utf8("Code"));
                    body.extend_from_slice(&((12 + code.len()) as u32).to_be_bytes());
                    push_u2(&mut body, 1);
                    push_u2(&mut body, 1);
                    body.extend_from_slice(&(code.len() as u32).to_be_bytes());
                    body.extend_from_slice(code);
                    push_u2(&mut body, 0);
                    push_u2(&mut body, 0);
                }
                None => push_u2(&mut body, 0),
            }
        }

        if self.nested.is_empty() {
            push_u2(&mut body, 0);
        } else {
            let mut table = Vec::new();
            push_u2(&mut table, self.nested.len() as u16);
            for (inner, outer, simple, access) in &self.nested {
                push_u2(&mut table, pool.class(inner));
                let outer = outer.as_deref().map_or(0, |o| pool.class(o));
                push_u2(&mut table, outer);
                let simple = simple.as_deref().map_or(0, |s| pool.utf8(s));
                push_u2(&mut table, simple);
                push_u2(&mut table, *access);
            }
            push_u2(&mut body, 1);
            push_u2(&mut body, pool.utf8("InnerClasses"));
            body.extend_from_slice(&(table.len() as u32).to_be_bytes());
            body.extend_from_slice(&table);
        }

        let mut out = 0xCAFE_BABEu32.to_be_bytes().to_vec();
        push_u2(&mut out, 0);
        push_u2(&mut out, 52);
        push_u2(&mut out, pool.next);
        out.extend_from_slice(&pool.bytes);
        out.extend_from_slice(&body);
        out
    }
}

fn push_u2(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

struct Pool {
    bytes: Vec<u8>,
    next: u16,
    seen: BTreeMap<(u8, String), u16>,
}

impl Default for Pool {
    fn default() -> Self {
        Self {
            bytes: Vec::new(),
            next: 1,
            seen: BTreeMap::new(),
        }
    }
}

impl Pool {
    fn utf8(&mut self, text: &str) -> u16 {
        if let Some(&idx) = self.seen.get(&(1, text.to_string())) {
            return idx;
        }
        self.bytes.push(1);
        push_u2(&mut self.bytes, text.len() as u16);
        self.bytes.extend_from_slice(text.as_bytes());
        self.take(1, text)
    }

    fn class(&mut self, internal: &str) -> u16 {
        if let Some(&idx) = self.seen.get(&(7, internal.to_string())) {
            return idx;
        }
        let name = self.utf8(internal);
        self.bytes.push(7);
        push_u2(&mut self.bytes, name);
        self.take(7, internal)
    }

    fn take(&mut self, tag: u8, key: &str) -> u16 {
        let idx = self.next;
        self.next += 1;
        self.seen.insert((tag, key.to_string()), idx);
        idx
    }
}

/// What the counting factory observed.
#[derive(Debug, Default)]
pub struct Observed {
    pub acquired: usize,
    pub released: usize,
    pub outputs: BTreeMap<String, String>,
    pub summary: Vec<String>,
    pub summary_closes: usize,
    pub progress: Vec<String>,
}

/// A [`DumperFactory`] that keeps everything in memory and counts sink
/// acquisition and release.
pub struct CountingFactory {
    pub observed: Rc<RefCell<Observed>>,
    fail_create: Option<TypeName>,
    fail_write: Option<TypeName>,
    exceptions: ExceptionLog,
    progress: RecordingProgress,
}

impl CountingFactory {
    pub fn new() -> Self {
        let observed = Rc::new(RefCell::new(Observed::default()));
        Self {
            progress: RecordingProgress(Rc::clone(&observed)),
            observed,
            fail_create: None,
            fail_write: None,
            exceptions: ExceptionLog::quiet(),
        }
    }

    /// Sink creation for `ty` fails.
    pub fn failing_create(mut self, ty: &str) -> Self {
        self.fail_create = Some(TypeName::new(ty));
        self
    }

    /// The sink for `ty` is created, but every write to it fails.
    pub fn failing_write(mut self, ty: &str) -> Self {
        self.fail_write = Some(TypeName::new(ty));
        self
    }

    pub fn output(&self, ty: &str) -> Option<String> {
        self.observed.borrow().outputs.get(ty).cloned()
    }
}

impl DumperFactory for CountingFactory {
    fn top_level_dumper(
        &mut self,
        ty: &TypeName,
        _summary: &mut dyn SummarySink,
        usage: TypeUsage,
        policy: IdentifierPolicy,
    ) -> Result<Box<dyn Dumper>, SinkError> {
        if self.fail_create.as_ref() == Some(ty) {
            return Err(SinkError {
                ty: ty.clone(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only output"),
            });
        }
        self.observed.borrow_mut().acquired += 1;
        Ok(Box::new(CountingDumper {
            ty: ty.clone(),
            text: String::new(),
            usage,
            policy,
            failing: self.fail_write.as_ref() == Some(ty),
            observed: Rc::clone(&self.observed),
        }))
    }

    fn summary_sink(&mut self) -> Result<Box<dyn SummarySink>, SinkError> {
        Ok(Box::new(RecordingSummary(Rc::clone(&self.observed))))
    }

    fn progress(&mut self) -> &mut dyn ProgressSink {
        &mut self.progress
    }

    fn exceptions(&mut self) -> &mut dyn ExceptionReporter {
        &mut self.exceptions
    }
}

struct CountingDumper {
    ty: TypeName,
    text: String,
    usage: TypeUsage,
    policy: IdentifierPolicy,
    failing: bool,
    observed: Rc<RefCell<Observed>>,
}

impl Dumper for CountingDumper {
    fn print(&mut self, text: &str) -> io::Result<()> {
        if self.failing {
            return Err(io::Error::other("disk full"));
        }
        self.text.push_str(text);
        Ok(())
    }

    fn type_usage(&self) -> &TypeUsage {
        &self.usage
    }

    fn identifier_policy(&self) -> IdentifierPolicy {
        self.policy
    }

    fn close(&mut self) -> io::Result<()> {
        let mut observed = self.observed.borrow_mut();
        observed.released += 1;
        observed
            .outputs
            .insert(self.ty.raw_name().to_string(), std::mem::take(&mut self.text));
        Ok(())
    }
}

struct RecordingSummary(Rc<RefCell<Observed>>);

impl SummarySink for RecordingSummary {
    fn notify(&mut self, text: &str) {
        self.0.borrow_mut().summary.push(text.to_string());
    }

    fn close(&mut self) {
        self.0.borrow_mut().summary_closes += 1;
    }
}

struct RecordingProgress(Rc<RefCell<Observed>>);

impl ProgressSink for RecordingProgress {
    fn analysing_path(&mut self, path: &Path) {
        self.0.borrow_mut().progress.push(path.display().to_string());
    }

    fn analysing_type(&mut self, ty: &TypeName) {
        self.0.borrow_mut().progress.push(ty.raw_name().to_string());
    }
}
