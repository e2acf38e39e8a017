//! Error types shared by the loader, the analyser and the orchestrator.
//!
//! Library code returns these typed errors; the CLI wraps them in
//! `anyhow::Error` at the edge.

use serde::Serialize;
use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::types::TypeName;

/// Structural problems found while parsing a class file.
#[derive(Debug, Error)]
pub enum ClassFormatError {
    #[error("not a class file (magic {0:#010x})")]
    BadMagic(u32),

    #[error("class file truncated at offset {offset}")]
    Truncated { offset: usize },

    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownConstant { tag: u8, index: u16 },

    #[error("constant pool index {index} is not a {expected}")]
    BadConstant { index: u16, expected: &'static str },
}

#[derive(Debug, Error)]
#[error("malformed descriptor '{descriptor}'")]
pub struct DescriptorError {
    pub descriptor: String,
}

/// Failures resolving a unit from a path, an archive or a type identity.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Nothing on any class root provides the type. Callers holding a
    /// path-resolved unit may carry on with it.
    #[error("cannot load class {0}")]
    CannotLoad(TypeName),

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid class file {origin}")]
    Format {
        origin: String,
        #[source]
        source: ClassFormatError,
    },

    #[error("failed to read archive {}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

impl LoadError {
    pub fn is_cannot_load(&self) -> bool {
        matches!(self, LoadError::CannotLoad(_))
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error("class state was released after an earlier dump")]
    Released,

    #[error("class has not been analysed")]
    NotAnalysed,
}

/// The output layer could not produce a sink at all.
#[derive(Debug, Error)]
#[error("cannot create output for {ty}")]
pub struct SinkError {
    pub ty: TypeName,
    #[source]
    pub source: io::Error,
}

/// How far a failure is allowed to travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Isolated to the unit being processed.
    Recoverable,
    /// A user request the unit cannot satisfy, e.g. an unknown method name.
    UnsupportedRequest,
    /// Aborts the remaining batch.
    Fatal,
}

#[derive(Debug, Error)]
pub enum DecompileError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("failed to analyse {ty}")]
    Analysis {
        ty: TypeName,
        #[source]
        source: AnalysisError,
    },

    #[error("failed to write output for {ty}")]
    Dump {
        ty: TypeName,
        #[source]
        source: io::Error,
    },

    #[error("No such method '{0}'.")]
    NoSuchMethod(String),

    #[error(transparent)]
    CannotCreateSink(#[from] SinkError),
}

impl DecompileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecompileError::CannotCreateSink(_) => ErrorKind::Fatal,
            DecompileError::NoSuchMethod(_) => ErrorKind::UnsupportedRequest,
            DecompileError::Load(_) | DecompileError::Analysis { .. } | DecompileError::Dump { .. } => {
                ErrorKind::Recoverable
            }
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }
}

/// Renders an error and its source chain on one line.
pub fn describe(err: &dyn StdError) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.ends_with(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}
