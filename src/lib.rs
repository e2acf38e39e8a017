//! # javadump
//!
//! Decompiles Java class files, directories of class files and jar archives
//! into Java source skeletons.
//!
//! ## Architecture
//!
//! - **pipeline**: decompile one unit, or every class of an archive, with per-unit failure isolation
//! - **driver**: dispatches input paths to the pipeline
//! - **session**: per-invocation options, class cache and naming state
//! - **cache**: arena of loaded classes keyed by type identity, plus class roots
//! - **naming**: renaming of duplicate and illegal members across a working set
//! - **filter**: regex filter over raw type names
//! - **classfile**: class-file structure parser
//! - **types**: type names and JVM descriptors
//! - **analysis**: declaration skeletons built from parsed class files
//! - **usage**: referenced types, imports and short spellings
//! - **printer**: Java-like source output
//! - **output**: per-unit sinks, their release guard and the sink factories
//! - **report**: progress, summary and exception reporting
//! - **archive**: memory-mapped jar/zip reading
//! - **scan**: class-file discovery in directories

pub mod analysis;
pub mod archive;
pub mod cache;
pub mod classfile;
pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod filter;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod printer;
pub mod report;
pub mod scan;
pub mod session;
pub mod types;
pub mod usage;

#[cfg(test)]
mod fixture;
