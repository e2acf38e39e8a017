use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::filter::NameFilter;
use crate::naming::NamingRules;
use crate::printer::IdentifierPolicy;

/// Immutable options for one invocation.
#[derive(Debug, Clone)]
pub struct Options {
    pub decompile_inner_classes: bool,
    pub rename_duplicate_members: bool,
    pub rename_enum_members: bool,
    pub rename_illegal_identifiers: bool,
    pub method_filter: Option<String>,
    pub archive_filter: NameFilter,
    pub low_memory: bool,
    pub silent: bool,
    pub extra_classpath: Vec<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub clobber: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            decompile_inner_classes: true,
            rename_duplicate_members: false,
            rename_enum_members: false,
            rename_illegal_identifiers: false,
            method_filter: None,
            archive_filter: NameFilter::default(),
            low_memory: false,
            silent: false,
            extra_classpath: Vec::new(),
            output_dir: None,
            clobber: false,
        }
    }
}

impl Options {
    pub fn renames_members(&self) -> bool {
        self.rename_duplicate_members || self.rename_enum_members
    }

    pub fn naming_rules(&self) -> NamingRules {
        NamingRules {
            duplicate_members: self.rename_duplicate_members,
            enum_members: self.rename_enum_members,
        }
    }

    pub fn identifier_policy(&self) -> IdentifierPolicy {
        if self.rename_illegal_identifiers {
            IdentifierPolicy::Rename
        } else {
            IdentifierPolicy::Keep
        }
    }
}

/// Defaults read from `options.json`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptionsFile {
    pub decompile_inner_classes: Option<bool>,
    pub rename_duplicate_members: Option<bool>,
    pub rename_enum_members: Option<bool>,
    pub rename_illegal_identifiers: Option<bool>,
    pub method_filter: Option<String>,
    pub archive_filter: Option<String>,
    pub low_memory: Option<bool>,
    pub silent: Option<bool>,
    pub extra_classpath: Vec<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub clobber: Option<bool>,
}

impl OptionsFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read options file: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse options file: {}", path.display()))
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("javadump").join("options.json"))
}

/// Merges the options file (explicit `--config`, else the default location
/// when it exists) with the command line. Flags win.
pub fn resolve_options(cli: &Cli) -> Result<Options> {
    let file = match cli.config.as_deref() {
        Some(path) => OptionsFile::load(path)?,
        None => match default_config_path().filter(|p| p.is_file()) {
            Some(path) => OptionsFile::load(&path)?,
            None => OptionsFile::default(),
        },
    };
    merge(cli, file)
}

fn merge(cli: &Cli, file: OptionsFile) -> Result<Options> {
    let pattern = cli.jar_filter.as_deref().or(file.archive_filter.as_deref());
    let archive_filter =
        NameFilter::new(pattern).with_context(|| format!("Invalid --jar-filter pattern: {}", pattern.unwrap_or_default()))?;

    let mut extra_classpath = file.extra_classpath;
    extra_classpath.extend(cli.extraclasspath.iter().cloned());

    let output_dir = cli.output_dir.clone().or(file.output_dir);
    if cli.json && output_dir.is_none() {
        anyhow::bail!("--json needs --output-dir so decompiled source does not mix with the report");
    }

    Ok(Options {
        decompile_inner_classes: !cli.no_inner_classes && file.decompile_inner_classes.unwrap_or(true),
        rename_duplicate_members: cli.rename_dup_members || file.rename_duplicate_members.unwrap_or(false),
        rename_enum_members: cli.rename_enum_members || file.rename_enum_members.unwrap_or(false),
        rename_illegal_identifiers: cli.rename_illegal_idents || file.rename_illegal_identifiers.unwrap_or(false),
        method_filter: cli.method.clone().or(file.method_filter),
        archive_filter,
        low_memory: cli.low_memory || file.low_memory.unwrap_or(false),
        silent: cli.silent || file.silent.unwrap_or(false),
        extra_classpath,
        output_dir,
        clobber: cli.clobber || file.clobber.unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["javadump"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn flags_override_file_values() {
        let file: OptionsFile = serde_json::from_str(
            r#"{"decompile_inner_classes": true, "method_filter": "run", "archive_filter": "^a\\.", "silent": true}"#,
        )
        .unwrap();
        let options = merge(&cli(&["--no-inner-classes", "--method", "call", "x.jar"]), file).unwrap();
        assert!(!options.decompile_inner_classes);
        assert_eq!(options.method_filter.as_deref(), Some("call"));
        assert_eq!(options.archive_filter.pattern(), Some("^a\\."));
        assert!(options.silent);
        assert!(!options.renames_members());
    }

    #[test]
    fn defaults_keep_inner_classes_and_accept_everything() {
        let options = merge(&cli(&["A.class"]), OptionsFile::default()).unwrap();
        assert!(options.decompile_inner_classes);
        assert_eq!(options.archive_filter.pattern(), None);
        assert_eq!(options.identifier_policy(), IdentifierPolicy::Keep);
    }

    #[test]
    fn invalid_filter_is_a_configuration_error() {
        let err = merge(&cli(&["--jar-filter", "(", "x.jar"]), OptionsFile::default()).unwrap_err();
        assert!(err.to_string().contains("Invalid --jar-filter"));
    }

    #[test]
    fn json_report_requires_an_output_directory() {
        assert!(merge(&cli(&["--json", "x.jar"]), OptionsFile::default()).is_err());
        assert!(merge(&cli(&["--json", "--output-dir", "out", "x.jar"]), OptionsFile::default()).is_ok());
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        assert!(serde_json::from_str::<OptionsFile>(r#"{"lomem": true}"#).is_err());
    }
}
