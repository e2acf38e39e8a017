use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "javadump")]
#[command(version)]
#[command(about = "Decompile Java class files, class directories and jars into source skeletons")]
pub struct Cli {
    /// Class files, directories of class files, or jar/zip archives.
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// Write `<package>/<Class>.java` files and `summary.txt` here instead of stdout.
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Overwrite existing files in the output directory.
    #[arg(long)]
    pub clobber: bool,

    /// JSON options file (default: <config dir>/javadump/options.json).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Do not print inner classes inside their outer class.
    #[arg(long)]
    pub no_inner_classes: bool,

    /// Rename members that share a name (and parameter list) within a class.
    #[arg(long)]
    pub rename_dup_members: bool,

    /// Rename enum constants that are illegal or repeated.
    #[arg(long)]
    pub rename_enum_members: bool,

    /// Rewrite identifiers that are not legal Java.
    #[arg(long)]
    pub rename_illegal_idents: bool,

    /// Print only the methods with this name.
    #[arg(long, value_name = "NAME")]
    pub method: Option<String>,

    /// Regex over raw class names; only matching archive classes are dumped.
    #[arg(long, value_name = "REGEX")]
    pub jar_filter: Option<String>,

    /// Drop method bodies of each class once it has been written.
    #[arg(long)]
    pub low_memory: bool,

    /// No per-class progress lines for archives.
    #[arg(long)]
    pub silent: bool,

    /// Extra directory or archive to resolve referenced classes from.
    #[arg(long, value_name = "PATH")]
    pub extraclasspath: Vec<PathBuf>,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// Debug logging (overridden by JAVADUMP_LOG).
    #[arg(short, long)]
    pub verbose: bool,
}
