use anyhow::{Context, Result};
use clap::Parser;
use javadump::cli::Cli;
use javadump::config::resolve_options;
use javadump::driver::run_paths;
use javadump::output::{DirectoryDumperFactory, DumperFactory, StdoutDumperFactory};
use javadump::session::AnalysisSession;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "JAVADUMP_LOG";

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let options = resolve_options(&cli)?;
    let mut factory: Box<dyn DumperFactory> = match options.output_dir.clone() {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
            Box::new(DirectoryDumperFactory::new(dir, options.clobber))
        }
        None => Box::new(StdoutDumperFactory::new()),
    };

    let mut session = AnalysisSession::new(options).context("Failed to open extra classpath")?;
    let report = run_paths(&mut session, &cli.paths, factory.as_mut());

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    if report.aborted {
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
