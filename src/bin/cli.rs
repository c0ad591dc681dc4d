//! Reindex CLI
//!
//! Rebuilds the page index for one site, or for page URIs read from stdin.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use futures::{Stream, StreamExt, stream};
use reindexer::{
    error::{AppError, Result},
    models::{BatchResult, Config, PageUri},
    pipeline::{Reindexer, RunSummary, number_results},
};
use tokio::io::{AsyncBufReadExt, BufReader};

const DEFAULT_CONFIG: &str = "reindex.toml";

/// Rebuild a search index from CMS pages
#[derive(Parser, Debug)]
#[command(name = "reindex", version, about = "Rebuild a search index from CMS pages")]
struct Cli {
    /// Path to the TOML configuration file [default: reindex.toml if present]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// CMS origin, e.g. http://localhost:3001
    #[arg(long, global = true)]
    cms_host: Option<String>,

    /// Search engine origin, e.g. http://localhost:9200
    #[arg(long, global = true)]
    elastic_host: Option<String>,

    /// Target index name
    #[arg(long, global = true)]
    index: Option<String>,

    /// Prefix applied to every index name
    #[arg(long, global = true)]
    elastic_prefix: Option<String>,

    /// Documents per bulk request
    #[arg(long, global = true)]
    batch: Option<usize>,

    /// Pages transformed concurrently
    #[arg(long, global = true)]
    parallel: Option<usize>,

    /// Stop after this many pages
    #[arg(long, global = true)]
    limit: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reindex every page of one site
    Site {
        /// Site hostname, e.g. foo.com
        #[arg(long)]
        host: String,

        /// Site base path, empty for a root site
        #[arg(long, default_value = "")]
        path: String,
    },

    /// Reindex page URIs read from stdin, one per line
    Pages,

    /// Validate the configuration
    Validate,
}

impl Cli {
    /// Load the config file and apply command-line overrides.
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) if !path.exists() => {
                return Err(AppError::config(format!("config file {} not found", path.display())));
            }
            Some(path) => Config::load(path)?,
            None if Path::new(DEFAULT_CONFIG).exists() => Config::load(DEFAULT_CONFIG)?,
            None => {
                log::debug!("No config at {}, using defaults", DEFAULT_CONFIG);
                Config::default()
            }
        };

        if let Some(host) = &self.cms_host {
            config.cms.host = host.clone();
        }
        if let Some(host) = &self.elastic_host {
            config.search.host = host.clone();
        }
        if let Some(index) = &self.index {
            config.search.index = index.clone();
        }
        if let Some(prefix) = &self.elastic_prefix {
            config.search.index_prefix = Some(prefix.clone());
        }
        if let Some(batch) = self.batch {
            config.pipeline.batch_size = batch;
        }
        if let Some(parallel) = self.parallel {
            config.pipeline.parallel = parallel;
        }
        if self.limit.is_some() {
            config.pipeline.limit = self.limit;
        }
        config.cms.verbose |= self.verbose;
        config.normalize();

        Ok(config)
    }
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Non-blank lines of stdin as page URIs.
fn stdin_uris() -> impl Stream<Item = PageUri> + Send + 'static {
    let lines = BufReader::new(tokio::io::stdin()).lines();
    stream::unfold(lines, |mut lines| async move {
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => return Some((PageUri::new(line.trim()), lines)),
                Ok(None) => return None,
                Err(e) => {
                    log::error!("Failed to read stdin: {}", e);
                    return None;
                }
            }
        }
    })
}

/// Print one JSON line per result and tally the run.
async fn report<S>(results: S) -> Result<RunSummary>
where
    S: Stream<Item = Result<BatchResult>>,
{
    let mut results = std::pin::pin!(number_results(results));
    let mut summary = RunSummary::default();

    while let Some((result, record)) = results.next().await {
        summary.record(&result);
        if let Err(e) = &result {
            log::debug!("Result {} failed: {}", record.index, e);
        }
        println!("{}", record.to_json_line()?);
    }

    summary.log();
    Ok(summary)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.load_config()?;

    let summary = match &cli.command {
        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "Config OK: cms {} -> index {} on {}",
                config.cms.host,
                config.search.target_index(),
                config.search.host
            );
            return Ok(());
        }

        Command::Site { host, path } => {
            let reindexer = Reindexer::from_config(&config)?;
            log::info!(
                "Reindexing {}{} into {}",
                host,
                path,
                reindexer.options().index
            );
            report(reindexer.reindex_site(host, path).await?).await?
        }

        Command::Pages => {
            let reindexer = Reindexer::from_config(&config)?;
            log::info!(
                "Reindexing pages from stdin into {}",
                reindexer.options().index
            );
            report(reindexer.reindex_uris(stdin_uris())).await?
        }
    };

    if summary.failed() > 0 {
        log::warn!("{} of {} documents failed", summary.failed(), summary.total());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_after_subcommand() {
        let cli = Cli::try_parse_from(["reindex", "site", "--host", "foo.com", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Site { ref host, .. } if host == "foo.com"));
    }

    #[test]
    fn test_overrides_apply_over_defaults() {
        let cli = Cli::try_parse_from(["reindex", "pages", "--batch", "7", "-v"]).unwrap();
        let config = cli.load_config().unwrap();
        assert_eq!(config.pipeline.batch_size, 7);
        assert!(config.cms.verbose);
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let cli = Cli::try_parse_from(["reindex", "validate", "--config", path.to_str().unwrap()]).unwrap();
        assert!(matches!(cli.load_config(), Err(AppError::Config(_))));
    }
}
