mod output;
mod serve;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use ordiff_core::config::PROGRESS_TOTAL;
use ordiff_core::{
    compare, Config, DeltaStore, GitHubClient, IndexOutcome, IndexProgress, IndexService, Indexer,
    ProgressFn, RepoSettings, RunTracker, SqliteStore,
};

#[derive(Parser)]
#[command(name = "ordiff")]
#[command(about = "Index a repository's release history and compare releases offline", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch releases, commits and file changes for a repository
    Index {
        /// Repository owner
        owner: String,
        /// Repository name
        repo: String,
    },
    /// List cached releases of the default repository
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
    /// Compare two releases of the default repository
    Compare {
        /// Older release tag
        from: String,
        /// Newer release tag
        to: String,
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
    /// Start the local HTTP API
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose, matches!(cli.command, Commands::Serve { .. }));

    let config = Config::load()?;

    match cli.command {
        Commands::Index { owner, repo } => index(&config, &owner, &repo).await,
        Commands::List { json } => list(&config, json),
        Commands::Compare { from, to, json } => compare_releases(&config, &from, &to, json),
        Commands::Serve { port } => {
            let service = index_service(&config)?;
            let serve_config = serve::ServeConfig {
                port: port.unwrap_or(config.serve.port),
                settings_path: config.storage.settings_path(),
            };
            serve::start_server(serve_config, service).await
        }
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

/// Logs go to stderr so they never mix with command output.
///
/// `ORDIFF_LOG` takes precedence over `RUST_LOG`.
fn init_tracing(verbose: bool, serving: bool) {
    let default_directive = match (verbose, serving) {
        (true, _) => "debug",
        (false, true) => "ordiff=info,ordiff_core=info",
        (false, false) => "warn",
    };
    let filter = EnvFilter::try_from_env("ORDIFF_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Builds the indexing service over the configured cache and remote.
///
/// Every successful run makes its repository the default one.
fn index_service(config: &Config) -> Result<IndexService> {
    let store = Arc::new(open_store(config)?);
    let remote = GitHubClient::from_config(&config.github)
        .wrap_err("Failed to create GitHub client")?;
    let remote = Arc::new(remote);
    let indexer = Indexer::new(remote, store).with_config(&config.index);

    Ok(IndexService::new(Arc::new(indexer), Arc::new(RunTracker::new()))
        .with_completion_hook(remember_repo(config.storage.settings_path())))
}

fn remember_repo(path: PathBuf) -> impl Fn(&IndexOutcome) + Send + Sync + 'static {
    move |outcome: &IndexOutcome| {
        if let Err(e) = RepoSettings::new(&outcome.owner, &outcome.repo).save(&path) {
            warn!(path = %path.display(), error = %e, "Could not save default repository");
        }
    }
}

fn open_store(config: &Config) -> Result<SqliteStore> {
    let path = config.storage.db_path();
    SqliteStore::open(&path)
        .wrap_err_with(|| format!("Failed to open database at {}", path.display()))
}

fn default_repo(config: &Config) -> Result<(String, String)> {
    let settings = RepoSettings::load(config.storage.settings_path()).unwrap_or_else(|e| {
        warn!(error = %e, "Could not read settings");
        RepoSettings::default()
    });

    settings
        .default_repo()
        .map(|(owner, repo)| (owner.to_string(), repo.to_string()))
        .ok_or_else(|| eyre!("No default repository. Run 'ordiff index <owner> <repo>' first."))
}

async fn index(config: &Config, owner: &str, repo: &str) -> Result<()> {
    let service = index_service(config)?;
    println!("Indexing {}/{}...", owner, repo);

    let bar = ProgressBar::new(PROGRESS_TOTAL as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let sink_bar = bar.clone();
    let sink: &ProgressFn = &move |p: IndexProgress| {
        sink_bar.set_length(p.total as u64);
        sink_bar.set_position(p.current as u64);
        sink_bar.set_message(p.message);
    };

    let result = service.run_indexing(owner, repo, Some(sink)).await;
    bar.finish_and_clear();

    let outcome = result.wrap_err_with(|| format!("Failed to index {}/{}", owner, repo))?;
    output::print_outcome(&outcome);
    Ok(())
}

fn list(config: &Config, json: bool) -> Result<()> {
    let (owner, repo) = default_repo(config)?;
    let store = open_store(config)?;
    let releases = store.get_releases(&owner, &repo).wrap_err("Failed to get releases")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&releases)?);
    } else {
        output::print_releases(&owner, &repo, &releases);
    }
    Ok(())
}

fn compare_releases(config: &Config, from: &str, to: &str, json: bool) -> Result<()> {
    let (owner, repo) = default_repo(config)?;
    let store = open_store(config)?;
    let report = compare(&store, &owner, &repo, from, to).wrap_err("Failed to compare")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&output::compare_json(&report))?);
    } else {
        output::print_compare(&report);
    }
    Ok(())
}
