//! listwatch binary: runs the Discord bot and offers a few maintenance commands.

use anyhow::Context;
use clap::{Parser, Subcommand};
use listwatch::channels::discord::DiscordAdapter;
use listwatch::channels::run_bot;
use listwatch::watch::TaskStore;
use listwatch::{JsonTaskStore, WatchConfig, WatchManager, app_dirs};
use listwatch_fetch::ListingFetcher;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Watch listing pages and get a DM when new entries show up.
#[derive(Parser)]
#[command(name = "listwatch", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Resume persisted watches and start the Discord bot (default).
    Run,

    /// Print persisted watches.
    List,

    /// Fetch a page once and print the item ids found on it.
    Check {
        /// Page to fetch.
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Run);
    let _guard = init_tracing(matches!(command, Command::Run))?;

    let config = WatchConfig::load(cli.config.as_deref())?;
    config.validate()?;

    match command {
        Command::Run => run(config).await,
        Command::List => list(&config),
        Command::Check { url } => check(&config, &url).await,
    }
}

/// Stderr logging, plus a daily log file when `to_file` is set.
///
/// The returned guard flushes the file writer on drop.
fn init_tracing(to_file: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("listwatch=info,listwatch_fetch=info"));

    let (file_layer, guard) = if to_file {
        let dir = app_dirs::logs_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("cannot create log dir {}", dir.display()))?;
        let appender = tracing_appender::rolling::daily(&dir, "listwatch.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (
            Some(fmt::layer().with_ansi(false).with_writer(writer)),
            Some(guard),
        )
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(guard)
}

async fn run(config: WatchConfig) -> anyhow::Result<()> {
    let token = config.discord.resolved_token().with_context(|| {
        format!(
            "no bot token: set discord.bot_token or {}",
            listwatch::config::BOT_TOKEN_ENV
        )
    })?;

    let fetcher = ListingFetcher::new(&config.fetch)?;
    let state_path = config.watch.state_path();
    info!(state = %state_path.display(), "listwatch v{} starting", env!("CARGO_PKG_VERSION"));

    let adapter = Arc::new(DiscordAdapter::new(&config.discord, token));
    let manager = Arc::new(WatchManager::new(
        JsonTaskStore::new(state_path),
        Arc::new(fetcher),
        adapter.clone(),
        config.watch.policy(),
    ));

    run_bot(
        adapter.clone(),
        manager,
        adapter.as_ref(),
        &config.discord.command_prefix,
    )
    .await
}

fn list(config: &WatchConfig) -> anyhow::Result<()> {
    let store = JsonTaskStore::new(config.watch.state_path());
    let records = store.load_all()?;
    if records.is_empty() {
        println!("No persisted watches ({}).", store.path().display());
        return Ok(());
    }
    for (subscriber, url) in &records {
        println!("{subscriber}\t{url}");
    }
    Ok(())
}

async fn check(config: &WatchConfig, url: &str) -> anyhow::Result<()> {
    let fetcher = ListingFetcher::new(&config.fetch)?;
    let ids = fetcher.fetch_item_ids(url).await?;
    println!("{} item(s) listed at {url}", ids.len());
    for id in &ids {
        println!("- {id}");
    }
    Ok(())
}
