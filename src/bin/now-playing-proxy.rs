use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use now_playing_proxy as lib;
use lib::config::Config;
use lib::models::AccessToken;
use lib::proxy::NowPlayingService;
use lib::store::{KvStore, MemoryStore, SqliteStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::subscriber as tracing_subscriber_global;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_log::LogTracer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "now-playing-proxy", version)]
struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Use an in-memory store instead of the SQLite database
    #[arg(long)]
    memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP proxy (long-running)
    Serve,
    /// Resolve "now playing" once and print the response
    Once,
    /// Validate config file and exit
    ConfigValidate,
    /// Copy an already-issued token JSON file into the store
    TokenImport {
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
    },
    /// Show what the track cache currently holds
    CacheStatus,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // Explicit --config wins; otherwise /etc, then the working directory.
    let resolved_config_path: Option<PathBuf> = match &cli.config {
        Some(p) => Some(p.clone()),
        None => {
            let etc_path = Path::new("/etc/now-playing/config.toml");
            let local_path = Path::new("config.toml");
            if etc_path.exists() {
                Some(etc_path.to_path_buf())
            } else if local_path.exists() {
                Some(local_path.to_path_buf())
            } else {
                None
            }
        }
    };

    let mut cfg = match &resolved_config_path {
        Some(p) => Config::from_path(p)
            .with_context(|| format!("loading config from {}", p.display()))?,
        None => Config::default(),
    };
    if let Ok(id) = std::env::var("SPOTIFY_CLIENT_ID") {
        if !id.trim().is_empty() {
            cfg.client_id = id;
        }
    }

    if let Commands::ConfigValidate = cli.command {
        match cfg.validate() {
            Ok(()) => println!("OK"),
            Err(e) => {
                eprintln!("Config validation failed: {}", e);
                std::process::exit(2);
            }
        }
        return Ok(());
    }

    let _guard = init_logging(&cfg)?;

    let store: Arc<dyn KvStore> = if cli.memory {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(
            SqliteStore::open(&cfg.db_path)
                .with_context(|| format!("opening store at {}", cfg.db_path.display()))?,
        )
    };

    match cli.command {
        Commands::Serve => {
            cfg.validate()?;
            lib::server::run(&cfg, store).await.context("running server")?;
        }
        Commands::Once => {
            cfg.validate()?;
            let service = NowPlayingService::new(&cfg, store);
            let resp = lib::server::respond(service.handle().await);
            let status = resp.status();
            let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await?;
            println!("{}", status);
            println!("{}", String::from_utf8_lossy(&body));
        }
        Commands::TokenImport { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let token: AccessToken =
                serde_json::from_str(&raw).map_err(|e| anyhow!("parse token json: {}", e))?;
            store
                .put(&cfg.keys.token, &serde_json::to_string(&token)?)
                .await?;
            println!(
                "Stored token under '{}' (expires_at {}).",
                cfg.keys.token, token.expires_at
            );
        }
        Commands::CacheStatus => {
            let service = NowPlayingService::new(&cfg, store);
            let now = chrono::Utc::now().timestamp_millis();
            match service.cache().read(now).await? {
                Some(c) => {
                    let state = if c.is_fresh { "fresh" } else { "stale" };
                    println!("{}: {}", state, serde_json::to_string_pretty(&c.data)?);
                }
                None => println!("absent"),
            }
        }
        // handled before logging setup
        Commands::ConfigValidate => {}
    }

    Ok(())
}

/// stdout plus a daily-rotated file in `log_dir`; `RUST_LOG` overrides the
/// default `info` filter. `log` records are bridged into tracing.
fn init_logging(cfg: &Config) -> Result<WorkerGuard> {
    let _ = LogTracer::init();
    cfg.ensure_log_dir()?;
    let file_appender: RollingFileAppender =
        tracing_appender::rolling::daily(&cfg.log_dir, "now-playing.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer().with_ansi(false).with_writer(non_blocking);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer);

    tracing_subscriber_global::set_global_default(subscriber)
        .map_err(|e| anyhow!("failed to set global tracing subscriber: {}", e))?;
    Ok(guard)
}
