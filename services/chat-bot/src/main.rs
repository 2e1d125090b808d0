use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use chatcollect_bot::{
    actor::Actor,
    api::{self, AppState},
    broadcaster::Broadcaster,
    config_watch::{self, ConfigWatcher},
    console,
};
use chatcollect_execution::{GameEngine, PlayerLedger};
use chatcollect_types::GameConfig;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Chat-triggered collection game with stream overlays")]
struct Args {
    #[arg(long, env = "CHATCOLLECT_HOST", default_value = "127.0.0.1")]
    host: String,

    #[arg(long, env = "CHATCOLLECT_PORT", default_value_t = 8765)]
    port: u16,

    /// Game config (`.json`, otherwise YAML). Defaults apply when the file is missing.
    #[arg(long, env = "CHATCOLLECT_CONFIG", default_value = "chatcollect_config.json")]
    config: PathBuf,

    #[arg(long, env = "CHATCOLLECT_LEDGER", default_value = "chatcollect_players.txt")]
    ledger: PathBuf,

    /// Seconds between config file checks. 0 disables hot reload.
    #[arg(long, env = "CHATCOLLECT_CONFIG_POLL_SECS", default_value_t = 2)]
    config_poll_secs: u64,

    /// Start with the loot banner hidden on overlays.
    #[arg(long)]
    no_banner: bool,

    /// Do not read operator commands from stdin.
    #[arg(long)]
    no_console: bool,

    /// Used when RUST_LOG is unset.
    #[arg(long, env = "CHATCOLLECT_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[arg(long, default_value_t = 256)]
    mailbox_capacity: usize,

    #[arg(long, default_value_t = 64)]
    overlay_queue: usize,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(path: &Path) -> Result<GameConfig> {
    if path.exists() {
        GameConfig::load(path).context("Could not parse config file")
    } else {
        warn!(path = %path.display(), "config file not found; using defaults");
        GameConfig::default()
            .validate()
            .context("default config is invalid")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let config = load_config(&args.config)?;
    let ledger = PlayerLedger::open(&args.ledger);
    info!(players = ledger.len(), path = %args.ledger.display(), "ledger loaded");

    let mut engine = GameEngine::from_entropy(config, ledger);
    engine.set_show_banner(!args.no_banner);

    let broadcaster = Broadcaster::new();
    let (outbox, mut announcements) = mpsc::channel::<String>(args.mailbox_capacity.max(1));
    let mailbox = Actor::new(engine, broadcaster.clone(), outbox).spawn(args.mailbox_capacity);

    // Announcements have no chat transport of their own here; surface them in the log.
    tokio::spawn(async move {
        while let Some(text) = announcements.recv().await {
            info!(target: "chat", "{text}");
        }
    });

    // Scheduler loop: cadence follows event activity.
    let tick_mailbox = mailbox.clone();
    tokio::spawn(async move {
        loop {
            match tick_mailbox.tick().await {
                Ok(next) => tokio::time::sleep(next).await,
                Err(err) => {
                    warn!(%err, "tick loop stopping");
                    break;
                }
            }
        }
    });

    if args.config_poll_secs > 0 {
        let watcher = ConfigWatcher::new(&args.config);
        tokio::spawn(config_watch::watch(
            watcher,
            mailbox.clone(),
            Duration::from_secs(args.config_poll_secs),
        ));
    }

    if !args.no_console {
        tokio::spawn(console::run(mailbox.clone()));
    }

    let app = api::router(AppState {
        mailbox,
        broadcaster,
        overlay_queue: args.overlay_queue,
    });

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .context("invalid listen addr")?;
    info!(%addr, "chatcollect listening");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
