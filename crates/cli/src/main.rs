mod admin_commands;
mod db;

use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    clap::{Parser, Subcommand},
    joingate_config::JoingateConfig,
    joingate_gate::{
        ApprovalRegistry, Dispatcher, SetupWizard, SqliteStore, UserId, VerificationGate,
    },
    joingate_telegram::TelegramMembership,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "joingate", about = "joingate, a Telegram join-gate bot")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery of `joingate.toml`).
    #[arg(long, global = true, env = "JOINGATE_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database path (overrides config and `JOINGATE_DB`).
    #[arg(long, global = true)]
    database: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot (default when no subcommand is provided).
    Run,
    /// Approve an administrator directly in the database.
    Approve {
        /// Telegram user id to approve.
        user_id: i64,
    },
    /// Print an administrator's approval flag, groups and channels.
    Show {
        admin_id: i64,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// File (explicit or discovered), then environment, then command-line flags.
fn load_config(cli: &Cli) -> anyhow::Result<JoingateConfig> {
    let mut config = match &cli.config {
        Some(path) => joingate_config::load_config(path)?,
        None => joingate_config::discover_and_load(),
    };
    joingate_config::apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    if let Some(path) = &cli.database {
        config.database.path = path.clone();
    }
    debug!(?config, "configuration loaded");
    Ok(config)
}

async fn run_bot(config: JoingateConfig) -> anyhow::Result<()> {
    config.validate()?;

    let pool = db::open_pool(&config.database).await?;
    let store = Arc::new(SqliteStore::new(pool));

    let poll_timeout = config.telegram.poll_timeout_secs;
    let bot = joingate_telegram::build_bot(&config.telegram.token, poll_timeout)?;
    let username = joingate_telegram::connect(&bot).await?;

    let super_admin = UserId(config.telegram.super_admin_id);
    let idle_timeout = config.setup.idle_timeout();
    let dispatcher = Arc::new(
        Dispatcher::new(
            ApprovalRegistry::new(store.clone(), super_admin),
            SetupWizard::new(store.clone()).with_idle_timeout(idle_timeout),
            VerificationGate::new(store, Arc::new(TelegramMembership::new(bot.clone()))),
        )
        .with_bot_username(username),
    );

    let cancel = CancellationToken::new();
    if let Some(ttl) = idle_timeout {
        spawn_session_sweeper(Arc::clone(&dispatcher), ttl, cancel.clone());
    }

    info!(super_admin = super_admin.0, "joingate running");
    let polling =
        joingate_telegram::start_polling(bot, dispatcher, poll_timeout, cancel.clone());

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "failed to listen for ctrl-c");
            }
            info!("shutting down");
            cancel.cancel();
        },
        _ = cancel.cancelled() => {},
    }

    polling.await?;
    Ok(())
}

/// Periodically drop setup sessions that went idle.
fn spawn_session_sweeper(dispatcher: Arc<Dispatcher>, ttl: Duration, cancel: CancellationToken) {
    let period = (ttl / 2).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    dispatcher.wizard().sweep_expired();
                },
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "joingate starting");
    let config = load_config(&cli)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_bot(config).await,
        Commands::Approve { user_id } => {
            let store = SqliteStore::new(db::open_pool(&config.database).await?);
            admin_commands::approve(&store, UserId(user_id)).await
        },
        Commands::Show { admin_id, json } => {
            let store = SqliteStore::new(db::open_pool(&config.database).await?);
            admin_commands::show(&store, UserId(admin_id), json).await
        },
    }
}
