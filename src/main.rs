use clap::Parser;
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use flowfun_party::{
    client::{
        self,
        AppConfig,
    },
    config::{
        self,
        Overrides,
        SettingsStore,
    },
    local::LocalChainConfig,
    wallets,
};
use std::{
    path::Path,
    sync::OnceLock,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(version, about = "FlowFun Party: climb the board, dodge the death tiles", long_about = None)]
struct Cli {
    /// Settings file; created with defaults when missing.
    #[arg(long)]
    config: Option<String>,

    /// JSON-RPC wallet endpoint offered first in the wallet list.
    #[arg(long = "rpc-url")]
    rpc_url: Option<String>,

    #[arg(long)]
    contract: Option<String>,

    #[arg(long = "chain-id")]
    chain_id: Option<u64>,

    /// Start in demo mode.
    #[arg(long, default_value = "false")]
    demo: bool,

    /// Connect to the in-process simulated chain on startup.
    #[arg(long, default_value = "false")]
    local: bool,

    #[arg(long = "log-dir")]
    log_dir: Option<String>,
}

fn init_tracing(log_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(log_dir)
        .wrap_err_with(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let appender = rolling::daily(log_dir, "flowfun.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(&config::resolve_path(
        cli.log_dir.as_deref(),
        config::DEFAULT_LOG_DIR,
    ))?;
    tracing::info!("starting flowfun client");

    let store = SettingsStore::open(config::resolve_path(
        cli.config.as_deref(),
        config::DEFAULT_CONFIG_PATH,
    ))?;
    let mut settings = store.load()?;
    settings.apply_overrides(&Overrides {
        rpc_url: cli.rpc_url,
        contract: cli.contract,
        chain_id: cli.chain_id,
    });
    let game = settings.game_config()?;
    let connectors =
        wallets::allowed_connectors(&settings.connectors, &settings.connector_allow_list);
    tracing::info!(
        chain_id = game.required_chain_id,
        contract = %game.contract,
        connectors = connectors.len(),
        settings = %store.path().display(),
        "settings loaded"
    );

    let mut local = LocalChainConfig::new(game.required_chain_id);
    local.contract = game.contract;
    client::run_app(AppConfig {
        game,
        connectors,
        local,
        refresh_interval: settings.refresh_interval(),
        start_in_demo: cli.demo,
        auto_connect_local: cli.local,
    })
    .await
}
