//! ClashCast daemon: entry point for running the battle engine.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use clashcast_broadcast::{registry::spawn_heartbeat, ws_router, Broadcaster};
use clashcast_engine::logging::{init_logging, LogFormat};
use clashcast_engine::{
    spawn_sweep, spawn_timer_sync, BattleManager, EngineConfig, ShutdownController, TopicBrief,
};
use clashcast_nullables::NullTopicSource;
use clashcast_oracle::{keypair_from_seed, HttpEscrowChain, PayoutDomain, PayoutOracle};
use clashcast_store::MemoryStore;
use clashcast_types::{Address, Clock, SystemClock};

#[derive(Parser)]
#[command(name = "clashcast-daemon", about = "ClashCast battle engine daemon")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,

    /// HTTP API port.
    #[arg(long, env = "CLASHCAST_RPC_PORT")]
    rpc_port: Option<u16>,

    /// WebSocket port for live updates.
    #[arg(long, env = "CLASHCAST_WS_PORT")]
    ws_port: Option<u16>,

    /// Battle duration in seconds.
    #[arg(long, env = "CLASHCAST_BATTLE_DURATION")]
    battle_duration_secs: Option<u64>,

    /// Sweep interval in seconds.
    #[arg(long, env = "CLASHCAST_SWEEP_INTERVAL")]
    sweep_interval_secs: Option<u64>,

    /// Escrow chain gateway URL (payouts disabled when unset).
    #[arg(long, env = "CLASHCAST_CHAIN_GATEWAY")]
    chain_gateway_url: Option<String>,

    /// Escrow contract address (payouts disabled when unset).
    #[arg(long, env = "CLASHCAST_ESCROW_CONTRACT")]
    escrow_contract: Option<String>,

    /// Oracle signing key seed, 32 bytes hex.
    #[arg(long, env = "CLASHCAST_ORACLE_KEY", hide_env_values = true)]
    oracle_key: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, default_value = "info", env = "CLASHCAST_LOG_LEVEL")]
    log_level: String,

    /// Log format: "human" or "json".
    #[arg(long, default_value = "human", env = "CLASHCAST_LOG_FORMAT")]
    log_format: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the engine.
    Run,
}

/// Built-in topic rotation for deployments without a topic service.
fn default_topics() -> NullTopicSource {
    NullTopicSource::new(vec![
        TopicBrief {
            title: "Should remote work be the default?".into(),
            description: "Offices are reopening while distributed teams keep shipping.".into(),
            category: "work".into(),
            side_a_points: vec![
                "Deep work needs uninterrupted time".into(),
                "Hiring without borders widens the talent pool".into(),
            ],
            side_b_points: vec![
                "Mentorship happens in hallways".into(),
                "Teams drift apart without shared space".into(),
            ],
        },
        TopicBrief {
            title: "Is open source the best default for new infrastructure?".into(),
            description: "Licensing fights keep reshaping the ecosystem.".into(),
            category: "tech".into(),
            side_a_points: vec!["Shared scrutiny hardens code".into()],
            side_b_points: vec!["Sustainable funding needs control".into()],
        },
    ])
}

fn build_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("config path is not valid UTF-8"))?;
            let cfg = EngineConfig::from_toml_file(path)?;
            tracing::info!("loaded config from {path}");
            cfg
        }
        None => EngineConfig::default(),
    };

    if let Some(port) = cli.rpc_port {
        config.rpc_port = port;
    }
    if let Some(port) = cli.ws_port {
        config.websocket_port = port;
    }
    if let Some(duration) = cli.battle_duration_secs {
        config.battle_duration_secs = duration;
    }
    if let Some(interval) = cli.sweep_interval_secs {
        config.sweep_interval_secs = interval;
    }
    if let Some(url) = &cli.chain_gateway_url {
        config.chain_gateway_url = url.clone();
    }
    if let Some(contract) = &cli.escrow_contract {
        config.escrow_contract = contract.clone();
    }
    config.log_level = cli.log_level.clone();
    config.log_format = cli.log_format.clone();
    Ok(config)
}

/// Build the payout oracle when chain settings and a key are present.
fn build_oracle(config: &EngineConfig, cli: &Cli) -> anyhow::Result<Option<Arc<PayoutOracle>>> {
    if !config.payouts_enabled() {
        tracing::info!("chain settings absent, payouts disabled");
        return Ok(None);
    }
    let Some(key_hex) = &cli.oracle_key else {
        tracing::warn!("chain settings present but no oracle key, payouts disabled");
        return Ok(None);
    };
    let seed_bytes = hex::decode(key_hex)?;
    let seed: [u8; 32] = seed_bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("oracle key must be 32 bytes of hex"))?;
    let keypair = keypair_from_seed(&seed);

    let contract = Address::parse(&config.escrow_contract)
        .map_err(|e| anyhow::anyhow!("bad escrow contract address: {e}"))?;
    let domain = PayoutDomain::new(config.chain_id, contract);
    let chain = Arc::new(HttpEscrowChain::new(&config.chain_gateway_url));

    tracing::info!(
        gateway = %config.chain_gateway_url,
        oracle = %clashcast_oracle::derive_address(&keypair.public),
        "payout oracle enabled"
    );
    Ok(Some(Arc::new(PayoutOracle::new(keypair, domain, chain))))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(LogFormat::from_name(&cli.log_format), &cli.log_level);
    let config = build_config(&cli)?;

    match cli.command {
        Command::Run => run(config, &cli).await,
    }
}

async fn run(config: EngineConfig, cli: &Cli) -> anyhow::Result<()> {
    tracing::info!(
        rpc = config.rpc_port,
        ws = config.websocket_port,
        sweep_secs = config.sweep_interval_secs,
        battle_secs = config.battle_duration_secs,
        "starting clashcast engine"
    );

    let store = Arc::new(MemoryStore::new());
    let broadcaster = Arc::new(Broadcaster::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let oracle = build_oracle(&config, cli)?;

    let mut manager = BattleManager::new(
        store,
        Arc::new(default_topics()),
        broadcaster.clone(),
        config.clone(),
    );
    if let Some(oracle) = oracle {
        manager = manager.with_oracle(oracle);
    }
    let manager = Arc::new(manager);

    // Open the first battle before serving traffic.
    let battle = manager.ensure_active_battle().await?;
    tracing::info!(battle = %battle.id, topic = %battle.topic, "current battle ready");

    let shutdown = Arc::new(ShutdownController::new());

    let mut tasks = Vec::new();
    tasks.push(spawn_sweep(manager.clone(), shutdown.subscribe()));
    tasks.push(spawn_timer_sync(manager.clone(), shutdown.subscribe()));
    tasks.push(spawn_heartbeat(
        broadcaster.clone(),
        clock.clone(),
        std::time::Duration::from_secs(config.heartbeat_interval_secs),
        shutdown.subscribe(),
    ));

    // Live-update WebSocket server.
    let ws_app = ws_router(broadcaster, clock);
    let ws_addr = format!("0.0.0.0:{}", config.websocket_port);
    let ws_listener = tokio::net::TcpListener::bind(&ws_addr).await?;
    tracing::info!("websocket server listening on {ws_addr}");
    let mut ws_shutdown = shutdown.subscribe();
    tasks.push(tokio::spawn(async move {
        let serve = axum::serve(ws_listener, ws_app);
        tokio::select! {
            result = serve => {
                if let Err(e) = result {
                    tracing::error!(error = %e, "websocket server exited");
                }
            }
            _ = ws_shutdown.recv() => {}
        }
    }));

    // HTTP API server.
    let rpc = clashcast_rpc::RpcServer::new(config.rpc_port, manager.clone());
    let mut rpc_shutdown = shutdown.subscribe();
    tasks.push(tokio::spawn(async move {
        tokio::select! {
            result = rpc.start() => {
                if let Err(e) = result {
                    tracing::error!(error = %e, "api server exited");
                }
            }
            _ = rpc_shutdown.recv() => {}
        }
    }));

    shutdown.wait_for_signal().await;
    tracing::info!("shutdown signal received, stopping tasks");
    for task in tasks {
        let _ = task.await;
    }
    tracing::info!("clashcast daemon exited cleanly");
    Ok(())
}
