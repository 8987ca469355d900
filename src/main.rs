use anyhow::Context;
use axum::Router;
use clap::Parser;
use jobgate::{
    AppState, GateConfig,
    api::{handlers::system, routes::create_router},
    db::{MemoryRepository, Seed},
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// jobgate - authentication and access control gateway
#[derive(Parser, Debug)]
#[command(
    name = "jobgate-server",
    version,
    about = "Authentication and access control gateway for the job platform",
    after_help = "EXAMPLES:\n    \
                  jobgate-server                          # Uses ./jobgate.toml if present\n    \
                  jobgate-server --config prod.toml\n    \
                  jobgate-server --seed fixtures/dev.json # Preload users, jobs, applications, files"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "jobgate.toml", env = "JOBGATE_CONFIG")]
    config: PathBuf,

    /// Override server.host
    #[arg(long)]
    host: Option<String>,

    /// Override server.port
    #[arg(short, long)]
    port: Option<u16>,

    /// JSON fixture to seed the in-memory store
    #[arg(long)]
    seed: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        GateConfig::load(&cli.config)
            .with_context(|| format!("failed to load {}", cli.config.display()))?
    } else {
        let config = GateConfig::default();
        config.validate().context("default configuration is incomplete")?;
        config
    };
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    init_tracing(&config);
    tracing::info!(config = %cli.config.display(), profile = ?config.server.profile, "configuration loaded");

    let repository = match &cli.seed {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read seed {}", path.display()))?;
            let seed: Seed = serde_json::from_str(&raw).context("invalid seed file")?;
            tracing::info!(
                users = seed.users.len(),
                jobs = seed.jobs.len(),
                applications = seed.applications.len(),
                files = seed.files.len(),
                "seeding in-memory store"
            );
            MemoryRepository::from_seed(seed)
        }
        None => MemoryRepository::new(),
    };

    if !config.auth.enabled {
        tracing::warn!("authentication DISABLED: identity headers are trusted and authorization is skipped");
    }
    tracing::info!(policy = ?config.access.unmatched_routes, "unmatched route policy");
    if config.access.allowed_origins.is_empty() {
        tracing::warn!("no allowed_origins configured: origin checks and CORS are off");
    }
    if !config.rate_limit.enabled {
        tracing::warn!("rate limiting disabled");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, Arc::new(repository))?;
    state.start_background_tasks();

    // Resource handlers live in the platform services; locally every
    // protected path echoes the principal the gates admitted.
    let protected = Router::new().fallback(system::echo_principal);
    let app = create_router(state, protected);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("listening on http://{}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

fn init_tracing(config: &GateConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("{},tower_http=debug", config.server.log_level).into());
    let json = config.server.json_logs;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
