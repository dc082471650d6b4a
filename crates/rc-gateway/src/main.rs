//! `callcore` — entry point for the real-time voice call orchestrator
//! (spec §4.8, C8). Grounded on the teacher's `main.rs::run_server`: parse
//! the CLI, init tracing, load config, build shared state, bind axum, and
//! shut down gracefully on a signal.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use rc_gateway::cli::{Cli, Command, ConfigCommand};
use rc_gateway::{CallRegistry, GatewayState};
use rc_llm::ChatProvider;
use rc_session::SessionDeps;
use rc_session::{CancelMap, SessionLockMap};
use rc_tenant::TenantCache;
use rc_tools::ToolRouter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let (config, config_path) = rc_gateway::cli::load_config()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Doctor => {
            let passed = rc_gateway::cli::doctor::run(&config, &config_path).await?;
            std::process::exit(if passed { 0 } else { 1 });
        }
        Command::Config(ConfigCommand::Validate) => {
            let ok = rc_gateway::cli::config::validate(&config, &config_path);
            std::process::exit(if ok { 0 } else { 1 });
        }
        Command::Config(ConfigCommand::Show) => {
            rc_gateway::cli::config::show(&config);
            Ok(())
        }
        Command::Version => {
            println!("callcore {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// `init_tracing` mirrors the teacher's `main.rs`: env-filter controlled by
/// `RUST_LOG`, defaulting to `info`, JSON-formatted for production
/// ingestion (spec §0 ambient stack).
fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Registry};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    let _ = Registry::default().with(filter).with(fmt_layer).try_init();
}

/// `api_key_env` names an environment variable, not a literal key (spec
/// §6: "Configuration (environment-sourced...) STT/TTS/LLM provider
/// endpoints and API keys"). A provider that genuinely has no key
/// configured in its deployment environment still boots — `doctor`
/// surfaces the missing key as a reachability failure, not a crash.
fn read_api_key(env_var: &str) -> String {
    std::env::var(env_var).unwrap_or_default()
}

async fn serve(config: rc_domain::config::Config) -> anyhow::Result<()> {
    let issues = config.validate();
    for issue in &issues {
        tracing::warn!("{issue}");
    }
    if issues
        .iter()
        .any(|e| e.severity == rc_domain::config::ConfigSeverity::Error)
    {
        anyhow::bail!("refusing to start with invalid configuration; run `callcore config validate`");
    }

    let stt_api_key = read_api_key(&config.stt.api_key_env);
    let tts_api_key = read_api_key(&config.tts.api_key_env);
    let llm_api_key = read_api_key(&config.llm.api_key_env);

    let provider = Arc::new(ChatProvider::new(&config.llm, llm_api_key)?);
    let tenants = Arc::new(TenantCache::load(
        std::path::Path::new(&config.tenant.source),
        Duration::from_secs(config.tenant.cache_ttl_secs),
    )?);
    let tools = Arc::new(ToolRouter::new(tenants.clone()));

    let session_deps = Arc::new(SessionDeps {
        provider,
        tools,
        locks: Arc::new(SessionLockMap::new()),
        cancels: Arc::new(CancelMap::new()),
        booking_sink: Arc::new(rc_session::LoggingBookingSink),
        sms_sink: Arc::new(rc_session::LoggingSmsSink),
    });

    let state = GatewayState {
        config: Arc::new(config.clone()),
        tenants,
        session_deps,
        registry: Arc::new(CallRegistry::new()),
        stt_api_key: stt_api_key.into(),
        tts_api_key: tts_api_key.into(),
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "callcore listening");

    let registry = state.registry.clone();
    let drain = Duration::from_secs(config.server.shutdown_drain_secs);
    let app = rc_gateway::router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(registry, drain))
        .await?;

    Ok(())
}

/// Waits for SIGINT/SIGTERM, then drains active calls before returning
/// control to axum so it can stop accepting new connections (spec §4.8,
/// §5's graceful-shutdown drain window).
async fn shutdown_signal(registry: Arc<CallRegistry>, drain: Duration) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received, draining active calls");
    registry.shutdown(drain).await;
}
