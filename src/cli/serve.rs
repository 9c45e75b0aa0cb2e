//! Serve command implementation

use crate::agent::build_agents;
use crate::api::{create_router, AppState};
use crate::cli::ServeArgs;
use crate::config::{GatewayConfig, LogFormat};
use crate::registry::Registry;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Load configuration with CLI overrides
///
/// Precedence: CLI flags, then `CLAWGATE_*` environment, then the file.
pub fn load_config_with_overrides(
    args: &ServeArgs,
) -> Result<GatewayConfig, Box<dyn std::error::Error>> {
    let mut config = if args.config.exists() {
        GatewayConfig::load(Some(&args.config))?
    } else {
        tracing::debug!("Config file not found, using defaults");
        GatewayConfig::default()
    };

    config = config.with_env_overrides();

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(ref host) = args.host {
        config.server.host = host.clone();
    }
    if let Some(ref log_level) = args.log_level {
        config.logging.level = log_level.clone();
    }

    Ok(config)
}

/// Initialize tracing based on configuration
///
/// `RUST_LOG`, when set, replaces the configured directives.
pub fn init_tracing(
    config: &crate::config::LoggingConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter_str = crate::logging::build_filter_directives(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    if config.enable_content_logging {
        eprintln!("WARNING: Content logging is enabled. User prompts will appear in debug logs.");
        eprintln!("         This may include sensitive data. Use only for debugging.");
    }

    match config.format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
    }

    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for CTRL+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
        _ = cancel_token.cancelled() => {}
    }

    cancel_token.cancel();
}

/// Main serve command handler
pub async fn run_serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_with_overrides(&args)?;
    config.validate()?;

    init_tracing(&config.logging)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting ClawGate");
    tracing::debug!(?config, "Loaded configuration");

    let registry = Arc::new(Registry::from_config(&config)?);
    if registry.is_empty() {
        tracing::warn!("No backends registered; every request will fail with 503");
    }
    let agents = build_agents(&registry)?;

    let config = Arc::new(config);
    let app_state = Arc::new(AppState::new(Arc::clone(&config), registry, agents));
    if app_state.classifier.model_assist_enabled() {
        tracing::info!(backend = ?config.classifier.backend, "Model-assisted classification enabled");
    }
    let app = create_router(app_state);

    let cancel_token = CancellationToken::new();
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "ClawGate API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await?;

    tracing::info!("ClawGate server stopped");
    Ok(())
}
