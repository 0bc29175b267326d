//! Prompt injection guard service.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use zentinel_injection_guard::detection::predictionguard::DEFAULT_BASE_URL;
use zentinel_injection_guard::{
    timeout_from_secs, InjectionGuard, InjectionGuardConfig, InjectionGuardConfigJson,
    DEFAULT_PORT,
};

/// Prompt injection guard for Zentinel
///
/// Inspects text payloads with a single detector backend selected at startup
/// and returns either the text unchanged or an injection risk score.
#[derive(Parser, Debug)]
#[command(name = "zentinel-injection-guard")]
#[command(version, about, long_about = None)]
struct Args {
    /// Detector backend: NATIVE_PROMPT_INJECTION_DETECTION or PREDICTIONGUARD_PROMPT_INJECTION
    #[arg(
        long,
        env = "PROMPT_INJECTION_COMPONENT_NAME",
        default_value = "NATIVE_PROMPT_INJECTION_DETECTION"
    )]
    component_name: String,

    /// Address to listen on
    #[arg(long, env = "PROMPT_INJECTION_DETECTION_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "PROMPT_INJECTION_DETECTION_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Score at or above which the native detector flags a text
    #[arg(long, env = "PROMPT_INJECTION_THRESHOLD", default_value = "0.8")]
    threshold: f64,

    /// Timeout for a single detector call, in seconds
    #[arg(long, env = "PROMPT_INJECTION_TIMEOUT_SECS", default_value = "10")]
    timeout_secs: f64,

    /// Prediction Guard API base URL
    #[arg(long, env = "PREDICTIONGUARD_URL", default_value_t = DEFAULT_BASE_URL.to_string())]
    predictionguard_url: String,

    /// Prediction Guard API key (required for PREDICTIONGUARD_PROMPT_INJECTION)
    #[arg(long, env = "PREDICTIONGUARD_API_KEY", hide_env_values = true)]
    predictionguard_api_key: Option<String>,

    /// JSON config file; values in it override the flags above
    #[arg(long, env = "PROMPT_INJECTION_CONFIG")]
    config: Option<PathBuf>,

    /// Log every input and outcome
    #[arg(long, short, env = "LOGFLAG", default_value = "false")]
    verbose: bool,
}

fn build_config(args: Args) -> Result<InjectionGuardConfig> {
    let mut config = InjectionGuardConfig {
        component: args.component_name.parse()?,
        host: args.host,
        port: args.port,
        threshold: args.threshold,
        timeout: timeout_from_secs(args.timeout_secs)?,
        predictionguard_url: args.predictionguard_url,
        predictionguard_api_key: args.predictionguard_api_key,
        verbose: args.verbose,
    };

    if let Some(path) = args.config {
        info!("Loading config file {}", path.display());
        config = InjectionGuardConfigJson::from_file(&path)?.apply(config)?;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let config = build_config(args).map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    info!("Starting prompt injection guard");
    info!("  Component: {}", config.component);
    info!("  Listen: {}", config.bind_address());
    info!("  Threshold: {}", config.threshold);
    info!("  Timeout: {:?}", config.timeout);
    info!("  Verbose: {}", config.verbose);

    let component = config.component;
    let guard = InjectionGuard::new(config).map_err(|e| {
        error!("Component {} could not be started: {}", component, e);
        e
    })?;

    let addr = guard.config().bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;

    info!("Prompt injection guard listening on http://{}/v1/injection", addr);

    axum::serve(listener, guard.router())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, starting graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }
}
