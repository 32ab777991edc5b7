// hive-metrics-exporter
// Cluster-wide Hive aggregate metrics exporter with tracing logging
use axum::{routing::get, Router};
use clap::Parser;
use hive_metrics_exporter::{
    config_path, load_config, validate_effective_config, Calculator, Config, FileLister,
    HealthStats, HiveMetrics, KubeLister, ResourceLister, Telemetry,
};
use prometheus::Registry;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{net::TcpListener, signal, sync::watch};
use tracing::{debug, error, info, warn, Level};

mod cli;
mod commands;
mod handlers;
mod state;

use cli::{Args, Commands, ConfigFormat, LogLevel};
use handlers::{config_handler, doc_handler, health_handler, metrics_handler};
use state::AppState;

/// -------------------------------------------------------------------
/// CONFIGURATION MANAGEMENT
/// -------------------------------------------------------------------

/// Resolves configuration from CLI args, config file, and defaults.
/// Precedence: CLI (if provided) > config file > default.
fn resolve_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(port) = args.port {
        config.port = Some(port);
    }
    if let Some(interval) = args.interval {
        config.interval_secs = Some(interval);
    }
    if let Some(timeout) = args.query_timeout {
        config.query_timeout_secs = Some(timeout);
    }
    if let Some(ctx) = &args.kube_context {
        config.kube_context = Some(ctx.clone());
    }
    if let Some(path) = &args.snapshot_file {
        config.snapshot_file = Some(path.clone());
    }
    if let Some(level) = &args.log_level {
        config.log_level = Some(format!("{level:?}").to_ascii_lowercase());
    }
    if let Some(cert) = &args.tls_cert {
        config.tls_cert_path = Some(cert.clone());
    }
    if let Some(key) = &args.tls_key {
        config.tls_key_path = Some(key.clone());
    }

    // Feature flags
    if args.disable_health {
        config.enable_health = Some(false);
    }
    if args.disable_telemetry {
        config.enable_telemetry = Some(false);
    }

    Ok(config)
}

/// Shows configuration in requested format
fn show_config(config: &Config, format: ConfigFormat) -> anyhow::Result<()> {
    let output = commands::config::render_config(config, &format, false)?;
    println!("{output}");
    Ok(())
}

/// Initializes tracing logging subsystem with configured log level
fn setup_logging(config: &Config) {
    let level = config
        .log_level
        .as_deref()
        .and_then(LogLevel::from_name)
        .unwrap_or(LogLevel::Info);

    let max_level = match level {
        LogLevel::Off => None,
        LogLevel::Error => Some(Level::ERROR),
        LogLevel::Warn => Some(Level::WARN),
        LogLevel::Info => Some(Level::INFO),
        LogLevel::Debug => Some(Level::DEBUG),
        LogLevel::Trace => Some(Level::TRACE),
    };
    let Some(max_level) = max_level else {
        return;
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
        return;
    }

    info!("Logging initialized with level: {:?}", level);
}

/// Builds the listing backend: snapshot file when configured, else the cluster.
async fn build_lister(config: &Config) -> anyhow::Result<Arc<dyn ResourceLister>> {
    if let Some(path) = &config.snapshot_file {
        info!("Using snapshot file {} as listing backend", path.display());
        return Ok(Arc::new(FileLister::new(path.clone())));
    }
    let lister = KubeLister::connect(config.kube_context.as_deref()).await?;
    Ok(Arc::new(lister))
}

/// Resolves when SIGINT or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// -------------------------------------------------------------------
/// MAIN APPLICATION ENTRY POINT
/// -------------------------------------------------------------------
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = resolve_config(&args)?;

    if args.check_config {
        if let Err(e) = validate_effective_config(&config) {
            eprintln!("Configuration invalid: {e}");
            std::process::exit(1);
        }
        println!("Configuration is valid");
        return Ok(());
    }

    if args.show_config {
        return show_config(&config, args.config_format);
    }

    if let Err(e) = validate_effective_config(&config) {
        eprintln!("Configuration invalid: {e}");
        std::process::exit(1);
    }

    setup_logging(&config);
    match config_path(args.config.as_deref()).filter(|_| !args.no_config) {
        Some(path) => info!("Loaded configuration from: {}", path.display()),
        None => info!("No configuration file found, using defaults"),
    }

    // Handle subcommands
    if let Some(command) = args.command {
        return match command {
            Commands::Config {
                output,
                format,
                commented,
            } => commands::command_config(output, format, commented),
            Commands::Check => {
                let lister = build_lister(&config).await?;
                commands::command_check(lister, config.query_timeout()).await
            }
            Commands::Once => {
                let lister = build_lister(&config).await?;
                commands::command_once(lister, config.interval(), config.query_timeout()).await
            }
        };
    }

    info!("Starting hive-metrics-exporter");

    let lister = build_lister(&config).await?;
    let backend = lister.describe();

    // Initialize Prometheus metrics registry
    let registry = Registry::new();
    let metrics = Arc::new(HiveMetrics::new(&registry)?);
    let health_stats = Arc::new(HealthStats::new());
    debug!("Hive gauges registered");

    let mut calculator = Calculator::new(lister, metrics, config.interval())?
        .with_query_timeout(config.query_timeout())?
        .with_health_stats(health_stats.clone());
    if config.enable_telemetry.unwrap_or(true) {
        calculator = calculator.with_telemetry(Telemetry::new(&registry)?);
        debug!("Telemetry metrics registered");
    }

    let state = Arc::new(AppState {
        registry,
        config: Arc::new(config.clone()),
        health_stats,
        backend,
    });

    // Start background calculation task
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let calculator_task = tokio::spawn(async move {
        calculator.run(shutdown_rx).await;
    });

    // Configure HTTP server routes
    let mut app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/config", get(config_handler))
        .route("/doc", get(doc_handler));
    if config.enable_health.unwrap_or(true) {
        app = app.route("/health", get(health_handler));
    }
    let app = app.with_state(state.clone());

    let addr: SocketAddr = format!("{}:{}", config.bind_addr(), config.port()).parse()?;

    if let (Some(cert), Some(key)) = (&config.tls_cert_path, &config.tls_key_path) {
        let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key).await?;
        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown_handle.graceful_shutdown(None);
        });

        info!("hive-metrics-exporter listening on https://{}", addr);
        if let Err(e) = axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(app.into_make_service())
            .await
        {
            error!("Server error: {}", e);
        }
    } else {
        let listener = TcpListener::bind(addr).await?;
        info!("hive-metrics-exporter listening on http://{}", addr);

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
        {
            error!("Server error: {}", e);
        }
    }

    // Stop the calculator between suspension points and wait for it
    if shutdown_tx.send(true).is_err() {
        warn!("Metrics calculator already stopped");
    }
    if let Err(e) = calculator_task.await {
        error!("Metrics calculator task failed: {}", e);
    }

    info!("hive-metrics-exporter stopped gracefully");
    Ok(())
}
