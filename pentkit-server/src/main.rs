use anyhow::{Context, Result};
use clap::Parser;
use pentkit_core::{config_path, logging, BackendType, Catalog, Config, LogFormat};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "pentkit-server")]
#[command(about = "Serves the pentkit command catalog over HTTP", long_about = None)]
struct Args {
    /// Config file (defaults to ~/.pentkit.yaml)
    #[arg(long, env = "PENTKIT_CONFIG")]
    config: Option<PathBuf>,

    /// Catalog file (.yaml or .db)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Storage backend, inferred from the file extension when omitted
    #[arg(long)]
    backend: Option<BackendType>,

    /// Address to listen on, e.g. 127.0.0.1:3001
    #[arg(long)]
    bind: Option<String>,

    /// Log output format (pretty or json)
    #[arg(long)]
    log_format: Option<LogFormat>,
}

fn load_config(args: &Args) -> Result<Config> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => config_path()?,
    };
    let mut config = Config::load_or_create(&path)?;
    config.apply_env();

    if let Some(db) = &args.db {
        config.catalog_path = db.clone();
    }
    if let Some(backend) = args.backend {
        config.backend = Some(backend);
    }
    if let Some(bind) = &args.bind {
        config.bind = bind.clone();
    }
    if let Some(format) = args.log_format {
        config.log_format = format;
    }
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    logging::init(config.log_format);

    let database = config.database();
    let catalog = tokio::task::spawn_blocking(move || Catalog::from_config(&database))
        .await
        .context("catalog open task failed")??;
    let app = pentkit_server::router(Arc::new(catalog));

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!(bind = %config.bind, catalog = %config.catalog_path.display(), "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}
