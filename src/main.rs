use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use syncroom::config::{ServerConfig, ServerConfigOverrides};
use syncroom::server::{AppState, create_router};
use syncroom::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "syncroom")]
#[command(about = "Multi-tenant real-time file synchronization server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Path (or sqlite:// URL) of the database
        #[arg(long)]
        database: Option<String>,

        /// Path to a TOML config file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            database,
            config,
        } => {
            let config = ServerConfig::load_with_overrides(
                config.as_deref(),
                ServerConfigOverrides {
                    host,
                    port,
                    database_url: database,
                },
            )?;

            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
                )
                .init();

            if config.admin_api_key.is_none() {
                tracing::warn!("no admin API key configured; admin endpoints are disabled");
            }

            let db_path = config.db_path();
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }

            let store = SqliteStore::new(&db_path)?;
            store.initialize()?;

            let state = Arc::new(AppState::new(
                Arc::new(store),
                config.admin_api_key.clone(),
            ));
            let app = create_router(state, config.cors_layer());
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
