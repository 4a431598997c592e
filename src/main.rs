use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notedeck::{
    api,
    config::{ServerConfig, StorageTarget},
    db,
    services::Services,
    store::{DocumentStore, MemoryStore},
};

#[derive(Parser)]
#[command(name = "notedeck")]
#[command(about = "Course notes shared between users and groups")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port for HTTP API [env: NOTEDECK_PORT, default: 3000]
        #[arg(short, long)]
        port: Option<u16>,

        /// SQLite database file [env: NOTEDECK_DB]
        #[arg(long, conflicts_with = "memory")]
        db: Option<PathBuf>,

        /// Keep everything in memory; nothing is persisted
        #[arg(long)]
        memory: bool,
    },
    /// Apply pending database migrations and exit
    Migrate {
        /// SQLite database file [env: NOTEDECK_DB]
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "notedeck=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn open_sqlite(path: Option<PathBuf>) -> anyhow::Result<db::SqliteStore> {
    let store = match path {
        Some(path) => db::SqliteStore::open(path)?,
        None => db::SqliteStore::open_default()?,
    };
    store.migrate().context("Failed to run database migrations")?;
    Ok(store)
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let store: Arc<dyn DocumentStore> = match config.storage {
        StorageTarget::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
        StorageTarget::Sqlite(path) => Arc::new(open_sqlite(path)?),
    };

    let app = api::create_router(Services::new(store), config.security);

    let addr = format!("127.0.0.1:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("notedeck listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = ServerConfig::from_env();

    match cli.command {
        Some(Commands::Serve { port, db, memory }) => {
            serve(config.with_overrides(port, db, memory)).await?;
        }
        Some(Commands::Migrate { db }) => {
            let env_path = match config.storage {
                StorageTarget::Sqlite(path) => path,
                StorageTarget::Memory => None,
            };
            open_sqlite(db.or(env_path))?;
            tracing::info!("Migrations complete");
        }
        None => serve(config).await?,
    }

    Ok(())
}
