//! Gatekeep identity service binary.
//!
//! Prints `{"port": N}` to stdout once bound so supervisors can discover an
//! ephemeral port.

use std::sync::Arc;

use clap::Parser;
use gatekeep_api::AppState;
use gatekeep_api::config::ApiConfig;
use gatekeep_core::resets::ResetStore;
use gatekeep_core::resets::memory::MemoryResetStore;
use gatekeep_core::resets::postgres::PgResetStore;
use gatekeep_core::users::memory::MemoryUserStore;
use gatekeep_core::users::postgres::PgUserStore;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// CLI arguments for the identity service.
#[derive(Parser, Debug)]
#[command(name = "gatekeep_server", about = "Gatekeep identity service")]
struct Args {
    /// Port to listen on (0 = ephemeral). Overrides the port in `BIND_ADDR`.
    #[arg(long)]
    port: Option<u16>,

    /// PostgreSQL connection URL.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Keep principals and reset secrets in memory. Nothing survives a
    /// restart.
    #[arg(long, default_value_t = false)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Write logs to stderr so stdout is reserved for the JSON port message.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gatekeep_api=debug,gatekeep_core=debug".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env()?;
    if let Some(port) = args.port {
        let host = config
            .bind_addr
            .rsplit_once(':')
            .map_or("127.0.0.1", |(host, _)| host)
            .to_string();
        config.bind_addr = format!("{host}:{port}");
    }
    if let Some(url) = args.database_url {
        config.database_url = url;
    }

    info!(bind_addr = %config.bind_addr, in_memory = args.in_memory, "starting gatekeep_server");

    let (user_store, reset_store) = if args.in_memory {
        warn!("in-memory stores: state is lost on exit");
        let resets: Arc<dyn ResetStore> = Arc::new(MemoryResetStore::new());
        (
            gatekeep_api::cached_user_store(MemoryUserStore::new(), &config),
            resets,
        )
    } else {
        info!(max_connections = args.max_connections, "configuring connection pool");
        let pool = PgPoolOptions::new()
            .max_connections(args.max_connections)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect(&config.database_url)
            .await?;

        info!("running database migrations");
        gatekeep_api::migrate(&pool).await?;

        let resets: Arc<dyn ResetStore> = Arc::new(PgResetStore::new(pool.clone()));
        (
            gatekeep_api::cached_user_store(PgUserStore::new(pool), &config),
            resets,
        )
    };

    let state = AppState::new(config.clone(), user_store, reset_store)?;
    let app = gatekeep_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;

    println!("{}", serde_json::json!({ "port": local_addr.port() }));
    info!(addr = %local_addr, "REST API listening");

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, shutting down");
            }
            shutdown.cancel();
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}
