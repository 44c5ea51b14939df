use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use hyper::Request;
use hyper::body::Incoming;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use authgate::database::{
    MemorySessionStore, SessionStore, SessionStoreHandle, SqliteSessionStore,
};
use authgate::gate::{AuthGate, unix_now};
use authgate::handlers;
use authgate::permission::PermissionTable;
use authgate::serve::{SHUTDOWN_GRACE, serve};
use authgate::token::SigningKey;
use authgate::tower_middle::AuthLayer;
use authgate::AppState;
use shared::config::load_config;
use shared::types::AppConfig;

/// How often expired sessions are swept from a persistent store.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Parser, Debug)]
#[command(name = "authgate", about = "Bearer-token authorization gate")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "AUTHGATE_CONFIG", default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;

    let gate = build_gate(&config).await?;
    let addr: SocketAddr = config
        .server
        .addr()
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.server.addr()))?;

    let auth_layer =
        AuthLayer::new(gate.clone()).with_public_paths(config.server.public_paths.clone());
    let state = AppState::new(gate, config);

    let service = ServiceBuilder::new()
        .layer(auth_layer)
        .service(tower::service_fn(move |req: Request<Incoming>| {
            let state = state.clone();
            async move { Ok::<_, Infallible>(handlers::route(req, state).await) }
        }));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);

    serve(listener, service, shutdown_signal(), SHUTDOWN_GRACE).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn build_gate(config: &AppConfig) -> Result<AuthGate> {
    let secret = config
        .auth
        .resolved_signing_secret()
        .ok_or_else(|| anyhow!("No signing secret configured"))?;
    let key = SigningKey::new(secret).context("Invalid signing secret")?;

    let permissions = PermissionTable::new(
        config
            .permissions
            .iter()
            .map(|(pattern, level)| (pattern.as_str(), *level)),
    )
    .context("Invalid permission table")?;

    let store: Arc<dyn SessionStore> = if config.store.is_memory() {
        warn!("Using in-memory session store; sessions are lost on restart");
        Arc::new(MemorySessionStore::new())
    } else {
        let sqlite = SqliteSessionStore::connect(&config.store.address, &config.store.namespace)
            .await
            .with_context(|| format!("Failed to open session store {}", config.store.address))?;
        spawn_session_sweeper(sqlite.clone(), config.auth.token_validity());
        Arc::new(sqlite)
    };

    let handle = SessionStoreHandle::new(store, config.store.timeout());
    Ok(AuthGate::with_validity(
        key,
        permissions,
        handle,
        config.auth.token_validity(),
    ))
}

/// Drop session records whose tokens have outlived their validity window.
fn spawn_session_sweeper(store: SqliteSessionStore, validity: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let cutoff = unix_now()
                .saturating_sub(i64::try_from(validity.as_secs()).unwrap_or(i64::MAX));
            match store.cleanup_created_before(cutoff).await {
                Ok(0) => {}
                Ok(n) => info!("Swept {} expired session(s)", n),
                Err(e) => warn!("Session sweep failed: {}", e),
            }
        }
    });
}
