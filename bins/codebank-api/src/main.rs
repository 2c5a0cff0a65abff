mod error;
mod handlers;
mod metrics;
mod routes;

use axum::Router;
use codebank_common::catalog::ProblemCatalog;
use codebank_common::config::Config;
use codebank_common::redis::RedisStore;
use codebank_common::store::{InMemoryStore, ProblemStore};
use codebank_judge::{Grader, ProcessEngine};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

pub struct AppState {
    pub catalog: ProblemCatalog,
    pub grader: Grader,
}

impl AppState {
    pub fn new(store: Arc<dyn ProblemStore>, engine: Arc<dyn codebank_judge::CodeExecutor>) -> Self {
        Self {
            catalog: ProblemCatalog::new(Arc::clone(&store)),
            grader: Grader::new(engine, store),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.rust_log)),
        )
        .with_target(false)
        .init();

    info!("Codebank API booting...");

    let store: Arc<dyn ProblemStore> = match &config.redis_url {
        Some(url) => {
            let store = RedisStore::connect(url).await.map_err(|e| {
                error!(error = %e, "Failed to connect to Redis");
                e
            })?;
            info!("Connected to Redis: {}", url);
            Arc::new(store)
        }
        None => {
            warn!("REDIS_URL not set, problems and submissions are kept in memory");
            Arc::new(InMemoryStore::new())
        }
    };

    let engine = ProcessEngine::from_config(&config)?;
    info!(
        languages = ?engine.languages().list_languages(),
        timeout_ms = ?config.execution_timeout_ms,
        policy = ?config.runtime_error_policy,
        "Execution engine ready"
    );

    let state = Arc::new(AppState::new(store, Arc::new(engine)));

    // Build router
    let app = Router::new().merge(routes::routes()).with_state(state);

    // Start server
    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr).await?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
