//! Log Sentinel ML Service
//!
//! HTTP front for the anomaly scoring engine. The dashboard posts each
//! request log here and gets back a label, severity and confidence.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   LOG SENTINEL ML SERVICE                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌─────────────────┐  ┌───────────────────┐  │
//! │  │  API      │  │  Engine         │  │  Feedback         │  │
//! │  │  (Axum)   │─►│  (Isolation     │◄─│  Coordinator      │  │
//! │  │           │  │   Forest)       │  │  (retrain batch)  │  │
//! │  └─────┬─────┘  └────────┬────────┘  └─────────┬─────────┘  │
//! │        ▼                 ▼                     ▼            │
//! │  ┌───────────────┐  ┌───────────────┐                       │
//! │  │ MemoryLogStore│  │ Model snapshot│                       │
//! │  └───────────────┘  └───────────────┘                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod bootstrap;
mod config;
mod error;
mod handlers;
mod store;

#[cfg(test)]
mod tests;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use sentinel_core::{Engine, FeatureVector, FeedbackCoordinator, Whitelist};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sentinel_ml_service=debug,sentinel_core=info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Log Sentinel ML Service starting...");
    tracing::info!(
        "Isolation Forest: {} trees, contamination {}, seed {}",
        config.num_trees,
        config.contamination,
        config.seed
    );

    let state = AppState::new(config.clone())?;

    // Restore or train before accepting traffic
    let engine = state.engine.clone();
    let corpus = state.corpus.clone();
    let snapshot_path = config.snapshot_path.clone();
    let source = tokio::task::spawn_blocking(move || {
        bootstrap::initialize_model(&engine, &corpus, snapshot_path.as_deref())
    })
    .await
    .context("model initialization task failed")?
    .context("could not initialize model")?;
    tracing::info!("Model ready ({:?})", source);

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("could not bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub coordinator: Arc<FeedbackCoordinator>,
    pub store: Arc<store::MemoryLogStore>,
    /// Synthetic normal traffic, always part of the training pool
    pub corpus: Arc<Vec<FeatureVector>>,
    pub config: config::Config,
}

impl AppState {
    pub fn new(config: config::Config) -> anyhow::Result<Self> {
        let whitelist = Arc::new(Whitelist::new());
        let engine = Engine::new(config.forest_config(), config.retrain_config())
            .context("invalid model configuration")?
            .with_whitelist(Arc::clone(&whitelist));

        let store = Arc::new(store::MemoryLogStore::new(config.store_capacity));
        let coordinator =
            FeedbackCoordinator::new(store.clone(), whitelist, config.coordinator_config());
        let corpus = bootstrap::synthetic_corpus(config.bootstrap_samples, config.seed)
            .context("could not build bootstrap corpus")?;

        Ok(Self {
            engine: Arc::new(engine),
            coordinator: Arc::new(coordinator),
            store,
            corpus: Arc::new(corpus),
            config,
        })
    }

    /// Bootstrap corpus plus every stored scored log
    pub fn training_samples(&self) -> Vec<FeatureVector> {
        let mut samples = self.corpus.as_ref().clone();
        samples.extend(self.store.training_samples());
        samples
    }
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health::index))
        .route("/health", get(handlers::health::check))
        .route("/predict", post(handlers::predict::predict))
        .route("/predict/batch", post(handlers::predict::predict_batch))
        .route("/feedback", post(handlers::feedback::submit))
        .route("/feedback/stats", get(handlers::feedback::stats))
        .route("/whitelist", get(handlers::whitelist::list).post(handlers::whitelist::update))
        .route("/model/info", get(handlers::model::info))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
