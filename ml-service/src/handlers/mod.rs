//! HTTP handlers

pub mod feedback;
pub mod health;
pub mod model;
pub mod predict;
pub mod whitelist;

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::{AppError, AppState};

/// JSON body that has passed `validator` checks
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Write the active model and whitelist to disk, off the async workers.
/// Failures are logged; the in-memory state stays authoritative.
pub(crate) async fn persist_snapshot(state: &AppState) {
    let Some(path) = state.config.snapshot_path.clone() else {
        return;
    };

    let engine = state.engine.clone();
    let result = tokio::task::spawn_blocking(move || engine.save_snapshot(&path)).await;

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("Snapshot not written: {}", e),
        Err(e) => tracing::warn!("Snapshot task failed: {}", e),
    }
}
