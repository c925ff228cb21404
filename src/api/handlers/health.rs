//! Health endpoint: reports the service identity and store liveness.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use super::auth::AccountStore;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    name: String,
    version: String,
    store: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Account store is reachable", body = Health),
        (status = 503, description = "Account store is unhealthy", body = Health)
    ),
    tag = "health"
)]
pub async fn health(store: Extension<Arc<dyn AccountStore>>) -> impl IntoResponse {
    let store_status = match store.ping().await {
        Ok(()) => Ok(()),
        Err(err) => {
            error!("health check failed to reach account store: {err}");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    };

    let body = Json(Health {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: if store_status.is_ok() { "up" } else { "down" }.to_string(),
    });

    let mut headers = HeaderMap::new();
    if let Ok(value) =
        format!("{}:{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")).parse()
    {
        headers.insert("X-App", value);
    }

    match store_status {
        Ok(()) => (StatusCode::OK, headers, body),
        Err(status) => (status, headers, body),
    }
}
