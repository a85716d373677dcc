//! HTTP surface.
use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{header, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::{RenderError, ValidationError};
use crate::fetch::{fetch_logo, HttpLogoFetcher, LogoFetcher};
use crate::history::{HistoryEntry, HistoryStore, MemoryHistory};
use crate::logo;
use crate::pipeline::{render_png, Limits};
use crate::request::{RenderRequest, RenderRequestBody};

/// Shared handler state. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub history: Arc<dyn HistoryStore>,
    /// Default and maximum `limit` for the history endpoint.
    pub history_limit: usize,
    pub fetcher: Arc<dyn LogoFetcher>,
    pub limits: Limits,
    pub logo_timeout: Duration,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let fetcher = HttpLogoFetcher::new(config.logo_timeout(), config.logo_max_bytes)?;
        let history = MemoryHistory::new(config.history_capacity);
        Ok(Self {
            history_limit: history.capacity(),
            history: Arc::new(history),
            fetcher: Arc::new(fetcher),
            limits: config.limits(),
            logo_timeout: config.logo_timeout(),
        })
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/qrcode.png", post(render_qrcode))
        .route("/api/history", get(list_history))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn render_qrcode(
    State(state): State<AppState>,
    body: Result<Json<RenderRequestBody>, JsonRejection>,
) -> Result<Response, RenderError> {
    let Json(body) = body.map_err(|rejection| ValidationError::Malformed(rejection.body_text()))?;
    let req = RenderRequest::try_from(body)?;

    let logo = match req.logo_url.as_deref() {
        Some(url) => {
            // Checked before fetching: an oversized logo can never be placed
            logo::check_footprint(req.error_correction, req.logo_size)?;
            fetch_logo(state.fetcher.as_ref(), url, state.logo_timeout).await
        }
        None => None,
    };

    let limits = state.limits;
    let job = req.clone();
    let png = tokio::task::spawn_blocking(move || render_png(&job, logo.as_ref(), &limits))
        .await
        .map_err(|err| RenderError::Internal(err.to_string()))??;

    info!(
        content_len = req.content.len(),
        level = %req.error_correction,
        rounded = req.rounded,
        logo = req.logo_url.is_some(),
        bytes = png.len(),
        "rendered qr code"
    );

    let history = Arc::clone(&state.history);
    tokio::spawn(async move { history.record(req) });

    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        png,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn list_history(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<Vec<HistoryEntry>>, RenderError> {
    let Query(query) = query.map_err(|rejection| ValidationError::Malformed(rejection.body_text()))?;
    let limit = query.limit.map_or(state.history_limit, |limit| limit.min(state.history_limit));
    Ok(Json(state.history.list(limit)))
}

async fn healthz() -> &'static str {
    "ok"
}
