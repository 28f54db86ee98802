//! HTTP endpoint pair over a single captured storefront file.
//!
//! - `GET /check-update` reports whether the file changed since the last call
//! - `GET /extract-images` runs the storefront extractor on the current body
//!
//! The only shared state is the [`UpdateTracker`]; it starts empty, so the
//! first check after a restart always reports an update.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, SecondsFormat, Utc};
use log::{error, info, warn};
use serde_json::json;

use crate::error::{Error, Result};
use crate::extract::{
    extract_storefront, parse_document, ExtractContext, UNKNOWN_STORE_ID, UNKNOWN_STORE_NAME,
};

/// Remembers the newest modification time reported so far
#[derive(Debug, Default)]
pub struct UpdateTracker {
    last_modified: Mutex<Option<SystemTime>>,
}

impl UpdateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `modified`; true when it is newer than anything seen before
    pub fn observe(&self, modified: SystemTime) -> bool {
        let mut last = match self.last_modified.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let updated = last.map_or(true, |seen| modified > seen);
        if updated {
            *last = Some(modified);
        }
        updated
    }
}

/// State shared by the handlers
#[derive(Debug)]
pub struct ServerState {
    pub json_path: PathBuf,
    pub cdn_host: String,
    pub tracker: UpdateTracker,
}

impl ServerState {
    pub fn new(json_path: impl Into<PathBuf>, cdn_host: impl Into<String>) -> Self {
        Self {
            json_path: json_path.into(),
            cdn_host: cdn_host.into(),
            tracker: UpdateTracker::new(),
        }
    }
}

/// Build the router for the endpoint pair
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/check-update", get(check_update))
        .route("/extract-images", get(extract_images))
        .with_state(state)
}

/// Bind `port` on localhost and serve until Ctrl-C
pub async fn serve(state: Arc<ServerState>, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        "Serving {} on http://{}",
        state.json_path.display(),
        addr
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install Ctrl-C handler: {}", e);
    }
}

fn iso_millis(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Millis, true)
}

async fn check_update(State(state): State<Arc<ServerState>>) -> Response {
    let metadata = match tokio::fs::metadata(&state.json_path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Json(json!({ "updated": false, "error": "File not found" })).into_response();
        }
        Err(e) => return check_update_failure(e.into()),
    };

    match metadata.modified() {
        Ok(modified) => {
            let updated = state.tracker.observe(modified);
            Json(json!({ "updated": updated, "lastModified": iso_millis(modified) }))
                .into_response()
        }
        Err(e) => check_update_failure(e.into()),
    }
}

fn check_update_failure(e: Error) -> Response {
    error!("Check update error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "updated": false, "error": e.to_string() })),
    )
        .into_response()
}

async fn extract_images(State(state): State<Arc<ServerState>>) -> Response {
    let content = match tokio::fs::read(&state.json_path).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "success": false, "error": "JSON file not found" })),
            )
                .into_response();
        }
        Err(e) => return extract_failure(e.into()),
    };

    let doc = match parse_document(&content) {
        Ok(doc) => doc,
        Err(e) => return extract_failure(e),
    };

    let ctx = ExtractContext::new(state.cdn_host.clone());
    let mut body = json!({
        "success": true,
        "storeName": UNKNOWN_STORE_NAME,
        "storeId": UNKNOWN_STORE_ID,
    });

    // A payload without `data` still answers with the placeholder names
    if let Some(record) = extract_storefront(&doc, &ctx) {
        body["storeName"] = json!(record.name);
        body["storeId"] = json!(record.id);
        if let Some(url) = record.avatar_url {
            body["avatarUrl"] = json!(url);
        }
        if let Some(url) = record.header_url {
            body["headerUrl"] = json!(url);
        }
        if let Some(urls) = record.poster_urls {
            body["posterUrls"] = json!(urls);
        }
    }

    Json(body).into_response()
}

fn extract_failure(e: Error) -> Response {
    error!("Extract images error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": e.to_string() })),
    )
        .into_response()
}
