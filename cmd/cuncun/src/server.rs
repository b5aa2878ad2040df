//! Webhook server.
//!
//! - POST /       - Feishu event callback
//! - GET  /health - component status, 503 when anything is down

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Local;
use cuncun_feishu::{Callback, Event, parse_callback, verify_signature};
use serde::Serialize;
use serde_json::json;
use tokio::sync::Semaphore;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::bot::Bot;
use crate::dedup::EventDedup;

#[derive(Clone)]
pub struct AppState {
    pub bot: Arc<Bot>,
    pub dedup: Arc<EventDedup>,
    /// Bounds how many conversations run at once.
    pub pool: Arc<Semaphore>,
    pub encrypt_key: Option<String>,
    /// Expected `header.token` on events. `None` skips the check.
    pub verify_token: Option<String>,
}

impl AppState {
    pub fn new(bot: Bot, pool_size: usize, encrypt_key: Option<String>) -> Self {
        Self {
            bot: Arc::new(bot),
            dedup: Arc::new(EventDedup::default()),
            pool: Arc::new(Semaphore::new(pool_size.max(1))),
            encrypt_key,
            verify_token: None,
        }
    }

    pub fn with_verify_token(mut self, token: Option<String>) -> Self {
        self.verify_token = token.filter(|t| !t.is_empty());
        self
    }

    /// Queue a conversation. It starts once a pool permit is free.
    fn dispatch(&self, event: Event) {
        let bot = self.bot.clone();
        let pool = self.pool.clone();
        tokio::spawn(async move {
            let Ok(_permit) = pool.acquire_owned().await else {
                return;
            };
            bot.handle_event(event).await;
        });
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(webhook))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on `0.0.0.0:port` until Ctrl-C.
pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "server: listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("server: shutting down");
        })
        .await?;
    Ok(())
}

fn reject(status: StatusCode, msg: &str) -> Response {
    (
        status,
        Json(json!({ "code": status.as_u16(), "msg": msg })),
    )
        .into_response()
}

async fn webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Err(e) = verify_signature(&headers, &body, state.encrypt_key.as_deref()) {
        warn!(error = %e, "server: signature rejected");
        return reject(StatusCode::FORBIDDEN, "invalid signature");
    }

    let callback = match parse_callback(&body) {
        Ok(cb) => cb,
        Err(e) => {
            warn!(error = %e, "server: malformed callback");
            return reject(StatusCode::BAD_REQUEST, "malformed callback");
        }
    };

    match callback {
        Callback::Encrypted => {
            warn!("server: encrypted callback rejected");
            reject(StatusCode::BAD_REQUEST, "encrypted payloads are not supported")
        }
        Callback::Challenge(challenge) => Json(json!({ "challenge": challenge })).into_response(),
        Callback::Event(event) => {
            if let Some(expected) = state.verify_token.as_deref()
                && event.token != expected
            {
                warn!(event_id = %event.event_id, "server: event token rejected");
                return reject(StatusCode::FORBIDDEN, "invalid token");
            }
            if event.event_id.is_empty() || !state.dedup.first_seen(&event.event_id) {
                debug!(event_id = %event.event_id, "server: duplicate or anonymous event dropped");
                return Json(json!({})).into_response();
            }
            debug!(event_id = %event.event_id, window = state.dedup.len(), "server: event queued");
            state.dispatch(event);
            Json(json!({})).into_response()
        }
    }
}

#[derive(Debug, Serialize)]
struct Components {
    ai: bool,
    voice_db: bool,
    feishu_api: bool,
}

#[derive(Debug, Serialize)]
struct HealthReport {
    status: &'static str,
    timestamp: String,
    components: Components,
}

async fn health(State(state): State<AppState>) -> Response {
    let bot = &state.bot;
    let components = Components {
        ai: bot.chat.is_some(),
        voice_db: bot.matcher.library_size().is_some(),
        feishu_api: bot.messenger.ping().await.is_ok(),
    };
    let healthy = components.ai && components.voice_db && components.feishu_api;
    let report = HealthReport {
        status: if healthy { "healthy" } else { "unhealthy" },
        timestamp: Local::now().to_rfc3339(),
        components,
    };
    info!(
        ai = report.components.ai,
        voice_db = report.components.voice_db,
        feishu_api = report.components.feishu_api,
        "server: health check"
    );

    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(report)).into_response()
}
