//! Dashboard handlers
//!
//! Every handler reads from the shared [`WebContext`]; tmux and HTTP calls run
//! on the blocking pool.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, instrument};

use ccwait_core::daemon::SnapshotReceiver;
use ccwait_core::sessions::scan_sessions;
use ccwait_core::{
    Clock, PaneDetector, Session, SessionBackend, UsageSource, UsageStatus, UsageWindow,
};

use super::dashboard;

/// Everything the handlers need, built once at start-up
pub struct WebContext {
    pub usage: Arc<dyn UsageSource>,
    pub sessions: Arc<dyn SessionBackend>,
    pub detector: PaneDetector,
    pub clock: Arc<dyn Clock>,
    pub capture_lines: usize,
    pub daemon: SnapshotReceiver,
}

/// Shared handler state
pub type SharedContext = Arc<WebContext>;

/// Single usage window as served by `/api/usage`
#[derive(Debug, Serialize)]
pub struct WindowResponse {
    pub utilization: f64,
    pub is_limited: bool,
    pub resets_at: Option<DateTime<Utc>>,
    pub resets_in_seconds: Option<i64>,
}

impl WindowResponse {
    fn from_window(window: &UsageWindow, now: DateTime<Utc>) -> Self {
        Self {
            utilization: window.utilization,
            is_limited: window.is_limited(),
            resets_at: window.resets_at,
            resets_in_seconds: window.resets_in_seconds(now),
        }
    }
}

/// Body of `/api/usage`
#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub five_hour: WindowResponse,
    pub seven_day: WindowResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seven_day_opus: Option<WindowResponse>,
    pub is_limited: bool,
    pub next_reset: Option<DateTime<Utc>>,
}

impl UsageResponse {
    fn from_status(status: &UsageStatus, now: DateTime<Utc>) -> Self {
        Self {
            five_hour: WindowResponse::from_window(&status.five_hour, now),
            seven_day: WindowResponse::from_window(&status.seven_day, now),
            seven_day_opus: status
                .seven_day_opus
                .as_ref()
                .map(|w| WindowResponse::from_window(w, now)),
            is_limited: status.is_limited(),
            next_reset: status.next_reset(),
        }
    }
}

/// One pane in `/api/sessions`
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub pane_id: String,
    pub session_name: String,
    pub command: String,
    pub is_rate_limited: bool,
    pub reset_hint: Option<String>,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            pane_id: session.id,
            session_name: session.display_name,
            command: session.last_known_command,
            is_rate_limited: session.rate_limited,
            reset_hint: session.reset_hint,
        }
    }
}

/// Body of `/api/sessions`
#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub total: usize,
    pub rate_limited: usize,
    pub sessions: Vec<SessionResponse>,
}

/// Body of `/health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub daemon_running: bool,
    pub waiting_for_reset: bool,
}

/// GET / - HTML dashboard
#[instrument(name = "dashboard_index", skip_all)]
pub async fn index(State(ctx): State<SharedContext>) -> Response {
    let worker = Arc::clone(&ctx);
    let loaded = tokio::task::spawn_blocking(move || {
        let usage = worker.usage.fetch().ok();
        let sessions = scan_sessions(&*worker.sessions, &worker.detector, worker.capture_lines);
        (usage, sessions)
    })
    .await;

    match loaded {
        Ok((usage, sessions)) => {
            let page = dashboard::render(
                usage.as_ref(),
                &sessions,
                ctx.clock.now(),
                ctx.clock.local_offset(),
            );
            Html(page.into_string()).into_response()
        }
        Err(e) => json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()).into_response(),
    }
}

/// GET /api/usage - current usage windows
#[instrument(name = "api_usage", skip_all)]
pub async fn get_usage(State(ctx): State<SharedContext>) -> Response {
    let worker = Arc::clone(&ctx);
    let fetched = tokio::task::spawn_blocking(move || worker.usage.fetch()).await;

    match fetched {
        Ok(Ok(status)) => {
            Json(UsageResponse::from_status(&status, ctx.clock.now())).into_response()
        }
        Ok(Err(e)) => {
            debug!("Usage fetch failed: {}", e);
            json_error(StatusCode::SERVICE_UNAVAILABLE, "Could not fetch usage").into_response()
        }
        Err(e) => json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()).into_response(),
    }
}

/// GET /api/sessions - panes running the assistant
#[instrument(name = "api_sessions", skip_all)]
pub async fn get_sessions(State(ctx): State<SharedContext>) -> Response {
    let worker = Arc::clone(&ctx);
    let scanned = tokio::task::spawn_blocking(move || {
        scan_sessions(&*worker.sessions, &worker.detector, worker.capture_lines)
    })
    .await;

    match scanned {
        Ok(sessions) => {
            let rate_limited = sessions.iter().filter(|s| s.rate_limited).count();
            Json(SessionsResponse {
                total: sessions.len(),
                rate_limited,
                sessions: sessions.into_iter().map(SessionResponse::from).collect(),
            })
            .into_response()
        }
        Err(e) => json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()).into_response(),
    }
}

/// GET /api/daemon - latest daemon snapshot
#[instrument(name = "api_daemon", skip_all)]
pub async fn get_daemon(State(ctx): State<SharedContext>) -> Response {
    let snapshot = ctx.daemon.borrow().clone();
    if !snapshot.running {
        return json_error(StatusCode::SERVICE_UNAVAILABLE, "Daemon not running").into_response();
    }
    Json(snapshot).into_response()
}

/// GET /health - liveness plus daemon flags
#[instrument(name = "api_health", skip_all)]
pub async fn health(State(ctx): State<SharedContext>) -> Json<HealthResponse> {
    let snapshot = ctx.daemon.borrow();
    Json(HealthResponse {
        status: "healthy",
        daemon_running: snapshot.running,
        waiting_for_reset: snapshot.waiting,
    })
}

/// Build a JSON error response with properly escaped message
fn json_error(status: StatusCode, message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(serde_json::json!({ "error": message })))
}
