//! REST API endpoint handlers.
//!
//! Every handler locks the shared engine, runs one operation to completion
//! and releases the lock before responding. Engine errors map to HTTP
//! status codes through [`ApiError`].

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use tab_wrangler::archive::{ArchiveQuery, ClosedTabEntry, ClosedTabGroup, UnknownBucket};
use tab_wrangler::eviction::TickReport;
use tab_wrangler::logging::{LogBuffer, LogLine};
use tab_wrangler::runtime::{SharedWrangler, lock};
use tab_wrangler::settings::SettingKey;
use tab_wrangler::{HostEvent, Settings, TabId, TimeBucket, WrangleError};

use crate::snapshot::WranglerSnapshot;

/// Shared application state passed to all handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub wrangler: SharedWrangler,
    pub log_buffer: Option<LogBuffer>,
}

// ── Errors ───────────────────────────────────────────────────────────

/// An error response: a status code and a `{"error": "..."}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<WrangleError> for ApiError {
    fn from(err: WrangleError) -> Self {
        let status = match &err {
            WrangleError::UnknownTab(_) | WrangleError::NotFound(_) => StatusCode::NOT_FOUND,
            WrangleError::InvalidPattern(_)
            | WrangleError::InvalidSetting { .. }
            | WrangleError::UnknownSetting(_) => StatusCode::BAD_REQUEST,
            WrangleError::HostSignalFailure { .. }
            | WrangleError::Storage { .. }
            | WrangleError::Serialization { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<UnknownBucket> for ApiError {
    fn from(err: UnknownBucket) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn parse_window(window: Option<&str>) -> Result<Option<TimeBucket>, UnknownBucket> {
    match window.map(str::trim) {
        None | Some("") => Ok(None),
        Some(name) => name.parse().map(Some),
    }
}

// ── State and logs ───────────────────────────────────────────────────

/// GET /api/state — Full engine snapshot.
pub async fn get_state(State(app): State<AppState>) -> Json<WranglerSnapshot> {
    let snapshot = WranglerSnapshot::from_wrangler(&lock(&app.wrangler));
    Json(snapshot)
}

#[derive(Debug, Deserialize)]
pub struct LogsParams {
    #[serde(default = "default_log_limit")]
    pub limit: usize,
}

fn default_log_limit() -> usize {
    100
}

/// GET /api/logs?limit=N — Most recent captured log lines, oldest first.
pub async fn get_logs(
    State(app): State<AppState>,
    Query(params): Query<LogsParams>,
) -> Json<Vec<LogLine>> {
    let lines = app
        .log_buffer
        .as_ref()
        .map(|buf| buf.recent(params.limit))
        .unwrap_or_default();
    Json(lines)
}

/// POST /api/tick — Run one eviction pass now.
pub async fn post_tick(State(app): State<AppState>) -> Json<TickReport> {
    Json(lock(&app.wrangler).tick())
}

// ── Open tabs ────────────────────────────────────────────────────────

/// GET /api/tabs/{id}/remaining — Milliseconds until eviction.
pub async fn get_remaining(State(app): State<AppState>, Path(id): Path<i64>) -> ApiResult<Value> {
    let id = TabId(id);
    let remaining = lock(&app.wrangler).time_remaining(id)?;
    Ok(Json(json!({ "id": id, "remaining_ms": remaining })))
}

/// GET /api/tabs/{id}/exemption — Why a tab is protected, if it is.
pub async fn get_exemption(State(app): State<AppState>, Path(id): Path<i64>) -> ApiResult<Value> {
    let id = TabId(id);
    let reason = lock(&app.wrangler).exemption(id)?;
    Ok(Json(json!({
        "id": id,
        "exempt": reason.is_some(),
        "label": reason.as_ref().map(|r| r.label()),
        "reason": reason,
    })))
}

/// POST /api/tabs/{id}/lock — Protect a tab from eviction.
pub async fn post_lock(State(app): State<AppState>, Path(id): Path<i64>) -> ApiResult<Value> {
    let changed = lock(&app.wrangler).lock(TabId(id))?;
    Ok(Json(json!({ "locked": true, "changed": changed })))
}

/// DELETE /api/tabs/{id}/lock — Remove the protection again.
pub async fn delete_lock(State(app): State<AppState>, Path(id): Path<i64>) -> ApiResult<Value> {
    let changed = lock(&app.wrangler).unlock(TabId(id))?;
    Ok(Json(json!({ "locked": false, "changed": changed })))
}

/// POST /api/tabs/{id}/wrangle — Close and archive a tab right away.
pub async fn post_wrangle(
    State(app): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<ClosedTabEntry> {
    let entry = lock(&app.wrangler).wrangle_now(TabId(id))?;
    Ok(Json(entry))
}

// ── Closed-tab archive ───────────────────────────────────────────────

/// Query string for GET /api/closed.
#[derive(Debug, Default, Deserialize)]
pub struct ClosedParams {
    #[serde(default)]
    pub keyword: String,
    /// Bucket label ("last hour") or snake name ("last_hour").
    pub window: Option<String>,
}

/// GET /api/closed?keyword=&window= — Matching entries grouped by bucket.
pub async fn get_closed(
    State(app): State<AppState>,
    Query(params): Query<ClosedParams>,
) -> ApiResult<Vec<ClosedTabGroup>> {
    let query = ArchiveQuery {
        keyword: params.keyword,
        window: parse_window(params.window.as_deref())?,
    };
    let groups = lock(&app.wrangler).closed_groups(&query);
    Ok(Json(groups))
}

/// GET /api/closed/count — Number of archived entries.
pub async fn get_closed_count(State(app): State<AppState>) -> Json<Value> {
    let count = lock(&app.wrangler).archive().len();
    Json(json!({ "count": count }))
}

/// POST /api/closed/{id}/restore — Reopen an archived tab.
pub async fn post_restore(
    State(app): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<ClosedTabEntry> {
    let entry = lock(&app.wrangler).restore(TabId(id))?;
    Ok(Json(entry))
}

/// DELETE /api/closed/{id} — Discard an archived entry. Idempotent.
pub async fn delete_closed(State(app): State<AppState>, Path(id): Path<i64>) -> StatusCode {
    lock(&app.wrangler).remove_closed(TabId(id));
    StatusCode::NO_CONTENT
}

/// Request body for POST /api/closed/restore_all.
#[derive(Debug, Deserialize)]
pub struct RestoreAllRequest {
    pub window: String,
    #[serde(default)]
    pub keyword: String,
}

/// POST /api/closed/restore_all — Reopen everything in one time bucket.
pub async fn post_restore_all(
    State(app): State<AppState>,
    Json(body): Json<RestoreAllRequest>,
) -> ApiResult<Vec<ClosedTabEntry>> {
    let bucket: TimeBucket = body.window.trim().parse()?;
    let restored = lock(&app.wrangler).restore_all(bucket, &body.keyword);
    Ok(Json(restored))
}

/// DELETE /api/closed — Empty the archive.
pub async fn delete_all_closed(State(app): State<AppState>) -> Json<Value> {
    let cleared = lock(&app.wrangler).clear_archive();
    Json(json!({ "cleared": cleared }))
}

// ── Settings ─────────────────────────────────────────────────────────

/// GET /api/settings — Current configuration.
pub async fn get_settings(State(app): State<AppState>) -> Json<Settings> {
    Json(lock(&app.wrangler).settings())
}

/// PUT /api/settings/{key} — Replace one setting; the body is the raw value.
///
/// Returns 204 on success, 400 for an unknown key or invalid value.
pub async fn put_setting(
    State(app): State<AppState>,
    Path(key): Path<String>,
    Json(value): Json<Value>,
) -> Result<StatusCode, ApiError> {
    let key: SettingKey = key.parse()?;
    lock(&app.wrangler).update_setting(key, value)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Request body for the allow-list endpoints.
#[derive(Debug, Deserialize)]
pub struct PatternRequest {
    pub pattern: String,
}

/// POST /api/allow_list — Add a URL pattern.
pub async fn post_allow_pattern(
    State(app): State<AppState>,
    Json(body): Json<PatternRequest>,
) -> ApiResult<Value> {
    let added = lock(&app.wrangler).add_allow_pattern(&body.pattern)?;
    Ok(Json(json!({ "added": added })))
}

/// DELETE /api/allow_list — Remove a URL pattern.
pub async fn delete_allow_pattern(
    State(app): State<AppState>,
    Json(body): Json<PatternRequest>,
) -> ApiResult<Value> {
    let removed = lock(&app.wrangler).remove_allow_pattern(&body.pattern)?;
    Ok(Json(json!({ "removed": removed })))
}

// ── Host bridge ──────────────────────────────────────────────────────

/// POST /api/host/event — Deliver a tab notification from the host.
pub async fn post_host_event(
    State(app): State<AppState>,
    Json(event): Json<HostEvent>,
) -> StatusCode {
    lock(&app.wrangler).handle_host_event(event);
    StatusCode::NO_CONTENT
}
