//!
//! arbor annex HTTP server
//! -----------------------
//! This module defines the Axum-based HTTP surface for the annex: account
//! administration gated on the administrative identity, user self-service
//! (info and password change), and the fixed-query publication lookup.
//!
//! Responsibilities:
//! - Basic-credential resolution against the Account Directory.
//! - Password-change enforcement before any other authenticated call.
//! - Admin-gated account create/delete delegating to the `accounts` module.
//! - Publication lookup delegating to the injected query engine.
//! - First-run seeding of the default admin account and demo publications.

use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};

use crate::accounts;
use crate::directory::{AccountDirectory, LocalDirectory};
use crate::error::{AnnexError, AnnexResult, ErrorKind};
use crate::identity::{AdminGate, CallerIdentity};
use crate::lookup::{MemoryGraph, Publication, QueryEngine, QueryError, ResultStream, PUBLICATION_LOOKUP};

const MSG_NO_AUTH_HEADER: &str = "No authentication header supplied.";
const MSG_INVALID_AUTH_HEADER: &str = "Invalid authentication header.";
const MSG_INVALID_CREDENTIALS: &str = "Invalid username or password.";
const MSG_PASSWORD_CHANGE_REQUIRED: &str = "User is required to change their password.";

/// Shared server state injected into all handlers.
///
/// The directory and engine sit behind trait objects so embedding hosts and
/// tests can swap in their own; the bundled `LocalDirectory`/`MemoryGraph`
/// pair is only the standalone default.
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<dyn AccountDirectory>,
    pub engine: Arc<dyn QueryEngine>,
    pub gate: AdminGate,
    /// With authentication off no request ever carries a caller identity, so
    /// the admin-gated routes answer 404 for everyone.
    pub auth_enabled: bool,
}

/// Mount all annex routes over the given state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "arbor annex ok" }))
        .route("/auth/add/{username}", post(add_user))
        .route("/auth/delete/{username}", get(delete_user))
        .route("/user/{username}", get(user_info))
        .route("/user/{username}/password", post(change_password))
        .route("/lookup/publication/doi/{doi}", get(lookup_publication))
        .with_state(state)
}

/// Start the annex bound to the given port, with the bundled directory and
/// engine rooted at `db_root`. Seeds the default admin account and, when no
/// publications file exists, a small demo publication set.
pub async fn run_with_options(
    http_port: u16,
    db_root: &str,
    admin_user: &str,
    auth_enabled: bool,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(db_root)
        .with_context(|| format!("Failed to create or access database root: {}", db_root))?;
    let directory = LocalDirectory::open(db_root)
        .with_context(|| format!("While opening the account directory under: {}", db_root))?;
    if directory.ensure_default_admin(admin_user)? {
        info!(
            "Created default admin account '{}'; a password change is required on first use",
            admin_user
        );
    }
    info!("Account directory holds {} account(s)", directory.len());

    let engine = match load_publications(db_root)? {
        Some(publications) => {
            info!("Loaded {} publication(s) from {}/publications.json", publications.len(), db_root);
            MemoryGraph::new(publications)
        }
        None => {
            let demo = MemoryGraph::demo();
            info!("No publications file found; seeded {} demo publication(s)", demo.len());
            demo
        }
    };

    if !auth_enabled {
        warn!("Authentication is disabled; account administration will answer 404 for every caller");
    }

    let state = AppState {
        directory: Arc::new(directory),
        engine: Arc::new(engine),
        gate: AdminGate::new(admin_user),
        auth_enabled,
    };
    let app = build_router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", http_port).parse()?;
    info!("Starting annex on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn load_publications(db_root: &str) -> anyhow::Result<Option<Vec<Publication>>> {
    let path = std::path::Path::new(db_root).join("publications.json");
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("While reading {}", path.display()))?;
    let publications: Vec<Publication> =
        serde_json::from_str(&raw).with_context(|| format!("While parsing {}", path.display()))?;
    Ok(Some(publications))
}

/// Credentials for a request, honoring the auth switch: with authentication
/// disabled the Authorization header is never examined.
fn request_credentials(state: &AppState, headers: &HeaderMap) -> AnnexResult<Option<(String, String)>> {
    if !state.auth_enabled {
        return Ok(None);
    }
    basic_credentials(headers)
}

/// Extract Basic credentials from the Authorization header, if any. A header
/// that is present but unreadable is an authentication failure, not "no
/// identity".
fn basic_credentials(headers: &HeaderMap) -> AnnexResult<Option<(String, String)>> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let raw = value
        .to_str()
        .map_err(|_| AnnexError::unauthorized(MSG_INVALID_AUTH_HEADER))?;
    let encoded = raw
        .strip_prefix("Basic ")
        .ok_or_else(|| AnnexError::unauthorized(MSG_INVALID_AUTH_HEADER))?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|_| AnnexError::unauthorized(MSG_INVALID_AUTH_HEADER))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|_| AnnexError::unauthorized(MSG_INVALID_AUTH_HEADER))?;
    let Some((name, password)) = decoded.split_once(':') else {
        return Err(AnnexError::unauthorized(MSG_INVALID_AUTH_HEADER));
    };
    Ok(Some((name.to_string(), password.to_string())))
}

/// Resolve the caller identity for a request. With authentication disabled
/// no identity is ever attached; with it enabled, absent or wrong
/// credentials are 401 and a pending password change is 403 unless the
/// route allows it.
fn resolve_caller(
    state: &AppState,
    creds: Option<&(String, String)>,
    allow_pending_change: bool,
) -> AnnexResult<Option<CallerIdentity>> {
    if !state.auth_enabled {
        return Ok(None);
    }
    let Some((name, password)) = creds else {
        return Err(AnnexError::unauthorized(MSG_NO_AUTH_HEADER));
    };
    let record = match state.directory.authenticate(name, password) {
        Ok(Some(record)) => record,
        Ok(None) => return Err(AnnexError::unauthorized(MSG_INVALID_CREDENTIALS)),
        Err(fault) => return Err(trace_fault(AnnexError::internal(fault.to_string()))),
    };
    if record.password_change_required && !allow_pending_change {
        return Err(AnnexError::forbidden(MSG_PASSWORD_CHANGE_REQUIRED));
    }
    Ok(Some(CallerIdentity::new(record.username)))
}

// Surface directory and engine faults in the log before they become a 500.
fn trace_fault(err: AnnexError) -> AnnexError {
    if err.http_status() == StatusCode::INTERNAL_SERVER_ERROR {
        error!("annex fault: {}", err.message());
    }
    err
}

async fn add_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    headers: HeaderMap,
    body: String,
) -> AnnexResult<StatusCode> {
    let creds = request_credentials(&state, &headers)?;
    let caller = resolve_caller(&state, creds.as_ref(), false)?;
    accounts::create_account(&state.gate, state.directory.as_ref(), &username, &body, caller.as_ref())
        .map_err(trace_fault)?;
    Ok(StatusCode::OK)
}

async fn delete_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    headers: HeaderMap,
) -> AnnexResult<StatusCode> {
    let creds = request_credentials(&state, &headers)?;
    let caller = resolve_caller(&state, creds.as_ref(), false)?;
    accounts::delete_account(&state.gate, state.directory.as_ref(), &username, caller.as_ref())
        .map_err(trace_fault)?;
    Ok(StatusCode::OK)
}

/// Accounts are visible only to themselves; everyone else, including the
/// admin, is answered 404.
async fn user_info(
    State(state): State<AppState>,
    Path(username): Path<String>,
    headers: HeaderMap,
) -> AnnexResult<Json<Value>> {
    let creds = request_credentials(&state, &headers)?;
    let caller = resolve_caller(&state, creds.as_ref(), true)?;
    let Some(caller) = caller else {
        return Err(AnnexError::NotFound);
    };
    if caller.name != username {
        return Err(AnnexError::NotFound);
    }
    match state.directory.find_user(&username) {
        Ok(Some(record)) => Ok(Json(json!({
            "username": record.username,
            "password_change_required": record.password_change_required,
        }))),
        Ok(None) => Err(AnnexError::NotFound),
        Err(fault) => Err(trace_fault(AnnexError::internal(fault.to_string()))),
    }
}

/// Self-service password change. The only route a caller with a pending
/// password change may mutate through; clears the flag on success.
async fn change_password(
    State(state): State<AppState>,
    Path(username): Path<String>,
    headers: HeaderMap,
    body: String,
) -> AnnexResult<StatusCode> {
    let creds = request_credentials(&state, &headers)?;
    let caller = resolve_caller(&state, creds.as_ref(), true)?;
    let Some(caller) = caller else {
        return Err(AnnexError::NotFound);
    };
    if caller.name != username {
        return Err(AnnexError::NotFound);
    }
    let payload = accounts::parse_payload(&body)?;
    let password = accounts::required_password(&payload)?;
    if let Some((_, old_password)) = creds.as_ref() {
        if password == old_password.as_str() {
            return Err(AnnexError::unprocessable(
                ErrorKind::Invalid,
                "Old password and new password cannot be the same.",
            ));
        }
    }
    match state.directory.set_password(&username, password) {
        Ok(true) => Ok(StatusCode::OK),
        Ok(false) => Err(AnnexError::NotFound),
        Err(fault) => Err(trace_fault(AnnexError::internal(fault.to_string()))),
    }
}

/// Fixed-query DOI lookup. The DOI arrives percent-decoded by routing and is
/// decoded once more, so double-encoded identifiers from legacy clients
/// still resolve.
async fn lookup_publication(
    State(state): State<AppState>,
    Path(doi): Path<String>,
    headers: HeaderMap,
) -> AnnexResult<Json<Value>> {
    let creds = request_credentials(&state, &headers)?;
    let _caller = resolve_caller(&state, creds.as_ref(), false)?;

    let doi = urlencoding::decode(&doi)
        .map_err(|e| AnnexError::bad_request(ErrorKind::InvalidFormat, e.to_string()))?
        .into_owned();
    if doi.contains('\'') {
        return Err(AnnexError::bad_request(ErrorKind::InvalidFormat, "DOI contains invalid symbols"));
    }

    let mut params = Map::new();
    params.insert("doi".to_string(), json!(doi));
    let engine = state.engine.clone();
    // Contain engine panics to this request; the server task must survive.
    let outcome = std::panic::catch_unwind(AssertUnwindSafe(move || -> Result<Value, QueryError> {
        let ResultStream { columns, rows } = engine.execute(PUBLICATION_LOOKUP, &params)?;
        let mut data: Vec<Value> = Vec::new();
        for row in rows {
            data.push(Value::Array(row?));
        }
        Ok(json!({ "columns": columns, "data": data }))
    }));
    match outcome {
        Ok(Ok(body)) => Ok(Json(body)),
        Ok(Err(e)) => Err(AnnexError::bad_request(ErrorKind::Invalid, e.to_string())),
        Err(panic_payload) => {
            let msg = if let Some(s) = panic_payload.downcast_ref::<&str>() { *s }
                      else if let Some(s) = panic_payload.downcast_ref::<String>() { s.as_str() }
                      else { "panic" };
            error!(target: "panic", "lookup handler panic: {}", msg);
            Err(AnnexError::internal("internal server error"))
        }
    }
}
