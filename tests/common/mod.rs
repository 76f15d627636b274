// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use peach_fc::config::Config;
use peach_fc::db::{DataStore, MemoryDb};
use peach_fc::error::ClubError;
use peach_fc::models::{AttendanceRecord, Event, EventKind, Notice, Session};
use peach_fc::services::MockIdentity;
use peach_fc::Club;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Secret the mock backend signs and verifies access tokens with.
pub const JWT_SECRET: &[u8] = b"mock-backend-jwt-secret-32-bytes!";

/// The configured team.
#[allow(dead_code)]
pub fn team_id() -> Uuid {
    Uuid::from_u128(0x6f1c_2d3e_0000_4000_8000_0000_0000_0001)
}

/// Test config pointing at the fixed team.
#[allow(dead_code)]
pub fn test_config() -> Config {
    Config {
        team_id: team_id(),
        session_path: temp_session_path(),
        ..Config::default()
    }
}

/// A session file path no other test uses.
#[allow(dead_code)]
pub fn temp_session_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("peach-fc-test-{}", Uuid::new_v4()))
        .join("session.json")
}

/// Mint a provider-style access token.
#[allow(dead_code)]
pub fn mint_token(user_id: Uuid, email: &str, ttl: Duration) -> String {
    let claims = serde_json::json!({
        "sub": user_id.to_string(),
        "email": email,
        "exp": (Utc::now() + ttl).timestamp(),
        "aud": "authenticated",
        "role": "authenticated",
    });
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET),
    )
    .expect("token should encode")
}

/// A live session for `user_id`.
#[allow(dead_code)]
pub fn session_for(user_id: Uuid) -> Session {
    session_with_ttl(user_id, Duration::hours(1))
}

#[allow(dead_code)]
pub fn session_with_ttl(user_id: Uuid, ttl: Duration) -> Session {
    let token = mint_token(user_id, &format!("{}@peach.fc", user_id.simple()), ttl);
    Session::from_tokens(&token, &format!("refresh-{}", Uuid::new_v4())).expect("valid token")
}

/// An event of the configured team starting `offset` from now.
#[allow(dead_code)]
pub fn event_starting_in(offset: Duration) -> Event {
    event_at(Utc::now() + offset)
}

#[allow(dead_code)]
pub fn event_at(start: DateTime<Utc>) -> Event {
    Event {
        id: Uuid::new_v4(),
        team_id: team_id(),
        title: "Weekend futsal".to_string(),
        kind: EventKind::Training,
        start_at: start,
        end_at: start + Duration::hours(2),
        place: Some("Riverside pitch".to_string()),
        note: None,
    }
}

#[allow(dead_code)]
pub fn notice_at(content: &str, created_at: DateTime<Utc>) -> Notice {
    Notice {
        id: Uuid::new_v4(),
        team_id: team_id(),
        content: content.to_string(),
        created_at,
    }
}

/// Club over an in-memory store with a mock identity provider.
#[allow(dead_code)]
pub fn test_club(db: Arc<MemoryDb>, identity: Arc<MockIdentity>) -> Club {
    Club::with_backends(test_config(), db, identity)
}

/// Club whose provider restores a live session for `user_id`.
#[allow(dead_code)]
pub async fn signed_in_club(db: Arc<MemoryDb>, user_id: Uuid) -> (Club, Arc<MockIdentity>) {
    let identity = Arc::new(MockIdentity::with_session(session_for(user_id)));
    let club = test_club(db, identity.clone());
    club.sessions.init().await.expect("session should restore");
    (club, identity)
}

/// Club with nobody signed in.
#[allow(dead_code)]
pub async fn anonymous_club(db: Arc<MemoryDb>) -> Club {
    let club = test_club(db, Arc::new(MockIdentity::new()));
    club.sessions.init().await.expect("restore should succeed");
    club
}

// ═══════════════════════════════════════════════════════════════════════════
// MOCK HOSTED BACKEND
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
struct MockState {
    db: Arc<MemoryDb>,
    anon_key: String,
    otp_requests: Arc<Mutex<Vec<(String, String)>>>,
    refresh_tokens: Arc<Mutex<HashMap<String, (Uuid, String)>>>,
    logouts: Arc<Mutex<u32>>,
}

/// Local HTTP server speaking the REST and auth APIs over a `MemoryDb`.
#[allow(dead_code)]
pub struct MockBackend {
    pub config: Config,
    pub db: Arc<MemoryDb>,
    state: MockState,
}

#[allow(dead_code)]
impl MockBackend {
    /// Register a signed-in user and return the session the provider issued.
    pub fn issue_session(&self, user_id: Uuid, ttl: Duration) -> Session {
        let email = format!("{}@peach.fc", user_id.simple());
        let token = mint_token(user_id, &email, ttl);
        let refresh = format!("refresh-{}", Uuid::new_v4());
        self.state
            .refresh_tokens
            .lock()
            .unwrap()
            .insert(refresh.clone(), (user_id, email));
        Session::from_tokens(&token, &refresh).unwrap()
    }

    pub fn otp_requests(&self) -> Vec<(String, String)> {
        self.state.otp_requests.lock().unwrap().clone()
    }

    pub fn logouts(&self) -> u32 {
        *self.state.logouts.lock().unwrap()
    }
}

/// Start a mock backend on an ephemeral port.
#[allow(dead_code)]
pub async fn spawn_mock_backend(db: Arc<MemoryDb>) -> MockBackend {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().unwrap();

    let config = Config {
        supabase_url: format!("http://{}", addr),
        ..test_config()
    };

    let state = MockState {
        db: db.clone(),
        anon_key: config.supabase_anon_key.clone(),
        otp_requests: Arc::new(Mutex::new(Vec::new())),
        refresh_tokens: Arc::new(Mutex::new(HashMap::new())),
        logouts: Arc::new(Mutex::new(0)),
    };

    let app = Router::new()
        .route("/rest/v1/events", get(select_events))
        .route(
            "/rest/v1/event_attendance",
            get(select_attendance).post(insert_attendance),
        )
        .route("/rest/v1/team_notices", get(select_notices))
        .route("/auth/v1/otp", post(otp))
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/logout", post(logout))
        .with_state(state.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock backend");
    });

    MockBackend { config, db, state }
}

type Params = Query<HashMap<String, String>>;

fn gateway_error(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "code": code,
            "details": null,
            "hint": null,
            "message": message,
        })),
    )
        .into_response()
}

fn store_error(err: ClubError) -> Response {
    match err {
        ClubError::PolicyDenied(msg) => gateway_error(StatusCode::FORBIDDEN, "42501", &msg),
        ClubError::Conflict(msg) => gateway_error(StatusCode::CONFLICT, "23503", &msg),
        ClubError::NotFound(msg) => gateway_error(StatusCode::NOT_FOUND, "PGRST205", &msg),
        other => gateway_error(StatusCode::SERVICE_UNAVAILABLE, "PGRST000", &other.to_string()),
    }
}

/// Resolve the caller: `Ok(None)` for the anon key, a session for a valid JWT.
fn actor(state: &MockState, headers: &HeaderMap) -> Result<Option<Session>, Response> {
    if headers.get("apikey").and_then(|v| v.to_str().ok()) != Some(state.anon_key.as_str()) {
        return Err(gateway_error(StatusCode::UNAUTHORIZED, "PGRST301", "No API key found in request"));
    }
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| gateway_error(StatusCode::UNAUTHORIZED, "PGRST301", "missing bearer"))?;

    if token == state.anon_key {
        return Ok(None);
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;
    validation.leeway = 0;
    decode::<serde_json::Value>(token, &DecodingKey::from_secret(JWT_SECRET), &validation)
        .map_err(|e| gateway_error(StatusCode::UNAUTHORIZED, "PGRST301", &e.to_string()))?;

    Session::from_tokens(token, "")
        .map(Some)
        .map_err(|e| gateway_error(StatusCode::UNAUTHORIZED, "PGRST301", &e.to_string()))
}

fn eq_uuid(params: &HashMap<String, String>, key: &str) -> Result<Uuid, Response> {
    params
        .get(key)
        .and_then(|v| v.strip_prefix("eq."))
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| gateway_error(StatusCode::BAD_REQUEST, "PGRST100", &format!("bad filter on {}", key)))
}

fn limit(params: &HashMap<String, String>) -> Result<u32, Response> {
    params
        .get("limit")
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| gateway_error(StatusCode::BAD_REQUEST, "PGRST100", "limit required"))
}

fn require_order(params: &HashMap<String, String>, expected: &str) -> Result<(), Response> {
    if params.get("order").map(String::as_str) != Some(expected) {
        return Err(gateway_error(StatusCode::BAD_REQUEST, "PGRST100", "unexpected order"));
    }
    Ok(())
}

async fn select_events(State(state): State<MockState>, headers: HeaderMap, Query(params): Params) -> Response {
    let actor = match actor(&state, &headers) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match query_events(&state, actor.as_ref(), &params).await {
        Ok(rows) => Json(rows).into_response(),
        Err(resp) => resp,
    }
}

async fn query_events(
    state: &MockState,
    actor: Option<&Session>,
    params: &HashMap<String, String>,
) -> Result<Vec<Event>, Response> {
    if params.contains_key("id") {
        let id = eq_uuid(params, "id")?;
        let event = state.db.get_event(actor, id).await.map_err(store_error)?;
        return Ok(event.into_iter().collect());
    }

    let team = eq_uuid(params, "team_id")?;
    require_order(params, "start_at.asc")?;
    let limit = limit(params)?;

    match params.get("start_at").and_then(|v| v.strip_prefix("gt.")) {
        Some(after) => {
            let after = DateTime::parse_from_rfc3339(after)
                .map_err(|e| gateway_error(StatusCode::BAD_REQUEST, "22007", &e.to_string()))?
                .with_timezone(&Utc);
            if limit != 1 {
                return Err(gateway_error(StatusCode::BAD_REQUEST, "PGRST100", "next event expects limit=1"));
            }
            let next = state.db.next_event(actor, team, after).await.map_err(store_error)?;
            Ok(next.into_iter().collect())
        }
        None => state.db.list_events(actor, team, limit).await.map_err(store_error),
    }
}

async fn select_attendance(State(state): State<MockState>, headers: HeaderMap, Query(params): Params) -> Response {
    let actor = match actor(&state, &headers) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let (event_id, user_id) = match (eq_uuid(&params, "event_id"), eq_uuid(&params, "user_id")) {
        (Ok(e), Ok(u)) => (e, u),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };

    // Row-level security hides rows instead of failing the select.
    let Some(session) = actor else {
        return Json(Vec::<AttendanceRecord>::new()).into_response();
    };
    match state.db.get_attendance(&session, event_id, user_id).await {
        Ok(row) => Json(row.into_iter().collect::<Vec<_>>()).into_response(),
        Err(ClubError::PolicyDenied(_)) => Json(Vec::<AttendanceRecord>::new()).into_response(),
        Err(e) => store_error(e),
    }
}

async fn insert_attendance(
    State(state): State<MockState>,
    headers: HeaderMap,
    Query(params): Params,
    Json(rows): Json<Vec<AttendanceRecord>>,
) -> Response {
    let actor = match actor(&state, &headers) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let prefer = headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let is_upsert = params.get("on_conflict").map(String::as_str) == Some("event_id,user_id")
        && prefer.contains("resolution=merge-duplicates");

    let mut stored = Vec::new();
    for row in rows {
        if !is_upsert && state.db.stored_attendance(row.event_id, row.user_id).is_some() {
            return gateway_error(
                StatusCode::CONFLICT,
                "23505",
                "duplicate key value violates unique constraint \"event_attendance_pkey\"",
            );
        }
        match state.db.upsert_attendance(actor.as_ref(), &row).await {
            Ok(row) => stored.push(row),
            Err(e) => return store_error(e),
        }
    }

    if prefer.contains("return=representation") {
        (StatusCode::CREATED, Json(stored)).into_response()
    } else {
        StatusCode::CREATED.into_response()
    }
}

async fn select_notices(State(state): State<MockState>, headers: HeaderMap, Query(params): Params) -> Response {
    let actor = match actor(&state, &headers) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let team = match eq_uuid(&params, "team_id") {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_order(&params, "created_at.desc") {
        return resp;
    }
    match state.db.latest_notice(actor.as_ref(), team).await {
        Ok(notice) => Json(notice.into_iter().collect::<Vec<_>>()).into_response(),
        Err(e) => store_error(e),
    }
}

#[derive(Deserialize)]
struct OtpBody {
    email: String,
}

async fn otp(State(state): State<MockState>, Query(params): Params, Json(body): Json<OtpBody>) -> Response {
    if body.email.starts_with("ratelimited@") {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({"code": 429, "msg": "Email rate limit exceeded"})),
        )
            .into_response();
    }
    let redirect_to = params.get("redirect_to").cloned().unwrap_or_default();
    state.otp_requests.lock().unwrap().push((body.email, redirect_to));
    Json(serde_json::json!({})).into_response()
}

#[derive(Deserialize)]
struct RefreshBody {
    refresh_token: String,
}

async fn token(State(state): State<MockState>, Query(params): Params, Json(body): Json<RefreshBody>) -> Response {
    if params.get("grant_type").map(String::as_str) != Some("refresh_token") {
        return (StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": "unsupported_grant_type"}))).into_response();
    }

    let mut tokens = state.refresh_tokens.lock().unwrap();
    let Some((user_id, email)) = tokens.remove(&body.refresh_token) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Invalid Refresh Token: Refresh Token Not Found"
            })),
        )
            .into_response();
    };

    let access_token = mint_token(user_id, &email, Duration::hours(1));
    let refresh_token = format!("refresh-{}", Uuid::new_v4());
    tokens.insert(refresh_token.clone(), (user_id, email.clone()));

    Json(serde_json::json!({
        "access_token": access_token,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": refresh_token,
        "user": { "id": user_id, "email": email },
    }))
    .into_response()
}

async fn logout(State(state): State<MockState>, headers: HeaderMap) -> Response {
    match actor(&state, &headers) {
        Ok(Some(_)) => {
            *state.logouts.lock().unwrap() += 1;
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(None) => gateway_error(StatusCode::UNAUTHORIZED, "401", "not signed in"),
        Err(resp) => resp,
    }
}
