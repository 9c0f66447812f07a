//! In-process stand-in for the Weave backend, bound on an ephemeral port.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::{Multipart, Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use weave_client::{config::Config, AppState};
use weave_core::{MemoryKeyValueStore, TokenStore};

pub const PASSWORD: &str = "x";
pub const LOGIN_TOKEN: &str = "t1";
pub const SIGNUP_TOKEN: &str = "t-signup";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UploadSeen {
    pub file_name: Option<String>,
    pub file_len: usize,
    pub fields: Vec<(String, String)>,
}

pub struct MockState {
    pub requests: Mutex<Vec<Recorded>>,
    pub groups: Mutex<Vec<Value>>,
    pub uploads: Mutex<Vec<UploadSeen>>,
    pub fail_logout: AtomicBool,
    pub fail_group_list: AtomicBool,
    pub reject_me: AtomicBool,
    pub health_delay_ms: AtomicU64,
    pub group_list_delay_ms: AtomicU64,
    pub next_group_id: AtomicI64,
    pub status_polls: AtomicUsize,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            groups: Mutex::new(vec![group_json(1, "Family"), group_json(2, "Climbing")]),
            uploads: Mutex::new(Vec::new()),
            fail_logout: AtomicBool::new(false),
            fail_group_list: AtomicBool::new(false),
            reject_me: AtomicBool::new(false),
            health_delay_ms: AtomicU64::new(0),
            group_list_delay_ms: AtomicU64::new(0),
            next_group_id: AtomicI64::new(10),
            status_polls: AtomicUsize::new(0),
        }
    }
}

impl MockState {
    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn last(&self, method: &str, path: &str) -> Option<Recorded> {
        self.requests
            .lock()
            .iter()
            .rev()
            .find(|r| r.method == method && r.path == path)
            .cloned()
    }

    pub fn server_group_ids(&self) -> Vec<i64> {
        self.groups
            .lock()
            .iter()
            .filter_map(|g| g["id"].as_i64())
            .collect()
    }
}

pub fn user_json(id: i64, email: &str, username: &str) -> Value {
    json!({
        "id": id,
        "email": email,
        "username": username,
        "created_at": "2024-03-01T12:00:00",
        "is_active": true
    })
}

pub fn group_json(id: i64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": null,
        "created_by": 1,
        "invite_code": format!("CODE{}", id),
        "is_active": true,
        "created_at": "2024-03-01T12:00:00",
        "members": [{
            "id": id * 100,
            "user_id": 1,
            "group_id": id,
            "role": "owner",
            "joined_at": "2024-03-01T12:00:00"
        }]
    })
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

fn authorized(req_auth: Option<&str>) -> bool {
    matches!(req_auth, Some(v) if v == format!("Bearer {}", LOGIN_TOKEN) || v == format!("Bearer {}", SIGNUP_TOKEN))
}

//=========================================================================================
// Handlers
//=========================================================================================

async fn record(State(state): State<Arc<MockState>>, req: Request, next: Next) -> Response {
    let recorded = {
        let header_str = |name: header::HeaderName| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Recorded {
            method: req.method().to_string(),
            path: req.uri().path().to_string(),
            query: req.uri().query().map(str::to_string),
            authorization: header_str(header::AUTHORIZATION),
            content_type: header_str(header::CONTENT_TYPE),
        }
    };
    state.requests.lock().push(recorded);
    next.run(req).await
}

async fn health(State(state): State<Arc<MockState>>) -> Json<Value> {
    let delay = state.health_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    Json(json!({ "status": "healthy" }))
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] != PASSWORD {
        return detail(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }
    let email = body["email"].as_str().unwrap_or_default();
    Json(json!({
        "access_token": LOGIN_TOKEN,
        "token_type": "bearer",
        "user": user_json(1, email, "a")
    }))
    .into_response()
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["username"] == "taken" {
        return detail(StatusCode::BAD_REQUEST, "Username already registered");
    }
    Json(json!({
        "access_token": SIGNUP_TOKEN,
        "token_type": "bearer",
        "user": user_json(2, body["email"].as_str().unwrap_or_default(), body["username"].as_str().unwrap_or_default())
    }))
    .into_response()
}

async fn logout(State(state): State<Arc<MockState>>) -> Response {
    if state.fail_logout.load(Ordering::SeqCst) {
        return detail(StatusCode::INTERNAL_SERVER_ERROR, "logout exploded");
    }
    Json(json!({ "message": "Logged out" })).into_response()
}

async fn me(State(state): State<Arc<MockState>>, headers: axum::http::HeaderMap) -> Response {
    let auth = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());
    if state.reject_me.load(Ordering::SeqCst) || !authorized(auth) {
        return detail(StatusCode::UNAUTHORIZED, "Could not validate credentials");
    }
    Json(user_json(1, "a@b.com", "a")).into_response()
}

async fn delete_account(Json(body): Json<Value>) -> Response {
    if body["password"] != PASSWORD {
        return detail(StatusCode::BAD_REQUEST, "Incorrect password");
    }
    Json(json!({ "message": "Account deleted successfully" })).into_response()
}

async fn my_groups(State(state): State<Arc<MockState>>) -> Response {
    let delay = state.group_list_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if state.fail_group_list.load(Ordering::SeqCst) {
        return detail(StatusCode::SERVICE_UNAVAILABLE, "database unavailable");
    }
    Json(Value::Array(state.groups.lock().clone())).into_response()
}

async fn create_group(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    let id = state.next_group_id.fetch_add(1, Ordering::SeqCst);
    let mut group = group_json(id, body["name"].as_str().unwrap_or_default());
    group["description"] = body.get("description").cloned().unwrap_or(Value::Null);
    state.groups.lock().push(group.clone());
    Json(group).into_response()
}

async fn get_group(State(state): State<Arc<MockState>>, Path(id): Path<i64>) -> Response {
    match state.groups.lock().iter().find(|g| g["id"] == id) {
        Some(group) => Json(group.clone()).into_response(),
        None => detail(StatusCode::NOT_FOUND, "Group not found"),
    }
}

async fn join_group(State(state): State<Arc<MockState>>, body: Bytes) -> Response {
    if let Ok(body) = serde_json::from_slice::<Value>(&body) {
        if let Some(code) = body["invite_code"].as_str() {
            if code != "JOINME" {
                return detail(StatusCode::NOT_FOUND, "Group not found");
            }
            let group = group_json(77, "Invited");
            state.groups.lock().push(group.clone());
            return Json(group).into_response();
        }
    }
    state.groups.lock().push(group_json(99, "Joined"));
    Json(json!({
        "id": 9900,
        "user_id": 1,
        "group_id": 99,
        "joined_at": "2024-03-02T08:00:00",
        "user": user_json(1, "a@b.com", "a")
    }))
    .into_response()
}

async fn leave_group(State(state): State<Arc<MockState>>, Path(id): Path<i64>) -> Response {
    state.groups.lock().retain(|g| g["id"] != id);
    Json(json!({ "message": "Left group" })).into_response()
}

async fn video_stats(Path(id): Path<i64>) -> Response {
    if id == 2 {
        return detail(StatusCode::INTERNAL_SERVER_ERROR, "stats unavailable");
    }
    Json(json!({
        "group_id": id,
        "total_submissions": 3,
        "unique_submitters": 2,
        "total_members": 4,
        "submission_rate": 0.5
    }))
    .into_response()
}

async fn invite(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "message": "Invites processed",
        "successful_invites": body["usernames"].clone(),
        "failed_invites": []
    }))
}

async fn pending_invites() -> Json<Value> {
    Json(json!([{
        "id": 5,
        "group_id": 1,
        "invited_username": "a",
        "invited_by": 3,
        "status": "pending",
        "created_at": "2024-03-01T12:00:00",
        "expires_at": "2024-03-08T12:00:00",
        "group": { "id": 1, "name": "Family" },
        "invited_by_user": { "id": 3, "username": "mom" }
    }]))
}

async fn accept_invite(Path(id): Path<i64>) -> Json<Value> {
    Json(json!({ "message": format!("Invite {} accepted", id) }))
}

async fn submissions(Path(group_id): Path<i64>) -> Json<Value> {
    Json(json!([{
        "id": 1,
        "user_id": 1,
        "group_id": group_id,
        "prompt_id": 1,
        "s3_key": "videos/1.mp4",
        "duration": 4.2,
        "submitted_at": "2024-03-02T09:00:00",
        "user": user_json(1, "a@b.com", "a")
    }]))
}

async fn upload(State(state): State<Arc<MockState>>, mut multipart: Multipart) -> Response {
    let mut seen = UploadSeen::default();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            seen.file_name = field.file_name().map(str::to_string);
            seen.file_len = field.bytes().await.map(|b| b.len()).unwrap_or_default();
        } else {
            let text = field.text().await.unwrap_or_default();
            seen.fields.push((name, text));
        }
    }
    state.uploads.lock().push(seen);

    Json(json!({
        "id": 31,
        "user_id": 1,
        "group_id": 5,
        "prompt_id": 1,
        "s3_key": "videos/31.mp4",
        "duration": 3.5,
        "submitted_at": "2024-03-02T09:00:00"
    }))
    .into_response()
}

async fn compilations(Path(group_id): Path<i64>) -> Json<Value> {
    Json(json!([{
        "id": 42,
        "group_id": group_id,
        "week_start": "2024-02-26T00:00:00",
        "week_end": "2024-03-03T23:59:59",
        "status": "completed",
        "s3_key": "compilations/42.mp4",
        "created_at": "2024-03-04T00:00:00",
        "completed_at": "2024-03-04T00:05:00"
    }]))
}

async fn generate(Path(_group_id): Path<i64>) -> Json<Value> {
    Json(json!({
        "message": "Compilation started",
        "compilation_id": 42,
        "status": "processing"
    }))
}

async fn compilation_status(State(state): State<Arc<MockState>>, Path(_id): Path<i64>) -> Json<Value> {
    let polls = state.status_polls.fetch_add(1, Ordering::SeqCst);
    if polls < 2 {
        Json(json!({ "status": "processing" }))
    } else {
        Json(json!({ "status": "completed", "download_url": "https://cdn.example/42.mp4" }))
    }
}

async fn list_users() -> Json<Value> {
    Json(json!([
        { "id": 1, "username": "a", "email": "a@b.com", "created_at": "2024-03-01T12:00:00" },
        { "id": 3, "username": "mom", "email": "mom@b.com", "created_at": "2024-01-15T08:30:00Z" }
    ]))
}

async fn current_prompt() -> Json<Value> {
    Json(json!({
        "id": 4,
        "text": "Show us your breakfast",
        "created_at": "2024-03-04T00:00:00",
        "expires_at": "2024-03-11T00:00:00"
    }))
}

async fn download_url(Path(id): Path<i64>) -> Response {
    if id != 1 {
        return detail(StatusCode::NOT_FOUND, "Submission not found");
    }
    Json(json!({ "download_url": "https://cdn.example/videos/1.mp4?sig=abc" })).into_response()
}

async fn music_tracks() -> Json<Value> {
    Json(json!([
        { "id": 1, "name": "Lo-fi", "s3_key": "music/lofi.mp3" },
        { "id": 2, "title": "Upbeat", "artist": "Someone", "duration": 30.0 }
    ]))
}

//=========================================================================================
// Server and Client Setup
//=========================================================================================

pub fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/auth/account", delete(delete_account))
        .route("/groups/my-groups", get(my_groups))
        .route("/groups/create", post(create_group))
        .route("/groups/join", post(join_group))
        .route("/groups/users", get(list_users))
        .route("/groups/pending-invites", get(pending_invites))
        .route("/groups/invites/{id}/accept", post(accept_invite))
        .route("/groups/{id}", get(get_group))
        .route("/groups/{id}/leave", post(leave_group))
        .route("/groups/{id}/invite", post(invite))
        .route("/groups/{id}/video-stats", get(video_stats))
        .route("/videos/submissions/{group_id}", get(submissions))
        .route("/videos/upload", post(upload))
        .route("/videos/compilations/{group_id}", get(compilations))
        .route("/videos/generate-compilation/{group_id}", post(generate))
        .route("/videos/compilation-status/{id}", get(compilation_status))
        .route("/videos/music-tracks", get(music_tracks))
        .route("/videos/download-url/{id}", get(download_url))
        .route("/prompts/current", get(current_prompt))
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

pub struct TestBackend {
    pub base_url: String,
    pub state: Arc<MockState>,
}

pub async fn spawn_backend() -> TestBackend {
    let state = Arc::new(MockState::default());
    let app = router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    TestBackend {
        base_url: format!("http://{}", addr),
        state,
    }
}

/// A base URL nothing listens on.
pub async fn dead_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// A base URL whose listener accepts every connection and drops it at once,
/// so each request fails without a response. The counter tracks accepted
/// connections.
pub async fn dropping_base_url() -> (String, Arc<AtomicUsize>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(stream);
        }
    });
    (format!("http://{}", addr), accepted)
}

pub struct TestClient {
    pub app: AppState,
    pub tokens: TokenStore,
}

/// A fully wired client on an in-memory store with fast retries.
pub fn client_for(base_url: &str) -> TestClient {
    let mut config = Config::for_base_url(base_url).unwrap();
    config.retry.base_delay = Duration::from_millis(5);
    config.request_timeout = Duration::from_secs(5);
    client_with(config)
}

/// Like [`client_for`], for tests that tune the transport policy themselves.
pub fn client_with(config: Config) -> TestClient {
    let kv = Arc::new(MemoryKeyValueStore::new());
    let tokens = TokenStore::new(kv.clone());
    let app = AppState::with_store(config, kv).unwrap();
    TestClient { app, tokens }
}
