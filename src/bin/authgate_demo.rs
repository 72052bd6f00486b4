//!
//! authgate demo server
//! --------------------
//! Axum app wiring the gate into real routes: cookie sessions, a fixed
//! user directory with argon2-hashed passwords, login/logout flows and
//! two guarded pages (`/private` for any authenticated user, `/admin`
//! behind an `admin` ACL).
//!
//! Deployment model: collaborators (resolver, checker, user directory)
//! are shared and immutable; one gate is constructed per request over the
//! caller's session store, so resolution caches never leak across
//! concurrent sessions.

use std::collections::HashMap;
use std::sync::Arc;

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use password_hash::{PasswordHash, SaltString};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use authgate::{Acl, AclChecker, Gate, GateSettings, MemorySessionStore, RequestContext, ResponseContext};

const SESSION_COOKIE: &str = "authgate_session";

#[derive(Debug, Clone)]
struct User {
    id: u64,
    name: String,
    role: String,
}

struct DirectoryEntry {
    user: User,
    password_phc: String,
}

/// Fixed demo directory; real deployments supply their own resolver.
static DIRECTORY: Lazy<Vec<DirectoryEntry>> = Lazy::new(|| {
    vec![
        DirectoryEntry {
            user: User { id: 10001, name: "admin".to_string(), role: "admin".to_string() },
            password_phc: hash_password("admin"),
        },
        DirectoryEntry {
            user: User { id: 10002, name: "test".to_string(), role: "user".to_string() },
            password_phc: hash_password("test"),
        },
    ]
});

fn hash_password(password: &str) -> String {
    let mut salt_bytes = [0u8; 16];
    let _ = getrandom::getrandom(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).expect("salt encode");
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .expect("argon2 hash")
        .to_string()
}

fn verify_password(phc: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(phc) {
        Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
    } else {
        false
    }
}

fn find_by_id(id: u64) -> Option<User> {
    DIRECTORY.iter().find(|e| e.user.id == id).map(|e| e.user.clone())
}

fn find_by_name(name: &str) -> Option<&'static DirectoryEntry> {
    DIRECTORY.iter().find(|e| e.user.name == name)
}

/// Identity resolver: session reference is the user id.
fn resolve_user(
    reference: Option<&u64>,
    _request: Option<&RequestContext<User>>,
) -> anyhow::Result<Option<User>> {
    Ok(reference.and_then(|id| find_by_id(*id)))
}

/// ACL checker: grant iff the user's role appears in the token list.
fn check_role(user: &User, acl: &[String]) -> anyhow::Result<bool> {
    Ok(acl.iter().any(|token| token == &user.role))
}

fn gate_for(store: Arc<MemorySessionStore<u64>>) -> Arc<Gate<u64, User>> {
    let checker: Arc<dyn AclChecker<User>> = Arc::new(check_role);
    Arc::new(Gate::new(
        resolve_user,
        store,
        GateSettings { check_acl: Some(checker), ..Default::default() },
    ))
}

/// Shared server state: session id -> per-session store.
#[derive(Clone)]
struct AppState {
    sessions: Arc<RwLock<HashMap<String, Arc<MemorySessionStore<u64>>>>>,
}

// 256-bit random session id, base64url without padding
fn gen_sid() -> String {
    let mut buf = [0u8; 32];
    let _ = getrandom::getrandom(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get("cookie").or_else(|| headers.get("Cookie"))?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let part = part.trim();
        if let Some((k, v)) = part.split_once('=') {
            if k == name {
                return Some(v.to_string());
            }
        }
    }
    None
}

/// Resolve the caller's session store, creating a fresh session when no
/// valid cookie is presented. The bool says whether a Set-Cookie is due.
fn session_for(state: &AppState, headers: &HeaderMap) -> (String, Arc<MemorySessionStore<u64>>, bool) {
    if let Some(sid) = parse_cookie(headers, SESSION_COOKIE) {
        if let Some(store) = state.sessions.read().get(&sid).cloned() {
            return (sid, store, false);
        }
    }
    let sid = gen_sid();
    let store = Arc::new(MemorySessionStore::new());
    state.sessions.write().insert(sid.clone(), store.clone());
    (sid, store, true)
}

fn session_cookie_header(sid: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!("{SESSION_COOKIE}={sid}; Path=/; HttpOnly; SameSite=Strict")).ok()
}

/// Map the gate's response abstraction onto an axum response.
fn to_http(resp: ResponseContext, set_cookie: Option<HeaderValue>) -> Response {
    let status = StatusCode::from_u16(resp.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut headers = HeaderMap::new();
    for (name, value) in &resp.headers {
        if let (Ok(n), Ok(v)) = (name.parse::<HeaderName>(), HeaderValue::from_str(value)) {
            headers.append(n, v);
        }
    }
    if let Some(cookie) = set_cookie {
        headers.append(header::SET_COOKIE, cookie);
    }
    (status, headers, resp.body).into_response()
}

/// Run one request through a guard and render `page` on grant.
fn run_guarded(state: &AppState, headers: &HeaderMap, path: &str, acl: Option<Acl>, page: &str) -> Response {
    let (sid, store, is_new) = session_for(state, headers);
    let gate = gate_for(store);
    let attribute = gate.attribute_name().to_string();
    let page = page.to_string();
    let mut request = RequestContext::<User>::new("GET", path);
    let next = move |request: &mut RequestContext<User>,
                     mut response: ResponseContext|
          -> anyhow::Result<ResponseContext> {
        let who = request.attribute(&attribute).map(|u| u.name.clone()).unwrap_or_default();
        response.write(&format!("{page} (signed in as {who})"));
        Ok(response.with_status(200))
    };
    let guard = gate.secure(acl);
    match guard(&mut request, ResponseContext::new(), &next) {
        Ok(resp) => {
            let cookie = if is_new { session_cookie_header(&sid) } else { None };
            to_http(resp, cookie)
        }
        Err(e) => {
            error!(target: "authgate_demo", "guard error on {}: {e:?}", path);
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
        }
    }
}

async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (sid, store, is_new) = session_for(&state, &headers);
    let gate = gate_for(store);
    let body = match gate.get_authenticated(None) {
        Ok(Some(user)) => format!("Welcome back, {}. Try /private and /admin, or /logout.", user.name),
        Ok(None) => "Hello. POST {\"username\",\"password\"} to /login.".to_string(),
        Err(e) => {
            error!(target: "authgate_demo", "resolve error: {e:?}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response();
        }
    };
    let mut resp = ResponseContext::new();
    resp.write(&body);
    to_http(resp, if is_new { session_cookie_header(&sid) } else { None })
}

async fn private_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    run_guarded(&state, &headers, "/private", None, "private area")
}

async fn admin_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    run_guarded(&state, &headers, "/admin", Some(Acl::from("admin")), "admin area")
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Response {
    let (sid, store, _) = session_for(&state, &headers);
    match find_by_name(&payload.username) {
        Some(entry) if verify_password(&entry.password_phc, &payload.password) => {
            let gate = gate_for(store);
            gate.permit(entry.user.id, entry.user.clone());
            info!(target: "authgate_demo", "login user={} id={}", entry.user.name, entry.user.id);
            let resp = ResponseContext::new().with_redirect("/", 303);
            to_http(resp, session_cookie_header(&sid))
        }
        _ => (StatusCode::UNAUTHORIZED, Json(json!({"status": "unauthorized"}))).into_response(),
    }
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (sid, store, is_new) = session_for(&state, &headers);
    let gate = gate_for(store);
    gate.clear();
    info!(target: "authgate_demo", "logout sid={}", sid);
    let resp = ResponseContext::new().with_redirect("/", 303);
    to_http(resp, if is_new { session_cookie_header(&sid) } else { None })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let port: u16 = std::env::var("AUTHGATE_HTTP_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(7878);

    let state = AppState { sessions: Arc::new(RwLock::new(HashMap::new())) };
    let app = Router::new()
        .route("/", get(index))
        .route("/private", get(private_page))
        .route("/admin", get(admin_page))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .with_state(state);

    info!(target: "authgate_demo", "authgate demo listening on 0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
