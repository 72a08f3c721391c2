// tests/common/mod.rs
// In-process mock of the Ares Club backend: REST endpoints plus a Socket.IO endpoint
#![allow(dead_code)]

use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use ares_club::config::ReconnectConfig;
use ares_club::realtime::{ChannelEvent, RealtimeChannel, RealtimeConfig};

pub const ADMIN_TOKEN: &str = "admin-token";
pub const PLAYER_TOKEN: &str = "player-token";
pub const GREETING: &str = "Conectado al chat de Ares Club";

/// Server-side actions on every open socket
#[derive(Debug, Clone, Copy)]
pub enum Control {
    /// Drop the TCP connection without a goodbye
    Drop,
    /// Send a Socket.IO disconnect packet, then close
    Kick,
    /// Send a disconnect packet for the `/admin` namespace and stay open
    ForeignDisconnect,
    /// Keep the socket open but stop sending anything to it
    Mute,
}

#[derive(Clone)]
pub struct MockState {
    inner: Arc<Inner>,
}

struct Inner {
    overrides: Mutex<HashMap<String, (u16, Value)>>,
    messages: Mutex<Vec<Value>>,
    next_id: AtomicI64,
    rest_sends: Mutex<Vec<(Option<String>, String)>>,
    user_messages: Mutex<Vec<Value>>,
    socket_queries: Mutex<Vec<HashMap<String, String>>>,
    active: AtomicUsize,
    accepted: AtomicUsize,
    /// `(pingInterval, pingTimeout)` advertised in the open packet
    heartbeat: Mutex<(u64, u64)>,
    broadcast: broadcast::Sender<Value>,
    control: broadcast::Sender<Control>,
}

impl Default for MockState {
    fn default() -> Self {
        let (broadcast, _) = broadcast::channel(64);
        let (control, _) = broadcast::channel(8);
        Self {
            inner: Arc::new(Inner {
                overrides: Mutex::new(HashMap::new()),
                messages: Mutex::new(Vec::new()),
                next_id: AtomicI64::new(1),
                rest_sends: Mutex::new(Vec::new()),
                user_messages: Mutex::new(Vec::new()),
                socket_queries: Mutex::new(Vec::new()),
                active: AtomicUsize::new(0),
                accepted: AtomicUsize::new(0),
                heartbeat: Mutex::new((25000, 20000)),
                broadcast,
                control,
            }),
        }
    }
}

impl MockState {
    /// Replace the response of `path` with a fixed status and body
    pub fn respond(&self, path: &str, status: u16, body: Value) {
        self.inner
            .overrides
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body));
    }

    pub fn fail(&self, path: &str) {
        self.respond(path, 500, json!({"detail": "Internal Server Error"}));
    }

    /// Seed a stored chat message and return it
    pub fn seed_message(&self, username: &str, message: &str, is_admin: bool) -> Value {
        self.store_message(username, message, is_admin)
    }

    pub fn rest_sends(&self) -> Vec<(Option<String>, String)> {
        self.inner.rest_sends.lock().unwrap().clone()
    }

    pub fn user_messages(&self) -> Vec<Value> {
        self.inner.user_messages.lock().unwrap().clone()
    }

    pub fn socket_queries(&self) -> Vec<HashMap<String, String>> {
        self.inner.socket_queries.lock().unwrap().clone()
    }

    pub fn active_connections(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    pub fn accepted_connections(&self) -> usize {
        self.inner.accepted.load(Ordering::SeqCst)
    }

    /// Advertise a different heartbeat to sockets opened from now on
    pub fn set_heartbeat(&self, ping_interval_ms: u64, ping_timeout_ms: u64) {
        *self.inner.heartbeat.lock().unwrap() = (ping_interval_ms, ping_timeout_ms);
    }

    pub fn control(&self, action: Control) {
        let _ = self.inner.control.send(action);
    }

    fn override_for(&self, path: &str) -> Option<Response> {
        let overrides = self.inner.overrides.lock().unwrap();
        let (status, body) = overrides.get(path)?;
        Some(reply(*status, body.clone()))
    }

    fn store_message(&self, username: &str, message: &str, is_admin: bool) -> Value {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let created_at = chrono::Utc::now()
            .naive_utc()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string();
        let stored = json!({
            "id": id,
            "username": username,
            "message": message,
            "is_admin": is_admin,
            "created_at": created_at,
        });
        self.inner.messages.lock().unwrap().push(stored.clone());
        stored
    }

    fn broadcast(&self, message: Value) {
        let _ = self.inner.broadcast.send(message);
    }
}

pub struct MockBackend {
    pub url: String,
    pub state: MockState,
    handle: JoinHandle<()>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state = MockState::default();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state.clone());
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}"),
            state,
            handle,
        }
    }

    pub fn api(&self) -> ares_club::api::ApiClient {
        ares_club::api::ApiClient::new(&self.url, Some(Duration::from_secs(5))).unwrap()
    }

    /// Realtime config with short retry delays
    pub fn realtime(&self) -> RealtimeConfig {
        let reconnect = ReconnectConfig {
            initial_delay_ms: 50,
            max_delay_ms: 200,
            max_attempts: None,
        };
        RealtimeConfig::from_backend_url(&self.url, reconnect).unwrap()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Next channel event, failing the test after five seconds
pub async fn next_event(channel: &mut RealtimeChannel) -> ChannelEvent {
    tokio::time::timeout(Duration::from_secs(5), channel.recv())
        .await
        .expect("timed out waiting for a realtime event")
        .expect("realtime channel stopped")
}

/// Poll `check` until it holds, failing the test after five seconds
pub async fn wait_until(mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !check() {
        assert!(tokio::time::Instant::now() < deadline, "condition not reached in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn reply(status: u16, body: Value) -> Response {
    let status = StatusCode::from_u16(status).unwrap();
    (status, Json(body)).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn admin_user() -> Value {
    json!({"id": 1, "username": "admin", "email": "admin@aresclub.com", "is_admin": true})
}

fn player_user() -> Value {
    json!({"id": 2, "username": "player1", "email": null, "is_admin": false})
}

fn list(data: Value) -> Value {
    let total = data.as_array().map_or(0, Vec::len);
    json!({"success": true, "data": data, "total": total})
}

fn router(state: MockState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/games", get(games))
        .route("/api/promotions", get(promotions))
        .route("/api/payment-methods", get(payment_methods))
        .route("/api/faq", get(faq))
        .route("/api/contact", post(contact))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/chat/messages", get(chat_messages))
        .route("/api/chat/send", post(chat_send))
        .route("/socket.io/", get(socket))
        .with_state(state)
}

// ============================================================================
// REST
// ============================================================================

async fn health(State(s): State<MockState>) -> Response {
    s.override_for("/api/health")
        .unwrap_or_else(|| reply(200, json!({"status": "healthy", "database": "connected"})))
}

async fn games(State(s): State<MockState>) -> Response {
    s.override_for("/api/games").unwrap_or_else(|| {
        reply(
            200,
            list(json!([
                {"id": 1, "name": "Gates of Olympus", "provider": "Pragmatic Play", "image": "gates.jpg"},
                {"id": 2, "name": "Sweet Bonanza", "provider": "Pragmatic Play", "image": "sweet.jpg"},
            ])),
        )
    })
}

async fn promotions(State(s): State<MockState>) -> Response {
    s.override_for("/api/promotions").unwrap_or_else(|| {
        reply(
            200,
            list(json!([
                {"id": 1, "title": "Bono de Bienvenida", "description": "100% en tu primer deposito", "type": "welcome_bonus", "active": true},
            ])),
        )
    })
}

async fn payment_methods(State(s): State<MockState>) -> Response {
    s.override_for("/api/payment-methods").unwrap_or_else(|| {
        reply(
            200,
            list(json!([
                {"name": "Mercado Pago", "image": "mp.png", "icon": "wallet"},
                {"name": "Transferencia", "image": "bank.png", "icon": "bank"},
            ])),
        )
    })
}

async fn faq(State(s): State<MockState>) -> Response {
    s.override_for("/api/faq").unwrap_or_else(|| {
        reply(
            200,
            list(json!([
                {"id": 1, "question": "¿Es Ares Club seguro?", "answer": "Sí.", "category": "security"},
            ])),
        )
    })
}

async fn contact(State(s): State<MockState>, Json(body): Json<Value>) -> Response {
    if let Some(r) = s.override_for("/api/contact") {
        return r;
    }
    let source = body.get("source").and_then(Value::as_str).unwrap_or("whatsapp");
    reply(
        200,
        json!({
            "success": true,
            "message": format!("Solicitud de contacto registrada ({source})"),
            "whatsapp_url": "https://wa.me/5491178419956",
        }),
    )
}

async fn login(State(s): State<MockState>, Json(body): Json<Value>) -> Response {
    if let Some(r) = s.override_for("/api/auth/login") {
        return r;
    }
    let username = body.get("username").and_then(Value::as_str).unwrap_or_default();
    let password = body.get("password").and_then(Value::as_str).unwrap_or_default();
    if username.is_empty() || password.is_empty() {
        return reply(400, json!({"detail": "Username and password required"}));
    }

    match (username, password) {
        ("admin", "admin123") => reply(
            200,
            json!({"access_token": ADMIN_TOKEN, "token_type": "bearer", "user": admin_user()}),
        ),
        ("player1", "player123") => reply(
            200,
            json!({"access_token": PLAYER_TOKEN, "token_type": "bearer", "user": player_user()}),
        ),
        _ => reply(401, json!({"detail": "Invalid credentials"})),
    }
}

async fn me(State(s): State<MockState>, headers: HeaderMap) -> Response {
    if let Some(r) = s.override_for("/api/auth/me") {
        return r;
    }
    match bearer(&headers).as_deref() {
        Some(ADMIN_TOKEN) => reply(200, admin_user()),
        Some(PLAYER_TOKEN) => reply(200, player_user()),
        _ => reply(401, json!({"detail": "Invalid token"})),
    }
}

async fn chat_messages(State(s): State<MockState>) -> Response {
    if let Some(r) = s.override_for("/api/chat/messages") {
        return r;
    }
    let messages = s.inner.messages.lock().unwrap().clone();
    reply(200, json!({"success": true, "data": messages}))
}

async fn chat_send(State(s): State<MockState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let token = bearer(&headers);
    let text = body.get("message").and_then(Value::as_str).unwrap_or_default().to_string();
    s.inner.rest_sends.lock().unwrap().push((token.clone(), text.clone()));
    if let Some(r) = s.override_for("/api/chat/send") {
        return r;
    }

    match token.as_deref() {
        Some(ADMIN_TOKEN) => {
            let stored = s.store_message("admin", &text, true);
            s.broadcast(stored.clone());
            reply(200, json!({"success": true, "data": stored}))
        }
        Some(PLAYER_TOKEN) => reply(403, json!({"detail": "Only admins can send messages"})),
        _ => reply(401, json!({"detail": "Not authenticated"})),
    }
}

// ============================================================================
// SOCKET.IO
// ============================================================================

async fn socket(
    State(s): State<MockState>,
    Query(query): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    s.inner.socket_queries.lock().unwrap().push(query);
    ws.on_upgrade(move |socket| serve_socket(socket, s))
}

/// Decrements the active counter however the socket ends
struct ActiveGuard(MockState);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.inner.active.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn send_text(socket: &mut WebSocket, text: String) -> bool {
    socket.send(Message::Text(text.into())).await.is_ok()
}

async fn serve_socket(mut socket: WebSocket, s: MockState) {
    s.inner.active.fetch_add(1, Ordering::SeqCst);
    let _guard = ActiveGuard(s.clone());
    let connection = s.inner.accepted.fetch_add(1, Ordering::SeqCst);
    let mut messages = s.inner.broadcast.subscribe();
    let mut control = s.inner.control.subscribe();

    let (ping_interval, ping_timeout) = *s.inner.heartbeat.lock().unwrap();
    let open = json!({
        "sid": format!("engine-{connection}"),
        "upgrades": [],
        "pingInterval": ping_interval,
        "pingTimeout": ping_timeout,
        "maxPayload": 1000000,
    });
    if !send_text(&mut socket, format!("0{open}")).await {
        return;
    }

    // Wait for the namespace connect request
    loop {
        match socket.recv().await {
            Some(Ok(Message::Text(text))) if text.as_str() == "40" => break,
            Some(Ok(_)) => continue,
            _ => return,
        }
    }
    let ack = json!({"sid": format!("socket-{connection}")});
    if !send_text(&mut socket, format!("40{ack}")).await {
        return;
    }
    let greeting = json!(["connected", {"message": GREETING}]);
    if !send_text(&mut socket, format!("42{greeting}")).await {
        return;
    }

    let mut muted = false;
    loop {
        tokio::select! {
            inbound = socket.recv() => {
                let text = match inbound {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                    Some(Ok(_)) => continue,
                };
                let text = text.as_str();
                if text == "41" {
                    return;
                }
                if let Some(body) = text.strip_prefix("42") {
                    handle_event(&s, body);
                }
            }
            Ok(message) = messages.recv() => {
                if muted {
                    continue;
                }
                let frame = json!(["new_message", message]);
                if !send_text(&mut socket, format!("42{frame}")).await {
                    return;
                }
            }
            Ok(action) = control.recv() => match action {
                Control::Drop => return,
                Control::Kick => {
                    let _ = send_text(&mut socket, "41".to_string()).await;
                    let _ = socket.send(Message::Close(None)).await;
                    return;
                }
                Control::ForeignDisconnect => {
                    if !send_text(&mut socket, "41/admin,".to_string()).await {
                        return;
                    }
                }
                Control::Mute => muted = true,
            },
        }
    }
}

fn handle_event(s: &MockState, body: &str) {
    let Ok(Value::Array(items)) = serde_json::from_str::<Value>(body) else {
        return;
    };
    if items.first().and_then(Value::as_str) != Some("user_message") {
        return;
    }
    let Some(payload) = items.get(1) else {
        return;
    };
    s.inner.user_messages.lock().unwrap().push(payload.clone());

    let username = payload.get("username").and_then(Value::as_str).unwrap_or("Anónimo");
    let message = payload.get("message").and_then(Value::as_str).unwrap_or_default();
    let stored = s.store_message(username, message, false);
    s.broadcast(stored);
}
