//! In-process stand-in for the hub server.
//!
//! Records every request it receives and answers with fixed payloads, or
//! with HTTP 500 when told to fail.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde_json::json;

/// One multipart field as received.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl Field {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// One request as received.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: &'static str,
    pub path: String,
    pub raw_query: Option<String>,
    pub query: HashMap<String, String>,
    pub fields: Vec<Field>,
}

impl Recorded {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Default)]
pub struct MockState {
    fail: AtomicBool,
    requests: Mutex<Vec<Recorded>>,
}

impl MockState {
    fn record(&self, recorded: Recorded) -> Option<Response> {
        self.requests.lock().unwrap().push(recorded);
        self.fail
            .load(Ordering::SeqCst)
            .then(|| (StatusCode::INTERNAL_SERVER_ERROR, "model crashed").into_response())
    }
}

/// Handle to a running mock server.
#[derive(Debug, Clone)]
pub struct MockHub {
    pub base_url: String,
    state: Arc<MockState>,
}

impl MockHub {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/health", get(health))
            .route("/predict", post(predict))
            .route("/sentiment_analysis", get(sentiment))
            .route("/chat", post(chat))
            .route("/chat/history/{id}", delete(clear_history).get(history))
            .route("/chat/sessions", get(sessions))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    /// Make every endpoint answer 500 from now on.
    pub fn fail_all(&self) {
        self.state.fail.store(true, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }
}

/// A base URL nothing is listening on.
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn simple(method: &'static str, path: String) -> Recorded {
    Recorded {
        method,
        path,
        raw_query: None,
        query: HashMap::new(),
        fields: Vec::new(),
    }
}

async fn read_fields(mut multipart: Multipart) -> Vec<Field> {
    let mut fields = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        fields.push(Field {
            name,
            file_name,
            content_type,
            data,
        });
    }
    fields
}

async fn health(State(state): State<Arc<MockState>>) -> Response {
    if let Some(failure) = state.record(simple("GET", "/health".into())) {
        return failure;
    }
    Json(json!({"msg": "Up and running! Chat is available.", "status": "healthy"})).into_response()
}

async fn predict(State(state): State<Arc<MockState>>, multipart: Multipart) -> Response {
    let fields = read_fields(multipart).await;
    let filename = fields
        .iter()
        .find(|f| f.name == "file")
        .and_then(|f| f.file_name.clone());
    let mut recorded = simple("POST", "/predict".into());
    recorded.fields = fields;
    if let Some(failure) = state.record(recorded) {
        return failure;
    }
    Json(json!({
        "filename": filename,
        "predicted_class": "hot_dog",
        "confidence": 0.8734
    }))
    .into_response()
}

async fn sentiment(
    State(state): State<Arc<MockState>>,
    RawQuery(raw_query): RawQuery,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let text = query.get("text").cloned().unwrap_or_default();
    let mut recorded = simple("GET", "/sentiment_analysis".into());
    recorded.raw_query = raw_query;
    recorded.query = query;
    if let Some(failure) = state.record(recorded) {
        return failure;
    }
    Json(json!({"text": text, "sentiment": {"label": "POSITIVE", "score": 0.8}})).into_response()
}

async fn chat(State(state): State<Arc<MockState>>, multipart: Multipart) -> Response {
    let fields = read_fields(multipart).await;
    let session_id = fields
        .iter()
        .find(|f| f.name == "session_id")
        .map(Field::text)
        .unwrap_or_default();
    let has_image = fields.iter().any(|f| f.name == "image");
    let turns = state
        .requests
        .lock()
        .unwrap()
        .iter()
        .filter(|r| r.path == "/chat")
        .count();

    let mut recorded = simple("POST", "/chat".into());
    recorded.fields = fields;
    if let Some(failure) = state.record(recorded) {
        return failure;
    }
    Json(json!({
        "response": "That's interesting! Tell me more.",
        "session_id": session_id,
        "conversation_length": (turns + 1) * 2,
        "has_image": has_image,
        "model_used": "Simple Rule-based Chat"
    }))
    .into_response()
}

async fn clear_history(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> Response {
    if let Some(failure) = state.record(simple("DELETE", format!("/chat/history/{id}"))) {
        return failure;
    }
    Json(json!({"message": format!("Conversation history cleared for session {id}")}))
        .into_response()
}

async fn history(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> Response {
    if let Some(failure) = state.record(simple("GET", format!("/chat/history/{id}"))) {
        return failure;
    }
    Json(json!({
        "session_id": id,
        "history": [
            {"role": "user", "content": [{"type": "image"}, {"type": "text", "text": "What color is this?"}]},
            {"role": "assistant", "content": [{"type": "text", "text": "Red."}]}
        ],
        "length": 2
    }))
    .into_response()
}

async fn sessions(State(state): State<Arc<MockState>>) -> Response {
    if let Some(failure) = state.record(simple("GET", "/chat/sessions".into())) {
        return failure;
    }
    Json(json!({"active_sessions": ["session_1_aaaaaaaaa"], "total_sessions": 1})).into_response()
}
