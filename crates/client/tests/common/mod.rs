//! In-process stand-in for the remote inference and upload services.
//!
//! Every route replays scripted responses and records what it received,
//! so tests can assert both the client's behaviour and its wire traffic.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use genflow_client::HttpContext;

/// A scripted HTTP reply.
pub type Reply = (StatusCode, Value);

/// A request as seen by the stand-in server.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub body: Value,
    pub proxy_token: Option<String>,
}

#[derive(Default)]
pub struct ServerState {
    submit_replies: Mutex<VecDeque<Reply>>,
    status_replies: Mutex<VecDeque<Reply>>,
    upload_replies: Mutex<VecDeque<Reply>>,
    pub requests: Mutex<Vec<Recorded>>,
    pub uploads: Mutex<Vec<UploadedFile>>,
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ServerState {
    pub fn script_submit(&self, reply: Reply) {
        self.submit_replies.lock().unwrap().push_back(reply);
    }

    pub fn script_status(&self, replies: impl IntoIterator<Item = Reply>) {
        self.status_replies.lock().unwrap().extend(replies);
    }

    pub fn script_upload(&self, reply: Reply) {
        self.upload_replies.lock().unwrap().push_back(reply);
    }

    pub fn requests_to(&self, path_prefix: &str) -> Vec<Recorded> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path.starts_with(path_prefix))
            .cloned()
            .collect()
    }

    fn record(&self, path: String, headers: &HeaderMap, body: Value) {
        let proxy_token = headers
            .get("x-proxy-token")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.requests.lock().unwrap().push(Recorded {
            path,
            body,
            proxy_token,
        });
    }
}

/// Pop the next reply, repeating the last one once the script runs dry.
fn next_reply(queue: &Mutex<VecDeque<Reply>>) -> Reply {
    let mut queue = queue.lock().unwrap();
    if queue.len() > 1 {
        queue.pop_front().unwrap()
    } else {
        queue
            .front()
            .cloned()
            .unwrap_or((StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "unscripted"})))
    }
}

pub struct TestServer {
    pub base_url: String,
    pub state: Arc<ServerState>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Start the stand-in server on an ephemeral port.
pub async fn spawn_server() -> TestServer {
    let state = Arc::new(ServerState::default());

    let app = Router::new()
        .route("/predictions", post(create_prediction))
        .route("/predictions/{id}", get(get_prediction))
        .route("/task", post(task_endpoint))
        .route("/upload", post(upload))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{addr}"),
        state,
    }
}

pub fn http_context() -> Arc<HttpContext> {
    Arc::new(HttpContext::new(
        vec![("X-Proxy-Token".to_string(), "test-token".to_string())],
        Duration::from_secs(5),
    ))
}

async fn create_prediction(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.record("/predictions".into(), &headers, body);
    let (status, reply) = next_reply(&state.submit_replies);
    (status, Json(reply))
}

async fn get_prediction(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    state.record(format!("/predictions/{id}"), &headers, Value::Null);
    let (status, reply) = next_reply(&state.status_replies);
    (status, Json(reply))
}

async fn task_endpoint(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let task_type = body["task_type"].as_str().unwrap_or_default().to_string();
    state.record(format!("/task/{task_type}"), &headers, body);
    let queue = match task_type.as_str() {
        "submit" => &state.submit_replies,
        _ => &state.status_replies,
    };
    let (status, reply) = next_reply(queue);
    (status, Json(reply))
}

async fn upload(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    state.record("/upload".into(), &headers, Value::Null);
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.unwrap().to_vec();
        state.uploads.lock().unwrap().push(UploadedFile {
            field: name,
            file_name,
            content_type,
            bytes,
        });
    }
    let (status, reply) = next_reply(&state.upload_replies);
    (status, Json(reply))
}
