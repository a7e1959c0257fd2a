//! In-process stand-in for the NeuroScreen backend.
//!
//! Every request is recorded; responses are scripted per `(method, path)`.
//! A script replays its entries in order and then keeps repeating the last one.

#![allow(dead_code)]

use actix_web::dev::ServerHandle;
use actix_web::http::StatusCode;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use client::session::{CredentialStore, MemoryCredentialStore, SessionError};
use client::{Api, ClientConfig, PollOptions, Session};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub enum Reply {
    Json(u16, Value),
    Text(u16, String),
    /// Body sent verbatim under the given content type.
    Raw(u16, &'static str, String),
}

impl Reply {
    pub fn ok(body: Value) -> Self {
        Reply::Json(200, body)
    }

    fn into_response(self) -> HttpResponse {
        match self {
            Reply::Json(status, body) => HttpResponse::build(status_code(status)).json(body),
            Reply::Text(status, body) => HttpResponse::build(status_code(status))
                .content_type("text/plain")
                .body(body),
            Reply::Raw(status, content_type, body) => HttpResponse::build(status_code(status))
                .content_type(content_type)
                .body(body),
        }
    }
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }
}

#[derive(Default)]
struct State {
    routes: HashMap<(String, String), VecDeque<Reply>>,
    requests: Vec<Recorded>,
}

pub struct FakeApi {
    pub base_url: Url,
    state: Arc<Mutex<State>>,
    server: ServerHandle,
}

impl FakeApi {
    pub fn start() -> Self {
        let state = Arc::new(Mutex::new(State::default()));
        let data = web::Data::from(Arc::clone(&state));
        let (tx, rx) = std::sync::mpsc::channel();

        std::thread::spawn(move || {
            let system = actix_web::rt::System::new();
            let outcome = system.block_on(async move {
                let server = HttpServer::new(move || {
                    App::new()
                        .app_data(data.clone())
                        .default_service(web::to(handle))
                })
                .workers(1)
                .bind(("127.0.0.1", 0))?;

                let addr = server.addrs()[0];
                let server = server.run();
                let _ = tx.send((addr, server.handle()));
                server.await
            });
            if let Err(e) = outcome {
                eprintln!("fake api stopped: {}", e);
            }
        });

        let (addr, server) = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("fake api did not start");

        Self {
            base_url: Url::parse(&format!("http://{}", addr)).unwrap(),
            state,
            server,
        }
    }

    /// Scripts the replies for one route, replacing any earlier script.
    pub fn route(&self, method: &str, path: &str, replies: impl IntoIterator<Item = Reply>) {
        self.lock()
            .routes
            .insert((method.to_string(), path.to_string()), replies.into_iter().collect());
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.lock().requests.clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    pub fn last_request(&self) -> Recorded {
        self.requests().pop().expect("no request recorded")
    }

    pub fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(self.base_url.clone(), std::env::temp_dir());
        config.poll = PollOptions {
            max_retries: 20,
            interval: Duration::from_millis(20),
        };
        config.request_timeout = Duration::from_secs(5);
        config
    }

    pub fn api(&self, session: Session) -> Api {
        Api::from_config(&self.config(), session).unwrap()
    }

    pub fn api_with_token(&self, token: &str) -> Api {
        self.api(Session::new(MemoryCredentialStore::with_token(token)))
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }
}

impl Drop for FakeApi {
    fn drop(&mut self) {
        // The stop command is queued immediately; completion is not awaited.
        drop(self.server.stop(false));
    }
}

async fn handle(req: HttpRequest, body: web::Bytes, state: web::Data<Mutex<State>>) -> HttpResponse {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(String::from)
    };

    let mut state = state.lock().unwrap();
    state.requests.push(Recorded {
        method: req.method().to_string(),
        path: req.path().to_string(),
        query: req.query_string().to_string(),
        authorization: header("authorization"),
        content_type: header("content-type"),
        body: body.to_vec(),
    });

    let key = (req.method().to_string(), req.path().to_string());
    let reply = match state.routes.get_mut(&key) {
        Some(replies) if replies.len() > 1 => replies.pop_front(),
        Some(replies) => replies.front().cloned(),
        None => None,
    };

    match reply {
        Some(reply) => reply.into_response(),
        None => HttpResponse::NotFound().json(json!({ "error": format!("no route for {} {}", key.0, key.1) })),
    }
}

/// Credential store that counts clears, for asserting 401 handling.
pub struct CountingStore {
    inner: MemoryCredentialStore,
    clears: Arc<AtomicUsize>,
}

impl CountingStore {
    /// Returns the store and a counter that outlives handing it to a session.
    pub fn with_token(token: &str) -> (Self, Arc<AtomicUsize>) {
        let clears = Arc::new(AtomicUsize::new(0));
        let store = Self {
            inner: MemoryCredentialStore::with_token(token),
            clears: Arc::clone(&clears),
        };
        (store, clears)
    }
}

impl CredentialStore for CountingStore {
    fn load(&self) -> Option<String> {
        self.inner.load()
    }

    fn save(&self, token: &str) -> Result<(), SessionError> {
        self.inner.save(token)
    }

    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.inner.clear();
    }
}

/// Credential store whose writes always fail, like a read-only data directory.
pub struct ReadOnlyStore;

impl CredentialStore for ReadOnlyStore {
    fn load(&self) -> Option<String> {
        None
    }

    fn save(&self, _token: &str) -> Result<(), SessionError> {
        Err(SessionError::Persist {
            path: "/read-only/neuroscreen_token".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only file system"),
        })
    }

    fn clear(&self) {}
}

pub fn record(id: u64, status: &str) -> Value {
    json!({
        "id": id,
        "patient_id": 12,
        "uploader_id": 3,
        "file_name": "subject_01.edf",
        "file_type": "edf",
        "file_size_bytes": 2048,
        "status": status,
        "created_at": "2025-05-02T10:00:00"
    })
}

pub fn processed_record(id: u64, processing_time_ms: u64) -> Value {
    let mut value = record(id, "processed");
    value["processing_time_ms"] = json!(processing_time_ms);
    value
}
