#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum_server::Server;
use reqwest::Client;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use ::common::schemas::NodePair;
use gateway::core::dispatch::Dispatcher;
use gateway::core::registry::NodeRegistry;
use gateway::core::routes::router;
use gateway::core::state::GatewayState;

/// Nothing listens on port 1 of the loopback interface.
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:1";

pub type Journal = Arc<Mutex<Vec<String>>>;

pub struct TestServer {
    pub handle: JoinHandle<Result<(), anyhow::Error>>,
    pub addr: SocketAddr,
    pub url: String,
}

impl TestServer {
    pub async fn start(app: Router) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            let server = Server::from_tcp(listener.into_std()?).serve(app.into_make_service());
            server.await.map_err(anyhow::Error::from)
        });

        Ok(TestServer { handle, addr, url })
    }

    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}

// ---------------------------------------------------------------------------
// Fake IPFS daemons
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Up,
    Status(StatusCode),
    NoContent,
    Hang,
}

#[derive(Debug, Clone)]
pub struct ReceivedUpload {
    pub content_type: String,
    pub body: Vec<u8>,
}

#[derive(Clone)]
pub struct FakeState {
    pub name: String,
    pub mode: Arc<Mutex<Mode>>,
    pub journal: Journal,
    pub pins_body: Arc<Mutex<String>>,
    pub add_cid: Arc<Mutex<String>>,
    pub uploads: Arc<Mutex<Vec<ReceivedUpload>>>,
    pub files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

/// Serves both the cluster routes and the node routes; a test starts one per role.
pub struct FakeIpfs {
    pub server: TestServer,
    pub state: FakeState,
}

impl FakeIpfs {
    pub async fn start(name: &str, journal: Journal) -> Result<Self> {
        let state = FakeState {
            name: name.to_string(),
            mode: Arc::new(Mutex::new(Mode::Up)),
            journal,
            pins_body: Arc::new(Mutex::new(String::new())),
            add_cid: Arc::new(Mutex::new(format!("Qm{}", name))),
            uploads: Arc::new(Mutex::new(Vec::new())),
            files: Arc::new(Mutex::new(HashMap::new())),
        };

        let app = Router::new()
            .route("/health", get(fake_health))
            .route("/pins", get(fake_pins))
            .route("/add", post(fake_add))
            .route("/api/v0/cat", post(fake_cat))
            .route("/api/v0/version", post(fake_version))
            .with_state(state.clone());

        let server = TestServer::start(app).await?;
        Ok(FakeIpfs { server, state })
    }

    pub fn url(&self) -> &str {
        &self.server.url
    }

    pub fn set_mode(&self, mode: Mode) {
        *self.state.mode.lock().unwrap() = mode;
    }

    pub fn fail_with(&self, status: StatusCode) {
        self.set_mode(Mode::Status(status));
    }

    pub fn set_pins_body(&self, body: impl Into<String>) {
        *self.state.pins_body.lock().unwrap() = body.into();
    }

    pub fn set_add_cid(&self, cid: impl Into<String>) {
        *self.state.add_cid.lock().unwrap() = cid.into();
    }

    pub fn put_file(&self, cid: &str, data: &[u8]) {
        self.state
            .files
            .lock()
            .unwrap()
            .insert(cid.to_string(), data.to_vec());
    }

    pub fn uploads(&self) -> Vec<ReceivedUpload> {
        self.state.uploads.lock().unwrap().clone()
    }

    pub async fn shutdown(self) {
        self.server.shutdown().await;
    }
}

// Records the hit, then short-circuits unless the fake is up.
async fn gate(s: &FakeState, route: &str) -> Option<Response> {
    s.journal
        .lock()
        .unwrap()
        .push(format!("{} {}", s.name, route));

    let mode = *s.mode.lock().unwrap();
    match mode {
        Mode::Up => None,
        Mode::Status(code) => Some((code, "injected failure").into_response()),
        Mode::NoContent => Some(StatusCode::NO_CONTENT.into_response()),
        Mode::Hang => {
            std::future::pending::<()>().await;
            None
        }
    }
}

async fn fake_health(State(s): State<FakeState>) -> Response {
    if let Some(resp) = gate(&s, "/health").await {
        return resp;
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn fake_pins(State(s): State<FakeState>) -> Response {
    if let Some(resp) = gate(&s, "/pins").await {
        return resp;
    }
    let body = s.pins_body.lock().unwrap().clone();
    (StatusCode::OK, body).into_response()
}

async fn fake_add(State(s): State<FakeState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Some(resp) = gate(&s, "/add").await {
        return resp;
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let size = body.len();
    s.uploads.lock().unwrap().push(ReceivedUpload {
        content_type,
        body: body.to_vec(),
    });

    let cid = s.add_cid.lock().unwrap().clone();
    let resp = serde_json::json!({
        "name": "upload",
        "cid": cid,
        "size": size,
        "allocations": [s.name],
    });
    (StatusCode::OK, resp.to_string()).into_response()
}

async fn fake_cat(
    State(s): State<FakeState>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    if let Some(resp) = gate(&s, "/api/v0/cat").await {
        return resp;
    }

    let arg = q.get("arg").cloned().unwrap_or_default();
    match s.files.lock().unwrap().get(&arg) {
        Some(data) => (StatusCode::OK, data.clone()).into_response(),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "block not found").into_response(),
    }
}

async fn fake_version(State(s): State<FakeState>) -> Response {
    if let Some(resp) = gate(&s, "/api/v0/version").await {
        return resp;
    }
    (StatusCode::OK, r#"{"Version":"0.29.0"}"#).into_response()
}

// ---------------------------------------------------------------------------
// Fleet of fake pairs
// ---------------------------------------------------------------------------

pub struct FakeFleet {
    pub journal: Journal,
    pub nodes: Vec<FakeIpfs>,
    pub clusters: Vec<FakeIpfs>,
}

impl FakeFleet {
    pub async fn start(n: usize) -> Result<Self> {
        let journal: Journal = Arc::new(Mutex::new(Vec::new()));
        let mut nodes = Vec::new();
        let mut clusters = Vec::new();
        for i in 0..n {
            nodes.push(FakeIpfs::start(&format!("n{}", i), journal.clone()).await?);
            clusters.push(FakeIpfs::start(&format!("c{}", i), journal.clone()).await?);
        }
        Ok(FakeFleet {
            journal,
            nodes,
            clusters,
        })
    }

    pub fn pairs(&self) -> Vec<NodePair> {
        self.nodes
            .iter()
            .zip(&self.clusters)
            .map(|(n, c)| NodePair {
                node_url: n.url().to_string(),
                cluster_url: c.url().to_string(),
            })
            .collect()
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    /// Journal entries for one route, e.g. `"/pins"`, in hit order.
    pub fn hits(&self, route: &str) -> Vec<String> {
        self.journal()
            .into_iter()
            .filter(|e| e.ends_with(&format!(" {}", route)))
            .map(|e| e.split(' ').next().unwrap_or_default().to_string())
            .collect()
    }

    pub async fn shutdown(self) {
        for f in self.nodes.into_iter().chain(self.clusters) {
            f.shutdown().await;
        }
    }
}

// ---------------------------------------------------------------------------
// Gateway under test
// ---------------------------------------------------------------------------

pub struct TestGateway {
    pub server: TestServer,
    pub state: GatewayState,
    pub shutdown_tx: watch::Sender<bool>,
}

pub struct GatewayConfig {
    pub request_deadline: Duration,
    pub probe_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            request_deadline: Duration::from_secs(10),
            probe_timeout: Duration::from_millis(500),
            max_upload_bytes: 1024 * 1024,
        }
    }
}

impl TestGateway {
    pub async fn new(pairs: Vec<NodePair>) -> Result<Self> {
        Self::with_config(pairs, GatewayConfig::default()).await
    }

    pub async fn with_config(pairs: Vec<NodePair>, cfg: GatewayConfig) -> Result<Self> {
        let registry = NodeRegistry::from_pairs(pairs)?;
        let http = Client::builder().timeout(Duration::from_secs(10)).build()?;
        let dispatcher = Dispatcher::new(http, registry, cfg.probe_timeout);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = GatewayState {
            dispatcher,
            shutdown: shutdown_rx,
            request_deadline: cfg.request_deadline,
            max_upload_bytes: cfg.max_upload_bytes,
        };

        let server = TestServer::start(router(state.clone())).await?;

        Ok(TestGateway {
            server,
            state,
            shutdown_tx,
        })
    }

    pub fn url(&self) -> &str {
        &self.server.url
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        self.server.shutdown().await;
    }
}

pub async fn wait_until<F, Fut>(timeout_ms: u64, mut check_fn: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<bool>>,
{
    let start = Instant::now();
    let timeout_duration = Duration::from_millis(timeout_ms);

    loop {
        if check_fn().await? {
            return Ok(());
        }

        if start.elapsed() > timeout_duration {
            anyhow::bail!("wait_until timed out after {}ms", timeout_ms);
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

// ---------------------------------------------------------------------------
// Payload helpers
// ---------------------------------------------------------------------------

pub fn pin_json(cid: &str, name: &str) -> String {
    serde_json::json!({
        "cid": cid,
        "name": name,
        "allocations": ["12D3KooWPeerA"],
        "origins": [],
        "created": "2024-05-01T10:00:00Z",
        "metadata": null,
        "peer_map": {
            "12D3KooWPeerA": {
                "peername": "cluster0",
                "ipfs_peer_id": "12D3KooWIpfsA",
                "ipfs_peer_addresses": ["/ip4/127.0.0.1/tcp/4001"],
                "status": "pinned",
                "timestamp": "2024-05-01T10:00:01Z",
                "error": "",
                "attempt_count": 0,
                "priority_pin": false
            }
        }
    })
    .to_string()
}

pub fn file_form(filename: &str, data: &[u8]) -> reqwest::multipart::Form {
    reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(data.to_vec()).file_name(filename.to_string()),
    )
}
