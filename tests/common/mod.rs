//! In-process stand-in for the fitting service, plus a connected harness.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use nal2_caller::config::{AppPaths, SessionSettings};
use nal2_caller::coordinator::{run_action, Action, Coordinator};
use nal2_caller::session::Endpoint;

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub enum Reply {
    Json(Value),
    Status(u16),
    Raw(String),
}

/// Success envelope the way the service shapes it.
pub fn ok(request: &Value, outputs: Value) -> Reply {
    Reply::Json(json!({
        "sequence_num": request["sequence_num"],
        "function": request["function"],
        "return": 0,
        "output_parameters": outputs,
    }))
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub content_type: Option<String>,
    pub body: Value,
}

type Handler = dyn Fn(&Value) -> Reply + Send + Sync;

pub struct FakeService {
    pub addr: SocketAddr,
    recorded: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeService {
    pub async fn start(handler: impl Fn(&Value) -> Reply + Send + Sync + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<Handler> = Arc::new(handler);

        let log = Arc::clone(&recorded);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else { break };
                let handler = Arc::clone(&handler);
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    serve(stream, handler, log).await;
                });
            }
        });
        Self { addr, recorded }
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new("127.0.0.1", self.addr.port(), "/api/nal2/process")
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }

    pub fn functions(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| r.body["function"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

async fn serve(mut stream: TcpStream, handler: Arc<Handler>, log: Arc<Mutex<Vec<Recorded>>>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return, // probe: connect and close
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let header = |name: &str| {
        head.lines().find_map(|l| {
            let (k, v) = l.split_once(':')?;
            k.trim().eq_ignore_ascii_case(name).then(|| v.trim().to_string())
        })
    };
    let length: usize = header("content-length").and_then(|v| v.parse().ok()).unwrap_or(0);
    while buf.len() < header_end + length {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let body: Value = serde_json::from_slice(&buf[header_end..header_end + length]).unwrap_or(Value::Null);
    log.lock().unwrap().push(Recorded {
        content_type: header("content-type"),
        body: body.clone(),
    });

    let (status, text) = match handler(&body) {
        Reply::Json(v) => (200, v.to_string()),
        Reply::Raw(s) => (200, s),
        Reply::Status(code) => (code, String::new()),
    };
    let response = format!(
        "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        text.len(),
        text
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

pub fn fast_settings() -> SessionSettings {
    SessionSettings {
        probe_timeout: Duration::from_secs(2),
        request_timeout: Duration::from_secs(2),
    }
}

/// A coordinator over a temp directory, already connected to `service`.
pub struct Harness {
    pub dir: tempfile::TempDir,
    pub coord: Coordinator,
    pub service: FakeService,
}

pub async fn harness(handler: impl Fn(&Value) -> Reply + Send + Sync + 'static) -> Harness {
    let service = FakeService::start(handler).await;
    let dir = tempfile::tempdir().unwrap();
    let mut coord = Coordinator::open(&AppPaths::at(dir.path()), fast_settings()).unwrap();
    run_action(coord.engine(), Action::Connect(service.endpoint()))
        .await
        .unwrap();
    coord.drain();
    Harness { dir, coord, service }
}
