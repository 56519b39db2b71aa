use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use reqwest::header::CONTENT_TYPE;
use serde_json::{Map, Value};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use super::types::{Exchange, RequestEnvelope, ResponseEnvelope};
use crate::config::SessionSettings;
use crate::error::{CallerError, Result};

pub const DEFAULT_PATH: &str = "/api/nal2/process";

/// Where the fitting service listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl Endpoint {
    /// Trims inputs; an empty path becomes `/` and a missing leading slash is added.
    pub fn new(host: &str, port: u16, path: &str) -> Self {
        let path = path.trim();
        let path = if path.is_empty() {
            "/".to_string()
        } else if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        Self {
            host: host.trim().to_string(),
            port,
            path,
        }
    }

    pub fn url(&self) -> Result<Url> {
        let raw = format!("http://{}:{}{}", self.host, self.port, self.path);
        Url::parse(&raw).map_err(|e| CallerError::Transport(format!("Invalid endpoint '{}': {}", raw, e)))
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new("192.168.0.100", 8080, DEFAULT_PATH)
    }
}

/// Sequenced JSON-over-HTTP client for the fitting service.
///
/// One call at a time: `send` holds an in-flight gate for the whole exchange,
/// and the sequence number is taken inside the gate right before the POST, so
/// numbers count attempts and match wire order. There are no retries.
pub struct SessionClient {
    http: reqwest::Client,
    endpoint: RwLock<Endpoint>,
    settings: SessionSettings,
    sequence: AtomicU64,
    connected: AtomicBool,
    in_flight: Mutex<()>,
}

impl SessionClient {
    pub fn new(endpoint: Endpoint, settings: SessionSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("nal2-caller/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| CallerError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: RwLock::new(endpoint),
            settings,
            sequence: AtomicU64::new(0),
            connected: AtomicBool::new(false),
            in_flight: Mutex::new(()),
        })
    }

    pub fn endpoint(&self) -> Endpoint {
        match self.endpoint.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set_endpoint(&self, endpoint: Endpoint) {
        match self.endpoint.write() {
            Ok(mut guard) => *guard = endpoint,
            Err(poisoned) => *poisoned.into_inner() = endpoint,
        }
    }

    pub fn url(&self) -> Result<Url> {
        self.endpoint().url()
    }

    /// Next sequence number to be sent.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        info!("Disconnected from {:?}", self.endpoint());
    }

    /// Switch to `endpoint` and probe it.
    pub async fn connect(&self, endpoint: Endpoint) -> bool {
        self.set_endpoint(endpoint);
        self.probe().await
    }

    /// Open and immediately close a TCP connection to the endpoint.
    ///
    /// Calls themselves open fresh HTTP connections; this only records
    /// whether the service was reachable.
    pub async fn probe(&self) -> bool {
        let Endpoint { host, port, .. } = self.endpoint();
        let attempt = tokio::time::timeout(
            self.settings.probe_timeout,
            TcpStream::connect((host.as_str(), port)),
        )
        .await;

        let ok = match attempt {
            Ok(Ok(stream)) => {
                drop(stream);
                true
            }
            Ok(Err(e)) => {
                warn!("Probe of {}:{} failed: {}", host, port, e);
                false
            }
            Err(_) => {
                warn!(
                    "Probe of {}:{} timed out after {:?}",
                    host, port, self.settings.probe_timeout
                );
                false
            }
        };
        self.connected.store(ok, Ordering::SeqCst);
        info!("Probe of {}:{} -> {}", host, port, if ok { "reachable" } else { "unreachable" });
        ok
    }

    /// Send one request and return the parsed response body.
    pub async fn send(&self, function: &str, input_parameters: Map<String, Value>) -> Result<ResponseEnvelope> {
        self.call(function, input_parameters).await.map(|ex| ex.response)
    }

    /// Like `send`, but also hands back the request exactly as transmitted.
    pub async fn call(&self, function: &str, input_parameters: Map<String, Value>) -> Result<Exchange> {
        let _gate = self.in_flight.lock().await;

        let sequence_num = self.sequence.fetch_add(1, Ordering::SeqCst);
        let request = RequestEnvelope {
            function: function.to_string(),
            input_parameters,
            sequence_num,
        };

        let url = self.url()?;
        let body = serde_json::to_string(&request)
            .map_err(|e| CallerError::Protocol(format!("Failed to encode request: {}", e)))?;

        info!("POST {} function={} sequence_num={}", url, function, sequence_num);
        let response = self
            .http
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                let kind = if e.is_timeout() { "timed out" } else { "failed" };
                CallerError::Transport(format!("Request to '{}' {}: {}", url, kind, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CallerError::Transport(format!(
                "HTTP error from '{}': {} {}",
                url,
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| CallerError::Transport(format!("Failed to read response body from '{}': {}", url, e)))?;

        let parsed: ResponseEnvelope = serde_json::from_str(&text).map_err(|e| {
            CallerError::Protocol(format!("Response to {} is not a valid envelope: {}", function, e))
        })?;
        debug!("Response for sequence_num={}: {} bytes", sequence_num, text.len());

        Ok(Exchange {
            request,
            response: parsed,
        })
    }
}
