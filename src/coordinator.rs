//! The coordination loop: spawns one worker per user action and is the only
//! consumer of the events workers send back.

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::bands::BandGrid;
use crate::catalog::CatalogHandle;
use crate::commands::{apply_steps, fetch_corrections, push_corrections, send_raw};
use crate::config::{AppPaths, SessionSettings};
use crate::curves::{CurveEngine, GainFunction};
use crate::error::{CallerError, Result};
use crate::events::{self, emit, EventReceiver, LogEntry, UiEvent};
use crate::fit_state::FitStore;
use crate::mapper::{preview_request, Reconciler};
use crate::render::{Chart, ChartKind, CurveSeries, PlotArea};
use crate::session::{Endpoint, SessionClient};

/// Something the user asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Connect(Endpoint),
    Disconnect,
    /// Resolve a catalog function from the state and fill the request editor.
    PreviewTemplate(String),
    /// Resolve, send and reconcile a catalog function.
    Invoke(String),
    /// Send hand-edited request text.
    SendRaw(String),
    FetchGain(GainFunction),
    StandardSweep(GainFunction),
    GainAtSweep,
    GainAtSingle(usize),
    FetchCorrections(BandGrid),
    PushCorrections(BandGrid),
    ApplySteps,
    ReloadCatalog,
    /// Draw up to five stored arrays as one chart.
    RenderChart { kind: ChartKind, fields: Vec<String> },
}

impl Action {
    /// Actions that call the service refuse to start before a successful probe.
    pub fn needs_connection(&self) -> bool {
        !matches!(
            self,
            Action::Connect(_)
                | Action::Disconnect
                | Action::PreviewTemplate(_)
                | Action::ReloadCatalog
                | Action::RenderChart { .. }
        )
    }
}

pub struct Coordinator {
    engine: Arc<CurveEngine>,
    events: EventReceiver,
}

impl Coordinator {
    pub fn new(engine: Arc<CurveEngine>, events: EventReceiver) -> Self {
        Self { engine, events }
    }

    /// Wire up store, catalog, reconciler and client from the documents under `paths`.
    /// The client starts at the server address stored in the state.
    pub fn open(paths: &AppPaths, settings: SessionSettings) -> Result<Self> {
        paths
            .ensure_root()
            .map_err(|e| CallerError::Storage(format!("Cannot create {:?}: {}", paths.root, e)))?;
        let (tx, rx) = events::channel();

        let store = Arc::new(FitStore::open(paths.state_file(), tx));
        let catalog = Arc::new(CatalogHandle::open(paths.catalog_file()));
        let reconciler = Arc::new(Reconciler::default());
        let endpoint = store.read(|s| {
            Endpoint::new(
                s.text("server_ip").unwrap_or_default(),
                s.int("server_port").and_then(|p| u16::try_from(p).ok()).unwrap_or(8080),
                s.text("server_path").unwrap_or_default(),
            )
        });
        let client = Arc::new(SessionClient::new(endpoint, settings)?);

        let engine = Arc::new(CurveEngine::new(client, store, catalog, reconciler));
        Ok(Self::new(engine, rx))
    }

    pub fn engine(&self) -> &Arc<CurveEngine> {
        &self.engine
    }

    /// Start `action` on its own task. Failures arrive as `UiEvent::Error`.
    pub fn spawn(&self, action: Action) -> JoinHandle<()> {
        let engine = Arc::clone(&self.engine);
        tokio::spawn(async move {
            if let Err(e) = run_action(&engine, action).await {
                error!("{}", e);
                emit(engine.store().events(), UiEvent::Error(e.to_string()));
            }
        })
    }

    pub async fn next_event(&mut self) -> Option<UiEvent> {
        self.events.recv().await
    }

    /// Events already queued, without waiting.
    pub fn drain(&mut self) -> Vec<UiEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = self.events.try_recv() {
            out.push(ev);
        }
        out
    }
}

/// Run one action to completion on the current task.
pub async fn run_action(engine: &CurveEngine, action: Action) -> Result<()> {
    let client = engine.client();
    if action.needs_connection() && !client.is_connected() {
        return Err(CallerError::Transport("not connected".to_string()));
    }
    let events = engine.store().events();
    let log = |msg: String| emit(events, UiEvent::Log(LogEntry::now(msg)));

    match action {
        Action::Connect(endpoint) => {
            let url = endpoint.url()?.to_string();
            let connected = client.connect(endpoint.clone()).await;
            emit(events, UiEvent::Connection { connected, url: url.clone() });
            if !connected {
                return Err(CallerError::Transport(format!("Cannot reach {}", url)));
            }
            engine.store().commit(vec![
                ("server_ip".to_string(), Value::from(endpoint.host)),
                ("server_port".to_string(), Value::from(endpoint.port)),
                ("server_path".to_string(), Value::from(endpoint.path)),
            ])?;
            info!("Connected to {}", url);
        }
        Action::Disconnect => {
            client.disconnect();
            let url = client.url().map(|u| u.to_string()).unwrap_or_default();
            emit(events, UiEvent::Connection { connected: false, url });
        }
        Action::PreviewTemplate(function) => {
            let descriptor = engine.catalog().descriptor_or_default(&function)?;
            let text = engine.store().read(|s| preview_request(&descriptor, s));
            emit(events, UiEvent::RequestPreview(text));
        }
        Action::Invoke(function) => {
            let outcome = engine.invoke(&function).await?;
            log(format!("{}: updated {:?}", outcome.function, outcome.updated));
        }
        Action::SendRaw(text) => {
            send_raw(engine, &text).await?;
        }
        Action::FetchGain(gain) => {
            let curve = engine.fetch_gain(gain).await?;
            log(format!("{} at {} dB stored", gain.function(), curve.level));
        }
        Action::StandardSweep(gain) => {
            let curves = engine.standard_sweep(gain).await?;
            log(format!("{} swept at {} levels", gain.function(), curves.len()));
        }
        Action::GainAtSweep => {
            let report = engine.gain_at_sweep().await?;
            log(format!(
                "GainAt sweep: filled {:?}, skipped {:?}",
                report.filled,
                report.skipped.iter().map(|(i, _)| i).collect::<Vec<_>>()
            ));
        }
        Action::GainAtSingle(index) => {
            engine.gain_at_single(index).await?;
        }
        Action::FetchCorrections(grid) => {
            fetch_corrections(engine, grid).await?;
        }
        Action::PushCorrections(grid) => {
            push_corrections(engine, grid).await?;
        }
        Action::ApplySteps => {
            apply_steps(engine).await?;
        }
        Action::ReloadCatalog => {
            let n = engine.catalog().reload()?;
            log(format!("Catalog reloaded: {} functions", n));
        }
        Action::RenderChart { kind, fields } => {
            let series = engine.store().read(|s| {
                fields
                    .iter()
                    .map(|f| CurveSeries::from_state(s, f, f.as_str()))
                    .collect::<Result<Vec<_>>>()
            })?;
            let chart = Chart::new(kind, PlotArea::default(), series)?;
            emit(events, UiEvent::ChartRendered(chart.to_svg()));
        }
    }
    Ok(())
}
