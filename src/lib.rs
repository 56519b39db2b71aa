pub mod bands;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod coordinator;
pub mod curves;
pub mod error;
pub mod events;
pub mod fit_state;
pub mod mapper;
pub mod render;
pub mod session;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

pub use bands::BandGrid;
pub use coordinator::{Action, Coordinator};
pub use error::{CallerError, Result};
pub use events::UiEvent;

use curves::GainFunction;

/// Interpret one line of console input as an action.
///
/// A line starting with `{` is request text. Otherwise the first word picks
/// a workflow, and a bare word that is neither is taken as a catalog function.
pub fn parse_line(line: &str) -> Option<Action> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if line.starts_with('{') {
        return Some(Action::SendRaw(line.to_string()));
    }
    let mut words = line.split_whitespace();
    let head = words.next()?;
    let arg = words.next();
    let gain = |name: Option<&str>| name.and_then(GainFunction::from_function);

    let action = match (head, arg) {
        ("steps", None) => Action::ApplySteps,
        ("reload", None) => Action::ReloadCatalog,
        ("disconnect", None) => Action::Disconnect,
        ("gainat", None) => Action::GainAtSweep,
        ("gainat", Some(i)) => Action::GainAtSingle(i.parse().ok()?),
        ("fetch", Some("19")) => Action::FetchCorrections(BandGrid::ThirdOctave),
        ("fetch", Some("9")) => Action::FetchCorrections(BandGrid::Audiometric),
        ("push", Some("19")) => Action::PushCorrections(BandGrid::ThirdOctave),
        ("push", Some("9")) => Action::PushCorrections(BandGrid::Audiometric),
        ("preview", Some(f)) => Action::PreviewTemplate(f.to_string()),
        ("gain", f) => Action::FetchGain(gain(f)?),
        ("sweep", f) => Action::StandardSweep(gain(f)?),
        ("chart", Some(kind)) => {
            let kind = match kind {
                "gain" => render::ChartKind::Gain,
                "output" => render::ChartKind::Output,
                _ => return None,
            };
            Action::RenderChart { kind, fields: words.map(str::to_string).collect() }
        }
        ("connect", Some(addr)) => {
            let (host, port) = addr.rsplit_once(':')?;
            let path = words.next().unwrap_or(session::DEFAULT_PATH);
            Action::Connect(session::Endpoint::new(host, port.parse().ok()?, path))
        }
        (function, None) => Action::Invoke(function.to_string()),
        _ => return None,
    };
    Some(action)
}

/// Console front end: load documents, probe the stored server, then run one
/// action per stdin line and print every event as a JSON line.
pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let paths = config::AppPaths::detect();
    info!("Working directory {:?}", paths.root);
    let mut coord = Coordinator::open(&paths, config::SessionSettings::default())?;

    let stored = coord.engine().client().endpoint();
    let mut pending = vec![coord.spawn(Action::Connect(stored))];

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(text) => match parse_line(&text) {
                    Some(action) => pending.push(coord.spawn(action)),
                    None => warn!("Unrecognized input: {}", text.trim()),
                },
                None => break,
            },
            Some(event) = coord.next_event() => print_event(&event),
        }
    }

    for handle in pending {
        if let Err(e) = handle.await {
            warn!("Worker ended abnormally: {}", e);
        }
    }
    for event in coord.drain() {
        print_event(&event);
    }
    Ok(())
}

fn print_event(event: &UiEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{}", line),
        Err(e) => warn!("Unprintable event: {}", e),
    }
}
