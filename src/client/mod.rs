mod command;
mod render;

use command::Command;

use crate::protocol::{self, ClientEvent, ServerEvent};
use crate::ui::{Channel, ChannelError, PreferenceStore, UiController};
use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use url::Url;

const TICK: Duration = Duration::from_millis(250);
const DEFAULT_ROWS: usize = 24;

/// WebSocket-backed outbound channel. Frames are queued for the writer task.
pub struct WsChannel {
    outbound: mpsc::UnboundedSender<ClientEvent>,
    connected: Arc<AtomicBool>,
}

impl Channel for WsChannel {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn emit(&mut self, event: ClientEvent) -> Result<(), ChannelError> {
        if !self.is_connected() {
            return Err(ChannelError::Disconnected);
        }
        self.outbound.send(event).map_err(|_| ChannelError::Closed)
    }
}

/// Preferences kept as a flat JSON object on disk.
pub struct PreferenceFile {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl PreferenceFile {
    pub fn open(path: &Path) -> Result<Self> {
        let values = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring unreadable preference file: {}", e);
                BTreeMap::new()
            })
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }
}

impl PreferenceStore for PreferenceFile {
    fn load(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn store(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        std::fs::write(&self.path, serde_json::to_string_pretty(&self.values)?)?;
        Ok(())
    }
}

/// Hub WebSocket endpoint for an http(s) or ws(s) base address.
pub fn websocket_url(base: &str) -> Result<Url> {
    let mut url = Url::parse(base).with_context(|| format!("invalid hub address: {base}"))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => anyhow::bail!("unsupported scheme: {other}"),
    };
    url.set_scheme(scheme)
        .map_err(|_| anyhow::anyhow!("cannot use scheme {scheme} for {base}"))?;
    url.set_path("/ws");
    Ok(url)
}

enum Inbound {
    Event(ServerEvent),
    Disconnected,
}

fn terminal_rows() -> usize {
    std::env::var("LINES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_ROWS)
}

pub async fn run(base_url: &str, prefs_path: &Path) -> Result<()> {
    let url = websocket_url(base_url)?;
    let prefs = PreferenceFile::open(prefs_path)?;

    info!("Connecting to {}", url);
    let (ws_stream, _) = connect_async(url.as_str())
        .await
        .with_context(|| format!("failed to connect websocket: {url}"))?;
    let (mut writer, mut reader) = ws_stream.split();

    let connected = Arc::new(AtomicBool::new(true));
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientEvent>();
    let (in_tx, mut in_rx) = mpsc::unbounded_channel::<Inbound>();

    let writer_connected = Arc::clone(&connected);
    let writer_task = tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            let text = match protocol::encode(&event) {
                Ok(text) => text,
                Err(e) => {
                    error!("Encoding {} failed: {}", event.name(), e);
                    continue;
                }
            };
            if writer.send(Message::Text(text)).await.is_err() {
                writer_connected.store(false, Ordering::SeqCst);
                break;
            }
        }
    });

    let reader_connected = Arc::clone(&connected);
    let reader_task = tokio::spawn(async move {
        while let Some(message) = reader.next().await {
            match message {
                Ok(Message::Text(text)) => match protocol::decode::<ServerEvent>(&text) {
                    Ok(event) => {
                        if in_tx.send(Inbound::Event(event)).is_err() {
                            return;
                        }
                    }
                    Err(e) => warn!("Ignoring malformed frame: {}", e),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!("websocket read failed: {}", e);
                    break;
                }
            }
        }
        reader_connected.store(false, Ordering::SeqCst);
        let _ = in_tx.send(Inbound::Disconnected);
    });

    let channel = WsChannel {
        outbound: out_tx,
        connected,
    };
    let mut controller = UiController::new(channel, prefs);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(TICK);
    let mut shown = String::new();
    let rows = terminal_rows();

    println!("{}", command::HELP);
    loop {
        let mut reply = None;
        tokio::select! {
            Some(inbound) = in_rx.recv() => match inbound {
                Inbound::Event(event) => controller.handle(event, Instant::now()),
                Inbound::Disconnected => controller.on_disconnect(Instant::now()),
            },
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match command::parse(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(cmd)) => {
                        let rendered = shown.lines().count();
                        reply = command::apply(&mut controller, cmd, rendered, rows, Instant::now());
                    }
                    Ok(None) => {}
                    Err(e) => reply = Some(e.to_string()),
                }
            }
            _ = ticker.tick() => controller.tick(Instant::now()),
        }

        let frame = render::page(controller.page());
        if frame != shown {
            print!("\n{frame}");
            shown = frame;
        }
        if let Some(text) = reply {
            println!("{text}");
        }
    }

    writer_task.abort();
    reader_task.abort();
    Ok(())
}
