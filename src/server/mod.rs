use crate::engine::Engine;
use crate::protocol::{self, ClientEvent, ServerEvent};
use anyhow::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

pub fn build_router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_handler))
        .with_state(engine)
}

pub async fn serve(engine: Arc<Engine>, addr: SocketAddr) -> Result<()> {
    let app = build_router(engine);
    info!(%addr, "hub listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn ws_handler(ws: WebSocketUpgrade, State(engine): State<Arc<Engine>>) -> impl IntoResponse {
    let id = Uuid::new_v4();
    ws.on_upgrade(move |socket| {
        ws_connection(engine, socket).instrument(info_span!("connection", %id))
    })
}

async fn ws_connection(engine: Arc<Engine>, socket: WebSocket) {
    info!("Client connected");
    let (mut sender, mut receiver) = socket.split();
    let mut events_rx = engine.subscribe();
    let (direct_tx, mut direct_rx) = mpsc::unbounded_channel::<ServerEvent>();

    if let Some(backlog) = engine.connect().await {
        info!("Sending {} recommendations to new client", backlog.len());
        let _ = direct_tx.send(ServerEvent::MoreMoviesLoaded(backlog));
    }

    let send_task = tokio::spawn(
        async move {
            loop {
                let event = tokio::select! {
                    Some(event) = direct_rx.recv() => event,
                    received = events_rx.recv() => match received {
                        Ok(event) => event,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("Client lagged behind, {} events dropped", skipped);
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                };
                let text = match protocol::encode(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Encoding {} failed: {}", event.name(), e);
                        continue;
                    }
                };
                if sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
        .in_current_span(),
    );

    while let Some(Ok(message)) = receiver.next().await {
        match message {
            Message::Text(text) => match protocol::decode::<ClientEvent>(&text) {
                Ok(event) => dispatch(&engine, event, &direct_tx).await,
                Err(e) => warn!("Ignoring malformed frame: {}", e),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    send_task.abort();
    engine.disconnect().await;
    info!("Client disconnected");
}

/// Routes one client message. Replies meant only for the sender go through
/// `direct`; everything else is broadcast by the engine.
async fn dispatch(engine: &Arc<Engine>, event: ClientEvent, direct: &mpsc::UnboundedSender<ServerEvent>) {
    debug!("Received {}", event.name());
    match event {
        ClientEvent::RequestLibrary => {
            let engine = Arc::clone(engine);
            tokio::spawn(async move { engine.request_library(false).await }.in_current_span());
        }
        ClientEvent::AddMovie(name, year) => {
            let engine = Arc::clone(engine);
            tokio::spawn(async move { engine.add_movie(&name, &year).await }.in_current_span());
        }
        ClientEvent::Start(selected) => {
            if engine.start(selected).await {
                engine.spawn_search();
            }
        }
        ClientEvent::Stop => engine.stop(),
        ClientEvent::UpdateSettings(update) => {
            if let Err(e) = engine.update_settings(update).await {
                error!("Failed to save settings: {}", e);
            }
        }
        ClientEvent::LoadSettings => {
            let settings = engine.client_settings().await;
            let _ = direct.send(ServerEvent::SettingsLoaded(settings));
        }
        ClientEvent::SidebarOpened => {
            if let Some(update) = engine.sidebar_snapshot().await {
                let _ = direct.send(ServerEvent::SidebarUpdate(update));
            }
        }
        ClientEvent::LoadMore => engine.spawn_search(),
    }
}
