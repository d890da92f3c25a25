//! `TableServer` builder, accept loop, and per-socket tasks.
//!
//! Each accepted websocket gets its own task: it registers a session, spawns
//! that session's watchdog, replays the current room snapshot, then pumps
//! frames both ways until either side closes. All state changes go through
//! the [`SyncController`].

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tablesync_protocol::{Codec, ErrorCode, RoomId, ServerEvent};
use tablesync_room::RoomConfig;
use tablesync_session::{run_watchdog, SessionConfig, SessionOutbound};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::Message;

use crate::{SyncContext, SyncController, SyncError};

/// Builder for configuring and binding a [`TableServer`].
pub struct TableServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
    session_config: SessionConfig,
}

impl TableServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:9000".to_string(),
            room_config: RoomConfig::default(),
            session_config: SessionConfig::default(),
        }
    }

    /// Sets the address to bind to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Binds the listener and assembles the shared state.
    pub async fn build(self) -> Result<TableServer, SyncError> {
        let listener = TcpListener::bind(&self.bind_addr).await?;
        tracing::info!(addr = %self.bind_addr, "listener bound");
        let ctx = Arc::new(SyncContext::new(
            self.room_config,
            self.session_config,
        ));
        Ok(TableServer { listener, ctx })
    }
}

impl Default for TableServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound tablesync server. Call [`run()`](Self::run) to start accepting.
pub struct TableServer {
    listener: TcpListener,
    ctx: Arc<SyncContext>,
}

impl TableServer {
    pub fn builder() -> TableServerBuilder {
        TableServerBuilder::new()
    }

    /// The address the listener actually bound (useful with port 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle to the shared state, for seeding rooms or inspection.
    pub fn context(&self) -> Arc<SyncContext> {
        Arc::clone(&self.ctx)
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), SyncError> {
        tracing::info!("tablesync server running");
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        if let Err(e) = handle_socket(ctx, stream, addr).await
                        {
                            tracing::debug!(
                                %addr,
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Extracts the room id from a `/ws/{room_id}` request path.
fn room_id_from_path(path: &str) -> Option<RoomId> {
    let rest = path.strip_prefix("/ws/")?.trim_matches('/');
    (!rest.is_empty()).then(|| RoomId::new(rest))
}

/// Drives one websocket from handshake to disconnect.
async fn handle_socket(
    ctx: Arc<SyncContext>,
    stream: TcpStream,
    addr: SocketAddr,
) -> Result<(), SyncError> {
    let mut path = String::new();
    let ws = tokio_tungstenite::accept_hdr_async(
        stream,
        |req: &Request, resp: Response| {
            path = req.uri().path().to_string();
            Ok(resp)
        },
    )
    .await?;
    tracing::debug!(%addr, %path, "websocket accepted");

    let (mut sink, mut source) = ws.split();

    let Some(room_id) = room_id_from_path(&path) else {
        let event = ServerEvent::error(
            ErrorCode::RoomMissing,
            format!("unroutable path {path}, expected /ws/{{room_id}}"),
            false,
        );
        let _ = sink.send(Message::Text(ctx.codec.encode(&event)?.into())).await;
        let _ = sink.close().await;
        return Ok(());
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let session_id = ctx.sessions.lock().await.register(room_id.clone(), tx);
    let watchdog = tokio::spawn(run_watchdog(
        Arc::clone(&ctx.sessions),
        session_id,
        ctx.session_config.clone(),
    ));
    ctx.sessions.lock().await.set_watchdog(session_id, watchdog);

    let controller = SyncController::new(Arc::clone(&ctx));
    controller.connect_snapshot(session_id).await;

    loop {
        tokio::select! {
            outbound = rx.recv() => match outbound {
                Some(SessionOutbound::Event(event)) => {
                    let text = ctx.codec.encode(&event)?;
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Some(SessionOutbound::Close) | None => {
                    let _ = sink.close().await;
                    break;
                }
            },
            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    controller.handle_event(session_id, text.as_str()).await;
                }
                Some(Ok(Message::Binary(data))) => {
                    match std::str::from_utf8(&data) {
                        Ok(text) => {
                            controller.handle_event(session_id, text).await;
                        }
                        Err(_) => {
                            let _ = ctx.sessions.lock().await.send_to(
                                session_id,
                                ServerEvent::error(
                                    ErrorCode::InvalidEvent,
                                    "binary frames must be utf-8 json",
                                    true,
                                ),
                            );
                        }
                    }
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                    // Control frames count as liveness.
                    ctx.sessions.lock().await.touch(session_id);
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Frame(_))) => {}
                Some(Err(e)) => {
                    tracing::debug!(session_id = %session_id, error = %e, "recv error");
                    break;
                }
            },
        }
    }

    controller.handle_disconnect(session_id).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_id_from_path_extracts_id() {
        assert_eq!(room_id_from_path("/ws/lobby"), Some(RoomId::new("lobby")));
        assert_eq!(
            room_id_from_path("/ws/table-7/"),
            Some(RoomId::new("table-7"))
        );
    }

    #[test]
    fn test_room_id_from_path_rejects_bad_paths() {
        assert_eq!(room_id_from_path("/"), None);
        assert_eq!(room_id_from_path("/ws/"), None);
        assert_eq!(room_id_from_path("/http/lobby"), None);
    }
}
