//! WebSocket transport for the channel runtime.
//!
//! Each accepted TCP connection becomes one [`Socket`]. Client frames are
//! binary protobuf [`ClientFrame`]s; everything the server emits is written
//! as binary [`ServerFrame`]s by a dedicated writer task.
//!
//! # Security
//!
//! - With `loopback_only`, peers outside the loopback range are dropped
//!   before the WebSocket handshake
//! - Authentication is not decided here: install a gate with
//!   [`authenticate_socket`](crate::auth::authenticate_socket)

use crate::config::ServerConfig;
use crate::error::gate::GateError;
use crate::proto::{ClientFrame, FrameKind};
use crate::runtime::{ERROR_EVENT, OUTBOUND_BUFFER, Outbound, ROOT_NAMESPACE, Server, Socket};
use crate::transport::handle::GateServerHandle;

use common::ErrorLocation;

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use prost::Message as ProstMessage;
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn as TokioSpawn;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsSource = SplitStream<WebSocketStream<TcpStream>>;

/// Starts the gate's WebSocket server.
///
/// Binds `{bind}:{port}` (port 0 picks a free port) and spawns a background
/// task that accepts connections and hands each one to `server`.
///
/// # Errors
///
/// Returns [`GateError::Io`] if the address cannot be bound.
pub async fn start_gate_server(
    config: &ServerConfig,
    server: Arc<Server>,
) -> Result<GateServerHandle, GateError> {
    let address = format!("{}:{}", config.bind, config.port);
    let listener = TcpListener::bind(&address).await?;
    let local_addr = listener.local_addr()?;
    let loopback_only = config.loopback_only;

    info!("Gate server listening on {}", local_addr);

    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    TokioSpawn(async move {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("Gate server on {} stopped accepting", local_addr);
                    break;
                }
                accepted = listener.accept() => {
                    let (stream, addr) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            error!("Accept failed on {}: {}", local_addr, e);
                            break;
                        }
                    };
                    info!("Client connecting from {}", addr);
                    let server = Arc::clone(&server);
                    TokioSpawn(async move {
                        if let Err(e) = handle_connection(stream, addr, server, loopback_only).await {
                            error!("Connection from {} failed: {}", addr, e);
                        }
                    });
                }
            }
        }
    });

    Ok(GateServerHandle::new(local_addr, shutdown_tx))
}

/// Serves one connection from handshake to removal.
///
/// 1. Rejects non-loopback peers when configured to
/// 2. Performs the WebSocket handshake
/// 3. Registers a socket with the server and starts its writer
/// 4. Reads frames until the client leaves or the socket is told to close
/// 5. Removes the socket, which publishes its disconnect event
/// 6. Aborts the writer of a slow client instead of draining its backlog
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    server: Arc<Server>,
    loopback_only: bool,
) -> Result<(), GateError> {
    if loopback_only && !addr.ip().is_loopback() {
        warn!("Rejected non-loopback connection from {}", addr);
        return Ok(());
    }

    let ws_stream = accept_async(stream).await.map_err(|e| GateError::Handshake {
        message: format!("WebSocket handshake failed: {e}"),
        location: ErrorLocation::caller(),
    })?;

    let (write, mut read) = ws_stream.split();
    let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
    let socket = server.accept(tx).await;
    info!("Client {} connected as socket {}", addr, socket.id());

    let writer = TokioSpawn(write_frames(write, rx));
    let reason = read_frames(&mut read, &server, &socket, addr).await;

    server.remove(&socket, reason).await;

    // No close frame made it into the queue, so the writer would never stop.
    if socket.is_backlogged() {
        warn!("Dropping unsent frames for slow client {}", addr);
        writer.abort();
    }

    match writer.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("Writer for {} ended with error: {}", addr, e),
        Err(e) if e.is_cancelled() => debug!("Writer for {} aborted", addr),
        Err(e) => error!("Writer task for {} panicked: {}", addr, e),
    }

    info!("Client {} disconnected ({})", addr, reason);
    Ok(())
}

/// Returns why reading stopped.
async fn read_frames(
    read: &mut WsSource,
    server: &Server,
    socket: &Arc<Socket>,
    addr: SocketAddr,
) -> &'static str {
    loop {
        tokio::select! {
            _ = socket.closed() => return "server disconnect",
            msg = read.next() => match msg {
                Some(Ok(Message::Binary(data))) => {
                    if let Err(e) = handle_frame(server, socket, &data).await {
                        warn!("Bad frame from {}: {}", addr, e);
                        let _ = socket.emit(ERROR_EVENT, &json!({ "message": "Invalid frame" }));
                    }
                }
                Some(Ok(Message::Close(_))) | None => return "client disconnect",
                Some(Ok(_)) => debug!("Ignoring non-binary message from {}", addr),
                Some(Err(e)) => {
                    error!("Read error from {}: {}", addr, e);
                    return "transport error";
                }
            }
        }
    }
}

async fn handle_frame(server: &Server, socket: &Arc<Socket>, data: &[u8]) -> Result<(), GateError> {
    let frame = ClientFrame::decode(data)?;
    let kind = FrameKind::try_from(frame.kind).map_err(|_| GateError::ProtobufDecode {
        message: format!("Unknown frame kind: {}", frame.kind),
        location: ErrorLocation::caller(),
    })?;

    let namespace = if frame.namespace.is_empty() {
        ROOT_NAMESPACE
    } else {
        frame.namespace.as_str()
    };
    if !namespace.starts_with('/') {
        return Err(GateError::read(format!("Invalid namespace: {namespace:?}")));
    }

    match kind {
        FrameKind::Connect => {
            server.join(socket, namespace).await;
        }
        FrameKind::Disconnect => {
            server.leave(socket, namespace).await;
        }
        FrameKind::Event => {
            let payload = frame.payload()?;
            server.dispatch(socket, namespace, &frame.event, payload).await;
        }
    }
    Ok(())
}

/// Drains the socket's outbound queue until a close is requested.
async fn write_frames(
    mut write: WsSink,
    mut rx: mpsc::Receiver<Outbound>,
) -> Result<(), GateError> {
    while let Some(outbound) = rx.recv().await {
        match outbound {
            Outbound::Frame(frame) => {
                write.send(Message::Binary(frame.encode_to_vec().into())).await?;
            }
            Outbound::Close => {
                write.send(Message::Close(None)).await?;
                break;
            }
        }
    }
    Ok(())
}
