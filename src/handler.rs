//! Connection handler
//!
//! Handles individual client connections: line framing, the outbound writer
//! task, and driving a `ClientSession` until exit, EOF, a read error or
//! eviction for not keeping up with its outbound queue.

use futures_util::stream::Stream;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::codec::{ChatCodec, CodecError};
use crate::config::Limits;
use crate::error::AppError;
use crate::participant::Outbound;
use crate::server::ServerHandle;
use crate::session::ClientSession;
use crate::types::ClientId;

/// Accept connections forever, one task per connection
pub async fn serve(listener: TcpListener, server: ServerHandle, limits: Limits) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let server = server.clone();

                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, server, limits).await {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Handle one client connection
///
/// The participant is always unregistered before this returns. Lines queued
/// for the client are flushed before the stream is dropped, unless the
/// client was evicted, in which case they are discarded.
pub async fn handle_connection<S>(
    stream: S,
    server: ServerHandle,
    limits: Limits,
) -> Result<(), AppError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let framed = Framed::new(stream, ChatCodec::new(limits.max_line_length));
    let (mut line_sender, mut line_receiver) = framed.split();

    let client_id = ClientId::new();
    info!("Client {} connected", client_id);

    // Bounded channel for server -> client messages
    let (msg_tx, mut msg_rx) = Outbound::channel(limits.outbound_capacity);
    let evicted = msg_tx.eviction_token();

    // Spawn write task (ServerMessage -> socket)
    let write_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            if line_sender.send(msg.to_string()).await.is_err() {
                debug!("Socket send failed, ending write task");
                break;
            }
        }
        debug!("Write task ended for client");
        let _ = line_sender.close().await;
    });

    let mut session = ClientSession::new(client_id, server, msg_tx);
    let result = drive(&mut session, &mut line_receiver, &evicted).await;

    // Unregister even when the read side failed
    let closed = session.close().await;
    drop(session);

    if evicted.is_cancelled() {
        // the writer may be stuck on a peer that does not read
        write_task.abort();
        info!("Client {} evicted", client_id);
    } else {
        let _ = write_task.await;
        info!("Client {} disconnected", client_id);
    }

    result.and(closed)
}

async fn drive<R>(
    session: &mut ClientSession,
    lines: &mut R,
    evicted: &CancellationToken,
) -> Result<(), AppError>
where
    R: Stream<Item = Result<String, CodecError>> + Unpin,
{
    session.open()?;

    loop {
        let line = tokio::select! {
            _ = evicted.cancelled() => {
                warn!("Client {} fell behind its outbound queue", session.client_id());
                return Err(AppError::SlowReader);
            }
            line = lines.next() => line,
        };

        match line {
            Some(Ok(line)) => {
                session.handle_line(&line).await?;
                if session.is_terminated() {
                    debug!("Session {} terminated", session.client_id());
                    break;
                }
            }
            Some(Err(e)) => {
                warn!("Read error for {}: {}", session.client_id(), e);
                return Err(e.into());
            }
            None => break,
        }
    }

    Ok(())
}
