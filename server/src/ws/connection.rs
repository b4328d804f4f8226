//! WebSocket Connection Management - Gestione connessioni WebSocket

use crate::dtos::{MessageDTO, WsEventDTO};
use crate::ws::feed::MessageEvent;
use crate::ws::{BATCH_INTERVAL, BATCH_MAX_SIZE, TIMEOUT_DURATION_SECONDS};
use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::Receiver;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::time::{Duration, interval, timeout};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Segnali interni tra il task di lettura e quello di scrittura
pub enum InternalSignal {
    Shutdown,
}

#[instrument(skip(ws, feed_rx), fields(user_id = %user_id))]
pub async fn handle_socket(ws: WebSocket, user_id: Uuid, feed_rx: Receiver<Arc<MessageEvent>>) {
    info!("WebSocket connection established");

    // Dividiamo il WebSocket in due metà: sender e receiver
    let (ws_tx, ws_rx) = ws.split();

    let (int_tx, int_rx) = unbounded_channel::<InternalSignal>();

    tokio::spawn(listen_ws(user_id, ws_rx, int_tx));
    tokio::spawn(write_ws(user_id, ws_tx, int_rx, feed_rx));
}

#[instrument(skip(websocket_tx, internal_rx, feed_rx), fields(user_id = %user_id))]
pub async fn write_ws(
    user_id: Uuid,
    mut websocket_tx: SplitSink<WebSocket, Message>,
    mut internal_rx: UnboundedReceiver<InternalSignal>,
    feed_rx: Receiver<Arc<MessageEvent>>,
) {
    info!("Write task started");

    let mut feed = BroadcastStream::new(feed_rx);
    let mut batch: Vec<WsEventDTO> = Vec::new();
    let mut interval = interval(Duration::from_millis(BATCH_INTERVAL));
    interval.tick().await; // Consuma primo tick immediato

    'external: loop {
        tokio::select! {
            next = feed.next() => {
                match next {
                    Some(Ok(event)) => {
                        if !event.concerns(&user_id) {
                            continue;
                        }
                        batch.push(WsEventDTO::NewMessage(MessageDTO::from(event.message.clone())));
                        if batch.len() >= BATCH_MAX_SIZE {
                            if send_batch(&mut websocket_tx, &batch).await.is_err() {
                                warn!("Failed to send batch, closing connection");
                                break 'external;
                            }
                            debug!(batch_size = batch.len(), "Batch sent");
                            batch.clear();
                        }
                    }
                    Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                        warn!(skipped, "Feed receiver lagged, events dropped");
                        batch.push(WsEventDTO::Lagged { skipped });
                    }
                    None => {
                        info!("Message feed closed");
                        break 'external;
                    }
                }
            }

            // invia anche batch non pieni, altrimenti il client aspetterebbe troppo
            _ = interval.tick() => {
                if !batch.is_empty() {
                    if send_batch(&mut websocket_tx, &batch).await.is_err() {
                        warn!("Failed to send batch on interval, closing connection");
                        break 'external;
                    }
                    debug!(batch_size = batch.len(), "Batch sent on interval");
                    batch.clear();
                }
            }

            signal = internal_rx.recv() => {
                match signal {
                    Some(InternalSignal::Shutdown) => {
                        info!("Shutdown signal received");
                        break 'external;
                    }
                    None => {
                        info!("Internal channel closed");
                        break 'external;
                    }
                }
            }
        }
    }

    // Invia batch finale prima di terminare
    if !batch.is_empty() {
        info!(batch_size = batch.len(), "Sending final batch before shutdown");
        let _ = send_batch(&mut websocket_tx, &batch).await;
    }
    let _ = websocket_tx.close().await;

    info!("Write task terminated");
}

#[instrument(skip(websocket_tx, batch))]
async fn send_batch(
    websocket_tx: &mut SplitSink<WebSocket, Message>,
    batch: &[WsEventDTO],
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(&batch).map_err(|e| {
        error!("Failed to serialize batch: {:?}", e);
        axum::Error::new(e)
    })?;
    websocket_tx
        .send(Message::Text(Utf8Bytes::from(json)))
        .await
        .map_err(|e| {
            error!("Failed to send batch through WebSocket: {:?}", e);
            e
        })
}

/// Il client non invia eventi applicativi: il task di lettura serve solo a rilevare
/// chiusura, errori e inattività
#[instrument(skip(websocket_rx, internal_tx), fields(user_id = %user_id))]
pub async fn listen_ws(
    user_id: Uuid,
    mut websocket_rx: SplitStream<WebSocket>,
    internal_tx: UnboundedSender<InternalSignal>,
) {
    info!("Listen task started");

    let timeout_duration = Duration::from_secs(TIMEOUT_DURATION_SECONDS);

    loop {
        match timeout(timeout_duration, websocket_rx.next()).await {
            Ok(Some(Ok(Message::Close(_)))) => {
                info!("Close message received");
                break;
            }
            Ok(Some(Ok(_))) => {}
            Ok(Some(Err(e))) => {
                warn!("WebSocket error: {:?}", e);
                break;
            }
            Ok(None) => {
                info!("WebSocket stream ended");
                break;
            }
            Err(_) => {
                warn!(timeout_secs = TIMEOUT_DURATION_SECONDS, "Connection timeout");
                break;
            }
        }
    }

    let _ = internal_tx.send(InternalSignal::Shutdown);
    info!("Listen task terminated");
}
