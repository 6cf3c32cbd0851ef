//! Long-lived push channel task.
//!
//! Connect, read frames until the connection drops, reconnect with
//! backoff, repeat until cancelled. Parsed messages and connection
//! state changes are forwarded to the engine over an mpsc channel;
//! frames that fail to parse are logged and skipped so one unknown
//! message type never stalls the stream.

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::backoff::Backoff;
use crate::client::PushClient;
use crate::messages::{parse_message, PushMessage};

/// What the channel task reports to the engine.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// A connection was (re)established. The engine triggers a full
    /// state pull on this to recover anything missed while offline.
    Connected,
    /// The connection dropped; a reconnect loop is starting.
    Disconnected,
    /// A parsed push message.
    Message(PushMessage),
}

/// Run the push channel until the cancellation token is triggered.
///
/// Events are delivered through `event_tx`; if the receiving side is
/// dropped the task exits.
pub async fn run_push_channel(
    client: PushClient,
    mut backoff: Backoff,
    event_tx: mpsc::UnboundedSender<ChannelEvent>,
    cancel: CancellationToken,
) {
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let result = tokio::select! {
            _ = cancel.cancelled() => return,
            result = client.connect() => result,
        };

        let conn = match result {
            Ok(conn) => {
                if attempt > 1 {
                    tracing::info!(attempt, "Push connection restored");
                }
                backoff.reset();
                attempt = 0;
                conn
            }
            Err(e) => {
                let delay = backoff.next_delay();
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Push connect failed, retrying",
                );
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
                continue;
            }
        };

        if event_tx.send(ChannelEvent::Connected).is_err() {
            return;
        }

        // Read frames until the connection drops.
        let mut ws_stream = conn.ws_stream;
        read_frames(&mut ws_stream, &event_tx, &cancel).await;

        if event_tx.send(ChannelEvent::Disconnected).is_err() {
            return;
        }

        if cancel.is_cancelled() {
            return;
        }
        tracing::info!("Push connection lost, reconnecting");
    }
}

/// Read WebSocket frames until the connection closes or errors.
///
/// Binary frames are ignored; the backend only pushes JSON text.
async fn read_frames(
    ws_stream: &mut tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    event_tx: &mpsc::UnboundedSender<ChannelEvent>,
    cancel: &CancellationToken,
) {
    loop {
        let msg_result = tokio::select! {
            _ = cancel.cancelled() => return,
            next = ws_stream.next() => match next {
                Some(r) => r,
                None => return, // stream exhausted
            },
        };

        match msg_result {
            Ok(Message::Text(text)) => match parse_message(&text) {
                Ok(msg) => forward(event_tx, msg),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        raw_message = %text,
                        "Failed to parse push message",
                    );
                }
            },
            Ok(Message::Binary(_)) => {
                tracing::trace!("Ignoring binary push frame");
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {
                // Handled automatically by tungstenite.
            }
            Ok(Message::Close(frame)) => {
                tracing::info!(?frame, "Push WebSocket closed");
                return;
            }
            Ok(Message::Frame(_)) => {}
            Err(e) => {
                tracing::error!(error = %e, "WebSocket receive error");
                return;
            }
        }
    }
}

fn forward(event_tx: &mpsc::UnboundedSender<ChannelEvent>, msg: PushMessage) {
    if event_tx.send(ChannelEvent::Message(msg)).is_err() {
        tracing::debug!("Push event receiver dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancellation_stops_the_channel_task() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (tx, _rx) = mpsc::unbounded_channel();

        // Nothing listens on this port; without the cancelled token the
        // task would retry forever.
        run_push_channel(
            PushClient::new("ws://127.0.0.1:9".into()),
            Backoff::default(),
            tx,
            cancel,
        )
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_connects_are_paced_by_the_backoff() {
        let cancel = CancellationToken::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run_push_channel(
            PushClient::new("ws://127.0.0.1:9".into()),
            Backoff::default(),
            tx,
            cancel.clone(),
        ));

        // Let a few refused attempts and their sleeps play out, then
        // shut down; the task must exit instead of sleeping on.
        tokio::time::sleep(std::time::Duration::from_secs(10)).await;
        cancel.cancel();
        task.await.expect("channel task panicked");
    }
}
