use crate::config::ReconnectPolicy;
use agenda_core::ConnectionEvent;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum SessionEnd {
    Closed(Option<String>),
    Failed(String),
    Shutdown,
}

/// Owns the WebSocket to the agenda server. Lifecycle events and inbound text
/// go to `events` in arrival order; text received on `outbound` is sent while
/// a connection is open. Returns when the controller hangs up or when the
/// connection ends and `policy` does not allow another attempt.
pub async fn connection_loop(
    url: Url,
    policy: ReconnectPolicy,
    events: mpsc::Sender<ConnectionEvent>,
    mut outbound: mpsc::Receiver<String>,
) {
    let mut backoff = policy.initial_backoff();
    loop {
        if events.send(ConnectionEvent::Connecting).await.is_err() {
            return;
        }
        let mut ws = match connect_async(url.clone()).await {
            Ok((ws, _)) => ws,
            Err(err) => {
                warn!("ws_connect_error: {err}");
                if events
                    .send(ConnectionEvent::Errored(err.to_string()))
                    .await
                    .is_err()
                {
                    return;
                }
                if wait_before_retry(&policy, &mut backoff).await {
                    continue;
                }
                return;
            }
        };
        backoff = policy.initial_backoff();
        info!("ws_connected: {url}");

        // Requests queued for an earlier connection are stale now.
        while outbound.try_recv().is_ok() {}

        if events.send(ConnectionEvent::Opened).await.is_err() {
            let _ = ws.close(None).await;
            return;
        }

        let end = run_session(&mut ws, &events, &mut outbound).await;
        let _ = ws.close(None).await;
        let event = match end {
            SessionEnd::Closed(reason) => ConnectionEvent::Closed(reason),
            SessionEnd::Failed(err) => ConnectionEvent::Errored(err),
            SessionEnd::Shutdown => return,
        };
        if events.send(event).await.is_err() {
            return;
        }
        if !wait_before_retry(&policy, &mut backoff).await {
            info!("ws_reconnect_disabled; staying offline");
            return;
        }
    }
}

async fn run_session(
    ws: &mut Socket,
    events: &mpsc::Sender<ConnectionEvent>,
    outbound: &mut mpsc::Receiver<String>,
) -> SessionEnd {
    loop {
        tokio::select! {
            incoming = ws.next() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                        Ok(text) => text,
                        Err(_) => {
                            debug!("ws_binary_ignored");
                            continue;
                        }
                    },
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame
                            .map(|frame| frame.reason.to_string())
                            .filter(|reason| !reason.is_empty());
                        return SessionEnd::Closed(reason);
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(err)) => return SessionEnd::Failed(err.to_string()),
                    None => return SessionEnd::Closed(None),
                };
                if events.send(ConnectionEvent::Message(text)).await.is_err() {
                    return SessionEnd::Shutdown;
                }
            }
            out = outbound.recv() => {
                let Some(text) = out else {
                    return SessionEnd::Shutdown;
                };
                if let Err(err) = ws.send(Message::Text(text)).await {
                    return SessionEnd::Failed(err.to_string());
                }
            }
        }
    }
}

async fn wait_before_retry(policy: &ReconnectPolicy, backoff: &mut Option<Duration>) -> bool {
    let Some(delay) = *backoff else {
        return false;
    };
    debug!("ws_retry_in: {delay:?}");
    tokio::time::sleep(delay).await;
    *backoff = policy.next_backoff(delay);
    true
}
