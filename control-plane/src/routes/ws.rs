use axum::extract::ws::{Message, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use cp_core::ids::UserId;
use cp_core::ws::{relay_with_broadcast, WsStream};
use cp_events::ActivityStreamItem;
use cp_security::AuthenticatedUser;

use crate::state::AppState;

/// Persistent connection from the browser extension. Inbound frames are
/// dispatched through the bridge; outbound frames are whatever `send()`
/// callers queue for this user.
pub async fn extension(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse, cp_core::error::AppError> {
    user.authorize_path_user(&user_id)?;
    Ok(ws.on_upgrade(move |socket| async move {
        let mut stream = WsStream::new(socket);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        state.bridge.connect(user_id.clone(), tx);

        loop {
            tokio::select! {
                outbound = rx.recv() => {
                    match outbound {
                        Some(frame) => {
                            if stream.send_json(&frame).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                inbound = stream.next_json::<serde_json::Value>() => {
                    match inbound {
                        Some(Ok(value)) => state.bridge.on_frame(&user_id, value).await,
                        Some(Err(_)) => continue,
                        None => break,
                    }
                }
            }
        }

        state.bridge.disconnect(&user_id);
    }))
}

/// Live subscription to the Activity Event Bus. A `Lagging` signal is
/// terminal: the client is told, then the connection is closed so it can
/// re-subscribe and re-fetch history to recover the gap.
pub async fn activity(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse, cp_core::error::AppError> {
    user.authorize_path_user(&user_id)?;
    Ok(ws.on_upgrade(move |socket| async move {
        let mut stream = WsStream::new(socket);
        let mut sub = state.events.subscribe(&user_id);

        loop {
            match sub.recv().await {
                Some(ActivityStreamItem::Event(event)) => {
                    if stream.send_json(&event).await.is_err() {
                        break;
                    }
                }
                Some(ActivityStreamItem::Lagging { missed }) => {
                    let _ = stream
                        .send_json(&serde_json::json!({ "event": "lagging", "missed": missed }))
                        .await;
                    let _ = stream.send(Message::Close(None)).await;
                    break;
                }
                None => break,
            }
        }
    }))
}

/// Push channel for run events, for clients that prefer a live socket over
/// the implicit event stream `start` returns.
pub async fn agent(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse, cp_core::error::AppError> {
    user.authorize_path_user(&user_id)?;
    Ok(ws.on_upgrade(move |socket| async move {
        let stream = WsStream::new(socket);
        let rx = state.runs.push_channel().room(user_id.as_str()).subscribe();
        relay_with_broadcast::<serde_json::Value, _, _>(stream, rx, |_| async {}).await;
    }))
}
