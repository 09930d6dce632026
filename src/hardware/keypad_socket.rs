//! Defines the WebSocket that streams keypad presses to the kiosk front end.

use axum::{
    extract::{
        FromRef, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::{AppState, hardware::KeyBroadcaster};

impl FromRef<AppState> for KeyBroadcaster {
    fn from_ref(state: &AppState) -> Self {
        state.key_broadcaster.clone()
    }
}

/// A route handler that upgrades to a WebSocket and sends one text frame
/// per key pressed on the keypad.
///
/// Messages from the client are ignored. Presses made before the socket was
/// opened are not replayed.
pub async fn keypad_socket_endpoint(
    ws: WebSocketUpgrade,
    State(keys): State<KeyBroadcaster>,
) -> Response {
    // Subscribe before the upgrade so no press is lost during the handshake.
    let receiver = keys.subscribe();

    ws.on_upgrade(move |socket| forward_keys(socket, receiver))
}

async fn forward_keys(mut socket: WebSocket, mut keys: broadcast::Receiver<char>) {
    tracing::debug!("Keypad listener connected");

    loop {
        tokio::select! {
            key = keys.recv() => match key {
                Ok(key) => {
                    if socket.send(Message::Text(key.to_string().into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Keypad listener lagged, skipped {skipped} key presses");
                }
                Err(RecvError::Closed) => break,
            },
            message = socket.recv() => match message {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::debug!("Keypad listener disconnected");
}
