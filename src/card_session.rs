//! Tracks which card is in the reader.
//!
//! The session is process-local and not authoritative, it only tells the
//! kiosk front end which card to show. Every money operation still names
//! its card explicitly.

use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::AppState;

/// The card currently inserted in the reader, if any.
#[derive(Debug, Clone, Default)]
pub struct CardSession {
    slot: Arc<Mutex<Option<String>>>,
}

impl CardSession {
    /// Create a session with no card inserted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the card `tag` was inserted, replacing any previous card.
    pub fn insert(&self, tag: &str) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.replace(tag.to_owned()) {
            if previous != tag {
                tracing::debug!("Card {previous:?} replaced by {tag:?} without being removed");
            }
        }
    }

    /// Record that the card was removed, returning the card that was in the
    /// reader.
    pub fn remove(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// The card in the reader.
    pub fn current(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl FromRef<AppState> for CardSession {
    fn from_ref(state: &AppState) -> Self {
        state.card_session.clone()
    }
}

/// A route handler for the card reader reporting an inserted card.
pub async fn insert_card_endpoint(
    State(session): State<CardSession>,
    Path(tag): Path<String>,
) -> Response {
    session.insert(&tag);
    tracing::info!("Card {tag:?} inserted");

    Json(json!({ "status": "inserted", "rfid_tag": tag })).into_response()
}

/// A route handler for the card reader reporting that the card was removed.
pub async fn remove_card_endpoint(State(session): State<CardSession>) -> Response {
    if let Some(tag) = session.remove() {
        tracing::info!("Card {tag:?} removed");
    }

    Json(json!({ "status": "removed" })).into_response()
}

/// A route handler for the card currently in the reader.
pub async fn current_card_endpoint(State(session): State<CardSession>) -> Response {
    Json(json!({ "rfid_tag": session.current() })).into_response()
}
