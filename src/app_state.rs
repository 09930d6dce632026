//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{
    Error, card_session::CardSession, config::AtmConfig, db::initialize,
    hardware::KeyBroadcaster, receipt::ReceiptSink,
};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,

    /// The settings for the kiosk.
    pub config: AtmConfig,

    /// The card currently in the reader.
    pub card_session: CardSession,

    /// Fans keypad presses out to the connected front ends.
    pub key_broadcaster: KeyBroadcaster,

    /// Where to print receipts.
    pub receipt_sink: Arc<dyn ReceiptSink>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        config: AtmConfig,
        receipt_sink: Arc<dyn ReceiptSink>,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            db_connection: Arc::new(Mutex::new(db_connection)),
            config,
            card_session: CardSession::new(),
            key_broadcaster: KeyBroadcaster::default(),
            receipt_sink,
        })
    }
}
