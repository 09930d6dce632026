//! Defines the legacy card-tap endpoint that registers unknown cards.
//!
//! This route is only mounted when card provisioning is switched on, the
//! authenticated flow goes through [crate::teller::authenticate_endpoint].

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Serialize;

use crate::{AppState, db::with_connection, money::Money, teller::provision_tag};

/// The state needed to provision cards.
#[derive(Debug, Clone)]
pub struct ProvisionState {
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The opening balance for newly registered cards.
    pub default_balance: Money,
}

impl FromRef<AppState> for ProvisionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            default_balance: state.config.default_balance,
        }
    }
}

#[derive(Debug, Serialize)]
struct ProvisionResponse {
    rfid_tag: String,
    balance: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<&'static str>,
}

/// A route handler for a card tap, responds with the balance for the card
/// `tag` and registers the card first if it is unknown.
pub async fn provision_endpoint(
    State(state): State<ProvisionState>,
    Path(tag): Path<String>,
) -> Response {
    match with_connection(&state.db_connection, |connection| {
        provision_tag(&tag, state.default_balance, connection)
    }) {
        Ok(provisioned) => Json(ProvisionResponse {
            rfid_tag: provisioned.account.tag,
            balance: provisioned.account.balance,
            note: provisioned
                .created
                .then_some("New user created with default balance"),
        })
        .into_response(),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Path, State},
        http::StatusCode,
    };
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{
        account::{DEFAULT_BALANCE, seed_account},
        db::initialize,
        money::Money,
        test_utils::body_json,
    };

    use super::{ProvisionState, provision_endpoint};

    fn get_test_state() -> ProvisionState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        seed_account("49375347824", "Jomar", Money::from_major(500), "1234", &conn).unwrap();

        ProvisionState {
            db_connection: Arc::new(Mutex::new(conn)),
            default_balance: DEFAULT_BALANCE,
        }
    }

    #[tokio::test]
    async fn registers_unknown_card() {
        let state = get_test_state();

        let response = provision_endpoint(State(state.clone()), Path("XYZ".to_owned())).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({
                "rfid_tag": "XYZ",
                "balance": 100.0,
                "note": "New user created with default balance"
            })
        );

        let response = provision_endpoint(State(state), Path("XYZ".to_owned())).await;
        assert_eq!(
            body_json(response).await,
            json!({"rfid_tag": "XYZ", "balance": 100.0})
        );
    }

    #[tokio::test]
    async fn known_card_keeps_its_balance() {
        let response =
            provision_endpoint(State(get_test_state()), Path("49375347824".to_owned())).await;

        assert_eq!(
            body_json(response).await,
            json!({"rfid_tag": "49375347824", "balance": 500.0})
        );
    }
}
