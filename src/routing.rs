//! Application router configuration.

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

use crate::{
    AppState,
    card_session::{current_card_endpoint, insert_card_endpoint, remove_card_endpoint},
    endpoints,
    hardware::keypad_socket_endpoint,
    teller::{
        authenticate_endpoint, balance_endpoint, deposit_endpoint, history_endpoint,
        provision_endpoint, verify_pin_endpoint, withdraw_endpoint,
    },
};

/// Return a router with all the app's routes.
///
/// The legacy card-tap route that registers unknown cards is only added when
/// [crate::AtmConfig::allow_card_provisioning] is set.
pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route(endpoints::ROOT, get(get_status))
        .route(endpoints::AUTHENTICATE, post(authenticate_endpoint))
        .route(endpoints::VERIFY_PIN, post(verify_pin_endpoint))
        .route(endpoints::DEPOSIT, post(deposit_endpoint))
        .route(endpoints::WITHDRAW, post(withdraw_endpoint))
        .route(endpoints::BALANCE, get(balance_endpoint))
        .route(endpoints::TRANSACTIONS, get(history_endpoint))
        .route(endpoints::CARD_INSERT, post(insert_card_endpoint))
        .route(endpoints::CARD_REMOVE, post(remove_card_endpoint))
        .route(endpoints::CARD_CURRENT, get(current_card_endpoint))
        .route(endpoints::KEYPAD_SOCKET, get(keypad_socket_endpoint));

    let router = if state.config.allow_card_provisioning {
        tracing::warn!("Card provisioning is enabled, unknown cards will be registered on tap");
        router.route(
            endpoints::CARD_TAP,
            get(provision_endpoint).post(provision_endpoint),
        )
    } else {
        router
    };

    router.fallback(get_404_not_found).with_state(state)
}

async fn get_status() -> Response {
    Json(json!({ "message": "Mini ATM backend is running" })).into_response()
}

async fn get_404_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "the requested resource could not be found" })),
    )
        .into_response()
}
