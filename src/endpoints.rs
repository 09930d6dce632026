//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/accounts/{tag}/balance', use [format_endpoint].

/// The status route, reports that the backend is up.
pub const ROOT: &str = "/";
/// The route for checking that a card is registered.
pub const AUTHENTICATE: &str = "/api/authenticate";
/// The route for checking the PIN for a card.
pub const VERIFY_PIN: &str = "/api/verify_pin";
/// The route for paying money into an account.
pub const DEPOSIT: &str = "/api/accounts/{tag}/deposit";
/// The route for taking cash out of an account.
pub const WITHDRAW: &str = "/api/accounts/{tag}/withdraw";
/// The route for balance inquiries.
pub const BALANCE: &str = "/api/accounts/{tag}/balance";
/// The route for the recent transactions of an account.
pub const TRANSACTIONS: &str = "/api/accounts/{tag}/transactions";
/// The route the card reader calls when a card is inserted.
pub const CARD_INSERT: &str = "/rfid/insert/{tag}";
/// The route the card reader calls when the card is removed.
pub const CARD_REMOVE: &str = "/rfid/remove";
/// The route for the currently inserted card.
pub const CARD_CURRENT: &str = "/rfid/current";
/// The legacy card-tap route that registers unknown cards.
pub const CARD_TAP: &str = "/rfid/{tag}";
/// The WebSocket that streams keypad presses.
pub const KEYPAD_SOCKET: &str = "/ws/keypad";

/// Replace the parameter in `endpoint_path` with `value`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/rfid/{tag}', '{tag}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, value: &str) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|offset| param_start + offset + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        value,
        &endpoint_path[param_end..]
    )
}

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    use super::format_endpoint;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok());
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::ROOT);
        assert_endpoint_is_valid_uri(endpoints::AUTHENTICATE);
        assert_endpoint_is_valid_uri(endpoints::VERIFY_PIN);
        assert_endpoint_is_valid_uri(endpoints::DEPOSIT);
        assert_endpoint_is_valid_uri(endpoints::WITHDRAW);
        assert_endpoint_is_valid_uri(endpoints::BALANCE);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTIONS);
        assert_endpoint_is_valid_uri(endpoints::CARD_INSERT);
        assert_endpoint_is_valid_uri(endpoints::CARD_REMOVE);
        assert_endpoint_is_valid_uri(endpoints::CARD_CURRENT);
        assert_endpoint_is_valid_uri(endpoints::CARD_TAP);
        assert_endpoint_is_valid_uri(endpoints::KEYPAD_SOCKET);
    }

    #[test]
    fn produces_valid_uri() {
        let formatted_path = format_endpoint(endpoints::BALANCE, "49375347824");

        assert_eq!(formatted_path, "/api/accounts/49375347824/balance");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }

    #[test]
    fn returns_original_path_with_no_parameter() {
        let formatted_path = format_endpoint("/rfid/remove", "XYZ");

        assert_eq!(formatted_path, "/rfid/remove");
    }

    #[test]
    fn parameter_at_end() {
        let formatted_path = format_endpoint(endpoints::CARD_TAP, "XYZ");

        assert_eq!(formatted_path, "/rfid/XYZ");
    }
}
