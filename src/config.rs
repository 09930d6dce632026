//! Settings that control how the kiosk behaves.

use std::time::Duration;

use crate::{account::DEFAULT_BALANCE, money::Money};

/// The fee charged on every withdrawal unless configured otherwise.
pub const DEFAULT_WITHDRAWAL_FEE: Money = Money::from_major(18);

/// The settings for the kiosk.
#[derive(Debug, Clone, PartialEq)]
pub struct AtmConfig {
    /// The fixed fee charged on top of every withdrawal.
    pub withdrawal_fee: Money,

    /// The opening balance for cards registered by the legacy card tap.
    pub default_balance: Money,

    /// The number of transactions to list when the client does not ask for a
    /// specific number.
    pub history_limit: u32,

    /// Whether to mount the legacy card-tap route that registers unknown
    /// cards. Off by default so that unknown cards are always rejected.
    pub allow_card_provisioning: bool,

    /// How long to wait for the printer before giving up on a receipt.
    pub receipt_timeout: Duration,

    /// How many hardware events may queue up before new events are dropped.
    pub event_buffer: usize,
}

impl Default for AtmConfig {
    fn default() -> Self {
        Self {
            withdrawal_fee: DEFAULT_WITHDRAWAL_FEE,
            default_balance: DEFAULT_BALANCE,
            history_limit: 10,
            allow_card_provisioning: false,
            receipt_timeout: Duration::from_secs(2),
            event_buffer: 64,
        }
    }
}
