mod core;

pub use core::{
    Account, AccountId, DEFAULT_BALANCE, create_account_table, create_default, find_by_tag,
    seed_account, verify_pin,
};
pub(crate) use core::update_balance;
