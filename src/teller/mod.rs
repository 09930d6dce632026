mod authenticate_endpoint;
mod balance_endpoint;
mod core;
mod deposit_endpoint;
mod history_endpoint;
mod provision_endpoint;
mod withdraw_endpoint;

pub use authenticate_endpoint::{authenticate_endpoint, verify_pin_endpoint};
pub use balance_endpoint::balance_endpoint;
pub use core::{
    Deposit, Provisioned, Withdrawal, authenticate_tag, balance_of, check_pin, deposit, history,
    provision_tag, withdraw,
};
pub use deposit_endpoint::deposit_endpoint;
pub use history_endpoint::history_endpoint;
pub use provision_endpoint::provision_endpoint;
pub use withdraw_endpoint::withdraw_endpoint;
