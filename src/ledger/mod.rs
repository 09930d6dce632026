mod core;

pub use core::{TransactionKind, TransactionRecord, create_ledger_table, recent};
pub(crate) use core::append;
