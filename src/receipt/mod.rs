mod core;
mod printer;

pub use core::{Receipt, ReceiptKind, render_receipt};
pub use printer::{DevicePrinter, LogPrinter, ReceiptSink, print_receipt};

#[cfg(test)]
pub(crate) use printer::test_utils;
