//! Sinks that put rendered receipts on paper.
//!
//! Printing is best-effort: it happens after the transaction has committed,
//! runs on the blocking thread pool with a timeout, and a failure only turns
//! into a warning for the client.

use std::{
    fmt::Debug,
    fs::OpenOptions,
    io::Write,
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use crate::{
    Error,
    receipt::{Receipt, render_receipt},
};

/// Something that can print a rendered receipt.
pub trait ReceiptSink: Debug + Send + Sync {
    /// Print the rendered `receipt`.
    ///
    /// # Errors
    /// Returns [Error::HardwareUnavailable] if the printer cannot be reached.
    fn print(&self, receipt: &str) -> Result<(), Error>;
}

/// A thermal printer attached as a character device, e.g. `/dev/ttyUSB0`.
///
/// The device is opened for every receipt so that a printer that was
/// unplugged and reconnected is picked up again.
#[derive(Debug, Clone)]
pub struct DevicePrinter {
    device: PathBuf,
}

impl DevicePrinter {
    /// Create a printer that writes to `device`.
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
        }
    }
}

impl ReceiptSink for DevicePrinter {
    fn print(&self, receipt: &str) -> Result<(), Error> {
        let unavailable = |error: std::io::Error| {
            Error::HardwareUnavailable(format!(
                "printer {} unavailable: {error}",
                self.device.display()
            ))
        };

        let mut printer = OpenOptions::new()
            .write(true)
            .open(&self.device)
            .map_err(unavailable)?;

        for line in receipt.lines() {
            printer.write_all(line.as_bytes()).map_err(unavailable)?;
            printer.write_all(b"\n").map_err(unavailable)?;
        }

        printer.flush().map_err(unavailable)
    }
}

/// A sink for kiosks without a printer, receipts are written to the log.
#[derive(Debug, Clone, Default)]
pub struct LogPrinter;

impl ReceiptSink for LogPrinter {
    fn print(&self, receipt: &str) -> Result<(), Error> {
        tracing::info!("Printing receipt:\n{receipt}");
        Ok(())
    }
}

/// Print `receipt` on `sink`, waiting at most `timeout`.
///
/// Returns a warning for the client if the receipt could not be printed.
pub async fn print_receipt(
    sink: Arc<dyn ReceiptSink>,
    receipt: Receipt,
    timeout: Duration,
) -> Option<String> {
    let text = render_receipt(&receipt);
    let print = tokio::task::spawn_blocking(move || sink.print(&text));

    let error = match tokio::time::timeout(timeout, print).await {
        Ok(Ok(Ok(()))) => return None,
        Ok(Ok(Err(error))) => error,
        Ok(Err(error)) => Error::HardwareUnavailable(format!("print task failed: {error}")),
        Err(_) => Error::HardwareUnavailable(format!(
            "printer did not respond within {} ms",
            timeout.as_millis()
        )),
    };

    tracing::warn!("Could not print receipt: {error}");

    Some(format!("The receipt could not be printed: {error}"))
}

#[cfg(test)]
pub(crate) mod test_utils {
    use std::{
        sync::Mutex,
        thread,
        time::Duration,
    };

    use crate::{Error, receipt::ReceiptSink};

    /// Records receipts instead of printing them.
    #[derive(Debug, Default)]
    pub struct RecordingPrinter {
        pub printed: Mutex<Vec<String>>,
    }

    impl ReceiptSink for RecordingPrinter {
        fn print(&self, receipt: &str) -> Result<(), Error> {
            self.printed.lock().unwrap().push(receipt.to_owned());
            Ok(())
        }
    }

    /// A printer that is always offline.
    #[derive(Debug, Default)]
    pub struct OfflinePrinter;

    impl ReceiptSink for OfflinePrinter {
        fn print(&self, _receipt: &str) -> Result<(), Error> {
            Err(Error::HardwareUnavailable("printer offline".to_owned()))
        }
    }

    /// A printer that takes far too long.
    #[derive(Debug, Default)]
    pub struct StuckPrinter;

    impl ReceiptSink for StuckPrinter {
        fn print(&self, _receipt: &str) -> Result<(), Error> {
            thread::sleep(Duration::from_millis(500));
            Ok(())
        }
    }
}
