//! Polls a hardware source on its own thread.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use tokio::sync::mpsc::{Sender, error::TrySendError};

use crate::hardware::{HardwareEvent, HardwareEventSource};

/// Poll `source` on a new thread and push its events into `events`.
///
/// The thread waits `poll_interval` whenever the source has nothing to
/// report. It stops once `shutdown` is set, the receiving end of `events` is
/// dropped, or the source fails. When the channel is full, new events are
/// dropped instead of blocking the scan.
pub fn spawn_event_poller<S>(
    mut source: S,
    events: Sender<HardwareEvent>,
    shutdown: Arc<AtomicBool>,
    poll_interval: Duration,
) -> JoinHandle<()>
where
    S: HardwareEventSource + 'static,
{
    thread::spawn(move || {
        tracing::debug!("Hardware event poller started");

        while !shutdown.load(Ordering::Relaxed) {
            match source.poll() {
                Ok(Some(event)) => match events.try_send(event) {
                    Ok(()) => {}
                    Err(TrySendError::Full(event)) => {
                        tracing::warn!("Hardware event queue is full, dropping {event:?}");
                    }
                    Err(TrySendError::Closed(_)) => {
                        tracing::debug!("Hardware event receiver dropped");
                        break;
                    }
                },
                Ok(None) => thread::sleep(poll_interval),
                Err(error) => {
                    tracing::error!("Stopped polling hardware: {error}");
                    break;
                }
            }
        }

        tracing::debug!("Hardware event poller stopped");
    })
}
