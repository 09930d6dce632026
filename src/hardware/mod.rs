//! Connects the kiosk hardware to the backend.
//!
//! Sources such as the keypad matrix are polled on a dedicated thread that
//! pushes [HardwareEvent]s into a bounded channel. An async dispatcher drains
//! the channel, updates the [crate::CardSession] and fans key presses out to
//! the WebSocket subscribers.

mod dispatcher;
mod keypad;
mod keypad_socket;
mod poller;

pub use dispatcher::{KeyBroadcaster, run_event_dispatcher};
pub use keypad::{
    HardwareEventSource, KEY_MAP, MatrixKeypad, MatrixLines, ScriptedSource, StdinConsole, key_at,
};
pub use keypad_socket::keypad_socket_endpoint;
pub use poller::spawn_event_poller;

/// Something that happened at the kiosk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HardwareEvent {
    /// A card was placed on the reader.
    TagScanned(String),
    /// The card was taken off the reader.
    TagRemoved,
    /// A key on the keypad was pressed and released.
    KeyPressed(char),
}
