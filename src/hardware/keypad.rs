//! Sources of hardware events: the 4x4 keypad matrix, a scripted source for
//! tests and a console source for running without GPIO.

use std::{
    collections::VecDeque,
    io::{self, BufRead, BufReader, Stdin},
    thread,
    time::{Duration, Instant},
};

use crate::{Error, hardware::HardwareEvent};

/// The legend of the 4x4 membrane keypad, indexed by row then column.
pub const KEY_MAP: [[char; 4]; 4] = [
    ['1', '2', '3', 'A'],
    ['4', '5', '6', 'B'],
    ['7', '8', '9', 'C'],
    ['*', '0', '#', 'D'],
];

/// How long a column must stay high before a press is accepted, and how
/// long the contacts are left to settle after a release.
const DEBOUNCE_INTERVAL: Duration = Duration::from_millis(20);
const RELEASE_POLL_INTERVAL: Duration = Duration::from_millis(10);
const MAX_HOLD: Duration = Duration::from_secs(5);

/// The key at `row` and `column` of the keypad, if the position exists.
pub fn key_at(row: usize, column: usize) -> Option<char> {
    KEY_MAP.get(row)?.get(column).copied()
}

/// Something that can be polled for [HardwareEvent]s.
///
/// Sources are polled from a dedicated thread, so `poll` may block.
pub trait HardwareEventSource: Send {
    /// Check the source for a new event.
    ///
    /// Returns `Ok(None)` if nothing happened since the last poll.
    ///
    /// # Errors
    /// Returns [Error::HardwareUnavailable] if the device cannot be read, the
    /// poller stops polling the source after an error.
    fn poll(&mut self) -> Result<Option<HardwareEvent>, Error>;
}

/// The row and column lines of a keypad matrix.
///
/// Rows are driven as outputs and columns are read as inputs with pull-down
/// resistors, so a column reads high while a key joins it to a driven row.
pub trait MatrixLines: Send {
    /// Drive the row line `row` high or low.
    fn set_row(&mut self, row: usize, high: bool) -> Result<(), Error>;

    /// Whether the column line `column` reads high.
    fn column_high(&mut self, column: usize) -> Result<bool, Error>;
}

/// A 4x4 keypad read by scanning its matrix one row at a time.
#[derive(Debug)]
pub struct MatrixKeypad<L> {
    lines: L,
}

impl<L: MatrixLines> MatrixKeypad<L> {
    /// Create a keypad on `lines`, with every row driven low.
    ///
    /// # Errors
    /// Returns an error if the rows cannot be driven.
    pub fn new(mut lines: L) -> Result<Self, Error> {
        for row in 0..KEY_MAP.len() {
            lines.set_row(row, false)?;
        }

        Ok(Self { lines })
    }

    /// Scan the matrix for a pressed key.
    ///
    /// A column that drops back low within the debounce interval is contact
    /// bounce and is ignored. A detected key is only returned once it has
    /// been released, so holding a key down produces a single press.
    ///
    /// # Errors
    /// Returns an error if the lines cannot be read or driven.
    pub fn scan(&mut self) -> Result<Option<char>, Error> {
        for (row, keys) in KEY_MAP.iter().enumerate() {
            self.lines.set_row(row, true)?;

            for (column, key) in keys.iter().enumerate() {
                if self.lines.column_high(column)? && self.is_stable_press(column)? {
                    let released = self.wait_for_release(column);
                    self.lines.set_row(row, false)?;
                    released?;

                    return Ok(Some(*key));
                }
            }

            self.lines.set_row(row, false)?;
        }

        Ok(None)
    }

    fn is_stable_press(&mut self, column: usize) -> Result<bool, Error> {
        thread::sleep(DEBOUNCE_INTERVAL);

        self.lines.column_high(column)
    }

    fn wait_for_release(&mut self, column: usize) -> Result<(), Error> {
        let pressed_at = Instant::now();

        while self.lines.column_high(column)? {
            if pressed_at.elapsed() > MAX_HOLD {
                tracing::warn!("Key in column {column} held for over {MAX_HOLD:?}, ignoring release");
                break;
            }

            thread::sleep(RELEASE_POLL_INTERVAL);
        }

        thread::sleep(DEBOUNCE_INTERVAL);

        Ok(())
    }
}

impl<L: MatrixLines> HardwareEventSource for MatrixKeypad<L> {
    fn poll(&mut self) -> Result<Option<HardwareEvent>, Error> {
        Ok(self.scan()?.map(HardwareEvent::KeyPressed))
    }
}

/// A source that replays a fixed list of events, then goes quiet.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    events: VecDeque<HardwareEvent>,
}

impl ScriptedSource {
    /// Create a source that replays `events` in order.
    pub fn new(events: impl IntoIterator<Item = HardwareEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }
}

impl HardwareEventSource for ScriptedSource {
    fn poll(&mut self) -> Result<Option<HardwareEvent>, Error> {
        Ok(self.events.pop_front())
    }
}

/// Reads simulated hardware events from text lines, one command per line:
///
/// - `insert <tag>` places the card `tag` on the reader,
/// - `remove` takes the card off the reader,
/// - anything else is typed on the keypad, one press per keypad character.
#[derive(Debug)]
pub struct StdinConsole<R> {
    reader: R,
    pending: VecDeque<HardwareEvent>,
}

impl StdinConsole<BufReader<Stdin>> {
    /// Create a console that reads from standard input.
    pub fn stdin() -> Self {
        Self::new(BufReader::new(io::stdin()))
    }
}

impl<R: BufRead> StdinConsole<R> {
    /// Create a console that reads from `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: VecDeque::new(),
        }
    }

    fn parse_line(line: &str) -> Vec<HardwareEvent> {
        let line = line.trim();

        if let Some(tag) = line.strip_prefix("insert ") {
            return vec![HardwareEvent::TagScanned(tag.trim().to_owned())];
        }

        if line == "remove" {
            return vec![HardwareEvent::TagRemoved];
        }

        line.chars()
            .map(|key| key.to_ascii_uppercase())
            .filter(|key| KEY_MAP.iter().flatten().any(|known| known == key))
            .map(HardwareEvent::KeyPressed)
            .collect()
    }
}

impl<R: BufRead + Send> HardwareEventSource for StdinConsole<R> {
    fn poll(&mut self) -> Result<Option<HardwareEvent>, Error> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(Some(event));
        }

        let mut line = String::new();
        let bytes_read = self
            .reader
            .read_line(&mut line)
            .map_err(|error| Error::HardwareUnavailable(format!("console unreadable: {error}")))?;

        if bytes_read == 0 {
            return Err(Error::HardwareUnavailable("console closed".to_owned()));
        }

        self.pending.extend(Self::parse_line(&line));

        Ok(self.pending.pop_front())
    }
}
