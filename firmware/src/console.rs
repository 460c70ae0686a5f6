#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Line-oriented operator console.
//!
//! Bytes arriving from the UART are assembled into lines, executed through the
//! shared [`CommandExecutor`] and answered with a single reply buffer that the
//! console task writes back out.

use core::fmt::{self, Write};
use core::str;

use heapless::{String, Vec};
use lights_core::controller::LightCommandQueue;
use lights_core::repl::catalog;
use lights_core::repl::commands::{CommandExecutor, CommandOutcome};

use crate::status;

/// Maximum number of bytes accepted on a single console line (excluding terminator).
pub const MAX_LINE_LEN: usize = 96;

/// Reply buffer size; large enough for the full `help` listing.
pub const REPLY_CAPACITY: usize = 768;

pub type Reply = String<REPLY_CAPACITY>;

/// Errors surfaced while assembling or answering a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleError {
    /// Encountered non-UTF-8 data in the assembled line buffer.
    InvalidUtf8,
    /// Input exceeded [`MAX_LINE_LEN`]; the partial line was discarded.
    LineOverflow,
    /// The reply did not fit in [`REPLY_CAPACITY`].
    ReplyOverflow,
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConsoleError::InvalidUtf8 => "err input is not utf-8",
            ConsoleError::LineOverflow => "err line too long",
            ConsoleError::ReplyOverflow => "err reply truncated",
        })
    }
}

impl From<fmt::Error> for ConsoleError {
    fn from(_: fmt::Error) -> Self {
        Self::ReplyOverflow
    }
}

/// Console state for one UART link.
pub struct ConsoleSession<Q> {
    executor: CommandExecutor<Q>,
    buffer: Vec<u8, MAX_LINE_LEN>,
}

impl<Q> ConsoleSession<Q>
where
    Q: LightCommandQueue,
    Q::Error: fmt::Debug,
{
    /// Creates a session; `wait` is rejected because the hardware clock cannot be advanced.
    pub fn new(queue: Q) -> Self {
        Self {
            executor: CommandExecutor::new(queue),
            buffer: Vec::new(),
        }
    }

    /// Feeds a single byte. Returns `true` once `reply` holds an answer to send.
    ///
    /// # Errors
    ///
    /// Reports overlong or non-UTF-8 lines; the offending line is dropped.
    pub fn ingest(&mut self, byte: u8, reply: &mut Reply) -> Result<bool, ConsoleError> {
        match byte {
            b'\r' | b'\n' => {
                let answered = self.process_line(reply);
                self.buffer.clear();
                answered
            }
            0x08 | 0x7f => {
                self.buffer.pop();
                Ok(false)
            }
            value => self.buffer.push(value).map(|()| false).map_err(|_| {
                self.buffer.clear();
                ConsoleError::LineOverflow
            }),
        }
    }

    fn process_line(&mut self, reply: &mut Reply) -> Result<bool, ConsoleError> {
        let line = str::from_utf8(self.buffer.as_slice())
            .map_err(|_| ConsoleError::InvalidUtf8)?
            .trim();
        if line.is_empty() {
            return Ok(false);
        }

        reply.clear();
        match self.executor.execute(line) {
            Ok(CommandOutcome::Status) => write!(reply, "{}", status::snapshot())?,
            Ok(CommandOutcome::Help(topic)) => catalog::write_help(reply, topic)?,
            Ok(outcome) => write!(reply, "{outcome}")?,
            Err(err) => write!(reply, "{err}")?,
        }
        if !reply.ends_with('\n') {
            reply.write_char('\n')?;
        }
        Ok(true)
    }
}
