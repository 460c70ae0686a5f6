//! High-level console command dispatcher.
//!
//! This module glues parsed console lines to the scheduler by turning them into
//! queued [`LightCommand`]s. Commands that only read state (`status`, `help`)
//! or move the clock (`wait`) are handed back to the front-end, which owns the
//! scheduler and the clock. It stays `no_std` friendly so the firmware and
//! emulator crates share the same implementation.

use core::fmt;
use core::time::Duration;

use crate::controller::{CommandEnqueueError, LightCommand, LightCommandQueue, LightsError};
use crate::lights::fault_light_for;

use super::grammar::{self, Command};

/// Command execution successes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandOutcome<'a> {
    /// Command handed to the scheduler queue.
    Queued(LightCommand),
    /// Caller should render a status snapshot.
    Status,
    /// Caller should advance its clock by the duration.
    Wait(Duration),
    /// Caller should render help for the optional topic.
    Help(Option<&'a str>),
}

impl fmt::Display for CommandOutcome<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandOutcome::Queued(LightCommand::InitiateStart) => f.write_str("ok start"),
            CommandOutcome::Queued(LightCommand::Reset) => f.write_str("ok reset"),
            CommandOutcome::Queued(LightCommand::FaultLight { dog, state }) => {
                write!(f, "ok fault dog={dog} {state}")
            }
            CommandOutcome::Queued(LightCommand::SetLight { light, state }) => {
                write!(f, "ok light {light} {state}")
            }
            CommandOutcome::Status => f.write_str("ok status"),
            CommandOutcome::Wait(duration) => write!(f, "ok wait {}ms", duration.as_millis()),
            CommandOutcome::Help(_) => f.write_str("ok help"),
        }
    }
}

/// Errors surfaced while executing a command.
#[derive(Debug, PartialEq)]
pub enum CommandError<'a, E> {
    Parse(grammar::ParseError<'a>),
    Unsupported(&'static str),
    Rejected(LightsError),
    Queue(CommandEnqueueError<E>),
}

impl<'a, E> From<grammar::ParseError<'a>> for CommandError<'a, E> {
    fn from(error: grammar::ParseError<'a>) -> Self {
        Self::Parse(error)
    }
}

impl<E> From<LightsError> for CommandError<'_, E> {
    fn from(error: LightsError) -> Self {
        Self::Rejected(error)
    }
}

impl<E> From<CommandEnqueueError<E>> for CommandError<'_, E> {
    fn from(error: CommandEnqueueError<E>) -> Self {
        Self::Queue(error)
    }
}

impl<E: fmt::Debug> fmt::Display for CommandError<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Parse(err) => write!(f, "err parse: {err}"),
            CommandError::Unsupported(what) => write!(f, "err unsupported: {what}"),
            CommandError::Rejected(err) => write!(f, "err rejected: {err}"),
            CommandError::Queue(CommandEnqueueError::QueueFull) => {
                f.write_str("err busy: command queue full")
            }
            CommandError::Queue(CommandEnqueueError::Other(err)) => {
                write!(f, "err queue: {err:?}")
            }
        }
    }
}

type CommandResult<'a, Q> =
    Result<CommandOutcome<'a>, CommandError<'a, <Q as LightCommandQueue>::Error>>;

/// Dispatches console commands into the scheduler queue.
pub struct CommandExecutor<Q> {
    queue: Q,
    virtual_clock: bool,
}

impl<Q> CommandExecutor<Q> {
    /// Creates an executor for a console on real hardware; `wait` is rejected.
    #[must_use]
    pub const fn new(queue: Q) -> Self {
        Self {
            queue,
            virtual_clock: false,
        }
    }

    /// Creates an executor whose front-end can advance its own clock.
    #[must_use]
    pub const fn with_virtual_clock(queue: Q) -> Self {
        Self {
            queue,
            virtual_clock: true,
        }
    }

    /// Returns an immutable reference to the underlying queue.
    #[must_use]
    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// Returns a mutable reference to the underlying queue.
    pub fn queue_mut(&mut self) -> &mut Q {
        &mut self.queue
    }

    /// Consumes the executor and yields the inner queue.
    #[must_use]
    pub fn into_inner(self) -> Q {
        self.queue
    }
}

impl<Q> CommandExecutor<Q>
where
    Q: LightCommandQueue,
{
    /// Parses and executes a console line.
    ///
    /// # Errors
    ///
    /// Returns a parse error, a rejected dog index, `Unsupported` for `wait`
    /// without a virtual clock, or the queue error when the queue is full.
    pub fn execute<'a>(&mut self, line: &'a str) -> CommandResult<'a, Q> {
        let command = grammar::parse(line)?;
        self.dispatch(command)
    }

    fn dispatch<'a>(&mut self, command: Command<'a>) -> CommandResult<'a, Q> {
        let queued = match command {
            Command::Start => LightCommand::InitiateStart,
            Command::Reset => LightCommand::Reset,
            Command::Fault(fault) => {
                fault_light_for(fault.dog).ok_or(LightsError::InvalidDogIndex(fault.dog))?;
                LightCommand::FaultLight {
                    dog: fault.dog,
                    state: fault.state,
                }
            }
            Command::Light(args) => LightCommand::SetLight {
                light: args.light,
                state: args.state,
            },
            Command::Status => return Ok(CommandOutcome::Status),
            Command::Wait(duration) if self.virtual_clock => {
                return Ok(CommandOutcome::Wait(duration));
            }
            Command::Wait(_) => return Err(CommandError::Unsupported("wait")),
            Command::Help(help) => return Ok(CommandOutcome::Help(help.topic)),
        };

        self.queue.try_enqueue(queued)?;
        Ok(CommandOutcome::Queued(queued))
    }
}
