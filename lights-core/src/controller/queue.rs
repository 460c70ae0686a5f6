//! Commands queued for the scheduler between ticks.
//!
//! Producers (the console, race logic) push [`LightCommand`]s without blocking;
//! the task that owns the [`LightScheduler`](super::LightScheduler) drains them
//! at the start of each tick.

use heapless::Deque;

use crate::lights::{Light, LightState};

/// Number of commands buffered between ticks.
pub const LIGHT_COMMAND_QUEUE_DEPTH: usize = 8;

/// Request executed by [`LightScheduler::apply_command`](super::LightScheduler::apply_command).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LightCommand {
    InitiateStart,
    Reset,
    FaultLight { dog: usize, state: LightState },
    SetLight { light: Light, state: LightState },
}

/// Error surfaced when a command cannot be enqueued.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CommandEnqueueError<E = ()> {
    /// Queue has reached its maximum capacity.
    QueueFull,
    /// Transport-specific failure.
    Other(E),
}

impl<E> CommandEnqueueError<E> {
    /// Maps the inner error type.
    #[must_use]
    pub fn map_other<F, M>(self, mapper: M) -> CommandEnqueueError<F>
    where
        M: FnOnce(E) -> F,
    {
        match self {
            CommandEnqueueError::QueueFull => CommandEnqueueError::QueueFull,
            CommandEnqueueError::Other(err) => CommandEnqueueError::Other(mapper(err)),
        }
    }
}

/// Trait implemented by producers that push commands toward the scheduler.
pub trait LightCommandQueue {
    /// Transport-specific error type.
    type Error;

    /// Attempts to enqueue a command without blocking.
    fn try_enqueue(&mut self, command: LightCommand)
    -> Result<(), CommandEnqueueError<Self::Error>>;

    /// Returns the current queue depth if it can be observed.
    fn len(&self) -> Option<usize> {
        None
    }

    /// Returns `true` when the queue reports that it currently holds no items.
    fn is_empty(&self) -> Option<bool> {
        self.len().map(|current| current == 0)
    }
}

/// Fixed-capacity FIFO used where producer and consumer share one owner.
#[derive(Clone, Debug, Default)]
pub struct LightCommandBuffer<const DEPTH: usize = LIGHT_COMMAND_QUEUE_DEPTH> {
    commands: Deque<LightCommand, DEPTH>,
}

impl<const DEPTH: usize> LightCommandBuffer<DEPTH> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            commands: Deque::new(),
        }
    }

    /// Removes the oldest queued command.
    pub fn pop(&mut self) -> Option<LightCommand> {
        self.commands.pop_front()
    }
}

impl<const DEPTH: usize> LightCommandQueue for LightCommandBuffer<DEPTH> {
    type Error = ();

    fn try_enqueue(&mut self, command: LightCommand) -> Result<(), CommandEnqueueError<()>> {
        self.commands
            .push_back(command)
            .map_err(|_| CommandEnqueueError::QueueFull)
    }

    fn len(&self) -> Option<usize> {
        Some(self.commands.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_is_fifo_and_bounded() {
        let mut queue = LightCommandBuffer::<2>::new();
        assert_eq!(queue.is_empty(), Some(true));

        queue.try_enqueue(LightCommand::InitiateStart).unwrap();
        queue.try_enqueue(LightCommand::Reset).unwrap();
        assert_eq!(
            queue.try_enqueue(LightCommand::Reset),
            Err(CommandEnqueueError::QueueFull)
        );

        assert_eq!(queue.pop(), Some(LightCommand::InitiateStart));
        assert_eq!(queue.pop(), Some(LightCommand::Reset));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn map_other_preserves_queue_full() {
        let err: CommandEnqueueError<u8> = CommandEnqueueError::QueueFull;
        assert_eq!(err.map_other(u16::from), CommandEnqueueError::QueueFull);
        assert_eq!(
            CommandEnqueueError::Other(3u8).map_other(u16::from),
            CommandEnqueueError::Other(3u16)
        );
    }
}
