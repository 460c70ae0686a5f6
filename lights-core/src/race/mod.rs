//! Race-timer collaborator seen from the light scheduler.
//!
//! The scheduler only asks whether the race is waiting for the countdown and
//! tells the timers to start once the go light is lit. Everything else about
//! timing a race lives behind [`RaceTimer`].

use core::fmt;

/// Coarse race lifecycle as seen by the start tower.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum RaceState {
    #[default]
    Stopped,
    /// Countdown requested; timers not yet running.
    Starting,
    Running,
}

impl RaceState {
    #[must_use]
    pub const fn to_raw(self) -> u8 {
        match self {
            RaceState::Stopped => 0,
            RaceState::Starting => 1,
            RaceState::Running => 2,
        }
    }

    /// Decodes a raw value, treating unknown codes as stopped.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            1 => RaceState::Starting,
            2 => RaceState::Running,
            _ => RaceState::Stopped,
        }
    }
}

impl fmt::Display for RaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RaceState::Stopped => "stopped",
            RaceState::Starting => "starting",
            RaceState::Running => "running",
        })
    }
}

/// External race timer driven by the start sequence.
pub trait RaceTimer<I> {
    /// Returns `true` while the race waits for the countdown to finish.
    fn is_starting(&self) -> bool;

    /// Starts the race clocks. Implementations must tolerate repeated calls.
    fn start_timers(&mut self, at: I);
}

impl<I, T> RaceTimer<I> for &mut T
where
    T: RaceTimer<I> + ?Sized,
{
    fn is_starting(&self) -> bool {
        (**self).is_starting()
    }

    fn start_timers(&mut self, at: I) {
        (**self).start_timers(at);
    }
}

/// Race timer that never starts; useful when the tower runs standalone.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopRaceTimer;

impl<I> RaceTimer<I> for NoopRaceTimer {
    fn is_starting(&self) -> bool {
        false
    }

    fn start_timers(&mut self, _at: I) {}
}

/// In-memory race state machine used by the emulator and tests.
#[derive(Clone, Debug)]
pub struct SimpleRace<I> {
    state: RaceState,
    started_at: Option<I>,
    start_requests: u32,
}

impl<I: Copy> SimpleRace<I> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: RaceState::Stopped,
            started_at: None,
            start_requests: 0,
        }
    }

    /// Moves a stopped race into the countdown.
    pub fn begin_start(&mut self) {
        if self.state == RaceState::Stopped {
            self.state = RaceState::Starting;
        }
    }

    /// Returns the race to stopped and forgets the previous start.
    pub fn stop(&mut self) {
        self.state = RaceState::Stopped;
        self.started_at = None;
    }

    #[must_use]
    pub const fn state(&self) -> RaceState {
        self.state
    }

    /// Instant the timers first started, if they have.
    #[must_use]
    pub const fn started_at(&self) -> Option<I> {
        self.started_at
    }

    /// Number of `start_timers` calls received, including repeats.
    #[must_use]
    pub const fn start_requests(&self) -> u32 {
        self.start_requests
    }
}

impl<I: Copy> Default for SimpleRace<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Copy> RaceTimer<I> for SimpleRace<I> {
    fn is_starting(&self) -> bool {
        self.state == RaceState::Starting
    }

    fn start_timers(&mut self, at: I) {
        self.start_requests = self.start_requests.saturating_add(1);
        if self.state == RaceState::Starting {
            self.state = RaceState::Running;
            self.started_at = Some(at);
        }
    }
}
