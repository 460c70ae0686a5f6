use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use crossterm::style::{Color, Stylize};
use lights_core::controller::{
    LightCommand, LightCommandBuffer, LightDriver, LightScheduler, OverallState,
};
use lights_core::lights::{ALL_LIGHTS, Light, LightMask};
use lights_core::race::SimpleRace;
use lights_core::repl::catalog;
use lights_core::repl::commands::{CommandExecutor, CommandOutcome};
use lights_core::repl::status::{StatusFormatter, StatusSnapshot};
use lights_core::telemetry::{EventId, TelemetryEventKind};

/// Virtual clock step used while `wait` advances time.
pub const VIRTUAL_TICK: Duration = Duration::from_millis(10);

const TRANSCRIPT_DIR: &str = "transcripts";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TranscriptProfile {
    Manual,
    Start,
    Fault,
}

impl TranscriptProfile {
    pub fn tag(self) -> &'static str {
        match self {
            TranscriptProfile::Manual => "manual",
            TranscriptProfile::Start => "start",
            TranscriptProfile::Fault => "fault",
        }
    }

    pub fn header(self) -> &'static str {
        match self {
            TranscriptProfile::Manual => "Flyball Lights Emulator interactive transcript",
            TranscriptProfile::Start => "Flyball Lights Emulator start sequence transcript",
            TranscriptProfile::Fault => "Flyball Lights Emulator fault light transcript",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self, String> {
        [Self::Manual, Self::Start, Self::Fault]
            .into_iter()
            .find(|profile| profile.tag().eq_ignore_ascii_case(tag))
            .ok_or_else(|| format!("Unknown transcript profile `{tag}`"))
    }
}

/// Driver that queues every latched mask for the session to render.
#[derive(Default)]
struct RenderingDriver {
    written: Vec<LightMask>,
}

impl LightDriver for RenderingDriver {
    fn write_mask(&mut self, mask: LightMask) {
        self.written.push(mask);
    }
}

pub struct Session {
    executor: CommandExecutor<LightCommandBuffer>,
    lights: LightScheduler<RenderingDriver, Duration>,
    race: SimpleRace<Duration>,
    now: Duration,
    cursor: EventId,
    color: bool,
    transcript: TranscriptLogger,
}

impl Session {
    pub fn new(profile: TranscriptProfile, color: bool) -> io::Result<Self> {
        let transcript = TranscriptLogger::open(profile)?;
        Ok(Self::with_transcript(transcript, color))
    }

    fn with_transcript(transcript: TranscriptLogger, color: bool) -> Self {
        Self {
            executor: CommandExecutor::with_virtual_clock(LightCommandBuffer::new()),
            lights: LightScheduler::new(RenderingDriver::default()),
            race: SimpleRace::new(),
            now: Duration::ZERO,
            cursor: 0,
            color,
            transcript,
        }
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        self.transcript
            .append_line(self.now, TranscriptRole::Host, trimmed)?;

        let mut output = Output::default();
        match self.executor.execute(trimmed) {
            Ok(CommandOutcome::Queued(command)) => {
                output.push(CommandOutcome::Queued(command).to_string());
                self.apply_queued(&mut output);
                self.step(&mut output);
            }
            Ok(CommandOutcome::Status) => self.describe_status(&mut output),
            Ok(CommandOutcome::Wait(duration)) => {
                output.push(CommandOutcome::Wait(duration).to_string());
                let until = self.now + duration;
                while self.now < until {
                    self.step(&mut output);
                }
            }
            Ok(CommandOutcome::Help(topic)) => {
                for line in catalog::help_lines(topic) {
                    output.push(line);
                }
            }
            Err(err) => output.push(err.to_string()),
        }

        for line in &output.plain {
            self.transcript
                .append_line(self.now, TranscriptRole::Emulator, line)?;
        }
        Ok(output.into_display(self.color))
    }

    fn apply_queued(&mut self, output: &mut Output) {
        while let Some(command) = self.executor.queue_mut().pop() {
            match command {
                LightCommand::InitiateStart => self.race.begin_start(),
                LightCommand::Reset => self.race.stop(),
                LightCommand::FaultLight { .. } | LightCommand::SetLight { .. } => {}
            }

            if let Err(err) = self.lights.apply_command(command, self.now) {
                output.push(format!("err rejected: {err}"));
            }
        }
    }

    /// Runs one scheduler tick and narrates what changed.
    fn step(&mut self, output: &mut Output) {
        self.lights.tick(self.now, &mut self.race);

        for mask in self.lights.driver_mut().written.drain(..) {
            output.push_tower(self.now, mask);
        }

        for record in self.lights.telemetry().since(self.cursor) {
            if let Some(note) = narrate(record.event) {
                output.push(format!("[+{}ms] {note}", record.timestamp.as_millis()));
            }
        }
        self.cursor = self.lights.telemetry().next_id();
        self.now += VIRTUAL_TICK;
    }

    fn describe_status(&self, output: &mut Output) {
        let snapshot = StatusSnapshot::capture(&self.lights);
        for line in snapshot.to_string().lines() {
            output.push(line.to_string());
        }
        output.push(format!(
            "race {} clock=+{}ms",
            self.race.state(),
            self.now.as_millis()
        ));
    }
}

fn narrate(event: TelemetryEventKind) -> Option<&'static str> {
    match event {
        TelemetryEventKind::SequenceArmed => Some("start sequence armed"),
        TelemetryEventKind::TimersStarted => Some("race timers started"),
        TelemetryEventKind::SequenceComplete => Some("start sequence complete"),
        TelemetryEventKind::LightsReset => Some("lights reset"),
        _ => None,
    }
}

/// Response lines kept in plain form for the transcript; tower lines are
/// re-rendered with coloured lamps for the terminal.
#[derive(Default)]
struct Output {
    plain: Vec<String>,
    towers: Vec<Option<(Duration, LightMask)>>,
}

impl Output {
    fn push(&mut self, line: String) {
        self.plain.push(line);
        self.towers.push(None);
    }

    fn push_tower(&mut self, now: Duration, mask: LightMask) {
        self.plain.push(tower_line(now, mask, false));
        self.towers.push(Some((now, mask)));
    }

    fn into_display(self, color: bool) -> Vec<String> {
        if !color {
            return self.plain;
        }

        self.plain
            .into_iter()
            .zip(self.towers)
            .map(|(line, tower)| match tower {
                Some((now, mask)) => tower_line(now, mask, true),
                None => line,
            })
            .collect()
    }
}

/// Renders `[+<ms>ms] <strip> lights 0x.. <names>` for one latched mask.
fn tower_line(now: Duration, mask: LightMask, color: bool) -> String {
    let snapshot = StatusSnapshot::new(OverallState::Stopped, mask, false);
    let formatter = StatusFormatter::new(&snapshot);
    let mut line = format!("[+{}ms] ", now.as_millis());

    // Writing into a `String` cannot fail.
    if color {
        for wired in &ALL_LIGHTS {
            let lamp = if mask.contains(wired.light) {
                "●".with(lamp_colour(wired.light))
            } else {
                "○".with(Color::DarkGrey)
            };
            let _ = write!(line, "{lamp}");
        }
    } else {
        let _ = formatter.write_tower(&mut line);
    }
    line.push(' ');
    let _ = formatter.write_lights_line(&mut line);
    line
}

fn lamp_colour(light: Light) -> Color {
    match light {
        Light::White => Color::White,
        Light::Red => Color::Red,
        Light::Yellow1 | Light::Yellow2 | Light::Yellow3 => Color::Yellow,
        Light::Blue => Color::Blue,
        Light::Green => Color::Green,
    }
}

struct TranscriptLogger {
    writer: Box<dyn Write>,
}

impl TranscriptLogger {
    fn open(profile: TranscriptProfile) -> io::Result<Self> {
        let path = Path::new(TRANSCRIPT_DIR).join(format!("emulator-{}.log", profile.tag()));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: Box::new(BufWriter::new(file)),
        };

        logger.write_header(profile)?;
        Ok(logger)
    }

    #[cfg(test)]
    fn discard() -> Self {
        Self {
            writer: Box::new(io::sink()),
        }
    }

    fn write_header(&mut self, profile: TranscriptProfile) -> io::Result<()> {
        writeln!(self.writer, "# {}", profile.header())?;
        writeln!(
            self.writer,
            "# Timestamps are milliseconds of virtual clock"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(
        &mut self,
        elapsed: Duration,
        role: TranscriptRole,
        line: &str,
    ) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::with_transcript(TranscriptLogger::discard(), false)
    }

    fn run(session: &mut Session, line: &str) -> Vec<String> {
        session.handle_command(line).expect("sink transcript")
    }

    #[test]
    fn start_then_wait_walks_the_countdown() {
        let mut session = session();

        let lines = run(&mut session, "start");
        assert_eq!(lines[0], "ok start");
        assert!(lines.contains(&"[+0ms] [......*] lights 0x02 yellow3".to_string()));

        let lines = run(&mut session, "wait 4500ms");
        assert!(lines.contains(&"[+1000ms] [..*....] lights 0x20 yellow1".to_string()));
        assert!(lines.contains(&"[+3000ms] [.....*.] lights 0x04 green".to_string()));
        assert!(lines.contains(&"[+3010ms] race timers started".to_string()));
        assert!(lines.contains(&"[+4010ms] start sequence complete".to_string()));

        let status = run(&mut session, "status");
        assert_eq!(status[0], "state STARTED sequence=idle");
        assert_eq!(status[2], "race running clock=+4510ms");

        let again = run(&mut session, "start");
        assert!(again.contains(&"err rejected: reset required before restarting".to_string()));
    }

    #[test]
    fn fault_flash_is_rendered_and_cleared() {
        let mut session = session();

        let lines = run(&mut session, "fault 1");
        assert_eq!(lines[0], "ok fault dog=1 on");
        assert!(lines.contains(&"[+0ms] [*..*...] lights 0x90 white blue".to_string()));

        let lines = run(&mut session, "wait 1s");
        assert!(lines.contains(&"[+1000ms] [...*...] lights 0x10 blue".to_string()));
    }

    #[test]
    fn errors_and_help_are_reported() {
        let mut session = session();

        let lines = run(&mut session, "fault 9");
        assert_eq!(lines, vec!["err rejected: no fault light for dog 9".to_string()]);

        let lines = run(&mut session, "help lights");
        assert_eq!(lines.len(), ALL_LIGHTS.len());
    }

    #[test]
    fn coloured_tower_keeps_timestamp_and_label() {
        let mask = LightMask::EMPTY.with(Light::Red);
        let coloured = tower_line(Duration::from_millis(10), mask, true);
        assert!(coloured.starts_with("[+10ms] "));
        assert!(coloured.ends_with(" lights 0x40 red"));
        assert!(coloured.contains('●'));
        assert_eq!(
            tower_line(Duration::from_millis(10), mask, false),
            "[+10ms] [.*.....] lights 0x40 red"
        );
    }

    #[test]
    fn profiles_parse_case_insensitively() {
        assert_eq!(
            TranscriptProfile::from_tag("FAULT"),
            Ok(TranscriptProfile::Fault)
        );
        assert!(TranscriptProfile::from_tag("launch").is_err());
    }
}
