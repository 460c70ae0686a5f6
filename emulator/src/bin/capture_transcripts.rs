use std::io;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use session::{Session, TranscriptProfile};

const START_SCRIPT: &[&str] = &[
    "help",
    "status",
    "start",
    "wait 3500ms",
    "status",
    "wait 1s",
    "start",
    "reset",
    "start",
    "wait 5s",
];

const FAULT_SCRIPT: &[&str] = &[
    "help lights",
    "fault 0",
    "wait 500ms",
    "fault 1",
    "wait 1200ms",
    "fault 4",
    "fault 1 off",
    "light green",
    "status",
    "reset",
    "wait 10ms",
];

fn main() -> io::Result<()> {
    record_profile(TranscriptProfile::Start, START_SCRIPT)?;
    record_profile(TranscriptProfile::Fault, FAULT_SCRIPT)?;
    Ok(())
}

fn record_profile(profile: TranscriptProfile, script: &[&str]) -> io::Result<()> {
    let mut session = Session::new(profile, false)?;
    for line in script {
        let _ = session.handle_command(line)?;
    }
    Ok(())
}
