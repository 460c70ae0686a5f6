//! Console command catalog.
//!
//! The parser resolves keywords through [`find`], and `help` renders the same
//! table, so names and usage strings cannot drift apart.

use core::fmt;

use crate::lights::{ALL_LIGHTS, DOG_FAULT_LIGHTS};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandTag {
    Start,
    Reset,
    Fault,
    Light,
    Status,
    Wait,
    Help,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub tag: CommandTag,
    pub usage: &'static str,
    pub summary: &'static str,
}

const COMMANDS: [CommandSpec; 7] = [
    CommandSpec {
        name: "start",
        tag: CommandTag::Start,
        usage: "start",
        summary: "run the start countdown",
    },
    CommandSpec {
        name: "reset",
        tag: CommandTag::Reset,
        usage: "reset",
        summary: "turn every light off and stop the countdown",
    },
    CommandSpec {
        name: "fault",
        tag: CommandTag::Fault,
        usage: "fault <dog> [on|off|toggle]",
        summary: "set the fault light for a dog (0-3), default on",
    },
    CommandSpec {
        name: "light",
        tag: CommandTag::Light,
        usage: "light <name> [on|off|toggle]",
        summary: "switch one light, default toggle",
    },
    CommandSpec {
        name: "status",
        tag: CommandTag::Status,
        usage: "status",
        summary: "show race state and lit lights",
    },
    CommandSpec {
        name: "wait",
        tag: CommandTag::Wait,
        usage: "wait <duration>",
        summary: "advance the clock, e.g. `wait 500ms` or `wait 2s`",
    },
    CommandSpec {
        name: "help",
        tag: CommandTag::Help,
        usage: "help [command|lights]",
        summary: "show this list or details for one topic",
    },
];

/// Topic name listing the light catalog.
pub const LIGHTS_TOPIC: &str = "lights";

/// Returns the full command catalog.
#[must_use]
pub const fn commands() -> &'static [CommandSpec] {
    &COMMANDS
}

/// Finds a command by name (case insensitive).
#[must_use]
pub fn find(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}

/// Writes help for `topic`, or the command list when no topic is given.
///
/// # Errors
///
/// Propagates errors from `writer`.
pub fn write_help<W: fmt::Write>(writer: &mut W, topic: Option<&str>) -> fmt::Result {
    match topic {
        None => {
            for command in &COMMANDS {
                writeln!(writer, "{:<30} {}", command.usage, command.summary)?;
            }
            Ok(())
        }
        Some(name) if name.eq_ignore_ascii_case(LIGHTS_TOPIC) => write_lights(writer),
        Some(name) => match find(name) {
            Some(command) => writeln!(writer, "usage: {}\n  {}", command.usage, command.summary),
            None => writeln!(writer, "no help for `{name}`"),
        },
    }
}

/// Renders help as owned lines, one per output row.
#[cfg(feature = "alloc")]
#[must_use]
pub fn help_lines(topic: Option<&str>) -> alloc::vec::Vec<alloc::string::String> {
    use alloc::string::{String, ToString};

    let mut text = String::new();
    // Writing into a `String` cannot fail.
    let _ = write_help(&mut text, topic);
    text.lines().map(ToString::to_string).collect()
}

fn write_lights<W: fmt::Write>(writer: &mut W) -> fmt::Result {
    for line in &ALL_LIGHTS {
        write!(writer, "{:<8} {} bit=0x{:02x}", line.name, line.output, line.light.bit())?;
        if let Some(dog) = DOG_FAULT_LIGHTS.iter().position(|light| *light == line.light) {
            write!(writer, " fault dog {dog}")?;
        }
        writer.write_char('\n')?;
    }
    Ok(())
}
