mod session;

use std::env;
use std::io::{self, BufRead, Write};
use std::process;

use session::{Session, TranscriptProfile};

struct Options {
    profile: TranscriptProfile,
    color: bool,
}

fn main() -> io::Result<()> {
    let options = parse_options().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("Usage: lights-emulator [--profile <manual|start|fault>] [--no-color]");
        process::exit(2);
    });

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut session = Session::new(options.profile, options.color)?;
    let mut line = String::new();

    writeln!(
        writer,
        "Flyball Lights Emulator ready. Type `help` for commands or `exit` to quit."
    )?;

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        for response in session.handle_command(trimmed)? {
            writeln!(writer, "{response}")?;
        }
    }

    Ok(())
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_options() -> Result<Options, String> {
    let mut options = Options {
        profile: TranscriptProfile::Manual,
        color: true,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--no-color" {
            options.color = false;
        } else if let Some(value) = arg.strip_prefix("--profile=") {
            options.profile = TranscriptProfile::from_tag(value)?;
        } else if arg == "--profile" {
            let value = args
                .next()
                .ok_or_else(|| "Expected value after --profile".to_string())?;
            options.profile = TranscriptProfile::from_tag(&value)?;
        } else {
            options.profile = TranscriptProfile::from_tag(&arg)?;
        }
    }

    Ok(options)
}
