pub mod help;

use std::io::BufRead;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::models::{Asset, RangeBucket};
use crate::services::market_service::PollerCommand;

/// Parsed user input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Poller(PollerCommand),
    Help,
    Empty,
}

/// Parse one input line: `asset <id>`, `range <days>`, `refresh`, `help`, `quit`
pub fn parse_line(line: &str) -> Result<Input, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.is_empty() {
        return Ok(Input::Empty);
    }

    let command = parts[0].to_lowercase();
    let args = &parts[1..];

    match command.as_str() {
        "asset" | "a" => {
            let id = args.first().ok_or("❌ Usage: `asset <id>`".to_string())?;
            Ok(Input::Poller(PollerCommand::SelectAsset(id.parse::<Asset>()?)))
        }
        "range" | "r" => {
            let raw = args.first().ok_or("❌ Usage: `range <days>`".to_string())?;
            let days: u32 = raw
                .trim_end_matches(['d', 'D'])
                .parse()
                .map_err(|_| format!("❌ Invalid range: '{}'", raw))?;
            Ok(Input::Poller(PollerCommand::SelectRange(RangeBucket::from_days(days)?)))
        }
        "refresh" => Ok(Input::Poller(PollerCommand::Refresh)),
        "help" | "?" => Ok(Input::Help),
        "quit" | "exit" | "q" => Ok(Input::Poller(PollerCommand::Shutdown)),
        other => Err(format!("❌ Unknown command: '{}'. Type `help` for usage.", other)),
    }
}

/// Spawn a plain thread forwarding stdin to the poller.
///
/// The read blocks outside the runtime, so returning from `main` is never
/// held up by a pending stdin read.
pub fn read_stdin(commands: mpsc::Sender<PollerCommand>) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || forward_lines(std::io::stdin().lock(), commands))?;
    Ok(())
}

/// Forward parsed lines from `reader` until `quit` or EOF
pub fn forward_lines<R: BufRead>(reader: R, commands: mpsc::Sender<PollerCommand>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        };

        match parse_line(&line) {
            Ok(Input::Poller(command)) => {
                debug!("Command: {:?}", command);
                if commands.blocking_send(command).is_err() || command == PollerCommand::Shutdown {
                    return;
                }
            }
            Ok(Input::Help) => println!("{}", help::help_text()),
            Ok(Input::Empty) => {}
            Err(e) => eprintln!("{}", e),
        }
    }

    info!("stdin closed, shutting down");
    let _ = commands.blocking_send(PollerCommand::Shutdown);
}
