//! Interactive command parsing

use std::str::FromStr;
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  pick X Y        set the target to taste coordinates (body X, sweetness Y)
  slider B S      set the sliders (0-100 each)
  scan            open a scan session
  decode CODE     feed a decoded code to the open scan session
  stop            cancel the open scan session
  rate ID N       rate an item 0-5 (0 clears)
  zoom in|out     change the chart zoom
  show            print the current view
  json            print the current view as JSON
  help            show this help
  quit            exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Pick { x: f64, y: f64 },
    Slider { body: u8, sweetness: u8 },
    Scan,
    Decode(String),
    Stop,
    Rate { id: String, rating: i64 },
    ZoomIn,
    ZoomOut,
    Show,
    Json,
    Help,
    Quit,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("'{value}' is not a valid {what}")]
    InvalidArgument { what: &'static str, value: String },
}

fn number(value: &str) -> Result<f64, CommandError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CommandError::InvalidArgument {
            what: "coordinate",
            value: value.to_string(),
        })
}

/// Out-of-range slider values are clamped to 0..=100
fn slider(value: &str) -> Result<u8, CommandError> {
    let parsed: i64 = value.parse().map_err(|_| CommandError::InvalidArgument {
        what: "slider position",
        value: value.to_string(),
    })?;
    Ok(parsed.clamp(0, 100) as u8)
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().ok_or(CommandError::Empty)?.to_ascii_lowercase();
        let args: Vec<&str> = words.collect();

        let command = match (name.as_str(), args.as_slice()) {
            ("pick" | "p", [x, y]) => Command::Pick { x: number(x)?, y: number(y)? },
            ("pick" | "p", _) => return Err(CommandError::Usage("pick X Y")),

            ("slider" | "s", [body, sweetness]) => Command::Slider {
                body: slider(body)?,
                sweetness: slider(sweetness)?,
            },
            ("slider" | "s", _) => return Err(CommandError::Usage("slider BODY SWEETNESS")),

            ("scan", []) => Command::Scan,
            ("decode" | "d", [_, ..]) => Command::Decode(args.join(" ")),
            ("decode" | "d", []) => return Err(CommandError::Usage("decode CODE")),
            ("stop" | "cancel", []) => Command::Stop,

            ("rate" | "r", [id, rating]) => Command::Rate {
                id: id.to_string(),
                rating: rating.parse().map_err(|_| CommandError::InvalidArgument {
                    what: "rating",
                    value: rating.to_string(),
                })?,
            },
            ("rate" | "r", _) => return Err(CommandError::Usage("rate ID RATING")),

            ("zoom", ["in" | "+"]) => Command::ZoomIn,
            ("zoom", ["out" | "-"]) => Command::ZoomOut,
            ("zoom", _) => return Err(CommandError::Usage("zoom in|out")),
            ("+", []) => Command::ZoomIn,
            ("-", []) => Command::ZoomOut,

            ("show" | "ls", []) => Command::Show,
            ("json", []) => Command::Json,
            ("help" | "?", []) => Command::Help,
            ("quit" | "exit" | "q", []) => Command::Quit,

            _ => return Err(CommandError::Unknown(line.trim().to_string())),
        };
        Ok(command)
    }
}
