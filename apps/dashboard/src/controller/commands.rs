//! Terminal commands and the messages the input thread queues for the host
//! loop.

use std::path::PathBuf;

use shared::domain::ScreenPoint;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardCommand {
    Search(String),
    Toggle(String),
    Clear,
    Click {
        id: String,
        point: Option<ScreenPoint>,
    },
    Row(String),
    Open(String),
    Close,
    Select,
    Compare,
    List,
    Map,
    Card,
    Reload,
    GeoJson(Option<PathBuf>),
    Help,
    Quit,
}

impl DashboardCommand {
    pub fn name(&self) -> &'static str {
        match self {
            DashboardCommand::Search(_) => "search",
            DashboardCommand::Toggle(_) => "toggle",
            DashboardCommand::Clear => "clear",
            DashboardCommand::Click { .. } => "click",
            DashboardCommand::Row(_) => "row",
            DashboardCommand::Open(_) => "open",
            DashboardCommand::Close => "close",
            DashboardCommand::Select => "select",
            DashboardCommand::Compare => "compare",
            DashboardCommand::List => "list",
            DashboardCommand::Map => "map",
            DashboardCommand::Card => "card",
            DashboardCommand::Reload => "reload",
            DashboardCommand::GeoJson(_) => "geojson",
            DashboardCommand::Help => "help",
            DashboardCommand::Quit => "quit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command `{0}`; type `help`")]
    Unknown(String),
    #[error("`{command}` needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error("`{0}` is not a number")]
    InvalidNumber(String),
}

/// Queued from the input thread to the host loop.
#[derive(Debug, Clone, PartialEq)]
pub enum HostMessage {
    Command(DashboardCommand),
    Unrecognized { line: String, error: CommandError },
    InputClosed,
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<DashboardCommand>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "search" | "s" => DashboardCommand::Search(rest.to_string()),
        "toggle" | "t" => DashboardCommand::Toggle(required(rest, "toggle")?),
        "clear" => DashboardCommand::Clear,
        "click" => parse_click(rest)?,
        "row" => DashboardCommand::Row(required(rest, "row")?),
        "open" => DashboardCommand::Open(required(rest, "open")?),
        "close" => DashboardCommand::Close,
        "select" => DashboardCommand::Select,
        "compare" => DashboardCommand::Compare,
        "list" | "ls" => DashboardCommand::List,
        "map" => DashboardCommand::Map,
        "card" => DashboardCommand::Card,
        "reload" | "retry" => DashboardCommand::Reload,
        "geojson" => DashboardCommand::GeoJson((!rest.is_empty()).then(|| PathBuf::from(rest))),
        "help" | "?" => DashboardCommand::Help,
        "quit" | "exit" | "q" => DashboardCommand::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn required(rest: &str, command: &'static str) -> Result<String, CommandError> {
    if rest.is_empty() {
        Err(CommandError::MissingArgument {
            command,
            argument: "a hospital id",
        })
    } else {
        Ok(rest.to_string())
    }
}

fn parse_click(rest: &str) -> Result<DashboardCommand, CommandError> {
    let parts: Vec<&str> = rest.split_whitespace().collect();
    match parts.as_slice() {
        [] => Err(CommandError::MissingArgument {
            command: "click",
            argument: "a hospital id",
        }),
        [id] => Ok(DashboardCommand::Click {
            id: id.to_string(),
            point: None,
        }),
        [id, x, y] => Ok(DashboardCommand::Click {
            id: id.to_string(),
            point: Some(ScreenPoint::new(number(x)?, number(y)?)),
        }),
        _ => Err(CommandError::MissingArgument {
            command: "click",
            argument: "an id and optionally both x and y",
        }),
    }
}

fn number(raw: &str) -> Result<f64, CommandError> {
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| CommandError::InvalidNumber(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(
            parse_command("search  saint mary ").expect("parse"),
            Some(DashboardCommand::Search("saint mary".into()))
        );
        assert_eq!(
            parse_command("search").expect("parse"),
            Some(DashboardCommand::Search(String::new()))
        );
        assert_eq!(
            parse_command("TOGGLE H1").expect("parse"),
            Some(DashboardCommand::Toggle("H1".into()))
        );
        assert_eq!(
            parse_command("click H7 120 80.5").expect("parse"),
            Some(DashboardCommand::Click {
                id: "H7".into(),
                point: Some(ScreenPoint::new(120.0, 80.5)),
            })
        );
        assert_eq!(
            parse_command("geojson out.json").expect("parse"),
            Some(DashboardCommand::GeoJson(Some(PathBuf::from("out.json"))))
        );
        assert_eq!(parse_command("   ").expect("parse"), None);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            parse_command("launch"),
            Err(CommandError::Unknown("launch".into()))
        );
        assert!(matches!(
            parse_command("toggle"),
            Err(CommandError::MissingArgument { command: "toggle", .. })
        ));
        assert_eq!(
            parse_command("click H1 ten 20"),
            Err(CommandError::InvalidNumber("ten".into()))
        );
        assert!(parse_command("click H1 10").is_err());
    }
}
