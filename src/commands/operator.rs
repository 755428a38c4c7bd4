//! Operator command parsing
//!
//! One command per input line. Keywords are case-insensitive; arguments are
//! whitespace-separated.

use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::table::RowId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    Page(usize),
    Next,
    Previous,
    PageSize(usize),
    Pacing(u64),
    Match(RowId),
    Unmatch(RowId),
    Toggle(RowId),
    Reset,
    Export(Option<PathBuf>),
    Status,
    ClearCache,
    Help,
    Quit,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command '{0}' (type 'help' for the list)")]
    Unknown(String),

    #[error("'{command}' needs {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },

    #[error("'{command}': '{value}' is not a valid {expected}")]
    InvalidArgument {
        command: &'static str,
        value: String,
        expected: &'static str,
    },
}

pub const HELP: &str = "\
Commands:
  page N          go to page N
  next | prev     move one page forward or back
  size N          rows per page (10, 20, 50, 100)
  pacing MS       pause after each row, 0-500 ms
  match ID        mark row ID as a match
  unmatch ID      mark row ID as not a match
  toggle ID       flip the match state of row ID
  reset           clear every match
  export [PATH]   write the table with the MATCH column
  status          show the status line
  clear-cache     forget cached pages, URLs and images
  help            show this list
  quit            leave without exporting";

fn number<T: FromStr>(
    command: &'static str,
    arg: Option<&str>,
    expected: &'static str,
) -> Result<T, CommandParseError> {
    let value = arg.ok_or(CommandParseError::MissingArgument { command, expected })?;
    value.parse().map_err(|_| CommandParseError::InvalidArgument {
        command,
        value: value.to_string(),
        expected,
    })
}

impl FromStr for OperatorCommand {
    type Err = CommandParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let keyword = parts.next().ok_or(CommandParseError::Empty)?.to_ascii_lowercase();
        let arg = parts.next();

        let command = match keyword.as_str() {
            "page" | "p" => Self::Page(number("page", arg, "page number")?),
            "next" | "n" => Self::Next,
            "prev" | "previous" => Self::Previous,
            "size" => Self::PageSize(number("size", arg, "rows-per-page value")?),
            "pacing" => Self::Pacing(number("pacing", arg, "number of milliseconds")?),
            "match" | "m" => Self::Match(number("match", arg, "row id")?),
            "unmatch" | "u" => Self::Unmatch(number("unmatch", arg, "row id")?),
            "toggle" | "t" => Self::Toggle(number("toggle", arg, "row id")?),
            "reset" => Self::Reset,
            "export" => Self::Export(arg.map(PathBuf::from)),
            "status" => Self::Status,
            "clear-cache" => Self::ClearCache,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(CommandParseError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("page 3", OperatorCommand::Page(3))]
    #[case("  NEXT ", OperatorCommand::Next)]
    #[case("prev", OperatorCommand::Previous)]
    #[case("size 50", OperatorCommand::PageSize(50))]
    #[case("pacing 0", OperatorCommand::Pacing(0))]
    #[case("match 12", OperatorCommand::Match(12))]
    #[case("unmatch 12", OperatorCommand::Unmatch(12))]
    #[case("t 4", OperatorCommand::Toggle(4))]
    #[case("export", OperatorCommand::Export(None))]
    #[case("export out.csv", OperatorCommand::Export(Some(PathBuf::from("out.csv"))))]
    #[case("clear-cache", OperatorCommand::ClearCache)]
    #[case("quit", OperatorCommand::Quit)]
    fn parses(#[case] line: &str, #[case] expected: OperatorCommand) {
        assert_eq!(line.parse::<OperatorCommand>(), Ok(expected));
    }

    #[rstest]
    #[case("", CommandParseError::Empty)]
    #[case("jump 3", CommandParseError::Unknown("jump".into()))]
    #[case("page", CommandParseError::MissingArgument { command: "page", expected: "page number" })]
    #[case("match -1", CommandParseError::InvalidArgument { command: "match", value: "-1".into(), expected: "row id" })]
    fn rejects(#[case] line: &str, #[case] expected: CommandParseError) {
        assert_eq!(line.parse::<OperatorCommand>(), Err(expected));
    }
}
