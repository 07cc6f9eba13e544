//! Shell command parsing.

use vteacher_core::{RecordId, RecordInput};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Open(RecordId),
    /// Navigate to an encoded (or raw JSON) location.
    Goto(String),
    Create(RecordInput),
    Update(RecordId, RecordInput),
    Delete(RecordId),
    Back,
    Dismiss,
    Stats,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  list                       show the list view
  open <id>                  show one record
  goto <location>            navigate to an encoded location
  new <title> | <body>       create a record
  edit <id> <title> | <body> update a record
  rm <id>                    delete a record
  back                       previous screen
  dismiss                    clear the failure message
  stats                      cache statistics
  quit";

pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    match word {
        "list" | "ls" => Ok(Command::List),
        "open" => parse_id(rest).map(Command::Open),
        "goto" if !rest.is_empty() => Ok(Command::Goto(rest.to_string())),
        "goto" => Err("usage: goto <location>".to_string()),
        "new" => Ok(Command::Create(parse_input(rest))),
        "edit" => {
            let (id, input) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| "usage: edit <id> <title> | <body>".to_string())?;
            Ok(Command::Update(parse_id(id)?, parse_input(input)))
        }
        "rm" => parse_id(rest).map(Command::Delete),
        "back" => Ok(Command::Back),
        "dismiss" => Ok(Command::Dismiss),
        "stats" => Ok(Command::Stats),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        "" => Err("empty command".to_string()),
        other => Err(format!("unknown command: {} (try help)", other)),
    }
}

fn parse_id(raw: &str) -> Result<RecordId, String> {
    raw.parse::<RecordId>()
        .map_err(|_| format!("invalid record id: {:?}", raw))
}

/// `<title> | <body>`; the body is optional.
fn parse_input(raw: &str) -> RecordInput {
    match raw.split_once('|') {
        Some((title, body)) => RecordInput::new(title.trim(), body.trim()),
        None => RecordInput::new(raw.trim(), ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: i64) -> RecordId {
        RecordId::new(value).unwrap()
    }

    #[test]
    fn test_parse_navigation_commands() {
        assert_eq!(parse_command("list"), Ok(Command::List));
        assert_eq!(parse_command("  open 4 "), Ok(Command::Open(id(4))));
        assert_eq!(parse_command("back"), Ok(Command::Back));
        assert_eq!(
            parse_command("goto %7B%22selectedId%22%3A2%7D"),
            Ok(Command::Goto("%7B%22selectedId%22%3A2%7D".to_string()))
        );
    }

    #[test]
    fn test_parse_mutations() {
        assert_eq!(
            parse_command("new Groceries | milk, eggs"),
            Ok(Command::Create(RecordInput::new("Groceries", "milk, eggs")))
        );
        assert_eq!(
            parse_command("edit 3 Title only"),
            Ok(Command::Update(id(3), RecordInput::new("Title only", "")))
        );
        assert_eq!(parse_command("rm 9"), Ok(Command::Delete(id(9))));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_command("open zero").is_err());
        assert!(parse_command("open 0").is_err());
        assert!(parse_command("edit 3").is_err());
        assert!(parse_command("goto").is_err());
        assert!(parse_command("fly").is_err());
        assert!(parse_command("   ").is_err());
    }
}
