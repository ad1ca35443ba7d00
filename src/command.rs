//! Command records for driving a session from CSV.
//!
//! Each row names a command and its arguments:
//!
//! ```text
//! command,subject,people
//! add,Alice,
//! add,Bob,
//! assign,Pizza (1/2),Alice;Bob
//! remove,Bob,
//! calculate,,
//! ```
//!
//! People are referred to by name (case-insensitive) and items by label.

use crate::error::{Result, SplitError};
use crate::session::{Session, Step};
use csv::{ReaderBuilder, Trim};
use log::{debug, warn};
use serde::Deserialize;
use std::io::Read;

/// Raw command row as read from CSV.
#[derive(Debug, Deserialize)]
pub struct CommandRecord {
    /// Command name: add, remove, assign, calculate
    pub command: String,

    /// Person name for add/remove, item label for assign
    #[serde(default)]
    pub subject: Option<String>,

    /// `;`-separated names for assign
    #[serde(default)]
    pub people: Option<String>,
}

/// A parsed command ready to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(String),
    Remove(String),
    Assign { item: String, people: Vec<String> },
    Calculate,
}

impl CommandRecord {
    /// Parses the raw record into a typed command.
    ///
    /// Returns `None` for unknown commands or missing subjects.
    pub fn parse(&self) -> Option<Command> {
        let command = self.command.trim().to_lowercase();

        match command.as_str() {
            "add" => self.subject().map(Command::Add),
            "remove" => self.subject().map(Command::Remove),
            "assign" => {
                let item = self.subject()?;
                let people = self
                    .people
                    .as_deref()
                    .unwrap_or_default()
                    .split(';')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect();
                Some(Command::Assign { item, people })
            }
            "calculate" => Some(Command::Calculate),
            _ => None,
        }
    }

    fn subject(&self) -> Option<String> {
        let subject = self.subject.as_ref()?.trim();
        if subject.is_empty() {
            return None;
        }
        Some(subject.to_string())
    }
}

impl Command {
    /// Applies the command to a session.
    pub fn apply(&self, session: &mut Session) -> Result<()> {
        match self {
            Command::Add(name) => {
                session.add_participant(name)?;
            }
            Command::Remove(name) => {
                let id = session
                    .engine()
                    .find_participant(name)
                    .map(|p| p.id)
                    .ok_or_else(|| SplitError::UnknownName(name.clone()))?;
                session.remove_participant(id);
            }
            Command::Assign { item, people } => {
                let engine = session.engine();
                let item_id = engine
                    .find_item(item)
                    .map(|i| i.id)
                    .ok_or_else(|| SplitError::UnknownItemLabel(item.clone()))?;
                let ids = people
                    .iter()
                    .map(|name| {
                        engine
                            .find_participant(name)
                            .map(|p| p.id)
                            .ok_or_else(|| SplitError::UnknownName(name.clone()))
                    })
                    .collect::<Result<Vec<_>>>()?;
                session.set_assignment(item_id, ids)?;
            }
            Command::Calculate => {
                advance_to_assigning(session)?;
                session.calculate()?;
            }
        }
        Ok(())
    }
}

/// Walks forward until the session can calculate.
pub fn advance_to_assigning(session: &mut Session) -> Result<()> {
    while session.step() < Step::Assigning {
        session.next()?;
    }
    Ok(())
}

/// Applies commands from a CSV reader row by row.
///
/// Unparseable rows and commands that fail validation are logged at warn
/// level and skipped.
pub fn process_commands<R: Read>(session: &mut Session, reader: R) -> Result<()> {
    let mut csv_reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    for (row_idx, result) in csv_reader.deserialize::<CommandRecord>().enumerate() {
        let row_num = row_idx + 2; // 1-indexed, accounting for header row

        match result {
            Ok(record) => {
                if let Some(command) = record.parse() {
                    match command.apply(session) {
                        Ok(()) => debug!("Row {}: applied {:?}", row_num, command),
                        Err(e) => warn!("Row {}: {}", row_num, e),
                    }
                } else {
                    warn!("Row {}: Failed to parse command record", row_num);
                }
            }
            Err(e) => {
                warn!("Row {}: CSV parse error: {}", row_num, e);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::receipt::RawReceipt;
    use std::io::Cursor;
    use std::str::FromStr;

    fn record(command: &str, subject: Option<&str>, people: Option<&str>) -> CommandRecord {
        CommandRecord {
            command: command.to_string(),
            subject: subject.map(str::to_string),
            people: people.map(str::to_string),
        }
    }

    fn scanned(json: &str) -> Session {
        let mut session = Session::default();
        let ticket = session.on_scan_start();
        session.on_scan_complete(ticket, Ok(RawReceipt::from_json(json).unwrap()));
        session
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            record("ADD", Some(" Alice "), None).parse(),
            Some(Command::Add("Alice".to_string()))
        );
        assert_eq!(
            record("assign", Some("Pizza"), Some("Alice; Bob;;")).parse(),
            Some(Command::Assign {
                item: "Pizza".to_string(),
                people: vec!["Alice".to_string(), "Bob".to_string()],
            })
        );
        assert_eq!(
            record("assign", Some("Pizza"), None).parse(),
            Some(Command::Assign {
                item: "Pizza".to_string(),
                people: vec![],
            })
        );
        assert_eq!(record("calculate", None, None).parse(), Some(Command::Calculate));
    }

    #[test]
    fn test_parse_rejects_bad_records() {
        assert!(record("add", None, None).parse().is_none());
        assert!(record("remove", Some("  "), None).parse().is_none());
        assert!(record("split", Some("x"), None).parse().is_none());
    }

    #[test]
    fn test_process_commands_skips_invalid_rows() {
        let mut session = scanned(
            r#"{"line_items":[{"description":"Pizza","total":20,"quantity":2}],"tax":4}"#,
        );
        let csv = "command,subject,people
add,Alice,
add,alice,
add,Bob,
bogus,row,
assign,Pizza (1/2),Alice;Bob
assign,Pizza (2/2),Alice;Zed
assign,Pizza (2/2),Alice
assign,Soup,Alice
calculate,,";

        process_commands(&mut session, Cursor::new(csv)).unwrap();

        assert_eq!(session.participants().len(), 2);
        let result = session.result().unwrap();
        let alice = session.engine().find_participant("alice").unwrap().id;
        let bob = session.engine().find_participant("bob").unwrap().id;
        assert_eq!(result.total_for(alice), Some(Money::from_str("15").unwrap()));
        assert_eq!(result.total_for(bob), Some(Money::from_str("5").unwrap()));
        assert_eq!(result.tax_share(), Money::from_str("2").unwrap());
    }

    #[test]
    fn test_remove_by_name() {
        let mut session = scanned(r#"{"line_items":[{"description":"Tea","total":3}]}"#);
        Command::Add("Ana".to_string()).apply(&mut session).unwrap();
        Command::Remove("ANA".to_string()).apply(&mut session).unwrap();
        assert!(session.participants().is_empty());

        let err = Command::Remove("Ana".to_string()).apply(&mut session).unwrap_err();
        assert!(matches!(err, SplitError::UnknownName(_)));
    }
}
