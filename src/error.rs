//! Error types for the bill splitter.

use crate::participant::{ItemId, ParticipantId};
use crate::session::Step;
use thiserror::Error;

/// Result type alias for splitter operations
pub type Result<T> = std::result::Result<T, SplitError>;

/// Errors that can occur while building or calculating a split.
///
/// Every variant is recoverable: the session is left unchanged and the caller
/// can fix the roster or assignments and retry.
#[derive(Error, Debug)]
pub enum SplitError {
    /// Participant name is blank after trimming
    #[error("Participant name must not be empty")]
    EmptyName,

    /// A participant with the same name (ignoring case and surrounding spaces) exists
    #[error("{name} is already on the list")]
    DuplicateName { name: String },

    /// Referenced item does not exist in the current receipt
    #[error("Unknown item {0}")]
    UnknownItem(ItemId),

    /// Referenced participant is not on the roster
    #[error("Unknown participant {0}")]
    UnknownParticipant(ParticipantId),

    /// No participant goes by this name
    #[error("Nobody named {0} is on the list")]
    UnknownName(String),

    /// No item carries this label
    #[error("No item labelled {0}")]
    UnknownItemLabel(String),

    /// Calculation requested with an empty roster
    #[error("Add at least one person before calculating")]
    NoParticipants,

    /// Calculation requested with no receipt items
    #[error("No items found on the receipt")]
    NoItems,

    /// Receipt amounts add up past the largest representable value
    #[error("Receipt amounts are too large to add up")]
    AmountOutOfRange,

    /// Navigation not permitted from the current step
    #[error("Cannot move from {from} to {to}")]
    InvalidTransition { from: Step, to: Step },

    /// Assignment cannot start while a scan is still pending
    #[error("Waiting for the receipt scan to complete")]
    ScanNotFinished,

    /// Failed to open or read an input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Receipt payload is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Missing input file arguments
    #[error("Missing input file argument. Usage: bill-splitter <receipt.json> <commands.csv>")]
    MissingArgument,
}

impl SplitError {
    /// Returns `true` for conditions caused by roster or assignment state.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SplitError::EmptyName
                | SplitError::DuplicateName { .. }
                | SplitError::UnknownItem(_)
                | SplitError::UnknownParticipant(_)
                | SplitError::UnknownName(_)
                | SplitError::UnknownItemLabel(_)
                | SplitError::NoParticipants
                | SplitError::NoItems
                | SplitError::AmountOutOfRange
        )
    }
}
