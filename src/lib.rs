//! # Bill Splitter
//!
//! Splits a scanned receipt between the people who shared it. OCR line items
//! are normalized into individually assignable units, people are assigned to
//! units, and each person's share is computed with tax divided equally.
//!
//! ## Design Principles
//!
//! - **Exact arithmetic**: amounts use `rust_decimal` and are only rounded for display
//! - **Tolerant input**: malformed OCR lines are dropped, malformed figures default
//! - **Strict invariants**: assignments only ever reference people on the roster
//! - **Pure calculation**: the same state always yields the same result
//!
//! ## Example
//!
//! ```
//! use bill_splitter::{RawReceipt, Session};
//!
//! let mut session = Session::default();
//! let ticket = session.on_scan_start();
//! let raw = RawReceipt::from_json(
//!     r#"{"line_items":[{"description":"Pizza","total":24,"quantity":2}],"tax":3}"#,
//! )
//! .unwrap();
//! session.on_scan_complete(ticket, Ok(raw));
//!
//! let ana = session.add_participant("Ana").unwrap();
//! let ben = session.add_participant("Ben").unwrap();
//! let slices: Vec<_> = session.items().iter().map(|i| i.id).collect();
//! session.set_assignment(slices[0], [ana]).unwrap();
//! session.set_assignment(slices[1], [ana, ben]).unwrap();
//!
//! session.next().unwrap();
//! session.next().unwrap();
//! let result = session.calculate().unwrap();
//! assert_eq!(result.total_for(ana).unwrap().to_string(), "18.00");
//! assert_eq!(result.tax_share().to_string(), "1.50");
//! ```

pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod money;
pub mod participant;
pub mod receipt;
pub mod report;
pub mod session;

pub use command::{process_commands, Command, CommandRecord};
pub use config::{load_configuration, SplitterConfig};
pub use engine::{PersonTotal, Severity, SplitEngine, SplitResult, SplitWarning};
pub use error::{Result, SplitError};
pub use money::Money;
pub use participant::{IdAllocator, ItemId, LineItem, OriginalItemId, Participant, ParticipantId};
pub use receipt::{normalize, NormalizedReceipt, RawLineItem, RawReceipt};
pub use report::{person_shares, write_csv, PersonShare};
pub use session::{ScanCompletion, ScanOutcome, ScanStatus, ScanTicket, Session, Step};
