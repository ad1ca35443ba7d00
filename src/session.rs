//! Wizard session: step navigation, scan lifecycle and result caching.
//!
//! A session exclusively owns its [`SplitEngine`]. Every command is
//! synchronous; the only asynchronous boundary is the external scan, which
//! the session sees as a start hook and a completion hook.
//!
//! # Scan ordering
//!
//! Each call to [`Session::on_scan_start`] stamps the attempt with a new
//! [`ScanTicket`]. A completion carrying anything but the latest ticket is
//! stale and ignored, so a slow earlier scan can never overwrite the items of
//! a newer one.

use crate::config::SplitterConfig;
use crate::engine::{SplitEngine, SplitResult};
use crate::error::{Result, SplitError};
use crate::participant::{ItemId, LineItem, Participant, ParticipantId};
use crate::receipt::{normalize, RawReceipt};
use log::{debug, info, warn};
use std::fmt;

/// Wizard steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
    Uploading,
    PeopleEntry,
    Assigning,
    Results,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Uploading => "upload",
            Step::PeopleEntry => "people entry",
            Step::Assigning => "assignment",
            Step::Results => "results",
        };
        f.write_str(name)
    }
}

/// Sequence stamp of one scan attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScanTicket(u64);

/// Where the current scan stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStatus {
    /// No scan started yet.
    Idle,
    Processing,
    /// Scan succeeded and produced this many split items.
    Complete { items: usize },
    /// Scan succeeded but returned no payload.
    NoData,
    /// Upload or OCR failed; display-ready reason.
    Failed(String),
}

impl ScanStatus {
    /// Returns `true` once the scan reached a terminal outcome.
    pub fn is_terminated(&self) -> bool {
        matches!(
            self,
            ScanStatus::Complete { .. } | ScanStatus::NoData | ScanStatus::Failed(_)
        )
    }

    /// Human-readable status line.
    pub fn message(&self) -> String {
        match self {
            ScanStatus::Idle => String::new(),
            ScanStatus::Processing => "Processing receipt...".to_string(),
            ScanStatus::Complete { .. } => "Scan complete! Proceed to assign items.".to_string(),
            ScanStatus::NoData => "Scan finished, but no usable data found.".to_string(),
            ScanStatus::Failed(reason) => format!("Error: {}", reason),
        }
    }
}

/// What happened to a scan completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanCompletion {
    /// Completion applied; carries the new status.
    Applied(ScanStatus),
    /// Completion belonged to a superseded or already finished attempt.
    Stale,
}

/// Outcome handed over by the scan collaborator: a payload (possibly absent)
/// or a failure reason.
pub type ScanOutcome = std::result::Result<Option<RawReceipt>, String>;

/// One active bill.
#[derive(Debug)]
pub struct Session {
    engine: SplitEngine,
    config: SplitterConfig,
    step: Step,
    latest_scan: u64,
    scan_status: ScanStatus,
    result: Option<SplitResult>,
}

impl Session {
    pub fn new(config: SplitterConfig) -> Self {
        Session {
            engine: SplitEngine::with_tolerance(config.tolerance()),
            config,
            step: Step::Uploading,
            latest_scan: 0,
            scan_status: ScanStatus::Idle,
            result: None,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn scan_status(&self) -> &ScanStatus {
        &self.scan_status
    }

    pub fn engine(&self) -> &SplitEngine {
        &self.engine
    }

    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    pub fn participants(&self) -> &[Participant] {
        self.engine.participants()
    }

    pub fn items(&self) -> &[LineItem] {
        self.engine.items()
    }

    /// The last computed result, unless a later mutation invalidated it.
    pub fn result(&self) -> Option<&SplitResult> {
        self.result.as_ref()
    }

    fn invalidate(&mut self) {
        if self.result.take().is_some() {
            debug!("Discarding computed split after state change");
        }
    }

    /// Marks a new scan as in flight. Clears items, tax and any result.
    pub fn on_scan_start(&mut self) -> ScanTicket {
        self.latest_scan += 1;
        self.scan_status = ScanStatus::Processing;
        self.engine.clear_receipt();
        self.invalidate();
        debug!("Scan {} started", self.latest_scan);
        ScanTicket(self.latest_scan)
    }

    /// Applies the outcome of a scan, unless it is stale.
    pub fn on_scan_complete(&mut self, ticket: ScanTicket, outcome: ScanOutcome) -> ScanCompletion {
        if ticket.0 != self.latest_scan || self.scan_status != ScanStatus::Processing {
            warn!(
                "Ignoring completion of scan {} (latest is {}, status {:?})",
                ticket.0, self.latest_scan, self.scan_status
            );
            return ScanCompletion::Stale;
        }

        self.scan_status = match outcome {
            Ok(Some(raw)) => {
                let max_units = self.config.max_units_per_line;
                let receipt = normalize(&raw, self.engine.ids_mut(), max_units);
                let items = receipt.items.len();
                self.engine.replace_receipt(receipt);
                info!("Scan {} complete with {} items", ticket.0, items);
                ScanStatus::Complete { items }
            }
            Ok(None) => {
                self.engine.clear_receipt();
                warn!("Scan {} returned no usable data", ticket.0);
                ScanStatus::NoData
            }
            Err(reason) => {
                self.engine.clear_receipt();
                warn!("Scan {} failed: {}", ticket.0, reason);
                ScanStatus::Failed(reason)
            }
        };
        self.invalidate();
        ScanCompletion::Applied(self.scan_status.clone())
    }

    pub fn add_participant(&mut self, name: &str) -> Result<ParticipantId> {
        let id = self.engine.add_participant(name)?;
        self.invalidate();
        Ok(id)
    }

    pub fn remove_participant(&mut self, id: ParticipantId) -> bool {
        let removed = self.engine.remove_participant(id);
        if removed {
            self.invalidate();
        }
        removed
    }

    pub fn set_assignment<I>(&mut self, item_id: ItemId, participant_ids: I) -> Result<()>
    where
        I: IntoIterator<Item = ParticipantId>,
    {
        self.engine.set_assignment(item_id, participant_ids)?;
        self.invalidate();
        Ok(())
    }

    /// Advances one step.
    ///
    /// Leaving people entry requires a finished scan and at least one
    /// participant. Results are only reached through [`Session::calculate`].
    pub fn next(&mut self) -> Result<Step> {
        let target = match self.step {
            Step::Uploading => Step::PeopleEntry,
            Step::PeopleEntry => {
                if !self.scan_status.is_terminated() {
                    return Err(SplitError::ScanNotFinished);
                }
                if self.engine.participants().is_empty() {
                    return Err(SplitError::NoParticipants);
                }
                Step::Assigning
            }
            Step::Assigning | Step::Results => {
                return Err(SplitError::InvalidTransition {
                    from: self.step,
                    to: Step::Results,
                })
            }
        };
        debug!("Moving from {} to {}", self.step, target);
        self.step = target;
        Ok(target)
    }

    /// Steps back. Stays put on the first step.
    pub fn back(&mut self) -> Step {
        self.step = match self.step {
            Step::Uploading | Step::PeopleEntry => Step::Uploading,
            Step::Assigning => Step::PeopleEntry,
            Step::Results => Step::Assigning,
        };
        self.step
    }

    /// Calculates the split and moves to the results step.
    ///
    /// Allowed from the assignment step, or from results to recompute after a
    /// change. On failure the session is left untouched.
    pub fn calculate(&mut self) -> Result<&SplitResult> {
        if !matches!(self.step, Step::Assigning | Step::Results) {
            return Err(SplitError::InvalidTransition {
                from: self.step,
                to: Step::Results,
            });
        }

        let result = self.engine.calculate()?;
        self.step = Step::Results;
        let stored: &SplitResult = self.result.insert(result);
        Ok(stored)
    }

    /// Starts over: empty roster and receipt, back to the upload step.
    ///
    /// The scan sequence keeps counting, so completions of scans started
    /// before the reset stay stale.
    pub fn reset(&mut self) {
        self.engine = SplitEngine::with_tolerance(self.config.tolerance());
        self.step = Step::Uploading;
        self.scan_status = ScanStatus::Idle;
        self.result = None;
        info!("Session reset");
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SplitterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SplitWarning;
    use crate::money::Money;
    use std::str::FromStr;

    fn receipt(json: &str) -> Option<RawReceipt> {
        RawReceipt::from_json(json).unwrap()
    }

    fn scanned_session(json: &str) -> Session {
        let mut session = Session::default();
        let ticket = session.on_scan_start();
        session.on_scan_complete(ticket, Ok(receipt(json)));
        session
    }

    #[test]
    fn test_happy_path_through_all_steps() {
        let mut session = Session::default();
        assert_eq!(session.next().unwrap(), Step::PeopleEntry);

        let ticket = session.on_scan_start();
        let completion = session.on_scan_complete(
            ticket,
            Ok(receipt(r#"{"line_items":[{"description":"Pasta","total":20}],"tax":2}"#)),
        );
        assert_eq!(completion, ScanCompletion::Applied(ScanStatus::Complete { items: 1 }));

        let a = session.add_participant("Ana").unwrap();
        assert_eq!(session.next().unwrap(), Step::Assigning);

        let item = session.items()[0].id;
        session.set_assignment(item, [a]).unwrap();
        let result = session.calculate().unwrap();
        assert_eq!(result.total_for(a), Some(Money::from_str("20").unwrap()));
        assert_eq!(session.step(), Step::Results);
    }

    #[test]
    fn test_people_entry_waits_for_scan() {
        let mut session = Session::default();
        session.next().unwrap();
        session.add_participant("Ana").unwrap();

        assert!(matches!(session.next(), Err(SplitError::ScanNotFinished)));

        let ticket = session.on_scan_start();
        assert!(matches!(session.next(), Err(SplitError::ScanNotFinished)));

        session.on_scan_complete(ticket, Err("Failed to upload receipt image.".to_string()));
        assert_eq!(session.next().unwrap(), Step::Assigning);
    }

    #[test]
    fn test_people_entry_requires_participant() {
        let mut session = scanned_session(r#"{"line_items":[]}"#);
        session.next().unwrap();
        assert!(matches!(session.next(), Err(SplitError::NoParticipants)));
    }

    #[test]
    fn test_results_only_via_calculate() {
        let mut session = scanned_session(r#"{"line_items":[{"description":"Tea","total":3}]}"#);
        session.next().unwrap();
        session.add_participant("Ana").unwrap();
        session.next().unwrap();

        assert!(matches!(
            session.next(),
            Err(SplitError::InvalidTransition { from: Step::Assigning, to: Step::Results })
        ));
    }

    #[test]
    fn test_calculate_rejected_before_assigning() {
        let mut session = scanned_session(r#"{"line_items":[{"description":"Tea","total":3}]}"#);
        session.add_participant("Ana").unwrap();
        assert!(matches!(
            session.calculate(),
            Err(SplitError::InvalidTransition { from: Step::Uploading, .. })
        ));
    }

    #[test]
    fn test_back_navigation() {
        let mut session = scanned_session(r#"{"line_items":[{"description":"Tea","total":3}]}"#);
        assert_eq!(session.back(), Step::Uploading);
        session.next().unwrap();
        session.add_participant("Ana").unwrap();
        session.next().unwrap();
        session.calculate().unwrap();
        assert_eq!(session.back(), Step::Assigning);
        assert_eq!(session.back(), Step::PeopleEntry);
        assert_eq!(session.back(), Step::Uploading);
    }

    #[test]
    fn test_stale_scan_completion_ignored() {
        let mut session = Session::default();
        let first = session.on_scan_start();
        let second = session.on_scan_start();

        let fresh = session.on_scan_complete(
            second,
            Ok(receipt(r#"{"line_items":[{"description":"New","total":5}]}"#)),
        );
        assert_eq!(fresh, ScanCompletion::Applied(ScanStatus::Complete { items: 1 }));

        let late = session.on_scan_complete(
            first,
            Ok(receipt(r#"{"line_items":[{"description":"Old","total":9}]}"#)),
        );
        assert_eq!(late, ScanCompletion::Stale);
        assert_eq!(session.items()[0].name, "New");
    }

    #[test]
    fn test_duplicate_completion_ignored() {
        let mut session = Session::default();
        let ticket = session.on_scan_start();
        let payload = receipt(r#"{"line_items":[{"description":"A","total":1}]}"#);
        session.on_scan_complete(ticket, Ok(payload));
        let again = session.on_scan_complete(ticket, Err("late failure".to_string()));
        assert_eq!(again, ScanCompletion::Stale);
        assert_eq!(session.items().len(), 1);
    }

    #[test]
    fn test_null_payload_is_no_data() {
        let session = scanned_session("null");
        assert_eq!(session.scan_status(), &ScanStatus::NoData);
        assert!(session.items().is_empty());
        assert_eq!(session.scan_status().message(), "Scan finished, but no usable data found.");
    }

    #[test]
    fn test_failed_scan_message() {
        let mut session = Session::default();
        let ticket = session.on_scan_start();
        session.on_scan_complete(ticket, Err("Network Error".to_string()));
        assert_eq!(session.scan_status().message(), "Error: Network Error");
        assert!(session.items().is_empty());
    }

    #[test]
    fn test_mutations_invalidate_result() {
        let mut session = scanned_session(r#"{"line_items":[{"description":"Tea","total":3}]}"#);
        session.next().unwrap();
        let a = session.add_participant("Ana").unwrap();
        session.next().unwrap();
        session.calculate().unwrap();
        assert!(session.result().is_some());

        let b = session.add_participant("Ben").unwrap();
        assert!(session.result().is_none());
        session.calculate().unwrap();

        let item = session.items()[0].id;
        session.set_assignment(item, [a, b]).unwrap();
        assert!(session.result().is_none());
        session.calculate().unwrap();

        session.remove_participant(b);
        assert!(session.result().is_none());
        assert_eq!(session.step(), Step::Results);

        let result = session.calculate().unwrap();
        assert_eq!(result.total_for(a), Some(Money::from_str("3").unwrap()));
    }

    #[test]
    fn test_rescan_clears_items_and_result() {
        let mut session =
            scanned_session(r#"{"line_items":[{"description":"Tea","total":3}],"tax":1}"#);
        session.next().unwrap();
        session.add_participant("Ana").unwrap();
        session.next().unwrap();
        session.calculate().unwrap();

        session.on_scan_start();
        assert!(session.items().is_empty());
        assert!(session.engine().tax().is_zero());
        assert!(session.result().is_none());
        assert_eq!(session.participants().len(), 1);
    }

    #[test]
    fn test_empty_scan_fails_calculation_with_no_items() {
        let mut session = scanned_session(r#"{"line_items":[]}"#);
        session.next().unwrap();
        session.add_participant("Ana").unwrap();
        session.next().unwrap();
        assert!(matches!(session.calculate(), Err(SplitError::NoItems)));
        assert_eq!(session.step(), Step::Assigning);
    }

    #[test]
    fn test_nothing_assigned_still_reaches_results() {
        let mut session = scanned_session(r#"{"line_items":[{"description":"Tea","total":3}]}"#);
        session.next().unwrap();
        session.add_participant("Ana").unwrap();
        session.next().unwrap();

        let result = session.calculate().unwrap();
        assert_eq!(result.warning, Some(SplitWarning::NothingAssigned));
        assert_eq!(session.step(), Step::Results);
    }

    #[test]
    fn test_reset_keeps_scan_sequence() {
        let mut session = Session::default();
        let ticket = session.on_scan_start();
        session.add_participant("Ana").unwrap();
        session.reset();

        assert_eq!(session.step(), Step::Uploading);
        assert!(session.participants().is_empty());
        assert_eq!(session.scan_status(), &ScanStatus::Idle);

        let late = session.on_scan_complete(
            ticket,
            Ok(receipt(r#"{"line_items":[{"description":"Old","total":9}]}"#)),
        );
        assert_eq!(late, ScanCompletion::Stale);
        assert!(session.items().is_empty());
    }

    #[test]
    fn test_out_of_range_receipt_does_not_reach_results() {
        let mut session = scanned_session(
            r#"{"line_items":[{"description":"A","total":5e28},{"description":"B","total":5e28}]}"#,
        );
        session.next().unwrap();
        let ana = session.add_participant("Ana").unwrap();
        session.next().unwrap();
        let first = session.items()[0].id;
        session.set_assignment(first, [ana]).unwrap();

        let err = session.calculate().unwrap_err();
        assert!(matches!(err, SplitError::AmountOutOfRange));
        assert_eq!(session.step(), Step::Assigning);
        assert!(session.result().is_none());
        assert_eq!(session.items().len(), 2);
    }
}
