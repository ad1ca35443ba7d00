//! Core split engine.
//!
//! Owns the participant roster, the split items of the current receipt and the
//! receipt tax. `calculate` is a pure function of that state: it never mutates
//! the engine and returns bit-identical results for unchanged input.
//!
//! # Tax boundary
//!
//! Item costs are divided by each item's own sharer count. Tax is not: the
//! result carries the raw `tax_total`, and dividing it equally across the whole
//! roster is left to presentation (see [`SplitResult::tax_share`]). The two
//! divisors differ whenever someone is assigned to no items, in which case that
//! person still owes an equal share of tax.

use crate::error::{Result, SplitError};
use crate::money::Money;
use crate::participant::{IdAllocator, ItemId, LineItem, Participant, ParticipantId};
use crate::receipt::NormalizedReceipt;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Default epsilon for the rounding-note check, one hundredth of a currency unit.
pub const DEFAULT_ROUNDING_TOLERANCE: Money = Money::new(Decimal::from_parts(1, 0, 0, false, 2));

/// How serious a calculation warning is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Info,
}

/// Data-quality note attached to a result. At most one is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitWarning {
    /// Items exist but none has a sharer; all individual totals are zero.
    NothingAssigned,

    /// Some items have no sharer and are excluded from individual totals.
    UnassignedItems,

    /// Individual totals drift from the assigned subtotal beyond the tolerance.
    RoundingDifference,
}

impl SplitWarning {
    pub fn severity(&self) -> Severity {
        match self {
            SplitWarning::NothingAssigned | SplitWarning::UnassignedItems => Severity::Warning,
            SplitWarning::RoundingDifference => Severity::Info,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            SplitWarning::NothingAssigned => "Assign items before totals are meaningful.",
            SplitWarning::UnassignedItems => {
                "Some items weren't assigned. Their cost isn't included in individual totals."
            }
            SplitWarning::RoundingDifference => "Slight rounding differences may occur.",
        }
    }
}

/// One participant's owed amount for items, before tax.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonTotal {
    pub id: ParticipantId,
    pub name: String,
    pub total: Money,
}

/// Outcome of a calculation.
///
/// `totals` follows roster order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitResult {
    pub totals: Vec<PersonTotal>,

    /// Sum of every item price plus tax, regardless of assignment.
    pub grand_total: Money,

    /// Receipt tax at calculation time, undivided.
    pub tax_total: Money,

    pub warning: Option<SplitWarning>,
}

impl SplitResult {
    /// Equal tax share per participant (`tax_total / participant count`).
    pub fn tax_share(&self) -> Money {
        self.tax_total.split(self.totals.len())
    }

    /// Looks up one participant's item total.
    pub fn total_for(&self, id: ParticipantId) -> Option<Money> {
        self.totals.iter().find(|t| t.id == id).map(|t| t.total)
    }
}

/// The split engine.
///
/// Holds the roster, the current receipt's split items and its tax.
#[derive(Debug)]
pub struct SplitEngine {
    participants: Vec<Participant>,
    items: Vec<LineItem>,
    tax: Money,
    ids: IdAllocator,
    rounding_tolerance: Money,
}

impl SplitEngine {
    /// Creates an empty engine with the default rounding tolerance.
    pub fn new() -> Self {
        Self::with_tolerance(DEFAULT_ROUNDING_TOLERANCE)
    }

    /// Creates an empty engine with a custom rounding tolerance.
    pub fn with_tolerance(rounding_tolerance: Money) -> Self {
        SplitEngine {
            participants: Vec::new(),
            items: Vec::new(),
            tax: Money::ZERO,
            ids: IdAllocator::new(),
            rounding_tolerance,
        }
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn tax(&self) -> Money {
        self.tax
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    /// Finds a participant by name, ignoring case and surrounding whitespace.
    pub fn find_participant(&self, name: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.has_name(name))
    }

    /// Finds an item by its exact label.
    pub fn find_item(&self, name: &str) -> Option<&LineItem> {
        let name = name.trim();
        self.items.iter().find(|i| i.name == name)
    }

    /// Mutable access to the allocator, for normalizing a new receipt.
    pub fn ids_mut(&mut self) -> &mut IdAllocator {
        &mut self.ids
    }

    /// Replaces all items and the tax with a freshly normalized receipt.
    pub fn replace_receipt(&mut self, receipt: NormalizedReceipt) {
        debug!(
            "Replacing {} items with {} items, tax {}",
            self.items.len(),
            receipt.items.len(),
            receipt.tax
        );
        self.items = receipt.items;
        self.tax = receipt.tax;
    }

    /// Clears items and tax.
    pub fn clear_receipt(&mut self) {
        self.replace_receipt(NormalizedReceipt::empty());
    }

    /// Adds a participant.
    ///
    /// Fails with [`SplitError::DuplicateName`] if the trimmed name matches an
    /// existing participant case-insensitively; the roster is unchanged.
    pub fn add_participant(&mut self, name: &str) -> Result<ParticipantId> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(SplitError::EmptyName);
        }

        if self.find_participant(trimmed).is_some() {
            warn!("{} is already on the list, ignoring", trimmed);
            return Err(SplitError::DuplicateName {
                name: trimmed.to_string(),
            });
        }

        let id = self.ids.participant();
        self.participants.push(Participant::new(id, trimmed));
        debug!("Added participant {} as {}", trimmed, id);
        Ok(id)
    }

    /// Removes a participant and strips them from every item.
    ///
    /// Unknown ids are ignored. Returns `true` if someone was removed.
    pub fn remove_participant(&mut self, id: ParticipantId) -> bool {
        let before = self.participants.len();
        self.participants.retain(|p| p.id != id);
        if self.participants.len() == before {
            debug!("Participant {} not on the roster, nothing to remove", id);
            return false;
        }

        let stripped = self
            .items
            .iter_mut()
            .map(|item| item.unassign(id))
            .filter(|was_assigned| *was_assigned)
            .count();
        debug!("Removed participant {} from roster and {} items", id, stripped);
        true
    }

    /// Replaces the full sharer set of an item.
    ///
    /// Duplicate ids collapse. Fails without mutating anything if the item or
    /// any participant is unknown.
    pub fn set_assignment<I>(&mut self, item_id: ItemId, participant_ids: I) -> Result<()>
    where
        I: IntoIterator<Item = ParticipantId>,
    {
        let sharers: BTreeSet<ParticipantId> = participant_ids.into_iter().collect();

        if let Some(unknown) = sharers.iter().find(|id| self.participant(**id).is_none()) {
            warn!("Assignment for item {} references unknown participant {}", item_id, unknown);
            return Err(SplitError::UnknownParticipant(*unknown));
        }

        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or(SplitError::UnknownItem(item_id))?;

        debug!("Item {} ({}) now shared by {} people", item_id, item.name, sharers.len());
        item.shared_by = sharers;
        Ok(())
    }

    /// Computes each participant's item total, the grand total and a warning.
    ///
    /// Fails with [`SplitError::AmountOutOfRange`] if any running sum, or any
    /// person's total with their tax share, leaves the representable range.
    pub fn calculate(&self) -> Result<SplitResult> {
        if self.participants.is_empty() {
            return Err(SplitError::NoParticipants);
        }
        if self.items.is_empty() {
            return Err(SplitError::NoItems);
        }

        let mut running: HashMap<ParticipantId, Money> = self
            .participants
            .iter()
            .map(|p| (p.id, Money::ZERO))
            .collect();
        let mut assigned_subtotal = Money::ZERO;
        let mut assigned_items = 0usize;

        for item in &self.items {
            let Some(share) = item.share_per_person() else {
                continue;
            };
            assigned_items += 1;
            assigned_subtotal = add_amounts(assigned_subtotal, item.price)?;
            for sharer in &item.shared_by {
                if let Some(total) = running.get_mut(sharer) {
                    *total = add_amounts(*total, share)?;
                }
            }
        }

        let totals: Vec<PersonTotal> = self
            .participants
            .iter()
            .map(|p| PersonTotal {
                id: p.id,
                name: p.name.clone(),
                total: running.get(&p.id).copied().unwrap_or(Money::ZERO),
            })
            .collect();

        let items_total = checked_sum(self.items.iter().map(|i| i.price))?;
        let grand_total = add_amounts(items_total, self.tax)?;

        let tax_share = self.tax.split(totals.len());
        for t in &totals {
            add_amounts(t.total, tax_share)?;
        }

        let warning = if assigned_items == 0 {
            Some(SplitWarning::NothingAssigned)
        } else if assigned_items < self.items.len() {
            Some(SplitWarning::UnassignedItems)
        } else {
            let individual = checked_sum(totals.iter().map(|t| t.total))?;
            if (individual - assigned_subtotal).abs() > self.rounding_tolerance {
                Some(SplitWarning::RoundingDifference)
            } else {
                None
            }
        };

        if let Some(w) = warning {
            info!("Calculation note: {}", w.message());
        }

        Ok(SplitResult {
            totals,
            grand_total,
            tax_total: self.tax,
            warning,
        })
    }
}

fn add_amounts(a: Money, b: Money) -> Result<Money> {
    a.checked_add(b).ok_or_else(|| {
        warn!("Sum of {} and {} is out of range", a, b);
        SplitError::AmountOutOfRange
    })
}

fn checked_sum<I: IntoIterator<Item = Money>>(amounts: I) -> Result<Money> {
    amounts.into_iter().try_fold(Money::ZERO, add_amounts)
}

impl Default for SplitEngine {
    fn default() -> Self {
        Self::new()
    }
}
