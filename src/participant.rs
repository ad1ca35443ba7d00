//! Participants, split items and the session-owned id allocator.
//!
//! Maintains the invariant: an item's `shared_by` set only ever references
//! participants that are currently on the roster.

use crate::money::Money;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Identifier of a participant, stable for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ParticipantId(pub u64);

/// Identifier of a split item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ItemId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic id source owned by a single session.
///
/// Participants and items draw from the same sequence, so an id is never
/// reused within a session even across rescans.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        IdAllocator { next: 0 }
    }

    fn mint(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    pub fn participant(&mut self) -> ParticipantId {
        ParticipantId(self.mint())
    }

    pub fn item(&mut self) -> ItemId {
        ItemId(self.mint())
    }
}

/// A person taking part in the split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    pub id: ParticipantId,

    /// Display name, stored trimmed.
    pub name: String,
}

impl Participant {
    pub fn new(id: ParticipantId, name: &str) -> Self {
        Participant {
            id,
            name: name.trim().to_string(),
        }
    }

    /// Compares names ignoring case and surrounding whitespace.
    pub fn has_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.trim().to_lowercase()
    }
}

/// Back-reference from a split item to the OCR line it came from.
///
/// Lookup only; the OCR line itself is not retained.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OriginalItemId(pub String);

impl fmt::Display for OriginalItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One individually assignable unit of a receipt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    pub id: ItemId,

    /// Label. Expanded units carry a `(k/N)` suffix.
    pub name: String,

    /// Unit price, never negative.
    pub price: Money,

    /// Participants sharing this item. Empty means unassigned.
    pub shared_by: BTreeSet<ParticipantId>,

    pub original_item_id: OriginalItemId,
}

impl LineItem {
    pub fn new(id: ItemId, name: String, price: Money, original_item_id: OriginalItemId) -> Self {
        LineItem {
            id,
            name,
            price,
            shared_by: BTreeSet::new(),
            original_item_id,
        }
    }

    /// Returns `true` if nobody is assigned to this item.
    pub fn is_unassigned(&self) -> bool {
        self.shared_by.is_empty()
    }

    /// The share each sharer owes, or `None` when unassigned.
    pub fn share_per_person(&self) -> Option<Money> {
        if self.shared_by.is_empty() {
            None
        } else {
            Some(self.price.split(self.shared_by.len()))
        }
    }

    /// Drops a participant from the sharers. Returns `true` if it was present.
    pub fn unassign(&mut self, participant: ParticipantId) -> bool {
        self.shared_by.remove(&participant)
    }
}
