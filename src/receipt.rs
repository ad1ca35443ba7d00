//! Receipt models for OCR payload parsing and normalization.
//!
//! The OCR collaborator hands back loosely typed JSON. Every field is read
//! tolerantly: malformed lines are dropped and malformed figures default, so
//! nothing downstream ever sees a missing or non-numeric amount.

use crate::money::Money;
use crate::participant::{IdAllocator, LineItem, OriginalItemId};
use log::debug;
use serde::Deserialize;
use serde_json::Value;

/// Raw OCR line as returned by the scan collaborator.
///
/// Fields are kept as untyped JSON values so a single bad field rejects only
/// its own line instead of the whole payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLineItem {
    /// Identifier assigned by the OCR service, if any
    #[serde(default)]
    pub id: Option<Value>,

    /// Item description; must be a non-empty string
    #[serde(default)]
    pub description: Option<Value>,

    /// Line total; must be a number >= 0
    #[serde(default)]
    pub total: Option<Value>,

    /// Unit count; a positive number, otherwise 1
    #[serde(default)]
    pub quantity: Option<Value>,
}

/// Raw OCR result for a whole receipt.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReceipt {
    #[serde(default, deserialize_with = "lenient_line_items")]
    pub line_items: Vec<RawLineItem>,

    #[serde(default)]
    pub tax: Option<Value>,
}

/// Accepts a missing or non-array `line_items` as empty and skips entries that
/// are not objects.
fn lenient_line_items<'de, D>(deserializer: D) -> std::result::Result<Vec<RawLineItem>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(entries) = value else {
        return Ok(Vec::new());
    };
    Ok(entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect())
}

impl RawReceipt {
    /// Parses a scan payload. A JSON `null` yields `None`.
    pub fn from_json(text: &str) -> serde_json::Result<Option<RawReceipt>> {
        let value: Value = serde_json::from_str(text)?;
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }
}

/// A validated OCR line, ready for expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLineItem {
    pub description: String,
    pub total: Money,
    pub quantity: u32,
    pub original_item_id: OriginalItemId,
}

impl RawLineItem {
    /// Validates the raw line.
    ///
    /// Returns `None` if the description is blank or the total is missing,
    /// non-numeric or negative.
    pub fn parse(&self, index: usize) -> Option<ParsedLineItem> {
        let description = match &self.description {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => return None,
        };
        let total = match &self.total {
            Some(Value::Number(n)) => Money::from_json_number(n)?,
            _ => return None,
        };
        if total.is_negative() {
            return None;
        }

        Some(ParsedLineItem {
            description,
            total,
            quantity: self.resolve_quantity(),
            original_item_id: self.original_item_id(index),
        })
    }

    /// Positive whole quantities are honoured; anything else counts as 1.
    fn resolve_quantity(&self) -> u32 {
        let Some(Value::Number(n)) = &self.quantity else {
            return 1;
        };
        if let Some(q) = n.as_u64() {
            return u32::try_from(q).ok().filter(|q| *q > 0).unwrap_or(1);
        }
        match n.as_f64() {
            Some(q) if q > 0.0 && q.fract() == 0.0 && q <= f64::from(u32::MAX) => q as u32,
            _ => 1,
        }
    }

    fn original_item_id(&self, index: usize) -> OriginalItemId {
        match &self.id {
            Some(Value::String(s)) if !s.is_empty() => OriginalItemId(s.clone()),
            Some(Value::Number(n)) => OriginalItemId(n.to_string()),
            _ => OriginalItemId(format!("line-{}", index)),
        }
    }
}

/// Tax as a non-negative amount; absent, non-numeric, negative or out-of-range
/// values become 0.
pub fn resolve_tax(raw: Option<&Value>) -> Money {
    let Some(value) = raw else {
        return Money::ZERO;
    };
    let tax = match value {
        Value::Number(n) => Money::from_json_number(n).filter(|tax| !tax.is_negative()),
        _ => None,
    };
    tax.unwrap_or_else(|| {
        debug!("Treating unusable tax {} as zero", value);
        Money::ZERO
    })
}

/// Result of normalizing one scan.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedReceipt {
    pub items: Vec<LineItem>,
    pub tax: Money,
}

impl NormalizedReceipt {
    pub fn empty() -> Self {
        NormalizedReceipt {
            items: Vec::new(),
            tax: Money::ZERO,
        }
    }
}

/// Flattens OCR lines into unit-quantity split items.
///
/// A line of quantity N > 1 becomes N items priced at `total / N`, labelled
/// `"<description> (i/N)"` and sharing one `original_item_id`.
///
/// `max_units_per_line` caps how many items one line may produce. A line above
/// the cap stays as a single item at the line total, so its units cannot be
/// assigned separately. The configured default sits far above real receipt
/// quantities.
pub fn normalize(
    raw: &RawReceipt,
    ids: &mut IdAllocator,
    max_units_per_line: u32,
) -> NormalizedReceipt {
    let mut items = Vec::new();

    for (index, raw_line) in raw.line_items.iter().enumerate() {
        let Some(line) = raw_line.parse(index) else {
            debug!("Line {}: dropping unusable OCR line {:?}", index, raw_line);
            continue;
        };

        let quantity = if line.quantity > max_units_per_line {
            debug!(
                "Line {}: quantity {} exceeds {}, keeping as one item",
                index, line.quantity, max_units_per_line
            );
            1
        } else {
            line.quantity
        };

        if quantity == 1 {
            items.push(LineItem::new(
                ids.item(),
                line.description,
                line.total,
                line.original_item_id,
            ));
            continue;
        }

        let unit_price = line.total.split(quantity as usize);
        for k in 1..=quantity {
            items.push(LineItem::new(
                ids.item(),
                format!("{} ({}/{})", line.description, k, quantity),
                unit_price,
                line.original_item_id.clone(),
            ));
        }
    }

    NormalizedReceipt {
        items,
        tax: resolve_tax(raw.tax.as_ref()),
    }
}
