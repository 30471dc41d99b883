//! Canonical BAPB payload and its hash.
//!
//! The canonical form is compact JSON with a fixed key order:
//!
//! ```text
//! docId, contractNo, vendor, arrivalDate, inspector, inspectorEmail,
//! inspectDate, items, result
//! ```
//!
//! and for each entry of `items`:
//!
//! ```text
//! name, physQty, condition, note
//! ```
//!
//! The order is part of the public contract: changing it changes every hash.
//! Before serialization, quantities become integers (absent means `0`), an
//! empty condition becomes `"Baik"`, and dates are reduced to `YYYY-MM-DD`
//! (`"-"` when empty).

use crate::error::{Result, SignError};
use crate::hash::{hash_bytes, DocumentHash};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Condition assumed for an item when none was recorded.
pub const DEFAULT_CONDITION: &str = "Baik";

/// Placeholder for a missing date.
pub const MISSING_DATE: &str = "-";

/// The integrity-relevant fields of a goods-receipt document.
///
/// Field declaration order is the serialization order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BapbPayload {
    #[serde(deserialize_with = "lenient_string")]
    pub doc_id: String,
    #[serde(alias = "contract", deserialize_with = "lenient_string")]
    pub contract_no: String,
    #[serde(deserialize_with = "lenient_string")]
    pub vendor: String,
    #[serde(deserialize_with = "lenient_string")]
    pub arrival_date: String,
    #[serde(deserialize_with = "lenient_string")]
    pub inspector: String,
    #[serde(deserialize_with = "lenient_string")]
    pub inspector_email: String,
    #[serde(deserialize_with = "lenient_string")]
    pub inspect_date: String,
    #[serde(deserialize_with = "lenient_items")]
    pub items: Vec<InspectionItem>,
    #[serde(alias = "resultText", deserialize_with = "lenient_string")]
    pub result: String,
}

/// One inspected line item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InspectionItem {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_quantity")]
    pub phys_qty: i64,
    #[serde(deserialize_with = "lenient_string")]
    pub condition: String,
    #[serde(deserialize_with = "lenient_string")]
    pub note: String,
}

impl InspectionItem {
    pub fn new(
        name: impl Into<String>,
        phys_qty: i64,
        condition: impl Into<String>,
        note: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            phys_qty,
            condition: condition.into(),
            note: note.into(),
        }
    }

    fn normalized(&self) -> Self {
        let condition = if self.condition.is_empty() {
            DEFAULT_CONDITION.to_string()
        } else {
            self.condition.clone()
        };
        Self {
            condition,
            ..self.clone()
        }
    }
}

impl BapbPayload {
    /// Parse a payload from loosely-shaped JSON (any key order).
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SignError::InvalidFormat(e.to_string()))
    }

    /// Build a payload from an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| SignError::InvalidFormat(e.to_string()))
    }

    /// The payload with all defaults and normalizations applied.
    pub fn normalized(&self) -> Self {
        Self {
            arrival_date: normalize_date(&self.arrival_date),
            inspect_date: normalize_date(&self.inspect_date),
            items: self.items.iter().map(InspectionItem::normalized).collect(),
            ..self.clone()
        }
    }

    /// Serialize the normalized payload to its canonical JSON text.
    pub fn canonical_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.normalized())?)
    }

    /// SHA-256 over the canonical JSON text.
    pub fn compute_hash(&self) -> Result<DocumentHash> {
        let canonical = self.canonical_json()?;
        Ok(hash_bytes(canonical.as_bytes()))
    }
}

/// Hash a payload. Equivalent to [`BapbPayload::compute_hash`].
pub fn compute_hash(payload: &BapbPayload) -> Result<DocumentHash> {
    payload.compute_hash()
}

/// Reduce a date or timestamp to its `YYYY-MM-DD` form.
///
/// Timestamps are converted to UTC first. Unrecognized text is kept as is.
pub fn normalize_date(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return MISSING_DATE.to_string();
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return ts.with_timezone(&Utc).format("%Y-%m-%d").to_string();
    }
    if let Some(prefix) = trimmed.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return date.format("%Y-%m-%d").to_string();
        }
    }
    trimmed.to_string()
}

/// Interpret a quantity given as a JSON number or numeric string.
///
/// Absent, null and blank values are `0`. Fractional or non-numeric values
/// are rejected.
pub fn parse_quantity(value: Option<&Value>) -> Result<i64> {
    match value {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else {
                n.as_f64()
                    .and_then(integral)
                    .ok_or_else(|| SignError::InvalidFormat(format!("Invalid quantity: {}", n)))
            }
        }
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(0);
            }
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
                .ok_or_else(|| SignError::InvalidFormat(format!("Invalid quantity: {:?}", s)))
        }
        Some(other) => Err(SignError::InvalidFormat(format!(
            "Invalid quantity: {}",
            other
        ))),
    }
}

fn integral(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

fn lenient_items<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Vec<InspectionItem>, D::Error> {
    Ok(Option::<Vec<InspectionItem>>::deserialize(d)?.unwrap_or_default())
}

fn lenient_quantity<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<i64, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    parse_quantity(value.as_ref()).map_err(de::Error::custom)
}
