//! Response-envelope normalization for bill lists
//!
//! The billing endpoints are not consistent about their list shape: some
//! return a bare array, others wrap it in `items`, `bills`, or `data`.
//! The accepted shapes are decoded once, here, and the rest of the system
//! only ever sees `Vec<Bill>`.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{ClientError, ClientResult};
use crate::models::Bill;

/// Union of list envelopes the backend is known to produce
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BillListEnvelope {
    Bare(Vec<Value>),
    Items { items: Vec<Value> },
    Bills { bills: Vec<Value> },
    Data { data: Vec<Value> },
    Unrecognized(Value),
}

impl BillListEnvelope {
    fn into_raw_list(self) -> Vec<Value> {
        match self {
            BillListEnvelope::Bare(list)
            | BillListEnvelope::Items { items: list }
            | BillListEnvelope::Bills { bills: list }
            | BillListEnvelope::Data { data: list } => list,
            // Unknown shape: a valid empty state, not an error, so the
            // caller can render an empty list instead of crashing.
            BillListEnvelope::Unrecognized(value) => {
                warn!(
                    shape = %shape_of(&value),
                    "unrecognized bill list envelope, treating as empty"
                );
                Vec::new()
            }
        }
    }
}

fn shape_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Decode a bill-list response body into validated bills.
///
/// Envelope detection is forgiving (unknown shapes become `[]`); the bill
/// records themselves are not — a list element missing `id`, `amount`, or
/// `status` fails the whole decode rather than leaking a half-formed bill
/// into the flow. Duplicate ids within one batch collapse to the first
/// occurrence.
pub fn normalize_bill_list(body: Value) -> ClientResult<Vec<Bill>> {
    let raw = serde_json::from_value::<BillListEnvelope>(body)
        .map_err(|err| ClientError::Decode(err.to_string()))?
        .into_raw_list();

    let mut bills = Vec::with_capacity(raw.len());
    for value in raw {
        let bill: Bill = serde_json::from_value(value)
            .map_err(|err| ClientError::Decode(format!("bill record: {err}")))?;
        bills.push(bill);
    }

    let mut seen = HashSet::new();
    bills.retain(|bill| {
        let fresh = seen.insert(bill.id);
        if !fresh {
            warn!(bill_id = %bill.id, "duplicate bill id in batch, keeping first");
        }
        fresh
    });

    Ok(bills)
}
