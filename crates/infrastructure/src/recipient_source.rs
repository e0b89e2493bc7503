//! Loads recipient lists from files.
//!
//! `.json` files hold an array of row objects as exported from a
//! spreadsheet; anything else is read as one number per line.

use std::path::Path;

use serde_json::{Map, Number, Value};
use tracing::{debug, info};

use bulk_sender_core::{DispatchError, Recipient, Result};

/// Header fragments identifying the phone number column.
pub const PHONE_COLUMN_KEYWORDS: &[&str] = &[
    "phone", "mobile", "number", "هاتف", "موبايل", "رقم", "جوال",
];

pub async fn load_recipients(path: impl AsRef<Path>) -> Result<Vec<Recipient>> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let recipients = if is_json {
        let rows: Vec<Map<String, Value>> = serde_json::from_str(&content).map_err(|e| {
            DispatchError::Validation(format!("{} 不是有效的行数组: {e}", path.display()))
        })?;
        extract_recipients(&rows)
    } else {
        content.lines().filter_map(Recipient::parse).collect()
    };

    info!("Loaded {} recipients from {}", recipients.len(), path.display());
    Ok(recipients)
}

/// Picks the phone column of each row and normalizes its value.
pub fn extract_recipients(rows: &[Map<String, Value>]) -> Vec<Recipient> {
    rows.iter()
        .enumerate()
        .filter_map(|(index, row)| {
            let recipient = phone_cell(row).and_then(cell_text).and_then(|t| Recipient::parse(&t));
            if recipient.is_none() {
                debug!("Row {} has no usable phone number", index + 1);
            }
            recipient
        })
        .collect()
}

fn phone_cell(row: &Map<String, Value>) -> Option<&Value> {
    row.iter()
        .find(|(header, _)| is_phone_header(header))
        .map(|(_, value)| value)
}

fn is_phone_header(header: &str) -> bool {
    let header = header.to_lowercase();
    PHONE_COLUMN_KEYWORDS
        .iter()
        .any(|keyword| header.contains(keyword))
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => number_text(n),
        _ => None,
    }
}

/// Exporters often write numeric columns as floats; `966501234567.0` must not
/// pick up a trailing zero once non-digits are stripped.
fn number_text(n: &Number) -> Option<String> {
    if let Some(value) = n.as_u64() {
        return Some(value.to_string());
    }
    if let Some(value) = n.as_i64() {
        return Some(value.to_string());
    }
    match n.as_f64() {
        Some(value) if value.is_finite() && value.fract() == 0.0 => Some(format!("{value:.0}")),
        _ => {
            debug!("Ignoring fractional phone number cell {}", n);
            None
        }
    }
}
