//! Typed access to loose record field maps.
//!
//! Upstream tables spell the same concept several ways ("Full Name" vs
//! "FullName", a link list vs a bare id string). Every accessor takes an
//! ordered alias list and returns the first usable value, so the untyped maps
//! never leak past the entity boundary.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

static ISO_DATE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})").expect("static regex"));

/// One photo attachment on a dish record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    #[serde(default)]
    pub filename: String,
}

/// First alias present whose value is a non-empty string.
pub fn str_field<'a>(fields: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a str> {
    for alias in aliases {
        if let Some(Value::String(s)) = fields.get(*alias) {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                return Some(trimmed);
            }
        }
    }
    None
}

/// First alias present with a boolean value.
pub fn bool_field(fields: &Map<String, Value>, aliases: &[&str]) -> Option<bool> {
    for alias in aliases {
        if let Some(Value::Bool(b)) = fields.get(*alias) {
            return Some(*b);
        }
    }
    None
}

/// First alias present with a numeric value, truncated to u32.
pub fn u32_field(fields: &Map<String, Value>, aliases: &[&str]) -> Option<u32> {
    for alias in aliases {
        if let Some(Value::Number(n)) = fields.get(*alias) {
            if let Some(v) = n.as_u64() {
                return Some(v as u32);
            }
        }
    }
    None
}

/// Linked-record ids under the first matching alias. Accepts both the link
/// list shape (`["recA", "recB"]`) and a bare id string.
pub fn link_ids(fields: &Map<String, Value>, aliases: &[&str]) -> Vec<String> {
    for alias in aliases {
        match fields.get(*alias) {
            Some(Value::Array(items)) => {
                let ids: Vec<String> = items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(|s| s.to_string())
                    .collect();
                if !ids.is_empty() {
                    return ids;
                }
            }
            Some(Value::String(s)) if !s.trim().is_empty() => {
                return vec![s.trim().to_string()];
            }
            _ => {}
        }
    }
    Vec::new()
}

pub fn first_link_id(fields: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    link_ids(fields, aliases).into_iter().next()
}

/// Calendar date under the first matching alias. Tolerates a trailing time
/// component ("2024-05-10T00:00:00.000Z") by taking the date prefix.
pub fn date_field(fields: &Map<String, Value>, aliases: &[&str]) -> Option<NaiveDate> {
    let raw = str_field(fields, aliases)?;
    let date_part = ISO_DATE_PREFIX
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Attachment list under the first matching alias.
pub fn attachments(fields: &Map<String, Value>, aliases: &[&str]) -> Vec<Attachment> {
    for alias in aliases {
        if let Some(value) = fields.get(*alias) {
            if let Ok(list) = serde_json::from_value::<Vec<Attachment>>(value.clone()) {
                if !list.is_empty() {
                    return list;
                }
            }
        }
    }
    Vec::new()
}
