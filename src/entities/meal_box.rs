use serde::{Deserialize, Serialize};

use crate::store::fields;
use crate::store::Record;

/// A paired main + side selection, optionally carrying a precomposed label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealBox {
    pub id: String,
    pub main_name: Option<String>,
    pub side_name: Option<String>,
    pub precomposed_label: Option<String>,
}

impl MealBox {
    pub const MAIN_NAME_FIELD: &'static str = "Main Name";
    pub const SIDE_NAME_FIELD: &'static str = "Side Name";
    pub const LABEL_FIELD: &'static str = "MB Label";

    /// Meal boxes are tolerant of sparse rows; a box with nothing usable
    /// still parses and labels itself as em-dash.
    pub fn from_record(rec: &Record) -> Self {
        MealBox {
            id: rec.id.clone(),
            main_name: fields::str_field(&rec.fields, &[Self::MAIN_NAME_FIELD, "Main"])
                .map(|s| s.to_string()),
            side_name: fields::str_field(&rec.fields, &[Self::SIDE_NAME_FIELD, "Side"])
                .map(|s| s.to_string()),
            precomposed_label: fields::str_field(&rec.fields, &[Self::LABEL_FIELD, "Label"])
                .map(|s| s.to_string()),
        }
    }

    /// Display label: the precomposed one when present, otherwise
    /// synthesized from the dish names.
    pub fn label(&self) -> String {
        if let Some(label) = &self.precomposed_label {
            return label.clone();
        }
        compose_label(self.main_name.as_deref(), self.side_name.as_deref())
    }
}

/// Shared label synthesis, also used when creating new meal-box records.
pub fn compose_label(main: Option<&str>, side: Option<&str>) -> String {
    match (main, side) {
        (Some(m), Some(s)) => format!("{m} + {s}"),
        (Some(m), None) => m.to_string(),
        (None, Some(s)) => s.to_string(),
        (None, None) => "—".to_string(),
    }
}
