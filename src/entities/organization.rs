use serde::{Deserialize, Serialize};

use crate::entities::DishCategory;
use crate::errors::ServiceError;
use crate::store::fields;
use crate::store::Record;

/// Organization-level cap on how many "extra" dishes an order may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortionPolicy {
    Standard,
    /// Exactly one extra, and only a soup.
    Light,
    Upsized,
}

impl PortionPolicy {
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "light" => PortionPolicy::Light,
            "upsized" => PortionPolicy::Upsized,
            _ => PortionPolicy::Standard,
        }
    }

    /// Cap a requested extras list. Input is the requested dish ids with
    /// their categories, in request order; output is the persisted id list.
    ///
    /// Light keeps the first soup only. Standard and Upsized keep up to two:
    /// the first salad then the first soup, in that order regardless of how
    /// the request ordered them.
    pub fn cap_extras(self, requested: &[(String, DishCategory)]) -> Vec<String> {
        let first_of = |cat: DishCategory| {
            requested
                .iter()
                .find(|(_, c)| *c == cat)
                .map(|(id, _)| id.clone())
        };
        match self {
            PortionPolicy::Light => first_of(DishCategory::Soup).into_iter().collect(),
            PortionPolicy::Standard | PortionPolicy::Upsized => first_of(DishCategory::Salad)
                .into_iter()
                .chain(first_of(DishCategory::Soup))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub portion_policy: PortionPolicy,
}

impl Organization {
    pub fn from_record(rec: &Record) -> Result<Self, ServiceError> {
        let name = fields::str_field(&rec.fields, &["Name", "Org Name"])
            .ok_or_else(|| ServiceError::malformed("organization", &rec.id, "missing Name"))?
            .to_string();
        Ok(Organization {
            id: rec.id.clone(),
            name,
            portion_policy: fields::str_field(&rec.fields, &["Portion Policy", "PortionPolicy"])
                .map(PortionPolicy::parse)
                .unwrap_or(PortionPolicy::Standard),
        })
    }
}
