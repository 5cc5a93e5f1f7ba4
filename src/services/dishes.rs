//! Dish resolution against inconsistently-modeled upstream references.
//!
//! Callers hand us "something that identifies a dish": a dish record id, the
//! id of a menu or order-line record that merely links to a dish, or free
//! text. Upstream tables are not consistent about which, so resolution runs
//! tiers in a fixed order and the first success wins. Exhausting every tier
//! is `NotFound`, never a guess.

use std::sync::Arc;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::config::{ResolverSettings, TableNames};
use crate::entities::Dish;
use crate::errors::ServiceError;
use crate::store::fields::{self, Attachment};
use crate::store::{formula, Record, StoreClient};

#[derive(Clone)]
pub struct DishResolver {
    store: Arc<StoreClient>,
    tables: TableNames,
    settings: ResolverSettings,
    id_shape: Regex,
}

impl DishResolver {
    pub fn new(
        store: Arc<StoreClient>,
        tables: TableNames,
        settings: ResolverSettings,
    ) -> Result<Self, ServiceError> {
        let id_shape = Regex::new(&format!(
            "^{}[A-Za-z0-9]{{5,}}$",
            regex::escape(&settings.record_id_prefix)
        ))
        .map_err(|e| ServiceError::Internal(format!("record id pattern: {e}")))?;
        Ok(Self {
            store,
            tables,
            settings,
            id_shape,
        })
    }

    /// Resolve any dish-ish identifier to a canonical dish record id.
    #[instrument(skip(self), fields(input = %input))]
    pub async fn resolve(
        &self,
        input: &str,
        name_hint: Option<&str>,
    ) -> Result<String, ServiceError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ServiceError::Validation(
                "dish identifier must not be empty".to_string(),
            ));
        }

        if self.id_shape.is_match(input) {
            // Tier 1: the input is a dish id.
            match self.store.get(&self.tables.dishes, input).await {
                Ok(rec) => return Ok(rec.id),
                Err(ServiceError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }

            // Tier 2: the input is a linking record holding dish references.
            if let Some(id) = self.resolve_via_linking_record(input, name_hint).await? {
                return Ok(id);
            }
        }

        // Tier 3: the input is a name.
        if let Some(id) = self.resolve_by_name(input).await? {
            return Ok(id);
        }

        Err(ServiceError::NotFound(format!("dish '{input}'")))
    }

    async fn resolve_via_linking_record(
        &self,
        record_id: &str,
        name_hint: Option<&str>,
    ) -> Result<Option<String>, ServiceError> {
        for table in &self.settings.lookup_tables {
            let rec = match self.store.get(table, record_id).await {
                Ok(rec) => rec,
                Err(ServiceError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };

            let candidates = scan_candidate_ids(
                &rec.fields,
                &self.settings.candidate_dish_fields,
                &self.id_shape,
            );
            if candidates.is_empty() {
                debug!(table = %table, "linking record found but no dish-shaped fields");
                continue;
            }

            // Candidates are ids by shape only; confirm against the Dishes
            // table and keep candidate priority order.
            let found = self.store.get_many(&self.tables.dishes, &candidates).await?;
            let mut confirmed: Vec<Dish> = Vec::new();
            for id in &candidates {
                if let Some(rec) = found.iter().find(|r| &r.id == id) {
                    confirmed.push(Dish::from_record(rec)?);
                }
            }
            if confirmed.is_empty() {
                continue;
            }

            let chosen = pick_by_hint(&confirmed, name_hint);
            debug!(table = %table, dish_id = %chosen, "resolved via linking record");
            return Ok(Some(chosen));
        }
        Ok(None)
    }

    /// Name search: exact, then case-insensitive substring, then normalized
    /// comparison over a full scan. Within a tier ties break on (name, id)
    /// so resolution is deterministic.
    async fn resolve_by_name(&self, term: &str) -> Result<Option<String>, ServiceError> {
        let exact = self
            .store
            .query(
                &self.tables.dishes,
                Some(&formula::eq("Name", term)),
            )
            .await?;
        if let Some(id) = first_by_name(&exact)? {
            return Ok(Some(id));
        }

        let contains = self
            .store
            .query(
                &self.tables.dishes,
                Some(&formula::contains_ci("Name", term)),
            )
            .await?;
        if let Some(id) = first_by_name(&contains)? {
            return Ok(Some(id));
        }

        let wanted = normalize_name(term);
        let all = self.store.query(&self.tables.dishes, None).await?;
        let mut matches: Vec<Dish> = Vec::new();
        for rec in &all {
            if let Ok(dish) = Dish::from_record(rec) {
                if normalize_name(&dish.name) == wanted {
                    matches.push(dish);
                }
            }
        }
        matches.sort_by(|a, b| (&a.name, &a.id).cmp(&(&b.name, &b.id)));
        Ok(matches.into_iter().next().map(|d| d.id))
    }

    /// Append a photo to a dish. Read-modify-write on the list field: the
    /// current list is fetched and the union written back, so existing
    /// photos are never overwritten. Concurrent appends to the same dish can
    /// still lose one side (the store has no conditional write); accepted.
    #[instrument(skip(self, photo), fields(dish_id = %dish_id))]
    pub async fn append_photo(
        &self,
        dish_id: &str,
        photo: Attachment,
    ) -> Result<Vec<Attachment>, ServiceError> {
        let rec = self.store.get(&self.tables.dishes, dish_id).await?;
        let mut photos = fields::attachments(&rec.fields, Dish::PHOTO_FIELDS);
        if photos.iter().any(|p| p.url == photo.url) {
            debug!(url = %photo.url, "photo already attached, no-op");
            return Ok(photos);
        }
        photos.push(photo);

        let mut patch = Map::new();
        patch.insert(
            Dish::PHOTO_FIELDS[0].to_string(),
            serde_json::to_value(&photos)
                .map_err(|e| ServiceError::Internal(format!("encode photos: {e}")))?,
        );
        let updated = self.store.update(&self.tables.dishes, dish_id, patch).await?;
        Ok(fields::attachments(&updated.fields, Dish::PHOTO_FIELDS))
    }
}

/// Scan a linking record's fields, in configured priority order, for values
/// shaped like record ids (bare string or array of strings).
fn scan_candidate_ids(
    record_fields: &Map<String, Value>,
    candidate_fields: &[String],
    id_shape: &Regex,
) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let push = |id: &str, out: &mut Vec<String>| {
        if !out.iter().any(|seen| seen == id) {
            out.push(id.to_string());
        }
    };
    for field in candidate_fields {
        match record_fields.get(field.as_str()) {
            Some(Value::String(s)) if id_shape.is_match(s.trim()) => {
                push(s.trim(), &mut out);
            }
            Some(Value::Array(items)) => {
                for item in items {
                    if let Some(s) = item.as_str() {
                        if id_shape.is_match(s.trim()) {
                            push(s.trim(), &mut out);
                        }
                    }
                }
            }
            _ => {}
        }
    }
    out
}

/// Hint preference: exact case-insensitive name match, then substring match,
/// else the first candidate.
fn pick_by_hint(candidates: &[Dish], name_hint: Option<&str>) -> String {
    if let Some(hint) = name_hint {
        let hint_lower = hint.trim().to_lowercase();
        if let Some(dish) = candidates
            .iter()
            .find(|d| d.name.to_lowercase() == hint_lower)
        {
            return dish.id.clone();
        }
        if let Some(dish) = candidates
            .iter()
            .find(|d| d.name.to_lowercase().contains(&hint_lower))
        {
            return dish.id.clone();
        }
    }
    candidates[0].id.clone()
}

fn first_by_name(records: &[Record]) -> Result<Option<String>, ServiceError> {
    let mut dishes: Vec<Dish> = Vec::new();
    for rec in records {
        dishes.push(Dish::from_record(rec)?);
    }
    dishes.sort_by(|a, b| (&a.name, &a.id).cmp(&(&b.name, &b.id)));
    Ok(dishes.first().map(|d| d.id.clone()))
}

/// Lowercase, punctuation collapsed to single spaces.
fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
