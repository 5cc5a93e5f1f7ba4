//! Deterministic fold of one org-day's active orders into kitchen views.
//!
//! The engine is a pure reader: one filtered scan for the orders, one batch
//! lookup per linked entity type (employees, meal boxes, order lines,
//! dishes), then an in-memory fold. Identical order sets must produce
//! byte-identical output whatever scan order the store returns, so every
//! emitted sequence is explicitly sorted with Russian-aware collation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{instrument, warn};

use crate::config::TableNames;
use crate::entities::{
    Dish, DishCategory, Employee, MealBox, Order, OrderLine, OrderStatus, Organization,
};
use crate::errors::ServiceError;
use crate::store::{formula, StoreClient};

/// One kitchen row: an employee and one of their meal boxes, with up to two
/// extras. Orders holding several meal boxes emit one row per box, repeating
/// the employee name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeeRow {
    pub full_name: String,
    pub meal_box: String,
    pub extra1: Option<String>,
    pub extra2: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TallyEntry {
    pub name: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregationResult {
    pub org_id: String,
    pub org_name: String,
    pub date: NaiveDate,
    pub rows: Vec<EmployeeRow>,
    pub salads: Vec<TallyEntry>,
    pub soups: Vec<TallyEntry>,
    pub zapekanka: Vec<TallyEntry>,
    pub meal_boxes: Vec<TallyEntry>,
    pub pastry: Vec<TallyEntry>,
    pub fruit_and_drink: Vec<TallyEntry>,
}

#[derive(Clone)]
pub struct AggregationService {
    store: Arc<StoreClient>,
    tables: TableNames,
}

impl AggregationService {
    pub fn new(store: Arc<StoreClient>, tables: TableNames) -> Self {
        Self { store, tables }
    }

    #[instrument(skip(self), fields(org_id = %org_id, date = %date))]
    pub async fn aggregate(
        &self,
        org_id: &str,
        date: NaiveDate,
    ) -> Result<AggregationResult, ServiceError> {
        let org_rec = self.store.get(&self.tables.organizations, org_id).await?;
        let org = Organization::from_record(&org_rec)?;

        let filter = formula::and(&[
            formula::eq(Order::ORG_FIELD, org_id),
            formula::eq(Order::DATE_FIELD, &date.to_string()),
            formula::not(&formula::eq(
                Order::STATUS_FIELD,
                OrderStatus::Cancelled.as_label(),
            )),
        ]);
        let order_recs = self.store.query(&self.tables.orders, Some(&filter)).await?;

        let mut orders: Vec<Order> = Vec::new();
        for rec in &order_recs {
            match Order::from_record(rec) {
                // The scan filter excludes cancelled rows; re-check locally.
                Ok(order) if !order.is_cancelled() => orders.push(order),
                Ok(_) => {}
                Err(e) => warn!(record_id = %rec.id, error = %e, "skipping unreadable order"),
            }
        }

        let employee_ids: Vec<String> =
            orders.iter().map(|o| o.employee_id.clone()).collect();
        let meal_box_ids: Vec<String> = orders
            .iter()
            .flat_map(|o| o.meal_box_ids.iter().cloned())
            .collect();
        let line_ids: Vec<String> = orders
            .iter()
            .flat_map(|o| o.order_line_ids.iter().cloned())
            .collect();

        let employees: HashMap<String, Employee> = self
            .store
            .get_many(&self.tables.employees, &employee_ids)
            .await?
            .iter()
            .filter_map(|r| Employee::from_record(r).ok().map(|e| (r.id.clone(), e)))
            .collect();
        let meal_boxes: HashMap<String, MealBox> = self
            .store
            .get_many(&self.tables.meal_boxes, &meal_box_ids)
            .await?
            .iter()
            .map(|r| (r.id.clone(), MealBox::from_record(r)))
            .collect();
        let lines: HashMap<String, OrderLine> = self
            .store
            .get_many(&self.tables.order_lines, &line_ids)
            .await?
            .iter()
            .map(|r| (r.id.clone(), OrderLine::from_record(r)))
            .collect();

        let dish_ids: Vec<String> = lines
            .values()
            .filter_map(|l| l.item_id.clone())
            .collect();
        // Same degradation as for orders: one bad menu row must not blank
        // the whole report, so unreadable dishes are skipped with a warning
        // and their lines drop out of the extras.
        let mut dishes: HashMap<String, Dish> = HashMap::new();
        for rec in &self.store.get_many(&self.tables.dishes, &dish_ids).await? {
            match Dish::from_record(rec) {
                Ok(dish) => {
                    dishes.insert(rec.id.clone(), dish);
                }
                Err(e) => warn!(record_id = %rec.id, error = %e, "skipping unreadable dish"),
            }
        }

        Ok(assemble(
            &org, date, &orders, &employees, &meal_boxes, &lines, &dishes,
        ))
    }
}

/// Pure fold of fetched state into the result. Split from the I/O so the
/// determinism property is testable without a store.
fn assemble(
    org: &Organization,
    date: NaiveDate,
    orders: &[Order],
    employees: &HashMap<String, Employee>,
    meal_boxes: &HashMap<String, MealBox>,
    lines: &HashMap<String, OrderLine>,
    dishes: &HashMap<String, Dish>,
) -> AggregationResult {
    let mut rows: Vec<EmployeeRow> = Vec::new();
    let mut salads: HashMap<String, u32> = HashMap::new();
    let mut soups: HashMap<String, u32> = HashMap::new();
    let mut zapekanka: HashMap<String, u32> = HashMap::new();
    let mut boxes_tally: HashMap<String, u32> = HashMap::new();
    let mut pastry: HashMap<String, u32> = HashMap::new();
    let mut fruit_and_drink: HashMap<String, u32> = HashMap::new();

    for order in orders {
        let full_name = employees
            .get(&order.employee_id)
            .map(|e| e.full_name.clone())
            // A dangling employee link still yields a row the kitchen can
            // chase up; the raw id beats dropping the meal silently.
            .unwrap_or_else(|| order.employee_id.clone());

        let extras = order_extras(order, lines, dishes);
        let (extra1, extra2) = row_extras(&extras);

        let labels: Vec<String> = if order.meal_box_ids.is_empty() {
            // Extras-only order (e.g. just a soup): still one row.
            vec!["—".to_string()]
        } else {
            order
                .meal_box_ids
                .iter()
                .map(|id| {
                    meal_boxes
                        .get(id)
                        .map(|mb| mb.label())
                        .unwrap_or_else(|| "—".to_string())
                })
                .collect()
        };

        for label in &labels {
            if label != "—" {
                *boxes_tally.entry(label.clone()).or_insert(0) += 1;
            }
            rows.push(EmployeeRow {
                full_name: full_name.clone(),
                meal_box: label.clone(),
                extra1: extra1.clone(),
                extra2: extra2.clone(),
            });
        }

        for (name, category, quantity) in &extras {
            let bucket = match category {
                DishCategory::Salad => &mut salads,
                DishCategory::Soup => &mut soups,
                DishCategory::Zapekanka => &mut zapekanka,
                DishCategory::Pastry => &mut pastry,
                DishCategory::Fruit | DishCategory::Drink => &mut fruit_and_drink,
                _ => continue,
            };
            *bucket.entry(name.clone()).or_insert(0) += quantity;
        }
    }

    rows.sort_by(|a, b| {
        (collation_key(&a.full_name), collation_key(&a.meal_box), &a.extra1, &a.extra2).cmp(&(
            collation_key(&b.full_name),
            collation_key(&b.meal_box),
            &b.extra1,
            &b.extra2,
        ))
    });

    AggregationResult {
        org_id: org.id.clone(),
        org_name: org.name.clone(),
        date,
        rows,
        salads: sorted_tally(salads),
        soups: sorted_tally(soups),
        zapekanka: sorted_tally(zapekanka),
        meal_boxes: sorted_tally(boxes_tally),
        pastry: sorted_tally(pastry),
        fruit_and_drink: sorted_tally(fruit_and_drink),
    }
}

/// The order's aggregable extras in line-link order:
/// (display name, category, quantity).
fn order_extras(
    order: &Order,
    lines: &HashMap<String, OrderLine>,
    dishes: &HashMap<String, Dish>,
) -> Vec<(String, DishCategory, u32)> {
    let mut extras = Vec::new();
    for line_id in &order.order_line_ids {
        let Some(line) = lines.get(line_id) else { continue };
        // Category comes from the linked dish; a line whose dish cannot be
        // resolved cannot be bucketed and is excluded from extras.
        let Some(dish) = line.item_id.as_ref().and_then(|id| dishes.get(id)) else {
            continue;
        };
        if !dish.category.is_aggregable_extra() {
            continue;
        }
        let name = line
            .item_name
            .clone()
            .unwrap_or_else(|| dish.name.clone());
        extras.push((name, dish.category, line.quantity.max(1)));
    }
    extras
}

/// Up to two display slots; overflow collapses into a `(+N)` suffix on the
/// second slot.
fn row_extras(extras: &[(String, DishCategory, u32)]) -> (Option<String>, Option<String>) {
    let names: Vec<&str> = extras.iter().map(|(n, _, _)| n.as_str()).collect();
    match names.len() {
        0 => (None, None),
        1 => (Some(names[0].to_string()), None),
        2 => (Some(names[0].to_string()), Some(names[1].to_string())),
        n => (
            Some(names[0].to_string()),
            Some(format!("{} (+{})", names[1], n - 2)),
        ),
    }
}

fn sorted_tally(tally: HashMap<String, u32>) -> Vec<TallyEntry> {
    let mut entries: Vec<TallyEntry> = tally
        .into_iter()
        .map(|(name, count)| TallyEntry { name, count })
        .collect();
    entries.sort_by(|a, b| collation_key(&a.name).cmp(&collation_key(&b.name)));
    entries
}

/// Russian-alphabet-aware sort key. Lowercased Cyrillic letters collate in
/// alphabet order with ё placed between е and ж (scalar-value order would
/// put it after я); everything else keeps scalar order and sorts before
/// Cyrillic.
pub fn collation_key(s: &str) -> Vec<u32> {
    s.to_lowercase()
        .chars()
        .map(|c| match c {
            'а'..='е' => 0x0011_0000 + (c as u32 - 'а' as u32) * 2,
            'ё' => 0x0011_0000 + ('е' as u32 - 'а' as u32) * 2 + 1,
            'ж'..='я' => 0x0011_0000 + (c as u32 - 'а' as u32) * 2,
            _ => c as u32,
        })
        .collect()
}
