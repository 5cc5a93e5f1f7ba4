//! Order lifecycle: `NonExistent → Active → Cancelled`, with an
//! `Active → Active` self-transition that replaces the selection wholesale.
//!
//! The store offers no transactions and no unique constraints, so the
//! at-most-one-active invariant is enforced by construction: every create
//! runs a query-before-write idempotency check on the (employee, org, date)
//! triple and short-circuits to the existing order. Two near-simultaneous
//! creates can still both pass the check; that narrow window is a documented
//! best-effort property of the backing store, not a claim of strict
//! exclusion.
//!
//! Create writes children first: the meal box and order lines exist before
//! the order record, which carries both link lists in its single create
//! call. A failure partway leaves only orphaned child records in the store,
//! never an Active order missing part of its selection.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::config::TableNames;
use crate::entities::meal_box::compose_label;
use crate::entities::{Dish, DishCategory, MealBox, Order, OrderLine, OrderStatus, Organization};
use crate::errors::ServiceError;
use crate::store::{formula, Record, StoreClient};

/// Requested dish selection, wholesale. Updates replace, never merge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderSelection {
    pub main_dish_id: Option<String>,
    pub side_dish_id: Option<String>,
    #[serde(default)]
    pub extra_dish_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "employee_id is required"))]
    pub employee_id: String,
    #[validate(length(min = 1, message = "org_id is required"))]
    pub org_id: String,
    pub date: NaiveDate,
    pub selection: OrderSelection,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderOutcome {
    pub order_id: String,
    /// False when the idempotency short-circuit matched an existing active
    /// order and no record was written.
    pub created: bool,
}

/// An active order resolved to display form.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub order_id: String,
    pub date: NaiveDate,
    pub status: OrderStatus,
    pub meal_boxes: Vec<String>,
    pub extras: Vec<String>,
}

/// Selection with every referenced dish fetched and normalized.
struct ResolvedSelection {
    main: Option<Dish>,
    side: Option<Dish>,
    extras: Vec<(String, DishCategory)>,
    dish_names: HashMap<String, String>,
}

#[derive(Clone)]
pub struct OrderService {
    store: Arc<StoreClient>,
    tables: TableNames,
}

impl OrderService {
    pub fn new(store: Arc<StoreClient>, tables: TableNames) -> Self {
        Self { store, tables }
    }

    /// Create an order for one employee-day, idempotently. A second create
    /// for the same (employee, org, date) triple returns the existing id
    /// with `created: false` regardless of idempotency key.
    #[instrument(skip(self, request), fields(
        employee_id = %request.employee_id,
        org_id = %request.org_id,
        date = %request.date,
    ))]
    pub async fn create(
        &self,
        request: CreateOrderRequest,
    ) -> Result<CreateOrderOutcome, ServiceError> {
        request.validate()?;
        validate_selection(&request.selection)?;

        if let Some(existing) = self
            .find_active(&request.employee_id, &request.org_id, request.date)
            .await?
        {
            info!(order_id = %existing.id, "idempotent short-circuit: active order exists");
            return Ok(CreateOrderOutcome {
                order_id: existing.id,
                created: false,
            });
        }

        let org = self.fetch_org(&request.org_id).await?;
        let resolved = self.resolve_selection(&request.selection).await?;
        let capped = org.portion_policy.cap_extras(&resolved.extras);

        let meal_box_id = match &resolved.main {
            Some(main) => Some(
                self.create_meal_box(main, resolved.side.as_ref())
                    .await?,
            ),
            None => None,
        };

        // Meal box and lines are written before the order itself; a failure
        // here leaves only orphaned child records, never an Active order
        // missing part of its selection.
        let line_ids = self
            .create_order_lines(None, &capped, &resolved.dish_names)
            .await?;

        let idempotency_key = request
            .idempotency_key
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut fields = Map::new();
        fields.insert(
            Order::DATE_FIELD.to_string(),
            Value::String(request.date.to_string()),
        );
        fields.insert(
            Order::EMPLOYEE_FIELD.to_string(),
            Value::Array(vec![Value::String(request.employee_id.clone())]),
        );
        fields.insert(
            Order::ORG_FIELD.to_string(),
            Value::Array(vec![Value::String(request.org_id.clone())]),
        );
        fields.insert(
            Order::STATUS_FIELD.to_string(),
            Value::String(OrderStatus::Active.as_label().to_string()),
        );
        fields.insert(
            Order::IDEMPOTENCY_FIELD.to_string(),
            Value::String(idempotency_key),
        );
        if let Some(mb) = &meal_box_id {
            fields.insert(
                Order::MEAL_BOXES_FIELD.to_string(),
                Value::Array(vec![Value::String(mb.clone())]),
            );
        }
        if !line_ids.is_empty() {
            fields.insert(
                Order::ORDER_LINES_FIELD.to_string(),
                Value::Array(line_ids.into_iter().map(Value::String).collect()),
            );
        }

        let order = self.store.create(&self.tables.orders, fields).await?;

        info!(order_id = %order.id, "order created");
        Ok(CreateOrderOutcome {
            order_id: order.id,
            created: true,
        })
    }

    /// Replace an active order's selection wholesale. The superseded
    /// meal-box and line records stay in the store (nothing is ever
    /// physically deleted); only the order's two link fields are patched.
    #[instrument(skip(self, selection), fields(order_id = %order_id))]
    pub async fn update(
        &self,
        order_id: &str,
        selection: OrderSelection,
    ) -> Result<(), ServiceError> {
        validate_selection(&selection)?;

        let rec = self.store.get(&self.tables.orders, order_id).await?;
        let order = Order::from_record(&rec)?;
        if order.is_cancelled() {
            return Err(ServiceError::Conflict(format!(
                "order {order_id} is cancelled and can no longer be changed"
            )));
        }

        let org = self.fetch_org(&order.org_id).await?;
        let resolved = self.resolve_selection(&selection).await?;
        let capped = org.portion_policy.cap_extras(&resolved.extras);

        let meal_box_ids: Vec<Value> = match &resolved.main {
            Some(main) => vec![Value::String(
                self.create_meal_box(main, resolved.side.as_ref()).await?,
            )],
            None => Vec::new(),
        };
        let line_ids = self
            .create_order_lines(Some(order_id), &capped, &resolved.dish_names)
            .await?;

        let mut patch = Map::new();
        patch.insert(Order::MEAL_BOXES_FIELD.to_string(), Value::Array(meal_box_ids));
        patch.insert(
            Order::ORDER_LINES_FIELD.to_string(),
            Value::Array(line_ids.into_iter().map(Value::String).collect()),
        );
        self.store
            .update(&self.tables.orders, order_id, patch)
            .await?;

        info!(order_id = %order_id, "order selection replaced");
        Ok(())
    }

    /// Soft-cancel. Cancelling an already-cancelled order is a no-op
    /// success, which makes retries safe.
    #[instrument(skip(self, reason), fields(order_id = %order_id))]
    pub async fn cancel(&self, order_id: &str, reason: &str) -> Result<(), ServiceError> {
        let rec = self.store.get(&self.tables.orders, order_id).await?;
        let order = Order::from_record(&rec)?;
        if order.is_cancelled() {
            debug!(order_id = %order_id, "already cancelled, no-op");
            return Ok(());
        }

        let mut patch = Map::new();
        patch.insert(
            Order::STATUS_FIELD.to_string(),
            Value::String(OrderStatus::Cancelled.as_label().to_string()),
        );
        patch.insert(
            Order::CANCEL_REASON_FIELD.to_string(),
            Value::String(reason.to_string()),
        );
        self.store
            .update(&self.tables.orders, order_id, patch)
            .await?;

        info!(order_id = %order_id, "order cancelled");
        Ok(())
    }

    /// The single active order for the triple, resolved to display form.
    #[instrument(skip(self))]
    pub async fn summary(
        &self,
        employee_id: &str,
        org_id: &str,
        date: NaiveDate,
    ) -> Result<Option<OrderSummary>, ServiceError> {
        let Some(rec) = self.find_active(employee_id, org_id, date).await? else {
            return Ok(None);
        };
        let order = Order::from_record(&rec)?;

        let boxes = self
            .store
            .get_many(&self.tables.meal_boxes, &order.meal_box_ids)
            .await?;
        let mut labels: HashMap<String, String> = boxes
            .iter()
            .map(|r| (r.id.clone(), MealBox::from_record(r).label()))
            .collect();
        let meal_boxes = order
            .meal_box_ids
            .iter()
            .filter_map(|id| labels.remove(id))
            .collect();

        let lines = self
            .store
            .get_many(&self.tables.order_lines, &order.order_line_ids)
            .await?;
        let by_id: HashMap<String, OrderLine> = lines
            .iter()
            .map(|r| (r.id.clone(), OrderLine::from_record(r)))
            .collect();
        let extras = order
            .order_line_ids
            .iter()
            .filter_map(|id| by_id.get(id).and_then(|l| l.item_name.clone()))
            .collect();

        Ok(Some(OrderSummary {
            order_id: order.id,
            date: order.date,
            status: order.status,
            meal_boxes,
            extras,
        }))
    }

    /// Query-before-write existence check for the active-order invariant.
    /// When concurrent creates have left more than one active row, the one
    /// with the smallest id wins so repeated calls stay deterministic.
    async fn find_active(
        &self,
        employee_id: &str,
        org_id: &str,
        date: NaiveDate,
    ) -> Result<Option<Record>, ServiceError> {
        let filter = formula::and(&[
            formula::eq(Order::EMPLOYEE_FIELD, employee_id),
            formula::eq(Order::ORG_FIELD, org_id),
            formula::eq(Order::DATE_FIELD, &date.to_string()),
            formula::eq(Order::STATUS_FIELD, OrderStatus::Active.as_label()),
        ]);
        let mut matches = self.store.query(&self.tables.orders, Some(&filter)).await?;
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matches.into_iter().next())
    }

    async fn fetch_org(&self, org_id: &str) -> Result<Organization, ServiceError> {
        let rec = self.store.get(&self.tables.organizations, org_id).await?;
        Organization::from_record(&rec)
    }

    /// Fetch every referenced dish in one batch and normalize the selection:
    /// a main that forbids a side silently clears an incompatible side
    /// rather than rejecting (see DESIGN.md).
    async fn resolve_selection(
        &self,
        selection: &OrderSelection,
    ) -> Result<ResolvedSelection, ServiceError> {
        let mut ids: Vec<String> = Vec::new();
        ids.extend(selection.main_dish_id.clone());
        ids.extend(selection.side_dish_id.clone());
        ids.extend(selection.extra_dish_ids.iter().cloned());

        let records = self.store.get_many(&self.tables.dishes, &ids).await?;
        let mut dishes: HashMap<String, Dish> = HashMap::new();
        for rec in &records {
            dishes.insert(rec.id.clone(), Dish::from_record(rec)?);
        }
        for id in &ids {
            if !dishes.contains_key(id) {
                return Err(ServiceError::NotFound(format!("dish {id}")));
            }
        }

        let main = selection
            .main_dish_id
            .as_ref()
            .map(|id| dishes[id].clone());
        let mut side = selection
            .side_dish_id
            .as_ref()
            .map(|id| dishes[id].clone());
        if let (Some(m), Some(s)) = (&main, &side) {
            if m.no_side_needed {
                debug!(main = %m.name, side = %s.name, "main forbids a side, clearing it");
                side = None;
            }
        }

        let extras = selection
            .extra_dish_ids
            .iter()
            .map(|id| (id.clone(), dishes[id].category))
            .collect();
        let dish_names = dishes
            .into_iter()
            .map(|(id, d)| (id, d.name))
            .collect();

        Ok(ResolvedSelection {
            main,
            side,
            extras,
            dish_names,
        })
    }

    async fn create_meal_box(
        &self,
        main: &Dish,
        side: Option<&Dish>,
    ) -> Result<String, ServiceError> {
        let mut fields = Map::new();
        fields.insert(
            MealBox::MAIN_NAME_FIELD.to_string(),
            Value::String(main.name.clone()),
        );
        if let Some(side) = side {
            fields.insert(
                MealBox::SIDE_NAME_FIELD.to_string(),
                Value::String(side.name.clone()),
            );
        }
        fields.insert(
            MealBox::LABEL_FIELD.to_string(),
            Value::String(compose_label(
                Some(&main.name),
                side.map(|s| s.name.as_str()),
            )),
        );
        let rec = self.store.create(&self.tables.meal_boxes, fields).await?;
        Ok(rec.id)
    }

    /// Write one line per extra. During create the order does not exist yet,
    /// so the back-link is omitted; the store fills it in when the order is
    /// created with its line list.
    async fn create_order_lines(
        &self,
        order_id: Option<&str>,
        dish_ids: &[String],
        dish_names: &HashMap<String, String>,
    ) -> Result<Vec<String>, ServiceError> {
        let mut line_ids = Vec::with_capacity(dish_ids.len());
        for dish_id in dish_ids {
            let mut fields = Map::new();
            if let Some(order_id) = order_id {
                fields.insert(
                    OrderLine::ORDER_FIELD.to_string(),
                    Value::Array(vec![Value::String(order_id.to_string())]),
                );
            }
            fields.insert(
                OrderLine::ITEM_FIELD.to_string(),
                Value::Array(vec![Value::String(dish_id.clone())]),
            );
            if let Some(name) = dish_names.get(dish_id) {
                fields.insert(
                    OrderLine::ITEM_NAME_FIELD.to_string(),
                    Value::String(name.clone()),
                );
            }
            fields.insert(OrderLine::QUANTITY_FIELD.to_string(), Value::from(1u32));
            let rec = self.store.create(&self.tables.order_lines, fields).await?;
            line_ids.push(rec.id);
        }
        Ok(line_ids)
    }
}

fn validate_selection(selection: &OrderSelection) -> Result<(), ServiceError> {
    let empty = selection.main_dish_id.is_none()
        && selection.side_dish_id.is_none()
        && selection.extra_dish_ids.is_empty();
    if empty {
        return Err(ServiceError::Validation(
            "selection must include at least one dish".to_string(),
        ));
    }
    if selection.main_dish_id.is_none() && selection.side_dish_id.is_some() {
        return Err(ServiceError::Validation(
            "a side dish requires a main dish".to_string(),
        ));
    }
    Ok(())
}
