use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::store::fields;
use crate::store::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Active,
    Cancelled,
}

impl OrderStatus {
    pub fn parse(label: &str) -> Result<Self, String> {
        match label.trim().to_lowercase().as_str() {
            "active" => Ok(OrderStatus::Active),
            "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status '{other}'")),
        }
    }

    pub fn as_label(self) -> &'static str {
        match self {
            OrderStatus::Active => "Active",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

/// One employee's selection for one calendar date within one organization.
/// The dish selection itself lives behind the meal-box and order-line links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub employee_id: String,
    pub org_id: String,
    pub date: NaiveDate,
    pub status: OrderStatus,
    pub meal_box_ids: Vec<String>,
    pub order_line_ids: Vec<String>,
    pub idempotency_key: Option<String>,
    pub cancel_reason: Option<String>,
}

impl Order {
    pub const DATE_FIELD: &'static str = "Order Date";
    pub const EMPLOYEE_FIELD: &'static str = "Employee";
    pub const ORG_FIELD: &'static str = "Org";
    pub const STATUS_FIELD: &'static str = "Status";
    pub const MEAL_BOXES_FIELD: &'static str = "Meal Boxes";
    pub const ORDER_LINES_FIELD: &'static str = "Order Lines";
    pub const IDEMPOTENCY_FIELD: &'static str = "Idempotency Key";
    pub const CANCEL_REASON_FIELD: &'static str = "Cancel Reason";

    pub fn from_record(rec: &Record) -> Result<Self, ServiceError> {
        let date = fields::date_field(&rec.fields, &[Self::DATE_FIELD, "Date"])
            .ok_or_else(|| ServiceError::malformed("order", &rec.id, "missing Order Date"))?;
        let employee_id = fields::first_link_id(&rec.fields, &[Self::EMPLOYEE_FIELD])
            .ok_or_else(|| ServiceError::malformed("order", &rec.id, "missing Employee link"))?;
        let org_id = fields::first_link_id(&rec.fields, &[Self::ORG_FIELD, "Organization"])
            .ok_or_else(|| ServiceError::malformed("order", &rec.id, "missing Org link"))?;
        let status = fields::str_field(&rec.fields, &[Self::STATUS_FIELD])
            .map(OrderStatus::parse)
            .unwrap_or(Ok(OrderStatus::Active))
            .map_err(|e| ServiceError::malformed("order", &rec.id, e))?;

        Ok(Order {
            id: rec.id.clone(),
            employee_id,
            org_id,
            date,
            status,
            meal_box_ids: fields::link_ids(&rec.fields, &[Self::MEAL_BOXES_FIELD]),
            order_line_ids: fields::link_ids(&rec.fields, &[Self::ORDER_LINES_FIELD]),
            idempotency_key: fields::str_field(&rec.fields, &[Self::IDEMPOTENCY_FIELD])
                .map(|s| s.to_string()),
            cancel_reason: fields::str_field(&rec.fields, &[Self::CANCEL_REASON_FIELD])
                .map(|s| s.to_string()),
        })
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == OrderStatus::Cancelled
    }
}
