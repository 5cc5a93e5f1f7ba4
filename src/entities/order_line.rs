use serde::{Deserialize, Serialize};

use crate::store::fields;
use crate::store::Record;

/// One extra dish attached to an order (a soup, a salad, a pastry...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: String,
    pub order_id: Option<String>,
    pub item_id: Option<String>,
    pub item_name: Option<String>,
    pub quantity: u32,
}

impl OrderLine {
    pub const ORDER_FIELD: &'static str = "Order";
    pub const ITEM_FIELD: &'static str = "Item (Menu Item)";
    pub const ITEM_NAME_FIELD: &'static str = "Item Name";
    pub const QUANTITY_FIELD: &'static str = "Quantity";

    pub fn from_record(rec: &Record) -> Self {
        OrderLine {
            id: rec.id.clone(),
            order_id: fields::first_link_id(&rec.fields, &[Self::ORDER_FIELD]),
            item_id: fields::first_link_id(&rec.fields, &[Self::ITEM_FIELD, "Item", "Dish"]),
            item_name: fields::str_field(&rec.fields, &[Self::ITEM_NAME_FIELD, "Name"])
                .map(|s| s.to_string()),
            quantity: fields::u32_field(&rec.fields, &[Self::QUANTITY_FIELD]).unwrap_or(1),
        }
    }
}
