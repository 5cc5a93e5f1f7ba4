use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::store::fields::{self, Attachment};
use crate::store::Record;

/// Menu taxonomy. The kitchen types labels in Russian or English; anything
/// unrecognized lands in `Other` and never participates in extras tallies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DishCategory {
    Zapekanka,
    Salad,
    Soup,
    Main,
    Side,
    Pastry,
    Fruit,
    Drink,
    Other,
}

impl DishCategory {
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "zapekanka" | "запеканка" | "pancake" | "pancakes" | "блины" => {
                DishCategory::Zapekanka
            }
            "salad" | "salads" | "салат" | "салаты" => DishCategory::Salad,
            "soup" | "soups" | "суп" | "супы" => DishCategory::Soup,
            "main" | "main dish" | "горячее" | "основное блюдо" => DishCategory::Main,
            "side" | "side dish" | "гарнир" | "гарниры" => DishCategory::Side,
            "pastry" | "выпечка" => DishCategory::Pastry,
            "fruit" | "fruits" | "фрукты" => DishCategory::Fruit,
            "drink" | "drinks" | "напиток" | "напитки" => DishCategory::Drink,
            _ => DishCategory::Other,
        }
    }

    /// Whether dishes of this category count as order "extras" in kitchen
    /// summaries. Main/Side belong to the meal box; Other is never tallied.
    pub fn is_aggregable_extra(self) -> bool {
        matches!(
            self,
            DishCategory::Salad
                | DishCategory::Soup
                | DishCategory::Zapekanka
                | DishCategory::Fruit
                | DishCategory::Pastry
                | DishCategory::Drink
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dish {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: DishCategory,
    /// Upstream field is named `RequiresSide` but its meaning is inverted:
    /// true marks a self-contained main that forbids a side selection.
    pub no_side_needed: bool,
    pub photos: Vec<Attachment>,
}

impl Dish {
    pub const NAME_FIELDS: &'static [&'static str] = &["Name", "Dish Name", "Title"];
    pub const PHOTO_FIELDS: &'static [&'static str] = &["Photo", "Photos"];

    pub fn from_record(rec: &Record) -> Result<Self, ServiceError> {
        let name = fields::str_field(&rec.fields, Self::NAME_FIELDS)
            .ok_or_else(|| ServiceError::malformed("dish", &rec.id, "missing Name"))?
            .to_string();
        let category = fields::str_field(&rec.fields, &["Category", "Категория"])
            .map(DishCategory::parse)
            .unwrap_or(DishCategory::Other);
        Ok(Dish {
            id: rec.id.clone(),
            name,
            description: fields::str_field(&rec.fields, &["Description", "Описание"])
                .map(|s| s.to_string()),
            category,
            no_side_needed: fields::bool_field(
                &rec.fields,
                &["RequiresSide", "Requires Side", "NoSideNeeded"],
            )
            .unwrap_or(false),
            photos: fields::attachments(&rec.fields, Self::PHOTO_FIELDS),
        })
    }
}
