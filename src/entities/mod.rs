//! Canonical typed entities, parsed from loose store records at the boundary.
//!
//! Field names are an external contract with the hosted store; each entity
//! owns its alias table and nothing outside this module touches raw field
//! maps.

pub mod dish;
pub mod employee;
pub mod meal_box;
pub mod order;
pub mod order_line;
pub mod organization;

pub use dish::{Dish, DishCategory};
pub use employee::{Employee, Role};
pub use meal_box::MealBox;
pub use order::{Order, OrderStatus};
pub use order_line::OrderLine;
pub use organization::{Organization, PortionPolicy};
