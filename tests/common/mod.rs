#![allow(dead_code)]

use serde_json::{json, Value};
use wiremock::MockServer;

use obed_api::config::{
    AccessSettings, AppConfig, ResolverSettings, StoreSettings, TableNames,
};
use obed_api::services::AppServices;
use obed_api::AppState;

/// Test harness: one mock record store per test, with services wired to it.
/// Table names deliberately avoid spaces so mock paths stay literal.
pub struct TestApp {
    pub server: MockServer,
    pub services: AppServices,
    pub config: AppConfig,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_access(AccessSettings { open: false }).await
    }

    pub async fn with_access(access: AccessSettings) -> Self {
        let server = MockServer::start().await;
        let config = AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "development".to_string(),
            log_level: "info".to_string(),
            log_json: false,
            cors_allowed_origins: None,
            store: StoreSettings {
                base_url: server.uri(),
                api_key: "test-key".to_string(),
                timeout_secs: 5,
                page_size: 100,
            },
            tables: TableNames {
                orders: "Orders".to_string(),
                employees: "Employees".to_string(),
                organizations: "Organizations".to_string(),
                meal_boxes: "MealBoxes".to_string(),
                order_lines: "OrderLines".to_string(),
                dishes: "Dishes".to_string(),
                menu: "Menu".to_string(),
            },
            resolver: ResolverSettings {
                lookup_tables: vec!["Menu".to_string(), "OrderLines".to_string()],
                candidate_dish_fields: vec![
                    "Dish".to_string(),
                    "DishID".to_string(),
                    "Main".to_string(),
                    "Side".to_string(),
                    "Soup".to_string(),
                ],
                record_id_prefix: "rec".to_string(),
            },
            access,
        };
        let services = AppServices::new(&config).expect("build services");
        Self {
            server,
            services,
            config,
        }
    }

    pub fn state(&self) -> AppState {
        AppState {
            config: self.config.clone(),
            services: self.services.clone(),
        }
    }
}

/// A store record payload: `{"id": ..., "fields": ...}`.
pub fn record(id: &str, fields: Value) -> Value {
    json!({ "id": id, "fields": fields })
}

/// A single query result page with no continuation offset.
pub fn page(records: Vec<Value>) -> Value {
    json!({ "records": records })
}

pub fn dish(id: &str, name: &str, category: &str) -> Value {
    record(id, json!({ "Name": name, "Category": category }))
}

pub fn employee(id: &str, full_name: &str, org_id: &str, token: &str) -> Value {
    record(
        id,
        json!({
            "Full Name": full_name,
            "Org": [org_id],
            "Access Token": token
        }),
    )
}

pub fn organization(id: &str, name: &str, policy: &str) -> Value {
    record(id, json!({ "Name": name, "Portion Policy": policy }))
}
