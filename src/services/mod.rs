pub mod access;
pub mod aggregation;
pub mod dishes;
pub mod orders;
pub mod reports;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::store::StoreClient;

/// Aggregate of all services used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<orders::OrderService>,
    pub dishes: Arc<dishes::DishResolver>,
    pub aggregation: Arc<aggregation::AggregationService>,
    pub access: Arc<access::AccessGate>,
}

impl AppServices {
    pub fn new(config: &AppConfig) -> Result<Self, ServiceError> {
        let store = Arc::new(StoreClient::new(&config.store)?);
        Ok(Self {
            orders: Arc::new(orders::OrderService::new(
                store.clone(),
                config.tables.clone(),
            )),
            dishes: Arc::new(dishes::DishResolver::new(
                store.clone(),
                config.tables.clone(),
                config.resolver.clone(),
            )?),
            aggregation: Arc::new(aggregation::AggregationService::new(
                store.clone(),
                config.tables.clone(),
            )),
            access: Arc::new(access::AccessGate::new(
                store,
                config.tables.clone(),
                config.access.open,
            )),
        })
    }
}
