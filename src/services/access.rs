//! Access gate for self-service order operations: an (org, employee, token)
//! triple is checked against the employee's stored credentials before any
//! state-machine call runs.
//!
//! Failures are opaque by contract: a missing employee, a wrong org and a
//! wrong token all produce the same `Auth` error, so callers cannot probe
//! which records exist. The detailed reason goes to the log only.

use std::sync::Arc;

use tracing::{instrument, warn};

use crate::config::TableNames;
use crate::entities::Employee;
use crate::errors::ServiceError;
use crate::store::StoreClient;

#[derive(Clone)]
pub struct AccessGate {
    store: Arc<StoreClient>,
    tables: TableNames,
    open: bool,
}

impl AccessGate {
    pub fn new(store: Arc<StoreClient>, tables: TableNames, open: bool) -> Self {
        if open {
            // Deliberate configuration state, never a silent default.
            warn!("access gate is OPEN: token checks are disabled by configuration");
        }
        Self {
            store,
            tables,
            open,
        }
    }

    #[instrument(skip(self, token), fields(org_id = %org_id, employee_id = %employee_id))]
    pub async fn validate(
        &self,
        org_id: &str,
        employee_id: &str,
        token: &str,
    ) -> Result<Employee, ServiceError> {
        let employee = match self.store.get(&self.tables.employees, employee_id).await {
            Ok(rec) => Employee::from_record(&rec)?,
            Err(ServiceError::NotFound(_)) => {
                return Err(ServiceError::Auth(format!(
                    "employee {employee_id} not found"
                )))
            }
            Err(e) => return Err(e),
        };

        if employee.org_id.as_deref() != Some(org_id) {
            return Err(ServiceError::Auth(format!(
                "employee {employee_id} does not belong to org {org_id}"
            )));
        }

        if self.open {
            return Ok(employee);
        }

        let stored = employee.access_token.as_deref().unwrap_or("");
        // Empty tokens never pass, on either side.
        if stored.is_empty() || token.is_empty() || !token_eq(stored, token) {
            return Err(ServiceError::Auth(format!(
                "token mismatch for employee {employee_id}"
            )));
        }
        Ok(employee)
    }
}

/// Full-scan byte comparison: no early exit on the first differing byte.
fn token_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
