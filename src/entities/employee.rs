use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::store::fields;
use crate::store::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Employee,
    Hr,
    Manager,
}

impl Role {
    fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "hr" => Role::Hr,
            "manager" => Role::Manager,
            _ => Role::Employee,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub full_name: String,
    pub org_id: Option<String>,
    /// Opaque self-service secret; never serialized out of the service.
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    pub role: Role,
}

impl Employee {
    pub fn from_record(rec: &Record) -> Result<Self, ServiceError> {
        let full_name = fields::str_field(&rec.fields, &["Full Name", "FullName"])
            .map(|s| s.to_string())
            .or_else(|| {
                // Older rows carry only First/Last Name.
                let first = fields::str_field(&rec.fields, &["First Name", "FirstName"]);
                let last = fields::str_field(&rec.fields, &["Last Name", "LastName"]);
                match (first, last) {
                    (Some(f), Some(l)) => Some(format!("{f} {l}")),
                    (Some(f), None) => Some(f.to_string()),
                    (None, Some(l)) => Some(l.to_string()),
                    (None, None) => None,
                }
            })
            .ok_or_else(|| ServiceError::malformed("employee", &rec.id, "missing name"))?;

        Ok(Employee {
            id: rec.id.clone(),
            full_name,
            org_id: fields::first_link_id(&rec.fields, &["Org", "Organization"]),
            access_token: fields::str_field(&rec.fields, &["Access Token", "Token"])
                .map(|s| s.to_string()),
            role: fields::str_field(&rec.fields, &["Role"])
                .map(Role::parse)
                .unwrap_or(Role::Employee),
        })
    }
}
