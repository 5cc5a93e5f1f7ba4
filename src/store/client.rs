use std::time::Duration;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, instrument};

use crate::config::StoreSettings;
use crate::errors::ServiceError;

/// Batch point-lookups are chunked so a single filter formula stays well under
/// the store's URL length limit.
const BATCH_CHUNK: usize = 40;

/// One row of a store table: an opaque store-assigned id plus a loose field
/// map. Typed interpretation happens at the entity boundary, never here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RecordPage {
    #[serde(default)]
    records: Vec<Record>,
    offset: Option<String>,
}

/// HTTP client for the table store. Carries no state beyond the transport
/// handle; all retry policy belongs to callers.
#[derive(Clone)]
pub struct StoreClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    page_size: u32,
}

impl StoreClient {
    pub fn new(settings: &StoreSettings) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ServiceError::Internal(format!("http client init: {e}")))?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            page_size: settings.page_size,
        })
    }

    fn table_url(&self, table: &str) -> String {
        // Table names may contain spaces ("Meal Boxes"); encode the segment.
        format!("{}/{}", self.base_url, encode_segment(table))
    }

    fn record_url(&self, table: &str, id: &str) -> String {
        format!("{}/{}", self.table_url(table), encode_segment(id))
    }

    /// Filtered scan, draining pagination offsets until the store stops
    /// returning one. The result is the full match set for the filter.
    #[instrument(skip(self), fields(table = %table))]
    pub async fn query(
        &self,
        table: &str,
        filter: Option<&str>,
    ) -> Result<Vec<Record>, ServiceError> {
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut params: Vec<(&str, String)> =
                vec![("pageSize", self.page_size.to_string())];
            if let Some(f) = filter {
                params.push(("filterByFormula", f.to_string()));
            }
            if let Some(ref o) = offset {
                params.push(("offset", o.clone()));
            }

            let resp = self
                .http
                .get(self.table_url(table))
                .bearer_auth(&self.api_key)
                .query(&params)
                .send()
                .await?;
            let page: RecordPage = Self::read_json(resp).await?;
            records.extend(page.records);

            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        debug!(count = records.len(), "query drained");
        Ok(records)
    }

    /// Point get. A 404 from the store becomes `NotFound`, not `Store`.
    #[instrument(skip(self), fields(table = %table, id = %id))]
    pub async fn get(&self, table: &str, id: &str) -> Result<Record, ServiceError> {
        let resp = self
            .http
            .get(self.record_url(table, id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ServiceError::NotFound(format!("{table} record {id}")));
        }
        Self::read_json(resp).await
    }

    /// Batch point-lookup via `RECORD_ID()` filters, chunked. Duplicate ids
    /// are collapsed; order of the result is the store's, not the input's.
    pub async fn get_many(
        &self,
        table: &str,
        ids: &[String],
    ) -> Result<Vec<Record>, ServiceError> {
        let mut unique: Vec<String> = ids.to_vec();
        unique.sort();
        unique.dedup();
        if unique.is_empty() {
            return Ok(Vec::new());
        }

        let chunks = unique
            .chunks(BATCH_CHUNK)
            .map(|chunk| {
                let filter = super::formula::record_ids(chunk);
                async move { self.query(table, Some(&filter)).await }
            })
            .collect::<Vec<_>>();
        let pages = try_join_all(chunks).await?;
        Ok(pages.into_iter().flatten().collect())
    }

    #[instrument(skip(self, fields), fields(table = %table))]
    pub async fn create(
        &self,
        table: &str,
        fields: Map<String, Value>,
    ) -> Result<Record, ServiceError> {
        let resp = self
            .http
            .post(self.table_url(table))
            .bearer_auth(&self.api_key)
            .json(&json!({ "fields": fields }))
            .send()
            .await?;
        Self::read_json(resp).await
    }

    /// Field-level patch: only the supplied fields change, everything else
    /// keeps its prior value. Appends to list fields must therefore be done
    /// by the caller as read-then-write-union.
    #[instrument(skip(self, patch), fields(table = %table, id = %id))]
    pub async fn update(
        &self,
        table: &str,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<Record, ServiceError> {
        let resp = self
            .http
            .patch(self.record_url(table, id))
            .bearer_auth(&self.api_key)
            .json(&json!({ "fields": patch }))
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ServiceError::NotFound(format!("{table} record {id}")));
        }
        Self::read_json(resp).await
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, ServiceError> {
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ServiceError::Store {
                status: Some(status.as_u16()),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| ServiceError::Store {
            status: Some(status.as_u16()),
            body: format!("undecodable response body: {e}"),
        })
    }
}

fn encode_segment(segment: &str) -> String {
    // Minimal percent-encoding for the characters that actually occur in
    // table names and record ids.
    segment
        .replace('%', "%25")
        .replace(' ', "%20")
        .replace('/', "%2F")
        .replace('?', "%3F")
        .replace('#', "%23")
}
