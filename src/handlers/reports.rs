use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::errors::ServiceError;
use crate::handlers::common::success_response;
use crate::services::reports::{build_document, renderer_for, ReportFormat};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AggregationQuery {
    pub org_id: String,
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub org_id: String,
    pub date: NaiveDate,
    /// "csv" (default) or "json"
    pub format: Option<String>,
}

pub async fn aggregation(
    State(state): State<AppState>,
    Query(query): Query<AggregationQuery>,
) -> Result<Response, ServiceError> {
    let result = state
        .services
        .aggregation
        .aggregate(&query.org_id, query.date)
        .await?;
    Ok(success_response(result))
}

pub async fn export(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ServiceError> {
    let format: ReportFormat = query.format.as_deref().unwrap_or("csv").parse()?;
    let result = state
        .services
        .aggregation
        .aggregate(&query.org_id, query.date)
        .await?;

    let renderer = renderer_for(format);
    let bytes = renderer.render(&build_document(&result))?;
    let filename = format!(
        "lunch-report-{}.{}",
        query.date.format("%Y-%m-%d"),
        renderer.file_extension()
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, renderer.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}
