use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::errors::ServiceError;
use crate::handlers::common::success_response;
use crate::store::fields::Attachment;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    /// Anything that identifies a dish: a dish id, a linking-record id, or
    /// free text.
    pub id: String,
    pub name_hint: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PhotoPayload {
    #[validate(url(message = "url must be a valid URL"))]
    pub url: String,
    #[serde(default)]
    pub filename: String,
}

pub async fn resolve_dish(
    State(state): State<AppState>,
    Query(query): Query<ResolveQuery>,
) -> Result<Response, ServiceError> {
    let dish_id = state
        .services
        .dishes
        .resolve(&query.id, query.name_hint.as_deref())
        .await?;
    Ok(success_response(json!({ "dish_id": dish_id })))
}

pub async fn append_photo(
    State(state): State<AppState>,
    Path(dish_id): Path<String>,
    Json(payload): Json<PhotoPayload>,
) -> Result<Response, ServiceError> {
    payload.validate()?;
    let photos = state
        .services
        .dishes
        .append_photo(
            &dish_id,
            Attachment {
                url: payload.url,
                filename: payload.filename,
            },
        )
        .await?;
    Ok(success_response(json!({ "dish_id": dish_id, "photos": photos })))
}
