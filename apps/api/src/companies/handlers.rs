use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::companies::store;
use crate::errors::AppError;
use crate::models::company::CompanyRow;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CompanyRequest {
    pub company_name: String,
}

/// GET /api/v1/companies
pub async fn handle_list_companies(
    State(state): State<AppState>,
) -> Result<Json<Vec<CompanyRow>>, AppError> {
    Ok(Json(store::list_companies(&state.db).await?))
}

/// POST /api/v1/companies
pub async fn handle_add_company(
    State(state): State<AppState>,
    Json(req): Json<CompanyRequest>,
) -> Result<(StatusCode, Json<CompanyRow>), AppError> {
    let row = store::add_company(&state.db, &req.company_name).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// PATCH /api/v1/companies/:id
pub async fn handle_rename_company(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CompanyRequest>,
) -> Result<Json<CompanyRow>, AppError> {
    Ok(Json(
        store::rename_company(&state.db, id, &req.company_name).await?,
    ))
}

/// DELETE /api/v1/companies/:id
pub async fn handle_delete_company(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    store::delete_company(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
