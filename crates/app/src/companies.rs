use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use govreg_core::patch::ApplyPatch;
use govreg_core::types::{Company, CompanyPatch, NewCompany};
use govreg_core::validation::Validate;
use govreg_storage::RepositoryError;
use metrics::counter;
use tracing::info;

use crate::error::{missing, ApiError, ApiJson, ApiQuery, ListQuery};
use crate::router::AppState;
use crate::scope;

fn duplicate_inn(inn: &str) -> ApiError {
    ApiError::Conflict(format!("company with inn {inn} already exists"))
}

pub async fn create(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewCompany>,
) -> Result<(StatusCode, Json<Company>), ApiError> {
    let payload = payload.normalized();
    payload.validate()?;

    let repo = state.storage().companies();
    if repo.exists_by_inn(&payload.inn).await? {
        return Err(duplicate_inn(&payload.inn));
    }
    let company = repo
        .insert(&payload, state.now())
        .await
        .map_err(|err| match err {
            RepositoryError::Conflict => duplicate_inn(&payload.inn),
            other => other.into(),
        })?;

    counter!("records_created_total", "resource" => "company").increment(1);
    info!(stage = "api", company_id = %company.id, inn = %company.inn, "company created");
    Ok((StatusCode::CREATED, Json(company)))
}

pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Vec<Company>>, ApiError> {
    let companies = state.storage().companies().list(query.page()).await?;
    Ok(Json(companies))
}

pub async fn get(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> Result<Json<Company>, ApiError> {
    let company = scope::company(state.storage(), &company_id).await?;
    Ok(Json(company))
}

pub async fn update(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    ApiJson(patch): ApiJson<CompanyPatch>,
) -> Result<Json<Company>, ApiError> {
    let mut company = scope::company(state.storage(), &company_id).await?;
    let patch = patch.normalized();
    let inn_changed = patch.inn.as_deref().is_some_and(|inn| inn != company.inn);

    company.apply_patch(patch);
    company.validate()?;

    let repo = state.storage().companies();
    if inn_changed && repo.exists_by_inn(&company.inn).await? {
        return Err(duplicate_inn(&company.inn));
    }
    repo.update(&company).await.map_err(|err| match err {
        RepositoryError::Conflict => duplicate_inn(&company.inn),
        RepositoryError::NotFound => ApiError::NotFound("company"),
        other => other.into(),
    })?;

    info!(stage = "api", company_id = %company.id, "company updated");
    Ok(Json(company))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .storage()
        .companies()
        .delete(&company_id)
        .await
        .map_err(missing("company"))?;

    info!(stage = "api", %company_id, "company deleted");
    Ok(StatusCode::NO_CONTENT)
}
