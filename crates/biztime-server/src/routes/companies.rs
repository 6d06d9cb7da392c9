use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};

use biztime_core::validate::{all_present, slugify};

use super::{ApiError, ApiResult, json_body, or_not_found};
use crate::AppState;

const NOT_FOUND: &str = "The company was not found";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/companies", get(list).post(create))
        .route(
            "/companies/{code}",
            get(get_one).put(update).delete(remove),
        )
}

#[derive(Default, Deserialize)]
struct CreateCompany {
    code: Option<String>,
    name: Option<String>,
    description: Option<String>,
}

#[derive(Default, Deserialize)]
struct UpdateCompany {
    name: Option<String>,
    description: Option<String>,
}

async fn list(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let companies = state.db.list_companies().await?;
    Ok(Json(json!({ "companies": companies })))
}

async fn get_one(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<Value>> {
    let detail = state
        .db
        .company_detail(&code)
        .await
        .map_err(or_not_found(NOT_FOUND))?;
    Ok(Json(json!(detail)))
}

async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateCompany>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let body = json_body(payload)?;
    let required = || ApiError::bad_request("code,name and description required");

    let [code, name, description] = all_present([
        body.code.as_deref(),
        body.name.as_deref(),
        body.description.as_deref(),
    ])
    .ok_or_else(required)?;

    let code = slugify(code);
    if code.is_empty() {
        return Err(required());
    }

    let company = state.db.create_company(&code, name, description).await?;
    tracing::info!(code = %company.code, "company created");
    Ok(Json(json!({ "company": company })))
}

async fn update(
    State(state): State<AppState>,
    Path(code): Path<String>,
    payload: Result<Json<UpdateCompany>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let body = json_body(payload)?;
    let [name, description] = all_present([body.name.as_deref(), body.description.as_deref()])
        .ok_or_else(|| ApiError::bad_request("name and description required"))?;

    let company = state
        .db
        .update_company(&code, name, description)
        .await
        .map_err(or_not_found(NOT_FOUND))?;
    tracing::info!(code = %company.code, "company updated");
    Ok(Json(json!({ "company": company })))
}

async fn remove(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<Value>> {
    state
        .db
        .delete_company(&code)
        .await
        .map_err(or_not_found(NOT_FOUND))?;
    tracing::info!(%code, "company deleted");
    Ok(Json(json!({ "status": "deleted" })))
}
