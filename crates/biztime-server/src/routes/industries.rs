use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};

use biztime_core::model::{Industry, IndustryCompanies};
use biztime_core::validate::all_present;

use super::{ApiError, ApiResult, json_body};
use crate::AppState;
use crate::db::Association;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/industries", get(list).post(create))
        .route("/industries/associate", post(associate))
}

#[derive(Default, Deserialize)]
struct CreateIndustry {
    code: Option<String>,
    industry: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Associate {
    company_code: Option<String>,
    industry_code: Option<String>,
}

async fn list(State(state): State<AppState>) -> ApiResult<Json<IndustryCompanies>> {
    let grouped = state.db.industry_companies().await?;
    Ok(Json(grouped))
}

async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateIndustry>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Industry>)> {
    let body = json_body(payload)?;
    let [code, industry] = all_present([body.code.as_deref(), body.industry.as_deref()])
        .ok_or_else(|| ApiError::bad_request("code and industry fields are required"))?;

    let industry = state.db.create_industry(code, industry).await?;
    tracing::info!(code = %industry.code, "industry created");
    Ok((StatusCode::CREATED, Json(industry)))
}

async fn associate(
    State(state): State<AppState>,
    payload: Result<Json<Associate>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let body = json_body(payload)?;
    let [company_code, industry_code] =
        all_present([body.company_code.as_deref(), body.industry_code.as_deref()]).ok_or_else(
            || ApiError::bad_request("companyCode and industryCode fields are required"),
        )?;

    match state.db.associate(company_code, industry_code).await? {
        Association::Added => {
            tracing::info!(company_code, industry_code, "company associated with industry");
            Ok(Json(json!({ "status": "added" })))
        }
        Association::MissingCompany => Err(ApiError::not_found(format!(
            "The company was not found with the code {company_code}"
        ))),
        Association::MissingIndustry => Err(ApiError::not_found(format!(
            "The industry was not found with the code {industry_code}"
        ))),
    }
}
