use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};

use biztime_core::shape::PaymentChange;
use biztime_core::validate::present;

use super::{ApiError, ApiResult, json_body, or_not_found};
use crate::AppState;

const NOT_FOUND: &str = "The invoice was not found";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/invoices", get(list).post(create))
        .route(
            "/invoices/{id}",
            get(get_one).put(update).delete(remove),
        )
}

#[derive(Default, Deserialize)]
struct CreateInvoice {
    comp_code: Option<String>,
    amt: Option<f64>,
}

#[derive(Default, Deserialize)]
struct UpdateInvoice {
    amt: Option<f64>,
    paid: Option<bool>,
}

/// Ids that are not integers cannot name an invoice.
fn invoice_id(raw: &str) -> ApiResult<i64> {
    raw.parse().map_err(|_| ApiError::not_found(NOT_FOUND))
}

async fn list(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let invoices = state.db.list_invoices().await?;
    Ok(Json(json!({ "invoices": invoices })))
}

async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = invoice_id(&id)?;
    let detail = state
        .db
        .invoice_detail(id)
        .await
        .map_err(or_not_found(NOT_FOUND))?;
    Ok(Json(json!(detail)))
}

async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateInvoice>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let body = json_body(payload)?;
    let (Some(comp_code), Some(amt)) = (present(body.comp_code.as_deref()), body.amt) else {
        return Err(ApiError::bad_request("comp_code and amt fields are required"));
    };

    let invoice = state.db.create_invoice(comp_code, amt).await?;
    tracing::info!(id = invoice.id, comp_code = %invoice.comp_code, "invoice created");
    Ok(Json(json!({ "invoice": invoice })))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateInvoice>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let body = json_body(payload)?;
    let amt = body
        .amt
        .ok_or_else(|| ApiError::bad_request("amt fields are required"))?;
    let id = invoice_id(&id)?;

    let payment = PaymentChange::resolve(body.paid, chrono::Utc::now());
    let invoice = state
        .db
        .update_invoice(id, amt, &payment)
        .await
        .map_err(or_not_found(NOT_FOUND))?;
    tracing::info!(id, paid = invoice.paid, "invoice updated");
    Ok(Json(json!({ "invoice": invoice })))
}

async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = invoice_id(&id)?;
    state
        .db
        .delete_invoice(id)
        .await
        .map_err(or_not_found(NOT_FOUND))?;
    tracing::info!(id, "invoice deleted");
    Ok(Json(json!({ "status": "deleted" })))
}
