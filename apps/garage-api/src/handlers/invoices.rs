//! Invoice and payment endpoints.
//!
//! Amount paid and balance are computed from the payment ledger on every
//! read; nothing here caches them.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;

use crate::dto::{
    ApiResponse, InvoiceDetailsResponse, InvoiceSummaryResponse, PaymentReceiptResponse, PaymentRequest,
    RefreshOverdueResponse,
};
use crate::error::ApiResult;
use crate::AppState;

/// `GET /invoices`
pub async fn list_invoices(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<Vec<InvoiceSummaryResponse>>>> {
    let invoices = state.db.invoices().list_invoices().await?;

    Ok(Json(ApiResponse::new(
        "Invoices retrieved",
        invoices.into_iter().map(Into::into).collect(),
    )))
}

/// `GET /invoices/{id}`
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<InvoiceDetailsResponse>>> {
    let details = state.db.invoices().get_invoice(&id).await?;
    Ok(Json(ApiResponse::new("Invoice retrieved", details.into())))
}

/// `POST /invoices/{id}/payments`
pub async fn record_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<PaymentRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<PaymentReceiptResponse>>)> {
    let Json(req) = payload?;
    let receipt = state.db.payments().record_payment(&id, req.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new("Payment recorded", receipt.into())),
    ))
}

/// `POST /invoices/overdue/refresh`
pub async fn refresh_overdue(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<RefreshOverdueResponse>>> {
    let flagged = state.db.invoices().refresh_overdue(Utc::now()).await?;

    Ok(Json(ApiResponse::new(
        "Overdue invoices refreshed",
        RefreshOverdueResponse { flagged },
    )))
}
