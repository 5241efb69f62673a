//! Point-of-sale endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::dto::{ApiResponse, SaleRequest, SaleResponse};
use crate::error::ApiResult;
use crate::AppState;

/// `POST /sales`
pub async fn create_sale(
    State(state): State<AppState>,
    payload: Result<Json<SaleRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<SaleResponse>>)> {
    let Json(req) = payload?;
    let outcome = state.db.sales().create_sale(req.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new("Sale completed", outcome.into())),
    ))
}
