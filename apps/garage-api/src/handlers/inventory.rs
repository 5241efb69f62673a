//! Inventory endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::dto::{ApiResponse, CreateItemRequest, InventoryItemResponse, StockRequest};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// `POST /inventory`
pub async fn create_item(
    State(state): State<AppState>,
    payload: Result<Json<CreateItemRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<InventoryItemResponse>>)> {
    let Json(req) = payload?;
    let item = state.db.inventory().create_item(req.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new("Inventory item created", item.into())),
    ))
}

/// `GET /inventory`
pub async fn list_items(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<Vec<InventoryItemResponse>>>> {
    let items = state.db.inventory().list_items().await?;

    Ok(Json(ApiResponse::new(
        "Inventory retrieved",
        items.into_iter().map(Into::into).collect(),
    )))
}

/// `PATCH /inventory/{id}/stock`
pub async fn update_stock(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<StockRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<InventoryItemResponse>>> {
    let Json(req) = payload?;
    let inventory = state.db.inventory();

    let item = match (req.quantity, req.delta) {
        (Some(quantity), None) => inventory.set_quantity(&id, quantity).await?,
        (None, Some(delta)) => inventory.adjust_quantity(&id, delta).await?,
        _ => {
            return Err(ApiError::BadRequest(
                "exactly one of quantity or delta is required".to_string(),
            ))
        }
    };

    Ok(Json(ApiResponse::new("Stock updated", item.into())))
}
