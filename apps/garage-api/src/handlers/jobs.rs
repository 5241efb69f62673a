//! Job endpoints.
//!
//! ```text
//! POST   /jobs                 create
//! GET    /jobs?status=booked   list
//! GET    /jobs/{id}            details (notes, parts, invoice id)
//! PATCH  /jobs/{id}            fields / status / note
//! DELETE /jobs/{id}            delete (never once invoiced)
//! POST   /jobs/{id}/parts      attach stocked part
//! POST   /jobs/{id}/invoice    invoice, optionally with a first payment
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use garage_core::{Money, NewPayment};

use crate::dto::{
    ApiResponse, AttachPartRequest, CreateInvoiceRequest, CreateJobRequest, FinalizedInvoiceResponse,
    JobDetailsResponse, JobListQuery, JobPartResponse, JobResponse, UpdateJobRequest,
};
use crate::error::ApiResult;
use crate::AppState;

type Created<T> = (StatusCode, Json<ApiResponse<T>>);

/// `POST /jobs`
pub async fn create_job(
    State(state): State<AppState>,
    payload: Result<Json<CreateJobRequest>, JsonRejection>,
) -> ApiResult<Created<JobResponse>> {
    let Json(req) = payload?;
    let job = state.db.jobs().create_job(req.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new("Job created", job.into())),
    ))
}

/// `GET /jobs`
pub async fn list_jobs(
    State(state): State<AppState>,
    query: Result<Query<JobListQuery>, QueryRejection>,
) -> ApiResult<Json<ApiResponse<Vec<JobResponse>>>> {
    let Query(query) = query?;
    let jobs = state.db.jobs().list_jobs(query.status).await?;

    Ok(Json(ApiResponse::new(
        "Jobs retrieved",
        jobs.into_iter().map(Into::into).collect(),
    )))
}

/// `GET /jobs/{id}`
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<JobDetailsResponse>>> {
    let details = state.db.jobs().get_job(&id).await?;
    Ok(Json(ApiResponse::new("Job retrieved", details.into())))
}

/// `PATCH /jobs/{id}`
pub async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateJobRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<JobDetailsResponse>>> {
    let Json(req) = payload?;
    let details = state.db.jobs().update_job(&id, req.into()).await?;
    Ok(Json(ApiResponse::new("Job updated", details.into())))
}

/// `DELETE /jobs/{id}`
pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<String>>> {
    state.db.jobs().delete_job(&id).await?;
    Ok(Json(ApiResponse::new("Job deleted", id)))
}

/// `POST /jobs/{id}/parts`
pub async fn attach_part(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<AttachPartRequest>, JsonRejection>,
) -> ApiResult<Created<JobPartResponse>> {
    let Json(req) = payload?;
    let part = state
        .db
        .jobs()
        .attach_part(&id, &req.inventory_id, req.quantity)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new("Part attached", part.into())),
    ))
}

/// `POST /jobs/{id}/invoice`
///
/// Without a `payment` this is plain invoice creation; with one, the invoice
/// and its first payment commit together.
pub async fn create_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<CreateInvoiceRequest>, JsonRejection>,
) -> ApiResult<Created<FinalizedInvoiceResponse>> {
    let Json(req) = payload?;
    let discount = Money::from_major(req.discount);
    let payment = req.payment.map(NewPayment::from);

    let finalized = state
        .db
        .payments()
        .finalize_job_to_invoice(&id, discount, payment)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new("Invoice created", finalized.into())),
    ))
}
