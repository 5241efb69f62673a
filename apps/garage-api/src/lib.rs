//! # garage-api: HTTP Boundary for the Garage Ledger
//!
//! JSON over HTTP in front of the ledger engines in `garage-db`.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Request Lifecycle                              │
//! │                                                                         │
//! │  POST /invoices/{id}/payments  { "amount": 140.0, "method": "card" }   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  TraceLayer (http_request span)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  handler: PaymentRequest ──► NewPayment (major units → cents)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.payments().record_payment()   (one SQLite write transaction)       │
//! │       │                                                                 │
//! │       ├── Ok  ──► 201 { "message": "...", "data": {...} }              │
//! │       └── Err ──► ApiError ──► 400/404/409/500 { "error": "..." }      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;

use axum::routing::{get, patch, post};
use axum::Router;
use garage_db::Database;
use tower_http::trace::TraceLayer;

pub use config::{ApiConfig, ConfigError};
pub use error::{ApiError, ApiResult};

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        AppState { db }
    }
}

/// Builds the full route table over an open database.
pub fn build_router(db: Database) -> Router {
    use handlers::{health, inventory, invoices, jobs, sales};

    Router::new()
        .route("/health", get(health::health))
        // Jobs
        .route("/jobs", post(jobs::create_job).get(jobs::list_jobs))
        .route(
            "/jobs/{id}",
            get(jobs::get_job).patch(jobs::update_job).delete(jobs::delete_job),
        )
        .route("/jobs/{id}/parts", post(jobs::attach_part))
        .route("/jobs/{id}/invoice", post(jobs::create_invoice))
        // Invoices
        .route("/invoices", get(invoices::list_invoices))
        .route("/invoices/overdue/refresh", post(invoices::refresh_overdue))
        .route("/invoices/{id}", get(invoices::get_invoice))
        .route("/invoices/{id}/payments", post(invoices::record_payment))
        // Inventory
        .route("/inventory", post(inventory::create_item).get(inventory::list_items))
        .route("/inventory/{id}/stock", patch(inventory::update_stock))
        // Point of sale
        .route("/sales", post(sales::create_sale))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(db))
}
