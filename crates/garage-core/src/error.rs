//! # Error Types
//!
//! Domain-specific error types for garage-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  garage-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  garage-db errors (separate crate)                                     │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── LedgerError      - CoreError | DbError | TransientFailure         │
//! │                                                                         │
//! │  garage-api errors (in app)                                            │
//! │  └── ApiError         - HTTP status + {"error": "..."}                 │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → LedgerError → ApiError → Client   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (IDs, amounts)
//! 3. Errors are enum variants, never String
//! 4. Every variant has an [`ErrorKind`] the boundary maps to a status code

use thiserror::Error;

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse classification used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input. Not retried; surfaced verbatim.
    Validation,
    /// Referenced job, invoice or item does not exist.
    NotFound,
    /// Request conflicts with current state. Caller must change the request.
    Conflict,
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    #[error("Inventory item not found: {0}")]
    ItemNotFound(String),

    /// An invoice already references the job.
    #[error("Job {job_id} is already invoiced (invoice {invoice_id})")]
    AlreadyInvoiced { job_id: String, invoice_id: String },

    /// Taking `requested` units would drive stock below zero.
    ///
    /// ## User Workflow
    /// ```text
    /// Sale line (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { item: "Oil filter", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Whole sale rolls back, nothing is decremented
    /// ```
    #[error("Insufficient stock for {item}: available {available}, requested {requested}")]
    InsufficientStock {
        item: String,
        available: i64,
        requested: i64,
    },

    #[error("Invalid discount {discount_cents}: must be between 0 and the total {total_cents}")]
    InvalidDiscount {
        discount_cents: i64,
        total_cents: i64,
    },

    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    #[error("Invalid job status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Invoiced jobs are kept for referential integrity.
    #[error("Job {0} has an invoice and cannot be deleted")]
    JobHasInvoice(String),

    /// Billable details of an invoiced or cancelled job are frozen.
    #[error("Job {job_id} is {status} and can no longer be edited")]
    JobLocked { job_id: String, status: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Classifies the error for the boundary.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::JobNotFound(_) | CoreError::InvoiceNotFound(_) | CoreError::ItemNotFound(_) => {
                ErrorKind::NotFound
            }
            CoreError::AlreadyInvoiced { .. }
            | CoreError::InsufficientStock { .. }
            | CoreError::InvalidTransition { .. }
            | CoreError::JobHasInvoice(_)
            | CoreError::JobLocked { .. } => ErrorKind::Conflict,
            CoreError::InvalidDiscount { .. }
            | CoreError::InvalidAmount { .. }
            | CoreError::Validation(_) => ErrorKind::Validation,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before any transaction is opened.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Duplicate value (e.g., duplicate inventory name).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
