//! # garage-core: Pure Business Logic for Garage Ledger
//!
//! This crate holds the rules that keep the workshop's books consistent, as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Garage Ledger Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  garage-api (axum)                              │   │
//! │  │   /jobs  /invoices  /invoices/:id/payments  /sales  /inventory  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  garage-db (sqlx + SQLite)                      │   │
//! │  │   Invoice engine · Payment processor · Sale transaction · Jobs  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ garage-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────────────┐   │   │
//! │  │   │  money   │  │  types   │  │  ledger  │  │  lifecycle   │   │   │
//! │  │   │  Money   │  │ Job, Inv │  │ status   │  │ job machine  │   │   │
//! │  │   └──────────┘  └──────────┘  └──────────┘  └──────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Job, InventoryItem, Invoice, Payment, inputs)
//! - [`money`] - Money type with integer arithmetic
//! - [`ledger`] - Amount-paid aggregation and invoice status derivation
//! - [`lifecycle`] - Job status machine
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use garage_core::ledger::{derive_status, StatusContext};
//! use garage_core::{InvoiceStatus, Money};
//!
//! let total = Money::from_cents(15_000);
//! let discount = Money::from_cents(1_000);
//!
//! let status = derive_status(total - discount, Money::from_cents(14_000), StatusContext::default());
//! assert_eq!(status, InvoiceStatus::Paid);
//! ```

pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod money;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Symbol used when money is displayed.
pub const CURRENCY_SYMBOL: &str = "R";

/// Description given to the job record a direct sale creates.
pub const DIRECT_SALE_DESCRIPTION: &str = "Direct Sale";

/// Maximum quantity on a single sale or part line.
///
/// Guards against typing 1000 instead of 10.
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Maximum stock level of one inventory item.
pub const MAX_STOCK_LEVEL: i64 = 1_000_000;

/// Maximum unit or service price in cents (R10 000 000.00).
///
/// With `MAX_ITEM_QUANTITY` and `MAX_SALE_LINES` this keeps every line and
/// invoice total far inside i64.
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;

/// Maximum amount of a single payment entry in cents.
pub const MAX_PAYMENT_CENTS: i64 = 100_000_000_000_000;

/// Maximum lines in one sale basket.
pub const MAX_SALE_LINES: usize = 100;

/// Maximum length of one job log note.
pub const MAX_NOTE_LENGTH: usize = 2_000;

/// Default payment terms when no configuration is supplied.
pub const DEFAULT_PAYMENT_TERMS_DAYS: i64 = 30;
