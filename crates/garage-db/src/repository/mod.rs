//! # Repository Module
//!
//! Row-level SQL for the ledger tables.
//!
//! ## Explicit Connections
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Who Owns The Transaction                             │
//! │                                                                         │
//! │  Ledger engine (ledger/*.rs)                                           │
//! │       │                                                                 │
//! │       │  let mut tx = db.begin_immediate().await?;                      │
//! │       │                                                                 │
//! │       ├──► job::get_by_id(&mut tx, id)                                  │
//! │       ├──► inventory::take_stock(&mut tx, item, qty)                    │
//! │       ├──► invoice::insert(&mut tx, &invoice)                           │
//! │       └──► payment::totals(&mut tx, invoice_id)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::with_timeout commits after the deadline (drop → ROLLBACK)   │
//! │                                                                         │
//! │  Repository functions take `&mut SqliteConnection` and never begin    │
//! │  or commit. A pooled connection works the same way for reads.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`job`] - Jobs, job notes and job parts
//! - [`inventory`] - Stocked parts and the conditional stock decrement
//! - [`invoice`] - Invoices and their frozen line items
//! - [`payment`] - The payment ledger and its aggregate

pub mod inventory;
pub mod invoice;
pub mod job;
pub mod payment;
