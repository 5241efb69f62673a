//! # Ledger Engines
//!
//! The multi-table operations of the ledger. Each one runs in exactly one
//! `BEGIN IMMEDIATE` transaction under the configured deadline.
//!
//! ## Composition
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  SaleEngine::create_sale                                               │
//! │   └── create_sale_in(tx)                                               │
//! │        ├── job::insert                      (Direct Sale job)          │
//! │        ├── inventory::take_stock × lines    (conditional decrement)    │
//! │        ├── invoice::create_invoice_in(tx)   (frozen lines, Invoiced)   │
//! │        └── payment::record_payment_in(tx) × payments                   │
//! │                                                                         │
//! │  PaymentProcessor::finalize_job_to_invoice                             │
//! │   └── finalize_job_to_invoice_in(tx)                                   │
//! │        ├── invoice::create_invoice_in(tx)                              │
//! │        └── payment::record_payment_in(tx)                              │
//! │                                                                         │
//! │  Every `*_in` function takes the caller's connection and never        │
//! │  commits, so they nest inside one another's transactions.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`invoice`] - Invoice creation, reads with fresh aggregates, overdue sweep
//! - [`payment`] - Payment ledger writes and job finalization
//! - [`sale`] - Point-of-sale transaction
//! - [`job`] - Job lifecycle: booking, edits, parts, deletion

pub mod invoice;
pub mod job;
pub mod payment;
pub mod sale;

pub use invoice::InvoiceEngine;
pub use job::JobEngine;
pub use payment::PaymentProcessor;
pub use sale::SaleEngine;
