//! # garage-db: Ledger Store for Garage Ledger
//!
//! SQLite storage for jobs, inventory, invoices and payments, plus the
//! transactional engines that keep them consistent.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Garage Ledger Data Flow                          │
//! │                                                                         │
//! │  HTTP handler (POST /invoices/:id/payments)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     garage-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │    Engines    │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  (ledger/)    │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ InvoiceEngine │    │ 001_init.sql │  │   │
//! │  │   │ BEGIN IMMED.  │    │ PaymentProc.  │    │ 002_idx.sql  │  │   │
//! │  │   │ tx deadline   │    │ SaleEngine    │    │              │  │   │
//! │  │   └───────────────┘    │ JobEngine     │    └──────────────┘  │   │
//! │  │                        └───────┬───────┘                       │   │
//! │  │                                ▼                               │   │
//! │  │                        Repositories (repository/)              │   │
//! │  │                        SQL over &mut SqliteConnection          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, write transactions, deadlines
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - `DbError` and `LedgerError`
//! - [`repository`] - Row-level SQL
//! - [`ledger`] - Invoice, payment, sale and job engines
//!
//! ## Usage
//!
//! ```rust,ignore
//! use garage_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("garage.db")).await?;
//!
//! let outcome = db.sales().create_sale(sale).await?;
//! let details = db.invoices().get_invoice(&outcome.invoice_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, LedgerError, LedgerResult};
pub use ledger::{InvoiceEngine, JobEngine, PaymentProcessor, SaleEngine};
pub use pool::{Database, DbConfig, Staged};
pub use repository::inventory::InventoryRepository;
