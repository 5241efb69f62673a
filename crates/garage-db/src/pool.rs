//! # Database Pool Management
//!
//! Connection pool creation, configuration and transaction boundaries for
//! SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  API Startup                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) ← pool size, busy timeout, tx deadline, terms     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       ├── reads: any connection, concurrently (WAL)                    │
//! │       └── writes: BEGIN IMMEDIATE, one writer at a time                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Write Transactions
//! Every ledger write opens its transaction with `BEGIN IMMEDIATE`, taking
//! the SQLite write lock before the first read. A concurrent writer waits up
//! to `busy_timeout` and then fails with `SQLITE_BUSY`, which surfaces as
//! [`LedgerError::TransientFailure`]. The whole transaction additionally runs
//! under `tx_timeout`; on expiry the future is dropped, which drops the
//! `sqlx::Transaction` and rolls it back.

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::future::Future;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult, LedgerError, LedgerResult};
use crate::ledger::invoice::InvoiceEngine;
use crate::ledger::job::JobEngine;
use crate::ledger::payment::PaymentProcessor;
use crate::ledger::sale::SaleEngine;
use crate::migrations;
use crate::repository::inventory::InventoryRepository;
use garage_core::DEFAULT_PAYMENT_TERMS_DAYS;

/// Result of a write operation whose transaction is not yet committed.
pub type Staged<T> = (Transaction<'static, Sqlite>, T);

/// Path value that selects a private in-memory database.
const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("./data/garage.db")
///     .max_connections(5)
///     .tx_timeout(Duration::from_secs(5))
///     .payment_terms_days(14);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file, or `:memory:`.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Pool acquire timeout.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// How long a connection waits on a locked database before SQLITE_BUSY.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Deadline for one whole ledger transaction.
    /// Default: 10 seconds
    pub tx_timeout: Duration,

    /// Days between an invoice's creation and its due date.
    /// Default: 30
    pub payment_terms_days: i64,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// The file is created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            tx_timeout: Duration::from_secs(10),
            payment_terms_days: DEFAULT_PAYMENT_TERMS_DAYS,
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the pool acquire timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the SQLite busy timeout.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets the per-transaction deadline.
    pub fn tx_timeout(mut self, timeout: Duration) -> Self {
        self.tx_timeout = timeout;
        self
    }

    /// Sets the payment terms used for new invoices' due dates.
    pub fn payment_terms_days(mut self, days: i64) -> Self {
        self.payment_terms_days = days;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let db = Database::new(DbConfig::in_memory()).await?;
    /// // Database is isolated, perfect for tests
    /// ```
    ///
    /// An in-memory database lives inside one connection, so the pool is
    /// pinned to a single connection that is never recycled.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(MEMORY_PATH),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            busy_timeout: Duration::from_secs(1),
            tx_timeout: Duration::from_secs(5),
            payment_terms_days: DEFAULT_PAYMENT_TERMS_DAYS,
            run_migrations: true,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing engine and repository access.
///
/// Cloning is cheap: the pool is reference counted.
///
/// ## Usage in Handlers
/// ```rust,ignore
/// async fn record_payment(
///     State(state): State<AppState>,
///     Path(id): Path<String>,
///     Json(req): Json<PaymentRequest>,
/// ) -> ApiResult<Json<ApiResponse<PaymentReceiptResponse>>> {
///     let receipt = state.db.payments().record_payment(&id, req.into()).await?;
///     Ok(Json(ApiResponse::new("Payment recorded", receipt.into())))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,
    tx_timeout: Duration,
    payment_terms_days: i64,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite:
    ///    - WAL mode for concurrent reads
    ///    - NORMAL synchronous (balance of safety/speed)
    ///    - Foreign keys enabled
    ///    - busy timeout for lock waits
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let base_options = if config.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&config.database_path)
                // Create file if it doesn't exist
                .create_if_missing(true)
        };

        let connect_options = base_options
            // WAL mode: readers don't block the single writer
            .journal_mode(SqliteJournalMode::Wal)
            // NORMAL synchronous: safe from corruption, may lose last tx on crash
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has them disabled by default for backwards compatibility
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout);

        debug!("Connection options configured");

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout);

        pool_options = if config.is_in_memory() {
            // Recycling the only connection would discard the database
            pool_options
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            pool_options.idle_timeout(Some(config.idle_timeout))
        };

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            tx_timeout_ms = config.tx_timeout.as_millis() as u64,
            "Database pool created"
        );

        let db = Database {
            pool,
            tx_timeout: config.tx_timeout,
            payment_terms_days: config.payment_terms_days,
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations.
    ///
    /// Automatically called by `new()` if `run_migrations` is true.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Days of payment terms applied to new invoices.
    pub fn payment_terms_days(&self) -> i64 {
        self.payment_terms_days
    }

    /// Deadline applied to each ledger transaction.
    pub fn tx_timeout(&self) -> Duration {
        self.tx_timeout
    }

    /// Acquires a pooled connection for reads.
    pub async fn acquire(&self) -> DbResult<PoolConnection<Sqlite>> {
        Ok(self.pool.acquire().await?)
    }

    /// Opens a write transaction holding the database write lock.
    ///
    /// Drop the returned transaction without committing to roll back.
    pub async fn begin_immediate(&self) -> DbResult<Transaction<'static, Sqlite>> {
        let tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;
        Ok(tx)
    }

    /// Runs one ledger operation under the transaction deadline, then commits.
    ///
    /// The future does the work and hands back its still-open transaction.
    /// Only that work is bounded by `tx_timeout`; on expiry the transaction
    /// is dropped (rolled back) and the caller gets `TransientFailure`.
    /// COMMIT runs after the deadline check, so a `TransientFailure` always
    /// means nothing was written.
    ///
    /// ## Example
    /// ```rust,ignore
    /// async fn record_payment_tx(&self, id: &str, payment: NewPayment) -> LedgerResult<Staged<PaymentReceipt>> {
    ///     let mut tx = self.db.begin_immediate().await?;
    ///     let receipt = record_payment_in(&mut tx, id, &payment, Utc::now()).await?;
    ///     Ok((tx, receipt))
    /// }
    ///
    /// self.db.with_timeout("record_payment", self.record_payment_tx(id, payment)).await
    /// ```
    pub async fn with_timeout<T, F>(&self, operation: &'static str, fut: F) -> LedgerResult<T>
    where
        F: Future<Output = LedgerResult<Staged<T>>>,
    {
        let (tx, value) = match tokio::time::timeout(self.tx_timeout, fut).await {
            Ok(result) => result?,
            Err(_) => {
                let timeout_ms = self.tx_timeout.as_millis() as u64;
                warn!(operation, timeout_ms, "Ledger transaction deadline exceeded, rolled back");
                return Err(LedgerError::TransientFailure {
                    reason: format!("{} exceeded its {} ms deadline", operation, timeout_ms),
                });
            }
        };

        tx.commit().await?;
        debug!(operation, "Ledger transaction committed");
        Ok(value)
    }

    /// Returns the invoice engine.
    pub fn invoices(&self) -> InvoiceEngine {
        InvoiceEngine::new(self.clone())
    }

    /// Returns the payment processor.
    pub fn payments(&self) -> PaymentProcessor {
        PaymentProcessor::new(self.clone())
    }

    /// Returns the point-of-sale engine.
    pub fn sales(&self) -> SaleEngine {
        SaleEngine::new(self.clone())
    }

    /// Returns the job engine.
    pub fn jobs(&self) -> JobEngine {
        JobEngine::new(self.clone())
    }

    /// Returns the inventory repository.
    pub fn inventory(&self) -> InventoryRepository {
        InventoryRepository::new(self.clone())
    }

    /// Closes the database connection pool.
    ///
    /// After calling close, all operations will fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database can execute queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.health_check().await);
        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = DbConfig::new("/tmp/garage.db")
            .max_connections(10)
            .min_connections(2)
            .tx_timeout(Duration::from_millis(250))
            .payment_terms_days(14);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.tx_timeout, Duration::from_millis(250));
        assert_eq!(config.payment_terms_days, 14);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }

    async fn insert_spark_plugs(tx: &mut Transaction<'static, Sqlite>) {
        sqlx::query(
            "INSERT INTO inventory_items (id, name, quantity, unit_price_cents, created_at, updated_at)
             VALUES ('i1', 'Spark plug', 4, 900, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
        )
        .execute(&mut **tx)
        .await
        .unwrap();
    }

    async fn item_count(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM inventory_items")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_deadline_maps_to_transient_failure() {
        let db = Database::new(DbConfig::in_memory().tx_timeout(Duration::from_millis(20)))
            .await
            .unwrap();

        let result: LedgerResult<()> = db
            .with_timeout("sleepy", async {
                let mut tx = db.begin_immediate().await?;
                insert_spark_plugs(&mut tx).await;
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok::<_, LedgerError>((tx, ()))
            })
            .await;

        assert!(matches!(result, Err(LedgerError::TransientFailure { .. })));
        assert_eq!(item_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_with_timeout_commits_staged_work() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let value = db
            .with_timeout("insert", async {
                let mut tx = db.begin_immediate().await?;
                insert_spark_plugs(&mut tx).await;
                Ok::<_, LedgerError>((tx, 7))
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(item_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        {
            let mut tx = db.begin_immediate().await.unwrap();
            sqlx::query(
                "INSERT INTO inventory_items (id, name, quantity, unit_price_cents, created_at, updated_at)
                 VALUES ('i1', 'Spark plug', 4, 900, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
            )
            .execute(&mut *tx)
            .await
            .unwrap();
        }

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_items")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
