//! # Sale Engine
//!
//! Point-of-sale: sells stocked parts straight off the counter.
//!
//! ## One Sale, One Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    create_sale(NewSale)                                 │
//! │                                                                         │
//! │  validate basket shape            → Validation (before BEGIN)          │
//! │  BEGIN IMMEDIATE                                                        │
//! │   ├── INSERT job (Part, Completed, "Direct Sale")                      │
//! │   ├── for each line:                                                    │
//! │   │     take_stock(item, qty)     → ItemNotFound / InsufficientStock   │
//! │   │     INSERT job_part (name + price snapshot)                        │
//! │   ├── create_invoice_in           → InvalidDiscount                     │
//! │   │     (invoice + lines, job → Invoiced)                              │
//! │   ├── for each payment:                                                 │
//! │   │     record_payment_in         → InvalidAmount                       │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any error drops the transaction: no job, no stock change, no invoice, │
//! │  no payment.                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The same inventory item may appear on several lines; each line decrements
//! against the stock left by the previous ones.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::info;
use uuid::Uuid;

use crate::error::LedgerResult;
use crate::ledger::invoice::create_invoice_in;
use crate::ledger::payment::record_payment_in;
use crate::pool::{Database, Staged};
use crate::repository::{inventory as inventory_repo, job as job_repo};
use garage_core::validation::validate_new_sale;
use garage_core::{Job, JobPart, JobStatus, JobType, NewSale, SaleOutcome, DIRECT_SALE_DESCRIPTION};

/// Runs a complete sale inside the caller's transaction.
pub async fn create_sale_in(
    conn: &mut SqliteConnection,
    sale: &NewSale,
    payment_terms_days: i64,
    now: DateTime<Utc>,
) -> LedgerResult<SaleOutcome> {
    validate_new_sale(sale)?;

    let job = Job {
        id: Uuid::new_v4().to_string(),
        customer_id: sale.customer_id.trim().to_string(),
        description: DIRECT_SALE_DESCRIPTION.to_string(),
        job_type: JobType::Part,
        status: JobStatus::Completed,
        vehicle_id: None,
        vehicle_registration: None,
        part_description: None,
        service_price_cents: 0,
        created_at: now,
        updated_at: now,
    };
    job_repo::insert(conn, &job).await?;

    for line in &sale.lines {
        let item = inventory_repo::take_stock(conn, &line.inventory_id, line.quantity, now).await?;

        let part = JobPart {
            id: Uuid::new_v4().to_string(),
            job_id: job.id.clone(),
            inventory_id: item.id,
            name_snapshot: item.name,
            unit_price_cents: item.unit_price_cents,
            quantity: line.quantity,
            created_at: now,
        };
        job_repo::insert_part(conn, &part).await?;
    }

    let invoice = create_invoice_in(conn, &job.id, sale.discount, payment_terms_days, now).await?;

    let mut status = invoice.status;
    let mut amount_paid_cents = 0;
    for payment in &sale.payments {
        let receipt = record_payment_in(conn, &invoice.id, payment, now).await?;
        status = receipt.status;
        amount_paid_cents = receipt.amount_paid_cents;
    }

    Ok(SaleOutcome {
        job_id: job.id,
        invoice_id: invoice.id,
        total_cents: invoice.total_cents,
        discount_cents: invoice.discount_cents,
        amount_paid_cents,
        status,
    })
}

/// Point-of-sale operations that own their transaction.
#[derive(Debug, Clone)]
pub struct SaleEngine {
    db: Database,
}

impl SaleEngine {
    /// Creates a new SaleEngine.
    pub fn new(db: Database) -> Self {
        SaleEngine { db }
    }

    /// Sells a basket: stock, job, invoice and payments commit together.
    pub async fn create_sale(&self, sale: NewSale) -> LedgerResult<SaleOutcome> {
        validate_new_sale(&sale)?;
        let lines = sale.lines.len();
        let outcome = self.db.with_timeout("create_sale", self.create_sale_tx(sale)).await?;

        info!(
            job_id = %outcome.job_id,
            invoice_id = %outcome.invoice_id,
            lines,
            total = outcome.total_cents,
            amount_paid = outcome.amount_paid_cents,
            status = outcome.status.as_str(),
            "Sale completed"
        );
        Ok(outcome)
    }

    async fn create_sale_tx(&self, sale: NewSale) -> LedgerResult<Staged<SaleOutcome>> {
        let mut tx = self.db.begin_immediate().await?;
        let outcome = create_sale_in(&mut tx, &sale, self.db.payment_terms_days(), Utc::now()).await?;
        Ok((tx, outcome))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::pool::DbConfig;
    use garage_core::{
        CoreError, InvoiceStatus, Money, NewInventoryItem, NewPayment, PaymentMethod, PaymentType,
        SaleLine, ValidationError,
    };

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn stock(db: &Database, name: &str, qty: i64, cents: i64) -> String {
        db.inventory()
            .create_item(NewInventoryItem {
                name: name.to_string(),
                quantity: qty,
                unit_price: Money::from_cents(cents),
            })
            .await
            .unwrap()
            .id
    }

    fn basket(lines: Vec<(&str, i64)>) -> NewSale {
        NewSale {
            customer_id: "walk-in".to_string(),
            lines: lines
                .into_iter()
                .map(|(id, quantity)| SaleLine {
                    inventory_id: id.to_string(),
                    quantity,
                })
                .collect(),
            discount: Money::zero(),
            payments: vec![],
        }
    }

    async fn count(db: &Database, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_paid_sale() {
        let db = setup().await;
        let wiper = stock(&db, "Wiper blade", 5, 1_500).await;
        let bulb = stock(&db, "H4 bulb", 3, 900).await;

        let mut sale = basket(vec![(wiper.as_str(), 2), (bulb.as_str(), 1)]);
        sale.payments.push(NewPayment {
            amount: Money::from_cents(3_900),
            method: PaymentMethod::Card,
            payment_type: PaymentType::FullPayment,
            note: None,
        });

        let outcome = db.sales().create_sale(sale).await.unwrap();
        assert_eq!(outcome.total_cents, 3_900);
        assert_eq!(outcome.amount_paid_cents, 3_900);
        assert_eq!(outcome.status, InvoiceStatus::Paid);

        assert_eq!(db.inventory().get_item(&wiper).await.unwrap().quantity, 3);
        assert_eq!(db.inventory().get_item(&bulb).await.unwrap().quantity, 2);

        let job = db.jobs().get_job(&outcome.job_id).await.unwrap();
        assert_eq!(job.job.description, DIRECT_SALE_DESCRIPTION);
        assert_eq!(job.job.job_type, JobType::Part);
        assert_eq!(job.job.status, JobStatus::Invoiced);
        assert_eq!(job.parts.len(), 2);
    }

    #[tokio::test]
    async fn test_unpaid_sale_with_discount() {
        let db = setup().await;
        let oil = stock(&db, "5W-30 1L", 10, 12_000).await;

        let mut sale = basket(vec![(oil.as_str(), 1)]);
        sale.discount = Money::from_cents(2_000);

        let outcome = db.sales().create_sale(sale).await.unwrap();
        assert_eq!(outcome.total_cents, 12_000);
        assert_eq!(outcome.discount_cents, 2_000);
        assert_eq!(outcome.amount_paid_cents, 0);
        assert_eq!(outcome.status, InvoiceStatus::Unpaid);
    }

    #[tokio::test]
    async fn test_out_of_stock_rolls_back_everything() {
        let db = setup().await;
        let plenty = stock(&db, "Fuse", 10, 100).await;
        let scarce = stock(&db, "Alternator", 1, 250_000).await;

        let err = db
            .sales()
            .create_sale(basket(vec![(plenty.as_str(), 4), (scarce.as_str(), 2)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(CoreError::InsufficientStock { available: 1, requested: 2, .. })
        ));

        assert_eq!(db.inventory().get_item(&plenty).await.unwrap().quantity, 10);
        assert_eq!(db.inventory().get_item(&scarce).await.unwrap().quantity, 1);
        assert_eq!(count(&db, "jobs").await, 0);
        assert_eq!(count(&db, "job_parts").await, 0);
        assert_eq!(count(&db, "invoices").await, 0);
        assert_eq!(count(&db, "payments").await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_lines_decrement_cumulatively() {
        let db = setup().await;
        let plug = stock(&db, "Spark plug", 4, 800).await;

        let err = db
            .sales()
            .create_sale(basket(vec![(plug.as_str(), 3), (plug.as_str(), 2)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(CoreError::InsufficientStock { available: 1, requested: 2, .. })
        ));
        assert_eq!(db.inventory().get_item(&plug).await.unwrap().quantity, 4);

        let outcome = db
            .sales()
            .create_sale(basket(vec![(plug.as_str(), 2), (plug.as_str(), 2)]))
            .await
            .unwrap();
        assert_eq!(outcome.total_cents, 3_200);
        assert_eq!(db.inventory().get_item(&plug).await.unwrap().quantity, 0);
    }

    #[tokio::test]
    async fn test_empty_basket_rejected() {
        let db = setup().await;
        let err = db.sales().create_sale(basket(vec![])).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(CoreError::Validation(ValidationError::Required { .. }))
        ));
    }

    #[tokio::test]
    async fn test_unknown_item_and_bad_discount() {
        let db = setup().await;
        let err = db
            .sales()
            .create_sale(basket(vec![("ghost", 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Domain(CoreError::ItemNotFound(_))));

        let belt = stock(&db, "Fan belt", 2, 5_000).await;
        let mut sale = basket(vec![(belt.as_str(), 1)]);
        sale.discount = Money::from_cents(5_001);
        let err = db.sales().create_sale(sale).await.unwrap_err();
        assert!(matches!(err, LedgerError::Domain(CoreError::InvalidDiscount { .. })));
        assert_eq!(db.inventory().get_item(&belt).await.unwrap().quantity, 2);
    }
}
