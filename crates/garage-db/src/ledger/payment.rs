//! # Payment Processor
//!
//! Appends payment entries and keeps invoice status in step with the ledger.
//!
//! ## Recording a Payment
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN IMMEDIATE                                                       │
//! │   │                                                                     │
//! │   ├── load invoice                    → InvoiceNotFound                 │
//! │   ├── amount_paid before              (SQL aggregate)                   │
//! │   ├── amount > 0, return <= paid ?    → InvalidAmount                   │
//! │   ├── INSERT payment                                                    │
//! │   ├── amount_paid after               (SQL aggregate, sees the insert)  │
//! │   ├── derive status, UPDATE if changed                                  │
//! │   │                                                                     │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  The write lock is held from the first read, so two payments on the    │
//! │  same invoice never interleave between aggregate and status update.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Overpayment is accepted; the invoice is simply `Paid` with a negative
//! balance.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::info;
use uuid::Uuid;

use crate::error::LedgerResult;
use crate::ledger::invoice::{create_invoice_in, settle_in};
use crate::pool::{Database, Staged};
use crate::repository::{invoice as invoice_repo, payment as payment_repo};
use garage_core::ledger::check_payment;
use garage_core::validation::validate_note;
use garage_core::{CoreError, FinalizedInvoice, Money, NewPayment, Payment, PaymentReceipt};

// =============================================================================
// Transaction-Scoped Operations
// =============================================================================

/// Records a payment against an invoice inside the caller's transaction.
pub async fn record_payment_in(
    conn: &mut SqliteConnection,
    invoice_id: &str,
    input: &NewPayment,
    now: DateTime<Utc>,
) -> LedgerResult<PaymentReceipt> {
    let invoice = invoice_repo::get_by_id(conn, invoice_id)
        .await?
        .ok_or_else(|| CoreError::InvoiceNotFound(invoice_id.to_string()))?;

    if let Some(note) = &input.note {
        validate_note(note)?;
    }

    let before = payment_repo::totals(conn, invoice_id).await?;
    check_payment(input.amount, input.payment_type, before.amount_paid)?;

    let payment = Payment {
        id: Uuid::new_v4().to_string(),
        invoice_id: invoice_id.to_string(),
        amount_cents: input.amount.cents(),
        method: input.method,
        payment_type: input.payment_type,
        note: input.note.as_ref().map(|n| n.trim().to_string()),
        payment_date: now,
    };
    payment_repo::insert(conn, &payment).await?;

    let (after, status) = settle_in(conn, &invoice, now).await?;

    info!(
        invoice_id = %invoice_id,
        payment_id = %payment.id,
        amount = %payment.amount(),
        payment_type = ?payment.payment_type,
        amount_paid = %after.amount_paid,
        status = status.as_str(),
        "Payment recorded"
    );

    Ok(PaymentReceipt {
        payment,
        amount_paid_cents: after.amount_paid.cents(),
        status,
    })
}

/// Invoices a job and optionally takes an initial payment, atomically.
pub async fn finalize_job_to_invoice_in(
    conn: &mut SqliteConnection,
    job_id: &str,
    discount: Money,
    payment: Option<&NewPayment>,
    payment_terms_days: i64,
    now: DateTime<Utc>,
) -> LedgerResult<FinalizedInvoice> {
    let mut invoice = create_invoice_in(conn, job_id, discount, payment_terms_days, now).await?;

    let receipt = match payment {
        Some(payment) => {
            let receipt = record_payment_in(conn, &invoice.id, payment, now).await?;
            invoice.status = receipt.status;
            Some(receipt)
        }
        None => None,
    };

    Ok(FinalizedInvoice { invoice, receipt })
}

// =============================================================================
// Processor
// =============================================================================

/// Payment operations that own their transaction.
///
/// ## Usage
/// ```rust,ignore
/// let receipt = db.payments().record_payment(&invoice.id, NewPayment {
///     amount: Money::from_cents(14_000),
///     method: PaymentMethod::Card,
///     payment_type: PaymentType::FullPayment,
///     note: None,
/// }).await?;
/// assert_eq!(receipt.status, InvoiceStatus::Paid);
/// ```
#[derive(Debug, Clone)]
pub struct PaymentProcessor {
    db: Database,
}

impl PaymentProcessor {
    /// Creates a new PaymentProcessor.
    pub fn new(db: Database) -> Self {
        PaymentProcessor { db }
    }

    /// Appends a payment and returns the invoice's fresh aggregates.
    pub async fn record_payment(&self, invoice_id: &str, payment: NewPayment) -> LedgerResult<PaymentReceipt> {
        self.db
            .with_timeout("record_payment", self.record_payment_tx(invoice_id, payment))
            .await
    }

    /// Invoices a job and records the optional initial payment.
    ///
    /// Either both happen or neither does.
    pub async fn finalize_job_to_invoice(
        &self,
        job_id: &str,
        discount: Money,
        payment: Option<NewPayment>,
    ) -> LedgerResult<FinalizedInvoice> {
        self.db
            .with_timeout(
                "finalize_job_to_invoice",
                self.finalize_tx(job_id, discount, payment),
            )
            .await
    }

    /// Payment entries of an invoice, oldest first.
    pub async fn list_payments(&self, invoice_id: &str) -> LedgerResult<Vec<Payment>> {
        let mut conn = self.db.acquire().await?;

        if invoice_repo::get_by_id(&mut conn, invoice_id).await?.is_none() {
            return Err(CoreError::InvoiceNotFound(invoice_id.to_string()).into());
        }

        Ok(payment_repo::list_for_invoice(&mut conn, invoice_id).await?)
    }

    async fn record_payment_tx(
        &self,
        invoice_id: &str,
        payment: NewPayment,
    ) -> LedgerResult<Staged<PaymentReceipt>> {
        let mut tx = self.db.begin_immediate().await?;
        let receipt = record_payment_in(&mut tx, invoice_id, &payment, Utc::now()).await?;
        Ok((tx, receipt))
    }

    async fn finalize_tx(
        &self,
        job_id: &str,
        discount: Money,
        payment: Option<NewPayment>,
    ) -> LedgerResult<Staged<FinalizedInvoice>> {
        let mut tx = self.db.begin_immediate().await?;
        let finalized = finalize_job_to_invoice_in(
            &mut tx,
            job_id,
            discount,
            payment.as_ref(),
            self.db.payment_terms_days(),
            Utc::now(),
        )
        .await?;
        Ok((tx, finalized))
    }
}

// =============================================================================
// Tests
// =============================================================================
