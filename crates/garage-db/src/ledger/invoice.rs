//! # Invoice Engine
//!
//! Raises invoices from jobs and reads them back with fresh aggregates.
//!
//! ## Invoice Creation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    create_invoice(job_id, discount)                     │
//! │                                                                         │
//! │  1. Load job                       → JobNotFound                        │
//! │  2. Invoice exists for job?        → AlreadyInvoiced                    │
//! │  3. Job cancelled / invoiced?      → InvalidTransition                  │
//! │  4. Lines = service price + parts (snapshots), total = Σ lines         │
//! │  5. 0 <= discount <= total?        → InvalidDiscount                    │
//! │  6. INSERT invoice + invoice_items, due = now + payment terms          │
//! │  7. Job → Invoiced                                                     │
//! │                                                                         │
//! │  One transaction. Any error leaves no invoice and the job untouched.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::LedgerResult;
use crate::pool::{Database, Staged};
use crate::repository::payment::LedgerTotals;
use crate::repository::{invoice as invoice_repo, job as job_repo, payment as payment_repo};
use garage_core::ledger::{self, derive_status, StatusContext};
use garage_core::lifecycle::check_invoiceable;
use garage_core::{
    CoreError, Invoice, InvoiceDetails, InvoiceItem, InvoiceStatus, InvoiceSummary, LineKind, Money,
    PaymentType,
};

// =============================================================================
// Transaction-Scoped Operations
// =============================================================================

/// Creates the invoice for a job inside the caller's transaction.
pub async fn create_invoice_in(
    conn: &mut SqliteConnection,
    job_id: &str,
    discount: Money,
    payment_terms_days: i64,
    now: DateTime<Utc>,
) -> LedgerResult<Invoice> {
    let job = job_repo::get_by_id(conn, job_id)
        .await?
        .ok_or_else(|| CoreError::JobNotFound(job_id.to_string()))?;

    if let Some(existing) = invoice_repo::get_by_job(conn, job_id).await? {
        return Err(CoreError::AlreadyInvoiced {
            job_id: job_id.to_string(),
            invoice_id: existing.id,
        }
        .into());
    }

    check_invoiceable(job.status)?;

    let invoice_id = Uuid::new_v4().to_string();
    let parts = job_repo::parts(conn, job_id).await?;

    let mut items = Vec::with_capacity(parts.len() + 1);
    if job.service_price().is_positive() {
        items.push(InvoiceItem {
            id: Uuid::new_v4().to_string(),
            invoice_id: invoice_id.clone(),
            kind: LineKind::Service,
            description: job.description.clone(),
            unit_price_cents: job.service_price_cents,
            quantity: 1,
            line_total_cents: job.service_price_cents,
        });
    }
    for part in &parts {
        let line_total = ledger::line_total([(part.unit_price(), part.quantity)])?;
        items.push(InvoiceItem {
            id: Uuid::new_v4().to_string(),
            invoice_id: invoice_id.clone(),
            kind: LineKind::Part,
            description: part.name_snapshot.clone(),
            unit_price_cents: part.unit_price_cents,
            quantity: part.quantity,
            line_total_cents: line_total.cents(),
        });
    }

    let total = ledger::line_total(
        items
            .iter()
            .map(|item| (Money::from_cents(item.unit_price_cents), item.quantity)),
    )?;
    ledger::validate_discount(discount, total)?;

    let invoice = Invoice {
        id: invoice_id,
        job_id: job_id.to_string(),
        total_cents: total.cents(),
        discount_cents: discount.cents(),
        status: derive_status(total - discount, Money::zero(), StatusContext::default()),
        date_created: now,
        due_date: now + Duration::days(payment_terms_days),
    };

    invoice_repo::insert(conn, &invoice).await?;
    for item in &items {
        invoice_repo::insert_item(conn, item).await?;
    }

    if !job_repo::mark_invoiced(conn, job_id, now).await? {
        return Err(CoreError::InvalidTransition {
            from: job.status.as_str().to_string(),
            to: "invoiced".to_string(),
        }
        .into());
    }

    info!(
        invoice_id = %invoice.id,
        job_id = %job_id,
        total = %total,
        discount = %discount,
        lines = items.len(),
        "Invoice created"
    );

    Ok(invoice)
}

/// Recomputes the ledger aggregate, derives the status and persists it if it
/// changed. Returns the aggregate and the current status.
pub(crate) async fn settle_in(
    conn: &mut SqliteConnection,
    invoice: &Invoice,
    now: DateTime<Utc>,
) -> LedgerResult<(LedgerTotals, InvoiceStatus)> {
    let totals = payment_repo::totals(conn, &invoice.id).await?;
    let status = derive_status(
        invoice.billable(),
        totals.amount_paid,
        StatusContext {
            has_returns: totals.has_returns,
            past_due: invoice.is_past_due(now),
        },
    );

    if status != invoice.status {
        invoice_repo::set_status(conn, &invoice.id, status).await?;
        debug!(
            invoice_id = %invoice.id,
            from = invoice.status.as_str(),
            to = status.as_str(),
            "Invoice status changed"
        );
    }

    Ok((totals, status))
}

/// Reads an invoice with its lines, payments and fresh aggregates.
pub async fn get_invoice_in(
    conn: &mut SqliteConnection,
    id: &str,
    now: DateTime<Utc>,
) -> LedgerResult<InvoiceDetails> {
    let mut invoice = invoice_repo::get_by_id(conn, id)
        .await?
        .ok_or_else(|| CoreError::InvoiceNotFound(id.to_string()))?;

    let items = invoice_repo::items(conn, id).await?;
    let payments = payment_repo::list_for_invoice(conn, id).await?;

    let amount_paid = ledger::amount_paid(&payments);
    let derived = derive_status(
        invoice.billable(),
        amount_paid,
        StatusContext {
            has_returns: payments.iter().any(|p| p.payment_type == PaymentType::Return),
            past_due: invoice.is_past_due(now),
        },
    );

    if derived != invoice.status {
        // Overdue is persisted by the sweep; anything else is drift
        if derived == InvoiceStatus::Overdue {
            debug!(invoice_id = %id, "Invoice past due, awaiting overdue sweep");
        } else {
            warn!(
                invoice_id = %id,
                stored = invoice.status.as_str(),
                derived = derived.as_str(),
                "Stored invoice status disagrees with payment ledger"
            );
        }
        invoice.status = derived;
    }

    let balance = invoice.billable() - amount_paid;
    Ok(InvoiceDetails {
        invoice,
        items,
        payments,
        amount_paid_cents: amount_paid.cents(),
        balance_cents: balance.cents(),
    })
}

/// Lists invoices with aggregates and freshly derived statuses.
pub async fn list_invoices_in(
    conn: &mut SqliteConnection,
    now: DateTime<Utc>,
) -> LedgerResult<Vec<InvoiceSummary>> {
    let rows = invoice_repo::list_with_totals(conn).await?;

    let summaries = rows
        .into_iter()
        .map(|row| {
            let mut invoice = row.invoice;
            let amount_paid = Money::from_cents(row.amount_paid_cents);
            invoice.status = derive_status(
                invoice.billable(),
                amount_paid,
                StatusContext {
                    has_returns: row.return_count > 0,
                    past_due: invoice.is_past_due(now),
                },
            );
            let balance = invoice.billable() - amount_paid;
            InvoiceSummary {
                invoice,
                amount_paid_cents: amount_paid.cents(),
                balance_cents: balance.cents(),
            }
        })
        .collect();

    Ok(summaries)
}

/// Persists `Overdue` on every unsettled invoice past its due date.
///
/// Returns how many invoices were flagged.
pub async fn refresh_overdue_in(conn: &mut SqliteConnection, now: DateTime<Utc>) -> LedgerResult<usize> {
    let candidates = invoice_repo::list_unsettled(conn).await?;

    let mut flagged = 0;
    for invoice in candidates.iter().filter(|inv| inv.is_past_due(now)) {
        let (_, status) = settle_in(conn, invoice, now).await?;
        if status == InvoiceStatus::Overdue {
            flagged += 1;
        }
    }

    Ok(flagged)
}

// =============================================================================
// Engine
// =============================================================================

/// Invoice operations that own their transaction.
///
/// ## Usage
/// ```rust,ignore
/// let invoice = db.invoices().create_invoice(&job.id, Money::from_cents(1_000)).await?;
/// let details = db.invoices().get_invoice(&invoice.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct InvoiceEngine {
    db: Database,
}

impl InvoiceEngine {
    /// Creates a new InvoiceEngine.
    pub fn new(db: Database) -> Self {
        InvoiceEngine { db }
    }

    /// Raises the invoice for a job and moves the job to `Invoiced`.
    pub async fn create_invoice(&self, job_id: &str, discount: Money) -> LedgerResult<Invoice> {
        self.db
            .with_timeout("create_invoice", self.create_invoice_tx(job_id, discount))
            .await
    }

    /// Reads an invoice with fresh aggregates.
    pub async fn get_invoice(&self, id: &str) -> LedgerResult<InvoiceDetails> {
        let mut conn = self.db.acquire().await?;
        get_invoice_in(&mut conn, id, Utc::now()).await
    }

    /// Lists all invoices, newest first.
    pub async fn list_invoices(&self) -> LedgerResult<Vec<InvoiceSummary>> {
        let mut conn = self.db.acquire().await?;
        list_invoices_in(&mut conn, Utc::now()).await
    }

    /// Flags unsettled invoices whose due date has passed at `now`.
    pub async fn refresh_overdue(&self, now: DateTime<Utc>) -> LedgerResult<usize> {
        let flagged = self
            .db
            .with_timeout("refresh_overdue", self.refresh_overdue_tx(now))
            .await?;

        if flagged > 0 {
            info!(flagged, "Invoices flagged overdue");
        }
        Ok(flagged)
    }

    async fn create_invoice_tx(&self, job_id: &str, discount: Money) -> LedgerResult<Staged<Invoice>> {
        let mut tx = self.db.begin_immediate().await?;
        let invoice =
            create_invoice_in(&mut tx, job_id, discount, self.db.payment_terms_days(), Utc::now()).await?;
        Ok((tx, invoice))
    }

    async fn refresh_overdue_tx(&self, now: DateTime<Utc>) -> LedgerResult<Staged<usize>> {
        let mut tx = self.db.begin_immediate().await?;
        let flagged = refresh_overdue_in(&mut tx, now).await?;
        Ok((tx, flagged))
    }
}

// =============================================================================
// Tests
// =============================================================================
