//! # Payment Repository
//!
//! The append-only payment ledger. There is no update or delete here:
//! corrections are recorded as `Return` entries.
//!
//! ## Aggregate
//! ```text
//! amount_paid = SUM(CASE WHEN payment_type = 'return'
//!                        THEN -amount_cents
//!                        ELSE  amount_cents END)
//! ```
//! Read on the same connection as the insert, so inside a transaction it
//! always includes the entry just written.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use garage_core::{Money, Payment};

/// Ledger aggregate for one invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerTotals {
    pub amount_paid: Money,
    pub has_returns: bool,
}

/// Appends a payment entry.
pub async fn insert(conn: &mut SqliteConnection, payment: &Payment) -> DbResult<()> {
    debug!(
        invoice_id = %payment.invoice_id,
        amount = payment.amount_cents,
        payment_type = ?payment.payment_type,
        "Recording payment"
    );

    sqlx::query(
        r#"
        INSERT INTO payments (
            id, invoice_id, amount_cents, method, payment_type, note, payment_date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.invoice_id)
    .bind(payment.amount_cents)
    .bind(payment.method)
    .bind(payment.payment_type)
    .bind(&payment.note)
    .bind(payment.payment_date)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Payment entries of an invoice in the order they were recorded.
pub async fn list_for_invoice(conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<Vec<Payment>> {
    let payments = sqlx::query_as::<_, Payment>(
        r#"
        SELECT id, invoice_id, amount_cents, method, payment_type, note, payment_date
        FROM payments
        WHERE invoice_id = ?1
        ORDER BY rowid
        "#,
    )
    .bind(invoice_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(payments)
}

/// Recomputes paid-to-date from the ledger.
pub async fn totals(conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<LedgerTotals> {
    let (amount_paid, returns): (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COALESCE(SUM(CASE WHEN payment_type = 'return'
                              THEN -amount_cents ELSE amount_cents END), 0),
            COALESCE(SUM(CASE WHEN payment_type = 'return' THEN 1 ELSE 0 END), 0)
        FROM payments
        WHERE invoice_id = ?1
        "#,
    )
    .bind(invoice_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(LedgerTotals {
        amount_paid: Money::from_cents(amount_paid),
        has_returns: returns > 0,
    })
}
