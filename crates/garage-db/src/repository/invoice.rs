//! # Invoice Repository
//!
//! SQL for invoices and their frozen line items.
//!
//! Invoice rows are written once, at creation. Afterwards only `status`
//! changes, and only as a value derived from the payment ledger.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use garage_core::{Invoice, InvoiceItem, InvoiceStatus};

const INVOICE_COLUMNS: &str =
    "id, job_id, total_cents, discount_cents, status, date_created, due_date";

/// Invoice row joined with its ledger aggregate.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InvoiceWithTotals {
    #[sqlx(flatten)]
    pub invoice: Invoice,
    pub amount_paid_cents: i64,
    pub return_count: i64,
}

/// Inserts an invoice row.
pub async fn insert(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
    debug!(id = %invoice.id, job_id = %invoice.job_id, total = invoice.total_cents, "Inserting invoice");

    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, job_id, total_cents, discount_cents, status, date_created, due_date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&invoice.id)
    .bind(&invoice.job_id)
    .bind(invoice.total_cents)
    .bind(invoice.discount_cents)
    .bind(invoice.status)
    .bind(invoice.date_created)
    .bind(invoice.due_date)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Inserts a frozen invoice line.
pub async fn insert_item(conn: &mut SqliteConnection, item: &InvoiceItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO invoice_items (
            id, invoice_id, kind, description, unit_price_cents, quantity, line_total_cents
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&item.id)
    .bind(&item.invoice_id)
    .bind(item.kind)
    .bind(&item.description)
    .bind(item.unit_price_cents)
    .bind(item.quantity)
    .bind(item.line_total_cents)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Gets an invoice by ID.
pub async fn get_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Invoice>> {
    let sql = format!("SELECT {} FROM invoices WHERE id = ?1", INVOICE_COLUMNS);

    let invoice = sqlx::query_as::<_, Invoice>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(invoice)
}

/// Gets the invoice raised against a job, if any.
pub async fn get_by_job(conn: &mut SqliteConnection, job_id: &str) -> DbResult<Option<Invoice>> {
    let sql = format!("SELECT {} FROM invoices WHERE job_id = ?1", INVOICE_COLUMNS);

    let invoice = sqlx::query_as::<_, Invoice>(&sql)
        .bind(job_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(invoice)
}

/// Line items of an invoice in creation order.
pub async fn items(conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<Vec<InvoiceItem>> {
    let items = sqlx::query_as::<_, InvoiceItem>(
        r#"
        SELECT id, invoice_id, kind, description, unit_price_cents, quantity, line_total_cents
        FROM invoice_items
        WHERE invoice_id = ?1
        ORDER BY rowid
        "#,
    )
    .bind(invoice_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

/// All invoices, newest first, with their ledger aggregates.
pub async fn list_with_totals(conn: &mut SqliteConnection) -> DbResult<Vec<InvoiceWithTotals>> {
    let rows = sqlx::query_as::<_, InvoiceWithTotals>(
        r#"
        SELECT
            i.id, i.job_id, i.total_cents, i.discount_cents, i.status,
            i.date_created, i.due_date,
            COALESCE(SUM(CASE WHEN p.payment_type = 'return'
                              THEN -p.amount_cents ELSE p.amount_cents END), 0) AS amount_paid_cents,
            COALESCE(SUM(CASE WHEN p.payment_type = 'return' THEN 1 ELSE 0 END), 0) AS return_count
        FROM invoices i
        LEFT JOIN payments p ON p.invoice_id = i.id
        GROUP BY i.id
        ORDER BY i.date_created DESC, i.rowid DESC
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

/// Invoices still expecting money and not yet flagged overdue.
pub async fn list_unsettled(conn: &mut SqliteConnection) -> DbResult<Vec<Invoice>> {
    let sql = format!(
        "SELECT {} FROM invoices WHERE status IN ('unpaid', 'partially_paid') ORDER BY due_date",
        INVOICE_COLUMNS
    );

    let invoices = sqlx::query_as::<_, Invoice>(&sql)
        .fetch_all(&mut *conn)
        .await?;

    Ok(invoices)
}

/// Persists a derived status.
pub async fn set_status(conn: &mut SqliteConnection, id: &str, status: InvoiceStatus) -> DbResult<()> {
    debug!(id = %id, status = status.as_str(), "Persisting invoice status");

    let result = sqlx::query("UPDATE invoices SET status = ?2 WHERE id = ?1")
        .bind(id)
        .bind(status)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Invoice", id));
    }

    Ok(())
}
