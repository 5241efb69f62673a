//! # Job Repository
//!
//! SQL for jobs, the append-only job log and the parts attached to a job.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use garage_core::{Job, JobNote, JobPart, JobStatus};

const JOB_COLUMNS: &str = r#"
    id, customer_id, description, job_type, status,
    vehicle_id, vehicle_registration, part_description,
    service_price_cents, created_at, updated_at
"#;

// =============================================================================
// Jobs
// =============================================================================

/// Inserts a job row.
pub async fn insert(conn: &mut SqliteConnection, job: &Job) -> DbResult<()> {
    debug!(id = %job.id, job_type = ?job.job_type, "Inserting job");

    sqlx::query(
        r#"
        INSERT INTO jobs (
            id, customer_id, description, job_type, status,
            vehicle_id, vehicle_registration, part_description,
            service_price_cents, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&job.id)
    .bind(&job.customer_id)
    .bind(&job.description)
    .bind(job.job_type)
    .bind(job.status)
    .bind(&job.vehicle_id)
    .bind(&job.vehicle_registration)
    .bind(&job.part_description)
    .bind(job.service_price_cents)
    .bind(job.created_at)
    .bind(job.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Gets a job by ID.
pub async fn get_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Job>> {
    let sql = format!("SELECT {} FROM jobs WHERE id = ?1", JOB_COLUMNS);

    let job = sqlx::query_as::<_, Job>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(job)
}

/// Lists jobs, newest first, optionally filtered by status.
pub async fn list(conn: &mut SqliteConnection, status: Option<JobStatus>) -> DbResult<Vec<Job>> {
    let jobs = match status {
        Some(status) => {
            let sql = format!(
                "SELECT {} FROM jobs WHERE status = ?1 ORDER BY created_at DESC, rowid DESC",
                JOB_COLUMNS
            );
            sqlx::query_as::<_, Job>(&sql)
                .bind(status)
                .fetch_all(&mut *conn)
                .await?
        }
        None => {
            let sql = format!(
                "SELECT {} FROM jobs ORDER BY created_at DESC, rowid DESC",
                JOB_COLUMNS
            );
            sqlx::query_as::<_, Job>(&sql).fetch_all(&mut *conn).await?
        }
    };

    Ok(jobs)
}

/// Writes back every mutable column of a job.
pub async fn update(conn: &mut SqliteConnection, job: &Job) -> DbResult<()> {
    debug!(id = %job.id, status = job.status.as_str(), "Updating job");

    let result = sqlx::query(
        r#"
        UPDATE jobs SET
            description = ?2,
            status = ?3,
            vehicle_id = ?4,
            vehicle_registration = ?5,
            part_description = ?6,
            service_price_cents = ?7,
            updated_at = ?8
        WHERE id = ?1
        "#,
    )
    .bind(&job.id)
    .bind(&job.description)
    .bind(job.status)
    .bind(&job.vehicle_id)
    .bind(&job.vehicle_registration)
    .bind(&job.part_description)
    .bind(job.service_price_cents)
    .bind(job.updated_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Job", &job.id));
    }

    Ok(())
}

/// Moves a job to `Invoiced`.
///
/// Guarded on the current status so a job already invoiced or cancelled is
/// never overwritten. Returns whether a row changed.
pub async fn mark_invoiced(
    conn: &mut SqliteConnection,
    id: &str,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE jobs SET status = 'invoiced', updated_at = ?2
        WHERE id = ?1 AND status IN ('booked', 'in_progress', 'completed')
        "#,
    )
    .bind(id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Deletes a job. Notes and parts cascade; an invoice blocks the delete.
pub async fn delete(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    debug!(id = %id, "Deleting job");

    let result = sqlx::query("DELETE FROM jobs WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Job", id));
    }

    Ok(())
}

// =============================================================================
// Notes
// =============================================================================

/// Appends a note to a job's log.
pub async fn insert_note(
    conn: &mut SqliteConnection,
    job_id: &str,
    note: &str,
    now: DateTime<Utc>,
) -> DbResult<JobNote> {
    let entry = JobNote {
        id: Uuid::new_v4().to_string(),
        job_id: job_id.to_string(),
        note: note.trim().to_string(),
        created_at: now,
    };

    sqlx::query("INSERT INTO job_notes (id, job_id, note, created_at) VALUES (?1, ?2, ?3, ?4)")
        .bind(&entry.id)
        .bind(&entry.job_id)
        .bind(&entry.note)
        .bind(entry.created_at)
        .execute(&mut *conn)
        .await?;

    Ok(entry)
}

/// Job log in insertion order.
pub async fn notes(conn: &mut SqliteConnection, job_id: &str) -> DbResult<Vec<JobNote>> {
    let notes = sqlx::query_as::<_, JobNote>(
        "SELECT id, job_id, note, created_at FROM job_notes WHERE job_id = ?1 ORDER BY rowid",
    )
    .bind(job_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(notes)
}

// =============================================================================
// Parts
// =============================================================================

/// Records a part consumed by a job.
///
/// ## Snapshot Pattern
/// Name and unit price are copied from the inventory item, so later price
/// edits never change what the job (and its invoice) bills.
pub async fn insert_part(conn: &mut SqliteConnection, part: &JobPart) -> DbResult<()> {
    debug!(job_id = %part.job_id, inventory_id = %part.inventory_id, qty = part.quantity, "Attaching part");

    sqlx::query(
        r#"
        INSERT INTO job_parts (
            id, job_id, inventory_id, name_snapshot,
            unit_price_cents, quantity, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&part.id)
    .bind(&part.job_id)
    .bind(&part.inventory_id)
    .bind(&part.name_snapshot)
    .bind(part.unit_price_cents)
    .bind(part.quantity)
    .bind(part.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Parts attached to a job, in attach order.
pub async fn parts(conn: &mut SqliteConnection, job_id: &str) -> DbResult<Vec<JobPart>> {
    let parts = sqlx::query_as::<_, JobPart>(
        r#"
        SELECT id, job_id, inventory_id, name_snapshot, unit_price_cents, quantity, created_at
        FROM job_parts
        WHERE job_id = ?1
        ORDER BY rowid
        "#,
    )
    .bind(job_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(parts)
}
