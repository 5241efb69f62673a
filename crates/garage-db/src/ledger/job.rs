//! # Job Engine
//!
//! Booking, editing, parts and deletion of workshop jobs, coordinated with
//! the job status machine and with invoice existence.
//!
//! ## Rules Enforced Here
//! - Status edits go through [`check_manual_transition`]; only the invoice
//!   engine moves a job to `Invoiced`.
//! - Fields and parts of an `Invoiced` or `Cancelled` job are frozen
//!   (`JobLocked`). Notes can always be appended.
//! - Attaching a part takes it out of stock in the same transaction.
//! - A job with an invoice is never deleted (`JobHasInvoice`). Deleting any
//!   other job returns its parts to stock.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::info;
use uuid::Uuid;

use crate::error::LedgerResult;
use crate::pool::{Database, Staged};
use crate::repository::{inventory as inventory_repo, invoice as invoice_repo, job as job_repo};
use garage_core::lifecycle::{check_editable, check_manual_transition};
use garage_core::validation::{
    validate_new_job, validate_note, validate_price_cents, validate_quantity, validate_required,
};
use garage_core::{CoreError, Job, JobDetails, JobPart, JobStatus, JobUpdate, NewJob};

/// Trims an optional text field; blank clears it.
fn normalize(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

// =============================================================================
// Transaction-Scoped Operations
// =============================================================================

/// Loads a job with its log, parts and invoice reference.
pub async fn get_job_in(conn: &mut SqliteConnection, id: &str) -> LedgerResult<JobDetails> {
    let job = job_repo::get_by_id(conn, id)
        .await?
        .ok_or_else(|| CoreError::JobNotFound(id.to_string()))?;

    let notes = job_repo::notes(conn, id).await?;
    let parts = job_repo::parts(conn, id).await?;
    let invoice_id = invoice_repo::get_by_job(conn, id).await?.map(|inv| inv.id);

    Ok(JobDetails {
        job,
        notes,
        parts,
        invoice_id,
    })
}

/// Applies a partial update inside the caller's transaction.
pub async fn update_job_in(
    conn: &mut SqliteConnection,
    id: &str,
    update: &JobUpdate,
    now: DateTime<Utc>,
) -> LedgerResult<JobDetails> {
    let mut job = job_repo::get_by_id(conn, id)
        .await?
        .ok_or_else(|| CoreError::JobNotFound(id.to_string()))?;

    if update.edits_fields() {
        check_editable(&job.id, job.status)?;
    }
    if let Some(note) = &update.note {
        validate_note(note)?;
    }

    if let Some(description) = &update.description {
        validate_required("description", description, 500)?;
        job.description = description.trim().to_string();
    }
    if let Some(vehicle_id) = &update.vehicle_id {
        job.vehicle_id = normalize(vehicle_id);
    }
    if let Some(registration) = &update.vehicle_registration {
        job.vehicle_registration = normalize(registration);
    }
    if let Some(part_description) = &update.part_description {
        job.part_description = normalize(part_description);
    }
    if let Some(price) = update.service_price {
        validate_price_cents("service_price", price.cents())?;
        job.service_price_cents = price.cents();
    }

    let previous = job.status;
    if let Some(to) = update.status {
        check_manual_transition(previous, to)?;
        job.status = to;
    }

    job.updated_at = now;
    job_repo::update(conn, &job).await?;

    if let Some(note) = &update.note {
        job_repo::insert_note(conn, &job.id, note, now).await?;
    }

    if previous != job.status {
        info!(
            job_id = %job.id,
            from = previous.as_str(),
            to = job.status.as_str(),
            "Job status changed"
        );
    }

    get_job_in(conn, id).await
}

/// Attaches a stocked part to a job, taking it out of stock.
pub async fn attach_part_in(
    conn: &mut SqliteConnection,
    job_id: &str,
    inventory_id: &str,
    quantity: i64,
    now: DateTime<Utc>,
) -> LedgerResult<JobPart> {
    validate_quantity(quantity)?;

    let job = job_repo::get_by_id(conn, job_id)
        .await?
        .ok_or_else(|| CoreError::JobNotFound(job_id.to_string()))?;
    check_editable(&job.id, job.status)?;

    let item = inventory_repo::take_stock(conn, inventory_id, quantity, now).await?;

    let part = JobPart {
        id: Uuid::new_v4().to_string(),
        job_id: job.id,
        inventory_id: item.id,
        name_snapshot: item.name,
        unit_price_cents: item.unit_price_cents,
        quantity,
        created_at: now,
    };
    job_repo::insert_part(conn, &part).await?;

    info!(
        job_id = %part.job_id,
        part = %part.name_snapshot,
        quantity,
        "Part attached to job"
    );
    Ok(part)
}

/// Deletes a job that was never invoiced, returning its parts to stock.
pub async fn delete_job_in(conn: &mut SqliteConnection, id: &str, now: DateTime<Utc>) -> LedgerResult<()> {
    let job = job_repo::get_by_id(conn, id)
        .await?
        .ok_or_else(|| CoreError::JobNotFound(id.to_string()))?;

    let invoiced = invoice_repo::get_by_job(conn, id).await?.is_some();
    if invoiced || job.status == JobStatus::Invoiced {
        return Err(CoreError::JobHasInvoice(id.to_string()).into());
    }

    let parts = job_repo::parts(conn, id).await?;
    for part in &parts {
        if !inventory_repo::apply_delta(conn, &part.inventory_id, part.quantity, now).await? {
            return Err(CoreError::ItemNotFound(part.inventory_id.clone()).into());
        }
    }

    job_repo::delete(conn, id).await?;

    info!(job_id = %id, restocked_lines = parts.len(), "Job deleted");
    Ok(())
}

// =============================================================================
// Engine
// =============================================================================

/// Job operations that own their transaction.
///
/// ## Usage
/// ```rust,ignore
/// let job = db.jobs().create_job(new_job).await?;
/// db.jobs().attach_part(&job.id, &pads.id, 2).await?;
/// db.jobs().update_job(&job.id, JobUpdate {
///     status: Some(JobStatus::Completed),
///     note: Some("Pads replaced, test drive OK".into()),
///     ..Default::default()
/// }).await?;
/// ```
#[derive(Debug, Clone)]
pub struct JobEngine {
    db: Database,
}

impl JobEngine {
    /// Creates a new JobEngine.
    pub fn new(db: Database) -> Self {
        JobEngine { db }
    }

    /// Books a new job in `Booked` status.
    pub async fn create_job(&self, input: NewJob) -> LedgerResult<Job> {
        validate_new_job(&input)?;
        let job = self.db.with_timeout("create_job", self.create_job_tx(input)).await?;

        info!(job_id = %job.id, job_type = ?job.job_type, "Job booked");
        Ok(job)
    }

    /// Loads a job with notes, parts and invoice reference.
    pub async fn get_job(&self, id: &str) -> LedgerResult<JobDetails> {
        let mut conn = self.db.acquire().await?;
        get_job_in(&mut conn, id).await
    }

    /// Lists jobs, newest first, optionally by status.
    pub async fn list_jobs(&self, status: Option<JobStatus>) -> LedgerResult<Vec<Job>> {
        let mut conn = self.db.acquire().await?;
        Ok(job_repo::list(&mut conn, status).await?)
    }

    /// Edits fields, moves status and/or appends a note.
    pub async fn update_job(&self, id: &str, update: JobUpdate) -> LedgerResult<JobDetails> {
        self.db
            .with_timeout("update_job", self.update_job_tx(id, update))
            .await
    }

    /// Attaches `quantity` units of an inventory item to a job.
    pub async fn attach_part(&self, job_id: &str, inventory_id: &str, quantity: i64) -> LedgerResult<JobPart> {
        self.db
            .with_timeout("attach_part", self.attach_part_tx(job_id, inventory_id, quantity))
            .await
    }

    /// Deletes a job that has no invoice.
    pub async fn delete_job(&self, id: &str) -> LedgerResult<()> {
        self.db.with_timeout("delete_job", self.delete_job_tx(id)).await
    }

    async fn create_job_tx(&self, input: NewJob) -> LedgerResult<Staged<Job>> {
        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4().to_string(),
            customer_id: input.customer_id.trim().to_string(),
            description: input.description.trim().to_string(),
            job_type: input.job_type,
            status: JobStatus::Booked,
            vehicle_id: input.vehicle_id.as_deref().and_then(normalize),
            vehicle_registration: input.vehicle_registration.as_deref().and_then(normalize),
            part_description: input.part_description.as_deref().and_then(normalize),
            service_price_cents: input.service_price.cents(),
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.db.begin_immediate().await?;
        job_repo::insert(&mut tx, &job).await?;
        Ok((tx, job))
    }

    async fn update_job_tx(&self, id: &str, update: JobUpdate) -> LedgerResult<Staged<JobDetails>> {
        let mut tx = self.db.begin_immediate().await?;
        let details = update_job_in(&mut tx, id, &update, Utc::now()).await?;
        Ok((tx, details))
    }

    async fn attach_part_tx(
        &self,
        job_id: &str,
        inventory_id: &str,
        quantity: i64,
    ) -> LedgerResult<Staged<JobPart>> {
        let mut tx = self.db.begin_immediate().await?;
        let part = attach_part_in(&mut tx, job_id, inventory_id, quantity, Utc::now()).await?;
        Ok((tx, part))
    }

    async fn delete_job_tx(&self, id: &str) -> LedgerResult<Staged<()>> {
        let mut tx = self.db.begin_immediate().await?;
        delete_job_in(&mut tx, id, Utc::now()).await?;
        Ok((tx, ()))
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
    use garage_core::{JobType, Money, NewInventoryItem};

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn service(description: &str) -> NewJob {
        NewJob {
            customer_id: "cust-7".to_string(),
            description: description.to_string(),
            job_type: JobType::Vehicle,
            vehicle_id: Some("veh-7".to_string()),
            vehicle_registration: Some("  ".to_string()),
            part_description: None,
            service_price: Money::from_cents(45_000),
        }
    }

    async fn item(db: &Database, qty: i64) -> String {
        db.inventory()
            .create_item(NewInventoryItem {
                name: "Timing belt".to_string(),
                quantity: qty,
                unit_price: Money::from_cents(60_000),
            })
            .await
            .unwrap()
            .id
    }

    fn status(to: JobStatus) -> JobUpdate {
        JobUpdate {
            status: Some(to),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let db = setup().await;
        let job = db.jobs().create_job(service("Major service")).await.unwrap();
        assert_eq!(job.status, JobStatus::Booked);
        assert_eq!(job.vehicle_registration, None);

        db.jobs().create_job(service("Wheel alignment")).await.unwrap();
        db.jobs()
            .update_job(&job.id, status(JobStatus::InProgress))
            .await
            .unwrap();

        assert_eq!(db.jobs().list_jobs(None).await.unwrap().len(), 2);
        let in_progress = db.jobs().list_jobs(Some(JobStatus::InProgress)).await.unwrap();
        assert_eq!(in_progress.len(), 1);
        assert_eq!(in_progress[0].id, job.id);
    }

    #[tokio::test]
    async fn test_blank_description_rejected() {
        let db = setup().await;
        let err = db.jobs().create_job(service("   ")).await.unwrap_err();
        assert!(matches!(err, LedgerError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_manual_invoiced_rejected() {
        let db = setup().await;
        let job = db.jobs().create_job(service("Major service")).await.unwrap();

        let err = db
            .jobs()
            .update_job(&job.id, status(JobStatus::Invoiced))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Domain(CoreError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_cancelled_is_terminal() {
        let db = setup().await;
        let job = db.jobs().create_job(service("Major service")).await.unwrap();
        db.jobs()
            .update_job(&job.id, status(JobStatus::Cancelled))
            .await
            .unwrap();

        let err = db
            .jobs()
            .update_job(&job.id, status(JobStatus::Booked))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Domain(CoreError::InvalidTransition { .. })));

        // The log stays open
        let details = db
            .jobs()
            .update_job(
                &job.id,
                JobUpdate {
                    note: Some("Customer declined quote".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(details.notes.len(), 1);
    }

    #[tokio::test]
    async fn test_invoiced_job_fields_locked() {
        let db = setup().await;
        let job = db.jobs().create_job(service("Major service")).await.unwrap();
        db.invoices().create_invoice(&job.id, Money::zero()).await.unwrap();

        let err = db
            .jobs()
            .update_job(
                &job.id,
                JobUpdate {
                    service_price: Some(Money::from_cents(1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Domain(CoreError::JobLocked { .. })));

        let err = db
            .jobs()
            .update_job(&job.id, status(JobStatus::Completed))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Domain(CoreError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_notes_in_insertion_order() {
        let db = setup().await;
        let job = db.jobs().create_job(service("Major service")).await.unwrap();

        for note in ["Car received", "Waiting on parts", "Parts fitted"] {
            db.jobs()
                .update_job(
                    &job.id,
                    JobUpdate {
                        note: Some(note.to_string()),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }

        let details = db.jobs().get_job(&job.id).await.unwrap();
        let notes: Vec<&str> = details.notes.iter().map(|n| n.note.as_str()).collect();
        assert_eq!(notes, vec!["Car received", "Waiting on parts", "Parts fitted"]);
    }

    #[tokio::test]
    async fn test_attach_part_takes_stock() {
        let db = setup().await;
        let job = db.jobs().create_job(service("Timing belt")).await.unwrap();
        let belt = item(&db, 1).await;

        let part = db.jobs().attach_part(&job.id, &belt, 1).await.unwrap();
        assert_eq!(part.name_snapshot, "Timing belt");
        assert_eq!(part.unit_price_cents, 60_000);
        assert_eq!(db.inventory().get_item(&belt).await.unwrap().quantity, 0);

        let err = db.jobs().attach_part(&job.id, &belt, 1).await.unwrap_err();
        assert!(matches!(err, LedgerError::Domain(CoreError::InsufficientStock { .. })));

        // Snapshot survives a later price change
        db.inventory()
            .update_price(&belt, Money::from_cents(65_000))
            .await
            .unwrap();
        let details = db.jobs().get_job(&job.id).await.unwrap();
        assert_eq!(details.parts[0].unit_price_cents, 60_000);
    }

    #[tokio::test]
    async fn test_delete_restocks_parts() {
        let db = setup().await;
        let job = db.jobs().create_job(service("Timing belt")).await.unwrap();
        let belt = item(&db, 3).await;
        db.jobs().attach_part(&job.id, &belt, 2).await.unwrap();

        db.jobs().delete_job(&job.id).await.unwrap();

        assert_eq!(db.inventory().get_item(&belt).await.unwrap().quantity, 3);
        let err = db.jobs().get_job(&job.id).await.unwrap_err();
        assert!(matches!(err, LedgerError::Domain(CoreError::JobNotFound(_))));
    }

    #[tokio::test]
    async fn test_invoiced_job_cannot_be_deleted() {
        let db = setup().await;
        let job = db.jobs().create_job(service("Major service")).await.unwrap();
        db.invoices().create_invoice(&job.id, Money::zero()).await.unwrap();

        let err = db.jobs().delete_job(&job.id).await.unwrap_err();
        assert!(matches!(err, LedgerError::Domain(CoreError::JobHasInvoice(_))));
        assert!(db.jobs().get_job(&job.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_with_missing_stock_row_rolls_back() {
        let db = setup().await;
        let job = db.jobs().create_job(service("Timing belt")).await.unwrap();
        let belt = item(&db, 3).await;
        db.jobs().attach_part(&job.id, &belt, 2).await.unwrap();

        // Only reachable with foreign keys off, e.g. after a manual repair
        sqlx::query("PRAGMA foreign_keys = OFF")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("DELETE FROM inventory_items WHERE id = ?1")
            .bind(&belt)
            .execute(db.pool())
            .await
            .unwrap();

        let err = db.jobs().delete_job(&job.id).await.unwrap_err();
        assert!(matches!(err, LedgerError::Domain(CoreError::ItemNotFound(ref id)) if *id == belt));

        let details = db.jobs().get_job(&job.id).await.unwrap();
        assert_eq!(details.parts.len(), 1);
    }
}
