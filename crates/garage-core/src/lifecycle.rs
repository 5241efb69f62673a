//! # Job Lifecycle
//!
//! The job status machine.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Booked ◄──► InProgress ◄──► Completed ──(invoice engine)──► Invoiced │
//! │     │              │              │                                     │
//! │     └──────────────┴──────────────┴──────────► Cancelled               │
//! │                                                                         │
//! │  Manual edits move freely among the three open states and may cancel.  │
//! │  Invoiced is entered only by invoice creation and never left.          │
//! │  Cancelled is terminal.                                                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Invoice payment state is tracked on the invoice; a job stays `Invoiced`
//! whatever happens to the money.

use crate::error::{CoreError, CoreResult};
use crate::types::JobStatus;

/// Whether no further manual transitions are possible from `status`.
pub fn is_terminal(status: JobStatus) -> bool {
    matches!(status, JobStatus::Invoiced | JobStatus::Cancelled)
}

/// Validates a manual status edit made through the job-update path.
///
/// Setting the current status again is a no-op and always allowed.
pub fn check_manual_transition(from: JobStatus, to: JobStatus) -> CoreResult<()> {
    if from == to {
        return Ok(());
    }

    let allowed = match (from, to) {
        // Only the invoice engine may invoice a job
        (_, JobStatus::Invoiced) => false,
        (JobStatus::Invoiced, _) | (JobStatus::Cancelled, _) => false,
        (
            JobStatus::Booked | JobStatus::InProgress | JobStatus::Completed,
            JobStatus::Booked | JobStatus::InProgress | JobStatus::Completed | JobStatus::Cancelled,
        ) => true,
    };

    if allowed {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        })
    }
}

/// Validates that a job in `status` can be invoiced.
pub fn check_invoiceable(status: JobStatus) -> CoreResult<()> {
    match status {
        JobStatus::Booked | JobStatus::InProgress | JobStatus::Completed => Ok(()),
        JobStatus::Invoiced | JobStatus::Cancelled => Err(CoreError::InvalidTransition {
            from: status.as_str().to_string(),
            to: JobStatus::Invoiced.as_str().to_string(),
        }),
    }
}

/// Validates that billable details (fields, parts) of a job may still change.
pub fn check_editable(job_id: &str, status: JobStatus) -> CoreResult<()> {
    if is_terminal(status) {
        return Err(CoreError::JobLocked {
            job_id: job_id.to_string(),
            status: status.as_str().to_string(),
        });
    }
    Ok(())
}
