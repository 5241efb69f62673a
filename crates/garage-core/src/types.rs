//! # Domain Types
//!
//! Core domain types used throughout Garage Ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Job        │   │    Invoice      │   │    Payment      │       │
//! │  │  ─────────────  │1:1│  ─────────────  │1:N│  ─────────────  │       │
//! │  │  id (UUID)      │──►│  job_id (UNIQUE)│──►│  invoice_id     │       │
//! │  │  status         │   │  total_cents    │   │  amount_cents   │       │
//! │  │  service_price  │   │  discount_cents │   │  method, type   │       │
//! │  └───────┬─────────┘   └───────┬─────────┘   └─────────────────┘       │
//! │          │ 1:N                 │ 1:N                                    │
//! │  ┌───────▼─────────┐   ┌───────▼─────────┐   ┌─────────────────┐       │
//! │  │ JobPart/JobNote │   │  InvoiceItem    │   │ InventoryItem   │       │
//! │  │ (snapshots/log) │   │  (frozen lines) │   │ quantity >= 0   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Amount Paid Is Not Here
//! `Invoice` deliberately has no `amount_paid` field. Paid-to-date is always
//! the aggregate of the payment ledger, see [`crate::ledger`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Job
// =============================================================================

/// What a job is about: workshop work on a vehicle, or a parts-only job
/// (including point-of-sale baskets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Vehicle,
    Part,
}

/// Job lifecycle state. See [`crate::lifecycle`] for the allowed moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Booked,
    InProgress,
    Completed,
    Invoiced,
    Cancelled,
}

impl JobStatus {
    /// Stable storage/query representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Booked => "booked",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Invoiced => "invoiced",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Booked
    }
}

/// A workshop job, or the job record that represents a direct sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Job {
    pub id: String,
    /// Opaque reference to the customer record owned by the CRUD layer.
    pub customer_id: String,
    pub description: String,
    pub job_type: JobType,
    pub status: JobStatus,
    pub vehicle_id: Option<String>,
    pub vehicle_registration: Option<String>,
    pub part_description: Option<String>,
    /// Service charge in cents, snapshotted from the service catalog.
    pub service_price_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Job {
    #[inline]
    pub fn service_price(&self) -> Money {
        Money::from_cents(self.service_price_cents)
    }
}

/// One entry of a job's append-only update log.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct JobNote {
    pub id: String,
    pub job_id: String,
    pub note: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A part consumed by a job.
/// Uses the snapshot pattern: name and price are frozen when attached.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct JobPart {
    pub id: String,
    pub job_id: String,
    pub inventory_id: String,
    pub name_snapshot: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl JobPart {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// `unit_price × quantity`, `None` on overflow.
    #[inline]
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price().checked_mul(self.quantity)
    }
}

/// A job together with its log and parts.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct JobDetails {
    pub job: Job,
    pub notes: Vec<JobNote>,
    pub parts: Vec<JobPart>,
    pub invoice_id: Option<String>,
}

// =============================================================================
// Inventory
// =============================================================================

/// A stocked part available for jobs and direct sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryItem {
    pub id: String,
    /// Unique display name.
    pub name: String,
    /// Units on hand. Never negative.
    pub quantity: i64,
    pub unit_price_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Checks whether `quantity` units can be taken from stock.
    pub fn can_supply(&self, quantity: i64) -> bool {
        quantity > 0 && self.quantity >= quantity
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// Payment state of an invoice. Always derived, never set by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Unpaid,
    PartiallyPaid,
    Paid,
    Overdue,
    Refunded,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Unpaid => "unpaid",
            InvoiceStatus::PartiallyPaid => "partially_paid",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Refunded => "refunded",
        }
    }
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Unpaid
    }
}

/// An invoice raised against exactly one job.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    pub job_id: String,
    /// Sum of line items at creation time. Frozen.
    pub total_cents: i64,
    pub discount_cents: i64,
    pub status: InvoiceStatus,
    #[ts(as = "String")]
    pub date_created: DateTime<Utc>,
    #[ts(as = "String")]
    pub due_date: DateTime<Utc>,
}

impl Invoice {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    /// Amount actually owed: total minus discount.
    #[inline]
    pub fn billable(&self) -> Money {
        self.total() - self.discount()
    }

    /// Whether the invoice is past its due date at `now`.
    pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
        now > self.due_date
    }
}

/// Kind of a frozen invoice line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Service,
    Part,
}

/// A billable line captured when the invoice was created.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InvoiceItem {
    pub id: String,
    pub invoice_id: String,
    pub kind: LineKind,
    pub description: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub line_total_cents: i64,
}

impl InvoiceItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

/// Invoice as returned to readers: lines, ledger and fresh aggregates.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceDetails {
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
    pub payments: Vec<Payment>,
    /// Recomputed from `payments` on every read.
    pub amount_paid_cents: i64,
    /// Billable total minus amount paid (negative when overpaid).
    pub balance_cents: i64,
}

/// One row of the invoice list.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceSummary {
    pub invoice: Invoice,
    pub amount_paid_cents: i64,
    pub balance_cents: i64,
}

// =============================================================================
// Payment
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Other,
}

/// Why money moved. `Return` flows back to the customer.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Deposit,
    FullPayment,
    PartialPayment,
    Return,
}

impl Default for PaymentType {
    fn default() -> Self {
        PaymentType::FullPayment
    }
}

/// A payment ledger entry. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub invoice_id: String,
    /// Always positive; `payment_type` carries the sign.
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub payment_type: PaymentType,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub payment_date: DateTime<Utc>,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// Contribution of this entry to the invoice's amount paid.
    #[inline]
    pub fn signed_amount(&self) -> Money {
        crate::ledger::signed_amount(self.amount(), self.payment_type)
    }
}

/// Result of recording a payment: the new entry and the invoice's fresh
/// aggregates after it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub amount_paid_cents: i64,
    pub status: InvoiceStatus,
}

/// Invoice raised from a job, with the optional initial payment.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FinalizedInvoice {
    pub invoice: Invoice,
    pub receipt: Option<PaymentReceipt>,
}

/// Outcome of a committed point-of-sale transaction.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleOutcome {
    pub job_id: String,
    pub invoice_id: String,
    pub total_cents: i64,
    pub discount_cents: i64,
    pub amount_paid_cents: i64,
    pub status: InvoiceStatus,
}

// =============================================================================
// Inputs
// =============================================================================

/// Input for booking a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    pub customer_id: String,
    pub description: String,
    pub job_type: JobType,
    pub vehicle_id: Option<String>,
    pub vehicle_registration: Option<String>,
    pub part_description: Option<String>,
    pub service_price: Money,
}

/// Partial update of a job. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobUpdate {
    pub description: Option<String>,
    pub vehicle_id: Option<String>,
    pub vehicle_registration: Option<String>,
    pub part_description: Option<String>,
    pub service_price: Option<Money>,
    pub status: Option<JobStatus>,
    /// Appended to the job log when present.
    pub note: Option<String>,
}

impl JobUpdate {
    /// Whether the update touches any billable or descriptive field.
    pub fn edits_fields(&self) -> bool {
        self.description.is_some()
            || self.vehicle_id.is_some()
            || self.vehicle_registration.is_some()
            || self.part_description.is_some()
            || self.service_price.is_some()
    }
}

/// Input for a new payment ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub amount: Money,
    pub method: PaymentMethod,
    #[serde(default)]
    pub payment_type: PaymentType,
    pub note: Option<String>,
}

/// Input for a stocked part.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInventoryItem {
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
}

/// One basket line of a direct sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLine {
    pub inventory_id: String,
    pub quantity: i64,
}

/// Input for a point-of-sale transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSale {
    pub customer_id: String,
    pub lines: Vec<SaleLine>,
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub payments: Vec<NewPayment>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn invoice(total: i64, discount: i64) -> Invoice {
        let now = Utc::now();
        Invoice {
            id: "inv-1".to_string(),
            job_id: "job-1".to_string(),
            total_cents: total,
            discount_cents: discount,
            status: InvoiceStatus::Unpaid,
            date_created: now,
            due_date: now + Duration::days(30),
        }
    }

    #[test]
    fn test_billable_subtracts_discount() {
        assert_eq!(invoice(15_000, 1_000).billable().cents(), 14_000);
    }

    #[test]
    fn test_past_due() {
        let inv = invoice(100, 0);
        assert!(!inv.is_past_due(inv.date_created));
        assert!(inv.is_past_due(inv.due_date + Duration::seconds(1)));
    }

    #[test]
    fn test_signed_amount_for_return() {
        let payment = Payment {
            id: "p".to_string(),
            invoice_id: "inv-1".to_string(),
            amount_cents: 500,
            method: PaymentMethod::Cash,
            payment_type: PaymentType::Return,
            note: None,
            payment_date: Utc::now(),
        };
        assert_eq!(payment.signed_amount().cents(), -500);
    }

    #[test]
    fn test_can_supply() {
        let now = Utc::now();
        let item = InventoryItem {
            id: "i".to_string(),
            name: "Oil filter".to_string(),
            quantity: 1,
            unit_price_cents: 2_500,
            created_at: now,
            updated_at: now,
        };
        assert!(item.can_supply(1));
        assert!(!item.can_supply(2));
        assert!(!item.can_supply(0));
    }

    #[test]
    fn test_part_line_total_is_checked() {
        let mut part = JobPart {
            id: "p".to_string(),
            job_id: "job-1".to_string(),
            inventory_id: "i".to_string(),
            name_snapshot: "Brake pads".to_string(),
            unit_price_cents: 4_250,
            quantity: 2,
            created_at: Utc::now(),
        };
        assert_eq!(part.line_total(), Some(Money::from_cents(8_500)));

        part.unit_price_cents = i64::MAX / 2 + 1;
        assert_eq!(part.line_total(), None);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(JobStatus::default(), JobStatus::Booked);
        assert_eq!(InvoiceStatus::default(), InvoiceStatus::Unpaid);
        assert_eq!(PaymentType::default(), PaymentType::FullPayment);
    }

    #[test]
    fn test_status_serde_names() {
        assert_eq!(
            serde_json::to_string(&InvoiceStatus::PartiallyPaid).unwrap(),
            "\"partially_paid\""
        );
        assert_eq!(
            serde_json::to_string(&JobStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }
}
