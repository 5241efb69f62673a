//! Request and response bodies.
//!
//! Money crosses the HTTP boundary as decimal major units (`12.5`), and is
//! converted to and from [`Money`] cents here and nowhere else.
//!
//! ```text
//! JSON  { "servicePrice": 100.0 }
//!          │ Money::from_major (half away from zero)
//!          ▼
//! core  NewJob { service_price: Money(10000) }
//!          │ ledger engines (integer cents only)
//!          ▼
//! JSON  { "servicePrice": 100.0 }   ◄── Money::to_major
//! ```

use chrono::{DateTime, Utc};
use garage_core::{
    FinalizedInvoice, InventoryItem, Invoice, InvoiceDetails, InvoiceItem, InvoiceStatus, InvoiceSummary, Job,
    JobDetails, JobNote, JobPart, JobStatus, JobType, JobUpdate, LineKind, Money, NewInventoryItem, NewJob,
    NewPayment, NewSale, Payment, PaymentMethod, PaymentReceipt, PaymentType, SaleLine, SaleOutcome,
};
use serde::{Deserialize, Serialize};

fn major(cents: i64) -> f64 {
    Money::from_cents(cents).to_major()
}

// =============================================================================
// Envelope
// =============================================================================

/// Success envelope: `{"message": "...", "data": ...}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            message: message.into(),
            data,
        }
    }
}

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub customer_id: String,
    pub description: String,
    pub job_type: JobType,
    pub vehicle_id: Option<String>,
    pub vehicle_registration: Option<String>,
    pub part_description: Option<String>,
    #[serde(default)]
    pub service_price: f64,
}

impl From<CreateJobRequest> for NewJob {
    fn from(req: CreateJobRequest) -> Self {
        NewJob {
            customer_id: req.customer_id,
            description: req.description,
            job_type: req.job_type,
            vehicle_id: req.vehicle_id,
            vehicle_registration: req.vehicle_registration,
            part_description: req.part_description,
            service_price: Money::from_major(req.service_price),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJobRequest {
    pub description: Option<String>,
    pub vehicle_id: Option<String>,
    pub vehicle_registration: Option<String>,
    pub part_description: Option<String>,
    pub service_price: Option<f64>,
    pub status: Option<JobStatus>,
    pub note: Option<String>,
}

impl From<UpdateJobRequest> for JobUpdate {
    fn from(req: UpdateJobRequest) -> Self {
        JobUpdate {
            description: req.description,
            vehicle_id: req.vehicle_id,
            vehicle_registration: req.vehicle_registration,
            part_description: req.part_description,
            service_price: req.service_price.map(Money::from_major),
            status: req.status,
            note: req.note,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListQuery {
    pub status: Option<JobStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachPartRequest {
    pub inventory_id: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub amount: f64,
    pub method: PaymentMethod,
    #[serde(default)]
    pub payment_type: PaymentType,
    pub note: Option<String>,
}

impl From<PaymentRequest> for NewPayment {
    fn from(req: PaymentRequest) -> Self {
        NewPayment {
            amount: Money::from_major(req.amount),
            method: req.method,
            payment_type: req.payment_type,
            note: req.note,
        }
    }
}

/// Body of `POST /jobs/{id}/invoice`. An initial payment makes it a
/// single-transaction finalize.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    #[serde(default)]
    pub discount: f64,
    pub payment: Option<PaymentRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    pub name: String,
    pub quantity: i64,
    pub unit_price: f64,
}

impl From<CreateItemRequest> for NewInventoryItem {
    fn from(req: CreateItemRequest) -> Self {
        NewInventoryItem {
            name: req.name,
            quantity: req.quantity,
            unit_price: Money::from_major(req.unit_price),
        }
    }
}

/// Body of `PATCH /inventory/{id}/stock`: exactly one of `quantity`
/// (absolute) or `delta` (relative).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRequest {
    pub quantity: Option<i64>,
    pub delta: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLineRequest {
    pub inventory_id: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    pub customer_id: String,
    pub lines: Vec<SaleLineRequest>,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub payments: Vec<PaymentRequest>,
}

impl From<SaleRequest> for NewSale {
    fn from(req: SaleRequest) -> Self {
        NewSale {
            customer_id: req.customer_id,
            lines: req
                .lines
                .into_iter()
                .map(|line| SaleLine {
                    inventory_id: line.inventory_id,
                    quantity: line.quantity,
                })
                .collect(),
            discount: Money::from_major(req.discount),
            payments: req.payments.into_iter().map(NewPayment::from).collect(),
        }
    }
}

// =============================================================================
// Responses: Jobs
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    pub id: String,
    pub customer_id: String,
    pub description: String,
    pub job_type: JobType,
    pub status: JobStatus,
    pub vehicle_id: Option<String>,
    pub vehicle_registration: Option<String>,
    pub part_description: Option<String>,
    pub service_price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        JobResponse {
            service_price: major(job.service_price_cents),
            id: job.id,
            customer_id: job.customer_id,
            description: job.description,
            job_type: job.job_type,
            status: job.status,
            vehicle_id: job.vehicle_id,
            vehicle_registration: job.vehicle_registration,
            part_description: job.part_description,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobNoteResponse {
    pub id: String,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

impl From<JobNote> for JobNoteResponse {
    fn from(note: JobNote) -> Self {
        JobNoteResponse {
            id: note.id,
            note: note.note,
            created_at: note.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPartResponse {
    pub id: String,
    pub inventory_id: String,
    pub name: String,
    pub unit_price: f64,
    pub quantity: i64,
    /// `null` when the product does not fit in the money range.
    pub line_total: Option<f64>,
}

impl From<JobPart> for JobPartResponse {
    fn from(part: JobPart) -> Self {
        JobPartResponse {
            line_total: part.line_total().map(|total| total.to_major()),
            unit_price: major(part.unit_price_cents),
            id: part.id,
            inventory_id: part.inventory_id,
            name: part.name_snapshot,
            quantity: part.quantity,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetailsResponse {
    #[serde(flatten)]
    pub job: JobResponse,
    pub notes: Vec<JobNoteResponse>,
    pub parts: Vec<JobPartResponse>,
    pub invoice_id: Option<String>,
}

impl From<JobDetails> for JobDetailsResponse {
    fn from(details: JobDetails) -> Self {
        JobDetailsResponse {
            job: details.job.into(),
            notes: details.notes.into_iter().map(Into::into).collect(),
            parts: details.parts.into_iter().map(Into::into).collect(),
            invoice_id: details.invoice_id,
        }
    }
}

// =============================================================================
// Responses: Inventory
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItemResponse {
    pub id: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<InventoryItem> for InventoryItemResponse {
    fn from(item: InventoryItem) -> Self {
        InventoryItemResponse {
            unit_price: major(item.unit_price_cents),
            id: item.id,
            name: item.name,
            quantity: item.quantity,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

// =============================================================================
// Responses: Invoices and Payments
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResponse {
    pub id: String,
    pub job_id: String,
    pub total: f64,
    pub discount: f64,
    pub billable: f64,
    pub status: InvoiceStatus,
    pub date_created: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        InvoiceResponse {
            total: invoice.total().to_major(),
            discount: invoice.discount().to_major(),
            billable: invoice.billable().to_major(),
            id: invoice.id,
            job_id: invoice.job_id,
            status: invoice.status,
            date_created: invoice.date_created,
            due_date: invoice.due_date,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItemResponse {
    pub id: String,
    pub kind: LineKind,
    pub description: String,
    pub unit_price: f64,
    pub quantity: i64,
    pub line_total: f64,
}

impl From<InvoiceItem> for InvoiceItemResponse {
    fn from(item: InvoiceItem) -> Self {
        InvoiceItemResponse {
            unit_price: major(item.unit_price_cents),
            line_total: major(item.line_total_cents),
            id: item.id,
            kind: item.kind,
            description: item.description,
            quantity: item.quantity,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: String,
    pub invoice_id: String,
    pub amount: f64,
    pub method: PaymentMethod,
    pub payment_type: PaymentType,
    pub note: Option<String>,
    pub payment_date: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        PaymentResponse {
            amount: major(payment.amount_cents),
            id: payment.id,
            invoice_id: payment.invoice_id,
            method: payment.method,
            payment_type: payment.payment_type,
            note: payment.note,
            payment_date: payment.payment_date,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDetailsResponse {
    #[serde(flatten)]
    pub invoice: InvoiceResponse,
    pub amount_paid: f64,
    pub balance: f64,
    pub items: Vec<InvoiceItemResponse>,
    pub payments: Vec<PaymentResponse>,
}

impl From<InvoiceDetails> for InvoiceDetailsResponse {
    fn from(details: InvoiceDetails) -> Self {
        InvoiceDetailsResponse {
            invoice: details.invoice.into(),
            amount_paid: major(details.amount_paid_cents),
            balance: major(details.balance_cents),
            items: details.items.into_iter().map(Into::into).collect(),
            payments: details.payments.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSummaryResponse {
    #[serde(flatten)]
    pub invoice: InvoiceResponse,
    pub amount_paid: f64,
    pub balance: f64,
}

impl From<InvoiceSummary> for InvoiceSummaryResponse {
    fn from(summary: InvoiceSummary) -> Self {
        InvoiceSummaryResponse {
            invoice: summary.invoice.into(),
            amount_paid: major(summary.amount_paid_cents),
            balance: major(summary.balance_cents),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceiptResponse {
    pub payment: PaymentResponse,
    pub amount_paid: f64,
    pub status: InvoiceStatus,
}

impl From<PaymentReceipt> for PaymentReceiptResponse {
    fn from(receipt: PaymentReceipt) -> Self {
        PaymentReceiptResponse {
            payment: receipt.payment.into(),
            amount_paid: major(receipt.amount_paid_cents),
            status: receipt.status,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedInvoiceResponse {
    pub invoice: InvoiceResponse,
    pub receipt: Option<PaymentReceiptResponse>,
}

impl From<FinalizedInvoice> for FinalizedInvoiceResponse {
    fn from(finalized: FinalizedInvoice) -> Self {
        FinalizedInvoiceResponse {
            invoice: finalized.invoice.into(),
            receipt: finalized.receipt.map(Into::into),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshOverdueResponse {
    pub flagged: usize,
}

// =============================================================================
// Responses: Sales
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleResponse {
    pub job_id: String,
    pub invoice_id: String,
    pub total: f64,
    pub discount: f64,
    pub amount_paid: f64,
    pub status: InvoiceStatus,
}

impl From<SaleOutcome> for SaleResponse {
    fn from(outcome: SaleOutcome) -> Self {
        SaleResponse {
            job_id: outcome.job_id,
            invoice_id: outcome.invoice_id,
            total: major(outcome.total_cents),
            discount: major(outcome.discount_cents),
            amount_paid: major(outcome.amount_paid_cents),
            status: outcome.status,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_money_rounds_to_cents() {
        let req: CreateItemRequest =
            serde_json::from_str(r#"{"name": "Oil filter", "quantity": 3, "unitPrice": 12.345}"#).unwrap();
        let item = NewInventoryItem::from(req);
        assert_eq!(item.unit_price.cents(), 1_235);
    }

    #[test]
    fn test_payment_type_defaults() {
        let req: PaymentRequest = serde_json::from_str(r#"{"amount": 50, "method": "cash"}"#).unwrap();
        let payment = NewPayment::from(req);
        assert_eq!(payment.amount.cents(), 5_000);
        assert_eq!(payment.payment_type, PaymentType::default());
    }

    #[test]
    fn test_sale_request_defaults() {
        let req: SaleRequest = serde_json::from_str(
            r#"{"customerId": "walk-in", "lines": [{"inventoryId": "abc", "quantity": 2}]}"#,
        )
        .unwrap();
        let sale = NewSale::from(req);
        assert_eq!(sale.lines.len(), 1);
        assert!(sale.discount.is_zero());
        assert!(sale.payments.is_empty());
    }

    #[test]
    fn test_summary_flattens_invoice() {
        let now = Utc::now();
        let summary = InvoiceSummary {
            invoice: Invoice {
                id: "inv-1".to_string(),
                job_id: "job-1".to_string(),
                total_cents: 15_000,
                discount_cents: 1_000,
                status: InvoiceStatus::PartiallyPaid,
                date_created: now,
                due_date: now,
            },
            amount_paid_cents: 4_000,
            balance_cents: 10_000,
        };

        let json = serde_json::to_value(InvoiceSummaryResponse::from(summary)).unwrap();
        assert_eq!(json["id"], "inv-1");
        assert_eq!(json["total"], 150.0);
        assert_eq!(json["billable"], 140.0);
        assert_eq!(json["amountPaid"], 40.0);
        assert_eq!(json["balance"], 100.0);
        assert_eq!(json["status"], "partially_paid");
    }
}
