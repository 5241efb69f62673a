//! # Ledger Rules
//!
//! Pure functions that turn line items and payment entries into totals and
//! an invoice status.
//!
//! ## Derived, Never Stored
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  payments ──► Σ signed_amount ──► amount_paid ─┐                        │
//! │                                                 ├─► derive_status()     │
//! │  invoice ──► total - discount ──► billable ────┘                        │
//! │                                                                         │
//! │  Deposit / FullPayment / PartialPayment  → +amount                     │
//! │  Return                                  → -amount                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The database layer runs the same aggregation in SQL inside each payment
//! transaction; these functions are the reference it is tested against.

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{InvoiceStatus, Payment, PaymentType};
use crate::MAX_PAYMENT_CENTS;

/// Contribution of a payment entry to the amount paid.
///
/// Amounts are recorded positive; a `Return` subtracts.
#[inline]
pub fn signed_amount(amount: Money, payment_type: PaymentType) -> Money {
    match payment_type {
        PaymentType::Return => -amount,
        PaymentType::Deposit | PaymentType::FullPayment | PaymentType::PartialPayment => amount,
    }
}

/// Sums a payment ledger into paid-to-date.
pub fn amount_paid(payments: &[Payment]) -> Money {
    payments.iter().map(Payment::signed_amount).sum()
}

/// Facts about an invoice that influence its status beyond the two amounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusContext {
    /// At least one `Return` entry exists in the ledger.
    pub has_returns: bool,
    /// The invoice due date has passed.
    pub past_due: bool,
}

/// Derives an invoice status from the billable total and amount paid.
///
/// ## Rules (first match wins)
/// 1. `Refunded`: returns recorded and nothing left paid
/// 2. `Paid`: amount paid covers the billable total (overpayment included)
/// 3. `Overdue`: past due and not fully paid
/// 4. `PartiallyPaid`: something paid
/// 5. `Unpaid`
///
/// ## Example
/// ```rust
/// use garage_core::ledger::{derive_status, StatusContext};
/// use garage_core::{InvoiceStatus, Money};
///
/// let billable = Money::from_cents(14_000);
/// let ctx = StatusContext::default();
///
/// assert_eq!(derive_status(billable, Money::zero(), ctx), InvoiceStatus::Unpaid);
/// assert_eq!(derive_status(billable, Money::from_cents(500), ctx), InvoiceStatus::PartiallyPaid);
/// assert_eq!(derive_status(billable, Money::from_cents(14_500), ctx), InvoiceStatus::Paid);
/// ```
pub fn derive_status(billable: Money, amount_paid: Money, ctx: StatusContext) -> InvoiceStatus {
    if ctx.has_returns && !amount_paid.is_positive() {
        InvoiceStatus::Refunded
    } else if amount_paid >= billable {
        InvoiceStatus::Paid
    } else if ctx.past_due {
        InvoiceStatus::Overdue
    } else if amount_paid.is_positive() {
        InvoiceStatus::PartiallyPaid
    } else {
        InvoiceStatus::Unpaid
    }
}

/// Validates a discount against the invoice total: `0 <= discount <= total`.
pub fn validate_discount(discount: Money, total: Money) -> CoreResult<()> {
    if discount.is_negative() || discount > total {
        return Err(CoreError::InvalidDiscount {
            discount_cents: discount.cents(),
            total_cents: total.cents(),
        });
    }
    Ok(())
}

/// Sums `unit_price × quantity` lines, failing on overflow.
pub fn line_total(lines: impl IntoIterator<Item = (Money, i64)>) -> CoreResult<Money> {
    lines
        .into_iter()
        .try_fold(Money::zero(), |acc, (price, qty)| {
            price.checked_mul(qty).and_then(|line| acc.checked_add(line))
        })
        .ok_or_else(|| CoreError::InvalidAmount {
            reason: "invoice total overflows".to_string(),
        })
}

/// Checks that a new payment entry is acceptable against the current
/// paid-to-date.
///
/// - every amount must be positive and at most [`MAX_PAYMENT_CENTS`]
/// - a `Return` may not hand back more than has been paid
pub fn check_payment(amount: Money, payment_type: PaymentType, paid_so_far: Money) -> CoreResult<()> {
    if !amount.is_positive() {
        return Err(CoreError::InvalidAmount {
            reason: "amount must be greater than zero".to_string(),
        });
    }

    if amount.cents() > MAX_PAYMENT_CENTS {
        return Err(CoreError::InvalidAmount {
            reason: format!("amount exceeds the maximum of {}", Money::from_cents(MAX_PAYMENT_CENTS)),
        });
    }

    if payment_type == PaymentType::Return && amount > paid_so_far {
        return Err(CoreError::InvalidAmount {
            reason: format!("return of {} exceeds amount paid {}", amount, paid_so_far),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaymentMethod;
    use chrono::Utc;
    use proptest::prelude::*;

    fn entry(amount: i64, payment_type: PaymentType) -> Payment {
        Payment {
            id: uuid::Uuid::new_v4().to_string(),
            invoice_id: "inv".to_string(),
            amount_cents: amount,
            method: PaymentMethod::Cash,
            payment_type,
            note: None,
            payment_date: Utc::now(),
        }
    }

    #[test]
    fn test_worked_example() {
        let total = line_total([(Money::from_cents(10_000), 1), (Money::from_cents(2_500), 2)]).unwrap();
        assert_eq!(total.cents(), 15_000);

        let billable = total - Money::from_cents(1_000);
        let ctx = StatusContext::default();

        let mut ledger = vec![entry(14_000, PaymentType::FullPayment)];
        assert_eq!(derive_status(billable, amount_paid(&ledger), ctx), InvoiceStatus::Paid);

        ledger.push(entry(500, PaymentType::PartialPayment));
        assert_eq!(amount_paid(&ledger).cents(), 14_500);
        assert_eq!(derive_status(billable, amount_paid(&ledger), ctx), InvoiceStatus::Paid);
    }

    #[test]
    fn test_returns_reduce_amount_paid() {
        let ledger = vec![
            entry(5_000, PaymentType::Deposit),
            entry(2_000, PaymentType::Return),
        ];
        assert_eq!(amount_paid(&ledger).cents(), 3_000);
    }

    #[test]
    fn test_full_return_is_refunded() {
        let ctx = StatusContext {
            has_returns: true,
            past_due: false,
        };
        assert_eq!(
            derive_status(Money::from_cents(1_000), Money::zero(), ctx),
            InvoiceStatus::Refunded
        );
        // A partial return leaves the invoice partially paid
        assert_eq!(
            derive_status(Money::from_cents(1_000), Money::from_cents(400), ctx),
            InvoiceStatus::PartiallyPaid
        );
    }

    #[test]
    fn test_overdue_only_when_not_paid() {
        let ctx = StatusContext {
            has_returns: false,
            past_due: true,
        };
        let billable = Money::from_cents(1_000);
        assert_eq!(derive_status(billable, Money::zero(), ctx), InvoiceStatus::Overdue);
        assert_eq!(derive_status(billable, Money::from_cents(10), ctx), InvoiceStatus::Overdue);
        assert_eq!(derive_status(billable, billable, ctx), InvoiceStatus::Paid);
    }

    #[test]
    fn test_zero_billable_is_paid() {
        let status = derive_status(Money::zero(), Money::zero(), StatusContext::default());
        assert_eq!(status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_validate_discount() {
        let total = Money::from_cents(15_000);
        assert!(validate_discount(Money::zero(), total).is_ok());
        assert!(validate_discount(total, total).is_ok());
        assert!(matches!(
            validate_discount(Money::from_cents(-1), total),
            Err(CoreError::InvalidDiscount { .. })
        ));
        assert!(matches!(
            validate_discount(Money::from_cents(15_001), total),
            Err(CoreError::InvalidDiscount { .. })
        ));
    }

    #[test]
    fn test_check_payment() {
        let paid = Money::from_cents(1_000);
        assert!(check_payment(Money::from_cents(1), PaymentType::Deposit, paid).is_ok());
        assert!(check_payment(Money::zero(), PaymentType::Deposit, paid).is_err());
        assert!(check_payment(Money::from_cents(-5), PaymentType::FullPayment, paid).is_err());
        assert!(check_payment(Money::from_cents(1_000), PaymentType::Return, paid).is_ok());
        assert!(check_payment(Money::from_cents(1_001), PaymentType::Return, paid).is_err());
    }

    #[test]
    fn test_check_payment_upper_bound() {
        let paid = Money::zero();
        let max = Money::from_cents(MAX_PAYMENT_CENTS);
        assert!(check_payment(max, PaymentType::FullPayment, paid).is_ok());
        assert!(matches!(
            check_payment(Money::from_cents(MAX_PAYMENT_CENTS + 1), PaymentType::Deposit, paid),
            Err(CoreError::InvalidAmount { .. })
        ));
        assert!(check_payment(Money::from_cents(i64::MAX), PaymentType::FullPayment, paid).is_err());
    }

    #[test]
    fn test_line_total_overflow() {
        let result = line_total([(Money::from_cents(i64::MAX), 2)]);
        assert!(matches!(result, Err(CoreError::InvalidAmount { .. })));
    }

    proptest! {
        #[test]
        fn status_follows_amount_paid(billable in 1i64..1_000_000, paid in 0i64..2_000_000) {
            let status = derive_status(
                Money::from_cents(billable),
                Money::from_cents(paid),
                StatusContext::default(),
            );
            let expected = if paid >= billable {
                InvoiceStatus::Paid
            } else if paid > 0 {
                InvoiceStatus::PartiallyPaid
            } else {
                InvoiceStatus::Unpaid
            };
            prop_assert_eq!(status, expected);
        }

        #[test]
        fn amount_paid_is_signed_sum(amounts in prop::collection::vec((1i64..100_000, any::<bool>()), 0..30)) {
            let ledger: Vec<Payment> = amounts
                .iter()
                .map(|(amount, is_return)| {
                    let kind = if *is_return { PaymentType::Return } else { PaymentType::PartialPayment };
                    entry(*amount, kind)
                })
                .collect();
            let expected: i64 = amounts
                .iter()
                .map(|(amount, is_return)| if *is_return { -amount } else { *amount })
                .sum();
            prop_assert_eq!(amount_paid(&ledger).cents(), expected);
        }
    }
}
