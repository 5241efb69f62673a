//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  An invoice that sums 1,000 float line items will drift by cents,      │
//! │  and "amount paid >= amount owed" stops being a reliable comparison.   │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Every total, discount and payment is an i64 count of cents.         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The Boundary
//! The HTTP layer exchanges decimal major units ("12.50"). [`Money::from_major`]
//! and [`Money::to_major`] are the only places a float touches money, and they
//! are only called at that edge.
//!
//! ## Usage
//! ```rust
//! use garage_core::money::Money;
//!
//! let service = Money::from_cents(10_000); // R100.00
//! let part = Money::from_cents(2_500);     // R25.00
//!
//! let total = service + part * 2i64;
//! assert_eq!(total.cents(), 15_000);
//!
//! // Ingress from a request body
//! assert_eq!(Money::from_major(12.345).cents(), 1235);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::CURRENCY_SYMBOL;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Returns contribute negatively to the amount paid
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Job.service_price ─┬──► InvoiceItem.line_total ──► Invoice.total       │
/// │  JobPart.unit_price ┘                                   │               │
/// │                                                         ▼               │
/// │  Payment.amount ──► Σ signed(payments) = amount_paid ──► status         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use garage_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Converts a decimal major-unit amount into cents.
    ///
    /// Rounds to the nearest cent, halves away from zero. Non-finite input
    /// becomes zero; callers validate the sign themselves.
    ///
    /// ## Example
    /// ```rust
    /// use garage_core::money::Money;
    ///
    /// assert_eq!(Money::from_major(12.5).cents(), 1250);
    /// assert_eq!(Money::from_major(0.005).cents(), 1);
    /// assert_eq!(Money::from_major(-3.333).cents(), -333);
    /// ```
    pub fn from_major(major: f64) -> Self {
        if !major.is_finite() {
            return Money::zero();
        }
        // Scale through a string-free path: 0.29 * 100.0 = 28.999999999999996,
        // so round at 1e-6 precision first, then to whole cents.
        let scaled = (major * 100.0 * 1_000_000.0).round() / 1_000_000.0;
        Money(scaled.round() as i64)
    }

    /// Converts cents back to a decimal major-unit value for display.
    #[inline]
    pub fn to_major(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    ///
    /// ## Example
    /// ```rust
    /// use garage_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1099).major(), 10);
    /// assert_eq!(Money::from_cents(-550).major(), -5);
    /// ```
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Checked addition, `None` on i64 overflow.
    #[inline]
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Checked multiplication by a quantity, `None` on i64 overflow.
    #[inline]
    pub fn checked_mul(self, qty: i64) -> Option<Money> {
        self.0.checked_mul(qty).map(Money)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the value with the currency symbol, e.g. `R140.00`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}{}{}.{:02}",
            sign,
            CURRENCY_SYMBOL,
            self.major().abs(),
            self.cents_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(14_000).to_string(), "R140.00");
        assert_eq!(Money::from_cents(5).to_string(), "R0.05");
        assert_eq!(Money::from_cents(-550).to_string(), "-R5.50");
    }

    #[test]
    fn test_from_major_rounds_to_nearest_cent() {
        assert_eq!(Money::from_major(12.50).cents(), 1250);
        assert_eq!(Money::from_major(0.29).cents(), 29);
        assert_eq!(Money::from_major(12.345).cents(), 1235);
        assert_eq!(Money::from_major(12.344).cents(), 1234);
        assert_eq!(Money::from_major(-0.005).cents(), -1);
        assert_eq!(Money::from_major(f64::NAN).cents(), 0);
    }

    #[test]
    fn test_to_major() {
        assert_eq!(Money::from_cents(1250).to_major(), 12.5);
        assert_eq!(Money::from_cents(0).to_major(), 0.0);
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((-a).cents(), -1000);
        assert_eq!((a * 3i64).cents(), 3000);
    }

    #[test]
    fn test_sum() {
        let amounts = vec![Money::from_cents(100), Money::from_cents(250), Money::from_cents(-50)];
        let total: Money = amounts.iter().sum();
        assert_eq!(total.cents(), 300);
    }

    #[test]
    fn test_checked_overflow() {
        assert!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)).is_none());
        assert!(Money::from_cents(i64::MAX / 2).checked_mul(3).is_none());
        assert_eq!(Money::from_cents(2_500).checked_mul(2), Some(Money::from_cents(5_000)));
    }

    proptest! {
        #[test]
        fn major_units_survive_display_conversion(cents in -10_000_000i64..10_000_000i64) {
            let money = Money::from_cents(cents);
            prop_assert_eq!(Money::from_major(money.to_major()), money);
        }
    }
}
