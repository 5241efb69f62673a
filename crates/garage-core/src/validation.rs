//! # Validation Module
//!
//! Input validation run before any transaction is opened.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP boundary (garage-api)                                   │
//! │  ├── Deserialization, major → minor unit conversion                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Required fields, ranges, quantities                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Ledger engines (garage-db)                                   │
//! │  ├── Rules that need current state: stock, discount vs total           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: SQLite                                                       │
//! │  ├── CHECK (quantity >= 0), UNIQUE (invoices.job_id), FOREIGN KEY      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{NewInventoryItem, NewJob, NewSale, SaleLine};
use crate::{MAX_ITEM_QUANTITY, MAX_NOTE_LENGTH, MAX_PRICE_CENTS, MAX_SALE_LINES, MAX_STOCK_LEVEL};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required free-text field.
///
/// ## Example
/// ```rust
/// use garage_core::validation::validate_required;
///
/// assert!(validate_required("description", "Brake service", 200).is_ok());
/// assert!(validate_required("description", "   ", 200).is_err());
/// ```
pub fn validate_required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a job log note.
pub fn validate_note(note: &str) -> ValidationResult<()> {
    validate_required("note", note, MAX_NOTE_LENGTH)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity: `1..=MAX_ITEM_QUANTITY`.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents: `0..=MAX_PRICE_CENTS`. Zero is allowed (free items).
///
/// ## Example
/// ```rust
/// use garage_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents("price", 1099).is_ok());
/// assert!(validate_price_cents("price", 0).is_ok());
/// assert!(validate_price_cents("price", -100).is_err());
/// assert!(validate_price_cents("price", i64::MAX).is_err());
/// ```
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a stock level: `0..=MAX_STOCK_LEVEL`.
pub fn validate_stock(quantity: i64) -> ValidationResult<()> {
    if !(0..=MAX_STOCK_LEVEL).contains(&quantity) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: MAX_STOCK_LEVEL,
        });
    }
    Ok(())
}

/// Validates a relative stock adjustment: at most `MAX_STOCK_LEVEL` either way.
pub fn validate_stock_delta(delta: i64) -> ValidationResult<()> {
    if !(-MAX_STOCK_LEVEL..=MAX_STOCK_LEVEL).contains(&delta) {
        return Err(ValidationError::OutOfRange {
            field: "delta".to_string(),
            min: -MAX_STOCK_LEVEL,
            max: MAX_STOCK_LEVEL,
        });
    }
    Ok(())
}

// =============================================================================
// Input Validators
// =============================================================================

/// Validates a booking request.
pub fn validate_new_job(job: &NewJob) -> ValidationResult<()> {
    validate_required("customer_id", &job.customer_id, 64)?;
    validate_required("description", &job.description, 500)?;
    validate_price_cents("service_price", job.service_price.cents())?;
    Ok(())
}

/// Validates a new stocked part.
pub fn validate_new_item(item: &NewInventoryItem) -> ValidationResult<()> {
    validate_required("name", &item.name, 200)?;
    validate_stock(item.quantity)?;
    validate_price_cents("unit_price", item.unit_price.cents())?;
    Ok(())
}

/// Validates the shape of a sale basket. Stock is checked in the transaction.
pub fn validate_new_sale(sale: &NewSale) -> ValidationResult<()> {
    validate_required("customer_id", &sale.customer_id, 64)?;

    if sale.lines.is_empty() {
        return Err(ValidationError::Required {
            field: "lines".to_string(),
        });
    }

    if sale.lines.len() > MAX_SALE_LINES {
        return Err(ValidationError::OutOfRange {
            field: "lines".to_string(),
            min: 1,
            max: MAX_SALE_LINES as i64,
        });
    }

    sale.lines.iter().try_for_each(validate_sale_line)
}

fn validate_sale_line(line: &SaleLine) -> ValidationResult<()> {
    validate_required("inventory_id", &line.inventory_id, 64)?;
    validate_quantity(line.quantity)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::JobType;

    fn sale(lines: Vec<SaleLine>) -> NewSale {
        NewSale {
            customer_id: "cust-1".to_string(),
            lines,
            discount: Money::zero(),
            payments: vec![],
        }
    }

    #[test]
    fn test_validate_required() {
        assert!(validate_required("name", "Oil filter", 200).is_ok());
        assert!(validate_required("name", "", 200).is_err());
        assert!(validate_required("name", &"A".repeat(300), 200).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_price_bounds() {
        assert!(validate_price_cents("unit_price", MAX_PRICE_CENTS).is_ok());
        assert!(matches!(
            validate_price_cents("unit_price", MAX_PRICE_CENTS + 1),
            Err(ValidationError::OutOfRange { max: MAX_PRICE_CENTS, .. })
        ));
        assert!(validate_price_cents("unit_price", i64::MAX / 2 + 1).is_err());
    }

    #[test]
    fn test_validate_new_job() {
        let mut job = NewJob {
            customer_id: "cust-1".to_string(),
            description: "Brake pads".to_string(),
            job_type: JobType::Vehicle,
            vehicle_id: None,
            vehicle_registration: Some("CA 123-456".to_string()),
            part_description: None,
            service_price: Money::from_cents(10_000),
        };
        assert!(validate_new_job(&job).is_ok());

        job.service_price = Money::from_cents(-1);
        assert!(validate_new_job(&job).is_err());
    }

    #[test]
    fn test_validate_new_sale() {
        let line = SaleLine {
            inventory_id: "item-1".to_string(),
            quantity: 2,
        };
        assert!(validate_new_sale(&sale(vec![line.clone()])).is_ok());
        assert!(validate_new_sale(&sale(vec![])).is_err());

        let bad = SaleLine {
            quantity: 0,
            ..line
        };
        assert!(validate_new_sale(&sale(vec![bad])).is_err());
    }

    #[test]
    fn test_validate_stock() {
        assert!(validate_stock(0).is_ok());
        assert!(validate_stock(MAX_STOCK_LEVEL).is_ok());
        assert!(validate_stock(-1).is_err());
        assert!(validate_stock(MAX_STOCK_LEVEL + 1).is_err());
        assert!(validate_stock(i64::MAX).is_err());
    }

    #[test]
    fn test_validate_stock_delta_extremes() {
        assert!(validate_stock_delta(-5).is_ok());
        assert!(validate_stock_delta(MAX_STOCK_LEVEL).is_ok());
        assert!(validate_stock_delta(i64::MIN).is_err());
        assert!(validate_stock_delta(i64::MAX).is_err());
    }
}
