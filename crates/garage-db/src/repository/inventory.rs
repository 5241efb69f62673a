//! # Inventory Repository
//!
//! Stocked parts, and the only code path allowed to lower stock.
//!
//! ## Check-Then-Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    take_stock(item, qty)                                │
//! │                                                                         │
//! │  1. SELECT item                → ItemNotFound if missing                │
//! │  2. quantity >= qty ?          → InsufficientStock if not               │
//! │  3. UPDATE inventory_items                                             │
//! │        SET quantity = quantity - qty                                   │
//! │      WHERE id = ? AND quantity >= qty                                  │
//! │  4. rows_affected == 0 ?       → InsufficientStock                      │
//! │                                                                         │
//! │  Step 3 re-checks inside the UPDATE, so stock never goes negative     │
//! │  even if step 2 read a stale value. The CHECK (quantity >= 0) on the   │
//! │  table is the last line.                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult, LedgerResult};
use crate::pool::{Database, Staged};
use garage_core::validation::{validate_new_item, validate_price_cents, validate_stock, validate_stock_delta};
use garage_core::{CoreError, InventoryItem, Money, NewInventoryItem, ValidationError, MAX_STOCK_LEVEL};

const ITEM_COLUMNS: &str = "id, name, quantity, unit_price_cents, created_at, updated_at";

// =============================================================================
// Row Functions
// =============================================================================

/// Inserts an inventory item row.
pub async fn insert(conn: &mut SqliteConnection, item: &InventoryItem) -> DbResult<()> {
    debug!(id = %item.id, name = %item.name, "Inserting inventory item");

    sqlx::query(
        r#"
        INSERT INTO inventory_items (id, name, quantity, unit_price_cents, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&item.id)
    .bind(&item.name)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Gets an item by ID.
pub async fn get_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<InventoryItem>> {
    let sql = format!("SELECT {} FROM inventory_items WHERE id = ?1", ITEM_COLUMNS);

    let item = sqlx::query_as::<_, InventoryItem>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(item)
}

/// Gets an item by its unique name.
pub async fn get_by_name(conn: &mut SqliteConnection, name: &str) -> DbResult<Option<InventoryItem>> {
    let sql = format!("SELECT {} FROM inventory_items WHERE name = ?1", ITEM_COLUMNS);

    let item = sqlx::query_as::<_, InventoryItem>(&sql)
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(item)
}

/// Lists all items ordered by name.
pub async fn list(conn: &mut SqliteConnection) -> DbResult<Vec<InventoryItem>> {
    let sql = format!("SELECT {} FROM inventory_items ORDER BY name", ITEM_COLUMNS);

    let items = sqlx::query_as::<_, InventoryItem>(&sql)
        .fetch_all(&mut *conn)
        .await?;

    Ok(items)
}

/// Adds `delta` to the stock level unless the result would be negative.
///
/// Returns whether a row changed.
pub async fn apply_delta(
    conn: &mut SqliteConnection,
    id: &str,
    delta: i64,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE inventory_items
        SET quantity = quantity + ?2, updated_at = ?3
        WHERE id = ?1 AND quantity + ?2 >= 0
        "#,
    )
    .bind(id)
    .bind(delta)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Overwrites the stock level.
pub async fn set_quantity(
    conn: &mut SqliteConnection,
    id: &str,
    quantity: i64,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query("UPDATE inventory_items SET quantity = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("InventoryItem", id));
    }

    Ok(())
}

/// Overwrites the unit price. Existing job parts and invoices keep theirs.
pub async fn set_price(
    conn: &mut SqliteConnection,
    id: &str,
    unit_price_cents: i64,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result =
        sqlx::query("UPDATE inventory_items SET unit_price_cents = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(unit_price_cents)
            .bind(now)
            .execute(&mut *conn)
            .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("InventoryItem", id));
    }

    Ok(())
}

/// Takes `quantity` units of an item out of stock.
///
/// Returns the item as it was before the decrement, for snapshotting.
pub async fn take_stock(
    conn: &mut SqliteConnection,
    id: &str,
    quantity: i64,
    now: DateTime<Utc>,
) -> LedgerResult<InventoryItem> {
    let item = get_by_id(conn, id)
        .await?
        .ok_or_else(|| CoreError::ItemNotFound(id.to_string()))?;

    let insufficient = |available: i64| CoreError::InsufficientStock {
        item: item.name.clone(),
        available,
        requested: quantity,
    };

    if !item.can_supply(quantity) {
        return Err(insufficient(item.quantity).into());
    }

    if !apply_delta(conn, id, -quantity, now).await? {
        return Err(insufficient(item.quantity).into());
    }

    debug!(id = %id, name = %item.name, taken = quantity, left = item.quantity - quantity, "Stock decremented");
    Ok(item)
}

// =============================================================================
// Repository
// =============================================================================

/// Inventory operations that own their transaction.
///
/// ## Usage
/// ```rust,ignore
/// let filter = db.inventory().create_item(NewInventoryItem {
///     name: "Oil filter".into(),
///     quantity: 12,
///     unit_price: Money::from_cents(2_500),
/// }).await?;
///
/// db.inventory().adjust_quantity(&filter.id, -2).await?;
/// ```
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    db: Database,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(db: Database) -> Self {
        InventoryRepository { db }
    }

    /// Adds a stocked part. Names are unique.
    pub async fn create_item(&self, input: NewInventoryItem) -> LedgerResult<InventoryItem> {
        validate_new_item(&input)?;
        let item = self
            .db
            .with_timeout("create_item", self.create_item_tx(input))
            .await?;

        info!(id = %item.id, name = %item.name, quantity = item.quantity, "Inventory item created");
        Ok(item)
    }

    /// Gets an item by ID.
    pub async fn get_item(&self, id: &str) -> LedgerResult<InventoryItem> {
        let mut conn = self.db.acquire().await?;
        let item = get_by_id(&mut conn, id)
            .await?
            .ok_or_else(|| CoreError::ItemNotFound(id.to_string()))?;
        Ok(item)
    }

    /// Lists all items.
    pub async fn list_items(&self) -> LedgerResult<Vec<InventoryItem>> {
        let mut conn = self.db.acquire().await?;
        Ok(list(&mut conn).await?)
    }

    /// Sets the stock level after a manual count.
    pub async fn set_quantity(&self, id: &str, quantity: i64) -> LedgerResult<InventoryItem> {
        validate_stock(quantity)?;
        let (from, item) = self
            .db
            .with_timeout("set_quantity", self.set_quantity_tx(id, quantity))
            .await?;

        info!(id = %id, from, to = item.quantity, "Stock level set");
        Ok(item)
    }

    /// Adds a signed delta to the stock level.
    ///
    /// The result must stay within `0..=MAX_STOCK_LEVEL`; going below zero
    /// is `InsufficientStock`.
    pub async fn adjust_quantity(&self, id: &str, delta: i64) -> LedgerResult<InventoryItem> {
        validate_stock_delta(delta)?;
        let item = self
            .db
            .with_timeout("adjust_quantity", self.adjust_quantity_tx(id, delta))
            .await?;

        info!(id = %id, delta, quantity = item.quantity, "Stock adjusted");
        Ok(item)
    }

    /// Changes the unit price used for future sales and attachments.
    pub async fn update_price(&self, id: &str, unit_price: Money) -> LedgerResult<InventoryItem> {
        validate_price_cents("unit_price", unit_price.cents())?;
        let item = self
            .db
            .with_timeout("update_price", self.update_price_tx(id, unit_price))
            .await?;

        info!(id = %id, price = %unit_price, "Unit price updated");
        Ok(item)
    }

    async fn create_item_tx(&self, input: NewInventoryItem) -> LedgerResult<Staged<InventoryItem>> {
        let mut tx = self.db.begin_immediate().await?;

        let name = input.name.trim().to_string();
        if get_by_name(&mut tx, &name).await?.is_some() {
            return Err(ValidationError::Duplicate {
                field: "name".to_string(),
                value: name,
            }
            .into());
        }

        let now = Utc::now();
        let item = InventoryItem {
            id: Uuid::new_v4().to_string(),
            name,
            quantity: input.quantity,
            unit_price_cents: input.unit_price.cents(),
            created_at: now,
            updated_at: now,
        };
        insert(&mut tx, &item).await?;

        Ok((tx, item))
    }

    async fn set_quantity_tx(&self, id: &str, quantity: i64) -> LedgerResult<Staged<(i64, InventoryItem)>> {
        let mut tx = self.db.begin_immediate().await?;

        let mut item = get_by_id(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::ItemNotFound(id.to_string()))?;

        let now = Utc::now();
        set_quantity(&mut tx, id, quantity, now).await?;

        let from = item.quantity;
        item.quantity = quantity;
        item.updated_at = now;
        Ok((tx, (from, item)))
    }

    async fn adjust_quantity_tx(&self, id: &str, delta: i64) -> LedgerResult<Staged<InventoryItem>> {
        let mut tx = self.db.begin_immediate().await?;

        let mut item = get_by_id(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::ItemNotFound(id.to_string()))?;

        let insufficient = |available: i64| CoreError::InsufficientStock {
            item: item.name.clone(),
            available,
            requested: delta.saturating_neg(),
        };

        let target = item.quantity.checked_add(delta).ok_or(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: MAX_STOCK_LEVEL,
        })?;
        if target < 0 {
            return Err(insufficient(item.quantity).into());
        }
        validate_stock(target)?;

        let now = Utc::now();
        if !apply_delta(&mut tx, id, delta, now).await? {
            return Err(insufficient(item.quantity).into());
        }

        item.quantity = target;
        item.updated_at = now;
        Ok((tx, item))
    }

    async fn update_price_tx(&self, id: &str, unit_price: Money) -> LedgerResult<Staged<InventoryItem>> {
        let mut tx = self.db.begin_immediate().await?;

        let mut item = get_by_id(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::ItemNotFound(id.to_string()))?;

        let now = Utc::now();
        set_price(&mut tx, id, unit_price.cents(), now).await?;

        item.unit_price_cents = unit_price.cents();
        item.updated_at = now;
        Ok((tx, item))
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

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn filter(qty: i64) -> NewInventoryItem {
        NewInventoryItem {
            name: "Oil filter".to_string(),
            quantity: qty,
            unit_price: Money::from_cents(2_500),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = setup().await;
        let item = db.inventory().create_item(filter(3)).await.unwrap();

        let fetched = db.inventory().get_item(&item.id).await.unwrap();
        assert_eq!(fetched.name, "Oil filter");
        assert_eq!(fetched.quantity, 3);
        assert_eq!(fetched.unit_price_cents, 2_500);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let db = setup().await;
        db.inventory().create_item(filter(1)).await.unwrap();

        let err = db.inventory().create_item(filter(1)).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(CoreError::Validation(ValidationError::Duplicate { .. }))
        ));
    }

    #[tokio::test]
    async fn test_adjust_never_below_zero() {
        let db = setup().await;
        let item = db.inventory().create_item(filter(2)).await.unwrap();

        let item = db.inventory().adjust_quantity(&item.id, 5).await.unwrap();
        assert_eq!(item.quantity, 7);

        let err = db.inventory().adjust_quantity(&item.id, -8).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(CoreError::InsufficientStock { available: 7, requested: 8, .. })
        ));
        assert_eq!(db.inventory().get_item(&item.id).await.unwrap().quantity, 7);
    }

    #[tokio::test]
    async fn test_adjust_extreme_deltas_rejected() {
        let db = setup().await;
        let item = db.inventory().create_item(filter(4)).await.unwrap();

        for delta in [i64::MIN, i64::MAX, MAX_STOCK_LEVEL + 1] {
            let err = db.inventory().adjust_quantity(&item.id, delta).await.unwrap_err();
            assert!(matches!(
                err,
                LedgerError::Domain(CoreError::Validation(ValidationError::OutOfRange { .. }))
            ));
        }

        // In range on its own but pushes the level over the cap
        let err = db.inventory().adjust_quantity(&item.id, MAX_STOCK_LEVEL).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let err = db.inventory().adjust_quantity(&item.id, -MAX_STOCK_LEVEL).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(CoreError::InsufficientStock { available: 4, .. })
        ));

        let fetched = db.inventory().get_item(&item.id).await.unwrap();
        assert_eq!(fetched.quantity, 4);
        assert_eq!(db.inventory().list_items().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_item_bounds() {
        let db = setup().await;

        let err = db.inventory().create_item(filter(MAX_STOCK_LEVEL + 1)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Domain(CoreError::Validation(_))));

        let mut pricey = filter(1);
        pricey.unit_price = Money::from_cents(i64::MAX);
        let err = db.inventory().create_item(pricey).await.unwrap_err();
        assert!(matches!(err, LedgerError::Domain(CoreError::Validation(_))));

        let item = db.inventory().create_item(filter(MAX_STOCK_LEVEL)).await.unwrap();
        let err = db
            .inventory()
            .update_price(&item.id, Money::from_cents(i64::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Domain(CoreError::Validation(_))));
        assert_eq!(db.inventory().get_item(&item.id).await.unwrap().unit_price_cents, 2_500);
    }

    #[tokio::test]
    async fn test_set_quantity_and_price() {
        let db = setup().await;
        let item = db.inventory().create_item(filter(2)).await.unwrap();

        assert!(db.inventory().set_quantity(&item.id, -1).await.is_err());
        let item = db.inventory().set_quantity(&item.id, 0).await.unwrap();
        assert_eq!(item.quantity, 0);

        let item = db
            .inventory()
            .update_price(&item.id, Money::from_cents(2_750))
            .await
            .unwrap();
        assert_eq!(db.inventory().get_item(&item.id).await.unwrap().unit_price_cents, 2_750);
    }

    #[tokio::test]
    async fn test_take_stock() {
        let db = setup().await;
        let item = db.inventory().create_item(filter(1)).await.unwrap();

        let mut tx = db.begin_immediate().await.unwrap();
        let before = take_stock(&mut tx, &item.id, 1, Utc::now()).await.unwrap();
        assert_eq!(before.quantity, 1);

        let err = take_stock(&mut tx, &item.id, 1, Utc::now()).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(CoreError::InsufficientStock { available: 0, .. })
        ));

        let err = take_stock(&mut tx, "missing", 1, Utc::now()).await.unwrap_err();
        assert!(matches!(err, LedgerError::Domain(CoreError::ItemNotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_item() {
        let db = setup().await;
        let err = db.inventory().get_item("nope").await.unwrap_err();
        assert!(matches!(err, LedgerError::Domain(CoreError::ItemNotFound(_))));
    }
}
