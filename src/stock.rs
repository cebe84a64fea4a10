//! Stock adjustments and the movement audit trail.
//!
//! Every change to `products.current_stock` goes through here and is
//! paired with a `stock_movements` row. Callers that adjust several
//! products at once (checkout) run inside one transaction; the standalone
//! entry point opens its own.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Why stock changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementType {
    Sale,
    Purchase,
    Adjustment,
    Return,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Sale => "sale",
            MovementType::Purchase => "purchase",
            MovementType::Adjustment => "adjustment",
            MovementType::Return => "return",
        }
    }

    pub fn parse(value: &str) -> Result<Self, StockError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sale" => Ok(MovementType::Sale),
            "purchase" => Ok(MovementType::Purchase),
            "adjustment" => Ok(MovementType::Adjustment),
            "return" => Ok(MovementType::Return),
            other => Err(StockError::InvalidMovementType(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum StockError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),
    #[error("Insufficient stock for {name}: {available} available, {requested} requested")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },
    #[error("Unknown movement type: {0}")]
    InvalidMovementType(String),
    #[error("stock update: {0}")]
    Db(#[from] rusqlite::Error),
}

/// A recorded stock movement.
#[derive(Debug, Clone, Serialize)]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub movement_type: String,
    pub quantity: i64,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: String,
}

/// Optional reference attached to a movement (e.g. the sale that caused it).
#[derive(Debug, Clone, Copy, Default)]
pub struct MovementRef<'a> {
    pub reference_type: Option<&'a str>,
    pub reference_id: Option<&'a str>,
    pub notes: Option<&'a str>,
}

/// Apply `quantity_change` (signed) to a product's stock and record the
/// movement. Rejects changes that would take stock negative. Returns the
/// new stock level.
///
/// Runs the check-and-update against whatever connection it is handed, so
/// a caller holding a transaction gets atomicity across multiple calls.
pub fn update_product_stock(
    conn: &Connection,
    product_id: &str,
    quantity_change: i64,
    movement_type: MovementType,
    reference: MovementRef<'_>,
    created_by: &str,
) -> Result<i64, StockError> {
    let row: Option<(String, i64)> = conn
        .query_row(
            "SELECT name, current_stock FROM products WHERE id = ?1",
            params![product_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let (name, current) = row.ok_or_else(|| StockError::ProductNotFound(product_id.to_string()))?;

    let next = current + quantity_change;
    if next < 0 {
        return Err(StockError::InsufficientStock {
            name,
            available: current,
            requested: -quantity_change,
        });
    }

    conn.execute(
        "UPDATE products SET current_stock = ?2, updated_at = datetime('now') WHERE id = ?1",
        params![product_id, next],
    )?;

    conn.execute(
        "INSERT INTO stock_movements (id, product_id, movement_type, quantity,
            reference_type, reference_id, notes, created_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            Uuid::new_v4().to_string(),
            product_id,
            movement_type.as_str(),
            quantity_change,
            reference.reference_type,
            reference.reference_id,
            reference.notes,
            created_by,
        ],
    )?;

    Ok(next)
}

/// Standalone adjustment wrapped in its own transaction.
pub fn adjust_stock(
    conn: &mut Connection,
    product_id: &str,
    quantity_change: i64,
    movement_type: MovementType,
    reference: MovementRef<'_>,
    created_by: &str,
) -> Result<i64, StockError> {
    let tx = conn.transaction()?;
    let next = update_product_stock(
        &tx,
        product_id,
        quantity_change,
        movement_type,
        reference,
        created_by,
    )?;
    tx.commit()?;
    Ok(next)
}

fn movement_from_row(row: &Row<'_>) -> rusqlite::Result<StockMovement> {
    Ok(StockMovement {
        id: row.get(0)?,
        product_id: row.get(1)?,
        movement_type: row.get(2)?,
        quantity: row.get(3)?,
        reference_type: row.get(4)?,
        reference_id: row.get(5)?,
        notes: row.get(6)?,
        created_by: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Movement history for a product, newest first.
pub fn movement_history(
    conn: &Connection,
    product_id: &str,
    limit: i64,
) -> Result<Vec<StockMovement>, String> {
    let mut stmt = conn
        .prepare(
            "SELECT id, product_id, movement_type, quantity, reference_type, reference_id,
                    notes, created_by, created_at
             FROM stock_movements
             WHERE product_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
        )
        .map_err(|e| format!("movement history: {e}"))?;
    let rows = stmt
        .query_map(params![product_id, limit], movement_from_row)
        .map_err(|e| format!("movement history: {e}"))?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use rusqlite::Connection;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.execute_batch("PRAGMA foreign_keys = ON;").expect("pragmas");
        db::run_migrations_for_test(&conn);
        conn.execute(
            "INSERT INTO products (id, name, unit_price, cost_price, current_stock)
             VALUES ('prod-1', 'Bananas', 2.99, 1.8, 20)",
            [],
        )
        .expect("seed product");
        conn
    }

    fn current_stock(conn: &Connection) -> i64 {
        conn.query_row(
            "SELECT current_stock FROM products WHERE id = 'prod-1'",
            [],
            |row| row.get(0),
        )
        .expect("read stock")
    }

    #[test]
    fn sale_decrements_and_records_movement() {
        let conn = test_db();
        let next = update_product_stock(
            &conn,
            "prod-1",
            -3,
            MovementType::Sale,
            MovementRef {
                reference_type: Some("sale"),
                reference_id: Some("sale-1"),
                notes: None,
            },
            "user-1",
        )
        .expect("decrement");
        assert_eq!(next, 17);
        assert_eq!(current_stock(&conn), 17);

        let history = movement_history(&conn, "prod-1", 10).expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].movement_type, "sale");
        assert_eq!(history[0].quantity, -3);
        assert_eq!(history[0].reference_id.as_deref(), Some("sale-1"));
    }

    #[test]
    fn rejects_negative_stock() {
        let conn = test_db();
        let err = update_product_stock(
            &conn,
            "prod-1",
            -25,
            MovementType::Sale,
            MovementRef::default(),
            "user-1",
        )
        .expect_err("should reject");
        assert!(matches!(
            err,
            StockError::InsufficientStock {
                available: 20,
                requested: 25,
                ..
            }
        ));
        // Nothing changed, nothing recorded
        assert_eq!(current_stock(&conn), 20);
        assert!(movement_history(&conn, "prod-1", 10)
            .expect("history")
            .is_empty());
    }

    #[test]
    fn unknown_product_errors() {
        let conn = test_db();
        let err = update_product_stock(
            &conn,
            "ghost",
            5,
            MovementType::Purchase,
            MovementRef::default(),
            "user-1",
        )
        .expect_err("should fail");
        assert!(matches!(err, StockError::ProductNotFound(_)));
    }

    #[test]
    fn purchase_increments() {
        let mut conn = test_db();
        let next = adjust_stock(
            &mut conn,
            "prod-1",
            30,
            MovementType::Purchase,
            MovementRef {
                notes: Some("weekly restock"),
                ..Default::default()
            },
            "user-1",
        )
        .expect("increment");
        assert_eq!(next, 50);
    }

    #[test]
    fn movement_type_parsing() {
        assert_eq!(
            MovementType::parse("Sale").expect("parse"),
            MovementType::Sale
        );
        assert_eq!(
            MovementType::parse(" return ").expect("parse"),
            MovementType::Return
        );
        assert!(MovementType::parse("theft").is_err());
    }
}
