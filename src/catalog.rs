//! Product catalog: products, categories, suppliers.
//!
//! Row types serialize with the column names the dashboard screens bind to.
//! Stock status is derived from the min/max thresholds, mirroring the
//! `get_stock_status` backend function.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stock level classification for a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
    OverStock,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "in_stock",
            StockStatus::LowStock => "low_stock",
            StockStatus::OutOfStock => "out_of_stock",
            StockStatus::OverStock => "over_stock",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub barcode: Option<String>,
    pub category_id: Option<String>,
    pub supplier_id: Option<String>,
    pub unit_price: f64,
    pub cost_price: f64,
    pub current_stock: i64,
    pub min_stock_threshold: i64,
    pub max_stock_threshold: i64,
    pub unit: String,
    pub is_active: bool,
    pub created_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub stock_status: StockStatus,
}

impl Product {
    /// Derive the stock status: out when zero, low at or below the minimum
    /// threshold, over when above the maximum.
    fn derive_status(current: i64, min: i64, max: i64) -> StockStatus {
        if current <= 0 {
            StockStatus::OutOfStock
        } else if current <= min {
            StockStatus::LowStock
        } else if current > max {
            StockStatus::OverStock
        } else {
            StockStatus::InStock
        }
    }
}

/// Create/update payload for a product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub supplier_id: Option<String>,
    #[serde(default)]
    pub unit_price: f64,
    #[serde(default)]
    pub cost_price: f64,
    #[serde(default)]
    pub current_stock: i64,
    #[serde(default = "default_min_threshold")]
    pub min_stock_threshold: i64,
    #[serde(default = "default_max_threshold")]
    pub max_stock_threshold: i64,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_min_threshold() -> i64 {
    10
}
fn default_max_threshold() -> i64 {
    1000
}
fn default_unit() -> String {
    "pcs".to_string()
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Inventory figures for the stats cards.
#[derive(Debug, Serialize)]
pub struct InventoryStats {
    pub total_items: i64,
    pub total_value: f64,
    pub low_stock: i64,
    pub out_of_stock: i64,
}

const PRODUCT_COLUMNS: &str = "id, name, description, barcode, category_id, supplier_id, \
     unit_price, cost_price, current_stock, min_stock_threshold, max_stock_threshold, \
     unit, is_active, created_by, created_at, updated_at";

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    let current_stock: i64 = row.get(8)?;
    let min: i64 = row.get(9)?;
    let max: i64 = row.get(10)?;
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        barcode: row.get(3)?,
        category_id: row.get(4)?,
        supplier_id: row.get(5)?,
        unit_price: row.get(6)?,
        cost_price: row.get(7)?,
        current_stock,
        min_stock_threshold: min,
        max_stock_threshold: max,
        unit: row.get(11)?,
        is_active: row.get::<_, i64>(12)? != 0,
        created_by: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
        stock_status: Product::derive_status(current_stock, min, max),
    })
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

pub fn product_get_all(conn: &Connection) -> Result<Vec<Product>, String> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name COLLATE NOCASE"
        ))
        .map_err(|e| format!("products query: {e}"))?;
    let rows = stmt
        .query_map([], product_from_row)
        .map_err(|e| format!("products query: {e}"))?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn product_get(conn: &Connection, id: &str) -> Result<Option<Product>, String> {
    conn.query_row(
        &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"),
        params![id],
        product_from_row,
    )
    .optional()
    .map_err(|e| format!("product lookup: {e}"))
}

pub fn product_get_by_barcode(conn: &Connection, barcode: &str) -> Result<Option<Product>, String> {
    let code = barcode.trim();
    if code.is_empty() {
        return Ok(None);
    }
    conn.query_row(
        &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE barcode = ?1"),
        params![code],
        product_from_row,
    )
    .optional()
    .map_err(|e| format!("barcode lookup: {e}"))
}

/// Search by name or barcode substring, optionally restricted to a
/// category. `active_only` is what the POS screen uses; the inventory
/// screen passes false to manage deactivated products too.
pub fn product_search(
    conn: &Connection,
    query: &str,
    category_id: Option<&str>,
    active_only: bool,
) -> Result<Vec<Product>, String> {
    let pattern = format!("%{}%", query.trim());
    let category = category_id.unwrap_or("");
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE (name LIKE ?1 OR COALESCE(barcode, '') LIKE ?1)
               AND (?2 = '' OR category_id = ?2)
               AND (?3 = 0 OR is_active = 1)
             ORDER BY name COLLATE NOCASE"
        ))
        .map_err(|e| format!("product search: {e}"))?;
    let rows = stmt
        .query_map(
            params![pattern, category, active_only as i64],
            product_from_row,
        )
        .map_err(|e| format!("product search: {e}"))?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn product_create(
    conn: &Connection,
    input: &ProductInput,
    created_by: Option<&str>,
) -> Result<Product, String> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err("Product name is required".to_string());
    }
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO products (id, name, description, barcode, category_id, supplier_id,
            unit_price, cost_price, current_stock, min_stock_threshold, max_stock_threshold,
            unit, is_active, created_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            id,
            name,
            input.description,
            normalize_optional(&input.barcode),
            normalize_optional(&input.category_id),
            normalize_optional(&input.supplier_id),
            input.unit_price,
            input.cost_price,
            input.current_stock,
            input.min_stock_threshold,
            input.max_stock_threshold,
            input.unit,
            input.is_active as i64,
            created_by,
        ],
    )
    .map_err(|e| format!("product insert: {e}"))?;

    product_get(conn, &id)?.ok_or_else(|| "product vanished after insert".to_string())
}

pub fn product_update(
    conn: &Connection,
    id: &str,
    input: &ProductInput,
) -> Result<Product, String> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err("Product name is required".to_string());
    }
    let changed = conn
        .execute(
            "UPDATE products SET name = ?2, description = ?3, barcode = ?4,
                category_id = ?5, supplier_id = ?6, unit_price = ?7, cost_price = ?8,
                current_stock = ?9, min_stock_threshold = ?10, max_stock_threshold = ?11,
                unit = ?12, is_active = ?13, updated_at = datetime('now')
             WHERE id = ?1",
            params![
                id,
                name,
                input.description,
                normalize_optional(&input.barcode),
                normalize_optional(&input.category_id),
                normalize_optional(&input.supplier_id),
                input.unit_price,
                input.cost_price,
                input.current_stock,
                input.min_stock_threshold,
                input.max_stock_threshold,
                input.unit,
                input.is_active as i64,
            ],
        )
        .map_err(|e| format!("product update: {e}"))?;
    if changed == 0 {
        return Err("Product not found".to_string());
    }
    product_get(conn, id)?.ok_or_else(|| "Product not found".to_string())
}

/// Outcome of a product delete request.
#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    Deactivated,
}

/// Hard-delete a product, unless sales history references it — then the
/// row is deactivated instead so invoices keep resolving.
pub fn product_delete(conn: &Connection, id: &str) -> Result<DeleteOutcome, String> {
    let referenced: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sale_items WHERE product_id = ?1",
            params![id],
            |row| row.get(0),
        )
        .map_err(|e| format!("product references: {e}"))?;

    if referenced > 0 {
        let changed = conn
            .execute(
                "UPDATE products SET is_active = 0, updated_at = datetime('now') WHERE id = ?1",
                params![id],
            )
            .map_err(|e| format!("product deactivate: {e}"))?;
        if changed == 0 {
            return Err("Product not found".to_string());
        }
        return Ok(DeleteOutcome::Deactivated);
    }

    conn.execute("DELETE FROM stock_movements WHERE product_id = ?1", params![id])
        .map_err(|e| format!("product movement cleanup: {e}"))?;
    let changed = conn
        .execute("DELETE FROM products WHERE id = ?1", params![id])
        .map_err(|e| format!("product delete: {e}"))?;
    if changed == 0 {
        return Err("Product not found".to_string());
    }
    Ok(DeleteOutcome::Deleted)
}

/// Stats-card figures: item count, stock valuation at sale price, and the
/// low/out-of-stock counts.
pub fn inventory_stats(conn: &Connection) -> Result<InventoryStats, String> {
    conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(unit_price * current_stock), 0),
                COALESCE(SUM(CASE WHEN current_stock > 0 AND current_stock <= min_stock_threshold THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN current_stock <= 0 THEN 1 ELSE 0 END), 0)
         FROM products WHERE is_active = 1",
        [],
        |row| {
            Ok(InventoryStats {
                total_items: row.get(0)?,
                total_value: row.get(1)?,
                low_stock: row.get(2)?,
                out_of_stock: row.get(3)?,
            })
        },
    )
    .map_err(|e| format!("inventory stats: {e}"))
}

/// Active products at or below their minimum threshold, lowest ratio first.
pub fn low_stock_products(conn: &Connection, limit: i64) -> Result<Vec<Product>, String> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE is_active = 1 AND current_stock <= min_stock_threshold
             ORDER BY CAST(current_stock AS REAL) / MAX(min_stock_threshold, 1)
             LIMIT ?1"
        ))
        .map_err(|e| format!("low stock query: {e}"))?;
    let rows = stmt
        .query_map(params![limit], product_from_row)
        .map_err(|e| format!("low stock query: {e}"))?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

fn normalize_optional(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

pub fn category_get_all(conn: &Connection) -> Result<Vec<Category>, String> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, description, created_at, updated_at
             FROM categories ORDER BY name COLLATE NOCASE",
        )
        .map_err(|e| format!("categories query: {e}"))?;
    let rows = stmt
        .query_map([], category_from_row)
        .map_err(|e| format!("categories query: {e}"))?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn category_create(
    conn: &Connection,
    name: &str,
    description: Option<&str>,
) -> Result<Category, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Category name is required".to_string());
    }
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO categories (id, name, description) VALUES (?1, ?2, ?3)",
        params![id, name, description],
    )
    .map_err(|e| format!("category insert: {e}"))?;
    conn.query_row(
        "SELECT id, name, description, created_at, updated_at FROM categories WHERE id = ?1",
        params![id],
        category_from_row,
    )
    .map_err(|e| format!("category readback: {e}"))
}

pub fn category_update(
    conn: &Connection,
    id: &str,
    name: &str,
    description: Option<&str>,
) -> Result<(), String> {
    let changed = conn
        .execute(
            "UPDATE categories SET name = ?2, description = ?3, updated_at = datetime('now')
             WHERE id = ?1",
            params![id, name.trim(), description],
        )
        .map_err(|e| format!("category update: {e}"))?;
    if changed == 0 {
        return Err("Category not found".to_string());
    }
    Ok(())
}

pub fn category_delete(conn: &Connection, id: &str) -> Result<(), String> {
    let changed = conn
        .execute("DELETE FROM categories WHERE id = ?1", params![id])
        .map_err(|e| format!("category delete: {e}"))?;
    if changed == 0 {
        return Err("Category not found".to_string());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Suppliers
// ---------------------------------------------------------------------------

fn supplier_from_row(row: &Row<'_>) -> rusqlite::Result<Supplier> {
    Ok(Supplier {
        id: row.get(0)?,
        name: row.get(1)?,
        contact_person: row.get(2)?,
        phone: row.get(3)?,
        email: row.get(4)?,
        address: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupplierInput {
    pub name: String,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

pub fn supplier_get_all(conn: &Connection) -> Result<Vec<Supplier>, String> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, contact_person, phone, email, address, created_at, updated_at
             FROM suppliers ORDER BY name COLLATE NOCASE",
        )
        .map_err(|e| format!("suppliers query: {e}"))?;
    let rows = stmt
        .query_map([], supplier_from_row)
        .map_err(|e| format!("suppliers query: {e}"))?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn supplier_create(conn: &Connection, input: &SupplierInput) -> Result<Supplier, String> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err("Supplier name is required".to_string());
    }
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO suppliers (id, name, contact_person, phone, email, address)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            id,
            name,
            input.contact_person,
            input.phone,
            input.email,
            input.address
        ],
    )
    .map_err(|e| format!("supplier insert: {e}"))?;
    conn.query_row(
        "SELECT id, name, contact_person, phone, email, address, created_at, updated_at
         FROM suppliers WHERE id = ?1",
        params![id],
        supplier_from_row,
    )
    .map_err(|e| format!("supplier readback: {e}"))
}

pub fn supplier_update(conn: &Connection, id: &str, input: &SupplierInput) -> Result<(), String> {
    let changed = conn
        .execute(
            "UPDATE suppliers SET name = ?2, contact_person = ?3, phone = ?4, email = ?5,
                address = ?6, updated_at = datetime('now')
             WHERE id = ?1",
            params![
                id,
                input.name.trim(),
                input.contact_person,
                input.phone,
                input.email,
                input.address
            ],
        )
        .map_err(|e| format!("supplier update: {e}"))?;
    if changed == 0 {
        return Err("Supplier not found".to_string());
    }
    Ok(())
}

pub fn supplier_delete(conn: &Connection, id: &str) -> Result<(), String> {
    let changed = conn
        .execute("DELETE FROM suppliers WHERE id = ?1", params![id])
        .map_err(|e| format!("supplier delete: {e}"))?;
    if changed == 0 {
        return Err("Supplier not found".to_string());
    }
    Ok(())
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
        conn
    }

    fn sample_input(name: &str, stock: i64) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            description: None,
            barcode: None,
            category_id: None,
            supplier_id: None,
            unit_price: 4.49,
            cost_price: 3.10,
            current_stock: stock,
            min_stock_threshold: 10,
            max_stock_threshold: 100,
            unit: "pcs".to_string(),
            is_active: true,
        }
    }

    #[test]
    fn stock_status_derivation() {
        assert_eq!(Product::derive_status(0, 10, 100), StockStatus::OutOfStock);
        assert_eq!(Product::derive_status(-2, 10, 100), StockStatus::OutOfStock);
        assert_eq!(Product::derive_status(5, 10, 100), StockStatus::LowStock);
        assert_eq!(Product::derive_status(10, 10, 100), StockStatus::LowStock);
        assert_eq!(Product::derive_status(50, 10, 100), StockStatus::InStock);
        assert_eq!(Product::derive_status(100, 10, 100), StockStatus::InStock);
        assert_eq!(Product::derive_status(101, 10, 100), StockStatus::OverStock);
    }

    #[test]
    fn create_and_lookup_by_barcode() {
        let conn = test_db();
        let mut input = sample_input("Whole Milk", 40);
        input.barcode = Some(" 8901234 ".to_string());

        let created = product_create(&conn, &input, Some("user-1")).expect("create");
        assert_eq!(created.barcode.as_deref(), Some("8901234"));
        assert_eq!(created.stock_status, StockStatus::InStock);

        let found = product_get_by_barcode(&conn, "8901234")
            .expect("lookup")
            .expect("product exists");
        assert_eq!(found.id, created.id);

        assert!(product_get_by_barcode(&conn, "").expect("empty").is_none());
        assert!(product_get_by_barcode(&conn, "nope")
            .expect("missing")
            .is_none());
    }

    #[test]
    fn search_filters_inactive_for_pos() {
        let conn = test_db();
        let mut active = sample_input("Apple Juice", 40);
        active.barcode = Some("111".into());
        product_create(&conn, &active, None).expect("create active");

        let mut inactive = sample_input("Apple Cider", 40);
        inactive.is_active = false;
        product_create(&conn, &inactive, None).expect("create inactive");

        let pos = product_search(&conn, "apple", None, true).expect("pos search");
        assert_eq!(pos.len(), 1);
        assert_eq!(pos[0].name, "Apple Juice");

        let admin = product_search(&conn, "apple", None, false).expect("admin search");
        assert_eq!(admin.len(), 2);

        // Barcode substring also matches
        let by_code = product_search(&conn, "11", None, true).expect("barcode search");
        assert_eq!(by_code.len(), 1);
    }

    #[test]
    fn delete_deactivates_when_sold() {
        let conn = test_db();
        let product = product_create(&conn, &sample_input("Bread", 5), None).expect("create");

        conn.execute(
            "INSERT INTO sales (id, sale_number, cashier_id, payment_method)
             VALUES ('sale-1', 'S-20250101-0001', 'u1', 'cash')",
            [],
        )
        .expect("insert sale");
        conn.execute(
            "INSERT INTO sale_items (id, sale_id, product_id, product_name, quantity, unit_price, total_price)
             VALUES ('si-1', 'sale-1', ?1, 'Bread', 1, 2.29, 2.29)",
            params![product.id],
        )
        .expect("insert sale item");

        let outcome = product_delete(&conn, &product.id).expect("delete");
        assert_eq!(outcome, DeleteOutcome::Deactivated);

        let still = product_get(&conn, &product.id).expect("get").expect("row");
        assert!(!still.is_active);

        // Unreferenced product is hard-deleted
        let fresh = product_create(&conn, &sample_input("Eggs", 12), None).expect("create");
        assert_eq!(
            product_delete(&conn, &fresh.id).expect("delete"),
            DeleteOutcome::Deleted
        );
        assert!(product_get(&conn, &fresh.id).expect("get").is_none());
    }

    #[test]
    fn inventory_stats_counts_and_value() {
        let conn = test_db();
        product_create(&conn, &sample_input("A", 0), None).expect("out of stock");
        product_create(&conn, &sample_input("B", 5), None).expect("low");
        let mut normal = sample_input("C", 50);
        normal.unit_price = 2.0;
        product_create(&conn, &normal, None).expect("normal");

        let mut inactive = sample_input("D", 50);
        inactive.is_active = false;
        product_create(&conn, &inactive, None).expect("inactive excluded");

        let stats = inventory_stats(&conn).expect("stats");
        assert_eq!(stats.total_items, 3);
        assert_eq!(stats.out_of_stock, 1);
        assert_eq!(stats.low_stock, 1);
        // 0*4.49 + 5*4.49 + 50*2.0
        assert!((stats.total_value - (5.0 * 4.49 + 100.0)).abs() < 1e-9);
    }

    #[test]
    fn low_stock_list_ordered_by_severity() {
        let conn = test_db();
        product_create(&conn, &sample_input("Half", 5), None).expect("half");
        product_create(&conn, &sample_input("Empty", 0), None).expect("empty");
        product_create(&conn, &sample_input("Fine", 50), None).expect("fine");

        let low = low_stock_products(&conn, 10).expect("low stock");
        assert_eq!(low.len(), 2);
        assert_eq!(low[0].name, "Empty");
        assert_eq!(low[1].name, "Half");
    }

    #[test]
    fn category_crud_and_unique_name() {
        let conn = test_db();
        let cat = category_create(&conn, "Dairy", Some("Milk and cheese")).expect("create");
        assert!(category_create(&conn, "Dairy", None).is_err());

        category_update(&conn, &cat.id, "Dairy & Eggs", None).expect("update");
        let all = category_get_all(&conn).expect("list");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Dairy & Eggs");

        category_delete(&conn, &cat.id).expect("delete");
        assert!(category_get_all(&conn).expect("list").is_empty());
    }
}
