//! Customer records the POS attaches to sales.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerInput {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

fn customer_from_row(row: &Row<'_>) -> rusqlite::Result<Customer> {
    Ok(Customer {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        email: row.get(3)?,
        address: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

const CUSTOMER_COLUMNS: &str = "id, name, phone, email, address, created_at, updated_at";

pub fn customer_get_all(conn: &Connection) -> Result<Vec<Customer>, String> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY name COLLATE NOCASE"
        ))
        .map_err(|e| format!("customers query: {e}"))?;
    let rows = stmt
        .query_map([], customer_from_row)
        .map_err(|e| format!("customers query: {e}"))?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

/// Substring search across name, phone, and email.
pub fn customer_search(conn: &Connection, query: &str) -> Result<Vec<Customer>, String> {
    let pattern = format!("%{}%", query.trim().to_lowercase());
    if pattern == "%%" {
        return Ok(Vec::new());
    }
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers
             WHERE lower(name) LIKE ?1
                OR lower(COALESCE(phone, '')) LIKE ?1
                OR lower(COALESCE(email, '')) LIKE ?1
             ORDER BY name COLLATE NOCASE"
        ))
        .map_err(|e| format!("customer search: {e}"))?;
    let rows = stmt
        .query_map(params![pattern], customer_from_row)
        .map_err(|e| format!("customer search: {e}"))?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn customer_create(conn: &Connection, input: &CustomerInput) -> Result<Customer, String> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err("Customer name is required".to_string());
    }
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO customers (id, name, phone, email, address) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, name, input.phone, input.email, input.address],
    )
    .map_err(|e| format!("customer insert: {e}"))?;
    conn.query_row(
        &format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"),
        params![id],
        customer_from_row,
    )
    .map_err(|e| format!("customer readback: {e}"))
}

pub fn customer_update(conn: &Connection, id: &str, input: &CustomerInput) -> Result<(), String> {
    let changed = conn
        .execute(
            "UPDATE customers SET name = ?2, phone = ?3, email = ?4, address = ?5,
                updated_at = datetime('now')
             WHERE id = ?1",
            params![id, input.name.trim(), input.phone, input.email, input.address],
        )
        .map_err(|e| format!("customer update: {e}"))?;
    if changed == 0 {
        return Err("Customer not found".to_string());
    }
    Ok(())
}

/// Delete a customer. Sales keep their copied name/phone; the FK nulls
/// the reference.
pub fn customer_delete(conn: &Connection, id: &str) -> Result<(), String> {
    let changed = conn
        .execute("DELETE FROM customers WHERE id = ?1", params![id])
        .map_err(|e| format!("customer delete: {e}"))?;
    if changed == 0 {
        return Err("Customer not found".to_string());
    }
    Ok(())
}

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

    fn input(name: &str, phone: Option<&str>) -> CustomerInput {
        CustomerInput {
            name: name.to_string(),
            phone: phone.map(str::to_string),
            email: None,
            address: None,
        }
    }

    #[test]
    fn create_search_update_delete() {
        let conn = test_db();
        let created =
            customer_create(&conn, &input("John Smith", Some("0301-1234567"))).expect("create");

        let by_name = customer_search(&conn, "john").expect("search");
        assert_eq!(by_name.len(), 1);
        let by_phone = customer_search(&conn, "1234").expect("search");
        assert_eq!(by_phone.len(), 1);
        assert!(customer_search(&conn, "").expect("empty").is_empty());

        customer_update(&conn, &created.id, &input("John A. Smith", None)).expect("update");
        assert_eq!(customer_get_all(&conn).expect("all")[0].name, "John A. Smith");

        customer_delete(&conn, &created.id).expect("delete");
        assert!(customer_get_all(&conn).expect("all").is_empty());
    }

    #[test]
    fn deleting_customer_keeps_sale_denormalized_name() {
        let conn = test_db();
        let created = customer_create(&conn, &input("Sarah Johnson", None)).expect("create");
        conn.execute(
            "INSERT INTO sales (id, sale_number, cashier_id, customer_id, customer_name, payment_method)
             VALUES ('s1', 'S-20250101-0001', 'u1', ?1, 'Sarah Johnson', 'cash')",
            params![created.id],
        )
        .expect("insert sale");

        customer_delete(&conn, &created.id).expect("delete");

        let (customer_id, customer_name): (Option<String>, Option<String>) = conn
            .query_row(
                "SELECT customer_id, customer_name FROM sales WHERE id = 's1'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .expect("read sale");
        assert_eq!(customer_id, None, "FK should null on delete");
        assert_eq!(customer_name.as_deref(), Some("Sarah Johnson"));
    }

    #[test]
    fn blank_name_rejected() {
        let conn = test_db();
        assert!(customer_create(&conn, &input("  ", None)).is_err());
    }
}
