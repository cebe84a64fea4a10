//! CSV import/export commands for the import/export dialog.
//!
//! Import inserts all rows of a file in one transaction, matching the
//! dialog's bulk-insert behavior: a bad row fails the whole file.

use rusqlite::{params, Connection};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::{auth, csv, db};

/// Header sets offered as downloadable templates.
fn template_headers(kind: &str) -> Result<&'static [&'static str], String> {
    match kind {
        "products" => Ok(&[
            "name",
            "description",
            "unit_price",
            "cost_price",
            "current_stock",
            "unit",
            "barcode",
        ]),
        "expenses" => Ok(&["description", "amount", "category", "expense_date"]),
        "categories" => Ok(&["name", "description"]),
        other => Err(format!("Unsupported import type: {other}")),
    }
}

fn import_products(conn: &Connection, doc: &csv::CsvDocument) -> Result<usize, String> {
    for row in &doc.rows {
        let name = doc
            .value(row, "name")
            .ok_or_else(|| "Row is missing a product name".to_string())?;
        conn.execute(
            "INSERT INTO products (id, name, description, barcode, unit_price, cost_price,
                current_stock, min_stock_threshold, max_stock_threshold, unit)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                Uuid::new_v4().to_string(),
                name,
                doc.value(row, "description"),
                doc.value(row, "barcode"),
                parse_f64(doc.value(row, "unit_price")),
                parse_f64(doc.value(row, "cost_price")),
                parse_i64(doc.value(row, "current_stock"), 0),
                parse_i64(doc.value(row, "min_stock_threshold"), 10),
                parse_i64(doc.value(row, "max_stock_threshold"), 1000),
                doc.value(row, "unit").unwrap_or_else(|| "pcs".to_string()),
            ],
        )
        .map_err(|e| format!("product row: {e}"))?;
    }
    Ok(doc.rows.len())
}

fn import_expenses(
    conn: &Connection,
    doc: &csv::CsvDocument,
    created_by: &str,
) -> Result<usize, String> {
    for row in &doc.rows {
        let description = doc
            .value(row, "description")
            .ok_or_else(|| "Row is missing a description".to_string())?;
        let category = doc
            .value(row, "category")
            .ok_or_else(|| "Row is missing a category".to_string())?;
        let expense_date = doc
            .value(row, "expense_date")
            .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
        conn.execute(
            "INSERT INTO expenses (id, description, amount, category, expense_date, created_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                Uuid::new_v4().to_string(),
                description,
                parse_f64(doc.value(row, "amount")),
                category,
                expense_date,
                created_by,
            ],
        )
        .map_err(|e| format!("expense row: {e}"))?;
    }
    Ok(doc.rows.len())
}

fn import_categories(conn: &Connection, doc: &csv::CsvDocument) -> Result<usize, String> {
    for row in &doc.rows {
        let name = doc
            .value(row, "name")
            .ok_or_else(|| "Row is missing a category name".to_string())?;
        conn.execute(
            "INSERT INTO categories (id, name, description) VALUES (?1, ?2, ?3)",
            params![
                Uuid::new_v4().to_string(),
                name,
                doc.value(row, "description"),
            ],
        )
        .map_err(|e| format!("category row: {e}"))?;
    }
    Ok(doc.rows.len())
}

fn parse_f64(value: Option<String>) -> f64 {
    value.and_then(|v| v.parse::<f64>().ok()).unwrap_or(0.0)
}

fn parse_i64(value: Option<String>, default: i64) -> i64 {
    value
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}

/// Import a CSV file's rows into the given table family.
#[tauri::command]
pub async fn import_data(
    kind: String,
    text: String,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<Value, String> {
    template_headers(&kind)?;
    let doc = csv::parse(&text)?;

    let created_by =
        auth::current_user_id(&auth_state)?.unwrap_or_else(|| "system".to_string());

    let mut conn = db.conn.lock().map_err(|e| e.to_string())?;
    let tx = conn.transaction().map_err(|e| format!("import tx: {e}"))?;

    let imported = match kind.as_str() {
        "products" => import_products(&tx, &doc)?,
        "expenses" => import_expenses(&tx, &doc, &created_by)?,
        "categories" => import_categories(&tx, &doc)?,
        _ => unreachable!("kind validated above"),
    };

    tx.commit().map_err(|e| format!("import commit: {e}"))?;
    info!(kind = %kind, imported, "CSV import completed");
    Ok(serde_json::json!({ "success": true, "imported": imported }))
}

fn export_query(kind: &str) -> Result<(&'static str, &'static [&'static str]), String> {
    match kind {
        // Products export the catalog-facing columns, not internal flags
        "products" => Ok((
            "SELECT name, description, unit_price, cost_price, current_stock, unit, barcode,
                    min_stock_threshold, max_stock_threshold, created_at
             FROM products ORDER BY name COLLATE NOCASE",
            &[
                "name",
                "description",
                "unit_price",
                "cost_price",
                "current_stock",
                "unit",
                "barcode",
                "min_stock_threshold",
                "max_stock_threshold",
                "created_at",
            ],
        )),
        "sales" => Ok((
            "SELECT sale_number, created_at, subtotal, tax_amount, discount_amount,
                    total_amount, payment_method, customer_name
             FROM sales ORDER BY created_at",
            &[
                "sale_number",
                "created_at",
                "subtotal",
                "tax_amount",
                "discount_amount",
                "total_amount",
                "payment_method",
                "customer_name",
            ],
        )),
        "expenses" => Ok((
            "SELECT expense_date, description, category, amount, created_by, created_at
             FROM expenses ORDER BY expense_date",
            &[
                "expense_date",
                "description",
                "category",
                "amount",
                "created_by",
                "created_at",
            ],
        )),
        "categories" => Ok((
            "SELECT name, description, created_at FROM categories ORDER BY name COLLATE NOCASE",
            &["name", "description", "created_at"],
        )),
        other => Err(format!("Unsupported export type: {other}")),
    }
}

/// Export a table as CSV text. NULL columns become empty fields.
#[tauri::command]
pub async fn export_data(kind: String, db: tauri::State<'_, db::DbState>) -> Result<Value, String> {
    let (sql, headers) = export_query(&kind)?;
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let mut stmt = conn.prepare(sql).map_err(|e| format!("export query: {e}"))?;
    let column_count = headers.len();
    let rows: Vec<Vec<String>> = stmt
        .query_map([], |row| {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                let value = match row.get_ref(i)? {
                    rusqlite::types::ValueRef::Null => String::new(),
                    rusqlite::types::ValueRef::Integer(v) => v.to_string(),
                    rusqlite::types::ValueRef::Real(v) => v.to_string(),
                    rusqlite::types::ValueRef::Text(t) => {
                        String::from_utf8_lossy(t).to_string()
                    }
                    rusqlite::types::ValueRef::Blob(_) => String::new(),
                };
                values.push(value);
            }
            Ok(values)
        })
        .map_err(|e| format!("export rows: {e}"))?
        .filter_map(|r| r.ok())
        .collect();

    if rows.is_empty() {
        return Err(format!("No {kind} found to export"));
    }

    Ok(serde_json::json!({
        "filename": format!(
            "{kind}-export-{}.csv",
            chrono::Local::now().format("%Y-%m-%d")
        ),
        "content": csv::emit(headers, &rows),
        "count": rows.len(),
    }))
}

/// Header-only CSV template for an import type.
#[tauri::command]
pub async fn export_template(kind: String) -> Result<Value, String> {
    let headers = template_headers(&kind)?;
    Ok(serde_json::json!({
        "filename": format!("{kind}-template.csv"),
        "content": headers.join(","),
    }))
}
