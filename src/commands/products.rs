//! Inventory screen commands: product/category/supplier CRUD, stock
//! adjustments, inventory stats, and the low-stock monitor.

use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tauri::Emitter;
use tracing::{info, warn};

use crate::stock::{self, MovementRef, MovementType};
use crate::{auth, catalog, db};

const LOW_STOCK_MONITOR_MIN_INTERVAL_SECS: u64 = 60;

#[tauri::command]
pub async fn product_get_all(db: tauri::State<'_, db::DbState>) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let products = catalog::product_get_all(&conn)?;
    Ok(serde_json::json!(products))
}

#[tauri::command]
pub async fn product_search(
    query: Option<String>,
    category_id: Option<String>,
    active_only: Option<bool>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let products = catalog::product_search(
        &conn,
        query.as_deref().unwrap_or(""),
        category_id.as_deref().filter(|c| !c.is_empty()),
        active_only.unwrap_or(false),
    )?;
    Ok(serde_json::json!(products))
}

#[tauri::command]
pub async fn product_get_by_barcode(
    barcode: String,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    Ok(catalog::product_get_by_barcode(&conn, &barcode)?
        .map(|p| serde_json::json!(p))
        .unwrap_or(Value::Null))
}

#[tauri::command]
pub async fn product_create(
    product: catalog::ProductInput,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
    app: tauri::AppHandle,
) -> Result<Value, String> {
    let created_by = auth::current_user_id(&auth_state)?;
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let created = catalog::product_create(&conn, &product, created_by.as_deref())?;
    let _ = app.emit("product_created", serde_json::json!(&created));
    Ok(serde_json::json!({ "success": true, "data": created }))
}

#[tauri::command]
pub async fn product_update(
    id: String,
    product: catalog::ProductInput,
    db: tauri::State<'_, db::DbState>,
    app: tauri::AppHandle,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let updated = catalog::product_update(&conn, &id, &product)?;
    let _ = app.emit("product_updated", serde_json::json!(&updated));
    Ok(serde_json::json!({ "success": true, "data": updated }))
}

#[tauri::command]
pub async fn product_delete(
    id: String,
    db: tauri::State<'_, db::DbState>,
    app: tauri::AppHandle,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let outcome = catalog::product_delete(&conn, &id)?;
    let _ = app.emit("product_deleted", serde_json::json!({ "id": id }));
    Ok(serde_json::json!({ "success": true, "outcome": outcome }))
}

#[tauri::command]
pub async fn inventory_get_stats(db: tauri::State<'_, db::DbState>) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let stats = catalog::inventory_stats(&conn)?;
    Ok(serde_json::json!(stats))
}

#[tauri::command]
pub async fn inventory_get_low_stock(
    limit: Option<i64>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let products = catalog::low_stock_products(&conn, limit.unwrap_or(10))?;
    Ok(serde_json::json!(products))
}

/// The `update_product_stock` RPC: signed quantity change plus a movement
/// record, atomically.
#[tauri::command]
pub async fn stock_adjust(
    product_id: String,
    quantity_change: i64,
    movement_type: String,
    notes: Option<String>,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
    app: tauri::AppHandle,
) -> Result<Value, String> {
    let created_by = auth::current_user_id(&auth_state)?.unwrap_or_else(|| "system".to_string());
    let movement = MovementType::parse(&movement_type).map_err(|e| e.to_string())?;

    let mut conn = db.conn.lock().map_err(|e| e.to_string())?;
    let new_stock = stock::adjust_stock(
        &mut conn,
        &product_id,
        quantity_change,
        movement,
        MovementRef {
            notes: notes.as_deref(),
            ..Default::default()
        },
        &created_by,
    )
    .map_err(|e| e.to_string())?;

    let _ = app.emit(
        "stock_adjusted",
        serde_json::json!({ "productId": product_id, "currentStock": new_stock }),
    );
    Ok(serde_json::json!({ "success": true, "currentStock": new_stock }))
}

#[tauri::command]
pub async fn stock_get_movements(
    product_id: String,
    limit: Option<i64>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let movements = stock::movement_history(&conn, &product_id, limit.unwrap_or(50))?;
    Ok(serde_json::json!(movements))
}

// -- Categories --------------------------------------------------------------

#[tauri::command]
pub async fn category_get_all(db: tauri::State<'_, db::DbState>) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    Ok(serde_json::json!(catalog::category_get_all(&conn)?))
}

#[tauri::command]
pub async fn category_create(
    name: String,
    description: Option<String>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let created = catalog::category_create(&conn, &name, description.as_deref())?;
    Ok(serde_json::json!({ "success": true, "data": created }))
}

#[tauri::command]
pub async fn category_update(
    id: String,
    name: String,
    description: Option<String>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    catalog::category_update(&conn, &id, &name, description.as_deref())?;
    Ok(serde_json::json!({ "success": true }))
}

#[tauri::command]
pub async fn category_delete(
    id: String,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    catalog::category_delete(&conn, &id)?;
    Ok(serde_json::json!({ "success": true }))
}

// -- Suppliers ---------------------------------------------------------------

#[tauri::command]
pub async fn supplier_get_all(db: tauri::State<'_, db::DbState>) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    Ok(serde_json::json!(catalog::supplier_get_all(&conn)?))
}

#[tauri::command]
pub async fn supplier_create(
    supplier: catalog::SupplierInput,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let created = catalog::supplier_create(&conn, &supplier)?;
    Ok(serde_json::json!({ "success": true, "data": created }))
}

#[tauri::command]
pub async fn supplier_update(
    id: String,
    supplier: catalog::SupplierInput,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    catalog::supplier_update(&conn, &id, &supplier)?;
    Ok(serde_json::json!({ "success": true }))
}

#[tauri::command]
pub async fn supplier_delete(
    id: String,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    catalog::supplier_delete(&conn, &id)?;
    Ok(serde_json::json!({ "success": true }))
}

// -- Low-stock monitor -------------------------------------------------------

/// Background low-stock monitor: emits `low_stock_alert` whenever the set
/// of products at or below their minimum threshold changes.
pub fn start_low_stock_monitor(app: tauri::AppHandle, db: Arc<db::DbState>, interval_secs: u64) {
    let cadence = Duration::from_secs(interval_secs.max(LOW_STOCK_MONITOR_MIN_INTERVAL_SECS));

    tauri::async_runtime::spawn(async move {
        info!(
            interval_secs = cadence.as_secs(),
            "Starting low-stock monitor"
        );
        let mut last_alerted: HashSet<String> = HashSet::new();

        loop {
            let snapshot = {
                let conn = match db.conn.lock() {
                    Ok(c) => c,
                    Err(e) => {
                        warn!(error = %e, "Low-stock monitor: db lock poisoned");
                        break;
                    }
                };
                catalog::low_stock_products(&conn, 100)
            };

            match snapshot {
                Ok(products) => {
                    let current: HashSet<String> =
                        products.iter().map(|p| p.id.clone()).collect();
                    if current != last_alerted && !current.is_empty() {
                        let _ = app.emit(
                            "low_stock_alert",
                            serde_json::json!({
                                "count": products.len(),
                                "products": products,
                            }),
                        );
                    }
                    last_alerted = current;
                }
                Err(e) => warn!(error = %e, "Low-stock monitor query failed"),
            }

            tokio::time::sleep(cadence).await;
        }
    });
}
