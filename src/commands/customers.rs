//! Customer commands used by the POS and customer management dialogs.

use serde_json::Value;
use tauri::Emitter;

use crate::{customers, db};

#[tauri::command]
pub async fn customer_get_all(db: tauri::State<'_, db::DbState>) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    Ok(serde_json::json!(customers::customer_get_all(&conn)?))
}

#[tauri::command]
pub async fn customer_search(
    query: String,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    Ok(serde_json::json!(customers::customer_search(&conn, &query)?))
}

#[tauri::command]
pub async fn customer_create(
    customer: customers::CustomerInput,
    db: tauri::State<'_, db::DbState>,
    app: tauri::AppHandle,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let created = customers::customer_create(&conn, &customer)?;
    let _ = app.emit("customer_created", serde_json::json!(&created));
    Ok(serde_json::json!({ "success": true, "data": created }))
}

#[tauri::command]
pub async fn customer_update(
    id: String,
    customer: customers::CustomerInput,
    db: tauri::State<'_, db::DbState>,
    app: tauri::AppHandle,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    customers::customer_update(&conn, &id, &customer)?;
    let _ = app.emit("customer_updated", serde_json::json!({ "id": id }));
    Ok(serde_json::json!({ "success": true }))
}

#[tauri::command]
pub async fn customer_delete(
    id: String,
    db: tauri::State<'_, db::DbState>,
    app: tauri::AppHandle,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    customers::customer_delete(&conn, &id)?;
    let _ = app.emit("customer_deleted", serde_json::json!({ "id": id }));
    Ok(serde_json::json!({ "success": true }))
}
