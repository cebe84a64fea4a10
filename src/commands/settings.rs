//! Settings commands: store profile, tax rate, scanner configuration.

use serde_json::Value;

use crate::db;

#[tauri::command]
pub async fn settings_get_store_profile(
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    Ok(serde_json::json!({
        "name": db::get_setting(&conn, "store", "name").unwrap_or_else(|| "POS SYSTEM".into()),
        "address": db::get_setting(&conn, "store", "address").unwrap_or_default(),
        "phone": db::get_setting(&conn, "store", "phone").unwrap_or_default(),
    }))
}

#[tauri::command]
pub async fn settings_set_store_profile(
    name: String,
    address: Option<String>,
    phone: Option<String>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    db::set_setting(&conn, "store", "name", name.trim())?;
    db::set_setting(&conn, "store", "address", address.as_deref().unwrap_or(""))?;
    db::set_setting(&conn, "store", "phone", phone.as_deref().unwrap_or(""))?;
    Ok(serde_json::json!({ "success": true }))
}

#[tauri::command]
pub async fn settings_get_tax_rate(db: tauri::State<'_, db::DbState>) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    Ok(serde_json::json!(db::get_tax_rate(&conn)))
}

#[tauri::command]
pub async fn settings_set_tax_rate(
    rate: f64,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    if !(0.0..1.0).contains(&rate) {
        return Err("Tax rate must be a fraction between 0 and 1".to_string());
    }
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    db::set_setting(&conn, "general", "tax_rate", &rate.to_string())?;
    Ok(serde_json::json!({ "success": true }))
}

#[tauri::command]
pub async fn settings_get_scanner(db: tauri::State<'_, db::DbState>) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    Ok(serde_json::json!({
        "port": db::get_setting(&conn, "scanner", "port").unwrap_or_default(),
        "baudRate": db::get_setting(&conn, "scanner", "baud_rate")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(9600),
    }))
}

#[tauri::command]
pub async fn settings_set_scanner(
    port: String,
    baud_rate: Option<u32>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    db::set_setting(&conn, "scanner", "port", port.trim())?;
    db::set_setting(
        &conn,
        "scanner",
        "baud_rate",
        &baud_rate.unwrap_or(9600).to_string(),
    )?;
    Ok(serde_json::json!({ "success": true }))
}
