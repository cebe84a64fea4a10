//! Serial barcode scanner commands.

use serde_json::Value;

use crate::{db, scanner, serial};

#[tauri::command]
pub async fn serial_list_ports() -> Result<Value, String> {
    Ok(serde_json::json!(serial::list_ports()?))
}

/// Start the serial scanner. Port/baud fall back to the saved scanner
/// settings when not supplied.
#[tauri::command]
pub async fn scanner_serial_start(
    port: Option<String>,
    baud_rate: Option<u32>,
    db: tauri::State<'_, db::DbState>,
    app: tauri::AppHandle,
) -> Result<Value, String> {
    let (saved_port, saved_baud) = {
        let conn = db.conn.lock().map_err(|e| e.to_string())?;
        (
            db::get_setting(&conn, "scanner", "port"),
            db::get_setting(&conn, "scanner", "baud_rate")
                .and_then(|v| v.parse::<u32>().ok()),
        )
    };

    let port = port
        .filter(|p| !p.trim().is_empty())
        .or(saved_port)
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| "No scanner port configured".to_string())?;
    let baud_rate = baud_rate.or(saved_baud).unwrap_or(9600);

    scanner::start(&port, baud_rate, app)
}

#[tauri::command]
pub async fn scanner_serial_stop() -> Result<Value, String> {
    scanner::stop()
}

#[tauri::command]
pub async fn scanner_serial_status() -> Result<Value, String> {
    Ok(scanner::status())
}
