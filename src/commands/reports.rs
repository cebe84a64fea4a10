//! Dashboard, analytics, and profit & loss commands.

use chrono::Utc;
use serde_json::Value;

use crate::reports::{self, Timeframe};
use crate::db;

fn resolve_date(date: Option<String>) -> String {
    date.map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string())
}

#[tauri::command]
pub async fn report_get_today_stats(
    date: Option<String>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let stats = reports::today_stats(&conn, &resolve_date(date))?;
    Ok(serde_json::json!(stats))
}

#[tauri::command]
pub async fn report_get_recent_transactions(
    limit: Option<i64>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let rows = reports::recent_transactions(&conn, limit.unwrap_or(10))?;
    Ok(serde_json::json!(rows))
}

#[tauri::command]
pub async fn report_get_sales_trend(
    days: Option<i64>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let trend = reports::sales_trend(&conn, days.unwrap_or(7))?;
    Ok(serde_json::json!(trend))
}

#[tauri::command]
pub async fn report_get_top_products(
    days: Option<i64>,
    limit: Option<i64>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let top = reports::top_products(&conn, days.unwrap_or(7), limit.unwrap_or(5))?;
    Ok(serde_json::json!(top))
}

#[tauri::command]
pub async fn report_get_payment_breakdown(
    days: Option<i64>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let breakdown = reports::payment_breakdown(&conn, days.unwrap_or(7))?;
    Ok(serde_json::json!(breakdown))
}

/// Today's profit & loss snapshot for the real-time tab.
#[tauri::command]
pub async fn report_get_profit_loss_realtime(
    date: Option<String>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let snapshot = reports::profit_loss_realtime(&conn, &resolve_date(date))?;
    Ok(serde_json::json!(snapshot))
}

/// Bucketed profit & loss table (7 daily / 4 weekly / 12 monthly).
#[tauri::command]
pub async fn report_get_profit_loss_periods(
    timeframe: Option<String>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let rows =
        reports::profit_loss_periods(&conn, Timeframe::parse(timeframe.as_deref().unwrap_or("daily")))?;
    Ok(serde_json::json!(rows))
}

/// CSV export of the profit & loss table.
#[tauri::command]
pub async fn report_export_profit_loss(
    timeframe: Option<String>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let timeframe_name = timeframe.as_deref().unwrap_or("daily").to_string();
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let rows = reports::profit_loss_periods(&conn, Timeframe::parse(&timeframe_name))?;
    Ok(serde_json::json!({
        "filename": format!(
            "profit-loss-{timeframe_name}-{}.csv",
            Utc::now().format("%Y%m%d%H%M%S")
        ),
        "content": reports::profit_loss_csv(&rows),
    }))
}
