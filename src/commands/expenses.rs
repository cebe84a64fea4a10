//! Finance screen commands: expense CRUD, filters, summary, CSV export.

use serde_json::Value;
use tauri::Emitter;

use crate::expenses::{DateFilter, ExpenseInput, EXPENSE_CATEGORIES};
use crate::{auth, csv, db, expenses};

#[tauri::command]
pub async fn expense_get_all(
    search: Option<String>,
    category: Option<String>,
    date_filter: Option<String>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let rows = expenses::expense_list(
        &conn,
        search.as_deref().unwrap_or(""),
        category.as_deref().filter(|c| !c.is_empty() && *c != "all"),
        DateFilter::parse(date_filter.as_deref().unwrap_or("all")),
    )?;
    Ok(serde_json::json!(rows))
}

#[tauri::command]
pub async fn expense_get_categories() -> Result<Value, String> {
    Ok(serde_json::json!(EXPENSE_CATEGORIES))
}

#[tauri::command]
pub async fn expense_create(
    expense: ExpenseInput,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
    app: tauri::AppHandle,
) -> Result<Value, String> {
    let created_by =
        auth::current_user_id(&auth_state)?.ok_or_else(|| "Not logged in".to_string())?;
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let created = expenses::expense_create(&conn, &expense, &created_by)?;
    let _ = app.emit("expense_created", serde_json::json!(&created));
    Ok(serde_json::json!({ "success": true, "data": created }))
}

#[tauri::command]
pub async fn expense_update(
    id: String,
    expense: ExpenseInput,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    expenses::expense_update(&conn, &id, &expense)?;
    Ok(serde_json::json!({ "success": true }))
}

#[tauri::command]
pub async fn expense_delete(
    id: String,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    expenses::expense_delete(&conn, &id)?;
    Ok(serde_json::json!({ "success": true }))
}

#[tauri::command]
pub async fn expense_get_summary(db: tauri::State<'_, db::DbState>) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    Ok(serde_json::json!(expenses::expense_summary(&conn)?))
}

/// Export the currently filtered expenses as CSV text (Date, Description,
/// Category, Amount — the finance screen's column set).
#[tauri::command]
pub async fn expense_export_csv(
    search: Option<String>,
    category: Option<String>,
    date_filter: Option<String>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let rows = expenses::expense_list(
        &conn,
        search.as_deref().unwrap_or(""),
        category.as_deref().filter(|c| !c.is_empty() && *c != "all"),
        DateFilter::parse(date_filter.as_deref().unwrap_or("all")),
    )?;

    let data: Vec<Vec<String>> = rows
        .iter()
        .map(|e| {
            vec![
                e.expense_date.clone(),
                e.description.clone(),
                e.category.clone(),
                e.amount.to_string(),
            ]
        })
        .collect();
    Ok(serde_json::json!({
        "filename": format!("expenses-{}.csv", chrono::Local::now().format("%Y-%m-%d")),
        "content": csv::emit(&["Date", "Description", "Category", "Amount"], &data),
    }))
}
