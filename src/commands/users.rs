//! Users screen commands. Every mutation here is admin-gated, matching
//! the route guard on the screen itself.

use serde_json::Value;

use crate::users::{ProfileInput, Role};
use crate::{auth, db, users};

fn require_admin(auth_state: &auth::AuthState) -> Result<(), String> {
    if auth::has_role(auth_state, Role::Admin)? {
        Ok(())
    } else {
        Err("Admin role required".to_string())
    }
}

#[tauri::command]
pub async fn user_get_all(
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<Value, String> {
    require_admin(&auth_state)?;
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    Ok(serde_json::json!(users::profile_list(&conn)?))
}

#[tauri::command]
pub async fn user_create(
    profile: ProfileInput,
    pin: Option<String>,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<Value, String> {
    require_admin(&auth_state)?;
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let created = users::profile_create(&conn, &profile, pin.as_deref())?;
    Ok(serde_json::json!({ "success": true, "data": created }))
}

#[tauri::command]
pub async fn user_update(
    id: String,
    profile: ProfileInput,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<Value, String> {
    require_admin(&auth_state)?;
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    users::profile_update(&conn, &id, &profile)?;
    Ok(serde_json::json!({ "success": true }))
}

#[tauri::command]
pub async fn user_set_pin(
    id: String,
    pin: String,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<Value, String> {
    require_admin(&auth_state)?;
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    users::profile_set_pin(&conn, &id, &pin)?;
    Ok(serde_json::json!({ "success": true }))
}

#[tauri::command]
pub async fn user_deactivate(
    id: String,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<Value, String> {
    require_admin(&auth_state)?;
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    users::profile_deactivate(&conn, &id)?;
    Ok(serde_json::json!({ "success": true }))
}

/// The `get_user_role` accessor for an arbitrary user.
#[tauri::command]
pub async fn user_get_role(
    user_id: String,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    Ok(users::get_user_role(&conn, &user_id)?
        .map(|role| serde_json::json!(role.as_str()))
        .unwrap_or(Value::Null))
}
