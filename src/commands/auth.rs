//! Authentication commands backing the login screen and route guards.

use serde_json::Value;

use crate::users::Role;
use crate::{auth, db, users};

#[tauri::command]
pub async fn auth_login(
    user_id: String,
    pin: String,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let user = auth::login(&conn, &auth_state, &user_id, &pin)?;
    Ok(serde_json::json!({ "success": true, "user": user }))
}

#[tauri::command]
pub async fn auth_logout(auth_state: tauri::State<'_, auth::AuthState>) -> Result<Value, String> {
    auth::logout(&auth_state)?;
    Ok(serde_json::json!({ "success": true }))
}

/// The `auth.getUser` accessor: current user or null.
#[tauri::command]
pub async fn auth_get_current(
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<Value, String> {
    Ok(auth::current_user(&auth_state)?.unwrap_or(Value::Null))
}

#[tauri::command]
pub async fn auth_has_permission(
    permission: String,
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<bool, String> {
    auth::has_permission(&auth_state, &permission)
}

/// Route-guard check: does the current user's role satisfy `role`?
#[tauri::command]
pub async fn auth_has_role(
    role: String,
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<bool, String> {
    let required = Role::parse(&role)?;
    auth::has_role(&auth_state, required)
}

#[tauri::command]
pub async fn auth_track_activity(
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<Value, String> {
    auth::track_activity(&auth_state)?;
    Ok(serde_json::json!({ "success": true }))
}

/// Change the calling user's own PIN.
#[tauri::command]
pub async fn auth_change_pin(
    pin: String,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<Value, String> {
    let user_id =
        auth::current_user_id(&auth_state)?.ok_or_else(|| "Not logged in".to_string())?;
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let profile = users::profile_get_by_user(&conn, &user_id)?
        .ok_or_else(|| "Profile not found".to_string())?;
    users::profile_set_pin(&conn, &profile.id, &pin)?;
    Ok(serde_json::json!({ "success": true }))
}
