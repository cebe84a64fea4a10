//! PIN-based local authentication with bcrypt.
//!
//! Login verifies a profile's PIN hash, creates an in-memory session, and
//! tracks failed-attempt lockout. Sessions expire on inactivity or at the
//! absolute ceiling; the current session drives the `auth_get_current`
//! accessor every screen guard calls.

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::users::{self, Role};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MAX_FAILED_ATTEMPTS: u32 = 5;
const LOCKOUT_MINUTES: i64 = 15;
const SESSION_INACTIVITY_MINUTES: i64 = 30;
const SESSION_MAX_DURATION_HOURS: i64 = 8;

/// Permissions granted to administrators.
const ADMIN_PERMISSIONS: &[&str] = &[
    "view_dashboard",
    "process_sales",
    "manage_inventory",
    "manage_expenses",
    "view_reports",
    "manage_users",
    "system_settings",
];

/// Permissions granted to managers.
const MANAGER_PERMISSIONS: &[&str] = &[
    "view_dashboard",
    "process_sales",
    "manage_inventory",
    "manage_expenses",
    "view_reports",
    "system_settings",
];

/// Permissions granted to cashiers.
const CASHIER_PERMISSIONS: &[&str] = &["view_dashboard", "process_sales"];

/// Permissions granted to inventory staff.
const INVENTORY_PERMISSIONS: &[&str] = &["view_dashboard", "manage_inventory"];

fn permissions_for(role: Role) -> Vec<String> {
    let slice = match role {
        Role::Admin => ADMIN_PERMISSIONS,
        Role::Manager => MANAGER_PERMISSIONS,
        Role::Cashier => CASHIER_PERMISSIONS,
        Role::InventoryStaff => INVENTORY_PERMISSIONS,
    };
    slice.iter().map(|p| p.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// An active user session.
#[derive(Clone)]
struct Session {
    session_id: String,
    user_id: String,
    display_name: String,
    role: Role,
    permissions: Vec<String>,
    login_time: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Session {
    /// Check whether this session has expired (inactivity or max duration).
    fn is_expired(&self) -> bool {
        let now = Utc::now();
        if now >= self.expires_at {
            return true;
        }
        if now - self.last_activity > Duration::minutes(SESSION_INACTIVITY_MINUTES) {
            return true;
        }
        false
    }

    /// Convert to the JSON shape the screens expect from `auth_get_current`.
    fn to_user_json(&self) -> Value {
        serde_json::json!({
            "userId": self.user_id,
            "name": self.display_name,
            "role": self.role.as_str(),
            "permissions": self.permissions,
            "sessionId": self.session_id,
            "loginTime": self.login_time.to_rfc3339(),
        })
    }
}

/// Lockout tracking entry.
struct LockoutEntry {
    attempts: u32,
    last_attempt: DateTime<Utc>,
}

/// Tauri managed state for authentication.
pub struct AuthState {
    sessions: Mutex<HashMap<String, Session>>,
    current_session_id: Mutex<Option<String>>,
    lockout: Mutex<LockoutEntry>,
}

impl AuthState {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            current_session_id: Mutex::new(None),
            lockout: Mutex::new(LockoutEntry {
                attempts: 0,
                last_attempt: Utc::now(),
            }),
        }
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Check whether the terminal is currently locked out.
fn check_lockout(lockout: &LockoutEntry) -> Result<(), String> {
    if lockout.attempts >= MAX_FAILED_ATTEMPTS {
        let elapsed = Utc::now() - lockout.last_attempt;
        if elapsed < Duration::minutes(LOCKOUT_MINUTES) {
            let remaining = LOCKOUT_MINUTES - elapsed.num_minutes();
            return Err(format!(
                "Too many failed attempts. Try again in {remaining} minute(s)."
            ));
        }
        // Lockout period has elapsed — reset happens on next successful login
    }
    Ok(())
}

/// Record a failed login attempt.
fn record_failure(lockout: &mut LockoutEntry) {
    lockout.attempts += 1;
    lockout.last_attempt = Utc::now();
    warn!(attempts = lockout.attempts, "failed login attempt");
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Authenticate a user by id and PIN. Returns the session user JSON.
pub fn login(
    conn: &Connection,
    state: &AuthState,
    user_id: &str,
    pin: &str,
) -> Result<Value, String> {
    let user_id = user_id.trim();
    if user_id.is_empty() || pin.trim().is_empty() {
        return Err("User and PIN are required".to_string());
    }

    {
        let lockout = state.lockout.lock().map_err(|e| e.to_string())?;
        check_lockout(&lockout)?;
    }

    let pin_hash = users::stored_pin_hash(conn, user_id)?;
    let verified = match pin_hash {
        Some(hash) => bcrypt::verify(pin.trim(), &hash).unwrap_or(false),
        None => false,
    };

    if !verified {
        let mut lockout = state.lockout.lock().map_err(|e| e.to_string())?;
        record_failure(&mut lockout);
        return Err("Invalid user or PIN".to_string());
    }

    let profile = users::profile_get_by_user(conn, user_id)?
        .ok_or_else(|| "Invalid user or PIN".to_string())?;

    let now = Utc::now();
    let session = Session {
        session_id: Uuid::new_v4().to_string(),
        user_id: profile.user_id.clone(),
        display_name: display_name(&profile),
        role: profile.role,
        permissions: permissions_for(profile.role),
        login_time: now,
        last_activity: now,
        expires_at: now + Duration::hours(SESSION_MAX_DURATION_HOURS),
    };

    {
        let mut lockout = state.lockout.lock().map_err(|e| e.to_string())?;
        lockout.attempts = 0;
    }

    let user_json = session.to_user_json();
    {
        let mut sessions = state.sessions.lock().map_err(|e| e.to_string())?;
        sessions.retain(|_, s| !s.is_expired());
        sessions.insert(session.session_id.clone(), session.clone());
    }
    {
        let mut current = state.current_session_id.lock().map_err(|e| e.to_string())?;
        *current = Some(session.session_id.clone());
    }

    info!(user_id = %user_id, role = %session.role.as_str(), "user logged in");
    Ok(user_json)
}

/// End the current session.
pub fn logout(state: &AuthState) -> Result<(), String> {
    let mut current = state.current_session_id.lock().map_err(|e| e.to_string())?;
    if let Some(session_id) = current.take() {
        let mut sessions = state.sessions.lock().map_err(|e| e.to_string())?;
        sessions.remove(&session_id);
        info!("user logged out");
    }
    Ok(())
}

/// The `auth.getUser` accessor: the current session's user, or None.
pub fn current_user(state: &AuthState) -> Result<Option<Value>, String> {
    let current = state.current_session_id.lock().map_err(|e| e.to_string())?;
    let session_id = match current.as_ref() {
        Some(id) => id.clone(),
        None => return Ok(None),
    };
    drop(current);

    let mut sessions = state.sessions.lock().map_err(|e| e.to_string())?;
    match sessions.get(&session_id) {
        Some(session) if !session.is_expired() => Ok(Some(session.to_user_json())),
        Some(_) => {
            sessions.remove(&session_id);
            Ok(None)
        }
        None => Ok(None),
    }
}

/// The current session's user id, if any. Commands that stamp
/// `created_by`/`cashier_id` call this.
pub fn current_user_id(state: &AuthState) -> Result<Option<String>, String> {
    Ok(current_user(state)?
        .and_then(|u| u.get("userId").and_then(|v| v.as_str()).map(str::to_string)))
}

/// Mark activity on the current session, pushing out the inactivity window.
pub fn track_activity(state: &AuthState) -> Result<(), String> {
    let current = state.current_session_id.lock().map_err(|e| e.to_string())?;
    if let Some(session_id) = current.as_ref() {
        let mut sessions = state.sessions.lock().map_err(|e| e.to_string())?;
        if let Some(session) = sessions.get_mut(session_id) {
            session.last_activity = Utc::now();
        }
    }
    Ok(())
}

/// Does the current session hold `permission`?
pub fn has_permission(state: &AuthState, permission: &str) -> Result<bool, String> {
    let current = state.current_session_id.lock().map_err(|e| e.to_string())?;
    let session_id = match current.as_ref() {
        Some(id) => id.clone(),
        None => return Ok(false),
    };
    drop(current);

    let sessions = state.sessions.lock().map_err(|e| e.to_string())?;
    Ok(sessions
        .get(&session_id)
        .filter(|s| !s.is_expired())
        .map(|s| s.permissions.iter().any(|p| p == permission))
        .unwrap_or(false))
}

/// The `has_role` accessor: does the current session's role satisfy
/// `required` under the dominance rules?
pub fn has_role(state: &AuthState, required: Role) -> Result<bool, String> {
    let current = state.current_session_id.lock().map_err(|e| e.to_string())?;
    let session_id = match current.as_ref() {
        Some(id) => id.clone(),
        None => return Ok(false),
    };
    drop(current);

    let sessions = state.sessions.lock().map_err(|e| e.to_string())?;
    Ok(sessions
        .get(&session_id)
        .filter(|s| !s.is_expired())
        .map(|s| s.role.satisfies(required))
        .unwrap_or(false))
}

fn display_name(profile: &users::Profile) -> String {
    let name = format!(
        "{} {}",
        profile.first_name.as_deref().unwrap_or(""),
        profile.last_name.as_deref().unwrap_or("")
    )
    .trim()
    .to_string();
    if name.is_empty() {
        profile.user_id.clone()
    } else {
        name
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::users::ProfileInput;
    use rusqlite::Connection;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        db::run_migrations_for_test(&conn);
        users::profile_create(
            &conn,
            &ProfileInput {
                user_id: "sarah".to_string(),
                first_name: Some("Sarah".to_string()),
                last_name: Some("Khan".to_string()),
                phone: None,
                role: "manager".to_string(),
                is_active: true,
            },
            Some("1234"),
        )
        .expect("seed profile");
        conn
    }

    #[test]
    fn login_creates_session_with_role_permissions() {
        let conn = test_db();
        let state = AuthState::new();

        let user = login(&conn, &state, "sarah", "1234").expect("login");
        assert_eq!(user["role"], "manager");
        assert_eq!(user["name"], "Sarah Khan");
        assert!(user["permissions"]
            .as_array()
            .expect("permissions array")
            .iter()
            .any(|p| p == "view_reports"));

        let current = current_user(&state).expect("current").expect("session");
        assert_eq!(current["userId"], "sarah");

        assert!(has_permission(&state, "view_reports").expect("perm"));
        assert!(!has_permission(&state, "manage_users").expect("perm"));
        assert!(has_role(&state, Role::Cashier).expect("role"));
        assert!(!has_role(&state, Role::Admin).expect("role"));
    }

    #[test]
    fn wrong_pin_rejected_and_locks_out() {
        let conn = test_db();
        let state = AuthState::new();

        for _ in 0..MAX_FAILED_ATTEMPTS {
            assert!(login(&conn, &state, "sarah", "0000").is_err());
        }
        // Next attempt hits the lockout even with the right PIN
        let err = login(&conn, &state, "sarah", "1234").expect_err("locked out");
        assert!(err.contains("Too many failed attempts"));
    }

    #[test]
    fn unknown_user_rejected() {
        let conn = test_db();
        let state = AuthState::new();
        assert!(login(&conn, &state, "ghost", "1234").is_err());
        assert!(login(&conn, &state, "", "1234").is_err());
    }

    #[test]
    fn logout_clears_current_session() {
        let conn = test_db();
        let state = AuthState::new();
        login(&conn, &state, "sarah", "1234").expect("login");
        logout(&state).expect("logout");
        assert!(current_user(&state).expect("current").is_none());
        assert!(!has_permission(&state, "view_dashboard").expect("perm"));
    }

    #[test]
    fn current_user_id_matches_login() {
        let conn = test_db();
        let state = AuthState::new();
        assert!(current_user_id(&state).expect("none yet").is_none());
        login(&conn, &state, "sarah", "1234").expect("login");
        assert_eq!(
            current_user_id(&state).expect("id").as_deref(),
            Some("sarah")
        );
    }
}
