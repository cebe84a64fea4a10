//! User profiles and the role model behind the screen guards.

use bcrypt::{hash, DEFAULT_COST};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access roles, in the dashboard's enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Cashier,
    InventoryStaff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Cashier => "cashier",
            Role::InventoryStaff => "inventory_staff",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "cashier" => Ok(Role::Cashier),
            "inventory_staff" => Ok(Role::InventoryStaff),
            other => Err(format!("Unknown role: {other}")),
        }
    }

    /// admin outranks manager, manager outranks the floor roles; cashier
    /// and inventory_staff are peers and only satisfy themselves.
    fn rank(&self) -> u8 {
        match self {
            Role::Admin => 3,
            Role::Manager => 2,
            Role::Cashier | Role::InventoryStaff => 1,
        }
    }

    /// Does this role satisfy a screen's `required` role?
    pub fn satisfies(&self, required: Role) -> bool {
        *self == required || self.rank() > required.rank()
    }
}

/// A user profile row. The PIN hash never leaves this module.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: String,
    pub user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileInput {
    pub user_id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

const PROFILE_COLUMNS: &str =
    "id, user_id, first_name, last_name, phone, role, is_active, created_at, updated_at";

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<Profile> {
    let role_raw: String = row.get(5)?;
    Ok(Profile {
        id: row.get(0)?,
        user_id: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        phone: row.get(4)?,
        role: Role::parse(&role_raw).unwrap_or(Role::Cashier),
        is_active: row.get::<_, i64>(6)? != 0,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

pub fn profile_list(conn: &Connection) -> Result<Vec<Profile>, String> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY created_at"
        ))
        .map_err(|e| format!("profiles query: {e}"))?;
    let rows = stmt
        .query_map([], profile_from_row)
        .map_err(|e| format!("profiles query: {e}"))?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn profile_get_by_user(conn: &Connection, user_id: &str) -> Result<Option<Profile>, String> {
    conn.query_row(
        &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1"),
        params![user_id],
        profile_from_row,
    )
    .optional()
    .map_err(|e| format!("profile lookup: {e}"))
}

pub fn profile_create(
    conn: &Connection,
    input: &ProfileInput,
    pin: Option<&str>,
) -> Result<Profile, String> {
    let user_id = input.user_id.trim();
    if user_id.is_empty() {
        return Err("User id is required".to_string());
    }
    let role = Role::parse(&input.role)?;

    let pin_hash = match pin {
        Some(pin) => Some(hash_pin(pin)?),
        None => None,
    };

    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO profiles (id, user_id, first_name, last_name, phone, role, pin_hash, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id,
            user_id,
            input.first_name,
            input.last_name,
            input.phone,
            role.as_str(),
            pin_hash,
            input.is_active as i64,
        ],
    )
    .map_err(|e| format!("profile insert: {e}"))?;

    profile_get_by_user(conn, user_id)?.ok_or_else(|| "profile vanished after insert".to_string())
}

pub fn profile_update(conn: &Connection, id: &str, input: &ProfileInput) -> Result<(), String> {
    let role = Role::parse(&input.role)?;
    let changed = conn
        .execute(
            "UPDATE profiles SET first_name = ?2, last_name = ?3, phone = ?4, role = ?5,
                is_active = ?6, updated_at = datetime('now')
             WHERE id = ?1",
            params![
                id,
                input.first_name,
                input.last_name,
                input.phone,
                role.as_str(),
                input.is_active as i64,
            ],
        )
        .map_err(|e| format!("profile update: {e}"))?;
    if changed == 0 {
        return Err("Profile not found".to_string());
    }
    Ok(())
}

/// Set (or replace) a profile's login PIN.
pub fn profile_set_pin(conn: &Connection, id: &str, pin: &str) -> Result<(), String> {
    let pin_hash = hash_pin(pin)?;
    let changed = conn
        .execute(
            "UPDATE profiles SET pin_hash = ?2, updated_at = datetime('now') WHERE id = ?1",
            params![id, pin_hash],
        )
        .map_err(|e| format!("pin update: {e}"))?;
    if changed == 0 {
        return Err("Profile not found".to_string());
    }
    Ok(())
}

/// Deactivate instead of delete: sales reference cashier ids.
pub fn profile_deactivate(conn: &Connection, id: &str) -> Result<(), String> {
    let changed = conn
        .execute(
            "UPDATE profiles SET is_active = 0, updated_at = datetime('now') WHERE id = ?1",
            params![id],
        )
        .map_err(|e| format!("profile deactivate: {e}"))?;
    if changed == 0 {
        return Err("Profile not found".to_string());
    }
    Ok(())
}

/// The `get_user_role` accessor.
pub fn get_user_role(conn: &Connection, user_id: &str) -> Result<Option<Role>, String> {
    Ok(profile_get_by_user(conn, user_id)?.map(|p| p.role))
}

pub(crate) fn hash_pin(pin: &str) -> Result<String, String> {
    let pin = pin.trim();
    if pin.len() < 4 {
        return Err("PIN must be at least 4 digits".to_string());
    }
    hash(pin, DEFAULT_COST).map_err(|e| format!("pin hash: {e}"))
}

pub(crate) fn stored_pin_hash(
    conn: &Connection,
    user_id: &str,
) -> Result<Option<String>, String> {
    conn.query_row(
        "SELECT pin_hash FROM profiles WHERE user_id = ?1 AND is_active = 1",
        params![user_id],
        |row| row.get::<_, Option<String>>(0),
    )
    .optional()
    .map_err(|e| format!("pin lookup: {e}"))
    .map(Option::flatten)
}

// ===========================================================================
// Tests
// ===========================================================================
