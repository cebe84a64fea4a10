//! Expense tracking for the finance screen.

use chrono::{Duration, Local};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Categories offered by the expense form.
pub const EXPENSE_CATEGORIES: &[&str] = &[
    "Office Supplies",
    "Utilities",
    "Rent",
    "Marketing",
    "Equipment",
    "Maintenance",
    "Insurance",
    "Professional Services",
    "Travel",
    "Inventory Purchase",
    "Staff Salaries",
    "Other",
];

#[derive(Debug, Clone, Serialize)]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub amount: f64,
    pub category: String,
    pub expense_date: String,
    pub receipt_url: Option<String>,
    pub created_by: String,
    pub approved_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpenseInput {
    pub description: String,
    pub amount: f64,
    pub category: String,
    #[serde(default)]
    pub expense_date: Option<String>,
    #[serde(default)]
    pub receipt_url: Option<String>,
}

/// Date window filter used by the finance screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFilter {
    #[default]
    All,
    Today,
    Week,
    Month,
}

impl DateFilter {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "today" => DateFilter::Today,
            "week" => DateFilter::Week,
            "month" => DateFilter::Month,
            _ => DateFilter::All,
        }
    }

    /// Inclusive lower bound on expense_date, None for All.
    fn cutoff(&self) -> Option<String> {
        let today = Local::now().date_naive();
        let date = match self {
            DateFilter::All => return None,
            DateFilter::Today => today,
            DateFilter::Week => today - Duration::days(7),
            DateFilter::Month => today - Duration::days(30),
        };
        Some(date.format("%Y-%m-%d").to_string())
    }
}

/// Totals for the finance stat cards.
#[derive(Debug, Serialize)]
pub struct ExpenseSummary {
    pub total: f64,
    pub this_month: f64,
    pub count: i64,
    pub average: f64,
}

fn expense_from_row(row: &Row<'_>) -> rusqlite::Result<Expense> {
    Ok(Expense {
        id: row.get(0)?,
        description: row.get(1)?,
        amount: row.get(2)?,
        category: row.get(3)?,
        expense_date: row.get(4)?,
        receipt_url: row.get(5)?,
        created_by: row.get(6)?,
        approved_by: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

const EXPENSE_COLUMNS: &str = "id, description, amount, category, expense_date, receipt_url, \
     created_by, approved_by, created_at, updated_at";

/// List expenses, newest expense_date first, with the screen's filters
/// applied in SQL: text search over description/category, exact category,
/// and the date window.
pub fn expense_list(
    conn: &Connection,
    search: &str,
    category: Option<&str>,
    date_filter: DateFilter,
) -> Result<Vec<Expense>, String> {
    let pattern = format!("%{}%", search.trim().to_lowercase());
    let category = category.unwrap_or("");
    let cutoff = date_filter.cutoff().unwrap_or_default();

    let mut stmt = conn
        .prepare(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses
             WHERE (?1 = '%%' OR lower(description) LIKE ?1 OR lower(category) LIKE ?1)
               AND (?2 = '' OR category = ?2)
               AND (?3 = '' OR expense_date >= ?3)
             ORDER BY expense_date DESC, created_at DESC"
        ))
        .map_err(|e| format!("expense list: {e}"))?;
    let rows = stmt
        .query_map(params![pattern, category, cutoff], expense_from_row)
        .map_err(|e| format!("expense list: {e}"))?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn expense_create(
    conn: &Connection,
    input: &ExpenseInput,
    created_by: &str,
) -> Result<Expense, String> {
    validate(input)?;
    let id = Uuid::new_v4().to_string();
    let expense_date = input
        .expense_date
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Local::now().format("%Y-%m-%d").to_string());

    conn.execute(
        "INSERT INTO expenses (id, description, amount, category, expense_date, receipt_url, created_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id,
            input.description.trim(),
            input.amount,
            input.category.trim(),
            expense_date,
            input.receipt_url,
            created_by,
        ],
    )
    .map_err(|e| format!("expense insert: {e}"))?;

    conn.query_row(
        &format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = ?1"),
        params![id],
        expense_from_row,
    )
    .map_err(|e| format!("expense readback: {e}"))
}

pub fn expense_update(conn: &Connection, id: &str, input: &ExpenseInput) -> Result<(), String> {
    validate(input)?;
    let changed = conn
        .execute(
            "UPDATE expenses SET description = ?2, amount = ?3, category = ?4,
                expense_date = COALESCE(?5, expense_date), receipt_url = ?6,
                updated_at = datetime('now')
             WHERE id = ?1",
            params![
                id,
                input.description.trim(),
                input.amount,
                input.category.trim(),
                input.expense_date,
                input.receipt_url,
            ],
        )
        .map_err(|e| format!("expense update: {e}"))?;
    if changed == 0 {
        return Err("Expense not found".to_string());
    }
    Ok(())
}

pub fn expense_delete(conn: &Connection, id: &str) -> Result<(), String> {
    let changed = conn
        .execute("DELETE FROM expenses WHERE id = ?1", params![id])
        .map_err(|e| format!("expense delete: {e}"))?;
    if changed == 0 {
        return Err("Expense not found".to_string());
    }
    Ok(())
}

/// Stat-card totals: lifetime total, current calendar month, and average
/// per expense.
pub fn expense_summary(conn: &Connection) -> Result<ExpenseSummary, String> {
    let month_prefix = Local::now().format("%Y-%m").to_string();
    conn.query_row(
        "SELECT COALESCE(SUM(amount), 0),
                COALESCE(SUM(CASE WHEN expense_date LIKE ?1 || '%' THEN amount ELSE 0 END), 0),
                COUNT(*)
         FROM expenses",
        params![month_prefix],
        |row| {
            let total: f64 = row.get(0)?;
            let this_month: f64 = row.get(1)?;
            let count: i64 = row.get(2)?;
            Ok(ExpenseSummary {
                total,
                this_month,
                count,
                average: if count > 0 { total / count as f64 } else { 0.0 },
            })
        },
    )
    .map_err(|e| format!("expense summary: {e}"))
}

fn validate(input: &ExpenseInput) -> Result<(), String> {
    if input.description.trim().is_empty() || input.category.trim().is_empty() {
        return Err("Please fill in all required fields".to_string());
    }
    if input.amount <= 0.0 {
        return Err("Amount must be greater than zero".to_string());
    }
    Ok(())
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use rusqlite::Connection;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        db::run_migrations_for_test(&conn);
        conn
    }

    fn input(description: &str, amount: f64, category: &str, date: Option<&str>) -> ExpenseInput {
        ExpenseInput {
            description: description.to_string(),
            amount,
            category: category.to_string(),
            expense_date: date.map(str::to_string),
            receipt_url: None,
        }
    }

    #[test]
    fn create_defaults_date_to_today() {
        let conn = test_db();
        let created = expense_create(&conn, &input("Stationery", 25.0, "Office Supplies", None), "u1")
            .expect("create");
        assert_eq!(
            created.expense_date,
            Local::now().format("%Y-%m-%d").to_string()
        );
        assert_eq!(created.created_by, "u1");
    }

    #[test]
    fn validation_rejects_bad_input() {
        let conn = test_db();
        assert!(expense_create(&conn, &input("", 10.0, "Rent", None), "u1").is_err());
        assert!(expense_create(&conn, &input("Rent", 10.0, " ", None), "u1").is_err());
        assert!(expense_create(&conn, &input("Rent", 0.0, "Rent", None), "u1").is_err());
        assert!(expense_create(&conn, &input("Rent", -4.0, "Rent", None), "u1").is_err());
    }

    #[test]
    fn list_filters_by_search_category_and_date() {
        let conn = test_db();
        expense_create(
            &conn,
            &input("January rent", 500.0, "Rent", Some("2020-01-05")),
            "u1",
        )
        .expect("old rent");
        expense_create(&conn, &input("Electric bill", 80.0, "Utilities", None), "u1")
            .expect("recent bill");

        let all = expense_list(&conn, "", None, DateFilter::All).expect("all");
        assert_eq!(all.len(), 2);

        let search = expense_list(&conn, "electric", None, DateFilter::All).expect("search");
        assert_eq!(search.len(), 1);
        assert_eq!(search[0].category, "Utilities");

        // Search also matches the category text
        let by_cat_text = expense_list(&conn, "rent", None, DateFilter::All).expect("cat text");
        assert_eq!(by_cat_text.len(), 1);

        let by_category = expense_list(&conn, "", Some("Rent"), DateFilter::All).expect("category");
        assert_eq!(by_category.len(), 1);

        let recent = expense_list(&conn, "", None, DateFilter::Week).expect("week");
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].description, "Electric bill");
    }

    #[test]
    fn list_orders_by_expense_date_desc() {
        let conn = test_db();
        expense_create(&conn, &input("Older", 10.0, "Other", Some("2024-01-01")), "u1")
            .expect("older");
        expense_create(&conn, &input("Newer", 10.0, "Other", Some("2024-06-01")), "u1")
            .expect("newer");

        let all = expense_list(&conn, "", None, DateFilter::All).expect("all");
        assert_eq!(all[0].description, "Newer");
    }

    #[test]
    fn update_and_delete() {
        let conn = test_db();
        let created =
            expense_create(&conn, &input("Misc", 10.0, "Other", None), "u1").expect("create");

        expense_update(
            &conn,
            &created.id,
            &input("Misc supplies", 12.5, "Office Supplies", None),
        )
        .expect("update");

        let all = expense_list(&conn, "", None, DateFilter::All).expect("all");
        assert_eq!(all[0].description, "Misc supplies");
        assert!((all[0].amount - 12.5).abs() < 1e-9);

        expense_delete(&conn, &created.id).expect("delete");
        assert!(expense_list(&conn, "", None, DateFilter::All)
            .expect("all")
            .is_empty());
        assert!(expense_delete(&conn, &created.id).is_err());
    }

    #[test]
    fn summary_totals() {
        let conn = test_db();
        expense_create(&conn, &input("Old", 100.0, "Other", Some("2020-01-01")), "u1")
            .expect("old");
        expense_create(&conn, &input("Current", 50.0, "Other", None), "u1").expect("current");

        let summary = expense_summary(&conn).expect("summary");
        assert!((summary.total - 150.0).abs() < 1e-9);
        assert!((summary.this_month - 50.0).abs() < 1e-9);
        assert_eq!(summary.count, 2);
        assert!((summary.average - 75.0).abs() < 1e-9);
    }
}
