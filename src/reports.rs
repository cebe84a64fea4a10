//! Reporting and analytics: dashboard stat cards, sales trend, top
//! products, payment breakdown, and the profit & loss engine.
//!
//! Revenue comes from `sales.total_amount`, COGS from each sold item's
//! product `cost_price × quantity`, expenses from the expenses table.
//! Gross profit = revenue − COGS; net profit = gross − expenses; margins
//! are percentages of revenue (0 when revenue is 0).

use chrono::{Datelike, Duration, NaiveDate, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::csv;

/// Stat-card figures for the dashboard header.
#[derive(Debug, Serialize)]
pub struct TodayStats {
    pub daily_sales: f64,
    pub transactions: i64,
    pub total_items: i64,
    pub low_stock: i64,
}

#[derive(Debug, Serialize)]
pub struct RecentTransaction {
    pub id: String,
    pub sale_number: String,
    pub customer_name: String,
    pub total_amount: f64,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct TrendPoint {
    pub date: String,
    pub revenue: f64,
    pub transactions: i64,
}

#[derive(Debug, Serialize)]
pub struct TopProduct {
    pub product_name: String,
    pub quantity: i64,
    pub revenue: f64,
}

#[derive(Debug, Serialize)]
pub struct PaymentBreakdown {
    pub payment_method: String,
    pub count: i64,
    pub amount: f64,
}

/// Realtime profit & loss snapshot for a single day.
#[derive(Debug, Serialize)]
pub struct ProfitLossSnapshot {
    pub total_revenue: f64,
    pub total_cogs: f64,
    pub total_expenses: f64,
    pub gross_profit: f64,
    pub net_profit: f64,
    pub gross_margin: f64,
    pub net_margin: f64,
    pub transaction_count: i64,
}

/// One bucket of the profit & loss trend table.
#[derive(Debug, Serialize)]
pub struct ProfitLossPeriod {
    pub period: String,
    pub revenue: f64,
    pub cogs: f64,
    pub gross_profit: f64,
    pub expenses: f64,
    pub net_profit: f64,
    pub gross_margin: f64,
    pub net_margin: f64,
}

/// Profit & loss bucketing granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    Daily,
    Weekly,
    Monthly,
}

impl Timeframe {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "weekly" => Timeframe::Weekly,
            "monthly" => Timeframe::Monthly,
            _ => Timeframe::Daily,
        }
    }
}

/// Today's headline figures: revenue and transaction count for `date`
/// plus the inventory counters.
pub fn today_stats(conn: &Connection, date: &str) -> Result<TodayStats, String> {
    let (daily_sales, transactions) = conn
        .query_row(
            "SELECT COALESCE(SUM(total_amount), 0), COUNT(*)
             FROM sales WHERE substr(created_at, 1, 10) = ?1",
            params![date],
            |row| Ok((row.get::<_, f64>(0)?, row.get::<_, i64>(1)?)),
        )
        .map_err(|e| format!("today stats: {e}"))?;

    let inventory = crate::catalog::inventory_stats(conn)?;

    Ok(TodayStats {
        daily_sales,
        transactions,
        total_items: inventory.total_items,
        low_stock: inventory.low_stock,
    })
}

/// Latest sales for the dashboard's recent-transactions panel.
pub fn recent_transactions(
    conn: &Connection,
    limit: i64,
) -> Result<Vec<RecentTransaction>, String> {
    let mut stmt = conn
        .prepare(
            "SELECT id, sale_number, COALESCE(customer_name, 'Walk-in Customer'),
                    total_amount, created_at
             FROM sales ORDER BY created_at DESC, sale_number DESC LIMIT ?1",
        )
        .map_err(|e| format!("recent transactions: {e}"))?;
    let rows = stmt
        .query_map(params![limit], |row| {
            Ok(RecentTransaction {
                id: row.get(0)?,
                sale_number: row.get(1)?,
                customer_name: row.get(2)?,
                total_amount: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .map_err(|e| format!("recent transactions: {e}"))?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

/// Per-day revenue/transaction series over the last `days` days,
/// zero-filled so the chart has a point for every day.
pub fn sales_trend(conn: &Connection, days: i64) -> Result<Vec<TrendPoint>, String> {
    let days = days.clamp(1, 365);
    let today = Utc::now().date_naive();
    let start = today - Duration::days(days - 1);

    let mut stmt = conn
        .prepare(
            "SELECT substr(created_at, 1, 10) AS day,
                    COALESCE(SUM(total_amount), 0), COUNT(*)
             FROM sales
             WHERE substr(created_at, 1, 10) >= ?1
             GROUP BY day",
        )
        .map_err(|e| format!("sales trend: {e}"))?;
    let rows: Vec<(String, f64, i64)> = stmt
        .query_map(params![start.format("%Y-%m-%d").to_string()], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })
        .map_err(|e| format!("sales trend: {e}"))?
        .filter_map(|r| r.ok())
        .collect();

    let mut out = Vec::with_capacity(days as usize);
    for offset in 0..days {
        let date = (start + Duration::days(offset)).format("%Y-%m-%d").to_string();
        let found = rows.iter().find(|(day, _, _)| *day == date);
        out.push(TrendPoint {
            revenue: found.map(|(_, revenue, _)| *revenue).unwrap_or(0.0),
            transactions: found.map(|(_, _, count)| *count).unwrap_or(0),
            date,
        });
    }
    Ok(out)
}

/// Best sellers by quantity over the last `days` days.
pub fn top_products(conn: &Connection, days: i64, limit: i64) -> Result<Vec<TopProduct>, String> {
    let start = (Utc::now().date_naive() - Duration::days(days.clamp(1, 365) - 1))
        .format("%Y-%m-%d")
        .to_string();
    let mut stmt = conn
        .prepare(
            "SELECT si.product_name, SUM(si.quantity), SUM(si.total_price)
             FROM sale_items si
             JOIN sales s ON s.id = si.sale_id
             WHERE substr(s.created_at, 1, 10) >= ?1
             GROUP BY si.product_name
             ORDER BY SUM(si.quantity) DESC
             LIMIT ?2",
        )
        .map_err(|e| format!("top products: {e}"))?;
    let rows = stmt
        .query_map(params![start, limit], |row| {
            Ok(TopProduct {
                product_name: row.get(0)?,
                quantity: row.get(1)?,
                revenue: row.get(2)?,
            })
        })
        .map_err(|e| format!("top products: {e}"))?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

/// Sales split by payment method over the last `days` days.
pub fn payment_breakdown(conn: &Connection, days: i64) -> Result<Vec<PaymentBreakdown>, String> {
    let start = (Utc::now().date_naive() - Duration::days(days.clamp(1, 365) - 1))
        .format("%Y-%m-%d")
        .to_string();
    let mut stmt = conn
        .prepare(
            "SELECT payment_method, COUNT(*), COALESCE(SUM(total_amount), 0)
             FROM sales
             WHERE substr(created_at, 1, 10) >= ?1
             GROUP BY payment_method
             ORDER BY SUM(total_amount) DESC",
        )
        .map_err(|e| format!("payment breakdown: {e}"))?;
    let rows = stmt
        .query_map(params![start], |row| {
            Ok(PaymentBreakdown {
                payment_method: row.get(0)?,
                count: row.get(1)?,
                amount: row.get(2)?,
            })
        })
        .map_err(|e| format!("payment breakdown: {e}"))?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

/// One sale with its timestamp, revenue, and cost of goods.
struct SaleFigures {
    created_at: String,
    revenue: f64,
    cogs: f64,
}

/// Load per-sale revenue and COGS from `since` (date prefix compare).
fn load_sale_figures(conn: &Connection, since: &str) -> Result<Vec<SaleFigures>, String> {
    let mut stmt = conn
        .prepare(
            "SELECT s.created_at, s.total_amount,
                    COALESCE(SUM(p.cost_price * si.quantity), 0)
             FROM sales s
             LEFT JOIN sale_items si ON si.sale_id = s.id
             LEFT JOIN products p ON p.id = si.product_id
             WHERE substr(s.created_at, 1, 10) >= ?1
             GROUP BY s.id
             ORDER BY s.created_at",
        )
        .map_err(|e| format!("sale figures: {e}"))?;
    let rows = stmt
        .query_map(params![since], |row| {
            Ok(SaleFigures {
                created_at: row.get(0)?,
                revenue: row.get(1)?,
                cogs: row.get(2)?,
            })
        })
        .map_err(|e| format!("sale figures: {e}"))?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

fn margin(part: f64, revenue: f64) -> f64 {
    if revenue > 0.0 {
        (part / revenue) * 100.0
    } else {
        0.0
    }
}

/// Snapshot for one day (`date` as YYYY-MM-DD).
pub fn profit_loss_realtime(conn: &Connection, date: &str) -> Result<ProfitLossSnapshot, String> {
    let sales = load_sale_figures(conn, date)?;
    let sales: Vec<&SaleFigures> = sales
        .iter()
        .filter(|s| s.created_at.starts_with(date))
        .collect();

    let total_revenue: f64 = sales.iter().map(|s| s.revenue).sum();
    let total_cogs: f64 = sales.iter().map(|s| s.cogs).sum();

    let total_expenses: f64 = conn
        .query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM expenses WHERE expense_date >= ?1",
            params![date],
            |row| row.get(0),
        )
        .map_err(|e| format!("expense total: {e}"))?;

    let gross_profit = total_revenue - total_cogs;
    let net_profit = gross_profit - total_expenses;

    Ok(ProfitLossSnapshot {
        total_revenue,
        total_cogs,
        total_expenses,
        gross_profit,
        net_profit,
        gross_margin: margin(gross_profit, total_revenue),
        net_margin: margin(net_profit, total_revenue),
        transaction_count: sales.len() as i64,
    })
}

/// One bucket boundary: [start, end) as sortable timestamps plus a label.
struct Period {
    start: String,
    end: String,
    label: String,
}

/// Build the bucket list for a timeframe: 7 rolling days, 4 rolling
/// weeks, or 12 calendar months, oldest first.
fn build_periods(timeframe: Timeframe) -> Vec<Period> {
    let now = Utc::now().naive_utc();
    let mut periods = Vec::new();

    match timeframe {
        Timeframe::Daily => {
            for i in (0..7).rev() {
                let start = now - Duration::days(i);
                let end = start + Duration::days(1);
                periods.push(Period {
                    start: start.format("%Y-%m-%d %H:%M:%S").to_string(),
                    end: end.format("%Y-%m-%d %H:%M:%S").to_string(),
                    label: start.format("%a %b %-d").to_string(),
                });
            }
        }
        Timeframe::Weekly => {
            for i in (0..4).rev() {
                let start = now - Duration::days((i + 1) * 7);
                let end = now - Duration::days(i * 7);
                periods.push(Period {
                    start: start.format("%Y-%m-%d %H:%M:%S").to_string(),
                    end: end.format("%Y-%m-%d %H:%M:%S").to_string(),
                    label: format!("Week {}", i + 1),
                });
            }
        }
        Timeframe::Monthly => {
            let today = now.date();
            for i in (0..12).rev() {
                let months_back = today.month0() as i64 - i;
                let (year, month0) = if months_back >= 0 {
                    (today.year(), months_back as u32)
                } else {
                    // Borrow from previous years
                    let borrow = (-months_back + 11) / 12;
                    (
                        today.year() - borrow as i32,
                        (months_back + borrow * 12) as u32,
                    )
                };
                let start = NaiveDate::from_ymd_opt(year, month0 + 1, 1)
                    .expect("valid month start")
                    .and_hms_opt(0, 0, 0)
                    .expect("midnight");
                let end = if month0 == 11 {
                    NaiveDate::from_ymd_opt(year + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(year, month0 + 2, 1)
                }
                .expect("valid month end")
                .and_hms_opt(0, 0, 0)
                .expect("midnight");
                periods.push(Period {
                    start: start.format("%Y-%m-%d %H:%M:%S").to_string(),
                    end: end.format("%Y-%m-%d %H:%M:%S").to_string(),
                    label: start.format("%b %Y").to_string(),
                });
            }
        }
    }

    periods
}

/// Timestamps are `YYYY-MM-DD HH:MM:SS`, so plain string comparison is
/// chronological. Start-inclusive, end-exclusive.
fn in_period(timestamp: &str, period: &Period) -> bool {
    *timestamp >= *period.start && *timestamp < *period.end
}

/// The profit & loss trend table: per-bucket revenue/COGS/expenses and
/// derived profit figures.
pub fn profit_loss_periods(
    conn: &Connection,
    timeframe: Timeframe,
) -> Result<Vec<ProfitLossPeriod>, String> {
    let periods = build_periods(timeframe);
    let since = periods
        .first()
        .map(|p| p.start[..10].to_string())
        .unwrap_or_default();

    let sales = load_sale_figures(conn, &since)?;

    let mut stmt = conn
        .prepare(
            "SELECT expense_date, amount FROM expenses WHERE expense_date >= ?1",
        )
        .map_err(|e| format!("expense rows: {e}"))?;
    let expenses: Vec<(String, f64)> = stmt
        .query_map(params![since], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(|e| format!("expense rows: {e}"))?
        .filter_map(|r| r.ok())
        .collect();

    Ok(periods
        .iter()
        .map(|period| {
            let revenue: f64 = sales
                .iter()
                .filter(|s| in_period(&s.created_at, period))
                .map(|s| s.revenue)
                .sum();
            let cogs: f64 = sales
                .iter()
                .filter(|s| in_period(&s.created_at, period))
                .map(|s| s.cogs)
                .sum();
            // expense_date is a bare date; anchor it to midnight
            let expense_total: f64 = expenses
                .iter()
                .filter(|(date, _)| {
                    let anchored = format!("{date} 00:00:00");
                    in_period(&anchored, period)
                })
                .map(|(_, amount)| amount)
                .sum();

            let gross_profit = revenue - cogs;
            let net_profit = gross_profit - expense_total;
            ProfitLossPeriod {
                period: period.label.clone(),
                revenue,
                cogs,
                gross_profit,
                expenses: expense_total,
                net_profit,
                gross_margin: margin(gross_profit, revenue),
                net_margin: margin(net_profit, revenue),
            }
        })
        .collect())
}

/// CSV export of the profit & loss table (margins to two decimals).
pub fn profit_loss_csv(periods: &[ProfitLossPeriod]) -> String {
    let headers = [
        "Period",
        "Revenue",
        "COGS",
        "Gross Profit",
        "Expenses",
        "Net Profit",
        "Gross Margin %",
        "Net Margin %",
    ];
    let rows: Vec<Vec<String>> = periods
        .iter()
        .map(|p| {
            vec![
                p.period.clone(),
                p.revenue.to_string(),
                p.cogs.to_string(),
                p.gross_profit.to_string(),
                p.expenses.to_string(),
                p.net_profit.to_string(),
                format!("{:.2}", p.gross_margin),
                format!("{:.2}", p.net_margin),
            ]
        })
        .collect();
    csv::emit(&headers, &rows)
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
        conn.execute_batch(
            "INSERT INTO products (id, name, unit_price, cost_price, current_stock)
             VALUES ('p1', 'Milk', 5.0, 3.0, 50);
             INSERT INTO products (id, name, unit_price, cost_price, current_stock, min_stock_threshold)
             VALUES ('p2', 'Bread', 2.0, 1.0, 4, 10);",
        )
        .expect("seed products");
        conn
    }

    /// Insert a sale of `qty` units of `product` at `unit_price` with the
    /// given timestamp.
    fn seed_sale(
        conn: &Connection,
        id: &str,
        created_at: &str,
        product: &str,
        qty: i64,
        unit_price: f64,
        method: &str,
    ) {
        let total = unit_price * qty as f64;
        conn.execute(
            "INSERT INTO sales (id, sale_number, cashier_id, subtotal, tax_amount, total_amount,
                payment_method, created_at)
             VALUES (?1, ?2, 'u1', ?3, 0, ?3, ?4, ?5)",
            params![id, format!("S-X-{id}"), total, method, created_at],
        )
        .expect("seed sale");
        conn.execute(
            "INSERT INTO sale_items (id, sale_id, product_id, product_name, quantity, unit_price, total_price)
             VALUES (?1 || '-item', ?1, ?2, ?2, ?3, ?4, ?5)",
            params![id, product, qty, unit_price, total],
        )
        .expect("seed sale item");
    }

    fn today() -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }

    #[test]
    fn realtime_snapshot_computes_profit_chain() {
        let conn = test_db();
        let ts = format!("{} 10:00:00", today());
        // Revenue 10 (2×5), COGS 6 (2×3)
        seed_sale(&conn, "s1", &ts, "p1", 2, 5.0, "cash");
        conn.execute(
            "INSERT INTO expenses (id, description, amount, category, expense_date, created_by)
             VALUES ('e1', 'Rent', 3.0, 'Rent', ?1, 'u1')",
            params![today()],
        )
        .expect("seed expense");

        let snap = profit_loss_realtime(&conn, &today()).expect("snapshot");
        assert!((snap.total_revenue - 10.0).abs() < 1e-9);
        assert!((snap.total_cogs - 6.0).abs() < 1e-9);
        assert!((snap.total_expenses - 3.0).abs() < 1e-9);
        assert!((snap.gross_profit - 4.0).abs() < 1e-9);
        assert!((snap.net_profit - 1.0).abs() < 1e-9);
        assert!((snap.gross_margin - 40.0).abs() < 1e-9);
        assert!((snap.net_margin - 10.0).abs() < 1e-9);
        assert_eq!(snap.transaction_count, 1);
    }

    #[test]
    fn realtime_snapshot_zero_revenue_has_zero_margins() {
        let conn = test_db();
        let snap = profit_loss_realtime(&conn, &today()).expect("snapshot");
        assert_eq!(snap.transaction_count, 0);
        assert_eq!(snap.gross_margin, 0.0);
        assert_eq!(snap.net_margin, 0.0);
    }

    #[test]
    fn daily_periods_cover_seven_rolling_days() {
        let conn = test_db();
        let ts = format!("{} 00:00:01", today());
        seed_sale(&conn, "s1", &ts, "p1", 1, 5.0, "card");

        let rows = profit_loss_periods(&conn, Timeframe::Daily).expect("periods");
        assert_eq!(rows.len(), 7);
        // Buckets are rolling windows; the sale lands in exactly one.
        let total: f64 = rows.iter().map(|r| r.revenue).sum();
        assert!((total - 5.0).abs() < 1e-9);

        let weekly = profit_loss_periods(&conn, Timeframe::Weekly).expect("weekly");
        assert_eq!(weekly.len(), 4);
        assert_eq!(weekly[0].period, "Week 4");
        assert_eq!(weekly[3].period, "Week 1");

        let monthly = profit_loss_periods(&conn, Timeframe::Monthly).expect("monthly");
        assert_eq!(monthly.len(), 12);
        // Current month bucket holds the sale
        assert!((monthly[11].revenue - 5.0).abs() < 1e-9);
        assert!((monthly[11].cogs - 3.0).abs() < 1e-9);
    }

    #[test]
    fn monthly_periods_span_year_boundary() {
        let periods = build_periods(Timeframe::Monthly);
        assert_eq!(periods.len(), 12);
        for pair in periods.windows(2) {
            assert_eq!(pair[0].end, pair[1].start, "months must be contiguous");
        }
    }

    #[test]
    fn today_stats_and_recent_transactions() {
        let conn = test_db();
        let ts = format!("{} 09:00:00", today());
        seed_sale(&conn, "s1", &ts, "p1", 2, 5.0, "cash");
        seed_sale(&conn, "s2", "2020-01-01 09:00:00", "p1", 1, 5.0, "card");

        let stats = today_stats(&conn, &today()).expect("stats");
        assert!((stats.daily_sales - 10.0).abs() < 1e-9);
        assert_eq!(stats.transactions, 1);
        assert_eq!(stats.total_items, 2);
        assert_eq!(stats.low_stock, 1);

        let recent = recent_transactions(&conn, 10).expect("recent");
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, "s1");
        assert_eq!(recent[0].customer_name, "Walk-in Customer");
    }

    #[test]
    fn trend_zero_fills_missing_days() {
        let conn = test_db();
        let ts = format!("{} 09:00:00", today());
        seed_sale(&conn, "s1", &ts, "p1", 1, 5.0, "cash");

        let trend = sales_trend(&conn, 7).expect("trend");
        assert_eq!(trend.len(), 7);
        assert_eq!(trend[6].date, today());
        assert!((trend[6].revenue - 5.0).abs() < 1e-9);
        assert_eq!(trend[6].transactions, 1);
        assert_eq!(trend[0].transactions, 0);
    }

    #[test]
    fn top_products_ordered_by_quantity() {
        let conn = test_db();
        let ts = format!("{} 09:00:00", today());
        seed_sale(&conn, "s1", &ts, "p1", 2, 5.0, "cash");
        seed_sale(&conn, "s2", &ts, "p2", 5, 2.0, "cash");

        let top = top_products(&conn, 7, 10).expect("top");
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].product_name, "p2");
        assert_eq!(top[0].quantity, 5);
    }

    #[test]
    fn payment_breakdown_groups_methods() {
        let conn = test_db();
        let ts = format!("{} 09:00:00", today());
        seed_sale(&conn, "s1", &ts, "p1", 2, 5.0, "cash");
        seed_sale(&conn, "s2", &ts, "p1", 1, 5.0, "cash");
        seed_sale(&conn, "s3", &ts, "p1", 1, 5.0, "card");

        let breakdown = payment_breakdown(&conn, 7).expect("breakdown");
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].payment_method, "cash");
        assert_eq!(breakdown[0].count, 2);
        assert!((breakdown[0].amount - 15.0).abs() < 1e-9);
    }

    #[test]
    fn csv_export_shape() {
        let rows = vec![ProfitLossPeriod {
            period: "Mon Jan 5".into(),
            revenue: 100.0,
            cogs: 60.0,
            gross_profit: 40.0,
            expenses: 10.0,
            net_profit: 30.0,
            gross_margin: 40.0,
            net_margin: 30.0,
        }];
        let csv = profit_loss_csv(&rows);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("Period,Revenue,COGS,Gross Profit,Expenses,Net Profit,Gross Margin %,Net Margin %")
        );
        assert_eq!(lines.next(), Some("Mon Jan 5,100,60,40,10,30,40.00,30.00"));
    }
}
