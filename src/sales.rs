//! Point-of-sale checkout: cart, totals, sale numbering, and the
//! transactional completion that writes the sale, its line items, and the
//! per-item stock decrements together.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::stock::{self, MovementRef, MovementType, StockError};

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Quantity for {name} exceeds available stock ({available})")]
    ExceedsStock { name: String, available: i64 },
    #[error("Payment received ({received:.2}) is less than total ({total:.2})")]
    InsufficientPayment { received: f64, total: f64 },
    #[error("Unknown payment method: {0}")]
    InvalidPaymentMethod(String),
    #[error(transparent)]
    Stock(#[from] StockError),
    #[error("checkout: {0}")]
    Db(#[from] rusqlite::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    DigitalWallet,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::DigitalWallet => "digital_wallet",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CheckoutError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "digital_wallet" => Ok(PaymentMethod::DigitalWallet),
            other => Err(CheckoutError::InvalidPaymentMethod(other.to_string())),
        }
    }
}

/// One line in the cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub product_name: String,
    pub unit_price: f64,
    pub quantity: i64,
    #[serde(default)]
    pub unit: String,
}

/// The POS cart. Quantities are bounded by the stock figure supplied with
/// each mutation (the screen passes the fetched product row's stock).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
}

/// Totals block rendered next to the cart.
#[derive(Debug, Clone, Serialize)]
pub struct CartTotals {
    pub subtotal: f64,
    pub tax_amount: f64,
    pub discount_amount: f64,
    pub total_amount: f64,
}

impl Cart {
    /// Add `quantity` of a product, merging with an existing line. Fails
    /// when the merged quantity would exceed `available_stock`.
    pub fn add(
        &mut self,
        product_id: &str,
        product_name: &str,
        unit_price: f64,
        unit: &str,
        quantity: i64,
        available_stock: i64,
    ) -> Result<(), CheckoutError> {
        let existing = self
            .items
            .iter_mut()
            .find(|item| item.product_id == product_id);
        let requested = existing.as_ref().map(|i| i.quantity).unwrap_or(0) + quantity;
        if requested > available_stock {
            return Err(CheckoutError::ExceedsStock {
                name: product_name.to_string(),
                available: available_stock,
            });
        }
        match existing {
            Some(item) => item.quantity = requested,
            None => self.items.push(CartItem {
                product_id: product_id.to_string(),
                product_name: product_name.to_string(),
                unit_price,
                quantity,
                unit: unit.to_string(),
            }),
        }
        Ok(())
    }

    /// Change a line's quantity by `delta` (clamped at the available
    /// stock going up); a line reaching zero is removed.
    pub fn update_quantity(
        &mut self,
        product_id: &str,
        delta: i64,
        available_stock: i64,
    ) -> Result<(), CheckoutError> {
        if let Some(pos) = self.items.iter().position(|i| i.product_id == product_id) {
            let next = self.items[pos].quantity + delta;
            if next > available_stock {
                return Err(CheckoutError::ExceedsStock {
                    name: self.items[pos].product_name.clone(),
                    available: available_stock,
                });
            }
            if next <= 0 {
                self.items.remove(pos);
            } else {
                self.items[pos].quantity = next;
            }
        }
        Ok(())
    }

    /// Drop a line entirely.
    pub fn remove(&mut self, product_id: &str) {
        self.items.retain(|item| item.product_id != product_id);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// subtotal = Σ(price × qty); tax applies to the subtotal; discount
    /// comes off after tax.
    pub fn totals(&self, tax_rate: f64, discount_amount: f64) -> CartTotals {
        let subtotal: f64 = self
            .items
            .iter()
            .map(|item| item.unit_price * item.quantity as f64)
            .sum();
        let tax_amount = subtotal * tax_rate;
        CartTotals {
            subtotal,
            tax_amount,
            discount_amount,
            total_amount: subtotal + tax_amount - discount_amount,
        }
    }
}

/// A completed sale row.
#[derive(Debug, Clone, Serialize)]
pub struct Sale {
    pub id: String,
    pub sale_number: String,
    pub cashier_id: String,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub subtotal: f64,
    pub tax_amount: f64,
    pub discount_amount: f64,
    pub total_amount: f64,
    pub payment_method: String,
    pub payment_received: f64,
    pub change_amount: f64,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub total_price: f64,
}

/// A sale with its nested line items, as the invoice history renders it.
#[derive(Debug, Clone, Serialize)]
pub struct SaleWithItems {
    #[serde(flatten)]
    pub sale: Sale,
    pub sale_items: Vec<SaleItem>,
}

/// Customer details optionally attached at checkout.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutCustomer {
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
}

/// Generate the next sale number: `S-YYYYMMDD-NNNN` with a per-day
/// counter derived from the highest existing number for the day.
pub fn generate_sale_number(conn: &Connection) -> Result<String, rusqlite::Error> {
    let day = chrono::Local::now().format("%Y%m%d").to_string();
    let prefix = format!("S-{day}-");
    let max_existing: Option<String> = conn
        .query_row(
            "SELECT MAX(sale_number) FROM sales WHERE sale_number LIKE ?1 || '%'",
            params![prefix],
            |row| row.get(0),
        )
        .unwrap_or(None);

    let next = max_existing
        .as_deref()
        .and_then(|n| n.rsplit('-').next())
        .and_then(|n| n.parse::<u32>().ok())
        .unwrap_or(0)
        + 1;

    Ok(format!("{prefix}{next:04}"))
}

/// Complete a checkout: one transaction writes the sale row, every line
/// item, and every stock decrement. Any failure rolls the whole sale back.
#[allow(clippy::too_many_arguments)]
pub fn checkout_complete(
    conn: &mut Connection,
    cart: &Cart,
    payment_method: PaymentMethod,
    payment_received: f64,
    discount_amount: f64,
    customer: &CheckoutCustomer,
    notes: Option<&str>,
    cashier_id: &str,
    tax_rate: f64,
) -> Result<SaleWithItems, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let totals = cart.totals(tax_rate, discount_amount);

    // Cash must cover the total; card/wallet charge exactly the total.
    let (received, change) = match payment_method {
        PaymentMethod::Cash => {
            if payment_received + 1e-9 < totals.total_amount {
                return Err(CheckoutError::InsufficientPayment {
                    received: payment_received,
                    total: totals.total_amount,
                });
            }
            (payment_received, payment_received - totals.total_amount)
        }
        PaymentMethod::Card | PaymentMethod::DigitalWallet => (totals.total_amount, 0.0),
    };

    let tx = conn.transaction()?;

    let sale_id = Uuid::new_v4().to_string();
    let sale_number = generate_sale_number(&tx)?;

    tx.execute(
        "INSERT INTO sales (id, sale_number, cashier_id, customer_id, customer_name,
            customer_phone, subtotal, tax_amount, discount_amount, total_amount,
            payment_method, payment_received, change_amount, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            sale_id,
            sale_number,
            cashier_id,
            customer.customer_id,
            customer.customer_name,
            customer.customer_phone,
            totals.subtotal,
            totals.tax_amount,
            totals.discount_amount,
            totals.total_amount,
            payment_method.as_str(),
            received,
            change,
            notes,
        ],
    )?;

    for item in &cart.items {
        let total_price = item.unit_price * item.quantity as f64;
        tx.execute(
            "INSERT INTO sale_items (id, sale_id, product_id, product_name, quantity,
                unit_price, total_price)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                Uuid::new_v4().to_string(),
                sale_id,
                item.product_id,
                item.product_name,
                item.quantity,
                item.unit_price,
                total_price,
            ],
        )?;

        stock::update_product_stock(
            &tx,
            &item.product_id,
            -item.quantity,
            MovementType::Sale,
            MovementRef {
                reference_type: Some("sale"),
                reference_id: Some(&sale_id),
                notes: None,
            },
            cashier_id,
        )?;
    }

    tx.commit()?;

    sale_get(conn, &sale_id)?
        .ok_or(CheckoutError::Db(rusqlite::Error::QueryReturnedNoRows))
}

const SALE_COLUMNS: &str = "id, sale_number, cashier_id, customer_id, customer_name, \
     customer_phone, subtotal, tax_amount, discount_amount, total_amount, payment_method, \
     payment_received, change_amount, notes, created_at";

fn sale_from_row(row: &Row<'_>) -> rusqlite::Result<Sale> {
    Ok(Sale {
        id: row.get(0)?,
        sale_number: row.get(1)?,
        cashier_id: row.get(2)?,
        customer_id: row.get(3)?,
        customer_name: row.get(4)?,
        customer_phone: row.get(5)?,
        subtotal: row.get(6)?,
        tax_amount: row.get(7)?,
        discount_amount: row.get(8)?,
        total_amount: row.get(9)?,
        payment_method: row.get(10)?,
        payment_received: row.get(11)?,
        change_amount: row.get(12)?,
        notes: row.get(13)?,
        created_at: row.get(14)?,
    })
}

fn sale_item_from_row(row: &Row<'_>) -> rusqlite::Result<SaleItem> {
    Ok(SaleItem {
        id: row.get(0)?,
        sale_id: row.get(1)?,
        product_id: row.get(2)?,
        product_name: row.get(3)?,
        quantity: row.get(4)?,
        unit_price: row.get(5)?,
        total_price: row.get(6)?,
    })
}

fn load_items(conn: &Connection, sale_id: &str) -> rusqlite::Result<Vec<SaleItem>> {
    let mut stmt = conn.prepare(
        "SELECT id, sale_id, product_id, product_name, quantity, unit_price, total_price
         FROM sale_items WHERE sale_id = ?1 ORDER BY created_at, id",
    )?;
    let rows = stmt.query_map(params![sale_id], sale_item_from_row)?;
    rows.collect()
}

/// Fetch one sale with its items.
pub fn sale_get(conn: &Connection, sale_id: &str) -> rusqlite::Result<Option<SaleWithItems>> {
    use rusqlite::OptionalExtension;
    let sale = conn
        .query_row(
            &format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"),
            params![sale_id],
            sale_from_row,
        )
        .optional()?;
    match sale {
        Some(sale) => {
            let sale_items = load_items(conn, &sale.id)?;
            Ok(Some(SaleWithItems { sale, sale_items }))
        }
        None => Ok(None),
    }
}

/// Most recent sales with nested items, for the invoice history panel.
pub fn sales_get_recent(conn: &Connection, limit: i64) -> Result<Vec<SaleWithItems>, String> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {SALE_COLUMNS} FROM sales ORDER BY created_at DESC, sale_number DESC LIMIT ?1"
        ))
        .map_err(|e| format!("recent sales: {e}"))?;
    let sales: Vec<Sale> = stmt
        .query_map(params![limit], sale_from_row)
        .map_err(|e| format!("recent sales: {e}"))?
        .filter_map(|r| r.ok())
        .collect();

    let mut out = Vec::with_capacity(sales.len());
    for sale in sales {
        let sale_items = load_items(conn, &sale.id).map_err(|e| format!("sale items: {e}"))?;
        out.push(SaleWithItems { sale, sale_items });
    }
    Ok(out)
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
        conn.execute_batch("PRAGMA foreign_keys = ON;").expect("pragmas");
        db::run_migrations_for_test(&conn);
        conn.execute_batch(
            "INSERT INTO products (id, name, unit_price, cost_price, current_stock, unit)
             VALUES ('p-milk', 'Whole Milk', 4.49, 3.1, 10, 'bottle');
             INSERT INTO products (id, name, unit_price, cost_price, current_stock, unit)
             VALUES ('p-bread', 'White Bread', 2.29, 1.2, 2, 'loaf');",
        )
        .expect("seed products");
        conn
    }

    fn filled_cart() -> Cart {
        let mut cart = Cart::default();
        cart.add("p-milk", "Whole Milk", 4.49, "bottle", 2, 10)
            .expect("add milk");
        cart.add("p-bread", "White Bread", 2.29, "loaf", 1, 2)
            .expect("add bread");
        cart
    }

    #[test]
    fn cart_merges_lines_and_bounds_stock() {
        let mut cart = Cart::default();
        cart.add("p-milk", "Whole Milk", 4.49, "bottle", 2, 3)
            .expect("first add");
        cart.add("p-milk", "Whole Milk", 4.49, "bottle", 1, 3)
            .expect("merge");
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 3);

        let err = cart
            .add("p-milk", "Whole Milk", 4.49, "bottle", 1, 3)
            .expect_err("over stock");
        assert!(matches!(err, CheckoutError::ExceedsStock { available: 3, .. }));
    }

    #[test]
    fn decrement_to_zero_removes_line() {
        let mut cart = Cart::default();
        cart.add("p-bread", "White Bread", 2.29, "loaf", 1, 5)
            .expect("add");
        cart.update_quantity("p-bread", -1, 5).expect("decrement");
        assert!(cart.is_empty());

        // Unknown product is a no-op
        cart.update_quantity("ghost", 1, 5).expect("noop");
        assert!(cart.is_empty());
    }

    #[test]
    fn totals_apply_eight_percent_tax() {
        let cart = filled_cart();
        let totals = cart.totals(0.08, 0.0);
        let subtotal = 2.0 * 4.49 + 2.29;
        assert!((totals.subtotal - subtotal).abs() < 1e-9);
        assert!((totals.tax_amount - subtotal * 0.08).abs() < 1e-9);
        assert!((totals.total_amount - subtotal * 1.08).abs() < 1e-9);
    }

    #[test]
    fn totals_subtract_discount() {
        let cart = filled_cart();
        let totals = cart.totals(0.08, 1.0);
        assert!((totals.total_amount - (totals.subtotal + totals.tax_amount - 1.0)).abs() < 1e-9);
    }

    #[test]
    fn sale_numbers_increment_within_day() {
        let conn = test_db();
        let day = chrono::Local::now().format("%Y%m%d").to_string();

        let first = generate_sale_number(&conn).expect("first");
        assert_eq!(first, format!("S-{day}-0001"));

        conn.execute(
            "INSERT INTO sales (id, sale_number, cashier_id, payment_method)
             VALUES ('s1', ?1, 'u1', 'cash')",
            params![first],
        )
        .expect("insert");

        let second = generate_sale_number(&conn).expect("second");
        assert_eq!(second, format!("S-{day}-0002"));
    }

    #[test]
    fn checkout_writes_sale_items_and_stock() {
        let mut conn = test_db();
        let cart = filled_cart();

        let sale = checkout_complete(
            &mut conn,
            &cart,
            PaymentMethod::Cash,
            20.0,
            0.0,
            &CheckoutCustomer {
                customer_name: Some("Walk-in Customer".into()),
                ..Default::default()
            },
            None,
            "cashier-1",
            0.08,
        )
        .expect("checkout");

        assert_eq!(sale.sale_items.len(), 2);
        assert_eq!(sale.sale.payment_method, "cash");
        let expected_total = (2.0 * 4.49 + 2.29) * 1.08;
        assert!((sale.sale.total_amount - expected_total).abs() < 1e-9);
        assert!((sale.sale.change_amount - (20.0 - expected_total)).abs() < 1e-9);

        // Stock decremented and movements recorded
        let milk_stock: i64 = conn
            .query_row(
                "SELECT current_stock FROM products WHERE id = 'p-milk'",
                [],
                |row| row.get(0),
            )
            .expect("milk stock");
        assert_eq!(milk_stock, 8);

        let movements: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM stock_movements WHERE reference_id = ?1",
                params![sale.sale.id],
                |row| row.get(0),
            )
            .expect("movements");
        assert_eq!(movements, 2);
    }

    #[test]
    fn checkout_rolls_back_on_insufficient_stock() {
        let mut conn = test_db();
        let mut cart = Cart::default();
        cart.add("p-milk", "Whole Milk", 4.49, "bottle", 2, 10)
            .expect("add milk");
        // Lie about availability so the cart accepts more bread than stocked
        cart.add("p-bread", "White Bread", 2.29, "loaf", 5, 99)
            .expect("add bread");

        let err = checkout_complete(
            &mut conn,
            &cart,
            PaymentMethod::Card,
            0.0,
            0.0,
            &CheckoutCustomer::default(),
            None,
            "cashier-1",
            0.08,
        )
        .expect_err("should fail on bread stock");
        assert!(matches!(
            err,
            CheckoutError::Stock(StockError::InsufficientStock { .. })
        ));

        // Everything rolled back: no sale, no items, milk stock untouched
        let sales: i64 = conn
            .query_row("SELECT COUNT(*) FROM sales", [], |row| row.get(0))
            .expect("sales count");
        assert_eq!(sales, 0);
        let items: i64 = conn
            .query_row("SELECT COUNT(*) FROM sale_items", [], |row| row.get(0))
            .expect("items count");
        assert_eq!(items, 0);
        let milk_stock: i64 = conn
            .query_row(
                "SELECT current_stock FROM products WHERE id = 'p-milk'",
                [],
                |row| row.get(0),
            )
            .expect("milk stock");
        assert_eq!(milk_stock, 10);
    }

    #[test]
    fn cash_checkout_requires_covering_payment() {
        let mut conn = test_db();
        let cart = filled_cart();
        let err = checkout_complete(
            &mut conn,
            &cart,
            PaymentMethod::Cash,
            5.0,
            0.0,
            &CheckoutCustomer::default(),
            None,
            "cashier-1",
            0.08,
        )
        .expect_err("under-payment");
        assert!(matches!(err, CheckoutError::InsufficientPayment { .. }));
    }

    #[test]
    fn empty_cart_rejected() {
        let mut conn = test_db();
        let err = checkout_complete(
            &mut conn,
            &Cart::default(),
            PaymentMethod::Cash,
            0.0,
            0.0,
            &CheckoutCustomer::default(),
            None,
            "cashier-1",
            0.08,
        )
        .expect_err("empty cart");
        assert!(matches!(err, CheckoutError::EmptyCart));
    }

    #[test]
    fn recent_sales_nest_items_newest_first() {
        let mut conn = test_db();
        let mut cart_a = Cart::default();
        cart_a
            .add("p-milk", "Whole Milk", 4.49, "bottle", 1, 10)
            .expect("add");
        checkout_complete(
            &mut conn,
            &cart_a,
            PaymentMethod::Card,
            0.0,
            0.0,
            &CheckoutCustomer::default(),
            None,
            "cashier-1",
            0.08,
        )
        .expect("first sale");

        let mut cart_b = Cart::default();
        cart_b
            .add("p-bread", "White Bread", 2.29, "loaf", 2, 2)
            .expect("add");
        checkout_complete(
            &mut conn,
            &cart_b,
            PaymentMethod::Cash,
            10.0,
            0.0,
            &CheckoutCustomer::default(),
            None,
            "cashier-1",
            0.08,
        )
        .expect("second sale");

        let recent = sales_get_recent(&conn, 50).expect("recent");
        assert_eq!(recent.len(), 2);
        // Same created_at second is possible; sale_number breaks the tie
        assert!(recent[0].sale.sale_number > recent[1].sale.sale_number);
        assert_eq!(recent[0].sale_items.len(), 1);
        assert_eq!(recent[0].sale_items[0].product_name, "White Bread");
    }

    #[test]
    fn payment_method_parsing() {
        assert_eq!(
            PaymentMethod::parse("cash").expect("parse"),
            PaymentMethod::Cash
        );
        assert_eq!(
            PaymentMethod::parse("Digital_Wallet").expect("parse"),
            PaymentMethod::DigitalWallet
        );
        assert!(PaymentMethod::parse("crypto").is_err());
    }
}
