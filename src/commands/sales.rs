//! POS screen commands: product search feed, barcode resolution,
//! checkout, invoice history, and invoice rendering.

use serde::Deserialize;
use serde_json::Value;
use tauri::Emitter;
use tracing::info;

use crate::sales::{Cart, CartItem, CheckoutCustomer, PaymentMethod};
use crate::{auth, catalog, db, invoice, sales};

#[derive(Debug, Deserialize)]
pub struct CheckoutPayload {
    pub items: Vec<CartItem>,
    pub payment_method: String,
    #[serde(default)]
    pub payment_received: f64,
    #[serde(default)]
    pub discount_amount: f64,
    #[serde(flatten)]
    pub customer: CheckoutCustomer,
    #[serde(default)]
    pub notes: Option<String>,
}

fn validate_checkout_payload(payload: &CheckoutPayload) -> Result<(), String> {
    if payload.items.is_empty() {
        return Err("Cart is empty".to_string());
    }
    if payload
        .items
        .iter()
        .any(|item| item.quantity <= 0 || item.unit_price < 0.0)
    {
        return Err("Cart contains an invalid line item".to_string());
    }
    if payload.discount_amount < 0.0 {
        return Err("Discount cannot be negative".to_string());
    }
    Ok(())
}

/// Product grid feed: active products matching the search box.
#[tauri::command]
pub async fn pos_search_products(
    query: Option<String>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let products =
        catalog::product_search(&conn, query.as_deref().unwrap_or(""), None, true)?;
    Ok(serde_json::json!(products))
}

/// Resolve a scanned code to a product for the add-to-cart flow.
#[tauri::command]
pub async fn pos_lookup_barcode(
    barcode: String,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    Ok(catalog::product_get_by_barcode(&conn, &barcode)?
        .filter(|p| p.is_active)
        .map(|p| serde_json::json!(p))
        .unwrap_or(Value::Null))
}

/// Complete the sale: one transaction writes the sale, line items, and
/// stock decrements; returns the persisted sale with items.
#[tauri::command]
pub async fn checkout_complete(
    payload: CheckoutPayload,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
    app: tauri::AppHandle,
) -> Result<Value, String> {
    validate_checkout_payload(&payload)?;

    let cashier_id =
        auth::current_user_id(&auth_state)?.ok_or_else(|| "Not logged in".to_string())?;
    let payment_method = PaymentMethod::parse(&payload.payment_method).map_err(|e| e.to_string())?;

    let cart = Cart {
        items: payload.items.clone(),
    };

    let mut conn = db.conn.lock().map_err(|e| e.to_string())?;
    let tax_rate = db::get_tax_rate(&conn);
    let sale = sales::checkout_complete(
        &mut conn,
        &cart,
        payment_method,
        payload.payment_received,
        payload.discount_amount,
        &payload.customer,
        payload.notes.as_deref(),
        &cashier_id,
        tax_rate,
    )
    .map_err(|e| e.to_string())?;
    drop(conn);

    info!(
        sale_number = %sale.sale.sale_number,
        total = sale.sale.total_amount,
        "sale completed"
    );
    let _ = app.emit("sale_completed", serde_json::json!(&sale));
    Ok(serde_json::json!({ "success": true, "data": sale }))
}

/// Invoice history: most recent sales with nested items.
#[tauri::command]
pub async fn sales_get_recent(
    limit: Option<i64>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let sales = sales::sales_get_recent(&conn, limit.unwrap_or(50))?;
    Ok(serde_json::json!(sales))
}

/// Render a sale's printable invoice text.
#[tauri::command]
pub async fn invoice_render(
    sale_id: String,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let sale = sales::sale_get(&conn, &sale_id)
        .map_err(|e| format!("sale lookup: {e}"))?
        .ok_or_else(|| "Sale not found".to_string())?;
    let store_name = db::get_setting(&conn, "store", "name").unwrap_or_else(|| "POS SYSTEM".into());
    Ok(serde_json::json!({
        "saleNumber": sale.sale.sale_number,
        "text": invoice::render(&sale, &store_name),
    }))
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    fn payload(items: Vec<CartItem>) -> CheckoutPayload {
        CheckoutPayload {
            items,
            payment_method: "cash".to_string(),
            payment_received: 20.0,
            discount_amount: 0.0,
            customer: CheckoutCustomer::default(),
            notes: None,
        }
    }

    fn item(qty: i64, price: f64) -> CartItem {
        CartItem {
            product_id: "p1".to_string(),
            product_name: "Milk".to_string(),
            unit_price: price,
            quantity: qty,
            unit: "pcs".to_string(),
        }
    }

    #[test]
    fn checkout_payload_parses_with_flattened_customer() {
        let parsed: CheckoutPayload = serde_json::from_value(serde_json::json!({
            "items": [
                { "product_id": "p1", "product_name": "Milk", "unit_price": 4.49, "quantity": 2 }
            ],
            "payment_method": "card",
            "customer_name": "John Smith",
            "customer_phone": "0301-1234567"
        }))
        .expect("payload should parse");
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].quantity, 2);
        assert_eq!(parsed.customer.customer_name.as_deref(), Some("John Smith"));
        assert_eq!(parsed.payment_received, 0.0);
        validate_checkout_payload(&parsed).expect("valid");
    }

    #[test]
    fn validation_rejects_bad_lines() {
        assert!(validate_checkout_payload(&payload(vec![])).is_err());
        assert!(validate_checkout_payload(&payload(vec![item(0, 1.0)])).is_err());
        assert!(validate_checkout_payload(&payload(vec![item(1, -1.0)])).is_err());

        let mut negative_discount = payload(vec![item(1, 1.0)]);
        negative_discount.discount_amount = -2.0;
        assert!(validate_checkout_payload(&negative_discount).is_err());

        validate_checkout_payload(&payload(vec![item(1, 1.0)])).expect("valid");
    }
}
