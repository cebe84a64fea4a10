//! Plain-text invoice rendering for completed sales.
//!
//! Produces a fixed-width (42 column) document the frontend hands to the
//! browser print dialog, replacing the HTML invoice template.

use crate::currency;
use crate::sales::SaleWithItems;

const WIDTH: usize = 42;

/// Render a completed sale as a printable invoice.
pub fn render(sale: &SaleWithItems, store_name: &str) -> String {
    let mut out = String::new();
    let rule = "=".repeat(WIDTH);
    let thin = "-".repeat(WIDTH);

    push_centered(&mut out, store_name);
    push_centered(&mut out, "Point of Sale Terminal");
    out.push_str(&rule);
    out.push('\n');
    push_centered(&mut out, "SALES INVOICE");
    push_centered(&mut out, &format!("Invoice # {}", sale.sale.sale_number));
    out.push_str(&rule);
    out.push('\n');

    let (date, time) = split_timestamp(&sale.sale.created_at);
    out.push_str(&format!("Date: {date}\n"));
    out.push_str(&format!("Time: {time}\n"));
    out.push_str(&format!(
        "Payment Method: {}\n",
        sale.sale.payment_method.to_uppercase()
    ));
    if let Some(name) = sale.sale.customer_name.as_deref().filter(|n| !n.is_empty()) {
        out.push_str(&format!("Customer: {name}\n"));
    }
    if let Some(phone) = sale
        .sale
        .customer_phone
        .as_deref()
        .filter(|p| !p.is_empty())
    {
        out.push_str(&format!("Phone: {phone}\n"));
    }

    out.push_str(&thin);
    out.push('\n');
    out.push_str(&item_line("Item", "Qty", "Price", "Total"));
    out.push_str(&thin);
    out.push('\n');

    for item in &sale.sale_items {
        out.push_str(&item_line(
            &item.product_name,
            &item.quantity.to_string(),
            &currency::format(item.unit_price, 2, false),
            &currency::format(item.total_price, 2, false),
        ));
    }

    out.push_str(&thin);
    out.push('\n');
    push_total(&mut out, "Subtotal:", sale.sale.subtotal);
    push_total(&mut out, "Tax:", sale.sale.tax_amount);
    if sale.sale.discount_amount > 0.0 {
        push_total(&mut out, "Discount:", -sale.sale.discount_amount);
    }
    push_total(&mut out, "TOTAL:", sale.sale.total_amount);
    push_total(&mut out, "Received:", sale.sale.payment_received);
    push_total(&mut out, "Change:", sale.sale.change_amount);

    out.push_str(&rule);
    out.push('\n');
    push_centered(&mut out, "Thank you for your purchase!");

    out
}

fn push_centered(out: &mut String, text: &str) {
    let text = truncate(text, WIDTH);
    let pad = (WIDTH.saturating_sub(text.chars().count())) / 2;
    out.push_str(&" ".repeat(pad));
    out.push_str(&text);
    out.push('\n');
}

/// One item row: name left-padded into 20 cols, qty 4, price 8, total 9.
fn item_line(name: &str, qty: &str, price: &str, total: &str) -> String {
    format!(
        "{:<20}{:>4}{:>8}{:>9}\n",
        truncate(name, 20),
        truncate(qty, 4),
        truncate(price, 8),
        truncate(total, 9),
    )
}

fn push_total(out: &mut String, label: &str, amount: f64) {
    let value = if amount < 0.0 {
        format!("-{}", currency::format(-amount, 2, true))
    } else {
        currency::format(amount, 2, true)
    };
    out.push_str(&format!("{:>26}{:>16}\n", label, value));
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}

fn split_timestamp(ts: &str) -> (String, String) {
    match ts.split_once(' ').or_else(|| ts.split_once('T')) {
        Some((date, time)) => (date.to_string(), truncate(time, 8)),
        None => (ts.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sales::{Sale, SaleItem, SaleWithItems};

    fn sample_sale() -> SaleWithItems {
        SaleWithItems {
            sale: Sale {
                id: "sale-1".into(),
                sale_number: "S-20250101-0007".into(),
                cashier_id: "cashier-1".into(),
                customer_id: None,
                customer_name: Some("John Smith".into()),
                customer_phone: None,
                subtotal: 11.27,
                tax_amount: 0.9,
                discount_amount: 0.0,
                total_amount: 12.17,
                payment_method: "cash".into(),
                payment_received: 20.0,
                change_amount: 7.83,
                notes: None,
                created_at: "2025-01-01 14:33:12".into(),
            },
            sale_items: vec![
                SaleItem {
                    id: "si-1".into(),
                    sale_id: "sale-1".into(),
                    product_id: "p-milk".into(),
                    product_name: "Whole Milk".into(),
                    quantity: 2,
                    unit_price: 4.49,
                    total_price: 8.98,
                },
                SaleItem {
                    id: "si-2".into(),
                    sale_id: "sale-1".into(),
                    product_id: "p-bread".into(),
                    product_name: "A Very Long Product Name That Overflows".into(),
                    quantity: 1,
                    unit_price: 2.29,
                    total_price: 2.29,
                },
            ],
        }
    }

    #[test]
    fn invoice_contains_header_items_and_totals() {
        let text = render(&sample_sale(), "POS SYSTEM");
        assert!(text.contains("Invoice # S-20250101-0007"));
        assert!(text.contains("Whole Milk"));
        assert!(text.contains("Payment Method: CASH"));
        assert!(text.contains("Customer: John Smith"));
        assert!(text.contains("₨12.17"));
        assert!(text.contains("Change:"));
        assert!(text.contains("Thank you for your purchase!"));
    }

    #[test]
    fn lines_fit_the_receipt_width() {
        let text = render(&sample_sale(), "POS SYSTEM");
        for line in text.lines() {
            assert!(
                line.chars().count() <= WIDTH + 1,
                "line too wide: {line:?}"
            );
        }
    }

    #[test]
    fn discount_line_only_when_present() {
        let mut sale = sample_sale();
        let text = render(&sale, "POS SYSTEM");
        assert!(!text.contains("Discount:"));

        sale.sale.discount_amount = 1.5;
        let text = render(&sale, "POS SYSTEM");
        assert!(text.contains("Discount:"));
        assert!(text.contains("-₨1.50"));
    }
}
