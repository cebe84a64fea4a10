//! Currency formatting helpers for PKR (Pakistani Rupees).

/// Currency symbol shown in front of formatted amounts.
pub const CURRENCY_SYMBOL: &str = "₨";
/// ISO currency code.
pub const CURRENCY_CODE: &str = "PKR";

/// Format an amount as PKR with thousands separators.
///
/// `decimals` is the fixed number of fraction digits; `show_symbol`
/// controls the leading `₨`.
pub fn format(amount: f64, decimals: usize, show_symbol: bool) -> String {
    let formatted = group_thousands(amount, decimals);
    if show_symbol {
        format!("{CURRENCY_SYMBOL}{formatted}")
    } else {
        formatted
    }
}

/// Format with the default two decimals and symbol.
pub fn format_default(amount: f64) -> String {
    format(amount, 2, true)
}

/// Shorter form for cards/lists: lakh above 100k, K above 1k.
pub fn format_compact(amount: f64) -> String {
    if amount >= 100_000.0 {
        format!("{CURRENCY_SYMBOL}{:.1}L", amount / 100_000.0)
    } else if amount >= 1_000.0 {
        format!("{CURRENCY_SYMBOL}{:.1}K", amount / 1_000.0)
    } else {
        format_default(amount)
    }
}

/// Parse a currency string back to a number. Strips the symbol, commas,
/// and any other non-numeric characters; returns 0.0 on garbage.
pub fn parse(currency_string: &str) -> f64 {
    let clean: String = currency_string
        .replace(CURRENCY_SYMBOL, "")
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    clean.parse::<f64>().unwrap_or(0.0)
}

/// Render `amount` to `decimals` fraction digits with comma-grouped
/// integer part.
fn group_thousands(amount: f64, decimals: usize) -> String {
    let raw = format!("{:.*}", decimals, amount.abs());
    let (int_part, frac_part) = match raw.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (raw.as_str(), None),
    };

    let mut grouped = String::new();
    let digits: Vec<char> = int_part.chars().collect();
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }

    let sign = if amount < 0.0 && raw.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_groups_thousands() {
        assert_eq!(format_default(45678.9), "₨45,678.90");
        assert_eq!(format_default(0.0), "₨0.00");
        assert_eq!(format(2847.0, 0, true), "₨2,847");
        assert_eq!(format(1234567.5, 2, false), "1,234,567.50");
    }

    #[test]
    fn format_negative_amounts() {
        assert_eq!(format(-1250.5, 2, false), "-1,250.50");
        assert_eq!(format(-0.004, 2, false), "0.00");
    }

    #[test]
    fn compact_uses_lakh_and_k() {
        assert_eq!(format_compact(250_000.0), "₨2.5L");
        assert_eq!(format_compact(1_500.0), "₨1.5K");
        assert_eq!(format_compact(999.0), "₨999.00");
    }

    #[test]
    fn parse_strips_symbol_and_commas() {
        assert!((parse("₨45,678.90") - 45678.9).abs() < 1e-9);
        assert!((parse("1,000") - 1000.0).abs() < 1e-9);
        assert_eq!(parse("not a number"), 0.0);
    }
}
