//! Naive CSV helpers for the import/export dialogs.
//!
//! Deliberately NOT RFC 4180: rows are split on raw commas with no escape
//! handling on import, and export only wraps a field in double quotes when
//! it contains a comma. This matches the dashboard's import/export format,
//! which is part of the contract with existing user files.

/// A parsed CSV document: lower-cased headers plus raw row values.
#[derive(Debug)]
pub struct CsvDocument {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Parse CSV text. The first non-empty line is the header row; headers are
/// trimmed and lower-cased, values only trimmed. Fails when there is no
/// data row.
pub fn parse(text: &str) -> Result<CsvDocument, String> {
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();

    if lines.len() < 2 {
        return Err("File must contain at least a header and one data row".to_string());
    }

    let headers: Vec<String> = lines[0]
        .split(',')
        .map(|h| h.trim().to_lowercase())
        .collect();

    let rows: Vec<Vec<String>> = lines[1..]
        .iter()
        .map(|line| line.split(',').map(|v| v.trim().to_string()).collect())
        .collect();

    Ok(CsvDocument { headers, rows })
}

impl CsvDocument {
    /// Value of `column` in `row`, None when the column is missing or the
    /// row is short.
    pub fn value(&self, row: &[String], column: &str) -> Option<String> {
        let idx = self.headers.iter().position(|h| h == column)?;
        row.get(idx).cloned().filter(|v| !v.is_empty())
    }
}

/// Serialize rows to CSV text. Fields containing a comma are wrapped in
/// double quotes; everything else is emitted raw.
pub fn emit(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    out.push_str(&headers.join(","));
    for row in rows {
        out.push('\n');
        let encoded: Vec<String> = row.iter().map(|v| encode_field(v)).collect();
        out.push_str(&encoded.join(","));
    }
    out
}

fn encode_field(value: &str) -> String {
    if value.contains(',') {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}
