// 📒 Transaction table - cleaned, in-memory, one row per transaction
// Nothing here is ever written back; the table lives for one request

use crate::error::IngestError;
use crate::parser::{detect_format, get_parser, RawTransaction, REQUIRED_COLUMNS};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "Date")]
    pub date: NaiveDateTime,

    #[serde(rename = "Description")]
    pub description: String,

    #[serde(rename = "Amount")]
    pub amount: f64,

    #[serde(rename = "Address")]
    pub address: String,

    #[serde(rename = "City/State")]
    pub city_state: String,

    /// Kept as text so leading zeros survive
    #[serde(rename = "Zip Code")]
    pub zip_code: String,

    #[serde(rename = "Country")]
    pub country: String,

    #[serde(rename = "Category")]
    pub category: String,
}

impl Transaction {
    pub fn from_raw(raw: &RawTransaction) -> Result<Self, IngestError> {
        let amount = clean_currency(&raw.amount).ok_or_else(|| IngestError::InvalidAmount {
            line: raw.line_number,
            value: raw.amount.clone(),
        })?;
        let date = parse_date(&raw.date).ok_or_else(|| IngestError::InvalidDate {
            line: raw.line_number,
            value: raw.date.clone(),
        })?;

        Ok(Transaction {
            date,
            description: raw.description.clone(),
            amount,
            address: raw.address.clone(),
            city_state: raw.city_state.clone(),
            zip_code: raw.zip_code.trim().to_string(),
            country: raw.country.clone(),
            category: raw.category.clone(),
        })
    }

    pub fn day(&self) -> NaiveDate {
        self.date.date()
    }

    /// `YYYY-MM` bucket used by the monthly pivot
    pub fn month_key(&self) -> String {
        self.date.format("%Y-%m").to_string()
    }
}

/// The whole upload after cleaning. Row order is the upload order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionTable {
    pub filename: String,
    pub transactions: Vec<Transaction>,
}

impl TransactionTable {
    pub fn new(filename: impl Into<String>, transactions: Vec<Transaction>) -> Self {
        TransactionTable {
            filename: filename.into(),
            transactions,
        }
    }

    pub fn from_raw(filename: impl Into<String>, raw: &[RawTransaction]) -> Result<Self, IngestError> {
        let transactions = raw
            .iter()
            .map(Transaction::from_raw)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(filename, transactions))
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Transaction> {
        self.transactions.iter()
    }

    /// First `page_size` rows for the upload preview
    pub fn preview(&self, page_size: usize) -> Preview {
        Preview {
            filename: self.filename.clone(),
            columns: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            total_rows: self.len(),
            rows: self.transactions.iter().take(page_size).cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preview {
    pub filename: String,
    pub columns: Vec<String>,
    pub total_rows: usize,
    pub rows: Vec<Transaction>,
}

// ============================================================================
// CLEANING
// ============================================================================

/// Strip currency symbol and thousands separators, then parse.
///
/// Accepts `$1,234.56`, `-$12.50`, `(12.50)` and plain numbers.
pub fn clean_currency(text: &str) -> Option<f64> {
    let mut s = text.trim().replace(['$', ','], "");
    let mut negative = false;

    if s.starts_with('(') && s.ends_with(')') && s.len() >= 2 {
        s = s[1..s.len() - 1].trim().to_string();
        negative = true;
    }

    let value: f64 = s.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

// Two-digit years first: %Y would happily read "23" as the year 23.
const DATE_FORMATS: [&str; 3] = ["%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d"];
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

/// Parse the date strings bank exports use. Date-only values land at midnight.
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let s = text.trim();

    for date_fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, date_fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
        for time_fmt in TIME_FORMATS {
            let fmt = format!("{date_fmt} {time_fmt}");
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, &fmt) {
                return Some(dt);
            }
        }
    }

    None
}

// ============================================================================
// LOADING
// ============================================================================

/// Parse and clean an upload. Any failure is an [`IngestError`].
pub fn parse_upload(filename: &str, bytes: &[u8]) -> Result<TransactionTable, IngestError> {
    let format = detect_format(filename);
    let raw = get_parser(format).parse_bytes(bytes)?;
    if raw.is_empty() {
        return Err(IngestError::Empty);
    }

    let table = TransactionTable::from_raw(filename, &raw)?;
    tracing::info!(
        filename,
        format = format.name(),
        rows = table.len(),
        "parsed upload"
    );
    Ok(table)
}

/// Read a statement export from disk; the extension picks the format.
pub fn load_statement(path: &Path) -> anyhow::Result<TransactionTable> {
    use anyhow::Context;

    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown.csv");

    parse_upload(filename, &bytes)
        .with_context(|| format!("Failed to load transactions from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(date: &str, amount: &str) -> RawTransaction {
        RawTransaction {
            date: date.to_string(),
            description: "STARBUCKS".to_string(),
            amount: amount.to_string(),
            address: "1 Main".to_string(),
            city_state: "Austin, TX".to_string(),
            zip_code: " 78701 ".to_string(),
            country: "United States".to_string(),
            category: "Coffee".to_string(),
            line_number: 7,
        }
    }

    #[test]
    fn test_clean_currency_strips_symbols() {
        assert_eq!(clean_currency("$1,234.56"), Some(1234.56));
        assert_eq!(clean_currency(" $45.10 "), Some(45.10));
    }

    #[test]
    fn test_clean_currency_passes_numbers_through() {
        assert_eq!(clean_currency("1234.56"), Some(1234.56));
        assert_eq!(clean_currency("42"), Some(42.0));
    }

    #[test]
    fn test_clean_currency_negatives() {
        assert_eq!(clean_currency("-$12.50"), Some(-12.5));
        assert_eq!(clean_currency("($12.50)"), Some(-12.5));
    }

    #[test]
    fn test_clean_currency_rejects_text() {
        assert_eq!(clean_currency("twelve"), None);
        assert_eq!(clean_currency(""), None);
        assert_eq!(clean_currency("NaN"), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 3, 5).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(parse_date("03/05/2023"), Some(expected));
        assert_eq!(parse_date("3/5/23"), Some(expected));
        assert_eq!(parse_date("2023-03-05"), Some(expected));

        let with_time = parse_date("03/05/2023 14:30").unwrap();
        assert_eq!(with_time.format("%H:%M").to_string(), "14:30");
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn test_transaction_from_raw() {
        let tx = Transaction::from_raw(&raw("01/02/2023", "$3,000.00")).unwrap();
        assert_eq!(tx.amount, 3000.0);
        assert_eq!(tx.zip_code, "78701");
        assert_eq!(tx.month_key(), "2023-01");
    }

    #[test]
    fn test_transaction_from_raw_reports_line() {
        match Transaction::from_raw(&raw("01/02/2023", "abc")) {
            Err(IngestError::InvalidAmount { line, .. }) => assert_eq!(line, 7),
            other => panic!("unexpected: {other:?}"),
        }
        match Transaction::from_raw(&raw("someday", "1.00")) {
            Err(IngestError::InvalidDate { line, .. }) => assert_eq!(line, 7),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_upload_and_preview() {
        let mut csv = String::from("Date,Description,Amount,Address,City/State,Zip Code,Country,Category\n");
        for day in 1..=8 {
            csv.push_str(&format!("01/0{day}/2023,SHOP {day},${day}.00,,,10001,United States,Shopping\n"));
        }

        let table = parse_upload("jan.csv", csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 8);

        let preview = table.preview(5);
        assert_eq!(preview.filename, "jan.csv");
        assert_eq!(preview.rows.len(), 5);
        assert_eq!(preview.total_rows, 8);
        assert_eq!(preview.columns[2], "Amount");
    }

    #[test]
    fn test_parse_upload_empty() {
        let csv = "Date,Description,Amount,Address,City/State,Zip Code,Country,Category\n";
        assert!(matches!(parse_upload("empty.csv", csv.as_bytes()), Err(IngestError::Empty)));
    }

    #[test]
    fn test_parse_upload_truncated_workbook_fails() {
        assert!(matches!(
            parse_upload("book.xlsx", b"PK"),
            Err(IngestError::Workbook(_))
        ));
    }
}
