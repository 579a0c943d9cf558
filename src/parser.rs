// 🏗️ Upload Parser Framework
// Turns an uploaded statement export into raw text rows

use crate::error::IngestError;
use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Columns every statement export must carry, in display order.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "Date",
    "Description",
    "Amount",
    "Address",
    "City/State",
    "Zip Code",
    "Country",
    "Category",
];

// ============================================================================
// CORE TYPES
// ============================================================================

/// UploadFormat - what kind of file the user handed us
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadFormat {
    Csv,
    Excel,
}

impl UploadFormat {
    pub fn name(&self) -> &str {
        match self {
            UploadFormat::Csv => "CSV",
            UploadFormat::Excel => "Excel",
        }
    }
}

/// RawTransaction - one uploaded row, still as text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub date: String,
    pub description: String,
    pub amount: String,
    pub address: String,
    pub city_state: String,
    pub zip_code: String,
    pub country: String,
    pub category: String,

    /// Line in the uploaded file (header is line 1)
    pub line_number: usize,
}

/// StatementParser - turns upload bytes into raw rows
///
/// Adding a format means adding an implementation and a branch in
/// [`get_parser`]; nothing else changes.
pub trait StatementParser: Send + Sync {
    fn parse_bytes(&self, bytes: &[u8]) -> Result<Vec<RawTransaction>, IngestError>;

    fn format(&self) -> UploadFormat;
}

// ============================================================================
// FACTORY FUNCTIONS
// ============================================================================

/// Detect the upload format from its filename.
///
/// Anything that is not obviously a spreadsheet is attempted as CSV.
pub fn detect_format(filename: &str) -> UploadFormat {
    let lower = filename.to_lowercase();
    if lower.ends_with(".xls") || lower.ends_with(".xlsx") {
        UploadFormat::Excel
    } else {
        UploadFormat::Csv
    }
}

pub fn get_parser(format: UploadFormat) -> Box<dyn StatementParser> {
    match format {
        UploadFormat::Csv => Box::new(CsvParser::new()),
        UploadFormat::Excel => Box::new(ExcelParser),
    }
}

// ============================================================================
// COLUMN MAPPING
// ============================================================================

/// Re-saved exports name blank header cells "Unnamed: N"; both forms are dropped.
fn is_unnamed(header: &str) -> bool {
    let h = header.trim();
    h.is_empty() || h.starts_with("Unnamed")
}

/// Where each required column sits in the uploaded header row.
///
/// Shared by every format so column order, extra columns and blank rows
/// are handled the same way whatever the file type.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ColumnMap {
    positions: [usize; 8],
}

impl ColumnMap {
    fn from_headers<'a>(headers: impl IntoIterator<Item = &'a str>) -> Result<Self, IngestError> {
        let headers: Vec<&str> = headers.into_iter().map(str::trim).collect();

        let dropped = headers.iter().filter(|h| is_unnamed(h)).count();
        if dropped > 0 {
            tracing::debug!(dropped, "ignoring unnamed columns");
        }

        let mut positions = [0usize; 8];
        let mut missing = Vec::new();
        for (slot, name) in REQUIRED_COLUMNS.iter().enumerate() {
            match headers.iter().position(|h| !is_unnamed(h) && h == name) {
                Some(idx) => positions[slot] = idx,
                None => missing.push(name.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(IngestError::MissingColumns(missing));
        }

        Ok(ColumnMap { positions })
    }

    /// `None` for a row with nothing in it.
    fn row<S: AsRef<str>>(&self, fields: &[S], line_number: usize) -> Option<RawTransaction> {
        if fields.iter().all(|f| f.as_ref().trim().is_empty()) {
            return None;
        }

        let field = |slot: usize| {
            fields
                .get(self.positions[slot])
                .map(|f| f.as_ref().to_string())
                .unwrap_or_default()
        };

        Some(RawTransaction {
            date: field(0),
            description: field(1),
            amount: field(2),
            address: field(3),
            city_state: field(4),
            zip_code: field(5),
            country: field(6),
            category: field(7),
            line_number,
        })
    }
}

// ============================================================================
// CSV
// ============================================================================

pub struct CsvParser;

impl CsvParser {
    pub fn new() -> Self {
        CsvParser
    }
}

impl Default for CsvParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StatementParser for CsvParser {
    fn parse_bytes(&self, bytes: &[u8]) -> Result<Vec<RawTransaction>, IngestError> {
        let text = std::str::from_utf8(bytes)?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let columns = ColumnMap::from_headers(reader.headers()?.iter())?;

        let mut transactions = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let record = result?;
            let fields: Vec<&str> = record.iter().collect();
            // +2 because: 1-indexed + header row
            if let Some(raw) = columns.row(&fields, row + 2) {
                transactions.push(raw);
            }
        }

        Ok(transactions)
    }

    fn format(&self) -> UploadFormat {
        UploadFormat::Csv
    }
}

// ============================================================================
// EXCEL
// ============================================================================

/// Reads the first worksheet of an `.xls` or `.xlsx` workbook.
pub struct ExcelParser;

/// Cell text as the CSV export of the same sheet would show it.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        // zip codes and whole-dollar amounts come back as floats
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(_) => cell
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        Data::Error(e) => e.to_string(),
    }
}

impl StatementParser for ExcelParser {
    fn parse_bytes(&self, bytes: &[u8]) -> Result<Vec<RawTransaction>, IngestError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
        let range = workbook.worksheet_range_at(0).ok_or(IngestError::Empty)??;

        // the range starts at the first non-empty cell, not at A1
        let header_line = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);

        let mut rows = range.rows();
        let headers: Vec<String> = match rows.next() {
            Some(cells) => cells.iter().map(cell_text).collect(),
            None => return Err(IngestError::Empty),
        };
        let columns = ColumnMap::from_headers(headers.iter().map(String::as_str))?;

        let mut transactions = Vec::new();
        for (row, cells) in rows.enumerate() {
            let fields: Vec<String> = cells.iter().map(cell_text).collect();
            if let Some(raw) = columns.row(&fields, header_line + row + 1) {
                transactions.push(raw);
            }
        }

        tracing::debug!(rows = transactions.len(), "read first worksheet");
        Ok(transactions)
    }

    fn format(&self) -> UploadFormat {
        UploadFormat::Excel
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Date,Description,Amount,Address,City/State,Zip Code,Country,Category
01/03/2023,SAFEWAY #1234,\"$45.10\",100 Main St,\"Austin, TX\",78701,United States,Groceries
01/04/2023,NETFLIX.COM,$15.49,,\"Los Gatos, CA\",95032,United States,Entertainment
";

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format("statement.csv"), UploadFormat::Csv);
        assert_eq!(detect_format("STATEMENT.CSV"), UploadFormat::Csv);
        assert_eq!(detect_format("activity.xlsx"), UploadFormat::Excel);
        assert_eq!(detect_format("activity.XLS"), UploadFormat::Excel);
        assert_eq!(detect_format("export"), UploadFormat::Csv);
    }

    #[test]
    fn test_get_parser() {
        assert_eq!(get_parser(UploadFormat::Csv).format(), UploadFormat::Csv);
        assert_eq!(get_parser(UploadFormat::Excel).format(), UploadFormat::Excel);
    }

    #[test]
    fn test_csv_parser_reads_rows() {
        let txs = CsvParser::new().parse_bytes(SAMPLE.as_bytes()).unwrap();

        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].date, "01/03/2023");
        assert_eq!(txs[0].amount, "$45.10");
        assert_eq!(txs[0].city_state, "Austin, TX");
        assert_eq!(txs[0].line_number, 2);
        assert_eq!(txs[1].address, "");
        assert_eq!(txs[1].category, "Entertainment");
    }

    #[test]
    fn test_csv_parser_drops_unnamed_and_reorders() {
        let csv = "\
,Category,Amount,Date,Description,Address,City/State,Zip Code,Country,Unnamed: 9
0,Gas,$30.00,02/01/2023,SHELL OIL,1 Road,\"Reno, NV\",89501,United States,
";
        let txs = CsvParser::new().parse_bytes(csv.as_bytes()).unwrap();

        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].category, "Gas");
        assert_eq!(txs[0].date, "02/01/2023");
        assert_eq!(txs[0].zip_code, "89501");
    }

    #[test]
    fn test_csv_parser_strips_bom() {
        let with_bom = format!("\u{feff}{}", SAMPLE);
        let txs = CsvParser::new().parse_bytes(with_bom.as_bytes()).unwrap();
        assert_eq!(txs.len(), 2);
    }

    #[test]
    fn test_csv_parser_missing_columns() {
        let csv = "Date,Description,Amount\n01/01/2023,COFFEE,$3.00\n";
        let err = CsvParser::new().parse_bytes(csv.as_bytes()).unwrap_err();

        match err {
            IngestError::MissingColumns(cols) => {
                assert_eq!(cols.len(), 5);
                assert!(cols.contains(&"Zip Code".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_csv_parser_rejects_invalid_utf8() {
        let err = CsvParser::new().parse_bytes(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, IngestError::Encoding(_)));
    }

    #[test]
    fn test_csv_parser_skips_blank_rows() {
        let csv = format!("{}\n,,,,,,,\n", SAMPLE);
        let txs = CsvParser::new().parse_bytes(csv.as_bytes()).unwrap();
        assert_eq!(txs.len(), 2);
    }

    #[test]
    fn test_column_map_skips_unnamed_and_blank_rows() {
        let headers = ["Unnamed: 0", "Date", "Description", "Amount", "Address", "City/State", "Zip Code", "Country", "Category"];
        let columns = ColumnMap::from_headers(headers).unwrap();
        assert_eq!(columns.positions, [1, 2, 3, 4, 5, 6, 7, 8]);

        let blank = ["", "", "", "", "", "", "", "", ""];
        assert_eq!(columns.row(&blank, 3), None);
    }

    #[test]
    fn test_cell_text_matches_csv_export() {
        assert_eq!(cell_text(&Data::Float(78701.0)), "78701");
        assert_eq!(cell_text(&Data::Float(15.49)), "15.49");
        assert_eq!(cell_text(&Data::Int(2134)), "2134");
        assert_eq!(cell_text(&Data::String("$45.10".to_string())), "$45.10");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn test_excel_parser_rejects_garbage() {
        let err = ExcelParser.parse_bytes(b"PK\x03\x04 not a workbook").unwrap_err();
        assert!(matches!(err, IngestError::Workbook(_)));
    }
}
