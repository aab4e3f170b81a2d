//! Domain entities: transaction rows before and after enrichment

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;

pub const COL_DATE: &str = "Trans Date";
pub const COL_DESCRIPTION: &str = "Description/Narration";
pub const COL_DEBIT: &str = "Debit(Dr.) INR";
pub const COL_CREDIT: &str = "Credit(Cr.) INR";
pub const COL_BALANCE: &str = "Balance INR";

pub const COL_PREVIOUS_BALANCE: &str = "Previous Balance INR";
pub const COL_AMOUNT: &str = "Transaction Amount";
pub const COL_TYPE: &str = "Transaction Type";
pub const COL_DAILY_COUNT: &str = "Daily Transaction Count";
pub const COL_DAILY_DEBIT: &str = "Daily Debit Total";
pub const COL_DAILY_CREDIT: &str = "Daily Credit Total";
pub const COL_SEQUENCE: &str = "Transaction Sequence";
pub const COL_BALANCE_RATIO: &str = "Transaction to Balance Ratio";

/// Columns every input file must carry.
pub const REQUIRED_COLUMNS: [&str; 5] = [COL_DATE, COL_DESCRIPTION, COL_DEBIT, COL_CREDIT, COL_BALANCE];

/// Columns added by enrichment, in export order.
pub const DERIVED_COLUMNS: [&str; 8] = [
    COL_PREVIOUS_BALANCE,
    COL_AMOUNT,
    COL_TYPE,
    COL_DAILY_COUNT,
    COL_DAILY_DEBIT,
    COL_DAILY_CREDIT,
    COL_SEQUENCE,
    COL_BALANCE_RATIO,
];

/// Tabular input as read from a CSV file, all cells still text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Position of a column by exact header name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Category derived from the transaction narration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransactionType {
    AuQrSettlement,
    Imps,
    PspSettlement,
    Other,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::AuQrSettlement => "AU QR Settlement",
            TransactionType::Imps => "IMPS",
            TransactionType::PspSettlement => "PSP Settlement",
            TransactionType::Other => "Other",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a narration by ordered substring match; the first rule that matches wins.
pub fn classify_transaction(description: &str) -> TransactionType {
    if description.contains("AU QR") {
        TransactionType::AuQrSettlement
    } else if description.contains("IMPS") {
        TransactionType::Imps
    } else if description.contains("PSP SETTLEMENT") {
        TransactionType::PspSettlement
    } else {
        TransactionType::Other
    }
}

/// Value of one attribute on one record, as seen by the evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Number(Decimal),
    Integer(u64),
    Date(NaiveDate),
}

impl FieldValue {
    /// Kind name used in attribute listings.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Number(_) => "number",
            FieldValue::Integer(_) => "integer",
            FieldValue::Date(_) => "date",
        }
    }

    /// Numeric view for `>=` / `<=` comparisons; None for text and dates.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            FieldValue::Number(d) => Some(*d),
            FieldValue::Integer(i) => Some(Decimal::from(*i)),
            FieldValue::Text(_) | FieldValue::Date(_) => None,
        }
    }

    /// Passthrough cells are numeric when they parse as decimals.
    pub fn infer(cell: &str) -> Self {
        match cell.trim().parse::<Decimal>() {
            Ok(d) if !cell.trim().is_empty() => FieldValue::Number(d),
            _ => FieldValue::Text(cell.to_string()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Number(d) => write!(f, "{}", d.normalize()),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// One enriched transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// 0-based position of the row in the loaded file
    pub index: usize,
    /// Raw date text, the grouping key for the daily aggregates
    pub date_text: String,
    pub date: NaiveDate,
    pub description: String,
    pub debit: Decimal,
    pub credit: Decimal,
    pub balance: Decimal,
    pub previous_balance: Decimal,
    pub amount: Decimal,
    pub transaction_type: TransactionType,
    pub daily_count: u64,
    pub daily_debit_total: Decimal,
    pub daily_credit_total: Decimal,
    pub sequence: u64,
    pub balance_ratio: Decimal,
    /// Columns outside the required set, header order
    pub passthrough: Vec<(String, String)>,
}

impl Transaction {
    /// Look up an attribute by its column name.
    pub fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match name {
            COL_DATE => FieldValue::Date(self.date),
            COL_DESCRIPTION => FieldValue::Text(self.description.clone()),
            COL_DEBIT => FieldValue::Number(self.debit),
            COL_CREDIT => FieldValue::Number(self.credit),
            COL_BALANCE => FieldValue::Number(self.balance),
            COL_PREVIOUS_BALANCE => FieldValue::Number(self.previous_balance),
            COL_AMOUNT => FieldValue::Number(self.amount),
            COL_TYPE => FieldValue::Text(self.transaction_type.as_str().to_string()),
            COL_DAILY_COUNT => FieldValue::Integer(self.daily_count),
            COL_DAILY_DEBIT => FieldValue::Number(self.daily_debit_total),
            COL_DAILY_CREDIT => FieldValue::Number(self.daily_credit_total),
            COL_SEQUENCE => FieldValue::Integer(self.sequence),
            COL_BALANCE_RATIO => FieldValue::Number(self.balance_ratio),
            other => {
                return self
                    .passthrough
                    .iter()
                    .find(|(k, _)| k == other)
                    .map(|(_, v)| FieldValue::infer(v))
            }
        };
        Some(value)
    }

    /// Text written to the export for a column; passthrough cells are kept verbatim.
    pub fn export_cell(&self, name: &str) -> String {
        if let Some((_, raw)) = self.passthrough.iter().find(|(k, _)| k == name) {
            return raw.clone();
        }
        self.field(name).map(|v| v.to_string()).unwrap_or_default()
    }
}

/// Enriched, date-sorted table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionTable {
    /// Headers of the loaded file, in input order
    pub source_columns: Vec<String>,
    pub records: Vec<Transaction>,
}

impl TransactionTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All attribute names a split may reference: source columns, then derived ones.
    /// This is also the export header order, minus the results column.
    pub fn attribute_names(&self) -> Vec<String> {
        let mut names = self.source_columns.clone();
        names.extend(DERIVED_COLUMNS.iter().map(|c| c.to_string()));
        names
    }
}
