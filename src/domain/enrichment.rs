//! Derived-feature computation over raw statement rows.
//!
//! Turns a [`RawTable`] into a [`TransactionTable`]: currency columns become decimals,
//! every row gains the derived columns, and the result is sorted by date and
//! per-day sequence.

use std::collections::HashMap;

use chrono::NaiveDate;
use itertools::Itertools;
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::record::{
    classify_transaction, RawTable, Transaction, TransactionTable, COL_AMOUNT, COL_BALANCE,
    COL_BALANCE_RATIO, COL_CREDIT, COL_DAILY_CREDIT, COL_DAILY_DEBIT, COL_DATE, COL_DEBIT,
    COL_DESCRIPTION, DERIVED_COLUMNS, REQUIRED_COLUMNS,
};

/// Date formats tried in order when none are configured.
pub const DEFAULT_DATE_FORMATS: [&str; 6] = [
    "%d %b %Y", "%d-%b-%Y", "%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d", "%d %B %Y",
];

/// Parse a currency cell: thousands separators are stripped, a lone `-` is zero.
///
/// Returns None when the remaining text is not a number.
pub fn parse_currency(cell: &str) -> Option<Decimal> {
    let cleaned: String = cell.trim().chars().filter(|c| *c != ',').collect();
    if cleaned == "-" {
        return Some(Decimal::ZERO);
    }
    cleaned.parse::<Decimal>().ok()
}

/// Parse a date cell with the first matching format.
pub fn parse_date<S: AsRef<str>>(cell: &str, formats: &[S]) -> Option<NaiveDate> {
    let cell = cell.trim();
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(cell, fmt.as_ref()).ok())
}

struct Columns {
    date: usize,
    description: usize,
    debit: usize,
    credit: usize,
    balance: usize,
}

impl Columns {
    fn locate(raw: &RawTable) -> DomainResult<Self> {
        let find = |name: &str| {
            raw.column_index(name)
                .ok_or_else(|| DomainError::MissingColumn(name.to_string()))
        };
        Ok(Self {
            date: find(COL_DATE)?,
            description: find(COL_DESCRIPTION)?,
            debit: find(COL_DEBIT)?,
            credit: find(COL_CREDIT)?,
            balance: find(COL_BALANCE)?,
        })
    }
}

fn cell<'a>(row: &'a [String], idx: usize) -> &'a str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

fn currency(row: &[String], idx: usize, row_no: usize, column: &str, blank_is_zero: bool) -> DomainResult<Decimal> {
    let text = cell(row, idx);
    if blank_is_zero && text.trim().is_empty() {
        return Ok(Decimal::ZERO);
    }
    parse_currency(text).ok_or_else(|| DomainError::MalformedInput {
        row: row_no,
        column: column.to_string(),
        reason: format!("'{}' is not a currency amount", text),
    })
}

/// Run the enrichment pipeline.
///
/// Row numbers in errors are 1-based data rows (the header is not counted).
#[instrument(level = "debug", skip(raw, date_formats), fields(rows = raw.rows.len()))]
pub fn enrich<S: AsRef<str>>(raw: &RawTable, date_formats: &[S]) -> DomainResult<TransactionTable> {
    let cols = Columns::locate(raw)?;

    // Source columns that enrichment recomputes are replaced, not duplicated
    let source_columns: Vec<String> = raw
        .headers
        .iter()
        .filter(|h| !DERIVED_COLUMNS.contains(&h.as_str()))
        .cloned()
        .collect();
    let passthrough_columns: Vec<(usize, String)> = raw
        .headers
        .iter()
        .enumerate()
        .filter(|(_, h)| {
            !REQUIRED_COLUMNS.contains(&h.as_str()) && !DERIVED_COLUMNS.contains(&h.as_str())
        })
        .map(|(i, h)| (i, h.clone()))
        .collect();

    let mut records = Vec::with_capacity(raw.rows.len());
    for (index, row) in raw.rows.iter().enumerate() {
        let row_no = index + 1;
        let balance = currency(row, cols.balance, row_no, COL_BALANCE, false)?;
        let debit = currency(row, cols.debit, row_no, COL_DEBIT, true)?;
        let credit = currency(row, cols.credit, row_no, COL_CREDIT, true)?;
        let date_text = cell(row, cols.date).to_string();
        let date = parse_date(&date_text, date_formats).ok_or_else(|| DomainError::MalformedInput {
            row: row_no,
            column: COL_DATE.to_string(),
            reason: format!("'{}' does not match any date format", date_text),
        })?;
        let description = cell(row, cols.description).to_string();
        let amount = credit
            .checked_sub(debit)
            .ok_or_else(|| overflow(row_no, COL_AMOUNT))?;

        records.push(Transaction {
            index,
            date_text,
            date,
            transaction_type: classify_transaction(&description),
            description,
            debit,
            credit,
            balance,
            previous_balance: Decimal::ZERO,
            amount,
            daily_count: 0,
            daily_debit_total: Decimal::ZERO,
            daily_credit_total: Decimal::ZERO,
            sequence: 0,
            balance_ratio: Decimal::ZERO,
            passthrough: passthrough_columns
                .iter()
                .map(|(i, name)| (name.clone(), cell(row, *i).to_string()))
                .collect(),
        });
    }

    fill_previous_balance(&mut records);
    fill_daily_aggregates(&mut records)?;
    fill_balance_ratio(&mut records)?;

    // stable: equal (date, sequence) pairs cannot occur within one date text,
    // and distinct texts parsing to the same date keep file order
    records.sort_by(|a, b| a.date.cmp(&b.date).then(a.sequence.cmp(&b.sequence)));

    debug!(
        "enriched {} rows, {} passthrough columns",
        records.len(),
        passthrough_columns.len()
    );
    Ok(TransactionTable {
        source_columns,
        records,
    })
}

/// Shift balances down one row; the first row keeps its own balance.
fn fill_previous_balance(records: &mut [Transaction]) {
    let mut previous = records.first().map(|r| r.balance);
    for record in records.iter_mut() {
        if let Some(p) = previous {
            record.previous_balance = p;
        }
        previous = Some(record.balance);
    }
}

/// Count, debit/credit totals and 1-based sequence per raw date text, file order.
fn fill_daily_aggregates(records: &mut [Transaction]) -> DomainResult<()> {
    let groups: HashMap<String, Vec<usize>> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.date_text.clone(), i))
        .into_group_map();

    // file order of first appearance, so the reported overflow row is stable
    for positions in groups.values().sorted_by_key(|p| p[0]) {
        let count = positions.len() as u64;
        let debit_total = daily_total(records, positions, COL_DAILY_DEBIT, |r| r.debit)?;
        let credit_total = daily_total(records, positions, COL_DAILY_CREDIT, |r| r.credit)?;
        for (seq, &i) in positions.iter().enumerate() {
            let record = &mut records[i];
            record.daily_count = count;
            record.daily_debit_total = debit_total;
            record.daily_credit_total = credit_total;
            record.sequence = seq as u64 + 1;
        }
    }
    Ok(())
}

fn daily_total(
    records: &[Transaction],
    positions: &[usize],
    column: &str,
    value: impl Fn(&Transaction) -> Decimal,
) -> DomainResult<Decimal> {
    positions.iter().try_fold(Decimal::ZERO, |total, &i| {
        total
            .checked_add(value(&records[i]))
            .ok_or_else(|| overflow(records[i].index + 1, column))
    })
}

fn overflow(row: usize, column: &str) -> DomainError {
    DomainError::MalformedInput {
        row,
        column: column.to_string(),
        reason: format!("{} overflows", column.to_lowercase()),
    }
}

/// Amount over previous balance; a zero previous balance divides by one.
fn fill_balance_ratio(records: &mut [Transaction]) -> DomainResult<()> {
    for record in records.iter_mut() {
        let divisor = if record.previous_balance.is_zero() {
            Decimal::ONE
        } else {
            record.previous_balance
        };
        record.balance_ratio =
            record
                .amount
                .checked_div(divisor)
                .ok_or_else(|| overflow(record.index + 1, COL_BALANCE_RATIO))?;
    }
    Ok(())
}
