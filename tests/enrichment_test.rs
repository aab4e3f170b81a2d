//! Tests for the enrichment pipeline

use std::str::FromStr;

use chrono::NaiveDate;
use rstest::rstest;
use rust_decimal::Decimal;

use fraudtree::domain::{
    enrich, DomainError, FieldValue, RawTable, TransactionType, DEFAULT_DATE_FORMATS,
};

const HEADERS: [&str; 5] = [
    "Trans Date",
    "Description/Narration",
    "Debit(Dr.) INR",
    "Credit(Cr.) INR",
    "Balance INR",
];

fn raw(rows: &[[&str; 5]]) -> RawTable {
    RawTable::new(
        HEADERS.iter().map(|h| h.to_string()).collect(),
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect(),
    )
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[test]
fn given_rows_when_enriching_then_previous_balance_shifts_by_one_row() {
    // Arrange - dates descending so sorting reverses the file order
    let table = raw(&[
        ["03 Apr 2023", "a", "-", "100.00", "1,100.00"],
        ["02 Apr 2023", "b", "50.00", "-", "1,050.00"],
        ["01 Apr 2023", "c", "-", "-", "1,050.00"],
    ]);

    // Act
    let enriched = enrich(&table, &DEFAULT_DATE_FORMATS).unwrap();

    // Assert - previous balance follows file order, not sorted order
    let by_index = |i: usize| enriched.records.iter().find(|r| r.index == i).unwrap();
    assert_eq!(by_index(0).previous_balance, dec("1100"));
    assert_eq!(by_index(1).previous_balance, dec("1100"));
    assert_eq!(by_index(2).previous_balance, dec("1050"));
}

#[test]
fn given_currency_strings_when_enriching_then_amount_is_credit_minus_debit() {
    let table = raw(&[
        ["01 Apr 2023", "x", "1,250.50", "-", "8,749.50"],
        ["01 Apr 2023", "y", "-", "12,00,000.00", "12,08,749.50"],
    ]);

    let enriched = enrich(&table, &DEFAULT_DATE_FORMATS).unwrap();

    assert_eq!(enriched.records[0].debit, dec("1250.50"));
    assert_eq!(enriched.records[0].credit, Decimal::ZERO);
    assert_eq!(enriched.records[0].amount, dec("-1250.50"));
    assert_eq!(enriched.records[1].amount, dec("1200000"));
}

#[test]
fn given_shared_dates_when_enriching_then_groups_count_sum_and_sequence() {
    // Arrange - two dates interleaved in the file
    let table = raw(&[
        ["01 Apr 2023", "a", "10.00", "-", "990.00"],
        ["02 Apr 2023", "b", "-", "5.00", "995.00"],
        ["01 Apr 2023", "c", "20.00", "-", "975.00"],
        ["01 Apr 2023", "d", "-", "7.00", "982.00"],
    ]);

    // Act
    let enriched = enrich(&table, &DEFAULT_DATE_FORMATS).unwrap();

    // Assert - sorted by (date, sequence)
    let order: Vec<usize> = enriched.records.iter().map(|r| r.index).collect();
    assert_eq!(order, vec![0, 2, 3, 1]);

    let first_day: Vec<_> = enriched.records.iter().take(3).collect();
    let sequences: Vec<u64> = first_day.iter().map(|r| r.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3]);
    for r in &first_day {
        assert_eq!(r.daily_count, 3);
        assert_eq!(r.daily_debit_total, dec("30"));
        assert_eq!(r.daily_credit_total, dec("7"));
    }

    let second_day = &enriched.records[3];
    assert_eq!(second_day.daily_count, 1);
    assert_eq!(second_day.sequence, 1);
    assert_eq!(second_day.daily_debit_total, Decimal::ZERO);
    assert_eq!(second_day.daily_credit_total, dec("5"));
}

#[test]
fn given_zero_previous_balance_when_enriching_then_ratio_divides_by_one() {
    let table = raw(&[
        ["01 Apr 2023", "opening", "-", "-", "0"],
        ["01 Apr 2023", "deposit", "-", "500.00", "500.00"],
        ["01 Apr 2023", "spend", "100.00", "-", "400.00"],
    ]);

    let enriched = enrich(&table, &DEFAULT_DATE_FORMATS).unwrap();

    // row 1: previous balance 0 -> divisor 1
    assert_eq!(enriched.records[1].previous_balance, Decimal::ZERO);
    assert_eq!(enriched.records[1].balance_ratio, dec("500"));
    // row 2: previous balance 500 -> divisor 500
    assert_eq!(enriched.records[2].balance_ratio, dec("-0.2"));
}

#[test]
fn given_descriptions_when_enriching_then_types_follow_rule_order() {
    let table = raw(&[
        ["01 Apr 2023", "UPI AU QR IMPS", "1.00", "-", "10.00"],
        ["01 Apr 2023", "IMPS/P2A", "1.00", "-", "9.00"],
        ["01 Apr 2023", "PSP SETTLEMENT", "-", "1.00", "10.00"],
        ["01 Apr 2023", "ATM", "1.00", "-", "9.00"],
    ]);

    let enriched = enrich(&table, &DEFAULT_DATE_FORMATS).unwrap();

    let types: Vec<TransactionType> = enriched.records.iter().map(|r| r.transaction_type).collect();
    assert_eq!(
        types,
        vec![
            TransactionType::AuQrSettlement,
            TransactionType::Imps,
            TransactionType::PspSettlement,
            TransactionType::Other
        ]
    );
}

#[test]
fn given_same_input_when_enriching_twice_then_identical() {
    let table = raw(&[
        ["02 Apr 2023", "b", "-", "5.00", "995.00"],
        ["01 Apr 2023", "a", "10.00", "-", "990.00"],
    ]);

    let first = enrich(&table, &DEFAULT_DATE_FORMATS).unwrap();
    let second = enrich(&table, &DEFAULT_DATE_FORMATS).unwrap();

    assert_eq!(first, second);
}

#[test]
fn given_missing_column_when_enriching_then_missing_column_error() {
    let table = RawTable::new(
        vec!["Trans Date".into(), "Description/Narration".into()],
        vec![vec!["01 Apr 2023".into(), "x".into()]],
    );

    let err = enrich(&table, &DEFAULT_DATE_FORMATS).unwrap_err();

    assert!(matches!(err, DomainError::MissingColumn(_)));
}

#[rstest]
#[case(["01 Apr 2023", "x", "12a", "-", "10.00"], "Debit(Dr.) INR")]
#[case(["01 Apr 2023", "x", "-", "n/a", "10.00"], "Credit(Cr.) INR")]
#[case(["01 Apr 2023", "x", "-", "-", ""], "Balance INR")]
#[case(["first of april", "x", "-", "-", "10.00"], "Trans Date")]
fn given_unparseable_cell_when_enriching_then_malformed_input(
    #[case] bad_row: [&str; 5],
    #[case] expected_column: &str,
) {
    let table = raw(&[["01 Apr 2023", "ok", "-", "-", "10.00"], bad_row]);

    let err = enrich(&table, &DEFAULT_DATE_FORMATS).unwrap_err();

    match err {
        DomainError::MalformedInput { row, column, .. } => {
            assert_eq!(row, 2);
            assert_eq!(column, expected_column);
        }
        other => panic!("expected MalformedInput, got {other:?}"),
    }
}

#[test]
fn given_blank_debit_when_enriching_then_treated_as_zero() {
    let table = raw(&[["01 Apr 2023", "x", "", "5.00", "5.00"]]);

    let enriched = enrich(&table, &DEFAULT_DATE_FORMATS).unwrap();

    assert_eq!(enriched.records[0].debit, Decimal::ZERO);
}

#[test]
fn given_extra_columns_when_enriching_then_passed_through_and_addressable() {
    let table = RawTable::new(
        vec![
            "Trans Date".into(),
            "Value Date".into(),
            "Description/Narration".into(),
            "Cheque No".into(),
            "Debit(Dr.) INR".into(),
            "Credit(Cr.) INR".into(),
            "Balance INR".into(),
        ],
        vec![vec![
            "01/04/2023".into(),
            "01/04/2023".into(),
            "x".into(),
            "000123".into(),
            "-".into(),
            "5.00".into(),
            "5.00".into(),
        ]],
    );

    let enriched = enrich(&table, &DEFAULT_DATE_FORMATS).unwrap();
    let record = &enriched.records[0];

    assert_eq!(record.date, NaiveDate::from_ymd_opt(2023, 4, 1).unwrap());
    assert_eq!(record.field("Value Date"), Some(FieldValue::Text("01/04/2023".into())));
    assert_eq!(record.field("Cheque No"), Some(FieldValue::Number(dec("123"))));
    assert_eq!(record.export_cell("Cheque No"), "000123");
    assert_eq!(
        enriched.attribute_names()[..7],
        [
            "Trans Date",
            "Value Date",
            "Description/Narration",
            "Cheque No",
            "Debit(Dr.) INR",
            "Credit(Cr.) INR",
            "Balance INR"
        ]
    );
    assert_eq!(enriched.attribute_names().len(), 15);
}

#[test]
fn given_headers_only_when_enriching_then_empty_table() {
    let table = raw(&[]);

    let enriched = enrich(&table, &DEFAULT_DATE_FORMATS).unwrap();

    assert!(enriched.is_empty());
}

#[test]
fn given_amount_beyond_decimal_range_when_enriching_then_malformed_not_panic() {
    // Arrange - credit is the largest representable decimal, debit is negative
    let table = raw(&[[
        "01 Apr 2023",
        "x",
        "-1",
        "79,228,162,514,264,337,593,543,950,335",
        "10.00",
    ]]);

    // Act
    let err = enrich(&table, &DEFAULT_DATE_FORMATS).unwrap_err();

    // Assert
    match err {
        DomainError::MalformedInput { row, column, reason } => {
            assert_eq!(row, 1);
            assert_eq!(column, "Transaction Amount");
            assert!(reason.contains("overflows"));
        }
        other => panic!("expected MalformedInput, got {other:?}"),
    }
}

#[test]
fn given_same_day_debits_beyond_decimal_range_when_enriching_then_malformed_not_panic() {
    let huge = "50,000,000,000,000,000,000,000,000,000";
    let table = raw(&[
        ["01 Apr 2023", "a", huge, "-", "10.00"],
        ["01 Apr 2023", "b", huge, "-", "10.00"],
    ]);

    let err = enrich(&table, &DEFAULT_DATE_FORMATS).unwrap_err();

    match err {
        DomainError::MalformedInput { row, column, .. } => {
            assert_eq!(row, 2);
            assert_eq!(column, "Daily Debit Total");
        }
        other => panic!("expected MalformedInput, got {other:?}"),
    }
}
