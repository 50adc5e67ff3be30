use core_types::Cell;
use engine::{ErrorKind, PipelineError};
use extract::{ExtractError, read_extract};
use rust_decimal_macros::dec;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_csv_with_aliased_headers() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("1453_jan.csv");
    fs::write(
        &path,
        "Merchant Name,TXN-AMOUNT,Acct_Num,Date,MCC,Business\n\
         Grocer,12.50,A1,2025-01-04,5411,Y\n\
         Fuel Stop,\"$1,040.00\",A2,01/09/2025,5541,no\n\
         Grocer,7.25,A1,2025-02-11,,\n",
    )
    .unwrap();

    let table = read_extract(&path).unwrap();

    assert_eq!(
        table.columns(),
        [
            "merchant_name",
            "amount",
            "primary_account_num",
            "transaction_date",
            "mcc_code",
            "business_flag",
            "year_month"
        ]
    );
    assert_eq!(table.len(), 3);
    assert_eq!(table.get(1, "amount"), Some(&Cell::Decimal(dec!(1040.00))));
    assert_eq!(table.get(0, "business_flag"), Some(&Cell::text("Yes")));
    assert_eq!(table.get(2, "business_flag"), Some(&Cell::text("No")));
    assert_eq!(table.get(2, "mcc_code"), Some(&Cell::Empty));
    assert_eq!(table.get(1, "year_month"), Some(&Cell::text("2025-01")));
    assert_eq!(table.get(2, "year_month"), Some(&Cell::text("2025-02")));
}

#[test]
fn test_tab_delimited_without_business_flag() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("88_feb.txt");
    fs::write(
        &path,
        "merchant_name\tamount\tprimary_account_num\ttransaction_date\n\
         Grocer\t3.00\tA1\t2025-02-01\n",
    )
    .unwrap();

    let table = read_extract(&path).unwrap();

    assert_eq!(table.get(0, "amount"), Some(&Cell::Decimal(dec!(3.00))));
    assert_eq!(table.get(0, "business_flag"), Some(&Cell::text("No")));
    assert_eq!(table.get(0, "year_month"), Some(&Cell::text("2025-02")));
}

#[test]
fn test_missing_required_columns() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.csv");
    fs::write(&path, "merchant,amount\nGrocer,1.00\n").unwrap();

    let err = read_extract(&path).unwrap_err();
    match &err {
        ExtractError::MissingColumns { missing, available } => {
            assert!(missing.contains("primary_account_num"));
            assert!(missing.contains("transaction_date"));
            assert!(available.contains("merchant_name"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let pipeline: PipelineError = err.into();
    assert_eq!(pipeline.kind(), ErrorKind::ColumnMismatch);
}

#[test]
fn test_missing_file_is_retrieve_error() {
    let dir = TempDir::new().unwrap();
    let err = read_extract(&dir.path().join("absent.csv")).unwrap_err();
    assert!(matches!(err, ExtractError::NotFound(_)));

    let pipeline: PipelineError = err.into();
    assert_eq!(pipeline.kind(), ErrorKind::Retrieve);
    assert!(pipeline.detail().unwrap().contains_key("path"));
}

#[test]
fn test_bad_amount_is_data_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad_amount.csv");
    fs::write(
        &path,
        "merchant_name,amount,primary_account_num,transaction_date\nGrocer,ten,A1,2025-01-01\n",
    )
    .unwrap();

    let err = read_extract(&path).unwrap_err();
    assert!(matches!(err, ExtractError::InvalidAmount { line: 2, .. }));

    let pipeline: PipelineError = err.into();
    assert_eq!(pipeline.kind(), ErrorKind::Data);
}

#[test]
fn test_two_headers_for_one_column_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("1453_dup.csv");
    fs::write(
        &path,
        "merchant_name,amount,primary_account_num,Date,transaction_date
         Grocer,1.00,A1,2025-01-01,2025-01-02
",
    )
    .unwrap();

    let err = read_extract(&path).unwrap_err();
    match &err {
        ExtractError::DuplicateColumn { column, first, second } => {
            assert_eq!(column, "transaction_date");
            assert_eq!(first, "Date");
            assert_eq!(second, "transaction_date");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let pipeline: PipelineError = err.into();
    assert_eq!(pipeline.kind(), ErrorKind::Data);
    assert_eq!(pipeline.detail().unwrap()["column"], "transaction_date");
}
