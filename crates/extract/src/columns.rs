//! Canonical column names and the header aliases that resolve to them.

pub const MERCHANT_NAME: &str = "merchant_name";
pub const AMOUNT: &str = "amount";
pub const PRIMARY_ACCOUNT_NUM: &str = "primary_account_num";
pub const TRANSACTION_DATE: &str = "transaction_date";
pub const MCC_CODE: &str = "mcc_code";
pub const BUSINESS_FLAG: &str = "business_flag";
pub const YEAR_MONTH: &str = "year_month";

/// Columns every transaction extract must provide.
pub const REQUIRED_COLUMNS: [&str; 4] = [MERCHANT_NAME, AMOUNT, PRIMARY_ACCOUNT_NUM, TRANSACTION_DATE];

/// Resolves a raw header to its canonical name.
///
/// Matching is case-insensitive, ignores surrounding whitespace, and treats `-` as `_`.
pub fn canonical_name(raw: &str) -> Option<&'static str> {
    let key = raw.trim().to_lowercase().replace('-', "_");
    let name = match key.as_str() {
        "merchant_name" | "merchantname" | "merchant name" | "merchant" | "merch_name" => {
            MERCHANT_NAME
        }
        "amount" | "transaction_amount" | "txn_amount" | "trans_amount" | "amt" => AMOUNT,
        "primary_account_num" | "primaryaccountnum" | "primary account num" | "account_number"
        | "account_num" | "acct_num" | "acct_number" | "account" => PRIMARY_ACCOUNT_NUM,
        "transaction_date" | "transactiondate" | "transaction date" | "trans_date"
        | "txn_date" | "date" => TRANSACTION_DATE,
        "mcc_code" | "mcccode" | "mcc code" | "mcc" => MCC_CODE,
        "business_flag" | "businessflag" | "business flag" | "business" | "is_business" => {
            BUSINESS_FLAG
        }
        "year_month" | "yearmonth" | "year month" | "ym" => YEAR_MONTH,
        _ => return None,
    };
    Some(name)
}
