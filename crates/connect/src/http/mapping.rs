//! Defensive parsing of the REST vendor's inquiry payloads.
//!
//! Every numeric field defaults to zero when missing or unreadable; a bad
//! field never drops the record or the batch.

use serde_json::{Map, Value};

use stockfolio_core::balances::BalanceSnapshot;
use stockfolio_core::errors::BrokerError;
use stockfolio_core::holdings::HoldingSnapshot;
use stockfolio_core::utils::numeric::{decimal_or_zero, i64_or_zero, string_or_empty};

/// Rejects payloads whose business status is not success (`rt_cd != "0"`).
///
/// A payload without `rt_cd` is accepted.
pub fn check_vendor_status(payload: &Value) -> Result<(), BrokerError> {
    let Some(code) = payload.get("rt_cd") else {
        return Ok(());
    };
    let code = string_or_empty(Some(code));
    if code == "0" {
        return Ok(());
    }

    let message = string_or_empty(payload.get("msg1"));
    let msg_cd = string_or_empty(payload.get("msg_cd"));
    Err(BrokerError::Vendor(if message.is_empty() {
        format!("rt_cd={code} msg_cd={msg_cd}")
    } else {
        format!("{message} (rt_cd={code})")
    }))
}

/// The summary block, sent either as an object or as a list whose first
/// element is the object.
pub fn summary_object(payload: &Value) -> Option<&Map<String, Value>> {
    match payload.get("output2")? {
        Value::Object(map) => Some(map),
        Value::Array(items) => items.first().and_then(Value::as_object),
        _ => None,
    }
}

/// Builds the balance from the summary block. Stock balance is derived as
/// total minus cash since the vendor reports no canonical field for it.
pub fn parse_balance(account_number: &str, payload: &Value) -> BalanceSnapshot {
    let Some(summary) = summary_object(payload) else {
        return BalanceSnapshot::empty(account_number);
    };

    BalanceSnapshot {
        account_number: account_number.to_string(),
        cash_balance: decimal_or_zero(summary.get("dnca_tot_amt")),
        total_balance: decimal_or_zero(summary.get("tot_asst_amt")),
        evaluation_amount: decimal_or_zero(summary.get("evlu_amt")),
        profit_loss: decimal_or_zero(summary.get("evlu_pfls_amt")),
        profit_loss_rate: decimal_or_zero(summary.get("evlu_pfls_rt")),
        ..Default::default()
    }
    .with_derived_stock_balance()
}

/// Builds holdings from the position list. Entries without a product code
/// are skipped.
pub fn parse_holdings(account_number: &str, payload: &Value) -> Vec<HoldingSnapshot> {
    let items = match payload.get("output1") {
        Some(Value::Array(items)) => items.as_slice(),
        Some(item @ Value::Object(_)) => std::slice::from_ref(item),
        _ => return Vec::new(),
    };

    items
        .iter()
        .filter_map(|item| {
            let symbol = string_or_empty(item.get("pdno"));
            if symbol.is_empty() {
                return None;
            }
            Some(HoldingSnapshot {
                account_number: account_number.to_string(),
                symbol,
                name: string_or_empty(item.get("prdt_name")),
                quantity: i64_or_zero(item.get("hldg_qty")),
                average_price: decimal_or_zero(item.get("pchs_avg_pric")),
                current_price: decimal_or_zero(item.get("prpr")),
                evaluation_amount: decimal_or_zero(item.get("evlu_amt")),
                profit_loss: decimal_or_zero(item.get("evlu_pfls_amt")),
                profit_loss_rate: decimal_or_zero(item.get("evlu_pfls_rt")),
            })
        })
        .collect()
}
