/// file: src/formatter.rs
/// description: normalizes raw transactions into display records and commits them to the state sink
use crate::sink::{FormatOptions, StateCommit, StateSink, TransactionHandler, TransactionStatusGroup};
use crate::types::Transaction;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Divisibility of the network currency mosaic.
const CURRENCY_DIVISIBILITY: u32 = 6;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedTransaction {
    pub hash: String,
    pub height: u64,
    pub transaction_type: u16,
    pub type_name: &'static str,
    pub signer_public_key: String,
    pub max_fee: String,
    pub deadline: Option<DateTime<Utc>>,
    pub recipient_address: Option<String>,
    pub group: TransactionStatusGroup,
}

pub fn transaction_type_name(code: u16) -> &'static str {
    match code {
        0x4154 => "Transfer",
        0x414E => "Namespace Registration",
        0x424E => "Address Alias",
        0x434E => "Mosaic Alias",
        0x414D => "Mosaic Definition",
        0x424D => "Mosaic Supply Change",
        0x4155 => "Multisig Account Modification",
        0x4141 => "Aggregate Complete",
        0x4241 => "Aggregate Bonded",
        0x4148 => "Hash Lock",
        0x4152 => "Secret Lock",
        0x4252 => "Secret Proof",
        0x4150 => "Account Address Restriction",
        0x4250 => "Account Mosaic Restriction",
        0x4350 => "Account Operation Restriction",
        0x4151 => "Mosaic Address Restriction",
        0x4251 => "Mosaic Global Restriction",
        0x4144 => "Account Metadata",
        0x4244 => "Mosaic Metadata",
        0x4344 => "Namespace Metadata",
        0x414C => "Account Key Link",
        0x424C => "Node Key Link",
        0x4143 => "Voting Key Link",
        0x4243 => "VRF Key Link",
        _ => "Unknown",
    }
}

/// Renders an absolute amount with `divisibility` decimal places.
pub fn format_amount(amount: u64, divisibility: u32) -> String {
    if divisibility == 0 {
        return amount.to_string();
    }
    let unit = 10u64.pow(divisibility);
    format!(
        "{}.{:0width$}",
        amount / unit,
        amount % unit,
        width = divisibility as usize
    )
}

pub struct TransactionFormatter {
    sink: Arc<dyn StateSink>,
    epoch_adjustment: i64,
}

impl TransactionFormatter {
    pub fn new(sink: Arc<dyn StateSink>, epoch_adjustment: i64) -> Self {
        Self {
            sink,
            epoch_adjustment,
        }
    }

    /// Deadlines are milliseconds since the network epoch.
    pub fn deadline_utc(&self, deadline: u64) -> Option<DateTime<Utc>> {
        if deadline == 0 {
            return None;
        }
        let millis = i64::try_from(deadline)
            .ok()?
            .checked_add(self.epoch_adjustment.checked_mul(1000)?)?;
        DateTime::from_timestamp_millis(millis)
    }

    pub fn format(
        &self,
        transaction: &Transaction,
        options: FormatOptions,
    ) -> Option<FormattedTransaction> {
        let info = transaction.transaction_info.as_ref()?;

        Some(FormattedTransaction {
            hash: info.hash.clone(),
            height: info.height,
            transaction_type: transaction.transaction_type,
            type_name: transaction_type_name(transaction.transaction_type),
            signer_public_key: transaction.signer_public_key.clone(),
            max_fee: format_amount(transaction.max_fee, CURRENCY_DIVISIBILITY),
            deadline: self.deadline_utc(transaction.deadline),
            recipient_address: transaction
                .body
                .get("recipientAddress")
                .and_then(|value| value.as_str())
                .map(str::to_string),
            group: options.transaction_status_group,
        })
    }
}

impl TransactionHandler for TransactionFormatter {
    fn format_and_save_new_transaction(&self, transaction: &Transaction, options: FormatOptions) {
        match self.format(transaction, options) {
            Some(formatted) => {
                debug!(
                    hash = %formatted.hash,
                    kind = formatted.type_name,
                    group = ?formatted.group,
                    "Saving transaction"
                );
                self.sink.commit(StateCommit::AddTransaction(formatted));
            }
            None => debug!("Transaction without transaction info not saved"),
        }
    }
}
