//! Raw provider records to display records. Pure; no I/O.

use crate::aggregate::TxSlot;
use crate::chain::client::{RawBlock, RawTransaction};
use serde::Serialize;
use thiserror::Error;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

/// `MM/DD/YYYY HH:MM`, always rendered in UTC.
const DISPLAY_TIME: &[BorrowedFormatItem<'static>] =
    format_description!("[month]/[day]/[year] [hour]:[minute]");

#[derive(Error, Debug)]
pub enum ReshapeError {
    #[error("invalid epoch time {0}: {1}")]
    InvalidTime(i64, String),
    #[error("format: {0}")]
    Format(#[from] time::error::Format),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DisplayBlock {
    pub network: String,
    pub block_no: u64,
    pub time: String,
    pub previous_blockhash: String,
    pub next_blockhash: String,
    pub size: u64,
    pub txs: Vec<TxSlot>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DisplayTransaction {
    pub txid: String,
    pub time: String,
    pub fee: String,
    pub sent_value: String,
}

pub fn format_epoch(secs: i64) -> Result<String, ReshapeError> {
    let dt = OffsetDateTime::from_unix_timestamp(secs)
        .map_err(|e| ReshapeError::InvalidTime(secs, e.to_string()))?;
    Ok(dt.format(DISPLAY_TIME)?)
}

/// Replaces the raw hash list with `txs`, already ordered by the aggregator.
pub fn display_block(raw: &RawBlock, txs: Vec<TxSlot>) -> Result<DisplayBlock, ReshapeError> {
    Ok(DisplayBlock {
        network: raw.network.clone(),
        block_no: raw.block_no,
        time: format_epoch(raw.time)?,
        previous_blockhash: raw.previous_blockhash.clone().unwrap_or_default(),
        next_blockhash: raw.next_blockhash.clone().unwrap_or_default(),
        size: raw.size,
        txs,
    })
}

pub fn display_transaction(raw: &RawTransaction) -> Result<DisplayTransaction, ReshapeError> {
    Ok(DisplayTransaction {
        txid: raw.txid.clone(),
        time: format_epoch(raw.time)?,
        fee: raw.fee.clone(),
        sent_value: raw.sent_value.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_block_time_in_utc() {
        assert_eq!(format_epoch(1348321500).unwrap(), "09/22/2012 13:45");
        assert_eq!(format_epoch(0).unwrap(), "01/01/1970 00:00");
    }

    #[test]
    fn out_of_range_time_is_rejected() {
        assert!(matches!(
            format_epoch(i64::MAX),
            Err(ReshapeError::InvalidTime(..))
        ));
    }

    #[test]
    fn transaction_passes_fields_through() {
        let raw = RawTransaction {
            txid: "h0".into(),
            time: 1348321500,
            fee: "0.00050000".into(),
            sent_value: "1.25000000".into(),
        };
        let tx = display_transaction(&raw).unwrap();
        assert_eq!(tx.txid, "h0");
        assert_eq!(tx.fee, "0.00050000");
        assert_eq!(tx.sent_value, "1.25000000");
        assert_eq!(tx.time, "09/22/2012 13:45");
    }

    #[test]
    fn block_drops_raw_hashes_and_defaults_missing_links() {
        let raw = RawBlock {
            network: "BTC".into(),
            block_no: 200000,
            time: 1348321500,
            previous_blockhash: Some("p".into()),
            next_blockhash: None,
            size: 247533,
            txs: vec!["h0".into(), "h1".into()],
        };
        let block = display_block(&raw, vec![]).unwrap();
        assert_eq!(block.previous_blockhash, "p");
        assert_eq!(block.next_blockhash, "");
        assert!(block.txs.is_empty());
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["time"], "09/22/2012 13:45");
        assert_eq!(json["block_no"], 200000);
    }
}
