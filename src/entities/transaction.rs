// 💸 Transaction - one posting on an account
// Amounts are exact decimals; scale is preserved ("10.00" stays "10.00").

use super::{timestamp_to_utc, EntityKind, Reconcilable};
use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub source_id: String,

    /// When the posting cleared (epoch seconds)
    pub posted: i64,

    /// Signed amount: negative = money leaving the account
    pub amount: BigDecimal,

    pub description: String,
    pub payee: Option<String>,
    pub memo: Option<String>,

    /// When the purchase happened, if the source knows (epoch seconds)
    pub transacted_at: Option<i64>,

    #[serde(default)]
    pub pending: bool,
}

impl Transaction {
    pub fn posted_at(&self) -> Option<DateTime<Utc>> {
        timestamp_to_utc(self.posted)
    }

    pub fn transacted_at_utc(&self) -> Option<DateTime<Utc>> {
        self.transacted_at.and_then(timestamp_to_utc)
    }

    pub fn is_debit(&self) -> bool {
        self.amount < BigDecimal::zero()
    }

    pub fn is_credit(&self) -> bool {
        self.amount > BigDecimal::zero()
    }
}

impl Reconcilable for Transaction {
    const KIND: EntityKind = EntityKind::Transaction;

    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn sort_timestamp(&self) -> i64 {
        self.posted
    }

    fn hashed_fields(&self) -> serde_json::Value {
        serde_json::json!({
            "posted": self.posted,
            "amount": self.amount,
            "description": self.description,
            "payee": self.payee,
            "memo": self.memo,
            "transacted_at": self.transacted_at,
            "pending": self.pending,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn create_test_transaction(id: &str, amount: &str) -> Transaction {
        Transaction {
            source_id: id.to_string(),
            posted: 1_700_000_000,
            amount: BigDecimal::from_str(amount).unwrap(),
            description: "COFFEE SHOP".to_string(),
            payee: Some("Coffee Shop".to_string()),
            memo: None,
            transacted_at: Some(1_699_990_000),
            pending: false,
        }
    }

    #[test]
    fn test_debit_credit() {
        assert!(create_test_transaction("t1", "-10.00").is_debit());
        assert!(create_test_transaction("t2", "25.00").is_credit());

        let zero = create_test_transaction("t3", "0.00");
        assert!(!zero.is_debit());
        assert!(!zero.is_credit());
    }

    #[test]
    fn test_timestamps() {
        let tx = create_test_transaction("t1", "-10.00");
        assert_eq!(tx.posted_at().unwrap().timestamp(), 1_700_000_000);
        assert_eq!(tx.transacted_at_utc().unwrap().timestamp(), 1_699_990_000);
    }

    #[test]
    fn test_amount_survives_payload_round_trip_exactly() {
        let tx = create_test_transaction("t1", "-10.10");
        let payload = serde_json::to_value(&tx).unwrap();

        // Serialized as a string, never a float
        assert_eq!(payload["amount"], serde_json::json!("-10.10"));

        let back: Transaction = serde_json::from_value(payload).unwrap();
        assert_eq!(back.amount.to_string(), "-10.10");
    }

    #[test]
    fn test_content_hash_tracks_description() {
        let a = create_test_transaction("t1", "-10.00");
        let mut b = a.clone();
        assert_eq!(a.content_hash(), b.content_hash());

        b.description = "COFFEE SHOP #2".to_string();
        assert_ne!(a.content_hash(), b.content_hash());
    }
}
