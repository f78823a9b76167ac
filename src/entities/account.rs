// 💳 Account Entity - balances plus owned transactions and holdings
//
// The account points at its organization by source id; the orchestrator turns
// that into the organization's resolved key. Children are owned here but are
// persisted separately, so they are skipped in the account payload.

use super::{timestamp_to_utc, EntityKind, Holding, Reconcilable, Rejected, Transaction};
use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    // ========================================================================
    // IDENTITY
    // ========================================================================
    pub source_id: String,

    /// Source id of the owning organization
    pub organization_id: String,

    // ========================================================================
    // VALUES
    // ========================================================================
    pub name: String,

    /// ISO 4217 code, or a URL for custom currencies
    pub currency: String,

    pub balance: BigDecimal,
    pub available_balance: Option<BigDecimal>,

    /// When the balance was last computed (epoch seconds)
    pub balance_date: i64,

    // ========================================================================
    // CHILDREN (persisted as their own records)
    // ========================================================================
    #[serde(skip)]
    pub transactions: Vec<Transaction>,

    #[serde(skip)]
    pub holdings: Vec<Holding>,

    /// Children the decoder had to drop
    #[serde(skip)]
    pub rejected: Vec<Rejected>,
}

impl Account {
    pub fn balance_at(&self) -> Option<DateTime<Utc>> {
        timestamp_to_utc(self.balance_date)
    }

    pub fn is_overdrawn(&self) -> bool {
        self.balance < BigDecimal::zero()
    }

    /// Sum of transaction amounts in this export
    pub fn net_change(&self) -> BigDecimal {
        self.transactions
            .iter()
            .fold(BigDecimal::zero(), |acc, tx| acc + &tx.amount)
    }

    pub fn is_investment(&self) -> bool {
        !self.holdings.is_empty()
    }
}

impl Reconcilable for Account {
    const KIND: EntityKind = EntityKind::Account;

    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn sort_timestamp(&self) -> i64 {
        self.balance_date
    }

    fn hashed_fields(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "currency": self.currency,
            "balance": self.balance,
            "available_balance": self.available_balance,
            "balance_date": self.balance_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn create_test_account(balance: &str) -> Account {
        Account {
            source_id: "acct-1".to_string(),
            organization_id: "org-1".to_string(),
            name: "Checking".to_string(),
            currency: "USD".to_string(),
            balance: dec(balance),
            available_balance: None,
            balance_date: 1_700_000_000,
            transactions: Vec::new(),
            holdings: Vec::new(),
            rejected: Vec::new(),
        }
    }

    fn create_test_transaction(id: &str, amount: &str) -> Transaction {
        Transaction {
            source_id: id.to_string(),
            posted: 1_700_000_000,
            amount: dec(amount),
            description: "test".to_string(),
            payee: None,
            memo: None,
            transacted_at: None,
            pending: false,
        }
    }

    #[test]
    fn test_overdrawn() {
        assert!(!create_test_account("123.45").is_overdrawn());
        assert!(create_test_account("-0.01").is_overdrawn());
    }

    #[test]
    fn test_net_change_is_exact() {
        let mut account = create_test_account("0");
        account.transactions = vec![
            create_test_transaction("t1", "0.10"),
            create_test_transaction("t2", "0.20"),
            create_test_transaction("t3", "-10.00"),
        ];

        assert_eq!(account.net_change(), dec("-9.70"));
    }

    #[test]
    fn test_payload_skips_children() {
        let mut account = create_test_account("123.45");
        account.transactions = vec![create_test_transaction("t1", "-10.00")];

        let payload = serde_json::to_value(&account).unwrap();
        assert!(payload.get("transactions").is_none());
        assert_eq!(payload["balance"], serde_json::json!("123.45"));

        let back: Account = serde_json::from_value(payload).unwrap();
        assert!(back.transactions.is_empty());
        assert_eq!(back.balance, dec("123.45"));
    }

    #[test]
    fn test_children_do_not_affect_hash() {
        let a = create_test_account("123.45");
        let mut b = a.clone();
        b.transactions = vec![create_test_transaction("t1", "-10.00")];
        assert_eq!(a.content_hash(), b.content_hash());

        b.balance = dec("113.45");
        assert_ne!(a.content_hash(), b.content_hash());
    }
}
