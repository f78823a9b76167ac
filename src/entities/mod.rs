// 🧱 Entity Models - normalized view of one export
// Organization → Account → (Transaction, Holding)

pub mod account;
pub mod holding;
pub mod organization;
pub mod transaction;

pub use account::Account;
pub use holding::Holding;
pub use organization::Organization;
pub use transaction::Transaction;

use crate::error::ImportError;
use crate::identity;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ENTITY KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Organization,
    Account,
    Transaction,
    Holding,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Organization,
        EntityKind::Account,
        EntityKind::Transaction,
        EntityKind::Holding,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Organization => "organization",
            EntityKind::Account => "account",
            EntityKind::Transaction => "transaction",
            EntityKind::Holding => "holding",
        }
    }

    /// Store table holding this kind
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Organization => "organizations",
            EntityKind::Account => "accounts",
            EntityKind::Transaction => "transactions",
            EntityKind::Holding => "holdings",
        }
    }

    /// Natural key prefix
    pub fn prefix(&self) -> &'static str {
        match self {
            EntityKind::Organization => "org",
            EntityKind::Account => "acct",
            EntityKind::Transaction => "txn",
            EntityKind::Holding => "hold",
        }
    }

    /// Plural label for reports
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Organization => "Organizations",
            EntityKind::Account => "Accounts",
            EntityKind::Transaction => "Transactions",
            EntityKind::Holding => "Holdings",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RECONCILABLE
// ============================================================================

/// Anything the store can hold: a source identifier, a sort timestamp and a
/// hash over the fields whose change counts as an update.
pub trait Reconcilable: Serialize + DeserializeOwned {
    const KIND: EntityKind;

    fn source_id(&self) -> &str;

    /// Ordering timestamp for read queries (posted, created, ...)
    fn sort_timestamp(&self) -> i64;

    /// Mutable fields covered by the content hash
    fn hashed_fields(&self) -> serde_json::Value;

    fn content_hash(&self) -> String {
        identity::content_hash(&self.hashed_fields())
    }
}

/// A child record the decoder could not turn into a model value
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    pub kind: EntityKind,
    pub source_id: String,
    pub error: ImportError,
}

/// Export timestamps are Unix epoch seconds
pub fn timestamp_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}
