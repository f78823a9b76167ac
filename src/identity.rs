// 🔑 Identity Resolver - stable natural keys
//
// key = "<prefix>:" + sha256(owner_key || 0x1F || source_id)
//
// Pure functions of (owner key, source id): the same pair always yields the
// same key, in any order, on any run. The prefix keeps the four keyspaces
// disjoint; the separator byte never appears in an owner key (hex + prefix),
// so ("ab", "c") and ("a", "bc") cannot collide.

use crate::entities::EntityKind;
use crate::error::{ImportError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

const SEPARATOR: u8 = 0x1F;

/// Resolved natural key of a stored entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NaturalKey(String);

impl NaturalKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap a key read back from the store or an API path
    pub fn from_stored(key: impl Into<String>) -> Self {
        NaturalKey(key.into())
    }

    /// Kind encoded in the prefix, if recognised
    pub fn kind(&self) -> Option<EntityKind> {
        let prefix = self.0.split(':').next()?;
        EntityKind::ALL.into_iter().find(|k| k.prefix() == prefix)
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve a key for any kind. Organizations have no owner.
pub fn resolve(kind: EntityKind, owner: Option<&NaturalKey>, source_id: &str) -> Result<NaturalKey> {
    if source_id.trim().is_empty() {
        return Err(ImportError::MissingIdentity { kind });
    }

    let mut hasher = Sha256::new();
    if let Some(owner) = owner {
        hasher.update(owner.as_str().as_bytes());
    }
    hasher.update([SEPARATOR]);
    hasher.update(source_id.as_bytes());

    Ok(NaturalKey(format!(
        "{}:{:x}",
        kind.prefix(),
        hasher.finalize()
    )))
}

pub fn organization_key(source_id: &str) -> Result<NaturalKey> {
    resolve(EntityKind::Organization, None, source_id)
}

pub fn account_key(organization: &NaturalKey, source_id: &str) -> Result<NaturalKey> {
    resolve(EntityKind::Account, Some(organization), source_id)
}

pub fn transaction_key(account: &NaturalKey, source_id: &str) -> Result<NaturalKey> {
    resolve(EntityKind::Transaction, Some(account), source_id)
}

pub fn holding_key(account: &NaturalKey, source_id: &str) -> Result<NaturalKey> {
    resolve(EntityKind::Holding, Some(account), source_id)
}

/// SHA-256 hex over the compact JSON of `fields`.
/// Object keys serialize in sorted order, so the hash is stable.
pub fn content_hash(fields: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fields.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_pair_same_key() {
        let org = organization_key("org-1").unwrap();
        let a1 = account_key(&org, "acct-1").unwrap();
        let a2 = account_key(&organization_key("org-1").unwrap(), "acct-1").unwrap();

        assert_eq!(a1, a2);
        assert_eq!(
            transaction_key(&a1, "t1").unwrap(),
            transaction_key(&a2, "t1").unwrap()
        );
    }

    #[test]
    fn test_resolution_order_does_not_matter() {
        let org = organization_key("org-1").unwrap();
        let account = account_key(&org, "acct-1").unwrap();

        let forward: Vec<_> = ["t1", "t2", "t3"]
            .iter()
            .map(|id| transaction_key(&account, id).unwrap())
            .collect();
        let mut backward: Vec<_> = ["t3", "t2", "t1"]
            .iter()
            .map(|id| transaction_key(&account, id).unwrap())
            .collect();
        backward.reverse();

        assert_eq!(forward, backward);
    }

    #[test]
    fn test_owner_scopes_key() {
        let org = organization_key("org-1").unwrap();
        let checking = account_key(&org, "checking").unwrap();
        let savings = account_key(&org, "savings").unwrap();

        assert_ne!(
            transaction_key(&checking, "t1").unwrap(),
            transaction_key(&savings, "t1").unwrap()
        );
    }

    #[test]
    fn test_kinds_do_not_collide() {
        let org = organization_key("org-1").unwrap();
        let account = account_key(&org, "acct-1").unwrap();

        let tx = transaction_key(&account, "x").unwrap();
        let holding = holding_key(&account, "x").unwrap();

        assert_ne!(tx, holding);
        assert_eq!(tx.kind(), Some(EntityKind::Transaction));
        assert_eq!(holding.kind(), Some(EntityKind::Holding));
        assert!(tx.as_str().starts_with("txn:"));
        assert_eq!(tx.as_str().len(), "txn:".len() + 64);
    }

    #[test]
    fn test_blank_source_id_is_missing_identity() {
        let org = organization_key("org-1").unwrap();
        let account = account_key(&org, "acct-1").unwrap();

        assert_eq!(
            transaction_key(&account, ""),
            Err(ImportError::MissingIdentity {
                kind: EntityKind::Transaction
            })
        );
        assert_eq!(
            holding_key(&account, "  \t"),
            Err(ImportError::MissingIdentity {
                kind: EntityKind::Holding
            })
        );
        assert!(organization_key(" ").is_err());
    }

    #[test]
    fn test_content_hash_is_key_order_independent() {
        let a = serde_json::json!({"a": 1, "b": "two"});
        let b = serde_json::json!({"b": "two", "a": 1});
        assert_eq!(content_hash(&a), content_hash(&b));
        assert_ne!(content_hash(&a), content_hash(&serde_json::json!({"a": 2, "b": "two"})));
    }
}
