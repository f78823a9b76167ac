// 🗄️ Reconciliation Store - SQLite + WAL
//
// One table per entity kind, keyed by natural key:
//   natural_key | owner_key | sort_ts | payload | content_hash | first_seen | last_seen
//
// Every upsert runs inside a single IMMEDIATE transaction while the connection
// lock is held. The lock guard and the transaction are both scoped, so any
// early return (error or cancellation) drops them and SQLite rolls back.

use crate::cancel::Cancellation;
use crate::config::StoreConfig;
use crate::entities::{Account, EntityKind, Holding, Reconcilable, Transaction};
use crate::error::{ImportError, Result};
use crate::identity::NaturalKey;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};

// ============================================================================
// TYPES
// ============================================================================

/// What an upsert did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

/// One row ready to be written
#[derive(Debug, Clone)]
pub struct StoreEntry {
    pub kind: EntityKind,
    pub key: NaturalKey,
    pub owner_key: Option<NaturalKey>,
    pub sort_ts: i64,
    pub payload: serde_json::Value,
    pub content_hash: String,
}

impl StoreEntry {
    pub fn new<T: Reconcilable>(
        entity: &T,
        key: &NaturalKey,
        owner_key: Option<&NaturalKey>,
    ) -> Result<Self> {
        let payload = serde_json::to_value(entity).map_err(|e| {
            ImportError::StoreUnavailable(format!("cannot serialize {}: {}", T::KIND, e))
        })?;

        Ok(StoreEntry {
            kind: T::KIND,
            key: key.clone(),
            owner_key: owner_key.cloned(),
            sort_ts: entity.sort_timestamp(),
            payload,
            content_hash: entity.content_hash(),
        })
    }
}

/// Persisted projection of one entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub kind: EntityKind,
    pub key: NaturalKey,
    pub owner_key: Option<NaturalKey>,
    pub sort_ts: i64,
    pub payload: serde_json::Value,
    pub content_hash: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl Record {
    /// Decode the payload back into its model type
    pub fn decode<T: Reconcilable>(&self) -> Result<T> {
        serde_json::from_value(self.payload.clone()).map_err(|e| corrupt_payload(&self.key, e))
    }
}

/// Stored value together with its keys
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Keyed<T> {
    pub key: NaturalKey,
    pub owner_key: Option<NaturalKey>,
    pub value: T,
}

/// Audit trail entry: every insert and update is an event
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: EntityKind,
    pub entity_id: String,
    pub data: serde_json::Value,
}

impl Event {
    fn new(event_type: &str, entry: &StoreEntry, data: serde_json::Value) -> Self {
        Event {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entry.kind,
            entity_id: entry.key.to_string(),
            data,
        }
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

fn setup_database(conn: &Connection, busy_timeout: Duration) -> Result<()> {
    // WAL for crash recovery; in-memory databases report "memory" and that's fine
    let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(busy_timeout)?;

    for kind in EntityKind::ALL {
        let table = kind.table();
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                natural_key TEXT PRIMARY KEY NOT NULL,
                owner_key TEXT,
                sort_ts INTEGER NOT NULL,
                payload TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                first_seen TEXT NOT NULL,
                last_seen TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_owner ON {table}(owner_key, sort_ts, natural_key);"
        ))?;
    }

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_id);",
    )?;

    Ok(())
}

// ============================================================================
// STORE
// ============================================================================

pub struct ReconciliationStore {
    conn: Mutex<Connection>,
    location: String,
}

impl ReconciliationStore {
    /// Open (or create) the database named in the config. Single attempt.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        Self::open_path(&config.database_path, config.busy_timeout())
    }

    pub fn open_path(path: &Path, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| {
            ImportError::StoreUnavailable(format!("cannot open {}: {}", path.display(), e))
        })?;
        Self::from_connection(conn, busy_timeout, path.display().to_string())
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, Duration::from_secs(5), ":memory:".to_string())
    }

    fn from_connection(conn: Connection, busy_timeout: Duration, location: String) -> Result<Self> {
        setup_database(&conn, busy_timeout)?;
        info!(store = %location, "reconciliation store ready");
        Ok(ReconciliationStore {
            conn: Mutex::new(conn),
            location,
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Scoped access to the connection; the guard drops on every exit path
    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| ImportError::StoreUnavailable("store lock poisoned".to_string()))?;
        f(&mut guard)
    }

    // ------------------------------------------------------------------------
    // WRITE
    // ------------------------------------------------------------------------

    /// Insert, update or touch one record, atomically.
    ///
    /// Same hash → only `last_seen` moves (Unchanged). Different hash →
    /// payload replaced (Updated). Cancellation before commit rolls back.
    pub fn upsert(&self, entry: &StoreEntry, cancel: &Cancellation) -> Result<UpsertOutcome> {
        cancel.check()?;

        let table = entry.kind.table();
        let payload = entry.payload.to_string();
        let owner = entry.owner_key.as_ref().map(NaturalKey::as_str);
        let now = Utc::now().to_rfc3339();

        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let existing: Option<String> = tx
                .query_row(
                    &format!("SELECT content_hash FROM {table} WHERE natural_key = ?1"),
                    params![entry.key.as_str()],
                    |row| row.get(0),
                )
                .optional()?;

            let outcome = match existing {
                None => {
                    tx.execute(
                        &format!(
                            "INSERT INTO {table}
                                (natural_key, owner_key, sort_ts, payload, content_hash, first_seen, last_seen)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)"
                        ),
                        params![entry.key.as_str(), owner, entry.sort_ts, payload, entry.content_hash, now],
                    )?;
                    insert_event(
                        &tx,
                        &Event::new(
                            "entity_inserted",
                            entry,
                            serde_json::json!({ "content_hash": entry.content_hash }),
                        ),
                    )?;
                    UpsertOutcome::Inserted
                }
                Some(previous) if previous == entry.content_hash => {
                    tx.execute(
                        &format!("UPDATE {table} SET last_seen = ?2 WHERE natural_key = ?1"),
                        params![entry.key.as_str(), now],
                    )?;
                    UpsertOutcome::Unchanged
                }
                Some(previous) => {
                    tx.execute(
                        &format!(
                            "UPDATE {table}
                             SET owner_key = ?2, sort_ts = ?3, payload = ?4, content_hash = ?5, last_seen = ?6
                             WHERE natural_key = ?1"
                        ),
                        params![entry.key.as_str(), owner, entry.sort_ts, payload, entry.content_hash, now],
                    )?;
                    insert_event(
                        &tx,
                        &Event::new(
                            "entity_updated",
                            entry,
                            serde_json::json!({
                                "previous_hash": previous,
                                "content_hash": entry.content_hash,
                            }),
                        ),
                    )?;
                    UpsertOutcome::Updated
                }
            };

            // Dropping `tx` here rolls back
            cancel.check()?;
            tx.commit()?;

            debug!(kind = %entry.kind, key = %entry.key, ?outcome, "upsert");
            Ok(outcome)
        })
    }

    // ------------------------------------------------------------------------
    // READ
    // ------------------------------------------------------------------------

    /// Record by key; `None` when not found
    pub fn get(&self, kind: EntityKind, key: &NaturalKey) -> Result<Option<Record>> {
        let table = kind.table();
        self.with_conn(|conn| {
            let record = conn
                .query_row(
                    &format!(
                        "SELECT natural_key, owner_key, sort_ts, payload, content_hash, first_seen, last_seen
                         FROM {table} WHERE natural_key = ?1"
                    ),
                    params![key.as_str()],
                    |row| {
                        let payload: String = row.get(3)?;
                        Ok(Record {
                            kind,
                            key: NaturalKey::from_stored(row.get::<_, String>(0)?),
                            owner_key: row.get::<_, Option<String>>(1)?.map(NaturalKey::from_stored),
                            sort_ts: row.get(2)?,
                            payload: serde_json::from_str(&payload).map_err(|e| {
                                rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e))
                            })?,
                            content_hash: row.get(4)?,
                            first_seen: parse_timestamp(row.get(5)?, 5)?,
                            last_seen: parse_timestamp(row.get(6)?, 6)?,
                        })
                    },
                )
                .optional()?;
            Ok(record)
        })
    }

    /// Transactions of one account posted at or after `since_posted`,
    /// oldest first, ties by natural key
    pub fn list_transactions(
        &self,
        account_key: &NaturalKey,
        since_posted: i64,
    ) -> Result<Vec<Transaction>> {
        self.list_children(account_key, since_posted)
    }

    /// Holdings of one account, oldest first, ties by natural key
    pub fn list_holdings(&self, account_key: &NaturalKey) -> Result<Vec<Holding>> {
        self.list_children(account_key, i64::MIN)
    }

    fn list_children<T: Reconcilable>(&self, owner: &NaturalKey, since: i64) -> Result<Vec<T>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT natural_key, payload FROM {}
                 WHERE owner_key = ?1 AND sort_ts >= ?2
                 ORDER BY sort_ts ASC, natural_key ASC",
                T::KIND.table()
            ))?;
            let rows = stmt
                .query_map(params![owner.as_str(), since], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        rows.into_iter()
            .map(|(key, payload)| {
                serde_json::from_str(&payload)
                    .map_err(|e| corrupt_payload(&NaturalKey::from_stored(key), e))
            })
            .collect()
    }

    /// All accounts, ordered by key
    pub fn list_accounts(&self) -> Result<Vec<Keyed<Account>>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT natural_key, owner_key, payload FROM accounts ORDER BY natural_key ASC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        rows.into_iter()
            .map(|(key, owner, payload)| {
                let key = NaturalKey::from_stored(key);
                let value = serde_json::from_str(&payload).map_err(|e| corrupt_payload(&key, e))?;
                Ok(Keyed {
                    key,
                    owner_key: owner.map(NaturalKey::from_stored),
                    value,
                })
            })
            .collect()
    }

    pub fn count(&self, kind: EntityKind) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                &format!("SELECT COUNT(*) FROM {}", kind.table()),
                [],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Audit events for one key, oldest first
    pub fn events_for(&self, key: &NaturalKey) -> Result<Vec<Event>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT event_id, timestamp, event_type, entity_type, entity_id, data
                 FROM events
                 WHERE entity_id = ?1
                 ORDER BY id ASC",
            )?;

            let events = stmt
                .query_map(params![key.as_str()], |row| {
                    let entity_type: String = row.get(3)?;
                    let data_json: String = row.get(5)?;

                    Ok(Event {
                        event_id: row.get(0)?,
                        timestamp: parse_timestamp(row.get(1)?, 1)?,
                        event_type: row.get(2)?,
                        entity_type: EntityKind::ALL
                            .into_iter()
                            .find(|k| k.as_str() == entity_type)
                            .ok_or(rusqlite::Error::InvalidColumnType(
                                3,
                                entity_type.clone(),
                                Type::Text,
                            ))?,
                        entity_id: row.get(4)?,
                        data: serde_json::from_str(&data_json).map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e))
                        })?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(events)
        })
    }
}

/// Insert event into audit trail (inside the caller's transaction)
fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    conn.execute(
        "INSERT INTO events (event_id, timestamp, event_type, entity_type, entity_id, data)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type.as_str(),
            event.entity_id,
            event.data.to_string(),
        ],
    )?;
    Ok(())
}

fn parse_timestamp(raw: String, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn corrupt_payload(key: &NaturalKey, err: serde_json::Error) -> ImportError {
    ImportError::StoreUnavailable(format!("corrupt payload for {}: {}", key, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{account_key, organization_key, transaction_key};
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    /// Helper function to create test transactions with all required fields
    fn create_test_transaction(id: &str, posted: i64, amount: &str, description: &str) -> Transaction {
        Transaction {
            source_id: id.to_string(),
            posted,
            amount: BigDecimal::from_str(amount).unwrap(),
            description: description.to_string(),
            payee: None,
            memo: None,
            transacted_at: None,
            pending: false,
        }
    }

    fn test_account_key() -> NaturalKey {
        account_key(&organization_key("org-1").unwrap(), "acct-1").unwrap()
    }

    fn entry_for(tx: &Transaction, account: &NaturalKey) -> StoreEntry {
        let key = transaction_key(account, &tx.source_id).unwrap();
        StoreEntry::new(tx, &key, Some(account)).unwrap()
    }

    #[test]
    fn test_upsert_insert_unchanged_updated() {
        let store = ReconciliationStore::open_in_memory().unwrap();
        let cancel = Cancellation::new();
        let account = test_account_key();

        let tx = create_test_transaction("t1", 100, "-10.00", "COFFEE");
        assert_eq!(store.upsert(&entry_for(&tx, &account), &cancel).unwrap(), UpsertOutcome::Inserted);
        assert_eq!(store.upsert(&entry_for(&tx, &account), &cancel).unwrap(), UpsertOutcome::Unchanged);

        let changed = create_test_transaction("t1", 100, "-10.00", "COFFEE & BAGEL");
        assert_eq!(store.upsert(&entry_for(&changed, &account), &cancel).unwrap(), UpsertOutcome::Updated);

        assert_eq!(store.count(EntityKind::Transaction).unwrap(), 1);

        let key = transaction_key(&account, "t1").unwrap();
        let record = store.get(EntityKind::Transaction, &key).unwrap().unwrap();
        assert_eq!(record.content_hash, changed.content_hash());
        assert_eq!(record.owner_key.as_ref(), Some(&account));
        assert!(record.last_seen >= record.first_seen);
        assert_eq!(record.decode::<Transaction>().unwrap(), changed);
    }

    #[test]
    fn test_get_missing_is_none() {
        let store = ReconciliationStore::open_in_memory().unwrap();
        let key = transaction_key(&test_account_key(), "nope").unwrap();
        assert!(store.get(EntityKind::Transaction, &key).unwrap().is_none());
    }

    #[test]
    fn test_cancelled_upsert_writes_nothing() {
        let store = ReconciliationStore::open_in_memory().unwrap();
        let cancel = Cancellation::new();
        cancel.cancel();

        let account = test_account_key();
        let tx = create_test_transaction("t1", 100, "-10.00", "COFFEE");
        let err = store.upsert(&entry_for(&tx, &account), &cancel).unwrap_err();

        assert_eq!(err, ImportError::Cancelled);
        assert_eq!(store.count(EntityKind::Transaction).unwrap(), 0);
        assert!(store.events_for(&transaction_key(&account, "t1").unwrap()).unwrap().is_empty());
    }

    #[test]
    fn test_cancel_between_write_and_commit_rolls_back_insert() {
        let store = ReconciliationStore::open_in_memory().unwrap();
        let account = test_account_key();
        let tx = create_test_transaction("t1", 100, "-10.00", "COFFEE");

        // Passes the check before the write, fires at the one before commit
        let cancel = Cancellation::after_checks(1);
        let err = store.upsert(&entry_for(&tx, &account), &cancel).unwrap_err();

        assert_eq!(err, ImportError::Cancelled);
        let key = transaction_key(&account, "t1").unwrap();
        assert!(store.get(EntityKind::Transaction, &key).unwrap().is_none());
        assert!(store.events_for(&key).unwrap().is_empty());

        // Connection is usable again afterwards
        assert_eq!(
            store.upsert(&entry_for(&tx, &account), &Cancellation::new()).unwrap(),
            UpsertOutcome::Inserted
        );
    }

    #[test]
    fn test_cancel_between_write_and_commit_rolls_back_update() {
        let store = ReconciliationStore::open_in_memory().unwrap();
        let account = test_account_key();
        let key = transaction_key(&account, "t1").unwrap();

        let original = create_test_transaction("t1", 100, "-10.00", "COFFEE");
        store.upsert(&entry_for(&original, &account), &Cancellation::new()).unwrap();
        let before = store.get(EntityKind::Transaction, &key).unwrap().unwrap();

        let changed = create_test_transaction("t1", 100, "-12.00", "COFFEE");
        let err = store
            .upsert(&entry_for(&changed, &account), &Cancellation::after_checks(1))
            .unwrap_err();
        assert_eq!(err, ImportError::Cancelled);

        let after = store.get(EntityKind::Transaction, &key).unwrap().unwrap();
        assert_eq!(after.content_hash, original.content_hash());
        assert_eq!(after.last_seen, before.last_seen);
        assert_eq!(after.decode::<Transaction>().unwrap(), original);
        assert_eq!(store.events_for(&key).unwrap().len(), 1);
    }

    #[test]
    fn test_list_transactions_ordered_by_posted_then_key() {
        let store = ReconciliationStore::open_in_memory().unwrap();
        let cancel = Cancellation::new();
        let account = test_account_key();

        for (id, posted) in [("late", 100), ("early", 50), ("middle", 75)] {
            let tx = create_test_transaction(id, posted, "1.00", id);
            store.upsert(&entry_for(&tx, &account), &cancel).unwrap();
        }

        let posted: Vec<i64> = store
            .list_transactions(&account, i64::MIN)
            .unwrap()
            .iter()
            .map(|tx| tx.posted)
            .collect();
        assert_eq!(posted, vec![50, 75, 100]);

        let since: Vec<String> = store
            .list_transactions(&account, 75)
            .unwrap()
            .into_iter()
            .map(|tx| tx.source_id)
            .collect();
        assert_eq!(since, vec!["middle".to_string(), "late".to_string()]);
    }

    #[test]
    fn test_ties_broken_by_natural_key() {
        let store = ReconciliationStore::open_in_memory().unwrap();
        let cancel = Cancellation::new();
        let account = test_account_key();

        let ids = ["a", "b", "c", "d"];
        for id in ids {
            let tx = create_test_transaction(id, 100, "1.00", id);
            store.upsert(&entry_for(&tx, &account), &cancel).unwrap();
        }

        let mut expected: Vec<(NaturalKey, &str)> = ids
            .iter()
            .map(|id| (transaction_key(&account, id).unwrap(), *id))
            .collect();
        expected.sort();

        let listed: Vec<String> = store
            .list_transactions(&account, 0)
            .unwrap()
            .into_iter()
            .map(|tx| tx.source_id)
            .collect();
        let expected: Vec<String> = expected.into_iter().map(|(_, id)| id.to_string()).collect();
        assert_eq!(listed, expected);
    }

    #[test]
    fn test_list_scoped_to_account() {
        let store = ReconciliationStore::open_in_memory().unwrap();
        let cancel = Cancellation::new();
        let org = organization_key("org-1").unwrap();
        let checking = account_key(&org, "checking").unwrap();
        let savings = account_key(&org, "savings").unwrap();

        let tx = create_test_transaction("t1", 100, "1.00", "x");
        store.upsert(&entry_for(&tx, &checking), &cancel).unwrap();
        store.upsert(&entry_for(&tx, &savings), &cancel).unwrap();

        assert_eq!(store.list_transactions(&checking, 0).unwrap().len(), 1);
        assert_eq!(store.count(EntityKind::Transaction).unwrap(), 2);
        assert!(store.list_holdings(&checking).unwrap().is_empty());
    }

    #[test]
    fn test_event_log() {
        let store = ReconciliationStore::open_in_memory().unwrap();
        let cancel = Cancellation::new();
        let account = test_account_key();

        let tx = create_test_transaction("t1", 100, "-10.00", "COFFEE");
        store.upsert(&entry_for(&tx, &account), &cancel).unwrap();
        store.upsert(&entry_for(&tx, &account), &cancel).unwrap();
        let changed = create_test_transaction("t1", 100, "-12.00", "COFFEE");
        store.upsert(&entry_for(&changed, &account), &cancel).unwrap();

        let events = store.events_for(&transaction_key(&account, "t1").unwrap()).unwrap();
        let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();

        // Unchanged upserts leave no event
        assert_eq!(types, vec!["entity_inserted", "entity_updated"]);
        assert_eq!(events[1].entity_type, EntityKind::Transaction);
        assert_eq!(
            events[1].data["previous_hash"],
            serde_json::json!(tx.content_hash())
        );
    }

    #[test]
    fn test_list_accounts() {
        let store = ReconciliationStore::open_in_memory().unwrap();
        let cancel = Cancellation::new();
        let org = organization_key("org-1").unwrap();
        let key = account_key(&org, "acct-1").unwrap();

        let account = Account {
            source_id: "acct-1".to_string(),
            organization_id: "org-1".to_string(),
            name: "Checking".to_string(),
            currency: "USD".to_string(),
            balance: BigDecimal::from_str("123.45").unwrap(),
            available_balance: None,
            balance_date: 1_700_000_000,
            transactions: Vec::new(),
            holdings: Vec::new(),
            rejected: Vec::new(),
        };
        store
            .upsert(&StoreEntry::new(&account, &key, Some(&org)).unwrap(), &cancel)
            .unwrap();

        let accounts = store.list_accounts().unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].key, key);
        assert_eq!(accounts[0].owner_key.as_ref(), Some(&org));
        assert_eq!(accounts[0].value.name, "Checking");
    }

    #[test]
    fn test_open_unwritable_path_is_store_unavailable() {
        let result = ReconciliationStore::open_path(
            Path::new("/nonexistent-dir/for/sure/simplefin.db"),
            Duration::from_millis(10),
        );
        assert!(matches!(result, Err(ImportError::StoreUnavailable(_))));
    }
}
