// 📥 Decoder - SimpleFIN accounts export → ImportSnapshot
//
// Two passes:
//   1. bytes → serde_json::Value        (syntax problems = MalformedInput)
//   2. Value → wire structs, one record at a time
// Identity fields (account `id`, `org` id/domain, child `id` keys) are decoded
// strictly: absent means SchemaMismatch and the run stops. Everything else is
// isolated: a bad account becomes a RejectedAccount, a bad child lands in its
// account's `rejected` list, and the siblings carry on. Blank ids pass through
// untouched; the identity resolver reports those per entity.

use crate::entities::{Account, EntityKind, Holding, Organization, Rejected, Transaction};
use crate::error::{ImportError, Result};
use bigdecimal::BigDecimal;
use serde::Deserialize;
use serde_json::Value;
use std::io::Read;
use std::str::FromStr;

// ============================================================================
// IMPORT SNAPSHOT
// ============================================================================

/// Result of one decode pass. Transient: the orchestrator decomposes it into
/// the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportSnapshot {
    /// Source-reported error strings, plus decoder notes on conflicting
    /// organization details
    pub warnings: Vec<String>,

    /// Distinct organizations, in order of first appearance
    pub organizations: Vec<Organization>,

    pub accounts: Vec<Account>,

    /// Accounts whose own fields did not decode
    pub rejected_accounts: Vec<RejectedAccount>,
}

impl ImportSnapshot {
    pub fn transaction_count(&self) -> usize {
        self.accounts.iter().map(|a| a.transactions.len()).sum()
    }

    pub fn holding_count(&self) -> usize {
        self.accounts.iter().map(|a| a.holdings.len()).sum()
    }

    pub fn organization(&self, source_id: &str) -> Option<&Organization> {
        self.organizations.iter().find(|o| o.source_id == source_id)
    }
}

/// An account dropped at decode time. `kind` is Organization when the
/// account's org details were the problem.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedAccount {
    pub account_id: String,
    pub kind: EntityKind,
    pub source_id: String,
    pub error: ImportError,
}

// ============================================================================
// WIRE SCHEMA
// ============================================================================

#[derive(Debug, Deserialize)]
struct WireExport {
    #[serde(default)]
    errors: Vec<String>,
    accounts: Vec<Value>,
}

/// The part of an account that must decode for anything to be reported
#[derive(Debug, Deserialize)]
struct WireAccountIdentity {
    org: WireOrganizationIdentity,
    id: String,
}

#[derive(Debug, Deserialize)]
struct WireOrganizationIdentity {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    domain: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireOrganizationDetails {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(rename = "sfin-url", default)]
    sfin_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireAccount {
    #[serde(default)]
    name: String,
    #[serde(default)]
    currency: String,
    balance: String,
    #[serde(rename = "available-balance", default)]
    available_balance: Option<String>,
    #[serde(rename = "balance-date", default)]
    balance_date: i64,
    #[serde(default)]
    transactions: Vec<Value>,
    #[serde(default)]
    holdings: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct WireTransaction {
    id: String,
    #[serde(default)]
    posted: i64,
    amount: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    payee: Option<String>,
    #[serde(default)]
    memo: Option<String>,
    #[serde(default)]
    transacted_at: Option<i64>,
    #[serde(default)]
    pending: bool,
}

#[derive(Debug, Deserialize)]
struct WireHolding {
    id: String,
    #[serde(default)]
    created: i64,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    cost_basis: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    market_value: Option<String>,
    #[serde(default)]
    purchase_price: Option<String>,
    #[serde(default)]
    shares: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
}

fn invalid_record(kind: EntityKind, err: serde_json::Error) -> ImportError {
    ImportError::InvalidRecord {
        kind,
        reason: err.to_string(),
    }
}

// ============================================================================
// DECODE
// ============================================================================

/// Decode a full export payload
pub fn decode(bytes: &[u8]) -> Result<ImportSnapshot> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| ImportError::MalformedInput(e.to_string()))?;
    decode_value(value)
}

/// Decode from a stream (file, HTTP body)
pub fn decode_reader<R: Read>(reader: R) -> Result<ImportSnapshot> {
    let value: Value = serde_json::from_reader(reader)
        .map_err(|e| ImportError::MalformedInput(e.to_string()))?;
    decode_value(value)
}

fn decode_value(value: Value) -> Result<ImportSnapshot> {
    if !value.is_object() {
        return Err(ImportError::MalformedInput(
            "export must be a JSON object".to_string(),
        ));
    }

    let wire: WireExport =
        serde_json::from_value(value).map_err(|e| ImportError::SchemaMismatch(e.to_string()))?;

    let mut snapshot = ImportSnapshot {
        warnings: wire.errors,
        ..ImportSnapshot::default()
    };

    for (index, raw) in wire.accounts.iter().enumerate() {
        let identity = WireAccountIdentity::deserialize(raw).map_err(|e| {
            ImportError::SchemaMismatch(format!("accounts[{}]: {}", index, e))
        })?;
        let organization_id = organization_source_id(&identity.org, index)?;
        let account_id = identity.id;

        let organization = match WireOrganizationDetails::deserialize(&raw["org"]) {
            Ok(details) => Organization {
                source_id: organization_id.clone(),
                domain: identity.org.domain,
                name: details.name,
                url: details.url,
                sfin_url: details.sfin_url,
            },
            Err(e) => {
                snapshot.rejected_accounts.push(RejectedAccount {
                    account_id,
                    kind: EntityKind::Organization,
                    source_id: organization_id,
                    error: invalid_record(EntityKind::Organization, e),
                });
                continue;
            }
        };
        register_organization(&mut snapshot, organization);

        let wire_account = match WireAccount::deserialize(raw) {
            Ok(wire_account) => wire_account,
            Err(e) => {
                snapshot.rejected_accounts.push(RejectedAccount {
                    source_id: account_id.clone(),
                    account_id,
                    kind: EntityKind::Account,
                    error: invalid_record(EntityKind::Account, e),
                });
                continue;
            }
        };

        let mut account = match convert_account(&account_id, &organization_id, &wire_account) {
            Ok(account) => account,
            Err(error) => {
                snapshot.rejected_accounts.push(RejectedAccount {
                    source_id: account_id.clone(),
                    account_id,
                    kind: EntityKind::Account,
                    error,
                });
                continue;
            }
        };

        attach_children(&mut account, &wire_account.transactions, &wire_account.holdings)?;
        snapshot.accounts.push(account);
    }

    Ok(snapshot)
}

/// Organization id, falling back to the domain when the id is absent or blank
fn organization_source_id(wire: &WireOrganizationIdentity, account_index: usize) -> Result<String> {
    let usable = |field: &Option<String>| field.clone().filter(|s| !s.trim().is_empty());

    match (&wire.id, &wire.domain) {
        (None, None) => Err(ImportError::SchemaMismatch(format!(
            "accounts[{}].org has neither id nor domain",
            account_index
        ))),
        // Blank id and no usable domain: the resolver reports MissingIdentity
        (id, domain) => Ok(usable(id)
            .or_else(|| usable(domain))
            .or_else(|| id.clone())
            .unwrap_or_default()),
    }
}

/// First appearance wins; a later copy that disagrees is noted as a warning
fn register_organization(snapshot: &mut ImportSnapshot, organization: Organization) {
    let conflict = match snapshot.organization(&organization.source_id) {
        None => {
            snapshot.organizations.push(organization);
            return;
        }
        Some(kept) => kept.conflicts_with(&organization),
    };
    if conflict {
        snapshot.warnings.push(format!(
            "organization {:?} appears with conflicting details; keeping the first",
            organization.source_id
        ));
    }
}

fn convert_account(source_id: &str, organization_id: &str, wire: &WireAccount) -> Result<Account> {
    let balance = parse_decimal("balance", &wire.balance)?;
    let available_balance =
        parse_optional_decimal("available-balance", wire.available_balance.clone())?;

    Ok(Account {
        source_id: source_id.to_string(),
        organization_id: organization_id.to_string(),
        name: wire.name.clone(),
        currency: wire.currency.clone(),
        balance,
        available_balance,
        balance_date: wire.balance_date,
        transactions: Vec::new(),
        holdings: Vec::new(),
        rejected: Vec::new(),
    })
}

/// A child's `id` must be present. A non-string id is kept in its JSON form
/// so the rejection can still name it.
fn child_source_id(kind: EntityKind, account_id: &str, index: usize, raw: &Value) -> Result<String> {
    match raw.get("id") {
        Some(Value::String(id)) => Ok(id.clone()),
        Some(other) => Ok(other.to_string()),
        None => Err(ImportError::SchemaMismatch(format!(
            "account {:?} {}[{}] has no id",
            account_id,
            kind.table(),
            index
        ))),
    }
}

/// Convert children, isolating any that do not decode
fn attach_children(account: &mut Account, transactions: &[Value], holdings: &[Value]) -> Result<()> {
    for (index, raw) in transactions.iter().enumerate() {
        let source_id = child_source_id(EntityKind::Transaction, &account.source_id, index, raw)?;
        match convert_transaction(raw) {
            Ok(tx) => account.transactions.push(tx),
            Err(error) => account.rejected.push(Rejected {
                kind: EntityKind::Transaction,
                source_id,
                error,
            }),
        }
    }

    for (index, raw) in holdings.iter().enumerate() {
        let source_id = child_source_id(EntityKind::Holding, &account.source_id, index, raw)?;
        match convert_holding(raw) {
            Ok(holding) => account.holdings.push(holding),
            Err(error) => account.rejected.push(Rejected {
                kind: EntityKind::Holding,
                source_id,
                error,
            }),
        }
    }

    Ok(())
}

fn convert_transaction(raw: &Value) -> Result<Transaction> {
    let wire = WireTransaction::deserialize(raw)
        .map_err(|e| invalid_record(EntityKind::Transaction, e))?;

    Ok(Transaction {
        amount: parse_decimal("amount", &wire.amount)?,
        source_id: wire.id,
        posted: wire.posted,
        description: wire.description,
        payee: wire.payee,
        memo: wire.memo,
        // SimpleFIN sends 0 when unknown
        transacted_at: wire.transacted_at.filter(|ts| *ts != 0),
        pending: wire.pending,
    })
}

fn convert_holding(raw: &Value) -> Result<Holding> {
    let wire = WireHolding::deserialize(raw).map_err(|e| invalid_record(EntityKind::Holding, e))?;

    Ok(Holding {
        cost_basis: parse_optional_decimal("cost_basis", wire.cost_basis)?,
        market_value: parse_optional_decimal("market_value", wire.market_value)?,
        purchase_price: parse_optional_decimal("purchase_price", wire.purchase_price)?,
        shares: parse_optional_decimal("shares", wire.shares)?,
        source_id: wire.id,
        created: wire.created,
        currency: wire.currency,
        description: wire.description,
        symbol: wire.symbol,
    })
}

// ============================================================================
// DECIMALS
// ============================================================================

fn parse_decimal(field: &str, raw: &str) -> Result<BigDecimal> {
    BigDecimal::from_str(raw.trim()).map_err(|_| ImportError::InvalidDecimal {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

/// Absent or blank → None
fn parse_optional_decimal(field: &str, raw: Option<String>) -> Result<Option<BigDecimal>> {
    match raw {
        Some(text) if !text.trim().is_empty() => parse_decimal(field, &text).map(Some),
        _ => Ok(None),
    }
}
