// ⚖️ Import Orchestrator - decode → resolve → reconcile
//
// Order matters: organizations first, then accounts (each embedding its
// organization's key), then each account's transactions and holdings.
//
// Error policy:
//   MissingIdentity / InvalidDecimal / InvalidRecord /
//   DuplicateIdentity                                   → recorded, run continues
//   StoreUnavailable / Cancelled                        → whole run aborts
// Accounts never share natural keys, so they are reconciled independently
// (optionally on several worker threads) and merged back in export order.

use crate::cancel::Cancellation;
use crate::config::{ImportConfig, MissingIdentityPolicy};
use crate::db::{ReconciliationStore, StoreEntry, UpsertOutcome};
use crate::decoder::{self, ImportSnapshot};
use crate::entities::{Account, EntityKind, Reconcilable};
use crate::error::{ImportError, Result};
use crate::identity::{self, NaturalKey};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::{info, warn};

// ============================================================================
// REPORT TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl EntityCounts {
    pub fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Unchanged => self.unchanged += 1,
        }
    }

    pub fn merge(&mut self, other: &EntityCounts) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
    }

    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.unchanged
    }

    pub fn changed(&self) -> usize {
        self.inserted + self.updated
    }
}

/// A local failure: one entity (or the rest of one account) was skipped
#[derive(Debug, Clone, PartialEq)]
pub struct EntityFailure {
    /// Source id of the account being reconciled
    pub account_id: String,
    pub kind: EntityKind,
    pub source_id: String,
    pub error: ImportError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
    pub organizations: EntityCounts,
    pub accounts: EntityCounts,
    pub transactions: EntityCounts,
    pub holdings: EntityCounts,

    /// Source-reported errors, passed through untouched
    pub warnings: Vec<String>,

    pub failures: Vec<EntityFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ImportReport {
    fn new(warnings: Vec<String>) -> Self {
        let now = Utc::now();
        ImportReport {
            organizations: EntityCounts::default(),
            accounts: EntityCounts::default(),
            transactions: EntityCounts::default(),
            holdings: EntityCounts::default(),
            warnings,
            failures: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    pub fn counts(&self, kind: EntityKind) -> &EntityCounts {
        match kind {
            EntityKind::Organization => &self.organizations,
            EntityKind::Account => &self.accounts,
            EntityKind::Transaction => &self.transactions,
            EntityKind::Holding => &self.holdings,
        }
    }

    /// Sum over all entity kinds
    pub fn totals(&self) -> EntityCounts {
        let mut totals = EntityCounts::default();
        for kind in EntityKind::ALL {
            totals.merge(self.counts(kind));
        }
        totals
    }

    /// Anything inserted or updated?
    pub fn has_changes(&self) -> bool {
        self.totals().changed() > 0
    }

    pub fn failures_with_code(&self, code: &str) -> Vec<&EntityFailure> {
        self.failures.iter().filter(|f| f.error.code() == code).collect()
    }

    fn absorb(&mut self, outcome: AccountOutcome) {
        self.accounts.merge(&outcome.accounts);
        self.transactions.merge(&outcome.transactions);
        self.holdings.merge(&outcome.holdings);
        self.failures.extend(outcome.failures);
    }
}

// ============================================================================
// PER-ACCOUNT WORK
// ============================================================================

/// Account with its keys resolved, ready for the store
struct AccountPlan<'s> {
    account: &'s Account,
    organization_key: NaturalKey,
    account_key: NaturalKey,
}

#[derive(Debug, Default)]
struct AccountOutcome {
    accounts: EntityCounts,
    transactions: EntityCounts,
    holdings: EntityCounts,
    failures: Vec<EntityFailure>,
}

impl AccountOutcome {
    fn fail(&mut self, account: &Account, kind: EntityKind, source_id: &str, error: ImportError) {
        warn!(
            account = %account.source_id,
            %kind,
            source_id,
            error = %error,
            "entity skipped"
        );
        self.failures.push(EntityFailure {
            account_id: account.source_id.clone(),
            kind,
            source_id: source_id.to_string(),
            error,
        });
    }
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

pub struct ImportOrchestrator<'a> {
    store: &'a ReconciliationStore,
    config: ImportConfig,
}

impl<'a> ImportOrchestrator<'a> {
    pub fn new(store: &'a ReconciliationStore, config: &ImportConfig) -> Self {
        ImportOrchestrator {
            store,
            config: config.clone(),
        }
    }

    /// Decode `bytes` and run the import
    pub fn import_bytes(&self, bytes: &[u8], cancel: &Cancellation) -> Result<ImportReport> {
        let snapshot = decoder::decode(bytes)?;
        self.run(&snapshot, cancel)
    }

    /// Reconcile one snapshot. Returns a complete report, or the first fatal
    /// error with no report.
    pub fn run(&self, snapshot: &ImportSnapshot, cancel: &Cancellation) -> Result<ImportReport> {
        info!(
            store = %self.store.location(),
            organizations = snapshot.organizations.len(),
            accounts = snapshot.accounts.len(),
            transactions = snapshot.transaction_count(),
            holdings = snapshot.holding_count(),
            "import started"
        );
        for warning in &snapshot.warnings {
            warn!(warning = %warning, "source reported error");
        }

        let mut report = ImportReport::new(snapshot.warnings.clone());
        for rejected in &snapshot.rejected_accounts {
            warn!(
                account = %rejected.account_id,
                kind = %rejected.kind,
                source_id = %rejected.source_id,
                error = %rejected.error,
                "account skipped at decode"
            );
            report.failures.push(EntityFailure {
                account_id: rejected.account_id.clone(),
                kind: rejected.kind,
                source_id: rejected.source_id.clone(),
                error: rejected.error.clone(),
            });
        }

        let organization_keys = self.reconcile_organizations(snapshot, &mut report, cancel)?;
        let (plans, unresolved) = self.plan_accounts(snapshot, &organization_keys);
        report.failures.extend(unresolved);

        for outcome in self.reconcile_accounts(&plans, cancel)? {
            report.absorb(outcome);
        }

        report.finished_at = Utc::now();
        info!(
            inserted = report.totals().inserted,
            updated = report.totals().updated,
            unchanged = report.totals().unchanged,
            failures = report.failures.len(),
            "import finished"
        );
        Ok(report)
    }

    /// Phase 1: organizations. Returns source id → key for the ones that resolved.
    fn reconcile_organizations(
        &self,
        snapshot: &ImportSnapshot,
        report: &mut ImportReport,
        cancel: &Cancellation,
    ) -> Result<HashMap<String, NaturalKey>> {
        let mut keys = HashMap::new();

        for organization in &snapshot.organizations {
            // Blank ids are reported once per affected account in phase 2
            let Ok(key) = identity::organization_key(&organization.source_id) else {
                continue;
            };
            let outcome = self
                .store
                .upsert(&StoreEntry::new(organization, &key, None)?, cancel)?;
            report.organizations.record(outcome);
            keys.insert(organization.source_id.clone(), key);
        }

        Ok(keys)
    }

    /// Phase 2: resolve every account's keys before touching the store
    fn plan_accounts<'s>(
        &self,
        snapshot: &'s ImportSnapshot,
        organization_keys: &HashMap<String, NaturalKey>,
    ) -> (Vec<AccountPlan<'s>>, Vec<EntityFailure>) {
        let mut plans = Vec::new();
        let mut failures = AccountOutcome::default();
        let mut seen = HashSet::new();

        for account in &snapshot.accounts {
            let Some(organization_key) = organization_keys.get(&account.organization_id) else {
                failures.fail(
                    account,
                    EntityKind::Organization,
                    &account.organization_id,
                    ImportError::MissingIdentity {
                        kind: EntityKind::Organization,
                    },
                );
                continue;
            };

            let account_key = match identity::account_key(organization_key, &account.source_id) {
                Ok(key) => key,
                Err(error) => {
                    failures.fail(account, EntityKind::Account, &account.source_id, error);
                    continue;
                }
            };

            if !seen.insert(account_key.clone()) {
                failures.fail(
                    account,
                    EntityKind::Account,
                    &account.source_id,
                    ImportError::DuplicateIdentity {
                        kind: EntityKind::Account,
                        source_id: account.source_id.clone(),
                    },
                );
                continue;
            }

            plans.push(AccountPlan {
                account,
                organization_key: organization_key.clone(),
                account_key,
            });
        }

        (plans, failures.failures)
    }

    /// Phase 3: accounts and their children, sequential or on worker threads.
    /// Outcomes come back in plan order.
    fn reconcile_accounts(
        &self,
        plans: &[AccountPlan<'_>],
        cancel: &Cancellation,
    ) -> Result<Vec<AccountOutcome>> {
        let workers = self.config.workers.max(1).min(plans.len().max(1));

        if workers == 1 {
            return plans
                .iter()
                .map(|plan| self.reconcile_account(plan, cancel))
                .collect();
        }

        let next = AtomicUsize::new(0);
        let halted = AtomicBool::new(false);
        let slots: Mutex<Vec<Option<Result<AccountOutcome>>>> =
            Mutex::new(plans.iter().map(|_| None).collect());

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    if halted.load(Ordering::SeqCst) {
                        break;
                    }
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some(plan) = plans.get(index) else {
                        break;
                    };

                    let result = self.reconcile_account(plan, cancel);
                    if result.is_err() {
                        halted.store(true, Ordering::SeqCst);
                    }
                    if let Ok(mut slots) = slots.lock() {
                        slots[index] = Some(result);
                    }
                });
            }
        });

        let slots = slots
            .into_inner()
            .map_err(|_| ImportError::StoreUnavailable("worker panicked".to_string()))?;

        let mut outcomes = Vec::with_capacity(plans.len());
        for slot in slots {
            match slot {
                Some(result) => outcomes.push(result?),
                // Never picked up because another worker halted the run
                None => continue,
            }
        }
        if outcomes.len() != plans.len() {
            return Err(ImportError::Cancelled);
        }
        Ok(outcomes)
    }

    fn reconcile_account(&self, plan: &AccountPlan<'_>, cancel: &Cancellation) -> Result<AccountOutcome> {
        cancel.check()?;

        let account = plan.account;
        let mut outcome = AccountOutcome::default();

        for rejected in &account.rejected {
            outcome.fail(account, rejected.kind, &rejected.source_id, rejected.error.clone());
        }

        let entry = StoreEntry::new(account, &plan.account_key, Some(&plan.organization_key))?;
        outcome.accounts.record(self.store.upsert(&entry, cancel)?);

        let mut transactions = EntityCounts::default();
        let mut holdings = EntityCounts::default();

        let keep_going = self.reconcile_children(
            account,
            &plan.account_key,
            &account.transactions,
            &mut transactions,
            &mut outcome,
            cancel,
        )?;
        if keep_going {
            self.reconcile_children(
                account,
                &plan.account_key,
                &account.holdings,
                &mut holdings,
                &mut outcome,
                cancel,
            )?;
        }

        outcome.transactions = transactions;
        outcome.holdings = holdings;

        info!(
            account = %account.source_id,
            transactions_changed = outcome.transactions.changed(),
            holdings_changed = outcome.holdings.changed(),
            "account reconciled"
        );
        Ok(outcome)
    }

    /// Upsert children in export order. Returns false when the account was
    /// aborted by a missing identity under the abort-account policy.
    fn reconcile_children<T: Reconcilable>(
        &self,
        account: &Account,
        account_key: &NaturalKey,
        children: &[T],
        counts: &mut EntityCounts,
        outcome: &mut AccountOutcome,
        cancel: &Cancellation,
    ) -> Result<bool> {
        let mut seen = HashSet::new();

        for child in children {
            let key = match identity::resolve(T::KIND, Some(account_key), child.source_id()) {
                Ok(key) => key,
                Err(error) => {
                    outcome.fail(account, T::KIND, child.source_id(), error);
                    match self.config.on_missing_identity {
                        MissingIdentityPolicy::AbortAccount => return Ok(false),
                        MissingIdentityPolicy::SkipEntity => continue,
                    }
                }
            };

            // First occurrence wins
            if !seen.insert(key.clone()) {
                outcome.fail(
                    account,
                    T::KIND,
                    child.source_id(),
                    ImportError::DuplicateIdentity {
                        kind: T::KIND,
                        source_id: child.source_id().to_string(),
                    },
                );
                continue;
            }

            let entry = StoreEntry::new(child, &key, Some(account_key))?;
            counts.record(self.store.upsert(&entry, cancel)?);
        }

        Ok(true)
    }
}
