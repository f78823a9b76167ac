use anyhow::{bail, Context, Result};
use simplefin_reconcile::{
    render, Config, ImportOrchestrator, NaturalKey, ReconciliationStore,
};
use std::env;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Optional TOML config; defaults apply when unset
const CONFIG_ENV: &str = "SIMPLEFIN_RECONCILE_CONFIG";

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let config = load_config()?;
    init_tracing(&config.logging.filter);

    match args.get(1).map(String::as_str) {
        Some("import") => {
            let Some(export_path) = args.get(2) else {
                bail!("usage: simplefin-reconcile import <export.json>");
            };
            run_import(&config, Path::new(export_path))
        }
        Some("accounts") => run_list_accounts(&config),
        Some("transactions") => {
            let Some(account) = args.get(2) else {
                bail!("usage: simplefin-reconcile transactions <account-key> [since-epoch]");
            };
            let since = match args.get(3) {
                Some(raw) => raw.parse().context("since must be epoch seconds")?,
                None => i64::MIN,
            };
            run_list_transactions(&config, account, since)
        }
        Some("holdings") => {
            let Some(account) = args.get(2) else {
                bail!("usage: simplefin-reconcile holdings <account-key>");
            };
            run_list_holdings(&config, account)
        }
        _ => {
            eprintln!("usage: simplefin-reconcile <import|accounts|transactions|holdings> ...");
            std::process::exit(2);
        }
    }
}

fn load_config() -> Result<Config> {
    match env::var_os(CONFIG_ENV) {
        Some(path) => Ok(Config::load(&PathBuf::from(path))?),
        None => Ok(Config::default()),
    }
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_import(config: &Config, export_path: &Path) -> Result<()> {
    let file = File::open(export_path)
        .with_context(|| format!("Failed to open export {}", export_path.display()))?;
    let snapshot = simplefin_reconcile::decode_reader(BufReader::new(file))?;

    let store = ReconciliationStore::open(&config.store)?;
    let cancel = config.import.cancellation();
    let report = ImportOrchestrator::new(&store, &config.import).run(&snapshot, &cancel)?;

    print!("{}", render(&report));
    Ok(())
}

fn run_list_accounts(config: &Config) -> Result<()> {
    let store = ReconciliationStore::open(&config.store)?;
    for account in store.list_accounts()? {
        println!(
            "{}  {:<30} {:>14} {}",
            account.key, account.value.name, account.value.balance, account.value.currency
        );
    }
    Ok(())
}

fn run_list_transactions(config: &Config, account: &str, since: i64) -> Result<()> {
    let store = ReconciliationStore::open(&config.store)?;
    let key = NaturalKey::from_stored(account);
    for tx in store.list_transactions(&key, since)? {
        let posted = tx
            .posted_at()
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| tx.posted.to_string());
        println!("{}  {:>12}  {}", posted, tx.amount, tx.description);
    }
    Ok(())
}

fn run_list_holdings(config: &Config, account: &str) -> Result<()> {
    let store = ReconciliationStore::open(&config.store)?;
    let key = NaturalKey::from_stored(account);
    for holding in store.list_holdings(&key)? {
        println!(
            "{:<8} shares {:>12} value {:>14}",
            holding.symbol.as_deref().unwrap_or("-"),
            holding.shares.map(|s| s.to_string()).unwrap_or_default(),
            holding.market_value.map(|v| v.to_string()).unwrap_or_default(),
        );
    }
    Ok(())
}
