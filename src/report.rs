// 📊 Diagnostics - human-readable import summaries
// Pure formatting over ImportReport; no decisions are made here.

use crate::entities::EntityKind;
use crate::reconciliation::ImportReport;
use std::fmt::{self, Write};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Full multi-line summary: counts, warnings, failures
pub fn render(report: &ImportReport) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = write_report(&mut out, report);
    out
}

fn write_report(out: &mut String, report: &ImportReport) -> fmt::Result {
    writeln!(out, "📥 Import summary")?;
    writeln!(out, "{RULE}")?;
    writeln!(
        out,
        "{:<14} {:>9} {:>9} {:>9}",
        "", "inserted", "updated", "unchanged"
    )?;
    for kind in EntityKind::ALL {
        let counts = report.counts(kind);
        writeln!(
            out,
            "{:<14} {:>9} {:>9} {:>9}",
            kind.label(),
            counts.inserted,
            counts.updated,
            counts.unchanged
        )?;
    }
    writeln!(
        out,
        "Finished in {} ms",
        (report.finished_at - report.started_at).num_milliseconds()
    )?;

    writeln!(out)?;
    if report.warnings.is_empty() {
        writeln!(out, "✓ No source warnings")?;
    } else {
        writeln!(out, "⚠️  Source warnings ({}):", report.warnings.len())?;
        for warning in &report.warnings {
            writeln!(out, "   - {}", warning)?;
        }
    }

    if report.failures.is_empty() {
        writeln!(out, "✓ No failures")?;
    } else {
        writeln!(out, "❌ Failures ({}):", report.failures.len())?;
        for failure in &report.failures {
            writeln!(
                out,
                "   - account {:?}: {} {:?} [{}] {}",
                failure.account_id,
                failure.kind,
                failure.source_id,
                failure.error.code(),
                failure.error
            )?;
        }
    }

    Ok(())
}

impl ImportReport {
    /// One line, for logs
    pub fn summary(&self) -> String {
        let totals = self.totals();
        format!(
            "Import: {} inserted, {} updated, {} unchanged, {} warnings, {} failures",
            totals.inserted,
            totals.updated,
            totals.unchanged,
            self.warnings.len(),
            self.failures.len()
        )
    }
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::Cancellation;
    use crate::config::ImportConfig;
    use crate::db::ReconciliationStore;
    use crate::reconciliation::ImportOrchestrator;

    fn run(payload: &[u8]) -> ImportReport {
        let store = ReconciliationStore::open_in_memory().unwrap();
        ImportOrchestrator::new(&store, &ImportConfig::default())
            .import_bytes(payload, &Cancellation::new())
            .unwrap()
    }

    #[test]
    fn test_render_clean_report() {
        let report = run(br#"{"accounts": [{"org": {"id": "o"}, "id": "a", "balance": "1",
            "transactions": [{"id": "t1", "posted": 1, "amount": "1.00"}]}]}"#);
        let text = render(&report);

        assert!(text.contains("Organizations"));
        assert!(text.contains("Holdings"));
        assert!(text.contains("✓ No source warnings"));
        assert!(text.contains("✓ No failures"));

        let transactions_line = text.lines().find(|l| l.starts_with("Transactions")).unwrap();
        let columns: Vec<&str> = transactions_line.split_whitespace().collect();
        assert_eq!(columns, vec!["Transactions", "1", "0", "0"]);
    }

    #[test]
    fn test_render_lists_warnings_and_failures() {
        let report = run(br#"{"errors": ["Example Bank needs attention"],
            "accounts": [{"org": {"id": "o"}, "id": "a", "balance": "1",
            "transactions": [{"id": "", "posted": 1, "amount": "1.00"}]}]}"#);
        let text = report.to_string();

        assert!(text.contains("Source warnings (1)"));
        assert!(text.contains("Example Bank needs attention"));
        assert!(text.contains("Failures (1)"));
        assert!(text.contains("[MissingIdentity]"));
    }

    #[test]
    fn test_summary_line() {
        let report = run(br#"{"errors": ["w"], "accounts": [{"org": {"id": "o"}, "id": "a", "balance": "1"}]}"#);
        assert_eq!(
            report.summary(),
            "Import: 2 inserted, 0 updated, 0 unchanged, 1 warnings, 0 failures"
        );
    }
}
