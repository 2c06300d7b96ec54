//! Operator-facing summaries. Printed after every run, even when every
//! remote call failed.

use crate::models::{ProbeStatus, RunSummary};
use crate::reconcile::ReconcileReport;
use crate::script::ScriptFile;
use chrono::{DateTime, Utc};
use std::fmt;

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Schema check ({}) ===", self.finished_at.to_rfc3339())?;
        for result in &self.probe.results {
            let mark = match result.status {
                ProbeStatus::Present => "✓",
                ProbeStatus::Missing => "✗",
                ProbeStatus::TransientError => "?",
            };
            write!(f, "  {} {:<24} {}", mark, result.table, result.status)?;
            if result.status == ProbeStatus::TransientError {
                write!(f, "  [{}]", result.raw_detail)?;
            }
            writeln!(f)?;
        }
        writeln!(f)?;
        writeln!(f, "Existing tables: {}", join(&self.probe.existing))?;
        writeln!(f, "Missing tables:  {}", join(&self.probe.missing))?;
        if !self.probe.errored.is_empty() {
            writeln!(f, "Unknown (probe failed): {}", join(&self.probe.errored))?;
        }

        let without_ddl: Vec<&String> = self
            .probe
            .missing
            .iter()
            .filter(|t| !self.missing_ddl.contains_key(*t))
            .collect();
        if !self.ddl_script.is_empty() {
            writeln!(f)?;
            writeln!(f, "=== Creation SQL for missing tables ===")?;
            write!(f, "{}", self.ddl_script)?;
        }
        if !without_ddl.is_empty() {
            writeln!(f, "No DDL registered for: {}", join(without_ddl))?;
        }

        writeln!(f)?;
        match &self.seed {
            Some(seed) => {
                writeln!(f, "=== Sample rows ===")?;
                for (table, outcome) in &seed.outcomes {
                    let mark = if outcome.succeeded() { "✓" } else { "✗" };
                    writeln!(f, "  {} {:<24} {}", mark, table, outcome)?;
                }
                writeln!(
                    f,
                    "Seeded: {} ok, {} failed",
                    seed.succeeded(),
                    seed.failed()
                )?;
            }
            None => writeln!(f, "Sample rows: skipped")?,
        }

        if !self.probe.missing.is_empty() {
            writeln!(f)?;
            writeln!(f, "Next steps:")?;
            writeln!(f, "  1. Open the SQL editor of the database dashboard")?;
            writeln!(f, "  2. Run the creation SQL printed above")?;
            writeln!(f, "  3. Re-run `schema-bootstrap reconcile` to seed the new tables")?;
        }
        Ok(())
    }
}

/// Result of replaying one script.
#[derive(Debug, Clone)]
pub struct ExecReport {
    pub script: ScriptFile,
    pub statements: usize,
    /// Set when the execution RPC failed its availability check; nothing was sent.
    pub rpc_unavailable: Option<String>,
    pub summary: RunSummary,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl fmt::Display for ExecReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = self.finished_at - self.started_at;
        writeln!(f, "=== Script execution ===")?;
        writeln!(f, "Script:     {}", self.script.path.display())?;
        writeln!(f, "SHA-256:    {}", self.script.checksum)?;
        writeln!(f, "Statements: {}", self.statements)?;
        if let Some(reason) = &self.rpc_unavailable {
            writeln!(f, "Exec RPC:   unavailable, no statements sent")?;
            writeln!(f, "            {}", reason)?;
            writeln!(f)?;
            writeln!(f, "Next steps:")?;
            writeln!(f, "  1. Create the SQL execution function in the database dashboard")?;
            writeln!(f, "  2. Re-run `schema-bootstrap exec`")?;
            return Ok(());
        }
        writeln!(f, "Succeeded:  {}", self.summary.success_count)?;
        writeln!(f, "Failed:     {}", self.summary.error_count)?;
        writeln!(f, "Elapsed:    {} ms", elapsed.num_milliseconds())
    }
}

fn join<'a>(tables: impl IntoIterator<Item = &'a String>) -> String {
    let names: Vec<&str> = tables.into_iter().map(String::as_str).collect();
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}
