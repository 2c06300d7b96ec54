use crate::errors::ErrorKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

fn default_key_column() -> String {
    "id".to_string()
}

/// One expected table: its creation statement and the tables it references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    /// Column used as the probe projection.
    #[serde(default = "default_key_column")]
    pub key_column: String,
    /// Full CREATE TABLE text, including constraints and RLS enablement.
    pub ddl: String,
    /// Tables that must exist (and be seeded) before this one.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl TableSpec {
    pub fn new(name: &str, ddl: &str, dependencies: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            key_column: default_key_column(),
            ddl: ddl.trim().to_string(),
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
        }
    }
}

/// A representative row for one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub table: String,
    pub fields: Map<String, Value>,
}

impl SampleRecord {
    /// Builds a record from a JSON object. Non-object values yield an empty row.
    pub fn new(table: &str, fields: Value) -> Self {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            table: table.to_string(),
            fields,
        }
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    Present,
    Missing,
    TransientError,
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeStatus::Present => f.write_str("present"),
            ProbeStatus::Missing => f.write_str("missing"),
            ProbeStatus::TransientError => f.write_str("error"),
        }
    }
}

/// Outcome of one existence probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub table: String,
    pub status: ProbeStatus,
    pub raw_detail: String,
}

/// Outcome of one statement sent to the execution endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub statement_index: usize,
    /// `None` when the request failed before a status was received.
    pub status_code: Option<u16>,
    pub succeeded: bool,
}

/// Aggregate counts of one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub success_count: usize,
    pub error_count: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &ExecutionOutcome) {
        if outcome.succeeded {
            self.success_count += 1;
        } else {
            self.error_count += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.success_count + self.error_count
    }
}

/// Result of seeding one table.
#[derive(Debug, Clone, PartialEq)]
pub enum SeedOutcome {
    /// The sample row was written.
    Inserted,
    /// The row already existed (conflict folded into success).
    AlreadyPresent,
    /// No insert was attempted.
    Skipped(String),
    /// The insert was attempted and rejected.
    Failed { kind: ErrorKind, detail: String },
}

impl SeedOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, SeedOutcome::Inserted | SeedOutcome::AlreadyPresent)
    }
}

impl fmt::Display for SeedOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedOutcome::Inserted => f.write_str("inserted"),
            SeedOutcome::AlreadyPresent => f.write_str("already present"),
            SeedOutcome::Skipped(reason) => write!(f, "skipped ({})", reason),
            SeedOutcome::Failed { kind, detail } => write!(f, "failed, {}: {}", kind, detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_table_spec_deserialize_defaults() {
        let spec: TableSpec =
            serde_json::from_value(json!({"name": "t", "ddl": "CREATE TABLE t (id int);"}))
                .unwrap();
        assert_eq!(spec.key_column, "id");
        assert!(spec.dependencies.is_empty());
    }

    #[test]
    fn test_run_summary_counts() {
        let mut summary = RunSummary::default();
        summary.record(&ExecutionOutcome {
            statement_index: 0,
            status_code: Some(200),
            succeeded: true,
        });
        summary.record(&ExecutionOutcome {
            statement_index: 1,
            status_code: None,
            succeeded: false,
        });
        assert_eq!(summary, RunSummary { success_count: 1, error_count: 1 });
        assert_eq!(summary.total(), 2);
    }

    #[test]
    fn test_seed_outcome_success() {
        assert!(SeedOutcome::Inserted.succeeded());
        assert!(SeedOutcome::AlreadyPresent.succeeded());
        assert!(!SeedOutcome::Skipped("dependency".into()).succeeded());
    }
}
