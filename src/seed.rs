use crate::classify::{classify, excerpt, Operation};
use crate::errors::ErrorKind;
use crate::models::{SampleRecord, SeedOutcome, TableSpec};
use crate::rest_client::RestClient;
use std::collections::{BTreeMap, BTreeSet};

/// Per-table seeding results, keyed by table name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeedReport {
    pub outcomes: BTreeMap<String, SeedOutcome>,
}

impl SeedReport {
    /// `table -> succeeded`, conflicts counted as success.
    pub fn success_map(&self) -> BTreeMap<String, bool> {
        self.outcomes
            .iter()
            .map(|(table, outcome)| (table.clone(), outcome.succeeded()))
            .collect()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.values().filter(|o| o.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Inserts one sample row per table, dependencies first.
pub struct Seeder<'a> {
    client: &'a RestClient,
}

impl<'a> Seeder<'a> {
    pub fn new(client: &'a RestClient) -> Self {
        Self { client }
    }

    /// Seeds `samples` into the tables of `specs`.
    ///
    /// `specs` must already be in dependency order. `existing` is the set of
    /// tables the probe found present. A table is attempted only when it is
    /// present and each dependency is present and, if it has a sample row,
    /// was seeded successfully. Tables without a sample row are not reported.
    pub async fn seed(
        &self,
        specs: &[TableSpec],
        samples: &BTreeMap<String, SampleRecord>,
        existing: &BTreeSet<String>,
    ) -> SeedReport {
        let mut report = SeedReport::default();
        // Tables later rows may reference.
        let mut satisfied: BTreeSet<&str> = BTreeSet::new();

        for spec in specs {
            let table = spec.name.as_str();
            let unmet: Vec<&str> = spec
                .dependencies
                .iter()
                .map(String::as_str)
                .filter(|dep| !satisfied.contains(dep))
                .collect();

            let Some(sample) = samples.get(table) else {
                if existing.contains(table) && unmet.is_empty() {
                    satisfied.insert(table);
                }
                continue;
            };

            let outcome = if !existing.contains(table) {
                SeedOutcome::Skipped("table not present".to_string())
            } else if !unmet.is_empty() {
                SeedOutcome::Skipped(format!("unsatisfied dependencies: {}", unmet.join(", ")))
            } else {
                self.insert(table, sample).await
            };

            match &outcome {
                SeedOutcome::Inserted => tracing::info!("✓ Seeded {}", table),
                SeedOutcome::AlreadyPresent => {
                    tracing::info!("✓ {} sample row already present", table)
                }
                SeedOutcome::Skipped(reason) => tracing::warn!("Skipping {}: {}", table, reason),
                SeedOutcome::Failed { kind, detail } => {
                    tracing::warn!("✗ Seeding {} failed ({}): {}", table, kind, detail)
                }
            }

            if outcome.succeeded() {
                satisfied.insert(table);
            }
            report.outcomes.insert(table.to_string(), outcome);
        }

        tracing::info!(
            "Seeding complete: {} succeeded, {} failed",
            report.succeeded(),
            report.failed()
        );
        report
    }

    async fn insert(&self, table: &str, sample: &SampleRecord) -> SeedOutcome {
        let response = match self.client.insert(table, &sample.to_json()).await {
            Ok(response) => response,
            Err(e) => {
                return SeedOutcome::Failed {
                    kind: ErrorKind::Transient,
                    detail: e.to_string(),
                }
            }
        };

        match classify(Operation::Insert, response.status, &response.body) {
            Ok(()) => SeedOutcome::Inserted,
            Err(ErrorKind::Conflict) => SeedOutcome::AlreadyPresent,
            Err(kind) => SeedOutcome::Failed {
                kind,
                detail: format!("HTTP {}: {}", response.status, excerpt(&response.body)),
            },
        }
    }
}
