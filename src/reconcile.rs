/// Orchestration of one reconciliation run
///
/// 1. Probe every expected table
/// 2. Render DDL for the missing ones (for the operator, never executed)
/// 3. Seed sample rows into the tables that exist
use crate::ddl::DdlRegistry;
use crate::models::SampleRecord;
use crate::probe::{ProbeReport, Prober};
use crate::rest_client::RestClient;
use crate::seed::{SeedReport, Seeder};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy)]
pub struct ReconcileOptions {
    pub seed: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self { seed: true }
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileReport {
    pub probe: ProbeReport,
    /// DDL per missing table.
    pub missing_ddl: BTreeMap<String, String>,
    /// The same DDL as one script, dependency order.
    pub ddl_script: String,
    /// `None` when seeding was disabled.
    pub seed: Option<SeedReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub struct Reconciler<'a> {
    client: &'a RestClient,
    registry: &'a DdlRegistry,
    samples: &'a BTreeMap<String, SampleRecord>,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        client: &'a RestClient,
        registry: &'a DdlRegistry,
        samples: &'a BTreeMap<String, SampleRecord>,
    ) -> Self {
        Self {
            client,
            registry,
            samples,
        }
    }

    pub async fn run(&self, options: ReconcileOptions) -> ReconcileReport {
        let started_at = Utc::now();
        tracing::info!(
            "Checking {} expected tables",
            self.registry.specs().len()
        );

        let probe = Prober::new(self.client)
            .probe_all(self.registry.specs())
            .await;

        let missing_ddl = self.registry.render_missing(&probe.missing);
        let ddl_script = self.registry.render_script(&probe.missing);
        if !probe.missing.is_empty() {
            tracing::warn!(
                "{} tables missing; creation DDL must be run from the SQL editor",
                probe.missing.len()
            );
        }
        if !probe.errored.is_empty() {
            tracing::warn!(
                "{} tables could not be probed and are excluded from DDL and seeding",
                probe.errored.len()
            );
        }

        let seed = if options.seed {
            tracing::info!("Seeding sample rows into existing tables");
            Some(
                Seeder::new(self.client)
                    .seed(self.registry.specs(), self.samples, &probe.existing)
                    .await,
            )
        } else {
            tracing::info!("Seeding disabled");
            None
        };

        ReconcileReport {
            probe,
            missing_ddl,
            ddl_script,
            seed,
            started_at,
            finished_at: Utc::now(),
        }
    }
}
