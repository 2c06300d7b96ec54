use crate::classify::{classify, excerpt, Operation};
use crate::errors::ErrorKind;
use crate::models::{ProbeResult, ProbeStatus, TableSpec};
use crate::rest_client::RestClient;
use std::collections::BTreeSet;

/// Partition of the expected tables by probe status.
///
/// The three sets are disjoint and together cover every probed table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeReport {
    pub existing: BTreeSet<String>,
    pub missing: BTreeSet<String>,
    pub errored: BTreeSet<String>,
    /// Every individual result, in probe order.
    pub results: Vec<ProbeResult>,
}

impl ProbeReport {
    pub(crate) fn record(&mut self, result: ProbeResult) {
        let bucket = match result.status {
            ProbeStatus::Present => &mut self.existing,
            ProbeStatus::Missing => &mut self.missing,
            ProbeStatus::TransientError => &mut self.errored,
        };
        bucket.insert(result.table.clone());
        self.results.push(result);
    }
}

/// Maps a probe response onto a [`ProbeStatus`].
pub(crate) fn probe_status(status: u16, body: &str) -> ProbeStatus {
    match classify(Operation::Probe, status, body) {
        Ok(()) => ProbeStatus::Present,
        Err(ErrorKind::Missing) => ProbeStatus::Missing,
        Err(_) => ProbeStatus::TransientError,
    }
}

/// Infers table existence from a one-row read.
pub struct Prober<'a> {
    client: &'a RestClient,
}

impl<'a> Prober<'a> {
    pub fn new(client: &'a RestClient) -> Self {
        Self { client }
    }

    /// Probes one table, projecting only `key_column`.
    ///
    /// Never fails: transport errors become [`ProbeStatus::TransientError`].
    pub async fn probe(&self, table: &str, key_column: &str) -> ProbeResult {
        match self.client.select_one(table, key_column).await {
            Ok(response) => {
                let status = probe_status(response.status, &response.body);
                match status {
                    ProbeStatus::Present => tracing::info!("✓ {} exists", table),
                    ProbeStatus::Missing => tracing::warn!("✗ {} is missing", table),
                    ProbeStatus::TransientError => tracing::warn!(
                        "? {} could not be probed (HTTP {}): {}",
                        table,
                        response.status,
                        excerpt(&response.body)
                    ),
                }
                ProbeResult {
                    table: table.to_string(),
                    status,
                    raw_detail: format!("HTTP {}: {}", response.status, excerpt(&response.body)),
                }
            }
            Err(e) => {
                tracing::error!("Probe of {} failed: {}", table, e);
                ProbeResult {
                    table: table.to_string(),
                    status: ProbeStatus::TransientError,
                    raw_detail: e.to_string(),
                }
            }
        }
    }

    /// Probes every spec in order, one request at a time.
    pub async fn probe_all(&self, specs: &[TableSpec]) -> ProbeReport {
        let mut report = ProbeReport::default();
        for spec in specs {
            let result = self.probe(&spec.name, &spec.key_column).await;
            report.record(result);
        }
        tracing::info!(
            "Probe complete: {} existing, {} missing, {} errored",
            report.existing.len(),
            report.missing.len(),
            report.errored.len()
        );
        report
    }
}
