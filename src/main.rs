use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use schema_bootstrap::config::Config;
use schema_bootstrap::manifest::Manifest;
use schema_bootstrap::models::RunSummary;
use schema_bootstrap::reconcile::{ReconcileOptions, Reconciler};
use schema_bootstrap::report::ExecReport;
use schema_bootstrap::rest_client::RestClient;
use schema_bootstrap::script::ScriptFile;
use schema_bootstrap::sql::{split_with, BatchExecutor, SplitMode};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "schema-bootstrap", version)]
#[command(about = "Check, seed and patch a database schema through its HTTP data API")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Probe expected tables, print DDL for missing ones and seed sample rows
    Reconcile {
        /// JSON manifest replacing the built-in schema
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Only probe and render DDL
        #[arg(long)]
        skip_seed: bool,

        /// Also write the missing-table DDL to this file
        #[arg(long)]
        ddl_out: Option<PathBuf>,
    },
    /// Replay a SQL script statement by statement through the exec RPC
    Exec {
        /// Path to the script file
        script: PathBuf,

        /// Do not split on terminators inside quotes, dollar bodies or comments
        #[arg(long)]
        quote_aware: bool,

        /// Print the statements without executing them
        #[arg(long)]
        dry_run: bool,
    },
    /// Print registered creation SQL, dependencies first
    Ddl {
        /// JSON manifest replacing the built-in schema
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Tables to print (default: all)
        tables: Vec<String>,
    },
}

/// Main entry point.
///
/// Initializes tracing, then dispatches the subcommand. Remote failures are
/// reported in the printed summary; only local input and configuration
/// problems end the process with an error.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr, reports to stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "schema_bootstrap=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Reconcile {
            manifest,
            skip_seed,
            ddl_out,
        } => reconcile(manifest, skip_seed, ddl_out).await,
        Command::Exec {
            script,
            quote_aware,
            dry_run,
        } => exec(script, quote_aware, dry_run).await,
        Command::Ddl { manifest, tables } => ddl(manifest, tables),
    }
}

async fn reconcile(
    manifest: Option<PathBuf>,
    skip_seed: bool,
    ddl_out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let (registry, samples) = Manifest::load(manifest.as_deref())?.into_parts()?;
    let client = RestClient::new(&config)?;

    tracing::info!("🚀 Starting schema reconciliation against {}", config.base_url);
    let report = Reconciler::new(&client, &registry, &samples)
        .run(ReconcileOptions { seed: !skip_seed })
        .await;

    if let Some(path) = ddl_out {
        if report.ddl_script.is_empty() {
            tracing::info!("No missing tables; {} not written", path.display());
        } else {
            std::fs::write(&path, &report.ddl_script)
                .with_context(|| format!("writing DDL to {}", path.display()))?;
            tracing::info!("Missing-table DDL written to {}", path.display());
        }
    }

    println!("{}", report);
    Ok(())
}

async fn exec(script: PathBuf, quote_aware: bool, dry_run: bool) -> anyhow::Result<()> {
    let script = ScriptFile::read(&script)?;
    let mode = if quote_aware {
        SplitMode::QuoteAware
    } else {
        SplitMode::Lexical
    };
    let statements = split_with(mode, &script.contents);

    if dry_run {
        for (i, statement) in statements.iter().enumerate() {
            println!("-- [{}/{}]\n{};\n", i + 1, statements.len(), statement);
        }
        return Ok(());
    }

    let config = Config::from_env()?;
    let client = RestClient::new(&config)?;

    tracing::info!("🚀 Executing {} via rpc/{}", script.path.display(), config.exec_function);
    let started_at = Utc::now();
    let executor = BatchExecutor::new(&client).with_mode(mode);
    let (summary, rpc_unavailable) = match executor.preflight().await {
        Ok(()) => (executor.run(&script.contents).await, None),
        Err(e) => (RunSummary::default(), Some(e.to_string())),
    };

    let report = ExecReport {
        script,
        statements: statements.len(),
        rpc_unavailable,
        summary,
        started_at,
        finished_at: Utc::now(),
    };
    println!("{}", report);
    Ok(())
}

fn ddl(manifest: Option<PathBuf>, tables: Vec<String>) -> anyhow::Result<()> {
    let (registry, _) = Manifest::load(manifest.as_deref())?.into_parts()?;

    let wanted: BTreeSet<String> = if tables.is_empty() {
        registry.table_names().into_iter().collect()
    } else {
        for table in &tables {
            registry.render(table)?;
        }
        tables.into_iter().collect()
    };

    print!("{}", registry.render_script(&wanted));
    Ok(())
}
