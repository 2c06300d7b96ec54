//! Schema Bootstrap Library
//!
//! Reconciles an expected relational schema against a database that is only
//! reachable through a row-level HTTP data API: probes which tables exist,
//! renders creation SQL for the missing ones, seeds one sample row per table
//! and replays SQL scripts through a remote execution function.
//!
//! # Modules
//!
//! - `core`: Reconciliation engine (probe, DDL registry, splitter, seeder).
//! - `integrations`: Remote API client.
//! - `classify`: Response classification into error kinds.
//! - `config`: Configuration management.
//! - `ddl`: DDL registry and dependency ordering.
//! - `errors`: Error handling types.
//! - `manifest`: Built-in and file-based expected schema.
//! - `models`: Core data models.
//! - `probe`: Table existence probing.
//! - `reconcile`: Probe, render and seed orchestration.
//! - `report`: Operator-facing summaries.
//! - `rest_client`: Data API client.
//! - `script`: Script file loading.
//! - `seed`: Sample row seeding.
//! - `sql`: Statement splitting and batch execution.

pub mod core;
pub mod integrations;

pub mod classify;
pub mod config;
pub mod ddl;
pub mod errors;
pub mod manifest;
pub mod models;
pub mod probe;
pub mod reconcile;
pub mod report;
pub mod rest_client;
pub mod script;
pub mod seed;
pub mod sql;
