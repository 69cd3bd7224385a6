//! # Controller
//!
//! Core controller modules for the ECommerceApplication operator.
//!
//! - `backoff`: Fibonacci backoff mechanism for retries
//! - `binding`: credential bundle parsing
//! - `error`: error taxonomy
//! - `init_job`: cluster-wide initialization Job
//! - `projection`: credential secret projection
//! - `reconcile`: the reconciliation loop
//! - `server`: HTTP server for metrics and health checks
//! - `store`: resource store capability
//! - `upsert`: create-or-overwrite helper
//! - `workload`: application Deployment

pub mod backoff;
pub mod binding;
pub mod error;
pub mod init_job;
pub mod projection;
pub mod reconcile;
pub mod server;
pub mod store;
pub mod upsert;
pub mod workload;
