//! # Runtime
//!
//! Hosts the reconciliation loop inside `kube_runtime::Controller`.
//!
//! - `context`: shared controller context and the reconcile adapter
//! - `error_policy`: per-resource Fibonacci backoff on reconciliation errors
//! - `initialization`: rustls, tracing, metrics, probe server and client setup
//! - `watch_loop`: the controller watch itself

mod context;
pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

pub use context::{reconcile, Context};
pub use error_policy::error_policy;
