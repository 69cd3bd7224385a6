//! # Configuration
//!
//! Operator-level settings.
//!
//! - `controller`: requeue timings, workload/init job templates, runtime limits

mod controller;

pub use controller::ControllerConfig;
