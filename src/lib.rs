//! ECommerceApplication Operator Library
//!
//! Core functionality of the ECommerceApplication operator. Unit tests live
//! beside the code; `tests/` drives the full reconciliation loop against the
//! in-memory store.
//!
//! ## Quick Start
//!
//! ```rust
//! use ecommerce_application_operator::prelude::*;
//! ```

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod runtime;
