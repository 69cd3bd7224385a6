//! # Custom Resource Definitions
//!
//! CRD types for the ECommerceApplication operator.
//!
//! ## Module Structure
//!
//! - `spec.rs` - ECommerceApplication specification

mod spec;

pub use spec::{ECommerceApplication, ECommerceApplicationSpec};
