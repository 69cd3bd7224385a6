//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ## Usage
//!
//! ```rust
//! use ecommerce_application_operator::prelude::*;
//! ```

// CRD types
pub use crate::crd::*;

// Store capability
pub use crate::controller::store::{KubeStore, ResourceStore, StoredResource};

// Reconciler types
pub use crate::controller::reconcile::{Decision, Phase, Reconciler, RequeueReason};

// Error types
pub use crate::controller::error::{BindingError, ProjectionError, ReconcilerError, StoreError};

// Config types
pub use crate::config::ControllerConfig;
