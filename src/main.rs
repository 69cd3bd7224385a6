//! # ECommerceApplication Operator
//!
//! A Kubernetes operator that provisions everything one tenant's e-commerce
//! application needs from an `ECommerceApplication` resource:
//!
//! 1. **Credential secrets** - projects the Postgres service binding into four
//!    single-value secrets (`postgres.username`, `postgres.password`,
//!    `postgres.certificate-data`, `postgres.url`)
//! 2. **Init job** - ensures the cluster-wide database initialization Job `pg` exists once
//! 3. **Workload** - runs the service catalog Deployment at `spec.size` replicas
//!
//! Configuration comes from environment variables, see
//! [`ControllerConfig`](ecommerce_application_operator::config::ControllerConfig).

use anyhow::Result;
use ecommerce_application_operator::runtime::{initialization::initialize, watch_loop::run_watch_loop};

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;

    run_watch_loop(init.client, init.context, init.config, init.server_state).await;

    Ok(())
}
