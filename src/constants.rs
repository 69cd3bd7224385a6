//! # Constants
//!
//! Shared constants used throughout the operator.
//!
//! Resource names and keys are fixed by the applications that consume the
//! projected credentials. Timing values are defaults and can be overridden via
//! environment variables (see [`crate::config::ControllerConfig`]).

/// Field manager name used for every write made by the operator
pub const FIELD_MANAGER: &str = "ecommerce-application-operator";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Requeue delay while the credential source secret does not exist yet (seconds)
pub const DEFAULT_CREDENTIAL_WAIT_REQUEUE_SECS: u64 = 300;

/// Requeue delay after the workload replica count was corrected (seconds)
pub const DEFAULT_REPLICA_DRIFT_REQUEUE_SECS: u64 = 60;

/// Requeue delay right after the workload was created (seconds)
pub const DEFAULT_WORKLOAD_CREATED_REQUEUE_SECS: u64 = 1;

/// Error backoff lower bound (seconds)
pub const DEFAULT_ERROR_BACKOFF_MIN_SECS: u64 = 5;

/// Error backoff upper bound (seconds)
pub const DEFAULT_ERROR_BACKOFF_MAX_SECS: u64 = 300;

/// Default bound on concurrently running reconciliations
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;

/// Data key holding the JSON credential bundle inside the credential source secret
pub const BINDING_PAYLOAD_KEY: &str = "connection";

/// Projected secret holding the database user name
pub const USERNAME_SECRET_NAME: &str = "postgres.username";
/// Projected secret holding the database password
pub const PASSWORD_SECRET_NAME: &str = "postgres.password";
/// Projected secret holding the decoded CA certificate
pub const CERTIFICATE_SECRET_NAME: &str = "postgres.certificate-data";
/// Projected secret holding the JDBC connection URL
pub const URL_SECRET_NAME: &str = "postgres.url";

pub const USERNAME_SECRET_KEY: &str = "POSTGRES_USERNAME";
pub const PASSWORD_SECRET_KEY: &str = "POSTGRES_PASSWORD";
pub const CERTIFICATE_SECRET_KEY: &str = "POSTGRES_CERTIFICATE_DATA";
pub const URL_SECRET_KEY: &str = "POSTGRES_URL";

/// Query string appended to every JDBC URL; the certificate path matches the
/// mount point used by the service pods
pub const JDBC_URL_QUERY: &str = "?sslmode=verify-full&sslrootcert=/cloud-postgres-cert";

/// Name of the cluster-wide database initialization job
pub const INIT_JOB_NAME: &str = "pg";

/// Namespace the initialization job lives in unless overridden
pub const DEFAULT_INIT_JOB_NAMESPACE: &str = "default";

/// Default image of the initialization job container
pub const DEFAULT_INIT_JOB_IMAGE: &str = "bash";

/// Shell command run by the initialization job
pub const INIT_JOB_COMMAND: [&str; 3] = [
    "/bin/sh",
    "-c",
    "date; echo Hello from the Kubernetes cluster",
];

/// Annotation carrying the content hash of the last requested init job spec
pub const INIT_TOKEN_ANNOTATION: &str = "cache.saas.ecommerce.sample.com/init-token";

/// Default workload image
pub const DEFAULT_WORKLOAD_IMAGE: &str = "quay.io/nheidloff/service-catalog:latest";

/// Name of the single workload container and its port
pub const WORKLOAD_CONTAINER_NAME: &str = "service-catalog";

/// Default workload container port
pub const DEFAULT_WORKLOAD_CONTAINER_PORT: i32 = 8081;

/// Base label shared by every workload the operator creates
pub const WORKLOAD_APP_LABEL: &str = "memcached";

/// Label key carrying the owning application name
pub const WORKLOAD_OWNER_LABEL: &str = "memcached_cr";

/// `app.kubernetes.io/managed-by` value stamped on every derived resource
pub const MANAGED_BY_LABEL_VALUE: &str = "ecommerce-application-operator";
