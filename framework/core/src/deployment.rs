use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::{DynError, context::Credentials, topology::DeploymentRole};

/// Failure to map a role pattern onto exactly one live service.
///
/// These are environment problems, not transient conditions: the message
/// carries the pattern and the full candidate list so the mismatch can be
/// diagnosed from the test log alone.
#[derive(Clone, Debug, Error)]
pub enum ResolutionError {
    #[error("no service matching pattern `{pattern}` found; available services: [{}]", candidates.join(", "))]
    NotFound {
        pattern: String,
        candidates: Vec<String>,
    },
    #[error("multiple services match pattern `{pattern}`: [{}]", matches.join(", "))]
    Ambiguous {
        pattern: String,
        matches: Vec<String>,
    },
}

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error("deployment {workload} in namespace {namespace} did not become ready within {timeout:?}")]
    Timeout {
        workload: String,
        namespace: String,
        timeout: Duration,
    },
    #[error("cluster api call failed: {source}")]
    Api {
        #[source]
        source: DynError,
    },
    #[error("command execution in instance {instance} failed: {source}")]
    Exec {
        instance: String,
        #[source]
        source: DynError,
    },
}

impl DeploymentError {
    #[must_use]
    pub fn api(source: impl Into<DynError>) -> Self {
        Self::Api {
            source: source.into(),
        }
    }
}

/// Captured output of a command executed inside a running instance.
#[derive(Clone, Debug, Default)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
}

/// One running instance (pod) backing a deployment.
#[async_trait]
pub trait Instance: Send + Sync {
    fn name(&self) -> &str;

    /// Execute a command inside the instance, capturing stdout and stderr
    /// separately. Bounded by the exec channel's own lifecycle.
    async fn run_command(&self, command: &[&str]) -> Result<CommandResult, DeploymentError>;

    async fn logs(&self) -> Result<String, DeploymentError>;
}

/// Runtime handle to one deployed role: its service identity, URLs and
/// instances.
#[async_trait]
pub trait Deployment: Send + Sync {
    fn role(&self) -> DeploymentRole;

    fn namespace(&self) -> &str;

    fn credentials(&self) -> Option<&Credentials>;

    /// Resolve the cluster-visible service name for this role. Resolution
    /// happens once; later calls return the cached name even if the cluster
    /// state has changed underneath (see the resolver docs for the known
    /// rename risk).
    async fn service_name(&self) -> Result<String, DeploymentError>;

    /// Plain-HTTP endpoint for this deployment, if any. Falls back to the
    /// deterministic `{service}-{namespace}{domain-suffix}` host when the
    /// service object does not exist yet, so the URL is always well formed.
    async fn url(&self) -> Result<Option<Url>, DeploymentError>;

    /// HTTPS variant of [`Deployment::url`]; independently optional.
    async fn secure_url(&self) -> Result<Option<Url>, DeploymentError>;

    /// Whether the backing service and workload objects exist. Never errors
    /// for "not created yet".
    async fn is_ready(&self) -> bool;

    /// Request `replicas` instances. Idempotent: re-issuing the current
    /// count is a no-op. Does not block on the rollout.
    async fn scale(&self, replicas: i32) -> Result<(), DeploymentError>;

    /// Block until ready instances match the requested count (hard, bounded
    /// by the pods-ready timeout), then probe the route once pods are up.
    /// The route probe is best-effort: on probe timeout a warning is logged
    /// and the call still succeeds.
    async fn wait_for_scale(&self) -> Result<(), DeploymentError>;

    /// Short bounded wait for the service object to exist, distinct from
    /// full pod readiness.
    async fn wait_for_service(&self, timeout: Duration) -> Result<(), DeploymentError>;

    /// Live instance list, re-queried on every call. Empty while the
    /// service is not yet present.
    async fn instances(&self) -> Result<Vec<Box<dyn Instance>>, DeploymentError>;

    /// Force-delete the named instances; tolerates instances that are
    /// already gone.
    async fn delete_instances(&self, names: &[String]) -> Result<(), DeploymentError>;

    async fn set_router_timeout(&self, timeout: Duration) -> Result<(), DeploymentError>;

    async fn reset_router_timeout(&self) -> Result<(), DeploymentError>;

    async fn set_router_balance(&self, balance: &str) -> Result<(), DeploymentError>;
}
