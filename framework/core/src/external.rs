use std::{collections::BTreeMap, fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use kie_testing_config::timeouts;
use thiserror::Error;
use tokio::time::sleep;
use tracing::debug;

use crate::DynError;

/// Closed set of auxiliary deployments a scenario can request.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum ExternalDependencyId {
    MavenRepository,
    Ldap,
    Database,
    Sso,
}

impl ExternalDependencyId {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::MavenRepository => "maven-repository",
            Self::Ldap => "ldap",
            Self::Database => "database",
            Self::Sso => "sso",
        }
    }
}

impl fmt::Display for ExternalDependencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether the orchestrator blocks for this dependency's readiness before
/// submitting the main topology, or only later alongside the main readiness
/// wait.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SyncMode {
    Synchronous,
    Asynchronous,
}

/// Builder-time registration of an auxiliary deployment. Consumed exactly
/// once when the registry resolves it into a live instance; teardown is
/// driven by the live instance, never by the request.
#[derive(Clone, Debug)]
pub struct ExternalDependencyRequest {
    pub id: ExternalDependencyId,
    pub mode: SyncMode,
    pub config: BTreeMap<String, String>,
}

impl ExternalDependencyRequest {
    #[must_use]
    pub fn new(id: ExternalDependencyId, mode: SyncMode) -> Self {
        Self {
            id,
            mode,
            config: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: BTreeMap<String, String>) -> Self {
        self.config = config;
        self
    }
}

#[derive(Clone, Copy, Debug, Error)]
#[error("external dependency `{id}` did not become ready within {timeout:?}")]
pub struct DependencyTimeout {
    pub id: ExternalDependencyId,
    pub timeout: Duration,
}

/// Live auxiliary deployment deployable independently of the main topology.
#[async_trait]
pub trait ExternalDependency: Send + Sync {
    fn id(&self) -> ExternalDependencyId;

    /// Environment entries this dependency contributes to the workload
    /// configuration (repository URLs, bind DNs, ...). Merged into the
    /// scenario configuration before the topology is submitted.
    fn configuration_entries(&self, namespace: &str) -> BTreeMap<String, String> {
        let _ = namespace;
        BTreeMap::new()
    }

    async fn deploy(&self, namespace: &str) -> Result<(), DynError>;

    async fn is_ready(&self, namespace: &str) -> Result<bool, DynError>;

    /// Whether the dependency's service object exists yet, distinct from
    /// full readiness. Defaults to the readiness check for dependencies
    /// without a cheaper existence probe.
    async fn is_visible(&self, namespace: &str) -> Result<bool, DynError> {
        self.is_ready(namespace).await
    }

    async fn undeploy(&self, namespace: &str) -> Result<(), DynError>;

    /// Poll [`ExternalDependency::is_ready`] until it reports true or the
    /// bound elapses.
    async fn wait_until_ready(&self, namespace: &str, timeout: Duration) -> Result<(), DynError> {
        let interval = timeouts::poll_interval();
        let mut elapsed = Duration::ZERO;

        while elapsed <= timeout {
            if self.is_ready(namespace).await? {
                debug!(dependency = %self.id(), namespace, "external dependency ready");
                return Ok(());
            }
            sleep(interval).await;
            elapsed += interval;
        }

        Err(DependencyTimeout {
            id: self.id(),
            timeout,
        }
        .into())
    }

    /// Short bounded wait for [`ExternalDependency::is_visible`]; the full
    /// readiness wait comes later, together with the main workloads.
    async fn wait_until_visible(&self, namespace: &str, timeout: Duration) -> Result<(), DynError> {
        let interval = timeouts::poll_interval();
        let mut elapsed = Duration::ZERO;

        while elapsed <= timeout {
            if self.is_visible(namespace).await? {
                debug!(dependency = %self.id(), namespace, "external dependency visible");
                return Ok(());
            }
            sleep(interval).await;
            elapsed += interval;
        }

        Err(DependencyTimeout {
            id: self.id(),
            timeout,
        }
        .into())
    }
}

impl std::fmt::Debug for dyn ExternalDependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalDependency")
            .field("id", &self.id())
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug, Error)]
#[error("no factory registered for external dependency `{id}`")]
pub struct UnknownDependency {
    pub id: ExternalDependencyId,
}

type DependencyFactory = Arc<
    dyn Fn(&BTreeMap<String, String>) -> Result<Box<dyn ExternalDependency>, DynError>
        + Send
        + Sync,
>;

/// Maps dependency ids to factories able to construct live instances from a
/// configuration sub-map. Read-only after construction and safe for
/// concurrent resolution.
#[derive(Clone, Default)]
pub struct ExternalDependencyRegistry {
    factories: BTreeMap<ExternalDependencyId, DependencyFactory>,
}

impl ExternalDependencyRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_factory<F>(mut self, id: ExternalDependencyId, factory: F) -> Self
    where
        F: Fn(&BTreeMap<String, String>) -> Result<Box<dyn ExternalDependency>, DynError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(id, Arc::new(factory));
        self
    }

    /// Resolve a request into a live (not yet deployed) dependency instance.
    /// Unknown ids fail here, before any deploy work starts.
    pub fn resolve(
        &self,
        request: &ExternalDependencyRequest,
    ) -> Result<Box<dyn ExternalDependency>, DynError> {
        let factory = self
            .factories
            .get(&request.id)
            .ok_or(UnknownDependency { id: request.id })?;
        factory(&request.config)
    }

    #[must_use]
    pub fn knows(&self, id: ExternalDependencyId) -> bool {
        self.factories.contains_key(&id)
    }
}

impl fmt::Debug for ExternalDependencyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalDependencyRegistry")
            .field("ids", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
