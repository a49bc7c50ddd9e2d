use std::{collections::BTreeMap, sync::Arc};

use kie_testing_config::constants::env_keys;
use thiserror::Error;
use tracing::info;

use super::{DeploymentState, Scenario, listener::ScenarioListener};
use crate::{
    DynError,
    backend::ScenarioBackend,
    configuration::ScenarioConfiguration,
    context::TestContext,
    external::{
        ExternalDependency, ExternalDependencyId, ExternalDependencyRegistry,
        ExternalDependencyRequest, SyncMode, UnknownDependency,
    },
    topology::{BackendOption, DeploymentRole, TopologyDescriptor},
};

#[derive(Debug, Error)]
pub enum ScenarioBuildError {
    #[error("option `{option}` is not supported by the `{backend}` backend")]
    UnsupportedOption {
        option: &'static str,
        backend: &'static str,
    },
    #[error("conflicting options: `{second}` cannot be combined with previously selected `{first}`")]
    ConflictingOptions {
        first: &'static str,
        second: &'static str,
    },
    #[error("unknown external dependency id `{id}`")]
    UnknownDependency { id: ExternalDependencyId },
    #[error("external dependency `{id}` failed to initialize: {source}")]
    DependencyInit {
        id: ExternalDependencyId,
        #[source]
        source: DynError,
    },
    #[error("scenario topology contains no roles")]
    EmptyTopology,
}

/// Chainable configuration accumulator for one scenario.
///
/// Setters either insert into the scenario configuration, register an
/// external-dependency request, or flip a flag the orchestrator consumes.
/// Capability-gated and mutually-exclusive setters are fallible so misuse
/// surfaces at the call site, never at deploy time. `build()` performs no
/// I/O.
pub struct ScenarioBuilder<B: ScenarioBackend> {
    context: TestContext,
    backend: Arc<B>,
    registry: Arc<ExternalDependencyRegistry>,
    descriptor: TopologyDescriptor,
    configuration: ScenarioConfiguration,
    requests: Vec<ExternalDependencyRequest>,
    listeners: Vec<Box<dyn ScenarioListener>>,
    maven_repository_choice: Option<&'static str>,
    database_choice: Option<&'static str>,
}

impl<B: ScenarioBackend> std::fmt::Debug for ScenarioBuilder<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioBuilder").finish_non_exhaustive()
    }
}

impl<B: ScenarioBackend> ScenarioBuilder<B> {
    #[must_use]
    pub fn new(
        context: TestContext,
        backend: Arc<B>,
        registry: Arc<ExternalDependencyRegistry>,
    ) -> Self {
        let mut configuration = ScenarioConfiguration::new();
        let credentials = context.app_credentials();
        configuration.set(env_keys::KIE_ADMIN_USER, &credentials.username);
        configuration.set(env_keys::KIE_ADMIN_PWD, &credentials.password);

        Self {
            context,
            backend,
            registry,
            descriptor: TopologyDescriptor::new(),
            configuration,
            requests: Vec::new(),
            listeners: Vec::new(),
            maven_repository_choice: None,
            database_choice: None,
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: DeploymentRole) -> Self {
        self.descriptor.add_role(role);
        self
    }

    #[must_use]
    pub fn with_workbench(self) -> Self {
        self.with_role(DeploymentRole::Workbench)
    }

    #[must_use]
    pub fn with_kie_server(self) -> Self {
        self.with_role(DeploymentRole::KieServer)
    }

    #[must_use]
    pub fn with_kie_server_replicas(mut self, replicas: i32) -> Self {
        self.descriptor
            .set_replicas(DeploymentRole::KieServer, replicas);
        self
    }

    #[must_use]
    pub fn with_smart_router(mut self) -> Self {
        self.descriptor.add_role(DeploymentRole::SmartRouter);
        self.configuration
            .set(env_keys::KIE_SERVER_ROUTER_SERVICE, "smart-router");
        self
    }

    /// Insert an arbitrary environment entry into the workload
    /// configuration. Last write wins.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.configuration.set(key, value);
        self
    }

    #[must_use]
    pub fn with_kie_server_id(mut self, id: impl Into<String>) -> Self {
        self.configuration.set(env_keys::KIE_SERVER_ID, id);
        self
    }

    /// Deploy a maven repository next to the scenario and wire the workloads
    /// to it. Synchronous: the repository must be serving before the main
    /// topology is submitted.
    pub fn with_internal_maven_repository(mut self) -> Result<Self, ScenarioBuildError> {
        self.choose_maven_repository("with_internal_maven_repository")?;
        self.requests.push(ExternalDependencyRequest::new(
            ExternalDependencyId::MavenRepository,
            SyncMode::Synchronous,
        ));
        Ok(self)
    }

    /// Point the workloads at an already-running maven repository.
    pub fn with_external_maven_repository(
        mut self,
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ScenarioBuildError> {
        self.choose_maven_repository("with_external_maven_repository")?;
        self.configuration.set(env_keys::MAVEN_REPO_URL, url);
        self.configuration
            .set(env_keys::MAVEN_REPO_USERNAME, username);
        self.configuration
            .set(env_keys::MAVEN_REPO_PASSWORD, password);
        Ok(self)
    }

    /// Add a database role managed as part of the topology.
    pub fn with_internal_database(mut self) -> Result<Self, ScenarioBuildError> {
        self.choose_database("with_internal_database")?;
        self.descriptor.add_role(DeploymentRole::Database);
        Ok(self)
    }

    /// Point the execution servers at a database outside the cluster.
    pub fn with_external_database(
        mut self,
        driver: impl Into<String>,
        url: impl Into<String>,
    ) -> Result<Self, ScenarioBuildError> {
        self.ensure_supported(BackendOption::ExternalDatabase, "with_external_database")?;
        self.choose_database("with_external_database")?;
        self.configuration.set(env_keys::EXTERNAL_DB_DRIVER, driver);
        self.configuration.set(env_keys::EXTERNAL_DB_URL, url);
        Ok(self)
    }

    /// Deploy an LDAP directory next to the scenario; its bind settings are
    /// contributed by the dependency once the namespace is known.
    #[must_use]
    pub fn with_ldap(mut self) -> Self {
        self.requests.push(ExternalDependencyRequest::new(
            ExternalDependencyId::Ldap,
            SyncMode::Synchronous,
        ));
        self
    }

    pub fn with_ldap_role_mapping(
        mut self,
        properties: impl Into<String>,
    ) -> Result<Self, ScenarioBuildError> {
        self.ensure_supported(BackendOption::LdapRoleMapping, "with_ldap_role_mapping")?;
        self.configuration
            .set(env_keys::AUTH_ROLE_MAPPER_ROLES_PROPERTIES, properties);
        Ok(self)
    }

    /// Deploy an SSO identity broker alongside the scenario. Asynchronous:
    /// only submission is ordered before the main topology, readiness is
    /// awaited together with the main workloads.
    pub fn with_sso(mut self, realm: impl Into<String>) -> Result<Self, ScenarioBuildError> {
        self.ensure_supported(BackendOption::SsoDeployment, "with_sso")?;
        self.configuration.set(env_keys::SSO_REALM, realm);
        self.requests.push(ExternalDependencyRequest::new(
            ExternalDependencyId::Sso,
            SyncMode::Asynchronous,
        ));
        Ok(self)
    }

    /// Register an arbitrary dependency request; escape hatch for
    /// permutations without a dedicated setter.
    #[must_use]
    pub fn with_external_dependency(
        mut self,
        id: ExternalDependencyId,
        mode: SyncMode,
        config: BTreeMap<String, String>,
    ) -> Self {
        self.requests
            .push(ExternalDependencyRequest::new(id, mode).with_config(config));
        self
    }

    #[must_use]
    pub fn with_listener<L>(mut self, listener: L) -> Self
    where
        L: ScenarioListener + 'static,
    {
        self.listeners.push(Box::new(listener));
        self
    }

    /// Freeze the configuration and construct the not-yet-deployed
    /// scenario. Dependency requests are resolved here so unknown ids fail
    /// fast; no cluster I/O happens.
    pub fn build(self) -> Result<Scenario<B>, ScenarioBuildError> {
        if self.descriptor.is_empty() {
            return Err(ScenarioBuildError::EmptyTopology);
        }

        let mut synchronous: Vec<Box<dyn ExternalDependency>> = Vec::new();
        let mut asynchronous: Vec<Box<dyn ExternalDependency>> = Vec::new();
        for request in &self.requests {
            let dependency = self
                .registry
                .resolve(request)
                .map_err(|source| map_resolution_failure(request.id, source))?;
            match request.mode {
                SyncMode::Synchronous => synchronous.push(dependency),
                SyncMode::Asynchronous => asynchronous.push(dependency),
            }
        }

        info!(
            backend = self.backend.name(),
            roles = self.descriptor.len(),
            env_entries = self.configuration.len(),
            sync_dependencies = synchronous.len(),
            async_dependencies = asynchronous.len(),
            "scenario built"
        );

        Ok(Scenario::new(
            self.context,
            self.backend,
            self.descriptor,
            self.configuration,
            synchronous,
            asynchronous,
            self.listeners,
            DeploymentState::NotDeployed,
        ))
    }

    fn ensure_supported(
        &self,
        option: BackendOption,
        call: &'static str,
    ) -> Result<(), ScenarioBuildError> {
        if self.backend.capabilities().supports(option) {
            Ok(())
        } else {
            Err(ScenarioBuildError::UnsupportedOption {
                option: call,
                backend: self.backend.name(),
            })
        }
    }

    fn choose_maven_repository(&mut self, option: &'static str) -> Result<(), ScenarioBuildError> {
        match self.maven_repository_choice {
            Some(first) if first != option => Err(ScenarioBuildError::ConflictingOptions {
                first,
                second: option,
            }),
            _ => {
                self.maven_repository_choice = Some(option);
                Ok(())
            }
        }
    }

    fn choose_database(&mut self, option: &'static str) -> Result<(), ScenarioBuildError> {
        match self.database_choice {
            Some(first) if first != option => Err(ScenarioBuildError::ConflictingOptions {
                first,
                second: option,
            }),
            _ => {
                self.database_choice = Some(option);
                Ok(())
            }
        }
    }
}

fn map_resolution_failure(id: ExternalDependencyId, source: DynError) -> ScenarioBuildError {
    if source.downcast_ref::<UnknownDependency>().is_some() {
        ScenarioBuildError::UnknownDependency { id }
    } else {
        ScenarioBuildError::DependencyInit { id, source }
    }
}
