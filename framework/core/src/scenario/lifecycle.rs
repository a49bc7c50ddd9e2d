use std::sync::Arc;

use futures::future::try_join_all;
use kie_testing_config::timeouts;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{
    DeploymentState,
    listener::{ScenarioListener, ScenarioView},
    registration::{RegistrationError, wait_for_registered_servers},
};
use crate::{
    DynError,
    backend::ScenarioBackend,
    configuration::ScenarioConfiguration,
    context::TestContext,
    deployment::{Deployment, DeploymentError},
    external::{ExternalDependency, ExternalDependencyId},
    topology::{DeploymentRole, TopologyDescriptor},
};

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("scenario cannot be deployed from state {state:?}")]
    InvalidState { state: DeploymentState },
    #[error("failed to create project `{name}`: {source}")]
    ProjectCreate {
        name: String,
        #[source]
        source: DynError,
    },
    #[error("external dependency `{id}` failed during deploy: {source}")]
    Dependency {
        id: ExternalDependencyId,
        #[source]
        source: DynError,
    },
    #[error("failed to submit topology: {source}")]
    TopologySubmit {
        #[source]
        source: DynError,
    },
    #[error("failed to resolve deployment handle for role `{role}`: {source}")]
    HandleResolution {
        role: DeploymentRole,
        #[source]
        source: DynError,
    },
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error("listener `{name}` failed after deploy: {source}")]
    Listener {
        name: String,
        #[source]
        source: DynError,
    },
    #[error("internal invariant violated: {message}")]
    InternalInvariant { message: String },
}

/// One teardown step that failed during a best-effort undeploy.
#[derive(Debug)]
pub struct CleanupFailure {
    pub what: String,
    pub source: DynError,
}

#[derive(Debug, Error)]
#[error("{}", format_failures(failures))]
pub struct UndeployError {
    pub failures: Vec<CleanupFailure>,
}

fn format_failures(failures: &[CleanupFailure]) -> String {
    let details: Vec<String> = failures
        .iter()
        .map(|failure| format!("{}: {}", failure.what, failure.source))
        .collect();
    format!(
        "undeploy finished with {} failure(s): [{}]",
        failures.len(),
        details.join("; ")
    )
}

/// A buildable, deployable combination of roles and auxiliary services
/// representing one test topology. Created by [`super::ScenarioBuilder`];
/// drives the deploy/verify/undeploy lifecycle against the cluster through
/// its backend strategy.
pub struct Scenario<B: ScenarioBackend> {
    context: TestContext,
    backend: Arc<B>,
    descriptor: TopologyDescriptor,
    configuration: ScenarioConfiguration,
    sync_dependencies: Vec<Box<dyn ExternalDependency>>,
    async_dependencies: Vec<Box<dyn ExternalDependency>>,
    listeners: Vec<Box<dyn ScenarioListener>>,
    state: DeploymentState,
    project: Option<B::Project>,
    project_name: Option<String>,
    deployments: Vec<Arc<dyn Deployment>>,
}

impl<B: ScenarioBackend> std::fmt::Debug for Scenario<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario").finish_non_exhaustive()
    }
}

impl<B: ScenarioBackend> Scenario<B> {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        context: TestContext,
        backend: Arc<B>,
        descriptor: TopologyDescriptor,
        configuration: ScenarioConfiguration,
        sync_dependencies: Vec<Box<dyn ExternalDependency>>,
        async_dependencies: Vec<Box<dyn ExternalDependency>>,
        listeners: Vec<Box<dyn ScenarioListener>>,
        state: DeploymentState,
    ) -> Self {
        Self {
            context,
            backend,
            descriptor,
            configuration,
            sync_dependencies,
            async_dependencies,
            listeners,
            state,
            project: None,
            project_name: None,
            deployments: Vec::new(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> DeploymentState {
        self.state
    }

    #[must_use]
    pub const fn descriptor(&self) -> &TopologyDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub const fn configuration(&self) -> &ScenarioConfiguration {
        &self.configuration
    }

    #[must_use]
    pub fn project_name(&self) -> Option<&str> {
        self.project_name.as_deref()
    }

    #[must_use]
    pub fn deployments(&self) -> &[Arc<dyn Deployment>] {
        &self.deployments
    }

    #[must_use]
    pub fn deployment(&self, role: DeploymentRole) -> Option<&Arc<dyn Deployment>> {
        self.deployments
            .iter()
            .find(|deployment| deployment.role() == role)
    }

    /// Live dependency instance for `id`, if one was registered.
    #[must_use]
    pub fn dependency(&self, id: ExternalDependencyId) -> Option<&dyn ExternalDependency> {
        self.sync_dependencies
            .iter()
            .chain(&self.async_dependencies)
            .find(|dependency| dependency.id() == id)
            .map(Box::as_ref)
    }

    /// Run the full deployment lifecycle. On failure the scenario is left in
    /// an indeterminate `Deploying` state; callers are expected to invoke
    /// [`Scenario::undeploy`] regardless of the outcome.
    pub async fn deploy(&mut self) -> Result<(), DeployError> {
        if self.state != DeploymentState::NotDeployed {
            return Err(DeployError::InvalidState { state: self.state });
        }
        self.state = DeploymentState::Deploying;

        let name = self.context.generate_project_name();
        info!(project = %name, backend = self.backend.name(), "deploying scenario");

        let project = self
            .backend
            .create_project(&name, &self.context)
            .await
            .map_err(|source| DeployError::ProjectCreate {
                name: name.clone(),
                source,
            })?;
        self.project = Some(project);
        self.project_name = Some(name.clone());

        // Synchronous dependencies block, in registration order, before the
        // main topology goes out.
        for dependency in &self.sync_dependencies {
            let id = dependency.id();
            info!(dependency = %id, "deploying synchronous dependency");
            dependency
                .deploy(&name)
                .await
                .map_err(|source| DeployError::Dependency { id, source })?;
            dependency
                .wait_until_ready(&name, timeouts::dependency_ready_timeout())
                .await
                .map_err(|source| DeployError::Dependency { id, source })?;
        }

        let mut effective = self.configuration.clone();
        for dependency in self.sync_dependencies.iter().chain(&self.async_dependencies) {
            effective.extend(dependency.configuration_entries(&name));
        }

        let project = self
            .project
            .as_ref()
            .ok_or_else(|| DeployError::InternalInvariant {
                message: "project must exist after successful creation".to_owned(),
            })?;
        self.backend
            .submit_topology(project, &self.descriptor, &effective)
            .await
            .map_err(|source| DeployError::TopologySubmit { source })?;

        let mut deployments: Vec<Arc<dyn Deployment>> = Vec::with_capacity(self.descriptor.len());
        for (role, _spec) in self.descriptor.roles() {
            let deployment = self
                .backend
                .resolve_deployment(project, role, &self.context)
                .await
                .map_err(|source| DeployError::HandleResolution { role, source })?;
            deployments.push(deployment);
        }

        for dependency in &self.async_dependencies {
            let id = dependency.id();
            info!(dependency = %id, "deploying asynchronous dependency");
            dependency
                .deploy(&name)
                .await
                .map_err(|source| DeployError::Dependency { id, source })?;
        }

        // Service objects must exist before the long pod-readiness waits;
        // these short waits are independent and run concurrently. The same
        // bounded existence check covers the asynchronous dependencies.
        let visible = timeouts::service_visible_timeout();
        let handle_visibility = async {
            try_join_all(
                deployments
                    .iter()
                    .map(|deployment| deployment.wait_for_service(visible)),
            )
            .await
            .map_err(DeployError::from)
        };
        let dependency_visibility = async {
            try_join_all(self.async_dependencies.iter().map(|dependency| async {
                dependency
                    .wait_until_visible(&name, visible)
                    .await
                    .map_err(|source| DeployError::Dependency {
                        id: dependency.id(),
                        source,
                    })
            }))
            .await
        };
        tokio::try_join!(handle_visibility, dependency_visibility)?;

        let scale_waits = async {
            try_join_all(
                deployments
                    .iter()
                    .map(|deployment| deployment.wait_for_scale()),
            )
            .await
            .map_err(DeployError::from)
        };
        let dependency_waits = async {
            try_join_all(self.async_dependencies.iter().map(|dependency| async {
                dependency
                    .wait_until_ready(&name, timeouts::dependency_ready_timeout())
                    .await
                    .map_err(|source| DeployError::Dependency {
                        id: dependency.id(),
                        source,
                    })
            }))
            .await
        };
        tokio::try_join!(scale_waits, dependency_waits)?;

        if self.descriptor.contains(DeploymentRole::Workbench)
            && self.descriptor.contains(DeploymentRole::KieServer)
        {
            let console = deployments
                .iter()
                .find(|deployment| deployment.role() == DeploymentRole::Workbench)
                .ok_or_else(|| DeployError::InternalInvariant {
                    message: "workbench handle must exist for a topology containing it".to_owned(),
                })?;
            wait_for_registered_servers(console, 1).await?;
        }

        self.deployments = deployments;

        let view = ScenarioView {
            project_name: &name,
            deployments: &self.deployments,
        };
        for listener in &self.listeners {
            listener
                .after_deploy(view)
                .await
                .map_err(|source| DeployError::Listener {
                    name: listener.name().to_owned(),
                    source,
                })?;
        }

        self.state = DeploymentState::Deployed;
        info!(project = %name, deployments = self.deployments.len(), "scenario deployed");
        Ok(())
    }

    /// Best-effort teardown: every step is attempted even when earlier ones
    /// fail, and all failures are aggregated into the returned error so no
    /// cluster resources leak silently across runs.
    pub async fn undeploy(&mut self) -> Result<(), UndeployError> {
        match self.state {
            DeploymentState::Deployed | DeploymentState::Deploying => {}
            DeploymentState::NotDeployed | DeploymentState::Undeployed => {
                debug!(state = ?self.state, "nothing to undeploy");
                return Ok(());
            }
        }

        // A deploy that failed before project creation left nothing in the
        // cluster; dependencies were never given a namespace to deploy into.
        let Some(name) = self.project_name.clone() else {
            debug!("project was never created; nothing to undeploy");
            self.state = DeploymentState::Undeployed;
            return Ok(());
        };
        info!(project = %name, "undeploying scenario");
        let mut failures = Vec::new();

        let view = ScenarioView {
            project_name: &name,
            deployments: &self.deployments,
        };
        for listener in &self.listeners {
            if let Err(source) = listener.before_undeploy(view).await {
                warn!(listener = listener.name(), error = %source, "listener failed before undeploy");
                failures.push(CleanupFailure {
                    what: format!("listener `{}`", listener.name()),
                    source,
                });
            }
        }

        // Reverse of deploy order: asynchronous dependencies first.
        for dependency in self.async_dependencies.iter().chain(&self.sync_dependencies) {
            if let Err(source) = dependency.undeploy(&name).await {
                warn!(dependency = %dependency.id(), error = %source, "dependency undeploy failed");
                failures.push(CleanupFailure {
                    what: format!("dependency `{}`", dependency.id()),
                    source,
                });
            }
        }

        if let Some(project) = self.project.take() {
            if let Err(source) = self.backend.delete_project(&project).await {
                warn!(project = %name, error = %source, "project deletion failed");
                failures.push(CleanupFailure {
                    what: format!("project `{name}`"),
                    source,
                });
            }
        }

        self.state = DeploymentState::Undeployed;
        if failures.is_empty() {
            info!(project = %name, "scenario undeployed");
            Ok(())
        } else {
            Err(UndeployError { failures })
        }
    }
}
