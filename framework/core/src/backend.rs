use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    DynError,
    configuration::ScenarioConfiguration,
    context::TestContext,
    deployment::Deployment,
    topology::{BackendCapabilities, DeploymentRole, TopologyDescriptor},
};

/// Pluggable strategy that turns a topology descriptor into cluster
/// resources and hands back deployment handles.
///
/// A scenario composes exactly one backend; template-based and
/// operator-based provisioning implement the same small surface instead of
/// sharing an inheritance chain.
#[async_trait]
pub trait ScenarioBackend: Send + Sync {
    /// Namespace-scoped state the backend needs across lifecycle calls.
    type Project: Send + Sync;

    fn name(&self) -> &'static str;

    /// Options this backend can express; consulted by the builder so
    /// unsupported permutations fail at configuration time.
    fn capabilities(&self) -> &BackendCapabilities;

    async fn create_project(
        &self,
        name: &str,
        context: &TestContext,
    ) -> Result<Self::Project, DynError>;

    /// Apply the resources that encode the requested topology, using the
    /// frozen configuration as the workload environment.
    async fn submit_topology(
        &self,
        project: &Self::Project,
        descriptor: &TopologyDescriptor,
        configuration: &ScenarioConfiguration,
    ) -> Result<(), DynError>;

    /// Construct the runtime handle for one role of the submitted topology.
    async fn resolve_deployment(
        &self,
        project: &Self::Project,
        role: DeploymentRole,
        context: &TestContext,
    ) -> Result<Arc<dyn Deployment>, DynError>;

    /// Delete the project and everything in it.
    async fn delete_project(&self, project: &Self::Project) -> Result<(), DynError>;
}
