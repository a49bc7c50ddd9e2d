use std::sync::Arc;

use async_trait::async_trait;
use kube::{Api, Client, api::PostParams};
use kie_testing_core::{
    DynError,
    backend::ScenarioBackend,
    configuration::ScenarioConfiguration,
    context::TestContext,
    deployment::Deployment,
    topology::{BackendCapabilities, BackendOption, DeploymentRole, TopologyDescriptor},
};
use tracing::info;

use super::{image_for, port_for, workload_name};
use crate::{
    deployment::KubeDeployment,
    manifests,
    project::{self, KubeProject},
};

/// Renders one plain Deployment/Service/Ingress set per role.
///
/// No operator is involved, so options that need operator-side rendering
/// (SSO brokering, external database wiring) are not available; LDAP role
/// mapping is plain container configuration and works here too.
pub struct TemplateBackend {
    client: Client,
    capabilities: BackendCapabilities,
}

impl TemplateBackend {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            capabilities: BackendCapabilities::of([BackendOption::LdapRoleMapping]),
        }
    }
}

#[async_trait]
impl ScenarioBackend for TemplateBackend {
    type Project = KubeProject;

    fn name(&self) -> &'static str {
        "template"
    }

    fn capabilities(&self) -> &BackendCapabilities {
        &self.capabilities
    }

    async fn create_project(
        &self,
        name: &str,
        context: &TestContext,
    ) -> Result<Self::Project, DynError> {
        Ok(project::create_project(&self.client, name, context).await?)
    }

    async fn submit_topology(
        &self,
        project: &Self::Project,
        descriptor: &TopologyDescriptor,
        configuration: &ScenarioConfiguration,
    ) -> Result<(), DynError> {
        let namespace = project.name();
        let params = PostParams::default();
        let env: Vec<(String, String)> = configuration
            .entries()
            .map(|(key, value)| (key.to_owned(), value.to_owned()))
            .collect();

        for (role, spec) in descriptor.roles() {
            let name = workload_name(namespace, role);
            let port = port_for(role);
            info!(namespace, workload = %name, replicas = spec.replicas, "rendering workload");

            let workload = manifests::deployment(
                namespace,
                &name,
                role.label(),
                &image_for(role),
                port,
                spec.replicas,
                manifests::env_vars(env.iter().cloned()),
            );
            Api::namespaced(self.client.clone(), namespace)
                .create(&params, &workload)
                .await?;

            let service = manifests::service(namespace, &name, role.label(), port);
            Api::namespaced(self.client.clone(), namespace)
                .create(&params, &service)
                .await?;

            // The database is cluster-internal only.
            if role != DeploymentRole::Database {
                let host = format!("{name}-{namespace}{}", project.domain_suffix());
                let ingress = manifests::ingress(namespace, &name, role.label(), &host, port);
                Api::namespaced(self.client.clone(), namespace)
                    .create(&params, &ingress)
                    .await?;
            }
        }
        Ok(())
    }

    async fn resolve_deployment(
        &self,
        project: &Self::Project,
        role: DeploymentRole,
        context: &TestContext,
    ) -> Result<Arc<dyn Deployment>, DynError> {
        Ok(Arc::new(KubeDeployment::new(
            self.client.clone(),
            role,
            project.name(),
            project.domain_suffix(),
            Some(context.app_credentials().clone()),
        )))
    }

    async fn delete_project(&self, project: &Self::Project) -> Result<(), DynError> {
        Ok(project::delete_project(&self.client, project).await?)
    }
}
