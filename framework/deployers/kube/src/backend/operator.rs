use std::sync::Arc;

use async_trait::async_trait;
use kube::{
    Api, Client,
    api::{ApiResource, DynamicObject, GroupVersionKind, PostParams},
};
use kie_testing_core::{
    DynError,
    backend::ScenarioBackend,
    configuration::ScenarioConfiguration,
    context::TestContext,
    deployment::Deployment,
    topology::{BackendCapabilities, DeploymentRole, TopologyDescriptor},
};
use serde_json::{Value, json};
use tracing::info;

use crate::{
    deployment::KubeDeployment,
    project::{self, KubeProject},
};

const KIEAPP_GROUP: &str = "app.kiegroup.org";
const KIEAPP_VERSION: &str = "v2";
const KIEAPP_KIND: &str = "KieApp";

/// Submits a single `KieApp` custom resource; the KIE operator expands it
/// into the per-role workloads, services and routes. The operator renders
/// SSO brokering and external-database wiring itself, so every builder
/// option is available here.
pub struct OperatorBackend {
    client: Client,
    capabilities: BackendCapabilities,
}

impl OperatorBackend {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            capabilities: BackendCapabilities::all(),
        }
    }

    fn kieapp_api(&self, namespace: &str) -> Api<DynamicObject> {
        let gvk = GroupVersionKind::gvk(KIEAPP_GROUP, KIEAPP_VERSION, KIEAPP_KIND);
        Api::namespaced_with(
            self.client.clone(),
            namespace,
            &ApiResource::from_gvk(&gvk),
        )
    }
}

/// The operator environment: authoring when a console is present, otherwise
/// a headless production setup.
fn environment_for(descriptor: &TopologyDescriptor) -> &'static str {
    if descriptor.contains(DeploymentRole::Workbench) {
        "rhpam-authoring"
    } else {
        "rhpam-production-immutable"
    }
}

fn env_json(configuration: &ScenarioConfiguration) -> Vec<Value> {
    configuration
        .entries()
        .map(|(name, value)| json!({"name": name, "value": value}))
        .collect()
}

fn kieapp_spec(descriptor: &TopologyDescriptor, configuration: &ScenarioConfiguration) -> Value {
    let env = env_json(configuration);

    let mut objects = serde_json::Map::new();
    if descriptor.contains(DeploymentRole::Workbench) {
        objects.insert("console".to_owned(), json!({"env": env}));
    }
    if let Some(replicas) = descriptor.replicas(DeploymentRole::KieServer) {
        objects.insert(
            "servers".to_owned(),
            json!([{"replicas": replicas, "env": env}]),
        );
    }
    if descriptor.contains(DeploymentRole::SmartRouter) {
        objects.insert("smartRouter".to_owned(), json!({"env": env}));
    }

    json!({
        "environment": environment_for(descriptor),
        "useImageTags": true,
        "objects": Value::Object(objects),
    })
}

#[async_trait]
impl ScenarioBackend for OperatorBackend {
    type Project = KubeProject;

    fn name(&self) -> &'static str {
        "operator"
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
        let gvk = GroupVersionKind::gvk(KIEAPP_GROUP, KIEAPP_VERSION, KIEAPP_KIND);
        let mut app = DynamicObject::new(namespace, &ApiResource::from_gvk(&gvk));
        app.metadata.namespace = Some(namespace.to_owned());
        app.data = json!({"spec": kieapp_spec(descriptor, configuration)});

        info!(
            namespace,
            environment = environment_for(descriptor),
            "submitting KieApp custom resource"
        );
        self.kieapp_api(namespace)
            .create(&PostParams::default(), &app)
            .await?;
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

    /// The custom resource is namespace-scoped, so deleting the project
    /// namespace garbage-collects it.
    async fn delete_project(&self, project: &Self::Project) -> Result<(), DynError> {
        Ok(project::delete_project(&self.client, project).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_topology_selects_authoring_environment() {
        let mut descriptor = TopologyDescriptor::new();
        descriptor.add_role(DeploymentRole::Workbench);
        descriptor.add_role(DeploymentRole::KieServer);
        assert_eq!(environment_for(&descriptor), "rhpam-authoring");

        let mut headless = TopologyDescriptor::new();
        headless.add_role(DeploymentRole::KieServer);
        assert_eq!(environment_for(&headless), "rhpam-production-immutable");
    }

    #[test]
    fn spec_carries_replicas_and_env() {
        let mut descriptor = TopologyDescriptor::new();
        descriptor.add_role(DeploymentRole::Workbench);
        descriptor.set_replicas(DeploymentRole::KieServer, 3);

        let mut configuration = ScenarioConfiguration::new();
        configuration.set("KIE_SERVER_ID", "remote");

        let spec = kieapp_spec(&descriptor, &configuration);
        assert_eq!(spec["objects"]["servers"][0]["replicas"], 3);
        assert_eq!(spec["objects"]["servers"][0]["env"][0]["name"], "KIE_SERVER_ID");
        assert_eq!(spec["objects"]["console"]["env"][0]["value"], "remote");
    }

    #[test]
    fn roles_absent_from_the_descriptor_are_not_rendered() {
        let mut descriptor = TopologyDescriptor::new();
        descriptor.add_role(DeploymentRole::KieServer);
        let spec = kieapp_spec(&descriptor, &ScenarioConfiguration::new());
        assert!(spec["objects"].get("console").is_none());
        assert!(spec["objects"].get("smartRouter").is_none());
    }
}
