//! In-memory backend and cluster fake used by the lifecycle tests. Records
//! every lifecycle call so ordering properties can be asserted without a
//! real cluster.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use kie_testing_core::{
    DynError,
    backend::ScenarioBackend,
    configuration::ScenarioConfiguration,
    context::{Credentials, TestContext},
    deployment::{CommandResult, Deployment, DeploymentError, Instance, ResolutionError},
    external::{ExternalDependency, ExternalDependencyId, ExternalDependencyRegistry},
    topology::{BackendCapabilities, DeploymentRole, TopologyDescriptor},
};
use tokio::sync::OnceCell;
use url::Url;

#[derive(Default)]
pub struct MockCluster {
    pub events: Mutex<Vec<String>>,
    pub services: Mutex<Vec<String>>,
    pub replicas: Mutex<BTreeMap<String, i32>>,
    pub submitted_config: Mutex<Option<ScenarioConfiguration>>,
}

impl MockCluster {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn service_names(&self) -> Vec<String> {
        self.services.lock().unwrap().clone()
    }

    pub fn event_index(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }
}

pub struct MockBackend {
    pub cluster: Arc<MockCluster>,
    capabilities: BackendCapabilities,
    fail_create: bool,
}

impl MockBackend {
    pub fn new(cluster: Arc<MockCluster>) -> Arc<Self> {
        Arc::new(Self {
            cluster,
            capabilities: BackendCapabilities::all(),
            fail_create: false,
        })
    }

    pub fn with_capabilities(
        cluster: Arc<MockCluster>,
        capabilities: BackendCapabilities,
    ) -> Arc<Self> {
        Arc::new(Self {
            cluster,
            capabilities,
            fail_create: false,
        })
    }

    /// Backend whose project creation always fails, for early-abort tests.
    pub fn failing_create(cluster: Arc<MockCluster>) -> Arc<Self> {
        Arc::new(Self {
            cluster,
            capabilities: BackendCapabilities::all(),
            fail_create: true,
        })
    }
}

fn service_suffix(role: DeploymentRole) -> &'static str {
    match role {
        DeploymentRole::Workbench => "rhpamcentr",
        DeploymentRole::KieServer => "kieserver",
        DeploymentRole::SmartRouter => "smartrouter",
        DeploymentRole::Database => "postgresql",
        DeploymentRole::Sso => "sso",
    }
}

#[async_trait]
impl ScenarioBackend for MockBackend {
    type Project = String;

    fn name(&self) -> &'static str {
        "mock"
    }

    fn capabilities(&self) -> &BackendCapabilities {
        &self.capabilities
    }

    async fn create_project(
        &self,
        name: &str,
        _context: &TestContext,
    ) -> Result<Self::Project, DynError> {
        if self.fail_create {
            return Err("namespace quota exhausted".into());
        }
        self.cluster.record(format!("project:create:{name}"));
        Ok(name.to_owned())
    }

    async fn submit_topology(
        &self,
        project: &Self::Project,
        descriptor: &TopologyDescriptor,
        configuration: &ScenarioConfiguration,
    ) -> Result<(), DynError> {
        self.cluster.record("submit");
        *self.cluster.submitted_config.lock().unwrap() = Some(configuration.clone());
        for (role, spec) in descriptor.roles() {
            let service = format!("{project}-{}", service_suffix(role));
            self.cluster.services.lock().unwrap().push(service.clone());
            self.cluster
                .replicas
                .lock()
                .unwrap()
                .insert(service, spec.replicas);
        }
        Ok(())
    }

    async fn resolve_deployment(
        &self,
        project: &Self::Project,
        role: DeploymentRole,
        context: &TestContext,
    ) -> Result<Arc<dyn Deployment>, DynError> {
        Ok(Arc::new(MockDeployment {
            cluster: Arc::clone(&self.cluster),
            role,
            namespace: project.clone(),
            workload: format!("{project}-{}", service_suffix(role)),
            credentials: Some(context.app_credentials().clone()),
            resolved: OnceCell::new(),
        }))
    }

    async fn delete_project(&self, project: &Self::Project) -> Result<(), DynError> {
        self.cluster.record(format!("project:delete:{project}"));
        self.cluster.services.lock().unwrap().clear();
        self.cluster.replicas.lock().unwrap().clear();
        Ok(())
    }
}

pub struct MockDeployment {
    cluster: Arc<MockCluster>,
    role: DeploymentRole,
    namespace: String,
    workload: String,
    credentials: Option<Credentials>,
    // Mirrors the resolve-once contract of the real handles.
    resolved: OnceCell<String>,
}

#[async_trait]
impl Deployment for MockDeployment {
    fn role(&self) -> DeploymentRole {
        self.role
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    async fn service_name(&self) -> Result<String, DeploymentError> {
        let name = self
            .resolved
            .get_or_try_init(|| async {
                self.cluster.record(format!("resolve:{}", self.workload));
                let services = self.cluster.service_names();
                if services.iter().any(|s| s == &self.workload) {
                    Ok(self.workload.clone())
                } else {
                    Err(DeploymentError::from(ResolutionError::NotFound {
                        pattern: self.workload.clone(),
                        candidates: services,
                    }))
                }
            })
            .await?;
        Ok(name.clone())
    }

    async fn url(&self) -> Result<Option<Url>, DeploymentError> {
        Ok(None)
    }

    async fn secure_url(&self) -> Result<Option<Url>, DeploymentError> {
        Ok(None)
    }

    async fn is_ready(&self) -> bool {
        self.cluster.service_names().contains(&self.workload)
    }

    async fn scale(&self, replicas: i32) -> Result<(), DeploymentError> {
        let mut counts = self.cluster.replicas.lock().unwrap();
        if counts.get(&self.workload).copied() == Some(replicas) {
            return Ok(());
        }
        counts.insert(self.workload.clone(), replicas);
        drop(counts);
        self.cluster.record(format!("scale:{}:{replicas}", self.workload));
        Ok(())
    }

    async fn wait_for_scale(&self) -> Result<(), DeploymentError> {
        self.cluster.record(format!("scale-wait:{}", self.workload));
        Ok(())
    }

    async fn wait_for_service(&self, timeout: Duration) -> Result<(), DeploymentError> {
        if self.is_ready().await {
            Ok(())
        } else {
            Err(DeploymentError::Timeout {
                workload: self.workload.clone(),
                namespace: self.namespace.clone(),
                timeout,
            })
        }
    }

    async fn instances(&self) -> Result<Vec<Box<dyn Instance>>, DeploymentError> {
        let count = self
            .cluster
            .replicas
            .lock()
            .unwrap()
            .get(&self.workload)
            .copied()
            .unwrap_or(0);
        Ok((0..count)
            .map(|index| {
                Box::new(MockInstance {
                    name: format!("{}-{index}", self.workload),
                }) as Box<dyn Instance>
            })
            .collect())
    }

    async fn delete_instances(&self, _names: &[String]) -> Result<(), DeploymentError> {
        Ok(())
    }

    async fn set_router_timeout(&self, _timeout: Duration) -> Result<(), DeploymentError> {
        Ok(())
    }

    async fn reset_router_timeout(&self) -> Result<(), DeploymentError> {
        Ok(())
    }

    async fn set_router_balance(&self, _balance: &str) -> Result<(), DeploymentError> {
        Ok(())
    }
}

struct MockInstance {
    name: String,
}

#[async_trait]
impl Instance for MockInstance {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run_command(&self, _command: &[&str]) -> Result<CommandResult, DeploymentError> {
        Ok(CommandResult::default())
    }

    async fn logs(&self) -> Result<String, DeploymentError> {
        Ok(String::new())
    }
}

pub struct MockDependency {
    cluster: Arc<MockCluster>,
    id: ExternalDependencyId,
    deployed: Mutex<bool>,
}

impl MockDependency {
    pub fn new(cluster: Arc<MockCluster>, id: ExternalDependencyId) -> Self {
        Self {
            cluster,
            id,
            deployed: Mutex::new(false),
        }
    }
}

#[async_trait]
impl ExternalDependency for MockDependency {
    fn id(&self) -> ExternalDependencyId {
        self.id
    }

    fn configuration_entries(&self, namespace: &str) -> BTreeMap<String, String> {
        BTreeMap::from([(
            format!("DEP_{}_HOST", self.id.label().to_uppercase().replace('-', "_")),
            format!("{}.{namespace}.svc", self.id),
        )])
    }

    async fn deploy(&self, _namespace: &str) -> Result<(), DynError> {
        *self.deployed.lock().unwrap() = true;
        self.cluster.record(format!("dep:{}:deploy", self.id));
        Ok(())
    }

    async fn is_ready(&self, _namespace: &str) -> Result<bool, DynError> {
        let deployed = *self.deployed.lock().unwrap();
        if deployed {
            self.cluster.record(format!("dep:{}:ready", self.id));
        }
        Ok(deployed)
    }

    async fn is_visible(&self, _namespace: &str) -> Result<bool, DynError> {
        let deployed = *self.deployed.lock().unwrap();
        if deployed {
            self.cluster.record(format!("dep:{}:visible", self.id));
        }
        Ok(deployed)
    }

    async fn undeploy(&self, _namespace: &str) -> Result<(), DynError> {
        self.cluster.record(format!("dep:{}:undeploy", self.id));
        Ok(())
    }
}

/// Registry wired with mock factories for the given ids.
pub fn mock_registry(
    cluster: &Arc<MockCluster>,
    ids: &[ExternalDependencyId],
) -> Arc<ExternalDependencyRegistry> {
    let mut registry = ExternalDependencyRegistry::new();
    for id in ids {
        let id = *id;
        let cluster = Arc::clone(cluster);
        registry = registry.with_factory(id, move |_config| {
            Ok(Box::new(MockDependency::new(Arc::clone(&cluster), id))
                as Box<dyn ExternalDependency>)
        });
    }
    Arc::new(registry)
}

pub fn test_context() -> TestContext {
    TestContext::new(Credentials::new("adminUser", "adminUser1!"))
}

/// Idempotent tracing setup so `RUST_LOG` works when debugging tests.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
