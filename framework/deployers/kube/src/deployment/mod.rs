//! Runtime handle to one deployed role: lazy service resolution, URLs,
//! scaling, instance access, and route annotation management.

mod instance;
mod routes;

use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::{apps::v1::Deployment as K8sDeployment, core::v1::{Pod, Service}};
use kube::{
    Api, Client,
    api::{DeleteParams, ListParams, Patch, PatchParams},
};
use kie_testing_config::{constants, timeouts};
use kie_testing_core::{
    context::Credentials,
    deployment::{Deployment, DeploymentError, Instance},
    probe::wait_for_router,
    topology::DeploymentRole,
};
use tokio::{sync::OnceCell, time::sleep};
use tracing::{debug, info, warn};
use url::Url;

pub use instance::PodInstance;

use crate::resolver;

pub struct KubeDeployment {
    client: Client,
    role: DeploymentRole,
    namespace: String,
    domain_suffix: String,
    credentials: Option<Credentials>,
    // Resolved-once service name; see the resolver docs for the rename risk.
    service: OnceCell<String>,
}

impl KubeDeployment {
    #[must_use]
    pub fn new(
        client: Client,
        role: DeploymentRole,
        namespace: impl Into<String>,
        domain_suffix: impl Into<String>,
        credentials: Option<Credentials>,
    ) -> Self {
        Self {
            client,
            role,
            namespace: namespace.into(),
            domain_suffix: domain_suffix.into(),
            credentials,
            service: OnceCell::new(),
        }
    }

    fn services(&self) -> Api<Service> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn workloads(&self) -> Api<K8sDeployment> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn pods(&self) -> Api<Pod> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    async fn list_service_names(&self) -> Result<Vec<String>, DeploymentError> {
        let services = self
            .services()
            .list(&ListParams::default())
            .await
            .map_err(DeploymentError::api)?;
        Ok(services
            .into_iter()
            .filter_map(|service| service.metadata.name)
            .collect())
    }

    async fn resolve_service(&self) -> Result<String, DeploymentError> {
        let name = self
            .service
            .get_or_try_init(|| async {
                let candidates = self.list_service_names().await?;
                let resolved =
                    resolver::resolve(resolver::pattern_for(self.role), &candidates)?;
                debug!(role = %self.role, service = %resolved, "resolved service name");
                Ok::<_, DeploymentError>(resolved)
            })
            .await?;
        Ok(name.clone())
    }

    async fn route_url(&self, secure: bool) -> Result<Option<Url>, DeploymentError> {
        let service = self.resolve_service().await?;
        let ingress = routes::ingress_for_service(&self.client, &self.namespace, &service).await?;

        match ingress {
            Some(ingress) => {
                if secure && !routes::serves_tls(&ingress) {
                    return Ok(None);
                }
                let host = routes::host_of(&ingress).unwrap_or_else(|| {
                    routes::default_host(&service, &self.namespace, &self.domain_suffix)
                });
                routes::url_for_host(&host, secure).map(Some)
            }
            None => {
                // No concrete route yet: fall back to the deterministic
                // default-subdomain host so the URL is still well formed.
                let host = routes::default_host(&service, &self.namespace, &self.domain_suffix);
                routes::url_for_host(&host, secure).map(Some)
            }
        }
    }

    async fn desired_and_ready(&self, service: &str) -> Result<(i32, i32), DeploymentError> {
        let workload = self
            .workloads()
            .get(service)
            .await
            .map_err(DeploymentError::api)?;
        let desired = workload
            .spec
            .as_ref()
            .and_then(|spec| spec.replicas)
            .unwrap_or(1);
        let ready = workload
            .status
            .as_ref()
            .and_then(|status| status.ready_replicas)
            .unwrap_or(0);
        Ok((desired, ready))
    }

    async fn ingress_name(&self) -> Result<Option<String>, DeploymentError> {
        let service = self.resolve_service().await?;
        let ingress = routes::ingress_for_service(&self.client, &self.namespace, &service).await?;
        Ok(ingress.and_then(|ingress| ingress.metadata.name))
    }

    async fn patch_route_annotation(
        &self,
        annotation: &str,
        value: Option<&str>,
    ) -> Result<(), DeploymentError> {
        let Some(name) = self.ingress_name().await? else {
            warn!(role = %self.role, annotation, "no route to annotate");
            return Ok(());
        };
        routes::patch_annotation(&self.client, &self.namespace, &name, annotation, value).await
    }
}

#[async_trait]
impl Deployment for KubeDeployment {
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
        self.resolve_service().await
    }

    async fn url(&self) -> Result<Option<Url>, DeploymentError> {
        self.route_url(false).await
    }

    async fn secure_url(&self) -> Result<Option<Url>, DeploymentError> {
        self.route_url(true).await
    }

    async fn is_ready(&self) -> bool {
        let Ok(service) = self.resolve_service().await else {
            return false;
        };
        matches!(self.workloads().get_opt(&service).await, Ok(Some(_)))
    }

    async fn scale(&self, replicas: i32) -> Result<(), DeploymentError> {
        let service = self.resolve_service().await?;
        let (desired, _ready) = self.desired_and_ready(&service).await?;
        if desired == replicas {
            debug!(workload = %service, replicas, "scale request is a no-op");
            return Ok(());
        }

        info!(workload = %service, from = desired, to = replicas, "scaling workload");
        let patch = serde_json::json!({"spec": {"replicas": replicas}});
        self.workloads()
            .patch(&service, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(DeploymentError::api)?;
        Ok(())
    }

    async fn wait_for_scale(&self) -> Result<(), DeploymentError> {
        let service = self.resolve_service().await?;
        let timeout = timeouts::pods_ready_timeout();
        let interval = timeouts::poll_interval();
        let mut elapsed = Duration::ZERO;

        let mut desired = 0;
        while elapsed <= timeout {
            let (want, ready) = self.desired_and_ready(&service).await?;
            desired = want;
            if ready == desired {
                debug!(workload = %service, replicas = ready, "workload scaled");

                // Pods are up; give the route a short window to start
                // serving. Best-effort only: propagation delay is outside
                // the framework's control.
                if desired > 0 {
                    match self.route_url(false).await {
                        Ok(Some(url)) => {
                            wait_for_router(&url).await;
                        }
                        Ok(None) => {}
                        Err(err) => {
                            warn!(workload = %service, error = %err, "route lookup failed; skipping router probe");
                        }
                    }
                }
                return Ok(());
            }

            sleep(interval).await;
            elapsed += interval;
        }

        Err(DeploymentError::Timeout {
            workload: format!("{service} ({desired} replicas)"),
            namespace: self.namespace.clone(),
            timeout,
        })
    }

    async fn wait_for_service(&self, timeout: Duration) -> Result<(), DeploymentError> {
        let pattern = resolver::pattern_for(self.role);
        let interval = timeouts::poll_interval();
        let mut elapsed = Duration::ZERO;

        loop {
            let candidates = self.list_service_names().await?;
            let matched: Vec<&String> = candidates
                .iter()
                .filter(|name| pattern.matches(name))
                .collect();
            match matched.len() {
                1 => {
                    // Populate the cache while the listing is fresh.
                    let _ = self.resolve_service().await?;
                    return Ok(());
                }
                0 => {
                    if elapsed > timeout {
                        return Err(DeploymentError::Timeout {
                            workload: pattern.as_str().to_owned(),
                            namespace: self.namespace.clone(),
                            timeout,
                        });
                    }
                }
                // Several matches will not fix themselves; fail now with
                // the full list.
                _ => {
                    resolver::resolve(pattern, &candidates)?;
                }
            }

            sleep(interval).await;
            elapsed += interval;
        }
    }

    async fn instances(&self) -> Result<Vec<Box<dyn Instance>>, DeploymentError> {
        let service = match self.resolve_service().await {
            Ok(service) => service,
            // Not an error: the workload simply is not there yet.
            Err(DeploymentError::Resolution(_)) => return Ok(Vec::new()),
            Err(other) => return Err(other),
        };

        // The service's own selector is the authoritative pod filter; it is
        // valid for any provisioning path, including operator-expanded pods
        // that carry only operator-chosen labels.
        let service = self
            .services()
            .get_opt(&service)
            .await
            .map_err(DeploymentError::api)?;
        let Some(selector) = service.as_ref().and_then(selector_string) else {
            return Ok(Vec::new());
        };
        let pods = self
            .pods()
            .list(&ListParams::default().labels(&selector))
            .await
            .map_err(DeploymentError::api)?;

        Ok(pods
            .into_iter()
            .filter_map(|pod| pod.metadata.name)
            .map(|name| {
                Box::new(PodInstance::new(self.client.clone(), &self.namespace, name))
                    as Box<dyn Instance>
            })
            .collect())
    }

    async fn delete_instances(&self, names: &[String]) -> Result<(), DeploymentError> {
        let params = DeleteParams {
            grace_period_seconds: Some(0),
            ..DeleteParams::default()
        };
        for name in names {
            match self.pods().delete(name, &params).await {
                Ok(_) => info!(pod = %name, "force-deleted instance"),
                Err(kube::Error::Api(response)) if response.code == 404 => {
                    debug!(pod = %name, "instance already gone");
                }
                Err(source) => return Err(DeploymentError::api(source)),
            }
        }
        Ok(())
    }

    async fn set_router_timeout(&self, timeout: Duration) -> Result<(), DeploymentError> {
        let value = format!("{}s", timeout.as_secs());
        self.patch_route_annotation(constants::ROUTER_TIMEOUT_ANNOTATION, Some(&value))
            .await
    }

    async fn reset_router_timeout(&self) -> Result<(), DeploymentError> {
        self.patch_route_annotation(constants::ROUTER_TIMEOUT_ANNOTATION, None)
            .await
    }

    async fn set_router_balance(&self, balance: &str) -> Result<(), DeploymentError> {
        self.patch_route_annotation(constants::ROUTER_BALANCE_ANNOTATION, Some(balance))
            .await
    }
}

/// Pod label selector equivalent to the service's `spec.selector`, or `None`
/// for selector-less services (headless externals, manually wired endpoints).
fn selector_string(service: &Service) -> Option<String> {
    let selector = service.spec.as_ref()?.selector.as_ref()?;
    if selector.is_empty() {
        return None;
    }
    let pairs: Vec<String> = selector
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect();
    Some(pairs.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifests;

    #[test]
    fn selector_string_follows_the_service_selector() {
        let service = manifests::service("ns", "myapp-kieserver", "kie-server", 8080);
        assert_eq!(
            selector_string(&service).as_deref(),
            Some("kie.test/workload=myapp-kieserver")
        );
    }

    #[test]
    fn selector_less_service_yields_no_selector() {
        let service = Service::default();
        assert_eq!(selector_string(&service), None);
    }
}
