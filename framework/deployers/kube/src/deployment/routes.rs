//! Route (ingress) helpers for a deployment handle: host lookup, HAProxy
//! annotation management, and the deterministic default-subdomain fallback
//! used while no concrete route exists yet.

use k8s_openapi::api::networking::v1::Ingress;
use kube::{
    Api, Client,
    api::{ListParams, Patch, PatchParams},
};
use kie_testing_core::deployment::DeploymentError;
use serde_json::json;
use url::Url;

/// `{service}-{namespace}{suffix}` — well formed even before the route
/// propagates, though it may not resolve yet.
pub(super) fn default_host(service: &str, namespace: &str, suffix: &str) -> String {
    format!("{service}-{namespace}{suffix}")
}

pub(super) fn url_for_host(host: &str, secure: bool) -> Result<Url, DeploymentError> {
    let raw = if secure {
        format!("https://{host}:443/")
    } else {
        format!("http://{host}:80/")
    };
    Url::parse(&raw).map_err(DeploymentError::api)
}

/// The ingress whose backend references `service`, if one exists.
pub(super) async fn ingress_for_service(
    client: &Client,
    namespace: &str,
    service: &str,
) -> Result<Option<Ingress>, DeploymentError> {
    let ingresses = Api::<Ingress>::namespaced(client.clone(), namespace)
        .list(&ListParams::default())
        .await
        .map_err(DeploymentError::api)?;
    Ok(ingresses
        .into_iter()
        .find(|ingress| references_service(ingress, service)))
}

fn references_service(ingress: &Ingress, service: &str) -> bool {
    ingress
        .spec
        .as_ref()
        .and_then(|spec| spec.rules.as_ref())
        .is_some_and(|rules| {
            rules.iter().any(|rule| {
                rule.http.as_ref().is_some_and(|http| {
                    http.paths.iter().any(|path| {
                        path.backend
                            .service
                            .as_ref()
                            .is_some_and(|backend| backend.name == service)
                    })
                })
            })
        })
}

pub(super) fn host_of(ingress: &Ingress) -> Option<String> {
    ingress
        .spec
        .as_ref()?
        .rules
        .as_ref()?
        .iter()
        .find_map(|rule| rule.host.clone())
}

pub(super) fn serves_tls(ingress: &Ingress) -> bool {
    ingress
        .spec
        .as_ref()
        .and_then(|spec| spec.tls.as_ref())
        .is_some_and(|tls| !tls.is_empty())
}

/// Merge-patch one annotation on the named ingress. `None` removes it.
pub(super) async fn patch_annotation(
    client: &Client,
    namespace: &str,
    ingress_name: &str,
    annotation: &str,
    value: Option<&str>,
) -> Result<(), DeploymentError> {
    let patch = json!({
        "metadata": {
            "annotations": { annotation: value }
        }
    });
    Api::<Ingress>::namespaced(client.clone(), namespace)
        .patch(ingress_name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .map_err(DeploymentError::api)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::networking::v1::{IngressSpec, IngressTLS};

    use super::*;
    use crate::manifests;

    #[test]
    fn default_host_embeds_service_and_namespace() {
        assert_eq!(
            default_host("myapp-kieserver", "kie-ab12", ".apps.test.local"),
            "myapp-kieserver-kie-ab12.apps.test.local"
        );
    }

    #[test]
    fn url_carries_fixed_port_per_scheme() {
        let http = url_for_host("host.example", false).unwrap();
        assert_eq!(http.as_str(), "http://host.example/");
        assert_eq!(http.port_or_known_default(), Some(80));

        let https = url_for_host("host.example", true).unwrap();
        assert_eq!(https.scheme(), "https");
        assert_eq!(https.port_or_known_default(), Some(443));
    }

    #[test]
    fn ingress_host_and_backend_are_detected() {
        let ingress = manifests::ingress("ns", "myapp-kieserver", "kie-server", "host.example", 8080);
        assert!(references_service(&ingress, "myapp-kieserver"));
        assert!(!references_service(&ingress, "myapp-rhpamcentr"));
        assert_eq!(host_of(&ingress).as_deref(), Some("host.example"));
        assert!(!serves_tls(&ingress));
    }

    #[test]
    fn tls_section_marks_ingress_secure() {
        let mut ingress =
            manifests::ingress("ns", "myapp-kieserver", "kie-server", "host.example", 8080);
        if let Some(IngressSpec { tls, .. }) = ingress.spec.as_mut() {
            *tls = Some(vec![IngressTLS::default()]);
        }
        assert!(serves_tls(&ingress));
    }
}
