//! Standard auxiliary deployments (maven repository, LDAP, database, SSO)
//! plus the registry wiring them to their ids. Each dependency owns one
//! Deployment/Service pair in the scenario namespace and contributes the
//! environment entries the workloads need to reach it.

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::{apps::v1::Deployment as K8sDeployment, core::v1::Service};
use kube::{
    Api, Client,
    api::{DeleteParams, PostParams},
};
use kie_testing_config::constants::{env_keys, images};
use kie_testing_core::{
    DynError,
    external::{ExternalDependency, ExternalDependencyId, ExternalDependencyRegistry},
};
use tracing::{debug, info};

use crate::manifests;

const MAVEN_USER: &str = "admin";
const MAVEN_PASSWORD: &str = "admin123";
const LDAP_BIND_DN: &str = "cn=admin,dc=example,dc=org";
const LDAP_BIND_CREDENTIAL: &str = "admin";
const DB_NAME: &str = "rhpam7";
const DB_USER: &str = "rhpam";
const DB_PASSWORD: &str = "rhpam";

struct Workload {
    name: &'static str,
    image: String,
    port: i32,
    env: Vec<(String, String)>,
}

/// One-Deployment-one-Service auxiliary workload; shared mechanics for every
/// standard dependency.
struct KubeDependency {
    client: Client,
    id: ExternalDependencyId,
    workload: Workload,
}

impl KubeDependency {
    fn workloads(&self, namespace: &str) -> Api<K8sDeployment> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn services(&self, namespace: &str) -> Api<Service> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn dependency_entries(
    id: ExternalDependencyId,
    name: &str,
    port: i32,
    namespace: &str,
) -> BTreeMap<String, String> {
    let host = format!("{name}.{namespace}.svc");
    match id {
        ExternalDependencyId::MavenRepository => BTreeMap::from([
            (
                env_keys::MAVEN_REPO_URL.to_owned(),
                format!("http://{host}:{port}/repository/maven-public/"),
            ),
            (env_keys::MAVEN_REPO_USERNAME.to_owned(), MAVEN_USER.to_owned()),
            (
                env_keys::MAVEN_REPO_PASSWORD.to_owned(),
                MAVEN_PASSWORD.to_owned(),
            ),
        ]),
        ExternalDependencyId::Ldap => BTreeMap::from([
            (env_keys::AUTH_LDAP_URL.to_owned(), format!("ldap://{host}:{port}")),
            (env_keys::AUTH_LDAP_BIND_DN.to_owned(), LDAP_BIND_DN.to_owned()),
            (
                env_keys::AUTH_LDAP_BIND_CREDENTIAL.to_owned(),
                LDAP_BIND_CREDENTIAL.to_owned(),
            ),
        ]),
        ExternalDependencyId::Database => BTreeMap::from([
            (env_keys::DATASOURCE_DATABASE.to_owned(), DB_NAME.to_owned()),
            (env_keys::DATASOURCE_USERNAME.to_owned(), DB_USER.to_owned()),
            (env_keys::DATASOURCE_PASSWORD.to_owned(), DB_PASSWORD.to_owned()),
        ]),
        ExternalDependencyId::Sso => BTreeMap::from([(
            env_keys::SSO_URL.to_owned(),
            format!("http://{host}:{port}/auth"),
        )]),
    }
}

#[async_trait]
impl ExternalDependency for KubeDependency {
    fn id(&self) -> ExternalDependencyId {
        self.id
    }

    fn configuration_entries(&self, namespace: &str) -> BTreeMap<String, String> {
        dependency_entries(self.id, self.workload.name, self.workload.port, namespace)
    }

    async fn deploy(&self, namespace: &str) -> Result<(), DynError> {
        info!(dependency = %self.id, namespace, "deploying auxiliary workload");
        let params = PostParams::default();
        let name = self.workload.name;
        let label = self.id.label();

        let workload = manifests::deployment(
            namespace,
            name,
            label,
            &self.workload.image,
            self.workload.port,
            1,
            manifests::env_vars(self.workload.env.iter().cloned()),
        );
        self.workloads(namespace).create(&params, &workload).await?;

        let service = manifests::service(namespace, name, label, self.workload.port);
        self.services(namespace).create(&params, &service).await?;
        Ok(())
    }

    async fn is_ready(&self, namespace: &str) -> Result<bool, DynError> {
        let workload = self
            .workloads(namespace)
            .get_opt(self.workload.name)
            .await?;
        Ok(workload
            .and_then(|workload| workload.status)
            .and_then(|status| status.ready_replicas)
            .is_some_and(|ready| ready >= 1))
    }

    async fn is_visible(&self, namespace: &str) -> Result<bool, DynError> {
        let service = self.services(namespace).get_opt(self.workload.name).await?;
        Ok(service.is_some())
    }

    async fn undeploy(&self, namespace: &str) -> Result<(), DynError> {
        let params = DeleteParams::default();
        let name = self.workload.name;

        if let Err(err) = self.workloads(namespace).delete(name, &params).await
            && !is_not_found(&err)
        {
            return Err(err.into());
        }
        if let Err(err) = self.services(namespace).delete(name, &params).await
            && !is_not_found(&err)
        {
            return Err(err.into());
        }
        debug!(dependency = %self.id, namespace, "auxiliary workload removed");
        Ok(())
    }
}

fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == 404)
}

fn maven_repository(client: Client) -> KubeDependency {
    KubeDependency {
        client,
        id: ExternalDependencyId::MavenRepository,
        workload: Workload {
            name: "maven-repository",
            image: kie_testing_env::maven_repository_image()
                .unwrap_or_else(|| images::MAVEN_REPOSITORY.to_owned()),
            port: 8081,
            env: Vec::new(),
        },
    }
}

fn ldap(client: Client) -> KubeDependency {
    KubeDependency {
        client,
        id: ExternalDependencyId::Ldap,
        workload: Workload {
            name: "ldap",
            image: kie_testing_env::ldap_image().unwrap_or_else(|| images::LDAP.to_owned()),
            port: 389,
            env: vec![
                ("LDAP_ADMIN_PASSWORD".to_owned(), LDAP_BIND_CREDENTIAL.to_owned()),
                ("LDAP_DOMAIN".to_owned(), "example.org".to_owned()),
            ],
        },
    }
}

fn database(client: Client) -> KubeDependency {
    KubeDependency {
        client,
        id: ExternalDependencyId::Database,
        workload: Workload {
            name: "database",
            image: kie_testing_env::database_image().unwrap_or_else(|| images::DATABASE.to_owned()),
            port: 5432,
            env: vec![
                ("POSTGRES_DB".to_owned(), DB_NAME.to_owned()),
                ("POSTGRES_USER".to_owned(), DB_USER.to_owned()),
                ("POSTGRES_PASSWORD".to_owned(), DB_PASSWORD.to_owned()),
            ],
        },
    }
}

fn sso(client: Client) -> KubeDependency {
    KubeDependency {
        client,
        id: ExternalDependencyId::Sso,
        workload: Workload {
            name: "sso",
            image: kie_testing_env::sso_image().unwrap_or_else(|| images::SSO.to_owned()),
            port: 8080,
            env: vec![
                ("KEYCLOAK_USER".to_owned(), "admin".to_owned()),
                ("KEYCLOAK_PASSWORD".to_owned(), "admin".to_owned()),
            ],
        },
    }
}

/// Registry with every standard dependency wired against `client`.
#[must_use]
pub fn standard_registry(client: &Client) -> ExternalDependencyRegistry {
    let for_maven = client.clone();
    let for_ldap = client.clone();
    let for_database = client.clone();
    let for_sso = client.clone();
    ExternalDependencyRegistry::new()
        .with_factory(ExternalDependencyId::MavenRepository, move |_config| {
            Ok(Box::new(maven_repository(for_maven.clone())) as Box<dyn ExternalDependency>)
        })
        .with_factory(ExternalDependencyId::Ldap, move |_config| {
            Ok(Box::new(ldap(for_ldap.clone())) as Box<dyn ExternalDependency>)
        })
        .with_factory(ExternalDependencyId::Database, move |_config| {
            Ok(Box::new(database(for_database.clone())) as Box<dyn ExternalDependency>)
        })
        .with_factory(ExternalDependencyId::Sso, move |_config| {
            Ok(Box::new(sso(for_sso.clone())) as Box<dyn ExternalDependency>)
        })
}
