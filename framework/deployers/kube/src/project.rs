//! Namespace-scoped project lifecycle: one project per deployed scenario,
//! carrying the per-run app credentials as a secret.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Namespace, Secret};
use kube::{
    Api, Client,
    api::{DeleteParams, ObjectMeta, PostParams},
};
use kie_testing_core::context::TestContext;
use thiserror::Error;
use tracing::{debug, info};

/// Label stamped on every namespace the framework creates, so leftovers from
/// crashed runs can be found and swept.
pub const MANAGED_BY_LABEL: &str = "kie.test/managed-by";
pub const MANAGED_BY_VALUE: &str = "kie-testing-framework";

const APP_CREDENTIALS_SECRET: &str = "app-credentials";

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("failed to create namespace `{namespace}`: {source}")]
    NamespaceCreate {
        namespace: String,
        #[source]
        source: kube::Error,
    },
    #[error("failed to create credentials secret in `{namespace}`: {source}")]
    SecretCreate {
        namespace: String,
        #[source]
        source: kube::Error,
    },
    #[error("failed to delete namespace `{namespace}`: {source}")]
    NamespaceDelete {
        namespace: String,
        #[source]
        source: kube::Error,
    },
}

/// One scenario's namespace plus the context bits the backends need later.
pub struct KubeProject {
    name: String,
    domain_suffix: String,
    preserve: bool,
}

impl KubeProject {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn domain_suffix(&self) -> &str {
        &self.domain_suffix
    }
}

pub async fn create_project(
    client: &Client,
    name: &str,
    context: &TestContext,
) -> Result<KubeProject, ProjectError> {
    info!(namespace = name, "creating project namespace");

    let namespace = Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_owned()),
            labels: Some(BTreeMap::from([(
                MANAGED_BY_LABEL.to_owned(),
                MANAGED_BY_VALUE.to_owned(),
            )])),
            ..ObjectMeta::default()
        },
        ..Namespace::default()
    };
    Api::<Namespace>::all(client.clone())
        .create(&PostParams::default(), &namespace)
        .await
        .map_err(|source| ProjectError::NamespaceCreate {
            namespace: name.to_owned(),
            source,
        })?;

    let credentials = context.app_credentials();
    let secret = Secret {
        metadata: ObjectMeta {
            name: Some(APP_CREDENTIALS_SECRET.to_owned()),
            namespace: Some(name.to_owned()),
            ..ObjectMeta::default()
        },
        string_data: Some(BTreeMap::from([
            ("username".to_owned(), credentials.username.clone()),
            ("password".to_owned(), credentials.password.clone()),
        ])),
        ..Secret::default()
    };
    Api::<Secret>::namespaced(client.clone(), name)
        .create(&PostParams::default(), &secret)
        .await
        .map_err(|source| ProjectError::SecretCreate {
            namespace: name.to_owned(),
            source,
        })?;

    Ok(KubeProject {
        name: name.to_owned(),
        domain_suffix: context.domain_suffix().to_owned(),
        preserve: kie_testing_env::preserve_projects(),
    })
}

/// Delete the project namespace and everything in it. Honors the
/// preserve-projects flag; tolerates a namespace that is already gone.
pub async fn delete_project(client: &Client, project: &KubeProject) -> Result<(), ProjectError> {
    if project.preserve {
        info!(namespace = %project.name, "preserving project namespace");
        return Ok(());
    }

    info!(namespace = %project.name, "deleting project namespace");
    match Api::<Namespace>::all(client.clone())
        .delete(&project.name, &DeleteParams::default())
        .await
    {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(response)) if response.code == 404 => {
            debug!(namespace = %project.name, "namespace already gone");
            Ok(())
        }
        Err(source) => Err(ProjectError::NamespaceDelete {
            namespace: project.name.clone(),
            source,
        }),
    }
}
