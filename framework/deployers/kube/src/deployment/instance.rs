use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::{
    Api, Client,
    api::{AttachParams, LogParams},
};
use kie_testing_core::deployment::{CommandResult, DeploymentError, Instance};
use tokio::io::{AsyncRead, AsyncReadExt};

/// One pod backing a deployment, addressable for exec and log retrieval.
pub struct PodInstance {
    client: Client,
    namespace: String,
    name: String,
}

impl PodInstance {
    pub(crate) fn new(client: Client, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    fn pods(&self) -> Api<Pod> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
}

async fn read_channel(reader: Option<impl AsyncRead + Unpin>) -> String {
    let Some(mut reader) = reader else {
        return String::new();
    };
    let mut output = String::new();
    // A broken channel just truncates the captured output.
    let _ = reader.read_to_string(&mut output).await;
    output
}

#[async_trait]
impl Instance for PodInstance {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run_command(&self, command: &[&str]) -> Result<CommandResult, DeploymentError> {
        let params = AttachParams::default().stdout(true).stderr(true);
        let mut attached = self
            .pods()
            .exec(&self.name, command.iter().copied(), &params)
            .await
            .map_err(|source| DeploymentError::Exec {
                instance: self.name.clone(),
                source: source.into(),
            })?;

        let (stdout, stderr) =
            tokio::join!(read_channel(attached.stdout()), read_channel(attached.stderr()));
        attached.join().await.map_err(|source| DeploymentError::Exec {
            instance: self.name.clone(),
            source: source.into(),
        })?;

        Ok(CommandResult { stdout, stderr })
    }

    async fn logs(&self) -> Result<String, DeploymentError> {
        self.pods()
            .logs(&self.name, &LogParams::default())
            .await
            .map_err(DeploymentError::api)
    }
}
