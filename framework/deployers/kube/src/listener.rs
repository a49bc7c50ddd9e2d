//! Scenario listener that captures instance logs before teardown, so a
//! failed run leaves something to diagnose after its namespace is gone.

use std::path::PathBuf;

use async_trait::async_trait;
use kie_testing_core::{
    DynError,
    scenario::{ScenarioListener, ScenarioView},
};
use tracing::{info, warn};

/// Dumps every instance's logs before undeploy. With a log directory
/// configured the logs land in `{dir}/{project}/{instance}.log`; without one
/// they go to the tracing output.
pub struct LogCollector {
    directory: Option<PathBuf>,
}

impl LogCollector {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            directory: kie_testing_env::log_dir(),
        }
    }

    #[must_use]
    pub fn with_directory(directory: PathBuf) -> Self {
        Self {
            directory: Some(directory),
        }
    }

    async fn store(&self, project: &str, instance: &str, logs: &str) {
        match &self.directory {
            Some(directory) => {
                let target = directory.join(project);
                if let Err(err) = tokio::fs::create_dir_all(&target).await {
                    warn!(error = %err, "failed to create log directory");
                    return;
                }
                let file = target.join(format!("{instance}.log"));
                if let Err(err) = tokio::fs::write(&file, logs).await {
                    warn!(error = %err, file = %file.display(), "failed to write instance logs");
                } else {
                    info!(file = %file.display(), "instance logs written");
                }
            }
            None => info!(instance, "instance logs:\n{logs}"),
        }
    }
}

#[async_trait]
impl ScenarioListener for LogCollector {
    fn name(&self) -> &str {
        "log-collector"
    }

    /// Best-effort: an instance that cannot be read must not turn a clean
    /// undeploy into a failure.
    async fn before_undeploy(&self, view: ScenarioView<'_>) -> Result<(), DynError> {
        for deployment in view.deployments {
            let instances = match deployment.instances().await {
                Ok(instances) => instances,
                Err(err) => {
                    warn!(role = %deployment.role(), error = %err, "failed to list instances for log collection");
                    continue;
                }
            };
            for instance in instances {
                match instance.logs().await {
                    Ok(logs) => {
                        self.store(view.project_name, instance.name(), &logs).await;
                    }
                    Err(err) => {
                        warn!(instance = instance.name(), error = %err, "failed to fetch instance logs");
                    }
                }
            }
        }
        Ok(())
    }
}
