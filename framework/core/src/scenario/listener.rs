use std::sync::Arc;

use async_trait::async_trait;

use crate::{DynError, deployment::Deployment};

/// Read-only view of a deployed scenario handed to listeners.
#[derive(Clone, Copy)]
pub struct ScenarioView<'a> {
    pub project_name: &'a str,
    pub deployments: &'a [Arc<dyn Deployment>],
}

/// Hook notified at scenario lifecycle points. Lets tests inject
/// cross-cutting setup (log collection, extra verification) without touching
/// the orchestrator.
#[async_trait]
pub trait ScenarioListener: Send + Sync {
    fn name(&self) -> &str;

    async fn after_deploy(&self, view: ScenarioView<'_>) -> Result<(), DynError> {
        let _ = view;
        Ok(())
    }

    async fn before_undeploy(&self, view: ScenarioView<'_>) -> Result<(), DynError> {
        let _ = view;
        Ok(())
    }
}
