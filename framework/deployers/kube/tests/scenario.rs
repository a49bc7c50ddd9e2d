//! Full-lifecycle tests against a live cluster. These need a reachable
//! kubeconfig context with namespace-creation rights and are skipped by
//! default.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use kie_testing_core::{
    context::TestContext,
    scenario::ScenarioBuilder,
    topology::DeploymentRole,
};
use kie_testing_deployer_kube::{
    backend::TemplateBackend, dependencies::standard_registry, listener::LogCollector,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[tokio::test]
#[ignore = "requires a kubernetes cluster"]
async fn deploys_and_scales_a_kie_server_scenario() -> Result<()> {
    init_tracing();
    let client = kube::Client::try_default().await?;
    let context = TestContext::from_env();
    let backend = Arc::new(TemplateBackend::new(client.clone()));
    let registry = Arc::new(standard_registry(&client));

    let mut scenario = ScenarioBuilder::new(context, backend, registry)
        .with_kie_server()
        .with_listener(LogCollector::from_env())
        .build()?;

    let deployed = scenario.deploy().await;
    let result = async {
        deployed?;
        let server = scenario
            .deployment(DeploymentRole::KieServer)
            .context("kie server handle missing")?;
        anyhow::ensure!(server.is_ready().await, "kie server not ready after deploy");
        anyhow::ensure!(server.url().await?.is_some(), "kie server has no url");

        server.scale(2).await?;
        server.wait_for_scale().await?;
        anyhow::ensure!(server.instances().await?.len() == 2, "expected 2 instances");

        server.scale(0).await?;
        server.wait_for_scale().await?;
        anyhow::ensure!(server.instances().await?.is_empty(), "expected 0 instances");
        Ok(())
    }
    .await;

    let undeployed = scenario.undeploy().await;
    result?;
    undeployed?;
    Ok(())
}

#[tokio::test]
#[ignore = "requires a kubernetes cluster"]
async fn maven_repository_scenario_wires_the_server_to_it() -> Result<()> {
    init_tracing();
    let client = kube::Client::try_default().await?;
    let context = TestContext::from_env();
    let backend = Arc::new(TemplateBackend::new(client.clone()));
    let registry = Arc::new(standard_registry(&client));

    let mut scenario = ScenarioBuilder::new(context, backend, registry)
        .with_kie_server()
        .with_internal_maven_repository()?
        .build()?;

    let deployed = scenario.deploy().await;
    let result = async {
        deployed?;
        let server = scenario
            .deployment(DeploymentRole::KieServer)
            .context("kie server handle missing")?;
        let instances = server.instances().await?;
        anyhow::ensure!(!instances.is_empty(), "no running instances");

        // The repository URL must be visible inside the container.
        let output = instances[0].run_command(&["printenv", "MAVEN_REPO_URL"]).await?;
        anyhow::ensure!(
            output.stdout.contains("/repository/maven-public/"),
            "MAVEN_REPO_URL not injected: {output:?}"
        );
        Ok(())
    }
    .await;

    let undeployed = scenario.undeploy().await;
    result?;
    undeployed?;
    Ok(())
}
