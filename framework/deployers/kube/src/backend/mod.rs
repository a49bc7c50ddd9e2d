//! Cluster-facing deployment strategies. The template backend renders plain
//! Kubernetes manifests per role; the operator backend submits a single
//! custom resource and lets the KIE operator expand it.

mod operator;
mod template;

pub use operator::OperatorBackend;
pub use template::TemplateBackend;

use kie_testing_core::topology::DeploymentRole;

/// Service/workload name suffix each role is created under. The resolver
/// patterns must keep matching these.
pub(crate) fn workload_name(project: &str, role: DeploymentRole) -> String {
    let suffix = match role {
        DeploymentRole::Workbench => "rhpamcentr",
        DeploymentRole::KieServer => "kieserver",
        DeploymentRole::SmartRouter => "smartrouter",
        DeploymentRole::Database => "postgresql",
        DeploymentRole::Sso => "sso",
    };
    format!("{project}-{suffix}")
}

pub(crate) fn image_for(role: DeploymentRole) -> String {
    use kie_testing_config::constants::images;
    let default = match role {
        DeploymentRole::Workbench => images::WORKBENCH,
        DeploymentRole::KieServer => images::KIE_SERVER,
        DeploymentRole::SmartRouter => images::SMART_ROUTER,
        DeploymentRole::Database => images::DATABASE,
        DeploymentRole::Sso => images::SSO,
    };
    let override_ = match role {
        DeploymentRole::Workbench => kie_testing_env::workbench_image(),
        DeploymentRole::KieServer => kie_testing_env::kie_server_image(),
        DeploymentRole::SmartRouter => kie_testing_env::smart_router_image(),
        DeploymentRole::Database => kie_testing_env::database_image(),
        DeploymentRole::Sso => kie_testing_env::sso_image(),
    };
    override_.unwrap_or_else(|| default.to_owned())
}

pub(crate) const fn port_for(role: DeploymentRole) -> i32 {
    match role {
        DeploymentRole::Workbench | DeploymentRole::KieServer | DeploymentRole::Sso => 8080,
        DeploymentRole::SmartRouter => 9000,
        DeploymentRole::Database => 5432,
    }
}
