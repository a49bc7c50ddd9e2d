mod builder;
mod lifecycle;
mod listener;
mod registration;

pub use builder::{ScenarioBuildError, ScenarioBuilder};
pub use lifecycle::{CleanupFailure, DeployError, Scenario, UndeployError};
pub use listener::{ScenarioListener, ScenarioView};
pub use registration::{RegistrationError, wait_for_registered_servers};

/// Lifecycle state of a scenario. A scenario must not be deployed twice
/// without an intervening undeploy.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeploymentState {
    NotDeployed,
    Deploying,
    Deployed,
    Undeployed,
}
