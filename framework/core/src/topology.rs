use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Logical role a workload plays within a deployed topology. One deployment
/// handle exists per role present in a scenario.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum DeploymentRole {
    /// Business-central web console.
    Workbench,
    /// KIE execution server.
    KieServer,
    /// KIE server router (proxy in front of execution servers).
    SmartRouter,
    Database,
    /// SSO identity broker.
    Sso,
}

impl DeploymentRole {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Workbench => "workbench",
            Self::KieServer => "kie-server",
            Self::SmartRouter => "smart-router",
            Self::Database => "database",
            Self::Sso => "sso",
        }
    }
}

impl fmt::Display for DeploymentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Replica count and per-role knobs for one topology member.
#[derive(Clone, Copy, Debug)]
pub struct RoleSpec {
    pub replicas: i32,
}

impl Default for RoleSpec {
    fn default() -> Self {
        Self { replicas: 1 }
    }
}

/// Generic topology description: the set of roles present plus their specs.
///
/// A single descriptor replaces the per-permutation scenario classes of older
/// harnesses; permutations are just different role sets over the same shared
/// option bag.
#[derive(Clone, Debug, Default)]
pub struct TopologyDescriptor {
    roles: BTreeMap<DeploymentRole, RoleSpec>,
}

impl TopologyDescriptor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_role(&mut self, role: DeploymentRole) {
        self.roles.entry(role).or_default();
    }

    pub fn set_replicas(&mut self, role: DeploymentRole, replicas: i32) {
        self.roles.entry(role).or_default().replicas = replicas;
    }

    #[must_use]
    pub fn contains(&self, role: DeploymentRole) -> bool {
        self.roles.contains_key(&role)
    }

    #[must_use]
    pub fn replicas(&self, role: DeploymentRole) -> Option<i32> {
        self.roles.get(&role).map(|spec| spec.replicas)
    }

    /// Roles in stable (enum) order.
    pub fn roles(&self) -> impl Iterator<Item = (DeploymentRole, RoleSpec)> + '_ {
        self.roles.iter().map(|(role, spec)| (*role, *spec))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.roles.len()
    }
}

/// Builder options a backend may or may not be able to express.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum BackendOption {
    LdapRoleMapping,
    SsoDeployment,
    ExternalDatabase,
}

impl BackendOption {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::LdapRoleMapping => "ldap role mapping",
            Self::SsoDeployment => "sso deployment",
            Self::ExternalDatabase => "external database",
        }
    }
}

/// Per-backend capability table consulted by the scenario builder before it
/// accepts an option, so unsupported permutations fail at the call site.
#[derive(Clone, Debug, Default)]
pub struct BackendCapabilities {
    supported: BTreeSet<BackendOption>,
}

impl BackendCapabilities {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn of(options: impl IntoIterator<Item = BackendOption>) -> Self {
        Self {
            supported: options.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn all() -> Self {
        Self::of([
            BackendOption::LdapRoleMapping,
            BackendOption::SsoDeployment,
            BackendOption::ExternalDatabase,
        ])
    }

    #[must_use]
    pub fn supports(&self, option: BackendOption) -> bool {
        self.supported.contains(&option)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_deduplicated() {
        let mut descriptor = TopologyDescriptor::new();
        descriptor.add_role(DeploymentRole::KieServer);
        descriptor.add_role(DeploymentRole::KieServer);
        assert_eq!(descriptor.len(), 1);
        assert_eq!(descriptor.replicas(DeploymentRole::KieServer), Some(1));
    }

    #[test]
    fn replicas_can_be_set_before_or_after_role() {
        let mut descriptor = TopologyDescriptor::new();
        descriptor.set_replicas(DeploymentRole::KieServer, 3);
        assert!(descriptor.contains(DeploymentRole::KieServer));
        assert_eq!(descriptor.replicas(DeploymentRole::KieServer), Some(3));
    }

    #[test]
    fn capability_table_gates_options() {
        let capabilities = BackendCapabilities::of([BackendOption::SsoDeployment]);
        assert!(capabilities.supports(BackendOption::SsoDeployment));
        assert!(!capabilities.supports(BackendOption::LdapRoleMapping));
    }
}
