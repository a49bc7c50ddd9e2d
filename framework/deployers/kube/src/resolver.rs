//! Service-name resolution: each role maps to a regex that is matched
//! against the live service listing of the project namespace. Exactly one
//! service must match; zero or several is an environment problem and fails
//! with the full candidate list in the message.
//!
//! Known risk, accepted: resolution is cached per handle, so a service
//! deleted and recreated under a coincidentally matching name after the
//! first lookup is not noticed.

use std::sync::LazyLock;

use kie_testing_core::{deployment::ResolutionError, topology::DeploymentRole};
use regex::Regex;

pub struct ServicePattern {
    pattern: &'static str,
    regex: Regex,
    /// Secondary secure services share the primary's suffix with a prefix;
    /// they must not shadow the primary match.
    exclude_prefix: Option<&'static str>,
}

impl ServicePattern {
    fn new(pattern: &'static str, exclude_prefix: Option<&'static str>) -> Self {
        Self {
            pattern,
            // Patterns are fixed literals; compilation cannot fail at runtime.
            regex: Regex::new(pattern).expect("role pattern is a valid regex"),
            exclude_prefix,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.pattern
    }

    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        if let Some(prefix) = self.exclude_prefix
            && name.starts_with(prefix)
        {
            return false;
        }
        self.regex.is_match(name)
    }
}

static WORKBENCH: LazyLock<ServicePattern> =
    LazyLock::new(|| ServicePattern::new(r"^.*-(rhpamcentr|rhdmcentr)$", Some("secure-")));
static KIE_SERVER: LazyLock<ServicePattern> =
    LazyLock::new(|| ServicePattern::new(r"^.*-(execserv|kieserver)$", Some("secure-")));
static SMART_ROUTER: LazyLock<ServicePattern> =
    LazyLock::new(|| ServicePattern::new(r"^.*-smartrouter$", None));
static DATABASE: LazyLock<ServicePattern> =
    LazyLock::new(|| ServicePattern::new(r"^.*-(mysql|postgresql)$", None));
static SSO: LazyLock<ServicePattern> =
    LazyLock::new(|| ServicePattern::new(r"^.*sso$", Some("secure-")));

#[must_use]
pub fn pattern_for(role: DeploymentRole) -> &'static ServicePattern {
    match role {
        DeploymentRole::Workbench => &WORKBENCH,
        DeploymentRole::KieServer => &KIE_SERVER,
        DeploymentRole::SmartRouter => &SMART_ROUTER,
        DeploymentRole::Database => &DATABASE,
        DeploymentRole::Sso => &SSO,
    }
}

/// Map `pattern` onto exactly one of `candidates`.
pub fn resolve(pattern: &ServicePattern, candidates: &[String]) -> Result<String, ResolutionError> {
    let matches: Vec<&String> = candidates
        .iter()
        .filter(|name| pattern.matches(name))
        .collect();
    match matches.as_slice() {
        [single] => Ok((*single).clone()),
        [] => Err(ResolutionError::NotFound {
            pattern: pattern.as_str().to_owned(),
            candidates: candidates.to_vec(),
        }),
        many => Err(ResolutionError::Ambiguous {
            pattern: pattern.as_str().to_owned(),
            matches: many.iter().map(|name| (*name).clone()).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn services(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| (*name).to_owned()).collect()
    }

    #[test]
    fn resolves_single_kie_server_service() {
        let candidates = services(&["myapp-rhpamcentr", "myapp-kieserver", "myapp-postgresql"]);
        let resolved = resolve(pattern_for(DeploymentRole::KieServer), &candidates).unwrap();
        assert_eq!(resolved, "myapp-kieserver");
    }

    #[test]
    fn secure_variant_does_not_shadow_the_console() {
        let candidates = services(&["secure-myapp-rhpamcentr", "myapp-rhpamcentr"]);
        let resolved = resolve(pattern_for(DeploymentRole::Workbench), &candidates).unwrap();
        assert_eq!(resolved, "myapp-rhpamcentr");
    }

    #[test]
    fn secure_variant_does_not_shadow_the_sso_service() {
        let candidates = services(&["secure-myapp-sso", "myapp-sso"]);
        let resolved = resolve(pattern_for(DeploymentRole::Sso), &candidates).unwrap();
        assert_eq!(resolved, "myapp-sso");
    }

    #[test]
    fn missing_service_reports_every_candidate() {
        let candidates = services(&["myapp-rhpamcentr", "myapp-postgresql"]);
        let error = resolve(pattern_for(DeploymentRole::SmartRouter), &candidates).unwrap_err();
        let message = error.to_string();
        assert!(message.contains("smartrouter"));
        assert!(message.contains("myapp-rhpamcentr, myapp-postgresql"));
    }

    #[test]
    fn two_matches_are_ambiguous() {
        let candidates = services(&["a-kieserver", "b-execserv"]);
        let error = resolve(pattern_for(DeploymentRole::KieServer), &candidates).unwrap_err();
        assert!(matches!(error, ResolutionError::Ambiguous { .. }));
        assert!(error.to_string().contains("a-kieserver, b-execserv"));
    }

    #[test]
    fn legacy_execserv_suffix_still_matches() {
        assert!(pattern_for(DeploymentRole::KieServer).matches("old-app-execserv"));
        assert!(pattern_for(DeploymentRole::Database).matches("old-app-mysql"));
        assert!(pattern_for(DeploymentRole::Workbench).matches("dm-app-rhdmcentr"));
    }
}
