use kie_testing_config::constants;
use uuid::Uuid;

/// Username/password pair injected into deployed workloads and used by REST
/// clients talking to them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Explicit per-run configuration handed to every scenario builder.
///
/// Replaces the ambient "active test profile" globals of older harnesses:
/// two contexts in the same process can point at different clusters or
/// products without interfering.
#[derive(Clone, Debug)]
pub struct TestContext {
    namespace_prefix: Option<String>,
    domain_suffix: String,
    app_credentials: Credentials,
}

impl TestContext {
    #[must_use]
    pub fn new(app_credentials: Credentials) -> Self {
        Self {
            namespace_prefix: None,
            domain_suffix: constants::DEFAULT_DOMAIN_SUFFIX.to_owned(),
            app_credentials,
        }
    }

    /// Build a context from `KIE_TEST_*` environment variables, falling back
    /// to the framework defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let credentials = Credentials::new(
            kie_testing_env::app_user().unwrap_or_else(|| constants::DEFAULT_APP_USER.to_owned()),
            kie_testing_env::app_password()
                .unwrap_or_else(|| constants::DEFAULT_APP_PASSWORD.to_owned()),
        );

        let mut context = Self::new(credentials);
        context.namespace_prefix = kie_testing_env::namespace_prefix();
        if let Some(suffix) = kie_testing_env::default_domain_suffix() {
            context.domain_suffix = suffix;
        }
        context
    }

    #[must_use]
    pub fn with_namespace_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.namespace_prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn with_domain_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.domain_suffix = suffix.into();
        self
    }

    #[must_use]
    pub fn app_credentials(&self) -> &Credentials {
        &self.app_credentials
    }

    #[must_use]
    pub fn domain_suffix(&self) -> &str {
        &self.domain_suffix
    }

    /// Generate a short unique project name. Route hostnames embed the
    /// namespace and must stay under the 63-character DNS label limit, so
    /// only a 4-character slice of the uuid is used.
    #[must_use]
    pub fn generate_project_name(&self) -> String {
        let id: String = Uuid::new_v4().simple().to_string().chars().take(4).collect();
        match &self.namespace_prefix {
            Some(prefix) => format!("{prefix}-{id}"),
            None => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_name_carries_prefix() {
        let context = TestContext::new(Credentials::new("user", "pass"))
            .with_namespace_prefix("kie-tests");
        let name = context.generate_project_name();
        assert!(name.starts_with("kie-tests-"));
        assert_eq!(name.len(), "kie-tests-".len() + 4);
    }

    #[test]
    fn project_names_are_unique() {
        let context = TestContext::new(Credentials::new("user", "pass"));
        assert_ne!(
            context.generate_project_name(),
            context.generate_project_name()
        );
    }
}
