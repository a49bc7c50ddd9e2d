use std::{env, path::PathBuf};

#[must_use]
pub fn namespace_prefix() -> Option<String> {
    env::var("KIE_TEST_NAMESPACE_PREFIX").ok()
}

#[must_use]
pub fn default_domain_suffix() -> Option<String> {
    env::var("KIE_TEST_DEFAULT_DOMAIN_SUFFIX").ok()
}

#[must_use]
pub fn app_user() -> Option<String> {
    env::var("KIE_TEST_APP_USER").ok()
}

#[must_use]
pub fn app_password() -> Option<String> {
    env::var("KIE_TEST_APP_PASSWORD").ok()
}

/// Keep namespaces and deployed resources after a run for inspection.
#[must_use]
pub fn preserve_projects() -> bool {
    env::var("KIE_TEST_PRESERVE_PROJECTS").is_ok_and(|v| v.eq_ignore_ascii_case("true"))
}

#[must_use]
pub fn log_dir() -> Option<PathBuf> {
    env::var("KIE_TEST_LOG_DIR").ok().map(PathBuf::from)
}

#[must_use]
pub fn workbench_image() -> Option<String> {
    env::var("KIE_TEST_WORKBENCH_IMAGE").ok()
}

#[must_use]
pub fn kie_server_image() -> Option<String> {
    env::var("KIE_TEST_KIE_SERVER_IMAGE").ok()
}

#[must_use]
pub fn smart_router_image() -> Option<String> {
    env::var("KIE_TEST_SMART_ROUTER_IMAGE").ok()
}

#[must_use]
pub fn database_image() -> Option<String> {
    env::var("KIE_TEST_DATABASE_IMAGE").ok()
}

#[must_use]
pub fn maven_repository_image() -> Option<String> {
    env::var("KIE_TEST_MAVEN_REPOSITORY_IMAGE").ok()
}

#[must_use]
pub fn ldap_image() -> Option<String> {
    env::var("KIE_TEST_LDAP_IMAGE").ok()
}

#[must_use]
pub fn sso_image() -> Option<String> {
    env::var("KIE_TEST_SSO_IMAGE").ok()
}

#[must_use]
pub fn rust_log() -> Option<String> {
    env::var("RUST_LOG").ok()
}
