//! Keys and fixed values shared between the scenario builder and the
//! cluster-facing backends. The `env_keys` names are the configuration
//! surface of the deployed KIE containers themselves, so they must match
//! what the images expect verbatim.

/// Environment-variable keys consumed by the deployed workloads.
pub mod env_keys {
    pub const KIE_ADMIN_USER: &str = "KIE_ADMIN_USER";
    pub const KIE_ADMIN_PWD: &str = "KIE_ADMIN_PWD";
    pub const KIE_SERVER_ID: &str = "KIE_SERVER_ID";
    pub const KIE_SERVER_ROUTER_SERVICE: &str = "KIE_SERVER_ROUTER_SERVICE";

    pub const MAVEN_REPO_URL: &str = "MAVEN_REPO_URL";
    pub const MAVEN_REPO_USERNAME: &str = "MAVEN_REPO_USERNAME";
    pub const MAVEN_REPO_PASSWORD: &str = "MAVEN_REPO_PASSWORD";

    pub const AUTH_LDAP_URL: &str = "AUTH_LDAP_URL";
    pub const AUTH_LDAP_BIND_DN: &str = "AUTH_LDAP_BIND_DN";
    pub const AUTH_LDAP_BIND_CREDENTIAL: &str = "AUTH_LDAP_BIND_CREDENTIAL";
    pub const AUTH_ROLE_MAPPER_ROLES_PROPERTIES: &str = "AUTH_ROLE_MAPPER_ROLES_PROPERTIES";

    pub const SSO_URL: &str = "SSO_URL";
    pub const SSO_REALM: &str = "SSO_REALM";

    pub const DATASOURCE_DATABASE: &str = "KIE_SERVER_POSTGRESQL_DB";
    pub const DATASOURCE_USERNAME: &str = "KIE_SERVER_POSTGRESQL_USER";
    pub const DATASOURCE_PASSWORD: &str = "KIE_SERVER_POSTGRESQL_PWD";
    pub const EXTERNAL_DB_DRIVER: &str = "KIE_SERVER_EXTERNALDB_DRIVER";
    pub const EXTERNAL_DB_URL: &str = "KIE_SERVER_EXTERNALDB_URL";
}

/// Label attached to every workload the framework creates itself. Pod
/// listing follows the resolved service's own selector, so workloads
/// provisioned by other controllers need not carry this label.
pub const WORKLOAD_LABEL: &str = "kie.test/workload";

/// Label marking the role a workload plays in the topology.
pub const ROLE_LABEL: &str = "kie.test/role";

/// HAProxy route annotations honored by the OpenShift router.
pub const ROUTER_TIMEOUT_ANNOTATION: &str = "haproxy.router.openshift.io/timeout";
pub const ROUTER_BALANCE_ANNOTATION: &str = "haproxy.router.openshift.io/balance";

/// Status code the router returns while the backing pods are absent.
pub const ROUTER_NOT_SERVING_CODE: u16 = 503;

/// Body substring that distinguishes the router's "still starting" page from
/// an application-level 503.
pub const ROUTER_NOT_SERVING_MESSAGE: &str =
    "The application is currently not serving requests at this endpoint. It may not have been started or is still starting.";

/// Suffix appended to `{service}-{namespace}` when no concrete route exists
/// yet and a well-formed URL still has to be produced.
pub const DEFAULT_DOMAIN_SUFFIX: &str = ".apps.test.local";

pub const DEFAULT_APP_USER: &str = "adminUser";
pub const DEFAULT_APP_PASSWORD: &str = "adminUser1!";

/// Default container images, individually overridable through `kie-testing-env`.
pub mod images {
    pub const WORKBENCH: &str = "quay.io/kiegroup/business-central-workbench-showcase:latest";
    pub const KIE_SERVER: &str = "quay.io/kiegroup/kie-server-showcase:latest";
    pub const SMART_ROUTER: &str = "quay.io/kiegroup/kie-server-router:latest";
    pub const DATABASE: &str = "postgres:15";
    pub const MAVEN_REPOSITORY: &str = "sonatype/nexus3:latest";
    pub const LDAP: &str = "osixia/openldap:1.5.0";
    pub const SSO: &str = "quay.io/keycloak/keycloak:legacy";
}
