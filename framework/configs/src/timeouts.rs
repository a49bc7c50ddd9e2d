use std::{env, time::Duration};

pub const PODS_READY_TIMEOUT_SECS: u64 = 10 * 60;
pub const SERVICE_VISIBLE_TIMEOUT_SECS: u64 = 60;
pub const DEPENDENCY_READY_TIMEOUT_SECS: u64 = 5 * 60;
pub const REGISTRATION_TIMEOUT_SECS: u64 = 5 * 60;
pub const ROUTER_WAIT_SECS: u64 = 5;

pub const POLL_INTERVAL_SECS: u64 = 2;
pub const REGISTRATION_POLL_INTERVAL_SECS: u64 = 5;
pub const ROUTER_POLL_INTERVAL_MILLIS: u64 = 250;

fn env_duration(key: &str, default: u64) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default))
}

/// Hard bound for the pod-readiness wait behind `wait_for_scale`.
pub fn pods_ready_timeout() -> Duration {
    env_duration("KIE_TEST_PODS_READY_TIMEOUT_SECS", PODS_READY_TIMEOUT_SECS)
}

/// Short bound for the service-object existence wait during deploy.
pub fn service_visible_timeout() -> Duration {
    env_duration(
        "KIE_TEST_SERVICE_VISIBLE_TIMEOUT_SECS",
        SERVICE_VISIBLE_TIMEOUT_SECS,
    )
}

pub fn dependency_ready_timeout() -> Duration {
    env_duration(
        "KIE_TEST_DEPENDENCY_READY_TIMEOUT_SECS",
        DEPENDENCY_READY_TIMEOUT_SECS,
    )
}

/// Bound for the post-deploy controller registration check.
pub fn registration_timeout() -> Duration {
    env_duration(
        "KIE_TEST_REGISTRATION_TIMEOUT_SECS",
        REGISTRATION_TIMEOUT_SECS,
    )
}

/// Best-effort bound for the router reachability probe.
pub fn router_wait_timeout() -> Duration {
    env_duration("KIE_TEST_ROUTER_WAIT_SECS", ROUTER_WAIT_SECS)
}

pub fn poll_interval() -> Duration {
    Duration::from_secs(POLL_INTERVAL_SECS)
}

pub fn registration_poll_interval() -> Duration {
    Duration::from_secs(REGISTRATION_POLL_INTERVAL_SECS)
}

pub fn router_poll_interval() -> Duration {
    Duration::from_millis(ROUTER_POLL_INTERVAL_MILLIS)
}
