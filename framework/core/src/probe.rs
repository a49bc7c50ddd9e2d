use std::time::Duration;

use kie_testing_config::{constants, timeouts};
use reqwest::Client as ReqwestClient;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

/// Outcome of a single router reachability check.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RouterProbe {
    /// Some response other than the router's "still starting" page came
    /// back. Not necessarily healthy, but the route is propagated.
    Reachable,
    /// 503 plus the router's fixed body substring.
    NotServing,
    /// Request failed at the transport level.
    Unreachable,
}

pub async fn probe_router(client: &ReqwestClient, url: &Url) -> RouterProbe {
    let response = match client.get(url.clone()).send().await {
        Ok(response) => response,
        Err(err) => {
            debug!(%url, error = %err, "router probe request failed");
            return RouterProbe::Unreachable;
        }
    };

    if response.status().as_u16() != constants::ROUTER_NOT_SERVING_CODE {
        return RouterProbe::Reachable;
    }

    match response.text().await {
        Ok(body) if body.contains(constants::ROUTER_NOT_SERVING_MESSAGE) => RouterProbe::NotServing,
        // A 503 without the router page comes from the application itself.
        Ok(_) => RouterProbe::Reachable,
        Err(err) => {
            debug!(%url, error = %err, "failed to read router probe body");
            RouterProbe::Unreachable
        }
    }
}

/// Wait until the router exposes `url`, using the default probe bounds.
///
/// Best-effort by contract: route propagation delay is outside the
/// framework's control, so elapsing the bound logs a warning instead of
/// failing the deployment.
pub async fn wait_for_router(url: &Url) -> bool {
    wait_for_router_with(
        url,
        timeouts::router_wait_timeout(),
        timeouts::router_poll_interval(),
    )
    .await
}

/// Returns true when the route answered, false when the bound elapsed.
pub async fn wait_for_router_with(url: &Url, timeout: Duration, interval: Duration) -> bool {
    info!(%url, timeout_secs = timeout.as_secs_f32(), "waiting for router to expose url");
    let client = ReqwestClient::new();
    let mut elapsed = Duration::ZERO;

    while elapsed <= timeout {
        if probe_router(&client, url).await == RouterProbe::Reachable {
            return true;
        }
        sleep(interval).await;
        elapsed += interval;
    }

    warn!(%url, ?timeout, "router did not expose url within the probe window; continuing");
    false
}
