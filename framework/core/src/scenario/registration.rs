use std::{sync::Arc, time::Duration};

use kie_testing_config::timeouts;
use reqwest::Client as ReqwestClient;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::deployment::{Deployment, DeploymentError};

const CONTROLLER_SERVERS_PATH: &str = "/rest/controller/management/servers";

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("console has no resolvable url to poll for server registration")]
    MissingConsoleUrl,
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error(
        "only {found} of {expected} servers registered with the controller within {timeout:?}"
    )]
    Timeout {
        expected: usize,
        found: usize,
        timeout: Duration,
    },
}

/// Post-deploy check: poll the console controller API until the expected
/// number of execution servers have self-registered.
///
/// Transport errors and non-success statuses keep the poll going; only the
/// elapsed bound fails, and that failure is hard (it fails the whole
/// deploy).
pub async fn wait_for_registered_servers(
    console: &Arc<dyn Deployment>,
    expected: usize,
) -> Result<(), RegistrationError> {
    let url = console
        .url()
        .await?
        .ok_or(RegistrationError::MissingConsoleUrl)?;
    let endpoint = format!(
        "{}{CONTROLLER_SERVERS_PATH}",
        url.as_str().trim_end_matches('/')
    );

    let timeout = timeouts::registration_timeout();
    let interval = timeouts::registration_poll_interval();
    info!(%endpoint, expected, "waiting for servers to register with the controller");

    let client = ReqwestClient::new();
    let mut elapsed = Duration::ZERO;
    let mut found = 0;

    while elapsed <= timeout {
        found = query_registered_servers(&client, &endpoint, console).await;
        if found >= expected {
            info!(found, "servers registered with the controller");
            return Ok(());
        }

        sleep(interval).await;
        elapsed += interval;
    }

    Err(RegistrationError::Timeout {
        expected,
        found,
        timeout,
    })
}

async fn query_registered_servers(
    client: &ReqwestClient,
    endpoint: &str,
    console: &Arc<dyn Deployment>,
) -> usize {
    let mut request = client
        .get(endpoint)
        .header(reqwest::header::ACCEPT, "application/json");
    if let Some(credentials) = console.credentials() {
        request = request.basic_auth(&credentials.username, Some(&credentials.password));
    }

    let body = match request.send().await {
        Ok(response) if response.status().is_success() => match response.json().await {
            Ok(body) => body,
            Err(err) => {
                debug!(error = %err, "controller response was not valid json");
                return 0;
            }
        },
        Ok(response) => {
            debug!(status = %response.status(), "controller not answering yet");
            return 0;
        }
        Err(err) => {
            debug!(error = %err, "controller poll failed");
            return 0;
        }
    };

    count_registered_servers(&body)
}

fn count_registered_servers(body: &serde_json::Value) -> usize {
    body.get("server-template")
        .and_then(serde_json::Value::as_array)
        .map_or(0, Vec::len)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::count_registered_servers;

    #[test]
    fn counts_server_templates() {
        let body = json!({
            "server-template": [
                {"server-id": "kie-server-1", "server-instances": []},
                {"server-id": "kie-server-2", "server-instances": []}
            ]
        });
        assert_eq!(count_registered_servers(&body), 2);
    }

    #[test]
    fn missing_template_array_counts_zero() {
        assert_eq!(count_registered_servers(&json!({})), 0);
        assert_eq!(
            count_registered_servers(&json!({"server-template": null})),
            0
        );
    }
}
