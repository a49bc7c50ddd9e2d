//! Router probe behavior against a local HTTP stub: the fixed "not serving"
//! page keeps the wait going until its soft bound elapses, while any other
//! answer counts as reachable.

use std::{net::SocketAddr, time::Duration};

use kie_testing_config::constants;
use kie_testing_core::probe::wait_for_router_with;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};
use url::Url;

/// Serve a fixed HTTP response for every connection until the test ends.
async fn spawn_stub(status_line: &'static str, body: String) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let body = body.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                let response = format!(
                    "{status_line}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    addr
}

fn stub_url(addr: SocketAddr) -> Url {
    Url::parse(&format!("http://{addr}/")).unwrap()
}

#[tokio::test]
async fn persistent_not_serving_page_elapses_the_soft_bound() {
    let addr = spawn_stub(
        "HTTP/1.1 503 Service Unavailable",
        constants::ROUTER_NOT_SERVING_MESSAGE.to_owned(),
    )
    .await;

    let reachable = wait_for_router_with(
        &stub_url(addr),
        Duration::from_millis(400),
        Duration::from_millis(100),
    )
    .await;
    assert!(!reachable);
}

#[tokio::test]
async fn successful_response_is_reachable() {
    let addr = spawn_stub("HTTP/1.1 200 OK", "<html>console</html>".to_owned()).await;

    let reachable = wait_for_router_with(
        &stub_url(addr),
        Duration::from_secs(2),
        Duration::from_millis(100),
    )
    .await;
    assert!(reachable);
}

#[tokio::test]
async fn application_level_503_is_reachable() {
    // Same status code, but the body is the application's, not the router
    // page: the route is propagated.
    let addr = spawn_stub(
        "HTTP/1.1 503 Service Unavailable",
        "draining connections".to_owned(),
    )
    .await;

    let reachable = wait_for_router_with(
        &stub_url(addr),
        Duration::from_secs(2),
        Duration::from_millis(100),
    )
    .await;
    assert!(reachable);
}

#[tokio::test]
async fn unreachable_endpoint_elapses_the_soft_bound() {
    // Bind and drop so the port is very likely closed.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let reachable = wait_for_router_with(
        &stub_url(addr),
        Duration::from_millis(300),
        Duration::from_millis(100),
    )
    .await;
    assert!(!reachable);
}
