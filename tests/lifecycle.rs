//! Startup and graceful shutdown against a real listener.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

use hello_service::config::Config;
use hello_service::lifecycle::{DrainOutcome, LifecycleState};
use hello_service::server::start;

fn local_config(dsn: &str) -> Config {
    Config {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: Some(0),
        db_connect_timeout_secs: 1,
        ..Config::with_dsn(dsn)
    }
}

/// Send a raw HTTP/1.1 request and return the full response text.
async fn raw_request(addr: std::net::SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn serves_requests_and_stops_cleanly() {
    let server = start(&local_config("memory://"), None).await.unwrap();
    assert_eq!(server.lifecycle().state(), LifecycleState::Serving);
    let addr = server.local_addr();
    let lifecycle = server.lifecycle().clone();

    let body = r#"{"message":"over the wire"}"#;
    let created = raw_request(
        addr,
        &format!(
            "POST /hello HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        ),
    )
    .await;
    assert!(created.starts_with("HTTP/1.1 201"), "{created}");
    assert!(created.ends_with(r#"{"data":{"id":1,"message":"over the wire"}}"#), "{created}");

    let health = raw_request(
        addr,
        "GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert!(health.starts_with("HTTP/1.1 200"), "{health}");

    let (tx, rx) = oneshot::channel::<()>();
    let stopping = tokio::spawn(server.shutdown_on(async {
        rx.await.ok();
    }));
    tx.send(()).unwrap();

    let outcome = tokio::time::timeout(Duration::from_secs(5), stopping)
        .await
        .expect("shutdown should finish well within the drain timeout")
        .unwrap()
        .unwrap();
    assert_eq!(outcome, DrainOutcome::Completed);
    assert_eq!(lifecycle.state(), LifecycleState::Stopped);

    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn stalled_connection_is_abandoned_after_drain_timeout() {
    let server = start(&local_config("memory://"), None)
        .await
        .unwrap()
        .with_drain_timeout(Duration::from_millis(200));
    let addr = server.local_addr();

    // Headers never finish, so the connection stays open through shutdown.
    let mut stalled = TcpStream::connect(addr).await.unwrap();
    stalled
        .write_all(b"POST /hello HTTP/1.1\r\nHost: localhost\r\nContent-Length: 100\r\n\r\n{")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let outcome = tokio::time::timeout(Duration::from_secs(5), server.shutdown_on(async {}))
        .await
        .expect("drain must be bounded")
        .unwrap();
    assert!(matches!(outcome, DrainOutcome::TimedOut { .. }), "{outcome:?}");
}

#[tokio::test]
async fn unreachable_database_is_fatal() {
    let result = start(&local_config("postgres://nobody@127.0.0.1:1/none"), None).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn malformed_connection_string_is_fatal() {
    let result = start(&local_config("::not a dsn::"), None).await;
    assert!(result.is_err());
}
