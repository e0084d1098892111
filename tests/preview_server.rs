// tests/preview_server.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::fs;
use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use assetwatch::errors::AssetwatchError;
use assetwatch::reload::server::CLIENT_PATH;
use assetwatch::reload::{serve, LiveReload, ReloadSignal, ServeOptions};
use assetwatch_test_utils::with_timeout;

type TestResult = Result<(), Box<dyn Error>>;

/// Minimal HTTP/1.1 GET; returns the status line and the body.
async fn get(addr: SocketAddr, path: &str) -> Result<(String, String), Box<dyn Error>> {
    let mut stream = TcpStream::connect(addr).await?;
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await?;

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await?;
    let raw = String::from_utf8_lossy(&raw).into_owned();

    let (head, body) = raw.split_once("\r\n\r\n").ok_or("malformed response")?;
    let status = head.lines().next().unwrap_or_default().to_string();
    Ok((status, body.to_string()))
}

fn options(base_dir: &std::path::Path) -> ServeOptions {
    ServeOptions {
        host: "127.0.0.1".to_string(),
        port: 0,
        base_dir: base_dir.to_path_buf(),
    }
}

#[tokio::test]
async fn serves_html_with_the_reload_client_injected() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    fs::write(
        dir.path().join("index.html"),
        "<html><body><h1>Home</h1></body></html>",
    )?;
    fs::create_dir_all(dir.path().join("assets/css"))?;
    fs::write(dir.path().join("assets/css/main.css"), "body{color:red}")?;

    let server = serve(&options(dir.path()), LiveReload::new()).await?;
    let addr = server.addr();

    let (status, body) = with_timeout(get(addr, "/")).await?;
    assert!(status.contains("200"), "status: {status}");
    assert!(body.contains("<h1>Home</h1>"));
    assert!(
        body.contains(&format!(r#"<script src="{CLIENT_PATH}"></script></body>"#)),
        "body: {body}"
    );

    let (status, body) = with_timeout(get(addr, "/assets/css/main.css")).await?;
    assert!(status.contains("200"), "status: {status}");
    assert_eq!(body, "body{color:red}");

    let (status, body) = with_timeout(get(addr, CLIENT_PATH)).await?;
    assert!(status.contains("200"), "status: {status}");
    assert!(body.contains("WebSocket"));

    let (status, _) = with_timeout(get(addr, "/missing.html")).await?;
    assert!(status.contains("404"), "status: {status}");

    with_timeout(server.shutdown()).await;
    Ok(())
}

#[tokio::test]
async fn a_taken_port_is_a_startup_error() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let first = serve(&options(dir.path()), LiveReload::new()).await?;
    let taken = ServeOptions {
        port: first.addr().port(),
        ..options(dir.path())
    };

    match serve(&taken, LiveReload::new()).await {
        Err(AssetwatchError::StartupError(msg)) => assert!(msg.contains("binding"), "got: {msg}"),
        Err(other) => panic!("expected StartupError, got {other:?}"),
        Ok(_) => panic!("second server bound an occupied port"),
    }

    first.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn reload_reaches_every_subscriber() {
    let live = LiveReload::new();
    let mut a = live.subscribe();
    let mut b = live.subscribe();
    assert_eq!(live.clients(), 2);

    live.notify();
    with_timeout(a.recv()).await.unwrap();
    with_timeout(b.recv()).await.unwrap();

    drop(a);
    drop(b);
    // No subscribers left: still fine.
    live.notify();
    assert_eq!(live.clients(), 0);
}
