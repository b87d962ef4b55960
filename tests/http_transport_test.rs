use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use aqi_dashboard::{HttpTransport, Transport, UpstreamError};
use axum::{http::HeaderMap, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};

/// Upstream stand-in with one route per failure shape.
async fn spawn_upstream() -> Result<String> {
    // ---
    let app = Router::new()
        .route(
            "/measurements",
            get(|headers: HeaderMap| async move {
                let key = headers
                    .get("x-api-key")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                Json(json!({ "results": [], "api_key": key }))
            }),
        )
        .route(
            "/limited",
            get(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        )
        .route("/garbage", get(|| async { "<html>not json</html>" }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!({ "results": [] }))
            }),
        );

    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(format!("http://{}", addr))
}

fn transport(base: &str, api_key: Option<&str>) -> HttpTransport {
    HttpTransport::new(base, api_key.map(str::to_string), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn api_key_header_sent_only_when_configured() -> Result<()> {
    // ---
    let base = spawn_upstream().await?;

    let body: Value = transport(&base, Some("sekret")).get_json("measurements", &[]).await?;
    assert_eq!(body["api_key"], "sekret");

    let body: Value = transport(&base, None).get_json("measurements", &[]).await?;
    assert_eq!(body["api_key"], Value::Null);

    let body: Value = transport(&base, Some("")).get_json("measurements", &[]).await?;
    assert_eq!(body["api_key"], Value::Null);

    Ok(())
}

#[tokio::test]
async fn trailing_slash_in_base_url_is_ignored() -> Result<()> {
    // ---
    let base = spawn_upstream().await?;
    let http = transport(&format!("{}/", base), None);

    assert_eq!(http.base_url(), base);
    assert!(http.get_json("measurements", &[("limit", "1".to_string())]).await.is_ok());

    Ok(())
}

#[tokio::test]
async fn non_success_status_is_reported_with_code() -> Result<()> {
    // ---
    let base = spawn_upstream().await?;

    let err = transport(&base, None).get_json("limited", &[]).await.unwrap_err();
    assert_eq!(err.status(), Some(429));
    assert!(!err.is_network());
    assert!(err.to_string().contains("Too Many Requests"), "{err}");

    Ok(())
}

#[tokio::test]
async fn non_json_body_is_malformed() -> Result<()> {
    // ---
    let base = spawn_upstream().await?;

    let err = transport(&base, None).get_json("garbage", &[]).await.unwrap_err();
    assert!(matches!(err, UpstreamError::Malformed(_)), "{err}");

    Ok(())
}

#[tokio::test]
async fn connection_failure_is_a_transport_error() -> Result<()> {
    // ---
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let err = transport(&format!("http://{}", addr), None)
        .get_json("measurements", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, UpstreamError::Transport(_)), "{err}");
    assert!(err.is_network());

    Ok(())
}

#[tokio::test]
async fn timeout_is_a_transport_error() -> Result<()> {
    // ---
    let base = spawn_upstream().await?;
    let http = HttpTransport::new(base, None, Duration::from_millis(200))?;

    let err = http.get_json("slow", &[]).await.unwrap_err();
    assert!(err.is_network(), "{err}");

    Ok(())
}
