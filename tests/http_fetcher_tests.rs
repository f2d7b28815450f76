// reqwest-backed fetcher tests against a mock upstream
// Author: kelexine (https://github.com/kelexine)

use axum::http::{HeaderMap, Method};
use bytes::Bytes;
use folio_edge::config::{NetworkConfig, WorkerConfig, WorkerSettings};
use folio_edge::error::ProxyError;
use folio_edge::models::RequestDescriptor;
use folio_edge::network::{Fetcher, HttpFetcher};
use url::Url;

fn fetcher_for(upstream: Option<String>) -> HttpFetcher {
    let config = WorkerConfig {
        upstream_origin: upstream,
        ..WorkerConfig::default()
    };
    let settings = WorkerSettings::from_config(&config).unwrap();
    HttpFetcher::new(&NetworkConfig::default(), &settings).unwrap()
}

#[tokio::test]
async fn test_fetch_buffers_response() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/npm/chart.js")
        .with_status(200)
        .with_header("content-type", "application/javascript")
        .with_header("etag", "\"abc\"")
        .with_body("/* chart */")
        .create_async()
        .await;

    let fetcher = fetcher_for(None);
    let url = Url::parse(&format!("{}/npm/chart.js", server.url())).unwrap();
    let response = fetcher.fetch(&RequestDescriptor::get(url)).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, Bytes::from_static(b"/* chart */"));
    assert_eq!(response.header("content-type"), Some("application/javascript"));
    assert_eq!(response.header("etag"), Some("\"abc\""));
    assert_eq!(response.header("content-length"), None);
}

#[tokio::test]
async fn test_fetch_non_ok_is_not_an_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/missing.js")
        .with_status(404)
        .with_body("nope")
        .create_async()
        .await;

    let fetcher = fetcher_for(None);
    let url = Url::parse(&format!("{}/missing.js", server.url())).unwrap();
    let response = fetcher.fetch(&RequestDescriptor::get(url)).await.unwrap();

    assert_eq!(response.status, 404);
    assert!(!response.is_ok());
}

#[tokio::test]
async fn test_fetch_connection_refused_is_network_error() {
    // Grab a free port, then close it again
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let fetcher = fetcher_for(None);
    let url = Url::parse(&format!("http://127.0.0.1:{}/index.html", port)).unwrap();
    let result = fetcher.fetch(&RequestDescriptor::get(url)).await;

    assert!(matches!(result, Err(ProxyError::Network(_))));
}

#[tokio::test]
async fn test_same_origin_fetch_goes_to_upstream() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/index.html")
        .with_status(200)
        .with_body("<html></html>")
        .expect(1)
        .create_async()
        .await;

    let fetcher = fetcher_for(Some(server.url()));
    // Public URL; the fetcher must rewrite it to the upstream
    let url = Url::parse("http://localhost:8080/index.html").unwrap();
    let response = fetcher.fetch(&RequestDescriptor::get(url)).await.unwrap();

    assert_eq!(response.body, Bytes::from_static(b"<html></html>"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_forward_passes_method_and_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/portfolios")
        .match_body(r#"{"name":"Retirement"}"#)
        .with_status(201)
        .with_body(r#"{"id":7}"#)
        .expect(1)
        .create_async()
        .await;

    let fetcher = fetcher_for(None);
    let url = Url::parse(&format!("{}/api/portfolios", server.url())).unwrap();
    let request = RequestDescriptor::new(Method::POST, url, HeaderMap::new());

    let response = fetcher
        .forward(&request, Bytes::from_static(br#"{"name":"Retirement"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body, Bytes::from_static(br#"{"id":7}"#));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_outgoing_requests_carry_via() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/npm/chart.js")
        .match_header("via", mockito::Matcher::Regex("folio-edge/".to_string()))
        .with_status(200)
        .with_body("/* chart */")
        .create_async()
        .await;

    let fetcher = fetcher_for(None);
    let url = Url::parse(&format!("{}/npm/chart.js", server.url())).unwrap();
    let response = fetcher.fetch(&RequestDescriptor::get(url)).await.unwrap();

    assert_eq!(response.status, 200);
    mock.assert_async().await;
}
