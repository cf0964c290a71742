//! End-to-end tests for the forwarding pipeline.

use std::time::Duration;

use cors_relay::config::RelayConfig;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::{Method, StatusCode};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

mod common;

use common::{client, start_mock_target, start_relay, CannedResponse};

const ALLOW_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";

#[tokio::test]
async fn get_is_relayed_with_cors_and_without_csp() {
    let (target, mut received) = start_mock_target(CannedResponse {
        status: 200,
        reason: "OK",
        headers: vec![
            ("Content-Type", "text/plain"),
            ("Content-Security-Policy", "default-src 'none'"),
            ("Content-Security-Policy-Report-Only", "default-src 'self'"),
            ("Access-Control-Allow-Origin", "https://owner.example"),
            ("X-Target", "yes"),
        ],
        body: "hello from target",
    })
    .await;
    let (relay, shutdown) = start_relay(RelayConfig::default()).await;

    let res = client()
        .get(format!("http://{relay}/?url=http://{target}/page?q=1"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let headers = res.headers().clone();
    assert!(!headers.contains_key("content-security-policy"));
    assert!(!headers.contains_key("content-security-policy-report-only"));
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], ALLOW_METHODS);
    assert_eq!(headers["access-control-allow-headers"], "*");
    assert_eq!(headers["x-target"], "yes");
    assert_eq!(res.text().await.unwrap(), "hello from target");

    let captured = received.recv().await.unwrap();
    assert_eq!(captured.method, "GET");
    assert_eq!(captured.target, "/page?q=1");

    shutdown.trigger();
}

#[tokio::test]
async fn identity_headers_are_not_forwarded() {
    let (target, mut received) = start_mock_target(CannedResponse::ok("ok")).await;
    let (relay, shutdown) = start_relay(RelayConfig::default()).await;

    client()
        .get(format!("http://{relay}/?url=http://{target}/"))
        .header("Origin", "https://caller.example")
        .header("Referer", "https://caller.example/page")
        .header("X-Forwarded-For", "203.0.113.7")
        .header("CF-Connecting-IP", "203.0.113.7")
        .header("Authorization", "Bearer token")
        .header("X-Custom", "kept")
        .send()
        .await
        .unwrap();

    let captured = received.recv().await.unwrap();
    for name in ["origin", "referer", "x-forwarded-for", "cf-connecting-ip"] {
        assert!(captured.header(name).is_none(), "{name} was forwarded");
    }
    assert_eq!(captured.header("host"), Some(target.to_string().as_str()));
    assert_eq!(captured.header("authorization"), Some("Bearer token"));
    assert_eq!(captured.header("x-custom"), Some("kept"));
    assert!(captured.header("x-request-id").is_some());

    shutdown.trigger();
}

#[tokio::test]
async fn redirects_are_relayed_not_followed() {
    let (target, mut received) = start_mock_target(CannedResponse {
        status: 302,
        reason: "Found",
        headers: vec![("Location", "https://example.org/x")],
        body: "moved",
    })
    .await;
    let (relay, shutdown) = start_relay(RelayConfig::default()).await;

    let res = client()
        .get(format!("http://{relay}/?url=http://{target}/old"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers()["location"], "https://example.org/x");
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    assert_eq!(res.text().await.unwrap(), "moved");

    received.recv().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(received.try_recv().is_err(), "relay chased the redirect");

    shutdown.trigger();
}

#[tokio::test]
async fn get_never_forwards_a_body() {
    let (target, mut received) = start_mock_target(CannedResponse::ok("ok")).await;
    let (relay, shutdown) = start_relay(RelayConfig::default()).await;

    client()
        .get(format!("http://{relay}/?url=http://{target}/"))
        .body("abnormal payload")
        .send()
        .await
        .unwrap();

    let captured = received.recv().await.unwrap();
    assert_eq!(captured.method, "GET");
    assert!(captured.body.is_empty());
    assert!(captured.header("content-length").is_none());

    shutdown.trigger();
}

#[tokio::test]
async fn payload_methods_forward_their_body() {
    let (target, mut received) = start_mock_target(CannedResponse::ok("ok")).await;
    let (relay, shutdown) = start_relay(RelayConfig::default()).await;

    for method in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
        let res = client()
            .request(method.clone(), format!("http://{relay}/?url=http://{target}/submit"))
            .header("Content-Type", "application/json")
            .body(r#"{"hello":"world"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let captured = received.recv().await.unwrap();
        assert_eq!(captured.method, method.as_str());
        assert_eq!(captured.header("content-type"), Some("application/json"));
        assert_eq!(captured.body, br#"{"hello":"world"}"#);
    }

    shutdown.trigger();
}

#[tokio::test]
async fn non_standard_methods_are_copied() {
    let (target, mut received) = start_mock_target(CannedResponse::ok("ok")).await;
    let (relay, shutdown) = start_relay(RelayConfig::default()).await;

    let purge = Method::from_bytes(b"PURGE").unwrap();
    client()
        .request(purge, format!("http://{relay}/?url=http://{target}/cache"))
        .send()
        .await
        .unwrap();

    assert_eq!(received.recv().await.unwrap().method, "PURGE");

    shutdown.trigger();
}

#[tokio::test]
async fn path_form_target_is_decoded() {
    let (target, mut received) = start_mock_target(CannedResponse::ok("via path")).await;
    let (relay, shutdown) = start_relay(RelayConfig::default()).await;

    let encoded = utf8_percent_encode(&format!("http://{target}/some/path?x=1"), NON_ALPHANUMERIC).to_string();
    let res = client()
        .get(format!("http://{relay}/proxy/{encoded}"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "via path");
    assert_eq!(received.recv().await.unwrap().target, "/some/path?x=1");

    shutdown.trigger();
}

#[tokio::test]
async fn error_statuses_pass_through() {
    let (target, _received) = start_mock_target(CannedResponse {
        status: 404,
        reason: "Not Found",
        headers: Vec::new(),
        body: "no such page",
    })
    .await;
    let (relay, shutdown) = start_relay(RelayConfig::default()).await;

    let res = client()
        .get(format!("http://{relay}/?url=http://{target}/missing"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    assert_eq!(res.text().await.unwrap(), "no such page");

    shutdown.trigger();
}

#[tokio::test]
async fn target_reason_phrase_reaches_the_caller() {
    let (target, _received) = start_mock_target(CannedResponse {
        status: 200,
        reason: "Totally Fine",
        headers: Vec::new(),
        body: "ok",
    })
    .await;
    let (relay, shutdown) = start_relay(RelayConfig::default()).await;

    let mut stream = tokio::net::TcpStream::connect(relay).await.unwrap();
    let request = format!(
        "GET /?url=http://{target}/ HTTP/1.1\r\nHost: {relay}\r\nConnection: close\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut status_line = String::new();
    BufReader::new(stream).read_line(&mut status_line).await.unwrap();
    assert_eq!(status_line.trim_end(), "HTTP/1.1 200 Totally Fine");

    shutdown.trigger();
}

#[tokio::test]
async fn options_never_contacts_the_target() {
    let (target, mut received) = start_mock_target(CannedResponse::ok("should not be seen")).await;
    let (relay, shutdown) = start_relay(RelayConfig::default()).await;

    let res = client()
        .request(Method::OPTIONS, format!("http://{relay}/?url=http://{target}/"))
        .header("Access-Control-Request-Method", "PUT")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(res.headers()["access-control-allow-methods"], ALLOW_METHODS);
    assert!(res.text().await.unwrap().is_empty());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(received.try_recv().is_err());

    shutdown.trigger();
}

#[tokio::test]
async fn caller_mistakes_are_400() {
    let (relay, shutdown) = start_relay(RelayConfig::default()).await;

    let res = client().get(format!("http://{relay}/nothing/here")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        res.text().await.unwrap(),
        "Missing target url (use ?url=... or /proxy/...)"
    );

    let res = client()
        .get(format!("http://{relay}/?url=not%20a%20url"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.text().await.unwrap(), "Invalid target URL");

    shutdown.trigger();
}

#[tokio::test]
async fn unreachable_target_is_500() {
    let unused = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = unused.local_addr().unwrap();
    drop(unused);

    let (relay, shutdown) = start_relay(RelayConfig::default()).await;
    let res = client()
        .get(format!("http://{relay}/?url=http://{dead}/"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(res.text().await.unwrap().starts_with("Proxy error: "));

    shutdown.trigger();
}
