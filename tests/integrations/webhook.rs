//! End-to-end test: registry, webhook server and a mock destination.

use alertrelay::config::ReceiverConfig;
use alertrelay::registry::Registry;
use alertrelay::server;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn webhook_payload(status: &str) -> serde_json::Value {
    json!({
        "version": "4",
        "groupKey": "{}:{alertname=\"HighLoad\"}",
        "status": status,
        "receiver": "upstream-name",
        "groupLabels": {},
        "commonLabels": {},
        "commonAnnotations": {},
        "externalURL": "https://alertmanager.example.com",
        "alerts": []
    })
}

fn receiver(name: &str, destination: &MockServer) -> ReceiverConfig {
    ReceiverConfig {
        name: name.to_string(),
        handler: "http".to_string(),
        params: json!({
            "url": format!("{}/hook", destination.uri()),
            "template": "{{status}}",
            "max_attempt_number": 1,
        }),
    }
}

/// Spawns the application router on an ephemeral port and returns its base URL.
async fn serve(registry: Registry) -> String {
    let app = server::router(Arc::new(registry), None);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Waits until the mock destination has seen `count` requests. Delivery is
/// fire-and-forget, so the 202 races the outbound request.
async fn wait_for_requests(destination: &MockServer, count: usize) {
    for _ in 0..100 {
        let received = destination
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0);
        if received >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("destination never received {count} request(s)");
}

#[tokio::test]
async fn delivers_the_rendered_notification() {
    let destination = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_string("firing"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&destination)
        .await;

    let registry = Registry::build(&[receiver("ops", &destination)]).unwrap();
    let base = serve(registry).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/v1/webhook/ops"))
        .json(&webhook_payload("firing"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);
    assert_eq!(response.text().await.unwrap(), "");

    wait_for_requests(&destination, 1).await;
}

#[tokio::test]
async fn unknown_receiver_gets_404_and_nothing_is_sent() {
    let destination = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&destination)
        .await;

    let registry = Registry::build(&[receiver("ops", &destination)]).unwrap();
    let base = serve(registry).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/v1/webhook/unknown"))
        .json(&webhook_payload("firing"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    assert!(response
        .text()
        .await
        .unwrap()
        .contains("Unknown receiver 'unknown'"));

    // Give a misrouted delivery a chance to show up before `expect(0)` is
    // verified on drop.
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test]
async fn unsupported_version_is_rejected() {
    let destination = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&destination)
        .await;

    let registry = Registry::build(&[receiver("ops", &destination)]).unwrap();
    let base = serve(registry).await;

    let mut payload = webhook_payload("firing");
    payload["version"] = json!("3");

    let response = reqwest::Client::new()
        .post(format!("{base}/v1/webhook/ops"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_client_error());

    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test]
async fn resolved_notifications_render_their_own_status() {
    let destination = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_string("resolved"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&destination)
        .await;

    let registry = Registry::build(&[receiver("ops", &destination)]).unwrap();
    let base = serve(registry).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/v1/webhook/ops"))
        .json(&webhook_payload("resolved"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);

    wait_for_requests(&destination, 1).await;
}
