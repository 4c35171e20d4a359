//! HTTP hub connector against a mock hub
//!
//! The mock serves the negotiate, send, poll, event-stream and abort routes
//! the connector talks to.

use hub_latency_tester::{
    connection::{Connection, Connector, HttpConnector},
    logging::{LogLevel, Logger},
    models::{HubFrame, Message},
    types::{TransportKind, TransportPreference},
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn connector() -> HttpConnector {
    let (logger, _capture) = Logger::capturing("http-test", LogLevel::Fatal);
    HttpConnector::new(Duration::from_secs(2), logger).unwrap()
}

async fn mount_negotiate(server: &MockServer, transports: &[&str]) {
    Mock::given(method("POST"))
        .and(path("/hub/negotiate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "connectionId": "abc",
            "availableTransports": transports,
        })))
        .mount(server)
        .await;
}

async fn mount_abort(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/hub/abort"))
        .and(query_param("id", "abc"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

fn message_frame(timestamp: u64) -> Value {
    let message = Message::new(timestamp, "hello".to_string()).to_value().unwrap();
    serde_json::to_value(HubFrame::single("message", message)).unwrap()
}

/// Wait until `received` holds at least `count` values
async fn wait_for(received: &Arc<Mutex<Vec<Value>>>, count: usize) -> Vec<Value> {
    for _ in 0..100 {
        {
            let values = received.lock().unwrap();
            if values.len() >= count {
                return values.clone();
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for {} deliveries", count);
}

#[tokio::test]
async fn test_negotiate_failure_is_connection_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hub/negotiate"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = connector()
        .open(&format!("{}/hub", server.uri()), TransportPreference::Auto)
        .await
        .err()
        .unwrap();
    assert_eq!(err.category(), "CONNECTION");
}

#[tokio::test]
async fn test_malformed_negotiate_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hub/negotiate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = connector()
        .open(&format!("{}/hub", server.uri()), TransportPreference::Auto)
        .await
        .err()
        .unwrap();
    assert_eq!(err.category(), "PROTOCOL");
}

#[tokio::test]
async fn test_explicit_transport_must_be_offered() {
    let server = MockServer::start().await;
    mount_negotiate(&server, &["longPolling"]).await;

    let err = connector()
        .open(&format!("{}/hub", server.uri()), TransportPreference::FullDuplexSocket)
        .await
        .err()
        .unwrap();
    assert_eq!(err.category(), "CONNECTION");
    assert!(err.to_string().contains("WebSockets"));
}

#[tokio::test]
async fn test_long_poll_round_trip() {
    let server = MockServer::start().await;
    mount_negotiate(&server, &["foreverFrame", "longPolling"]).await;
    mount_abort(&server).await;

    Mock::given(method("POST"))
        .and(path("/hub/send"))
        .and(query_param("id", "abc"))
        .and(body_partial_json(json!({"target": "Send"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    // First poll carries one broadcast, later polls idle
    Mock::given(method("GET"))
        .and(path("/hub/poll"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([message_frame(42)]))
                .set_delay(Duration::from_millis(100)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hub/poll"))
        .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_millis(200)))
        .mount(&server)
        .await;

    let connection = connector()
        .open(&format!("{}/hub", server.uri()), TransportPreference::Auto)
        .await
        .unwrap();
    assert_eq!(connection.id(), "abc");
    assert_eq!(connection.transport_kind(), TransportKind::LongPolling);

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    connection
        .subscribe("message", Arc::new(move |value| sink.lock().unwrap().push(value)))
        .await
        .unwrap();

    let payload = Message::new(7, "x".repeat(16)).to_value().unwrap();
    connection.invoke("Send", payload).await.unwrap();

    let values = wait_for(&received, 1).await;
    assert_eq!(Message::from_value(values[0].clone()).unwrap().timestamp, 42);

    connection.close().await.unwrap();
    assert!(connection.invoke("Send", json!({})).await.is_err());
}

#[tokio::test]
async fn test_rejected_send_is_send_error() {
    let server = MockServer::start().await;
    mount_negotiate(&server, &["longPolling"]).await;
    mount_abort(&server).await;
    Mock::given(method("GET"))
        .and(path("/hub/poll"))
        .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_millis(200)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/hub/send"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let connection = connector()
        .open(&format!("{}/hub", server.uri()), TransportPreference::LongPoll)
        .await
        .unwrap();

    let err = connection.invoke("Send", json!({"timestamp": 1, "body": ""})).await.unwrap_err();
    assert_eq!(err.category(), "SEND");
    connection.close().await.unwrap();
}

#[tokio::test]
async fn test_server_sent_events_delivery() {
    let server = MockServer::start().await;
    mount_negotiate(&server, &["serverSentEvents", "longPolling"]).await;
    mount_abort(&server).await;

    let body = format!(
        "data: {}\n\n: keep-alive\n\ndata: {}\n\n",
        message_frame(1),
        message_frame(2)
    );
    Mock::given(method("GET"))
        .and(path("/hub/sse"))
        .and(query_param("id", "abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body)
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&server)
        .await;

    let connection = connector()
        .open(&format!("{}/hub", server.uri()), TransportPreference::Auto)
        .await
        .unwrap();
    assert_eq!(connection.transport_kind(), TransportKind::ServerSentEvents);

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    connection
        .subscribe("message", Arc::new(move |value| sink.lock().unwrap().push(value)))
        .await
        .unwrap();

    let values = wait_for(&received, 2).await;
    let timestamps: Vec<u64> = values
        .into_iter()
        .map(|v| Message::from_value(v).unwrap().timestamp)
        .collect();
    assert_eq!(timestamps, vec![1, 2]);

    connection.close().await.unwrap();
}
