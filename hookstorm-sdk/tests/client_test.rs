use hookstorm_sdk::client::{ClientError, EndpointApi, HookstormClient};
use hookstorm_sdk::objects::CreateEndpointRequest;
use reqwest::StatusCode;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn endpoint_body(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": "Webhook Endpoint",
        "created_at": "2026-10-17T10:00:00Z",
        "expires_at": "2026-10-18T10:00:00Z",
        "event_count": 0,
        "url": format!("http://127.0.0.1:8080/hook/{id}")
    })
}

fn client_for(server: &MockServer) -> HookstormClient {
    HookstormClient::new(Url::parse(&server.uri()).unwrap())
}

#[tokio::test]
async fn create_endpoint_posts_name_and_normalizes_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/endpoints"))
        .and(body_json(json!({ "name": "Webhook Endpoint" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(endpoint_body("ep-1")))
        .expect(1)
        .mount(&server)
        .await;

    let endpoint = client_for(&server)
        .create_endpoint(&CreateEndpointRequest::new("Webhook Endpoint"))
        .await
        .unwrap();

    assert_eq!(endpoint.id, "ep-1");
    assert_eq!(endpoint.url, "http://127.0.0.1:8080/hook/ep-1");
}

#[tokio::test]
async fn create_endpoint_failure_is_generic_even_for_404() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/endpoints"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no route"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create_endpoint(&CreateEndpointRequest::new("x"))
        .await
        .unwrap_err();

    match err {
        ClientError::Api { status, body } => {
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body, "no route");
        }
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn get_endpoint_classifies_gone_and_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/endpoints/expired"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/endpoints/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/endpoints/broken"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .mount(&server)
        .await;

    let client = client_for(&server);

    let err = client.get_endpoint("expired").await.unwrap_err();
    assert!(matches!(err, ClientError::EndpointExpired));
    assert!(err.is_gone());

    let err = client.get_endpoint("missing").await.unwrap_err();
    assert!(matches!(err, ClientError::EndpointNotFound));
    assert!(err.is_gone());

    let err = client.get_endpoint("broken").await.unwrap_err();
    assert!(!err.is_gone());
    assert!(err.to_string().contains("503 Service Unavailable"));
}

#[tokio::test]
async fn get_events_keeps_arrival_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/endpoints/ep-1/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "a", "method": "POST", "received_at": "2026-10-17T10:00:00Z", "replay_count": 0 },
            { "id": "b", "method": "POST", "received_at": "2026-10-17T10:00:01Z", "replay_count": 3 }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/endpoints/gone/events"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let events = client.get_events("ep-1").await.unwrap();
    let ids: Vec<_> = events.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, ["a", "b"]);
    assert_eq!(events[1].replay_count, 3);

    let err = client.get_events("gone").await.unwrap_err();
    assert!(matches!(err, ClientError::EndpointExpired));
}

#[tokio::test]
async fn replay_rejects_malformed_target_without_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .replay_event("ep-1", "e1", "not a url")
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::InvalidTargetUrl(_)));
}

#[tokio::test]
async fn replay_trims_target_and_reads_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/endpoints/ep-1/events/e1/replay"))
        .and(body_json(json!({ "target_url": "https://x.test/h" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "replayed_at": "2026-10-17T10:00:00Z",
            "response_code": 204
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .replay_event("ep-1", "e1", "  https://x.test/h  ")
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.response_code, Some(204));
}

#[tokio::test]
async fn replay_sends_target_as_typed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/endpoints/ep-1/events/e1/replay"))
        .and(body_json(json!({ "target_url": "https://x.test" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .replay_event("ep-1", "e1", " https://x.test")
        .await
        .unwrap();

    assert!(outcome.success);
}

#[tokio::test]
async fn replay_with_empty_body_counts_as_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/endpoints/ep-1/events/e1/replay"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/endpoints/ep-2/events/e1/replay"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.replay_event("ep-1", "e1", "https://x.test/h").await.unwrap().success);

    let err = client
        .replay_event("ep-2", "e1", "https://x.test/h")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::EndpointNotFound));
}

#[tokio::test]
async fn trait_object_dispatches_to_http_client() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/endpoints/ep-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(endpoint_body("ep-1")))
        .expect(1)
        .mount(&server)
        .await;

    let api: Box<dyn EndpointApi> = Box::new(client_for(&server));
    let endpoint = api.get_endpoint("ep-1").await.unwrap();
    assert_eq!(endpoint.name, "Webhook Endpoint");
}
