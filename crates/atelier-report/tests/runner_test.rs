use std::time::Duration;

use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use atelier_client::{ApiClient, ClientConfig};
use atelier_report::{ResearchRequest, ResearchRunner, WorkflowEvent};

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(ClientConfig::new(server.uri())).unwrap()
}

#[tokio::test]
async fn delivers_events_in_order_and_stops_after_terminal() {
    let server = MockServer::start().await;
    // The backend keeps the connection open after `complete`; anything
    // that follows must not be delivered.
    let body = concat!(
        "data: {\"type\":\"node_start\",\"node\":\"initialize\",\"task_id\":\"t-5\"}\n",
        "data: {\"type\":\"node_end\",\"node\":\"initialize\",\"timestamp\":1000}\n",
        "data: {\"type\":\"complete\",\"task_id\":\"t-5\"}\n",
        "data: {\"type\":\"state_update\"}\n",
    );
    Mock::given(method("POST"))
        .and(path("/api/smartreport/deep-research/run"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let mut run = ResearchRunner::spawn(
        client_for(&server),
        ResearchRequest::new("写一份行业报告"),
    );

    let first = run.next_event().await.unwrap();
    assert!(matches!(first, WorkflowEvent::NodeStart { .. }));
    let second = run.next_event().await.unwrap();
    assert!(matches!(second, WorkflowEvent::NodeEnd { .. }));
    let third = run.next_event().await.unwrap();
    assert!(third.is_terminal());

    // Nothing after the terminal event.
    assert!(run.next_event().await.is_none());
}

#[tokio::test]
async fn open_failure_surfaces_as_single_error_event() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/smartreport/deep-research/run"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend down"))
        .mount(&server)
        .await;

    let mut run = ResearchRunner::spawn(
        client_for(&server),
        ResearchRequest::new("写一份行业报告"),
    );

    match run.next_event().await.unwrap() {
        WorkflowEvent::Error { error, .. } => {
            assert!(error.unwrap().contains("backend down"));
        }
        other => panic!("expected Error event, got {other:?}"),
    }
    assert!(run.next_event().await.is_none());
}

#[tokio::test]
async fn cancel_aborts_stream_and_notifies_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/smartreport/deep-research/run"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(30))
                .set_body_raw("data: {\"type\":\"complete\"}\n", "text/event-stream"),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/smartreport/deep-research/cancel"))
        .and(body_json(serde_json::json!({"task_id": "t-9"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let request = ResearchRequest::new("写一份行业报告").with_task_id("t-9");
    let mut run = ResearchRunner::spawn(client_for(&server), request);
    let handle = run.cancel_handle();

    handle.cancel().await;

    // The aborted forwarding task drops its sender; the stream ends
    // without a terminal event (cancellation is not an error).
    assert!(run.next_event().await.is_none());
    server.verify().await;
}
