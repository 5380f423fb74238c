//! Contract tests for MailerClient against a mock relay.

use fest_mailer::{approval_email, rejection_email, MailerClient, MailerConfig, MailerError};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zeroize::Zeroizing;

fn test_client(mock_server: &MockServer, token: Option<&str>) -> MailerClient {
    let mut config = MailerConfig::new(mock_server.uri().parse().unwrap());
    config.api_token = token.map(|t| Zeroizing::new(t.to_string()));
    config.from = "tickets@dreamfest.in".into();
    config.timeout_secs = 5;
    MailerClient::new(config).unwrap()
}

#[tokio::test]
async fn send_posts_message_with_bearer_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("authorization", "Bearer relay-token"))
        .and(body_partial_json(serde_json::json!({
            "to": "asha@college.edu",
            "subject": "Your Ticket is Successfully Created!",
            "attachments": [{"filename": "qrcode.png", "content_id": "qrcode"}]
        })))
        .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({"id": "msg-1"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server, Some("relay-token"));
    let mail = approval_email(
        client.from_address(),
        "asha@college.edu",
        "Asha",
        "DreamFest",
        "iVBORw0KGgo=",
    );
    let sent = client.send(&mail).await.unwrap();
    assert_eq!(sent.id.as_deref(), Some("msg-1"));
}

#[tokio::test]
async fn send_without_token_omits_authorization() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server, None);
    let mail = rejection_email(client.from_address(), "asha@college.edu", "Asha", "DreamFest");
    let sent = client.send(&mail).await.unwrap();
    assert!(sent.id.is_none());

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn relay_error_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(503).set_body_string("relay overloaded"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server, None);
    let mail = rejection_email(client.from_address(), "asha@college.edu", "Asha", "DreamFest");
    match client.send(&mail).await {
        Err(MailerError::Relay { status, body, .. }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "relay overloaded");
        }
        other => panic!("expected relay error, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_ack_is_deserialization_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server, None);
    let mail = rejection_email(client.from_address(), "asha@college.edu", "Asha", "DreamFest");
    assert!(matches!(
        client.send(&mail).await,
        Err(MailerError::Deserialization { .. })
    ));
}
