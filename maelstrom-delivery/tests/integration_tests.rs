//! Integration tests for provider integrations, credentials and dispatch
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{sync::Arc, time::Duration};

use maelstrom_common::Message;
use maelstrom_delivery::{
    CredentialResolver, CredentialSource, DispatchError, Dispatcher, HealthMonitor,
    MetadataConfig, Provider, ProviderConfig, ProviderTimeouts, Registry, SharedSecret, Throttle,
    provider,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{
        basic_auth, bearer_token, body_partial_json, body_string_contains, header, method, path,
    },
};

fn provider_config(name: &str, server: &MockServer) -> ProviderConfig {
    ProviderConfig {
        name: name.to_string(),
        url: format!("{}/send", server.uri()),
        ping_url: format!("{}/ping", server.uri()),
        api_key: "key-123".to_string(),
        ping_key: "ping-456".to_string(),
    }
}

fn metadata_config(server: &MockServer) -> MetadataConfig {
    MetadataConfig {
        base_url: format!("{}/attributes", server.uri()),
        ..MetadataConfig::default()
    }
}

fn build(config: &ProviderConfig) -> Box<dyn Provider> {
    provider::build(config, &ProviderTimeouts::default())
        .unwrap()
        .expect("provider name should be recognised")
}

fn message() -> Message {
    Message::new(
        "sender@example.com",
        ["a@example.com", "c@example.com"],
        "Hello",
        "Body text",
    )
}

/// An address nothing is listening on
async fn refused_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/send")
}

#[tokio::test]
async fn test_mailgun_posts_form_with_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .and(basic_auth("api", "key-123"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("from=sender%40example.com"))
        .and(body_string_contains("to=a%40example.com"))
        .and(body_string_contains("to=c%40example.com"))
        .and(body_string_contains("subject=Hello"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mailgun = build(&provider_config("MailGun", &server));

    assert_eq!(mailgun.send(&message()).await, 200);
}

#[tokio::test]
async fn test_mailgun_passes_status_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let mailgun = build(&provider_config("MailGun", &server));

    assert_eq!(mailgun.send(&message()).await, 401);
}

#[tokio::test]
async fn test_mailgun_health_uses_ping_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .and(basic_auth("api", "ping-456"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mailgun = build(&provider_config("MailGun", &server));

    assert!(mailgun.health_check().await);
}

#[tokio::test]
async fn test_mailgun_health_requires_200() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let mailgun = build(&provider_config("MailGun", &server));

    assert!(!mailgun.health_check().await);
}

#[tokio::test]
async fn test_mandrill_posts_json_with_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .and(body_partial_json(json!({
            "key": "key-123",
            "message": {
                "from_email": "sender@example.com",
                "subject": "Hello",
            }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mandrill = build(&provider_config("Mandrill", &server));

    assert_eq!(mandrill.send(&message()).await, 200);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = requests[0].body_json().unwrap();
    assert_eq!(body["message"]["to"][1]["email"], "c@example.com");
}

#[tokio::test]
async fn test_mandrill_health_sends_ping_key_and_expects_pong() {
    let pong = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ping"))
        .and(body_partial_json(json!({ "key": "ping-456" })))
        .respond_with(ResponseTemplate::new(200).set_body_string("\"PONG!\""))
        .expect(1)
        .mount(&pong)
        .await;

    let mandrill = build(&provider_config("Mandrill", &pong));

    assert!(mandrill.health_check().await);

    let other = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Invalid API key"))
        .mount(&other)
        .await;

    let mandrill = build(&provider_config("Mandrill", &other));

    assert!(!mandrill.health_check().await);
}

#[tokio::test]
async fn test_sendgrid_uses_bearer_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .and(bearer_token("key-123"))
        .and(body_partial_json(json!({
            "personalizations": [{ "to": [{ "email": "a@example.com" }] }]
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .and(bearer_token("ping-456"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let sendgrid = build(&provider_config("SendGrid", &server));

    assert_eq!(sendgrid.send(&message()).await, 202);
    assert!(sendgrid.health_check().await);
}

#[tokio::test]
async fn test_transport_failure_is_500_and_unhealthy() {
    let url = refused_url().await;

    for name in ["MailGun", "Mandrill", "SendGrid"] {
        let provider = build(&ProviderConfig {
            name: name.to_string(),
            url: url.clone(),
            ping_url: url.clone(),
            ..ProviderConfig::default()
        });

        assert_eq!(provider.send(&message()).await, 500, "{name} send");
        assert!(!provider.health_check().await, "{name} health");
    }
}

#[tokio::test]
async fn test_metadata_supplies_provider_key_and_secret() {
    let metadata = MockServer::start().await;
    for attribute in ["/attributes/MailGun", "/attributes/emailPW"] {
        Mock::given(method("GET"))
            .and(path(attribute))
            .and(header("Metadata-Flavor", "Google"))
            .respond_with(ResponseTemplate::new(200).set_body_string("from-metadata\n"))
            .expect(1)
            .mount(&metadata)
            .await;
    }

    let resolver = CredentialResolver::new(CredentialSource::Metadata(MetadataConfig {
        base_url: format!("{}/attributes/", metadata.uri()),
        ..MetadataConfig::default()
    }))
    .unwrap();

    let config = ProviderConfig {
        name: "MailGun".to_string(),
        api_key: "from-config".to_string(),
        ..ProviderConfig::default()
    };

    assert_eq!(resolver.provider_credential(&config).await, "from-metadata");

    let secret = resolver.shared_secret(SharedSecret::new("configured")).await;
    assert!(secret.verify(Some("from-metadata")));
}

#[tokio::test]
async fn test_missing_metadata_falls_back_to_config() {
    let metadata = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&metadata)
        .await;

    let resolver =
        CredentialResolver::new(CredentialSource::Metadata(metadata_config(&metadata))).unwrap();

    let config = ProviderConfig {
        name: "MailGun".to_string(),
        api_key: "from-config".to_string(),
        ..ProviderConfig::default()
    };

    assert_eq!(resolver.provider_credential(&config).await, "from-config");

    let secret = resolver.shared_secret(SharedSecret::new("configured")).await;
    assert!(secret.verify(Some("configured")));
}

#[tokio::test]
async fn test_unreachable_metadata_falls_back_to_config() {
    let resolver = CredentialResolver::new(CredentialSource::Metadata(MetadataConfig {
        base_url: refused_url().await,
        ..MetadataConfig::default()
    }))
    .unwrap();

    let config = ProviderConfig {
        name: "SendGrid".to_string(),
        api_key: "from-config".to_string(),
        ..ProviderConfig::default()
    };

    assert_eq!(resolver.provider_credential(&config).await, "from-config");
}

#[tokio::test]
async fn test_duplicate_declarations_resolve_credentials_once() {
    let metadata = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/attributes/MailGun"))
        .respond_with(ResponseTemplate::new(200).set_body_string("from-metadata"))
        .expect(1)
        .mount(&metadata)
        .await;

    let resolver =
        CredentialResolver::new(CredentialSource::Metadata(metadata_config(&metadata))).unwrap();
    let configs = ["MailGun", "MailGun"].map(|name| ProviderConfig {
        name: name.to_string(),
        ..ProviderConfig::default()
    });

    let registry = Registry::from_config(&configs, &ProviderTimeouts::default(), &resolver)
        .await
        .unwrap();

    assert_eq!(registry.len(), 1);
    metadata.verify().await;
}

#[tokio::test]
async fn test_gateway_delivers_through_seeded_provider() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let configs = vec![
        provider_config("MailGun", &server),
        ProviderConfig {
            name: "Postmark".to_string(),
            ..ProviderConfig::default()
        },
    ];

    let timeouts = ProviderTimeouts::default();
    let resolver = CredentialResolver::new(CredentialSource::Config).unwrap();
    let registry = Arc::new(
        Registry::from_config(&configs, &timeouts, &resolver)
            .await
            .unwrap(),
    );

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.healthy_count(), 0);

    let monitor = HealthMonitor::new(
        Arc::clone(&registry),
        Duration::from_secs(60),
        timeouts.health_check(),
    );
    monitor.check_all().await;
    assert_eq!(registry.snapshot().get("MailGun"), Some(&true));

    let dispatcher = Dispatcher::new(
        Arc::clone(&registry),
        Throttle::new(1, Duration::from_secs(60)),
        SharedSecret::new("secret"),
        timeouts.send(),
    );

    let status = dispatcher
        .send_message(message(), Some("secret"))
        .await
        .unwrap();
    assert_eq!(status, 200);

    let throttled = dispatcher.send_message(message(), Some("secret")).await;
    assert!(matches!(throttled, Err(DispatchError::Throttled)));

    server.verify().await;
}

#[tokio::test]
async fn test_gateway_without_providers_never_calls_out() {
    let resolver = CredentialResolver::new(CredentialSource::Config).unwrap();
    let registry = Arc::new(
        Registry::from_config(&[], &ProviderTimeouts::default(), &resolver)
            .await
            .unwrap(),
    );

    let dispatcher = Dispatcher::new(
        registry,
        Throttle::new(5, Duration::from_secs(1)),
        SharedSecret::new("secret"),
        Duration::from_secs(5),
    );

    let result = dispatcher.send_message(message(), Some("secret")).await;

    let err = result.unwrap_err();
    assert!(matches!(err, DispatchError::Unavailable));
    assert_eq!(err.status(), 503);
}
