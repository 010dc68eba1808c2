// Integration tests for `HueClient` against a wiremock bridge.

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use huesync_api::{Error, HueClient, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, HueClient) {
    let server = MockServer::start().await;
    let client = HueClient::new(
        server.uri().parse().unwrap(),
        &TransportConfig::default(),
    )
    .unwrap();
    (server, client)
}

// ── Pairing ─────────────────────────────────────────────────────────

#[tokio::test]
async fn pair_happy_path() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api"))
        .and(body_json(json!({
            "devicetype": "huesync#device",
            "generateclientkey": true,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "success": {
                    "username": "U",
                    "clientkey": "0123456789ABCDEF0123456789ABCDEF",
                }
            }
        ])))
        .mount(&server)
        .await;

    let creds = client.pair().await.unwrap();
    assert_eq!(creds.application_key, "U");
    assert_eq!(creds.client_key, "0123456789ABCDEF0123456789ABCDEF");
}

#[tokio::test]
async fn pair_link_button_not_pressed() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "error": {
                    "type": 101,
                    "address": "",
                    "description": "link button not pressed",
                }
            }
        ])))
        .mount(&server)
        .await;

    let err = client.pair().await.unwrap_err();
    assert!(matches!(err, Error::LinkButtonNotPressed));
}

#[tokio::test]
async fn pair_other_bridge_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "error": {
                    "type": 7,
                    "description": "invalid value",
                }
            }
        ])))
        .mount(&server)
        .await;

    match client.pair().await.unwrap_err() {
        Error::Bridge { kind, description } => {
            assert_eq!(kind, 7);
            assert_eq!(description, "invalid value");
        }
        other => panic!("expected Error::Bridge, got {other:?}"),
    }
}

#[tokio::test]
async fn pair_empty_reply_is_malformed() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let err = client.pair().await.unwrap_err();
    assert!(matches!(err, Error::MalformedResponse(_)));
}

#[tokio::test]
async fn pair_reply_without_success_or_error_is_malformed() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{}])))
        .mount(&server)
        .await;

    let err = client.pair().await.unwrap_err();
    assert!(matches!(err, Error::MalformedResponse(_)));
}

// ── Entertainment areas ─────────────────────────────────────────────

#[tokio::test]
async fn entertainment_areas_decodes_channels_in_order() {
    let (server, client) = setup().await;

    let body = json!({
        "errors": [],
        "data": [
            {
                "id": "abcdefgh-1234-5678-9abc-def012345678",
                "type": "entertainment_configuration",
                "metadata": { "name": "TV Wall" },
                "configuration_type": "screen",
                "status": "inactive",
                "channels": [
                    { "channel_id": 3, "position": {} },
                    { "channel_id": 0, "position": {} },
                    { "channel_id": 7, "position": {} },
                ],
                "light_services": [
                    { "rid": "a", "rtype": "light" },
                    { "rid": "b", "rtype": "light" },
                ],
            }
        ]
    });

    Mock::given(method("GET"))
        .and(path("/clip/v2/resource/entertainment_configuration"))
        .and(header("hue-application-key", "app-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let areas = client.entertainment_areas("app-key").await.unwrap();
    assert_eq!(areas.len(), 1);

    let area = &areas[0];
    assert_eq!(area.id, "abcdefgh-1234-5678-9abc-def012345678");
    assert_eq!(area.name, "TV Wall");
    assert_eq!(area.kind, "screen");
    assert_eq!(area.status, "inactive");
    // Bridge order must survive decoding — the framer depends on it.
    assert_eq!(area.channel_ids, vec![3, 0, 7]);
    assert_eq!(area.light_count, 2);
    assert_eq!(area.to_string(), "TV Wall (3 channels, 2 lights)");
}

#[tokio::test]
async fn entertainment_areas_403_is_unauthorized() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/clip/v2/resource/entertainment_configuration"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = client.entertainment_areas("stale-key").await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized));
}

#[tokio::test]
async fn entertainment_areas_empty_data() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/clip/v2/resource/entertainment_configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let areas = client.entertainment_areas("app-key").await.unwrap();
    assert!(areas.is_empty());
}

// ── Activation ──────────────────────────────────────────────────────

#[tokio::test]
async fn activate_sends_start_action() {
    let (server, client) = setup().await;
    let area_id = uuid::Uuid::new_v4().to_string();

    Mock::given(method("PUT"))
        .and(path(format!(
            "/clip/v2/resource/entertainment_configuration/{area_id}"
        )))
        .and(header("hue-application-key", "app-key"))
        .and(body_json(json!({ "action": "start" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.activate("app-key", &area_id).await.unwrap();
}

#[tokio::test]
async fn deactivate_sends_stop_action() {
    let (server, client) = setup().await;
    let area_id = uuid::Uuid::new_v4().to_string();

    Mock::given(method("PUT"))
        .and(path(format!(
            "/clip/v2/resource/entertainment_configuration/{area_id}"
        )))
        .and(body_json(json!({ "action": "stop" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.deactivate("app-key", &area_id).await.unwrap();
}

#[tokio::test]
async fn activate_non_2xx_is_error() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client.activate("app-key", "some-area").await.unwrap_err();
    match err {
        Error::UnexpectedStatus { status } => assert_eq!(status, 500),
        other => panic!("expected Error::UnexpectedStatus, got {other:?}"),
    }
}
