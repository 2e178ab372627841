#![allow(clippy::unwrap_used)]
// Integration tests for `ApicSession` using wiremock.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fabricbeat_api::transport::TransportConfig;
use fabricbeat_api::{ApicSession, Error, ManagedObject};

// ── Helpers ─────────────────────────────────────────────────────────

fn login_body() -> serde_json::Value {
    json!({
        "totalCount": "1",
        "imdata": [{
            "aaaLogin": {
                "attributes": {
                    "token": "deadbeef",
                    "refreshTimeoutSeconds": "600"
                }
            }
        }]
    })
}

async fn logged_in(server: &MockServer) -> ApicSession {
    let secret: secrecy::SecretString = "test-password".to_string().into();
    ApicSession::login(&server.uri(), "admin", secret, &TransportConfig::default())
        .await
        .unwrap()
}

fn login_mock() -> Mock {
    Mock::given(method("POST"))
        .and(path("/api/aaaLogin.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body()))
}

// ── Authentication tests ────────────────────────────────────────────

#[tokio::test]
async fn test_login_success() {
    let server = MockServer::start().await;
    login_mock().mount(&server).await;

    let session = logged_in(&server).await;
    assert!(session.is_connected());
}

#[tokio::test]
async fn test_login_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/aaaLogin.json"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let secret: secrecy::SecretString = "wrong-password".to_string().into();
    let result =
        ApicSession::login(&server.uri(), "admin", secret, &TransportConfig::default()).await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {:?}",
        result.err()
    );
}

// ── Fetch tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_class_decodes_tree() {
    let server = MockServer::start().await;
    login_mock().mount(&server).await;

    let envelope = json!({
        "totalCount": "1",
        "imdata": [{
            "vzFilter": {
                "attributes": { "name": "http", "dn": "uni/tn-common/flt-http" },
                "children": [{
                    "vzEntry": {
                        "attributes": {
                            "name": "tcp-80",
                            "prot": "tcp",
                            "sFromPort": "80",
                            "sToPort": "80"
                        }
                    }
                }]
            }
        }]
    });

    Mock::given(method("GET"))
        .and(path("/api/class/vzFilter.json"))
        .and(query_param("rsp-subtree", "children"))
        .and(query_param("rsp-subtree-class", "vzEntry"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&envelope))
        .mount(&server)
        .await;

    let session = logged_in(&server).await;
    let mos = session.fetch_class("vzFilter", &["vzEntry"]).await.unwrap();

    assert_eq!(mos.len(), 1);
    assert_eq!(mos[0].class(), "vzFilter");
    assert_eq!(mos[0].name(), Some("http"));
    let entries: Vec<&ManagedObject> = mos[0].children_of("vzEntry").collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].attr("sFromPort"), Some("80"));
}

#[tokio::test]
async fn test_fetch_class_empty_imdata_is_ok() {
    let server = MockServer::start().await;
    login_mock().mount(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/class/rtmapRule.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "totalCount": "0", "imdata": [] })),
        )
        .mount(&server)
        .await;

    let session = logged_in(&server).await;
    let mos = session.fetch_class("rtmapRule", &[]).await.unwrap();
    assert!(mos.is_empty());
}

#[tokio::test]
async fn test_fetch_mo_scopes_to_dn() {
    let server = MockServer::start().await;
    login_mock().mount(&server).await;

    let envelope = json!({
        "totalCount": "1",
        "imdata": [{
            "l3extOut": {
                "attributes": { "name": "CORE", "dn": "uni/tn-prod/out-CORE" },
                "children": [{
                    "l3extLNodeP": { "attributes": { "rn": "lnodep-BORDER" } }
                }]
            }
        }]
    });

    Mock::given(method("GET"))
        .and(path("/api/mo/uni/tn-prod/out-CORE.json"))
        .and(query_param("rsp-subtree", "children"))
        .and(query_param("rsp-subtree-class", "l3extLNodeP"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&envelope))
        .mount(&server)
        .await;

    let session = logged_in(&server).await;
    let mos = session
        .fetch_mo("uni/tn-prod/out-CORE", "l3extLNodeP")
        .await
        .unwrap();

    assert_eq!(mos.len(), 1);
    assert_eq!(
        mos[0].child_of("l3extLNodeP").and_then(|c| c.rn()),
        Some("lnodep-BORDER")
    );
}

#[tokio::test]
async fn test_controller_error_record() {
    let server = MockServer::start().await;
    login_mock().mount(&server).await;

    let envelope = json!({
        "totalCount": "1",
        "imdata": [{
            "error": {
                "attributes": { "code": "400", "text": "unknown class noSuchClass" }
            }
        }]
    });

    Mock::given(method("GET"))
        .and(path("/api/class/noSuchClass.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&envelope))
        .mount(&server)
        .await;

    let session = logged_in(&server).await;
    let result = session.fetch_class("noSuchClass", &[]).await;

    match result {
        Err(Error::Api { ref message }) => {
            assert!(message.contains("noSuchClass"), "got: {message}");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_session_expired_on_fetch() {
    let server = MockServer::start().await;
    login_mock().mount(&server).await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let session = logged_in(&server).await;
    let result = session.fetch_class("fabricNode", &[]).await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {:?}",
        result.err()
    );
}

// ── Refresh tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_fresh_session_does_not_reauthenticate() {
    let server = MockServer::start().await;
    // Exactly one login: the constructor's. Fetches inside the refresh
    // window must not re-issue the token.
    login_mock().expect(1).mount(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/class/fabricNode.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "totalCount": "0", "imdata": [] })),
        )
        .mount(&server)
        .await;

    let session = logged_in(&server).await;
    session.fetch_class("fabricNode", &[]).await.unwrap();
    session.fetch_class("fabricNode", &[]).await.unwrap();

    server.verify().await;
}

#[tokio::test]
async fn test_aged_session_reauthenticates_once() {
    let server = MockServer::start().await;
    // Two logins: the constructor's, then exactly one refresh when the
    // token has aged past the interval.
    login_mock().expect(2).mount(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/class/fabricNode.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "totalCount": "0", "imdata": [] })),
        )
        .mount(&server)
        .await;

    let session = logged_in(&server)
        .await
        .with_refresh_interval(Duration::from_millis(100));

    tokio::time::sleep(Duration::from_millis(150)).await;
    session.fetch_class("fabricNode", &[]).await.unwrap();

    server.verify().await;
}

#[tokio::test]
async fn test_refresh_failure_kills_session() {
    let server = MockServer::start().await;

    // First login succeeds; the refresh attempt is rejected.
    login_mock().up_to_n_times(1).mount(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/aaaLogin.json"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let session = logged_in(&server)
        .await
        .with_refresh_interval(Duration::ZERO);

    let result = session.fetch_class("fabricNode", &[]).await;
    assert!(
        matches!(result, Err(Error::Refresh { .. })),
        "expected Refresh error, got: {:?}",
        result.err()
    );
    assert!(!session.is_connected());

    // A dead session refuses further reads rather than limping on.
    let result = session.fetch_class("fabricNode", &[]).await;
    assert!(matches!(result, Err(Error::NotConnected)));
}

// ── Teardown tests ──────────────────────────────────────────────────

#[tokio::test]
async fn test_close_is_idempotent() {
    let server = MockServer::start().await;
    login_mock().mount(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/aaaLogout.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "imdata": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let session = logged_in(&server).await;
    session.close().await;
    session.close().await;

    assert!(!session.is_connected());
    server.verify().await;
}
