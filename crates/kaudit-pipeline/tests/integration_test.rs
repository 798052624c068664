//! Integration tests for the auditing pipeline.
//!
//! Requests are built with `kaudit-test` fixtures and run through the
//! interceptor, capture and finalizer the way a host server would.

use std::convert::Infallible;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, Response, StatusCode};
use kaudit_core::{AuditLevel, PolicyConfig, RequestInfo, DEFAULT_POLICY_NAME};
use kaudit_event::{EventDispatcher, InMemoryBackend, Stage};
use kaudit_pipeline::{
    source_ips, AuditLayer, Auditing, AuditingConfig, CapturedResponse, InMemoryPolicyStore,
    MemoryResponse, ResponseCapture, ResponseWriter,
};
use kaudit_test::fixtures::WORKSPACES_PATH;
use kaudit_test::{
    assert_absent, parse_event, policy, policy_store_yaml, workspace_create_info, MockUser,
    RequestBuilder,
};
use proptest::prelude::*;
use tower::{service_fn, Layer, ServiceExt};

fn pipeline(policies: Vec<PolicyConfig>) -> (Arc<Auditing>, Arc<InMemoryBackend>) {
    let store = Arc::new(InMemoryPolicyStore::with_policies(policies));
    let backend = Arc::new(InMemoryBackend::new());
    let dispatcher = EventDispatcher::builder()
        .with_backend(backend.clone())
        .build();
    let auditing = Auditing::new(&AuditingConfig::default(), store, dispatcher)
        .expect("default config is valid");
    (Arc::new(auditing), backend)
}

fn admin_request() -> Request<Body> {
    RequestBuilder::new()
        .method("POST")
        .uri(format!("{WORKSPACES_PATH}?dryRun=All"))
        .client_ip("192.168.0.2")
        .build()
}

// ===== Literal Scenarios =====

#[test]
fn test_request_response_level_entry() {
    let (auditing, _) = pipeline(vec![policy(AuditLevel::RequestResponse)]);
    let user = MockUser::admin();

    let pending = auditing.on_request_received(&admin_request(), Some(&user), None);

    assert_eq!(pending.level(), AuditLevel::RequestResponse);
    assert_eq!(pending.user().username, "admin");
    assert_eq!(pending.user().groups, vec!["system"]);
    assert_eq!(pending.source_ips(), ["192.168.0.2"]);
    assert!(pending.stage().is_none());
    assert!(pending.can_record_request_object());
    assert!(pending.can_record_response_object());

    let event = auditing.on_response_complete(
        pending,
        CapturedResponse::with_status(StatusCode::OK),
        &workspace_create_info(),
    );
    assert_eq!(event.stage(), Some(Stage::ResponseComplete));
}

#[test]
fn test_metadata_level_workspace_create() {
    let (auditing, _) = pipeline(vec![policy(AuditLevel::Metadata)]);
    let user = MockUser::admin();

    let pending = auditing.on_request_received(&admin_request(), Some(&user), None);
    let mut capture = ResponseCapture::new(MemoryResponse::new());
    capture.write_header(StatusCode::OK);
    let (_, captured) = capture.into_parts();

    let event = auditing.on_response_complete(pending, captured, &workspace_create_info());
    let value = parse_event(&event.to_json().unwrap());

    assert_eq!(value["level"], "Metadata");
    assert_eq!(value["stage"], "ResponseComplete");
    assert_eq!(value["verb"], "create");
    assert_eq!(value["requestURI"], WORKSPACES_PATH);
    assert_eq!(value["responseStatus"]["code"], 200);
    assert_eq!(value["sourceIPs"], serde_json::json!(["192.168.0.2"]));
    assert_eq!(
        value["objectRef"],
        serde_json::json!({
            "resource": "workspaces",
            "name": "test",
            "apiGroup": "tenant.kubesphere.io",
            "apiVersion": "v1alpha2"
        })
    );
    assert_absent(&value, &["requestObject", "responseObject"]);
}

// ===== Event Identity =====

#[test]
fn test_audit_id_and_level_stable_across_finalization() {
    let (auditing, _) = pipeline(vec![policy(AuditLevel::Request)]);

    let pending = auditing.on_request_received(&admin_request(), None, None);
    let id = pending.audit_id();

    let event = auditing.on_response_complete(
        pending,
        CapturedResponse::aborted(),
        &RequestInfo::non_resource("get", "/healthz"),
    );

    assert_eq!(event.audit_id(), id);
    assert_eq!(event.level(), AuditLevel::Request);
}

#[test]
fn test_serialization_is_byte_identical() {
    let (auditing, _) = pipeline(vec![policy(AuditLevel::Metadata)]);
    let pending = auditing.on_request_received(&admin_request(), Some(&MockUser::admin()), None);
    let event = auditing.on_response_complete(
        pending,
        CapturedResponse::with_status(StatusCode::CREATED),
        &workspace_create_info(),
    );

    assert_eq!(event.to_json().unwrap(), event.to_json().unwrap());
}

#[test]
fn test_aborted_response_omits_status() {
    let (auditing, _) = pipeline(vec![policy(AuditLevel::Metadata)]);
    let pending = auditing.on_request_received(&admin_request(), None, None);

    let capture = ResponseCapture::new(MemoryResponse::new());
    let event = auditing.on_response_complete(
        pending,
        capture.handle().finish(),
        &workspace_create_info(),
    );
    let value = parse_event(&event.to_json().unwrap());

    assert_eq!(value["stage"], "ResponseComplete");
    assert_absent(&value, &["responseStatus", "user"]);
}

#[test]
fn test_streamed_body_implies_ok() {
    let (auditing, _) = pipeline(vec![policy(AuditLevel::Metadata)]);
    let pending = auditing.on_request_received(&admin_request(), None, None);

    let mut capture = ResponseCapture::new(MemoryResponse::new());
    write!(capture, "{{\"kind\":\"Workspace\"}}").unwrap();
    let (sink, captured) = capture.into_parts();
    let event = auditing.on_response_complete(pending, captured, &workspace_create_info());

    assert_eq!(sink.status(), Some(StatusCode::OK));
    assert_eq!(event.response_status().map(|s| s.code), Some(200));
}

// ===== Policy Resolution =====

#[test]
fn test_policy_loaded_from_yaml_store() {
    let policies = PolicyConfig::from_yaml(&policy_store_yaml(AuditLevel::Request)).unwrap();
    let (auditing, _) = pipeline(policies);

    assert_eq!(auditing.audit_level(), AuditLevel::Request);
    assert!(auditing.is_k8s_auditing_enabled());
}

#[test]
fn test_custom_policy_name() {
    let store = Arc::new(InMemoryPolicyStore::with_policies([
        policy(AuditLevel::Metadata),
        PolicyConfig::new("edge-audit", AuditLevel::RequestResponse),
    ]));
    let config = AuditingConfig::new().with_policy_name("edge-audit");
    let auditing = Auditing::new(&config, store, EventDispatcher::new()).unwrap();

    assert_eq!(auditing.audit_level(), AuditLevel::RequestResponse);
}

proptest! {
    #[test]
    fn prop_enabled_iff_level_not_none(index in 0usize..AuditLevel::ALL.len()) {
        let level = AuditLevel::ALL[index];
        let (auditing, _) = pipeline(vec![policy(level)]);

        prop_assert_eq!(auditing.is_enabled(), level != AuditLevel::None);
        prop_assert_eq!(auditing.audit_level(), level);
    }

    #[test]
    fn prop_client_ip_header_is_sole_source(
        octets in any::<[u8; 4]>(),
        port in 1u16..,
        remote in any::<[u8; 4]>(),
    ) {
        let ip = std::net::Ipv4Addr::from(octets).to_string();
        let mut headers = HeaderMap::new();
        headers.insert("x-client-ip", HeaderValue::from_str(&ip).unwrap());
        let remote_addr = SocketAddr::from((remote, port));

        let ips = source_ips(
            &headers,
            &[HeaderName::from_static("x-client-ip")],
            Some(remote_addr),
        );

        prop_assert_eq!(ips, vec![ip]);
    }
}

#[test]
fn test_absent_policy_disables_auditing() {
    let (auditing, _) = pipeline(Vec::new());

    assert!(!auditing.is_enabled());
    assert_eq!(auditing.audit_level(), AuditLevel::None);
    assert!(!auditing.is_k8s_auditing_enabled());
}

// ===== Configuration =====

#[test]
fn test_config_from_file_drives_headers() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("auditing.yaml");
    std::fs::write(&path, "clientIpHeaders: [X-Real-IP]\n").unwrap();

    let config = AuditingConfig::from_file(&path).unwrap();
    let store = Arc::new(InMemoryPolicyStore::with_policies([policy(AuditLevel::Metadata)]));
    let auditing = Auditing::new(&config, store, EventDispatcher::new()).unwrap();

    let request = RequestBuilder::new()
        .client_ip("192.168.0.2")
        .header("X-Real-IP", "10.20.30.40")
        .build();
    let pending = auditing.on_request_received(&request, None, None);

    assert_eq!(pending.source_ips(), ["10.20.30.40"]);
}

// ===== Tower Middleware =====

async fn created(_request: Request<Body>) -> Result<Response<Body>, Infallible> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::CREATED;
    Ok(response)
}

#[tokio::test]
async fn test_layer_reads_request_extensions() {
    let (auditing, backend) = pipeline(vec![policy(AuditLevel::Metadata)]);
    let service = AuditLayer::new(auditing).layer(service_fn(created));

    let request = RequestBuilder::new()
        .method("POST")
        .uri(WORKSPACES_PATH)
        .user(MockUser::admin())
        .info(workspace_create_info())
        .remote_addr("[::1]:50000".parse().unwrap())
        .build();
    let response = service.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    drop(response);

    let events = backend.events();
    assert_eq!(events.len(), 1);
    let value = parse_event(&events[0]);
    assert_eq!(value["user"]["username"], "admin");
    assert_eq!(value["sourceIPs"], serde_json::json!(["127.0.0.1"]));
    assert_eq!(value["objectRef"]["resource"], "workspaces");
    assert_eq!(value["responseStatus"]["code"], 201);
}

#[tokio::test]
async fn test_layer_prefers_response_routing_metadata() {
    let (auditing, backend) = pipeline(vec![policy(AuditLevel::Metadata)]);
    let service = AuditLayer::new(auditing).layer(service_fn(|_request: Request<Body>| async {
        let mut response = Response::new(Body::empty());
        response.extensions_mut().insert(workspace_create_info());
        Ok::<_, Infallible>(response)
    }));

    service
        .oneshot(RequestBuilder::new().method("POST").build())
        .await
        .unwrap();

    let value = parse_event(&backend.events()[0]);
    assert_eq!(value["verb"], "create");
    assert_eq!(value["requestURI"], WORKSPACES_PATH);
}

#[tokio::test]
async fn test_layer_finalizes_dropped_request() {
    let (auditing, backend) = pipeline(vec![policy(AuditLevel::Metadata)]);
    let service = AuditLayer::new(auditing).layer(service_fn(|_request: Request<Body>| async {
        std::future::pending::<()>().await;
        Ok::<_, Infallible>(Response::new(Body::empty()))
    }));

    let future = service.oneshot(RequestBuilder::new().uri("/api/v1/pods").build());
    let timed_out = tokio::time::timeout(std::time::Duration::from_millis(10), future).await;
    assert!(timed_out.is_err());

    let events = backend.events();
    assert_eq!(events.len(), 1);
    let value = parse_event(&events[0]);
    assert_eq!(value["stage"], "ResponseComplete");
    assert_absent(&value, &["responseStatus"]);
}

#[tokio::test]
async fn test_layer_finalizes_service_error() {
    let (auditing, backend) = pipeline(vec![policy(AuditLevel::Metadata)]);
    let service = AuditLayer::new(auditing).layer(service_fn(|_request: Request<Body>| async {
        Err::<Response<Body>, _>(std::io::Error::other("upstream reset"))
    }));

    let result = service.oneshot(RequestBuilder::new().build()).await;
    assert!(result.is_err());

    let value = parse_event(&backend.events()[0]);
    assert_absent(&value, &["responseStatus"]);
}

#[tokio::test]
async fn test_layer_ships_through_channel() {
    let store = Arc::new(InMemoryPolicyStore::with_policies([policy(AuditLevel::Metadata)]));
    let config = AuditingConfig::new().with_event_queue_capacity(4);
    let (channel, mut receiver) = config.channel_backend();
    assert_eq!(channel.remaining_capacity(), 4);
    let dispatcher = EventDispatcher::builder()
        .with_backend(Arc::new(channel))
        .build();
    let auditing = Arc::new(Auditing::new(&config, store.clone(), dispatcher).unwrap());
    let service = AuditLayer::new(auditing).layer(service_fn(created));

    service
        .clone()
        .oneshot(RequestBuilder::new().build())
        .await
        .unwrap();
    store.delete(DEFAULT_POLICY_NAME);
    service.oneshot(RequestBuilder::new().build()).await.unwrap();

    let shipped = receiver.recv().await.unwrap();
    assert_eq!(parse_event(&shipped)["responseStatus"]["code"], 201);
    assert!(receiver.try_recv().is_err());
}

#[tokio::test]
async fn test_layer_emits_after_streamed_body_is_sent() {
    let (auditing, backend) = pipeline(vec![policy(AuditLevel::Metadata)]);
    let service = AuditLayer::new(auditing).layer(service_fn(|_request: Request<Body>| async {
        let chunks = vec![Ok::<_, std::io::Error>("{\"items\":"), Ok("[]}")];
        let mut response = Response::new(Body::from_stream(futures::stream::iter(chunks)));
        *response.status_mut() = StatusCode::ACCEPTED;
        Ok::<_, Infallible>(response)
    }));

    let response = service
        .oneshot(RequestBuilder::new().uri("/api/v1/pods").build())
        .await
        .unwrap();
    assert!(backend.events().is_empty());

    let bytes = axum::body::to_bytes(Body::new(response.into_body()), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"{\"items\":[]}");

    let events = backend.events();
    assert_eq!(events.len(), 1);
    assert_eq!(parse_event(&events[0])["responseStatus"]["code"], 202);
}

#[tokio::test]
async fn test_layer_failed_body_records_no_status() {
    let (auditing, backend) = pipeline(vec![policy(AuditLevel::Metadata)]);
    let service = AuditLayer::new(auditing).layer(service_fn(|_request: Request<Body>| async {
        let chunks = vec![Err::<&str, _>(std::io::Error::other("reset"))];
        Ok::<_, Infallible>(Response::new(Body::from_stream(futures::stream::iter(chunks))))
    }));

    let response = service.oneshot(RequestBuilder::new().build()).await.unwrap();
    let result = axum::body::to_bytes(Body::new(response.into_body()), usize::MAX).await;
    assert!(result.is_err());

    let value = parse_event(&backend.events()[0]);
    assert_eq!(value["stage"], "ResponseComplete");
    assert_absent(&value, &["responseStatus"]);
}
