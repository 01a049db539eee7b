//! `OdooGateway` against a stub JSON-RPC server.
//!
//! The stub understands `common.login`, `common.version` and
//! `object.execute_kw` for a handful of models, and counts logins so
//! session caching and invalidation can be observed.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use odk_odoo_bridge::config::BackendConfig;
use odk_odoo_bridge::gateway::odoo::OdooGateway;
use odk_odoo_bridge::gateway::{Condition, RemoteStore};
use odk_odoo_bridge::AppError;
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

const PASSWORD: &str = "s3cret";
const UID: i64 = 7;

#[derive(Default)]
struct Stub {
    logins: AtomicUsize,
    calls: AtomicUsize,
    /// When non-zero, the next N `execute_kw` calls return HTTP 500.
    fail_next: AtomicUsize,
    /// Delay applied to every `common.login` reply.
    login_delay_ms: AtomicU64,
}

fn envelope(id: &Value, result: Value) -> Response {
    Json(json!({"jsonrpc": "2.0", "id": id, "result": result})).into_response()
}

fn error_envelope(id: &Value, name: &str, message: &str) -> Response {
    Json(json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": 200,
            "message": "Odoo Server Error",
            "data": {"name": name, "message": message},
        },
    }))
    .into_response()
}

async fn jsonrpc(State(stub): State<Arc<Stub>>, Json(request): Json<Value>) -> Response {
    let id = request["id"].clone();
    let params = &request["params"];
    let args = params["args"].as_array().cloned().unwrap_or_default();

    match (params["service"].as_str(), params["method"].as_str()) {
        (Some("common"), Some("login")) => {
            stub.logins.fetch_add(1, Ordering::SeqCst);
            let delay = stub.login_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            if args.get(2).and_then(Value::as_str) == Some(PASSWORD) {
                envelope(&id, json!(UID))
            } else {
                envelope(&id, json!(false))
            }
        }
        (Some("common"), Some("version")) => {
            envelope(&id, json!({"server_version": "17.0", "protocol_version": 1}))
        }
        (Some("object"), Some("execute_kw")) => {
            stub.calls.fetch_add(1, Ordering::SeqCst);
            if stub
                .fail_next
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
            if args.get(1) != Some(&json!(UID)) || args.get(2) != Some(&json!(PASSWORD)) {
                return error_envelope(&id, "odoo.exceptions.AccessDenied", "Access Denied");
            }
            execute(&id, &args)
        }
        _ => error_envelope(&id, "builtins.KeyError", "unknown service"),
    }
}

fn execute(id: &Value, args: &[Value]) -> Response {
    let model = args.get(3).and_then(Value::as_str).unwrap_or_default();
    let method = args.get(4).and_then(Value::as_str).unwrap_or_default();

    match (model, method) {
        ("health.animal", "create") => {
            let payload = &args[5][0];
            if payload["tag_number"].is_null() {
                error_envelope(id, "odoo.exceptions.ValidationError", "tag_number is required")
            } else {
                envelope(id, json!(501))
            }
        }
        ("health.catalogue.item", "search_read") => {
            let domain = &args[5][0];
            let wants_bovine = domain
                .as_array()
                .is_some_and(|terms| terms.contains(&json!(["code", "=", "bovine"])));
            if wants_bovine {
                envelope(id, json!([{"id": 2101, "name": "Bovine"}]))
            } else {
                envelope(id, json!([]))
            }
        }
        ("health.odk.submission", "read") => envelope(
            id,
            json!([{"id": args[5][0][0], "odk_submitted_object": "{\"a\": 1}"}]),
        ),
        _ => error_envelope(id, "builtins.AttributeError", "no such method"),
    }
}

async fn spawn_stub(stub: Arc<Stub>) -> (u16, CancellationToken) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral");
    let port = listener.local_addr().expect("local addr").port();
    let app = Router::new().route("/jsonrpc", post(jsonrpc)).with_state(stub);

    let ct = CancellationToken::new();
    let server_ct = ct.clone();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_ct.cancelled().await })
            .await;
    });
    (port, ct)
}

fn backend(port: u16, password: &str) -> BackendConfig {
    BackendConfig {
        protocol: "http".into(),
        host: "127.0.0.1".into(),
        port,
        database: "livestock".into(),
        username: "odk@example.org".into(),
        request_timeout_seconds: 5,
        password: password.into(),
    }
}

fn payload(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("payload must be an object"),
    }
}

// ── Session handling ─────────────────────────────────────────

#[tokio::test]
async fn login_is_cached_across_calls() {
    let stub = Arc::new(Stub::default());
    let (port, ct) = spawn_stub(Arc::clone(&stub)).await;
    let gateway = OdooGateway::new(&backend(port, PASSWORD)).expect("gateway");

    assert!(!gateway.is_authenticated().await);
    gateway
        .create("health.animal", payload(json!({"tag_number": "KE-1"})))
        .await
        .expect("first create");
    gateway
        .create("health.animal", payload(json!({"tag_number": "KE-2"})))
        .await
        .expect("second create");

    assert!(gateway.is_authenticated().await);
    assert_eq!(stub.logins.load(Ordering::SeqCst), 1);
    assert_eq!(stub.calls.load(Ordering::SeqCst), 2);
    ct.cancel();
}

#[tokio::test]
async fn explicit_login_returns_uid() {
    let stub = Arc::new(Stub::default());
    let (port, ct) = spawn_stub(stub).await;
    let gateway = OdooGateway::new(&backend(port, PASSWORD)).expect("gateway");

    assert_eq!(gateway.login().await.expect("login"), UID);
    assert!(gateway.is_authenticated().await);
    ct.cancel();
}

#[tokio::test]
async fn bad_password_is_unauthorized() {
    let stub = Arc::new(Stub::default());
    let (port, ct) = spawn_stub(Arc::clone(&stub)).await;
    let gateway = OdooGateway::new(&backend(port, "wrong")).expect("gateway");

    let err = gateway.login().await.expect_err("login must fail");
    assert!(matches!(err, AppError::Unauthorized(_)), "{err}");

    let err = gateway
        .create("health.animal", payload(json!({"tag_number": "KE-1"})))
        .await
        .expect_err("create must fail");
    assert!(matches!(err, AppError::Unauthorized(_)), "{err}");
    assert_eq!(stub.calls.load(Ordering::SeqCst), 0, "no model call without a session");
    ct.cancel();
}

#[tokio::test]
async fn transport_failure_drops_session_without_retry() {
    let stub = Arc::new(Stub::default());
    let (port, ct) = spawn_stub(Arc::clone(&stub)).await;
    let gateway = OdooGateway::new(&backend(port, PASSWORD)).expect("gateway");
    gateway.login().await.expect("login");

    stub.fail_next.store(1, Ordering::SeqCst);
    let err = gateway
        .create("health.animal", payload(json!({"tag_number": "KE-1"})))
        .await
        .expect_err("500 surfaces");
    assert!(matches!(err, AppError::Http(_)), "{err}");
    assert!(!gateway.is_authenticated().await);
    assert_eq!(stub.calls.load(Ordering::SeqCst), 1, "failed call is not retried");

    gateway
        .create("health.animal", payload(json!({"tag_number": "KE-1"})))
        .await
        .expect("next call reconnects");
    assert_eq!(stub.logins.load(Ordering::SeqCst), 2);
    ct.cancel();
}

#[tokio::test]
async fn slow_login_does_not_hold_the_session_lock() {
    let stub = Arc::new(Stub::default());
    stub.login_delay_ms.store(600, Ordering::SeqCst);
    let (port, ct) = spawn_stub(Arc::clone(&stub)).await;
    let gateway = Arc::new(OdooGateway::new(&backend(port, PASSWORD)).expect("gateway"));

    let pending = tokio::spawn({
        let gateway = Arc::clone(&gateway);
        async move {
            gateway
                .create("health.animal", payload(json!({"tag_number": "KE-1"})))
                .await
        }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let authenticated = tokio::time::timeout(Duration::from_millis(200), gateway.is_authenticated())
        .await
        .expect("session state readable while login is in flight");
    assert!(!authenticated);

    pending.await.expect("join").expect("create after login");
    assert!(gateway.is_authenticated().await);
    ct.cancel();
}

// ── Model calls ──────────────────────────────────────────────

#[tokio::test]
async fn validation_error_carries_backend_message() {
    let stub = Arc::new(Stub::default());
    let (port, ct) = spawn_stub(stub).await;
    let gateway = OdooGateway::new(&backend(port, PASSWORD)).expect("gateway");

    let err = gateway
        .create("health.animal", payload(json!({"tag_number": null})))
        .await
        .expect_err("validation fails");

    assert!(matches!(err, AppError::Rpc(ref m) if m == "tag_number is required"), "{err}");
    // Business errors keep the session.
    assert!(gateway.is_authenticated().await);
    ct.cancel();
}

#[tokio::test]
async fn search_read_sends_domain_and_returns_rows() {
    let stub = Arc::new(Stub::default());
    let (port, ct) = spawn_stub(stub).await;
    let gateway = OdooGateway::new(&backend(port, PASSWORD)).expect("gateway");

    let rows = gateway
        .search_read(
            "health.catalogue.item",
            vec![Condition::eq("code", "bovine")],
            &["id"],
        )
        .await
        .expect("search");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], json!(2101));

    let rows = gateway
        .search_read(
            "health.catalogue.item",
            vec![Condition::eq("code", "camelid")],
            &["id"],
        )
        .await
        .expect("search");
    assert!(rows.is_empty());
    ct.cancel();
}

#[tokio::test]
async fn read_returns_requested_record() {
    let stub = Arc::new(Stub::default());
    let (port, ct) = spawn_stub(stub).await;
    let gateway = OdooGateway::new(&backend(port, PASSWORD)).expect("gateway");

    let rows = gateway
        .read("health.odk.submission", vec![12], &["odk_submitted_object"])
        .await
        .expect("read");
    assert_eq!(rows[0]["id"], json!(12));
    ct.cancel();
}

#[tokio::test]
async fn server_version_needs_no_session() {
    let stub = Arc::new(Stub::default());
    let (port, ct) = spawn_stub(Arc::clone(&stub)).await;
    let gateway = OdooGateway::new(&backend(port, "wrong")).expect("gateway");

    assert_eq!(gateway.server_version().await.expect("version"), "17.0");
    assert_eq!(stub.logins.load(Ordering::SeqCst), 0);
    ct.cancel();
}

#[tokio::test]
async fn unreachable_backend_is_http_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    let gateway = OdooGateway::new(&backend(port, PASSWORD)).expect("gateway");

    let err = gateway.server_version().await.expect_err("nothing listening");
    assert!(matches!(err, AppError::Http(_)), "{err}");
}
