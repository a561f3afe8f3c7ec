//! Executor and engine against a local axum server that implements the
//! widget contract correctly.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method as HttpMethod, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use serde_json::{Value, json};

use contractcheck_core::{Config, Method, PaginationCheck, Reference, Suite, load};
use contractcheck_runner::{CaseRequest, Engine, ExecutionResult, Executor, TestContext};

const TOKEN: &str = "good";

fn errors(status: StatusCode, entries: Value) -> Response {
    (status, axum::Json(json!({ "errors": entries }))).into_response()
}

fn not_allowed(allow: &'static str) -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, allow)],
        axum::Json(json!({"errors": [{"title": "Method Not Allowed"}]})),
    )
        .into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

async fn collection(method: HttpMethod, headers: HeaderMap, body: Bytes) -> Response {
    match method {
        HttpMethod::GET => {
            if !authorized(&headers) {
                return errors(StatusCode::UNAUTHORIZED, json!([{"title": "Unauthorized"}]));
            }
            axum::Json(json!([{"id": 1, "name": "bolt"}])).into_response()
        }
        HttpMethod::POST => create(&body),
        _ => not_allowed("GET, POST"),
    }
}

fn create(body: &[u8]) -> Response {
    let body: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
    match body.get("name") {
        None => errors(
            StatusCode::BAD_REQUEST,
            json!([{"code": "missingRequiredField", "title": "$.name is a required field"}]),
        ),
        Some(Value::String(name)) if name.chars().count() > 5 => errors(
            StatusCode::BAD_REQUEST,
            json!([{"title": "$.name exceeds the maximum length of 5"}]),
        ),
        Some(_) => (StatusCode::CREATED, axum::Json(body.clone())).into_response(),
    }
}

async fn item(
    method: HttpMethod,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if id.trim().is_empty() {
        return collection(method, headers, body).await;
    }
    if !matches!(method, HttpMethod::GET | HttpMethod::DELETE) {
        return not_allowed("DELETE, GET");
    }
    let Ok(id) = id.parse::<i64>() else {
        return errors(
            StatusCode::BAD_REQUEST,
            json!([{"code": "invalidInteger", "title": "id is expected to be a valid integer"}]),
        );
    };
    if id == 0 {
        return errors(StatusCode::NOT_FOUND, json!([{"title": "Not Found"}]));
    }
    match method {
        HttpMethod::DELETE => StatusCode::NO_CONTENT.into_response(),
        _ => axum::Json(json!({"id": id, "name": "bolt"})).into_response(),
    }
}

async fn session() -> Response {
    axum::Json(json!({"token": TOKEN})).into_response()
}

async fn spawn_stub() -> String {
    let app = Router::new()
        .route("/widgets", any(collection))
        .route("/widgets/{id}", any(item))
        .route("/session", get(session));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Requests seen by the slow stub: in-flight high-water mark and arrivals.
#[derive(Default)]
struct Traffic {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    /// `(had a query string, arrived at)`
    arrivals: Mutex<Vec<(bool, Instant)>>,
}

async fn slow(State(traffic): State<Arc<Traffic>>, uri: Uri) -> StatusCode {
    traffic
        .arrivals
        .lock()
        .unwrap()
        .push((uri.query().is_some(), Instant::now()));
    let now = traffic.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    traffic.peak.fetch_max(now, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(50)).await;
    traffic.in_flight.fetch_sub(1, Ordering::SeqCst);
    StatusCode::OK
}

async fn spawn_slow_stub() -> (String, Arc<Traffic>) {
    let traffic = Arc::new(Traffic::default());
    let app = Router::new()
        .route("/widgets", any(slow))
        .route("/widgets/{id}", any(slow))
        .with_state(Arc::clone(&traffic));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), traffic)
}

fn executor(base_url: &str) -> Executor {
    Executor::new(
        base_url,
        BTreeMap::from([("Authorization".to_string(), format!("Bearer {TOKEN}"))]),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn widget_doc() -> contractcheck_core::SchemaDocument {
    load(&json!({
        "paths": {
            "/widgets": {
                "get": {
                    "security": [{"bearer": []}],
                    "responses": {"200": {"content": {"application/json": {"schema": {
                        "type": "array",
                        "items": {"$ref": "#/components/schemas/Widget"}
                    }}}}}
                },
                "post": {
                    "requestBody": {"content": {"application/json": {"schema": {
                        "$ref": "#/components/schemas/Widget"
                    }}}},
                    "responses": {"201": {}}
                }
            },
            "/widgets/{id}": {
                "get": {"parameters": [{"name": "id", "in": "path", "required": true, "schema": {"type": "integer"}}]},
                "delete": {"parameters": [{"name": "id", "in": "path", "required": true, "schema": {"type": "integer"}}]}
            }
        },
        "components": {"schemas": {"Widget": {
            "type": "object",
            "required": ["name"],
            "properties": {
                "id": {"type": "integer", "readOnly": true},
                "name": {"type": "string", "maxLength": 5}
            }
        }}}
    }))
    .unwrap()
}

#[tokio::test]
async fn not_found_is_a_successful_execution() {
    let base = spawn_stub().await;
    let result = executor(&base)
        .execute(&CaseRequest::new(Method::Get, "/widgets/0"))
        .await;
    let ExecutionResult::Success(response) = result else {
        panic!("expected a response, got {result:?}");
    };
    assert_eq!(response.status, 404);
    assert_eq!(response.errors()[0].title.as_deref(), Some("Not Found"));
}

#[tokio::test]
async fn closed_port_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = executor(&format!("http://{addr}"))
        .execute(&CaseRequest::new(Method::Get, "/widgets"))
        .await;
    assert!(matches!(result, ExecutionResult::TransportError { .. }));
}

#[tokio::test]
async fn request_headers_override_uniform_ones() {
    let base = spawn_stub().await;
    let exec = executor(&base);

    let ok = exec.execute(&CaseRequest::new(Method::Get, "/widgets")).await;
    assert!(matches!(ok, ExecutionResult::Success(ref r) if r.status == 200));

    let forged = CaseRequest::new(Method::Get, "/widgets").with_header("authorization", "Bearer nope");
    let denied = exec.execute(&forged).await;
    assert!(matches!(denied, ExecutionResult::Success(ref r) if r.status == 401));
}

#[tokio::test]
async fn engine_passes_against_conforming_server() {
    let base = spawn_stub().await;
    let config = Config {
        base_url: base,
        headers: BTreeMap::from([("Authorization".to_string(), "Bearer {{token}}".to_string())]),
        references: vec![Reference {
            name: "token".into(),
            path: "/session".into(),
            pointer: "/token".into(),
        }],
        suites: vec![
            Suite::MissingRequired,
            Suite::AboveMaxLength,
            Suite::InvalidPathParam,
            Suite::NotFound,
            Suite::MethodNotAllowed,
            Suite::Unauthorized,
            Suite::ResponseSchema,
            Suite::WhitespaceInPath,
        ],
        concurrency: 2,
        seed: Some(3),
        ..Config::default()
    };
    let engine = Engine::new(widget_doc(), config).unwrap();

    let context = engine.context().await.unwrap();
    assert_eq!(context.reference("token"), Some(TOKEN));

    let reporter = engine.run(&context).await;
    let summary = reporter.summarize();
    assert_eq!(summary.failed, 0, "{}", reporter.render_terminal());
    assert_eq!(summary.total, 13);
    assert_eq!(summary.skipped, 0);
}

#[tokio::test]
async fn engine_reports_contract_breaks() {
    let base = spawn_stub().await;
    let config = Config {
        base_url: base,
        // Every request lacks the token, so the collection GETs answer 401.
        suites: vec![Suite::ResponseSchema, Suite::WhitespaceInPath],
        ..Config::default()
    };
    let engine = Engine::new(widget_doc(), config).unwrap();
    let reporter = engine.run(&TestContext::default()).await;

    let summary = reporter.summarize();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.failed, 2);
    let rendered = reporter.render_terminal();
    assert!(rendered.contains("GET /widgets"));
}

#[tokio::test]
async fn sequential_chain_precedes_bounded_fan_out() {
    let (base, traffic) = spawn_slow_stub().await;
    let config = Config {
        base_url: base,
        pagination: vec![
            PaginationCheck {
                query: "$top=-1".into(),
                message: "$top query parameter".into(),
            },
            PaginationCheck {
                query: "$skip=-1".into(),
                message: "$skip query parameter".into(),
            },
        ],
        suites: vec![
            Suite::Pagination,
            Suite::NotFound,
            Suite::InvalidPathParam,
            Suite::MethodNotAllowed,
        ],
        concurrency: 2,
        delay_ms: 100,
        ..Config::default()
    };
    let engine = Engine::new(widget_doc(), config).unwrap();
    let reporter = engine.run(&TestContext::default()).await;
    assert_eq!(reporter.summarize().total, 10);

    assert_eq!(traffic.peak.load(Ordering::SeqCst), 2);
    let arrivals = traffic.arrivals.lock().unwrap().clone();
    assert_eq!(arrivals.len(), 10);
    let paginated: Vec<bool> = arrivals.iter().map(|(query, _)| *query).collect();
    assert_eq!(&paginated[..2], &[true, true]);
    assert!(paginated[2..].iter().all(|query| !query));
    let gap = arrivals[1].1.duration_since(arrivals[0].1);
    assert!(gap >= Duration::from_millis(100), "chained cases {gap:?} apart");
}
