// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! HTTP integration tests for the signed search client and the runtime loop.
//!
//! Both talk to in-process axum servers standing in for the collection and
//! the Lambda runtime API.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aoss_ingestion::client::SignedClient;
use aoss_ingestion::configuration::{IngestOptions, WorkflowConfig};
use aoss_ingestion::credentials::CredentialCache;
use aoss_ingestion::errors::{SearchError, WorkflowError};
use aoss_ingestion::runtime::RuntimeClient;
use aoss_ingestion::search::SearchApi;
use aoss_ingestion::workflow::{self, StepOutcome};
use aws_credential_types::Credentials;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

// =============================================================================
// Fake collection
// =============================================================================

#[derive(Default)]
struct Collection {
    indexes: Mutex<BTreeMap<String, Vec<Value>>>,
    requests: Mutex<Vec<HeaderMap>>,
    creations: AtomicUsize,
    /// Status returned by every index creation, when set.
    deny_create: Option<u16>,
    /// Status returned by every existence check, when set.
    fail_head: Option<u16>,
}

type Shared = Arc<Collection>;

impl Collection {
    fn record(&self, headers: HeaderMap) {
        self.requests.lock().unwrap().push(headers);
    }
}

async fn index_exists(
    State(collection): State<Shared>,
    Path(index): Path<String>,
    headers: HeaderMap,
) -> StatusCode {
    collection.record(headers);
    if let Some(status) = collection.fail_head {
        return StatusCode::from_u16(status).unwrap();
    }
    if collection.indexes.lock().unwrap().contains_key(&index) {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn create_index(
    State(collection): State<Shared>,
    Path(index): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    collection.record(headers);
    collection.creations.fetch_add(1, Ordering::SeqCst);
    if let Some(status) = collection.deny_create {
        return (
            StatusCode::from_u16(status).unwrap(),
            Json(json!({ "error": "security_exception" })),
        );
    }
    assert!(body["mappings"]["properties"]["birthdate"].is_object());
    collection
        .indexes
        .lock()
        .unwrap()
        .insert(index.clone(), Vec::new());
    (
        StatusCode::OK,
        Json(json!({ "acknowledged": true, "index": index })),
    )
}

async fn index_document(
    State(collection): State<Shared>,
    Path(index): Path<String>,
    headers: HeaderMap,
    Json(document): Json<Value>,
) -> impl IntoResponse {
    collection.record(headers);
    let mut indexes = collection.indexes.lock().unwrap();
    match indexes.get_mut(&index) {
        Some(documents) => {
            documents.push(document);
            (
                StatusCode::CREATED,
                Json(json!({ "_index": index, "result": "created" })),
            )
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "index_not_found_exception" })),
        ),
    }
}

async fn search(
    State(collection): State<Shared>,
    Path(index): Path<String>,
    headers: HeaderMap,
    Json(query): Json<Value>,
) -> Json<Value> {
    collection.record(headers);
    let clause = query["query"]["match"].as_object().unwrap().clone();
    let (field, text) = clause.iter().next().unwrap();
    let hits: Vec<Value> = collection
        .indexes
        .lock()
        .unwrap()
        .get(&index)
        .map(|documents| {
            documents
                .iter()
                .filter(|d| &d[field.as_str()] == text)
                .map(|d| json!({ "_index": index, "_source": d }))
                .collect()
        })
        .unwrap_or_default();
    Json(json!({ "hits": { "total": { "value": hits.len() }, "hits": hits } }))
}

async fn collection_server(collection: Shared) -> String {
    let app = Router::new()
        .route("/{index}", get(index_exists).put(create_index))
        .route("/{index}/_doc", post(index_document))
        .route("/{index}/_search", post(search))
        .with_state(collection);
    format!("http://{}", spawn(app).await)
}

fn credentials() -> Arc<CredentialCache> {
    Arc::new(CredentialCache::new(Credentials::new(
        "AKIDEXAMPLE",
        "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
        Some("session-token".to_string()),
        None,
        "test",
    )))
}

fn config(endpoint: &str) -> WorkflowConfig {
    IngestOptions {
        region: Some("eu-central-1".to_string()),
        collection_id: Some("abcdefghij0123456789".to_string()),
        role_arn: Some("arn:aws:iam::987654321000:role/SearchStack-IngestionRole-ABC".to_string()),
        external_id: Some("opensearch".to_string()),
        endpoint: Some(endpoint.to_string()),
        ..IngestOptions::default()
    }
    .resolve()
    .unwrap()
}

// =============================================================================
// Signing
// =============================================================================

#[tokio::test]
async fn test_every_request_is_signed_for_aoss() {
    let collection = Shared::default();
    let endpoint = collection_server(collection.clone()).await;

    let report = workflow::run_with_credentials(&config(&endpoint), credentials())
        .await
        .unwrap();
    assert_eq!(report.ensure_index, StepOutcome::Completed);

    let requests = collection.requests.lock().unwrap();
    // HEAD, PUT, POST _doc, POST _search
    assert_eq!(requests.len(), 4);
    for headers in requests.iter() {
        let authorization = headers["authorization"].to_str().unwrap();
        assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"));
        assert!(authorization.contains("/eu-central-1/aoss/aws4_request"));
        assert!(headers.contains_key("x-amz-content-sha256"));
        assert!(headers.contains_key("x-amz-date"));
        assert_eq!(headers["x-amz-security-token"], "session-token");
    }
}

#[tokio::test]
async fn test_client_reports_status() {
    let collection = Arc::new(Collection {
        fail_head: Some(503),
        ..Collection::default()
    });
    let endpoint = collection_server(collection).await;
    let client = SignedClient::new(endpoint, "eu-central-1", credentials()).unwrap();

    assert!(matches!(
        client.index_exists("user-data").await,
        Err(SearchError::Status { status: 503, .. })
    ));
}

// =============================================================================
// Workflow
// =============================================================================

#[tokio::test]
async fn test_document_written_and_found() {
    let collection = Shared::default();
    let endpoint = collection_server(collection.clone()).await;

    let report = workflow::run_with_credentials(&config(&endpoint), credentials())
        .await
        .unwrap();
    assert_eq!(report.index_name, "user-data");
    assert_eq!(report.indexed["result"], "created");
    assert_eq!(report.search_response["hits"]["total"]["value"], 1);
    assert_eq!(
        report.search_response["hits"]["hits"][0]["_source"],
        json!({ "firstName": "John", "lastName": "Doe", "birthdate": 3_660_000 })
    );
}

#[tokio::test]
async fn test_second_run_reuses_index() {
    let collection = Shared::default();
    let endpoint = collection_server(collection.clone()).await;
    let config = config(&endpoint);
    let credentials = credentials();

    workflow::run_with_credentials(&config, credentials.clone())
        .await
        .unwrap();
    let report = workflow::run_with_credentials(&config, credentials)
        .await
        .unwrap();

    assert_eq!(report.ensure_index, StepOutcome::Completed);
    assert_eq!(collection.creations.load(Ordering::SeqCst), 1);
    assert_eq!(report.search_response["hits"]["total"]["value"], 2);
}

#[tokio::test]
async fn test_denied_creation_is_skipped_then_write_fails() {
    let collection = Arc::new(Collection {
        deny_create: Some(403),
        ..Collection::default()
    });
    let endpoint = collection_server(collection.clone()).await;

    let result = workflow::run_with_credentials(&config(&endpoint), credentials()).await;
    assert!(matches!(
        result,
        Err(WorkflowError::Search(SearchError::Status { status: 404, .. }))
    ));
    assert_eq!(collection.creations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_existence_check_is_skipped() {
    let collection = Arc::new(Collection {
        fail_head: Some(500),
        ..Collection::default()
    });
    let endpoint = collection_server(collection.clone()).await;
    let client = SignedClient::new(endpoint, "eu-central-1", credentials()).unwrap();

    let outcome = workflow::ensure_index(&client, "user-data").await;
    assert!(matches!(outcome, StepOutcome::Skipped { .. }));
    assert_eq!(collection.creations.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Runtime API
// =============================================================================

#[derive(Default)]
struct RuntimeApi {
    invocations: AtomicUsize,
    responses: Mutex<Vec<(String, Value)>>,
    errors: Mutex<Vec<(String, Value)>>,
    init_errors: Mutex<Vec<Value>>,
}

async fn next_invocation(State(api): State<Arc<RuntimeApi>>) -> impl IntoResponse {
    let n = api.invocations.fetch_add(1, Ordering::SeqCst) + 1;
    (
        [
            ("lambda-runtime-aws-request-id", format!("request-{n}")),
            ("lambda-runtime-deadline-ms", "1700000060000".to_string()),
        ],
        Json(json!({ "source": "test" })),
    )
}

async fn invocation_response(
    State(api): State<Arc<RuntimeApi>>,
    Path(request_id): Path<String>,
    Json(body): Json<Value>,
) -> StatusCode {
    api.responses.lock().unwrap().push((request_id, body));
    StatusCode::ACCEPTED
}

async fn invocation_error(
    State(api): State<Arc<RuntimeApi>>,
    Path(request_id): Path<String>,
    Json(body): Json<Value>,
) -> StatusCode {
    api.errors.lock().unwrap().push((request_id, body));
    StatusCode::ACCEPTED
}

async fn init_error(State(api): State<Arc<RuntimeApi>>, Json(body): Json<Value>) -> StatusCode {
    api.init_errors.lock().unwrap().push(body);
    StatusCode::ACCEPTED
}

async fn runtime_server(api: Arc<RuntimeApi>) -> String {
    let app = Router::new()
        .route("/2018-06-01/runtime/invocation/next", get(next_invocation))
        .route(
            "/2018-06-01/runtime/invocation/{request_id}/response",
            post(invocation_response),
        )
        .route(
            "/2018-06-01/runtime/invocation/{request_id}/error",
            post(invocation_error),
        )
        .route("/2018-06-01/runtime/init/error", post(init_error))
        .with_state(api);
    spawn(app).await.to_string()
}

#[tokio::test]
async fn test_next_invocation_reads_headers_and_payload() {
    let api = Arc::new(RuntimeApi::default());
    let client = RuntimeClient::new(&runtime_server(api).await);

    let invocation = client.next_invocation().await.unwrap();
    assert_eq!(invocation.request_id, "request-1");
    assert_eq!(invocation.deadline_ms, Some(1_700_000_060_000));
    assert_eq!(invocation.payload, json!({ "source": "test" }));
}

#[tokio::test]
async fn test_successful_invocation_is_answered() {
    let api = Arc::new(RuntimeApi::default());
    let client = RuntimeClient::new(&runtime_server(api.clone()).await);

    client
        .serve_once(|invocation| async move {
            Ok::<_, WorkflowError>(json!({ "echo": invocation.payload }))
        })
        .await
        .unwrap();

    let responses = api.responses.lock().unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].0, "request-1");
    assert_eq!(responses[0].1, json!({ "echo": { "source": "test" } }));
    assert!(api.errors.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_invocation_is_reported_not_returned() {
    let api = Arc::new(RuntimeApi::default());
    let client = RuntimeClient::new(&runtime_server(api.clone()).await);

    client
        .serve_once(|_| async { Err::<Value, _>(WorkflowError::Timeout(Duration::from_secs(60))) })
        .await
        .unwrap();

    let errors = api.errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, "request-1");
    assert_eq!(errors[0].1["errorType"], "Timeout");
    assert!(api.responses.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_init_error_reports_missing_configuration() {
    let api = Arc::new(RuntimeApi::default());
    let client = RuntimeClient::new(&runtime_server(api.clone()).await);

    let error = workflow::resolve_config(&IngestOptions::default()).unwrap_err();
    client
        .init_error(&aoss_ingestion::runtime::ErrorReport::from(&error))
        .await
        .unwrap();

    let init_errors = api.init_errors.lock().unwrap();
    assert_eq!(init_errors[0]["errorType"], "ConfigurationMissing");
    assert_eq!(
        init_errors[0]["errorMessage"],
        "missing required configuration: AOSS_REGION"
    );
}
