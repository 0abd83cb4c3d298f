//! Integration tests for the PostgREST client
//!
//! A small axum app speaks enough of the PostgREST protocol (Prefer and
//! Range headers, `eq.` filters, JSON error bodies) over an in-memory store
//! for the real client to run against.

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use finops_backoffice::client::{Auth, PostgrestClient};
use finops_backoffice::ingest::{BulkConfig, BulkIngest, IngestTarget};
use finops_backoffice::store::{
    ConstraintClassifier, Filter, MemoryStore, PageQuery, Record, Store, StoreError, fetch_all,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use url::Url;

const KEY: &str = "test-key";

type Fake = Arc<MemoryStore>;

fn error_response(error: StoreError) -> Response {
    match error {
        StoreError::Rejected {
            code,
            message,
            details,
            hint,
        } => {
            let status = match code.as_deref() {
                Some("23505") => StatusCode::CONFLICT,
                _ => StatusCode::BAD_REQUEST,
            };
            let body = json!({"code": code, "message": message, "details": details, "hint": hint});
            (status, axum::Json(body)).into_response()
        }
        other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()).into_response(),
    }
}

fn authorized(headers: &HeaderMap) -> Result<(), Response> {
    let apikey = headers.get("apikey").and_then(|v| v.to_str().ok());
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if apikey == Some(KEY) && bearer == Some(KEY) {
        Ok(())
    } else {
        let body = json!({"message": "No API key found in request", "hint": "No `apikey` request header or url param was found."});
        Err((StatusCode::UNAUTHORIZED, axum::Json(body)).into_response())
    }
}

fn filter_from(params: &HashMap<String, String>) -> Option<Filter> {
    params
        .iter()
        .filter(|(k, _)| k.as_str() != "select" && k.as_str() != "order")
        .find_map(|(k, v)| v.strip_prefix("eq.").map(|v| Filter::eq(k.as_str(), v)))
}

/// Parse an inclusive `Range: a-b` header into offset and limit
fn range_from(headers: &HeaderMap) -> (usize, usize) {
    headers
        .get("range")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split_once('-'))
        .and_then(|(a, b)| Some((a.parse::<usize>().ok()?, b.parse::<usize>().ok()?)))
        .map(|(a, b)| (a, b + 1 - a))
        .unwrap_or((0, usize::MAX))
}

async fn root(headers: HeaderMap) -> Response {
    match authorized(&headers) {
        Ok(()) => axum::Json(json!({"swagger": "2.0"})).into_response(),
        Err(response) => response,
    }
}

async fn select(
    State(store): State<Fake>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = authorized(&headers) {
        return response;
    }
    if table == "broken" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    let (offset, limit) = range_from(&headers);
    let mut query = PageQuery::new(offset, limit).with_filter(filter_from(&params));
    if let Some(order) = params.get("order") {
        query = query.with_order(order.trim_end_matches(".asc"));
    }
    match store.select_page(&table, &query).await {
        Ok(rows) if rows.is_empty() && offset > 0 => {
            let body = json!({"code": "PGRST103", "message": "Requested range not satisfiable", "details": null, "hint": null});
            (StatusCode::RANGE_NOT_SATISFIABLE, axum::Json(body)).into_response()
        }
        Ok(rows) => axum::Json(rows).into_response(),
        Err(e) => error_response(e),
    }
}

/// Apply `columns=`, or refuse rows whose key sets differ the way PostgREST does
fn check_columns(
    params: &HashMap<String, String>,
    rows: Vec<Record>,
) -> Result<Vec<Record>, Response> {
    if let Some(columns) = params.get("columns") {
        let columns: Vec<&str> = columns.split(',').collect();
        return Ok(rows
            .into_iter()
            .map(|mut row| {
                row.retain(|k, _| columns.contains(&k.as_str()));
                row
            })
            .collect());
    }
    let keys = |row: &Record| row.keys().cloned().collect::<Vec<_>>();
    match rows.first() {
        Some(first) if rows.iter().any(|row| keys(row) != keys(first)) => {
            let body = json!({"code": "PGRST102", "message": "All object keys must match", "details": null, "hint": null});
            Err((StatusCode::BAD_REQUEST, axum::Json(body)).into_response())
        }
        _ => Ok(rows),
    }
}

async fn insert(
    State(store): State<Fake>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    axum::Json(rows): axum::Json<Vec<Record>>,
) -> Response {
    if let Err(response) = authorized(&headers) {
        return response;
    }
    let rows = match check_columns(&params, rows) {
        Ok(rows) => rows,
        Err(response) => return response,
    };
    let prefer = headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if prefer == "return=representation" && rows.len() == 1 {
        match store.insert_one(&table, &rows[0]).await {
            Ok(row) => (StatusCode::CREATED, axum::Json(vec![row])).into_response(),
            Err(e) => error_response(e),
        }
    } else {
        match store.insert_many(&table, &rows).await {
            Ok(()) => StatusCode::CREATED.into_response(),
            Err(e) => error_response(e),
        }
    }
}

async fn patch(
    State(store): State<Fake>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    axum::Json(patch): axum::Json<Record>,
) -> Response {
    if let Err(response) = authorized(&headers) {
        return response;
    }
    let Some(filter) = filter_from(&params) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    match store.update(&table, &filter, &patch).await {
        Ok(rows) => axum::Json(rows).into_response(),
        Err(e) => error_response(e),
    }
}

async fn remove(
    State(store): State<Fake>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = authorized(&headers) {
        return response;
    }
    let Some(filter) = filter_from(&params) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    match store.delete(&table, &filter).await {
        Ok(count) => axum::Json(vec![json!({}); count]).into_response(),
        Err(e) => error_response(e),
    }
}

async fn spawn_fake(store: Fake) -> Url {
    let app = Router::new()
        .route("/rest/v1/", get(root))
        .route(
            "/rest/v1/{table}",
            get(select).post(insert).patch(patch).delete(remove),
        )
        .with_state(store);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Url::parse(&format!("http://{}/rest/v1", addr)).unwrap()
}

fn client(url: Url) -> PostgrestClient {
    PostgrestClient::try_new(url, Auth::ServiceKey(KEY.to_string())).unwrap()
}

fn vendor(code: &str) -> Record {
    json!({"vendor_code": code, "vendor_name": format!("Vendor {}", code)})
        .as_object()
        .cloned()
        .unwrap()
}

#[tokio::test]
async fn test_ping_and_auth() {
    let url = spawn_fake(Arc::new(MemoryStore::new())).await;
    client(url.clone()).ping().await.unwrap();

    let anonymous = PostgrestClient::try_new(url, Auth::None).unwrap();
    let err = anonymous.ping().await.unwrap_err();
    assert!(err.is_rejection());
    assert_eq!(err.code(), None);
    assert_eq!(err.message(), "No API key found in request");
}

#[tokio::test]
async fn test_bulk_ingest_over_http() {
    let store = Arc::new(MemoryStore::new().with_unique("vendors", ["vendor_code"]));
    let client = client(spawn_fake(store.clone()).await);
    let classifier = ConstraintClassifier::default();
    let target = IngestTarget::new("vendors").with_key_field("vendor_code");

    let records: Vec<Record> = ["V1", "V2", "V3", "V2", "V5"].into_iter().map(vendor).collect();
    let result = BulkIngest::new(&client, &classifier)
        .with_config(BulkConfig::with_chunk_size(2))
        .run(&target, records)
        .await
        .unwrap();

    assert_eq!(result.success_count, 4);
    assert_eq!(result.errors, vec!["V2: already exists"]);
    assert_eq!(store.row_count("vendors"), 4);
}

#[tokio::test]
async fn test_bulk_insert_with_mixed_key_sets() {
    let store = Arc::new(MemoryStore::new().with_unique("vendors", ["vendor_code"]));
    let client = client(spawn_fake(store.clone()).await);
    let classifier = ConstraintClassifier::default();
    let target = IngestTarget::new("vendors").with_key_field("vendor_code");

    let mut with_number = vendor("V2");
    with_number.insert("business_registration_number".into(), json!("123-45-67890"));
    let records = vec![vendor("V1"), with_number, vendor("V3")];

    let result = BulkIngest::new(&client, &classifier)
        .run(&target, records)
        .await
        .unwrap();

    assert!(result.is_clean());
    assert_eq!(store.insert_many_calls(), 1);
    assert_eq!(store.insert_one_calls(), 0);
    let rows = store.rows("vendors");
    assert_eq!(rows[1]["business_registration_number"], "123-45-67890");
    assert!(rows[0].get("business_registration_number").is_none());
}

#[tokio::test]
async fn test_insert_one_returns_stored_row() {
    let store = Arc::new(MemoryStore::new().with_unique("vendors", ["vendor_code"]));
    let client = client(spawn_fake(store).await);

    let row = client.insert_one("vendors", &vendor("V1")).await.unwrap();
    assert_eq!(row["vendor_code"], "V1");
    assert!(row.get("id").is_some());

    let err = client.insert_one("vendors", &vendor("V1")).await.unwrap_err();
    assert_eq!(err.code(), Some("23505"));
    assert!(err.message().contains("vendors_vendor_code_key"));
}

#[tokio::test]
async fn test_fetch_all_pages_with_range() {
    let store = Arc::new(MemoryStore::new());
    let rows: Vec<Record> = (1..=10).map(|i| vendor(&format!("V{:02}", i))).collect();
    store.insert_many("vendors", &rows).await.unwrap();
    let client = client(spawn_fake(store).await);

    let all = fetch_all(&client, "vendors", None, 3).await.unwrap();
    assert_eq!(all.len(), 10);
    assert_eq!(all[9]["vendor_code"], "V10");

    let past_end = client
        .select_page("vendors", &PageQuery::new(10, 3))
        .await
        .unwrap();
    assert!(past_end.is_empty());

    let exact = fetch_all(&client, "vendors", None, 5).await.unwrap();
    assert_eq!(exact.len(), 10);

    let one = fetch_all(&client, "vendors", Some(Filter::eq("vendor_code", "V04")), 3)
        .await
        .unwrap();
    assert_eq!(one.len(), 1);
    assert_eq!(one[0]["vendor_name"], "Vendor V04");
}

#[tokio::test]
async fn test_update_and_delete() {
    let store = Arc::new(MemoryStore::new());
    let client = client(spawn_fake(store.clone()).await);
    let row = client.insert_one("brands", &vendor("B1")).await.unwrap();
    let id = row["id"].clone();

    let patch = json!({"vendor_name": "Renamed"}).as_object().cloned().unwrap();
    let updated = client
        .update("brands", &Filter::eq("id", id.clone()), &patch)
        .await
        .unwrap();
    assert_eq!(updated[0]["vendor_name"], "Renamed");

    let deleted = client.delete("brands", &Filter::eq("id", id)).await.unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(store.row_count("brands"), 0);
}

#[tokio::test]
async fn test_server_error_is_transport() {
    let client = client(spawn_fake(Arc::new(MemoryStore::new())).await);
    let err = client
        .select_page("broken", &PageQuery::new(0, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Transport(ref msg) if msg.contains("boom")));
    assert!(!err.is_rejection());
}

#[tokio::test]
async fn test_unreachable_store() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = Url::parse(&format!("http://{}/rest/v1", addr)).unwrap();
    let err = client(url).ping().await.unwrap_err();
    assert!(matches!(err, StoreError::Transport(_)));
}
