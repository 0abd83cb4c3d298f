//! PostgREST client module
//!
//! Provides `PostgrestClient`, the [`Store`] implementation that talks to the
//! managed database through its REST gateway.

use super::Auth;
use crate::store::{Filter, PageQuery, Record, Store, StoreError, value_text};
use async_trait::async_trait;
use eyre::Result;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::Duration;
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// PostgREST client for reading and writing tables.
///
/// Every table is addressed as `{base}/{table}`; filters are sent as
/// `column=eq.value` query pairs and pagination uses the `Range` header.
///
/// # Example
/// ```no_run
/// use finops_backoffice::client::{Auth, PostgrestClient};
/// use finops_backoffice::store::{Store, fetch_all};
/// use url::Url;
///
/// # async fn example() -> eyre::Result<()> {
/// let url = Url::parse("https://project.supabase.co/rest/v1")?;
/// let client = PostgrestClient::try_new(url, Auth::ServiceKey("key".into()))?;
///
/// client.ping().await?;
/// let vendors = fetch_all(&client, "vendors", None, 1000).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct PostgrestClient {
    client: Client,
    url: Url,
}

/// Error body returned by PostgREST
#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

impl PostgrestClient {
    /// Create a new client from a base URL and Auth.
    ///
    /// The base URL is the REST root (for hosted projects, `.../rest/v1`).
    ///
    /// # Errors
    /// Returns an error if the key is not a valid header value or the HTTP
    /// client cannot be built.
    pub fn try_new(url: Url, auth: Auth) -> Result<Self> {
        Self::try_new_with_timeout(url, auth, DEFAULT_TIMEOUT)
    }

    /// Same as [`try_new`](Self::try_new) with an explicit request timeout.
    pub fn try_new_with_timeout(url: Url, auth: Auth, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = auth.key() {
            headers.insert("apikey", key.parse()?);
            headers.insert(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", key).parse()?,
            );
        }
        log::debug!("Building PostgREST client with {} auth", auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            url: normalize_base(url),
        })
    }

    /// Get the base URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn table_url(&self, table: &str) -> Result<Url, StoreError> {
        self.url
            .join(table.trim_start_matches('/'))
            .map_err(|e| StoreError::Protocol(format!("invalid table '{}': {}", table, e)))
    }

    /// Send a request to a table, failing on any non-success status.
    async fn request(
        &self,
        method: Method,
        table: &str,
        query: &[(String, String)],
        headers: HeaderMap,
        body: Option<Vec<u8>>,
    ) -> Result<reqwest::Response, StoreError> {
        let response = self.send(method, table, query, headers, body).await?;
        check(response).await
    }

    /// Send a request to a table with the given query pairs and extra headers.
    async fn send(
        &self,
        method: Method,
        table: &str,
        query: &[(String, String)],
        headers: HeaderMap,
        body: Option<Vec<u8>>,
    ) -> Result<reqwest::Response, StoreError> {
        let url = self.table_url(table)?;
        log::trace!("{} {} {:?}", method, url, query);

        let mut request = self
            .client
            .request(method, url)
            .query(query)
            .headers(headers);
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        Ok(request.send().await?)
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(parse_error(status, &body))
    }
}

/// Ensure the base path ends with a slash so `join` appends instead of replacing
fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn prefer(value: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static(value));
    headers
}

fn filter_pair(filter: &Filter) -> (String, String) {
    (
        filter.column.clone(),
        format!("eq.{}", value_text(&filter.value)),
    )
}

/// `columns` pair naming every key used by `records`
///
/// PostgREST refuses an array body whose objects have different keys unless
/// the columns are listed. Keys a record leaves out then take the column
/// default (`Prefer: missing=default`).
fn columns_pair(records: &[Record]) -> (String, String) {
    let columns: BTreeSet<&str> = records
        .iter()
        .flat_map(|record| record.keys().map(String::as_str))
        .collect();
    let columns: Vec<&str> = columns.into_iter().collect();
    ("columns".to_string(), columns.join(","))
}

/// Inclusive `Range` header value for a page, e.g. `0-999`
fn range_header(offset: usize, limit: usize) -> String {
    format!("{}-{}", offset, offset + limit.max(1) - 1)
}

/// Turn a non-success response into a [`StoreError`]
fn parse_error(status: StatusCode, body: &str) -> StoreError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) if parsed.code.is_some() || parsed.message.is_some() => StoreError::Rejected {
            code: parsed.code,
            message: parsed
                .message
                .unwrap_or_else(|| format!("request failed with status {}", status)),
            details: parsed.details,
            hint: parsed.hint,
        },
        _ if status.is_server_error() => {
            StoreError::Transport(format!("{}: {}", status, body.trim()))
        }
        _ => StoreError::Rejected {
            code: None,
            message: format!("{}: {}", status, body.trim()),
            details: None,
            hint: None,
        },
    }
}

fn encode(value: &impl serde::Serialize) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(value).map_err(|e| StoreError::Protocol(e.to_string()))
}

async fn decode_rows(response: reqwest::Response) -> Result<Vec<Record>, StoreError> {
    let value: Value = response.json().await?;
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Ok(map),
                other => Err(StoreError::Protocol(format!("expected row object, got {}", other))),
            })
            .collect(),
        other => Err(StoreError::Protocol(format!("expected row array, got {}", other))),
    }
}

#[async_trait]
impl Store for PostgrestClient {
    async fn insert_many(&self, collection: &str, records: &[Record]) -> Result<(), StoreError> {
        let body = encode(&records)?;
        self.request(
            Method::POST,
            collection,
            &[columns_pair(records)],
            prefer("return=minimal, missing=default"),
            Some(body),
        )
        .await?;
        Ok(())
    }

    async fn insert_one(&self, collection: &str, record: &Record) -> Result<Record, StoreError> {
        let body = encode(&[record])?;
        let response = self
            .request(
                Method::POST,
                collection,
                &[],
                prefer("return=representation"),
                Some(body),
            )
            .await?;
        decode_rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Protocol("insert returned no row".to_string()))
    }

    async fn select_page(
        &self,
        collection: &str,
        query: &PageQuery,
    ) -> Result<Vec<Record>, StoreError> {
        let mut pairs = vec![("select".to_string(), "*".to_string())];
        if let Some(filter) = &query.filter {
            pairs.push(filter_pair(filter));
        }
        if let Some(column) = &query.order_by {
            pairs.push(("order".to_string(), format!("{}.asc", column)));
        }

        let mut headers = HeaderMap::new();
        headers.insert("Range-Unit", HeaderValue::from_static("items"));
        let range = range_header(query.offset, query.limit);
        headers.insert(
            reqwest::header::RANGE,
            HeaderValue::from_str(&range).map_err(|e| StoreError::Protocol(e.to_string()))?,
        );

        let response = self
            .send(Method::GET, collection, &pairs, headers, None)
            .await?;
        // Offset past the last row
        if response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
            return Ok(Vec::new());
        }
        decode_rows(check(response).await?).await
    }

    async fn update(
        &self,
        collection: &str,
        filter: &Filter,
        patch: &Record,
    ) -> Result<Vec<Record>, StoreError> {
        let body = encode(patch)?;
        let response = self
            .request(
                Method::PATCH,
                collection,
                &[filter_pair(filter)],
                prefer("return=representation"),
                Some(body),
            )
            .await?;
        decode_rows(response).await
    }

    async fn delete(&self, collection: &str, filter: &Filter) -> Result<usize, StoreError> {
        let response = self
            .request(
                Method::DELETE,
                collection,
                &[filter_pair(filter)],
                prefer("return=representation"),
                None,
            )
            .await?;
        Ok(decode_rows(response).await?.len())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let response = self.client.get(self.url.clone()).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(parse_error(status, &body))
        }
    }
}

impl std::fmt::Display for PostgrestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_base_adds_slash() {
        let url = normalize_base(Url::parse("https://db.example.com/rest/v1").unwrap());
        assert_eq!(url.as_str(), "https://db.example.com/rest/v1/");

        let url = normalize_base(Url::parse("https://db.example.com/rest/v1/").unwrap());
        assert_eq!(url.as_str(), "https://db.example.com/rest/v1/");
    }

    #[test]
    fn test_table_url() {
        let url = Url::parse("https://db.example.com/rest/v1").unwrap();
        let client = PostgrestClient::try_new(url, Auth::None).unwrap();
        assert_eq!(
            client.table_url("vendors").unwrap().as_str(),
            "https://db.example.com/rest/v1/vendors"
        );
        assert_eq!(
            client.table_url("/brands").unwrap().as_str(),
            "https://db.example.com/rest/v1/brands"
        );
    }

    #[test]
    fn test_columns_pair_is_sorted_union() {
        let records: Vec<Record> = [
            json!({"vendor_code": "V1", "vendor_name": "One"}),
            json!({"vendor_code": "V2", "business_registration_number": "123-45-67890"}),
        ]
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect();
        assert_eq!(
            columns_pair(&records),
            (
                "columns".to_string(),
                "business_registration_number,vendor_code,vendor_name".to_string()
            )
        );
    }

    #[test]
    fn test_range_header() {
        assert_eq!(range_header(0, 1000), "0-999");
        assert_eq!(range_header(1000, 1000), "1000-1999");
        assert_eq!(range_header(5, 0), "5-5");
    }

    #[test]
    fn test_filter_pair() {
        assert_eq!(
            filter_pair(&Filter::eq("id", 7)),
            ("id".to_string(), "eq.7".to_string())
        );
        assert_eq!(
            filter_pair(&Filter::eq("vendor_code", "V-1")),
            ("vendor_code".to_string(), "eq.V-1".to_string())
        );
    }

    #[test]
    fn test_parse_error_with_code() {
        let body = json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"vendors_vendor_code_key\"",
            "details": "Key (vendor_code)=(V-1) already exists.",
            "hint": null
        })
        .to_string();
        let err = parse_error(StatusCode::CONFLICT, &body);
        assert_eq!(err.code(), Some("23505"));
        assert!(err.message().starts_with("duplicate key value"));
    }

    #[test]
    fn test_parse_error_plain_text() {
        let err = parse_error(StatusCode::BAD_REQUEST, "bad request\n");
        assert_eq!(err.code(), None);
        assert_eq!(err.message(), "400 Bad Request: bad request");

        let err = parse_error(StatusCode::BAD_GATEWAY, "<html>upstream</html>");
        assert!(matches!(err, StoreError::Transport(_)));
    }

    #[test]
    fn test_display() {
        let url = Url::parse("http://localhost:3000").unwrap();
        let client = PostgrestClient::try_new(url, Auth::AnonKey("k".into())).unwrap();
        assert_eq!(client.to_string(), "http://localhost:3000/");
    }
}
