use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use serde_json::{Map, Value, json};

use crate::ingest::{AdmissionError, BulkIngest, records_from_values};
use crate::server::error::ApiError;
use crate::server::state::AppState;
use crate::transform::DefaultFiller;

/// Split a bulk body into its records and the batch-level scalar fields
fn split_body(body: Value) -> Result<(Vec<Value>, Map<String, Value>), ApiError> {
    let Value::Object(mut body) = body else {
        return Err(ApiError::BadRequest("body must be a JSON object".into()));
    };
    let Some(Value::Array(records)) = body.remove("records") else {
        return Err(AdmissionError::NotAList.into());
    };
    let scalars = body
        .into_iter()
        .filter(|(_, v)| !v.is_array() && !v.is_object())
        .collect();
    Ok((records, scalars))
}

/// `POST /api/{collection}/bulk`
///
/// Admission failures are a 400 and nothing is written. Otherwise the
/// response carries the batch result, including per-record rejections.
pub async fn ingest(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body?;
    let spec = state.collection(&collection)?;
    let target = spec.ingest_target().map_err(ApiError::internal)?;
    let preparer = spec.preparer();

    let (items, scalars) = split_body(body)?;
    let batch = DefaultFiller::new(preparer.mapper().map_object(scalars));

    let prepared = items
        .into_iter()
        .map(|item| preparer.transform_with(item, &batch))
        .collect::<eyre::Result<Vec<_>>>()
        .map_err(ApiError::internal)?;
    let records = records_from_values(prepared)?;

    log::info!("Bulk request for {}: {} record(s)", collection, records.len());
    let result = BulkIngest::new(state.store.as_ref(), &state.classifier)
        .with_config(state.bulk)
        .run(&target, records)
        .await?;

    Ok(Json(json!({ "success": true, "result": result })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::CollectionCatalog;
    use crate::ingest::BulkConfig;
    use crate::store::MemoryStore;
    use axum::http::StatusCode;
    use std::sync::Arc;

    fn state() -> (AppState, Arc<MemoryStore>) {
        let catalog = CollectionCatalog::builtin();
        let store = Arc::new(catalog.memory_store());
        let state = AppState::new(store.clone(), catalog).with_bulk_config(BulkConfig::with_chunk_size(2));
        (state, store)
    }

    async fn post(state: &AppState, collection: &str, body: Value) -> Result<Value, ApiError> {
        let Json(response) = ingest(State(state.clone()), Path(collection.to_string()), Ok(Json(body))).await?;
        Ok(response)
    }

    #[tokio::test]
    async fn test_bulk_with_duplicate() {
        let (state, store) = state();
        let response = post(
            &state,
            "vendors",
            json!({
                "records": [
                    {"vendorCode": "V1", "vendorName": "One"},
                    {"vendorCode": "V2", "vendorName": "Two"},
                    {"vendorCode": "V1", "vendorName": "Again"}
                ]
            }),
        )
        .await
        .unwrap();

        assert_eq!(
            response,
            json!({
                "success": true,
                "result": {"success": 2, "failed": 1, "errors": ["V1: already exists"]}
            })
        );
        assert_eq!(store.row_count("vendors"), 2);
    }

    #[tokio::test]
    async fn test_scalar_fields_fill_records() {
        let (state, store) = state();
        post(
            &state,
            "online_commerce_income",
            json!({
                "brandCode": "B01",
                "salesDate": "2024-07-01",
                "currency": "USD",
                "records": [
                    {"orderNumber": "O-1", "amount": 1000},
                    {"orderNumber": "O-2", "amount": 2000, "brandCode": "B02"}
                ]
            }),
        )
        .await
        .unwrap();

        let rows = store.rows("online_commerce_income");
        assert_eq!(rows[0]["brand_code"], "B01");
        assert_eq!(rows[0]["currency"], "USD");
        assert_eq!(rows[1]["brand_code"], "B02");
    }

    #[tokio::test]
    async fn test_admission_failures_write_nothing() {
        let (state, store) = state();
        let cases = [
            (json!({"records": []}), "records must not be empty"),
            (json!({"rows": []}), "records must be a list"),
            (json!({"records": {"vendorCode": "V1"}}), "records must be a list"),
            (json!({"records": [{"vendorCode": "V1", "vendorName": "A"}, 7]}), "row 2: record must be an object"),
            (
                json!({"records": [{"vendorCode": "V1", "vendorName": "A"}, {"vendorCode": "V2"}]}),
                "row 2: vendor_name is required",
            ),
        ];

        for (body, message) in cases {
            let err = post(&state, "vendors", body).await.unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
            assert_eq!(err.message(), message);
        }
        assert_eq!(store.insert_many_calls(), 0);
        assert_eq!(store.insert_one_calls(), 0);
    }

    #[tokio::test]
    async fn test_body_must_be_object() {
        let (state, _) = state();
        let err = post(&state, "vendors", json!([1, 2])).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
