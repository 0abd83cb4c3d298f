use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::etl::Transformer;
use crate::ingest::AdmissionError;
use crate::server::error::ApiError;
use crate::server::state::AppState;
use crate::store::{Filter, PageQuery, Record, fetch_all};

/// Optional equality filter on a list
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub column: Option<String>,
    pub value: Option<String>,
}

fn into_record(value: Value) -> Result<Record, ApiError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(AdmissionError::NotAnObject { row: 1 }.into()),
    }
}

pub async fn list_collections(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "success": true, "data": state.catalog.collections }))
}

pub async fn list(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError> {
    let spec = state.collection(&collection)?;
    let filter = match (params.column, params.value) {
        (Some(column), Some(value)) => Some(Filter::eq(column, value)),
        (None, None) => None,
        _ => {
            return Err(ApiError::BadRequest(
                "column and value must be given together".into(),
            ));
        }
    };

    let rows = fetch_all(state.store.as_ref(), &spec.table, filter, state.page_size).await?;
    Ok(Json(json!({ "success": true, "data": rows })))
}

pub async fn get(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let spec = state.collection(&collection)?;
    let query = PageQuery::new(0, 1).with_filter(Some(Filter::eq("id", id.as_str())));

    let row = state
        .store
        .select_page(&spec.table, &query)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found(&collection, &id))?;
    Ok(Json(json!({ "success": true, "data": row })))
}

pub async fn create(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(body) = body?;
    let spec = state.collection(&collection)?;
    let target = spec.ingest_target().map_err(ApiError::internal)?;

    let record = into_record(spec.preparer().transform(body).map_err(ApiError::internal)?)?;
    target.rules.check(1, &record)?;

    let row = state
        .store
        .insert_one(&spec.table, &record)
        .await
        .map_err(|e| state.write_error(&target.identify(0, &record), e))?;

    log::info!("Created {} record {}", collection, target.identify(0, &row));
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": row })),
    ))
}

/// Partial update; collection defaults are not applied
pub async fn update(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body?;
    let spec = state.collection(&collection)?;
    let mut patch = into_record(spec.preparer().map_only(body).map_err(ApiError::internal)?)?;
    patch.remove("id");
    if patch.is_empty() {
        return Err(ApiError::BadRequest("no fields to update".into()));
    }

    let rows = state
        .store
        .update(&spec.table, &Filter::eq("id", id.as_str()), &patch)
        .await
        .map_err(|e| state.write_error(&id, e))?;

    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found(&collection, &id))?;
    Ok(Json(json!({ "success": true, "data": row })))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let spec = state.collection(&collection)?;
    let deleted = state
        .store
        .delete(&spec.table, &Filter::eq("id", id.as_str()))
        .await?;

    if deleted == 0 {
        return Err(ApiError::not_found(&collection, &id));
    }
    log::info!("Deleted {} record {}", collection, id);
    Ok(Json(json!({ "success": true, "deleted": deleted })))
}
