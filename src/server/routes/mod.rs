mod bulk;
mod health;
mod records;

use axum::Router;
use axum::routing::{get, post};

use crate::server::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/api/collections", get(records::list_collections))
        .route(
            "/api/{collection}",
            get(records::list).post(records::create),
        )
        .route("/api/{collection}/bulk", post(bulk::ingest))
        .route(
            "/api/{collection}/{id}",
            get(records::get)
                .put(records::update)
                .delete(records::delete),
        )
}
