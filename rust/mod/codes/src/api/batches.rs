use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use serde::Deserialize;

use voucher_core::ServiceError;

use super::AppState;
use crate::service::GeneratedBatch;

pub fn routes() -> Router<AppState> {
    Router::new().route("/batches", post(create_batch))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBatchBody {
    size: Option<usize>,
    batch_id: Option<String>,
}

async fn create_batch(
    State(svc): State<AppState>,
    body: Result<Json<CreateBatchBody>, JsonRejection>,
) -> Result<Json<GeneratedBatch>, ServiceError> {
    let Json(body) = body?;
    Ok(Json(svc.generate(body.size, body.batch_id).await?))
}
