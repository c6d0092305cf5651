use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    routing::get,
};
use serde::Deserialize;

use voucher_core::ServiceError;

use super::AppState;
use crate::service::DEFAULT_EXPORT_LIMIT;
use crate::sheet::SheetPage;

pub fn routes() -> Router<AppState> {
    Router::new().route("/sheet", get(get_sheet))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetQuery {
    batch_id: Option<String>,
    limit: Option<usize>,
}

async fn get_sheet(
    State(svc): State<AppState>,
    q: Result<Query<SheetQuery>, QueryRejection>,
) -> Result<Json<Vec<SheetPage>>, ServiceError> {
    let Query(q) = q?;
    let limit = q.limit.unwrap_or(DEFAULT_EXPORT_LIMIT);
    Ok(Json(svc.export_sheet(q.batch_id.as_deref(), limit).await?))
}
