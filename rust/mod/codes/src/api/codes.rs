use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::QueryRejection},
    routing::{get, post},
};
use serde::Deserialize;

use voucher_core::{ListParams, ListResult, ServiceError};

use super::AppState;
use crate::code::normalize;
use crate::model::{CodeEntry, CodeStats, CodeStatus, RedeemOutcome};
use crate::service::ListFilter;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/codes", get(list_codes).delete(clear_codes))
        .route("/codes/{id}", get(get_code))
        .route("/codes/{id}/@redeem", post(redeem_code))
        .route("/stats", get(get_stats))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CodesQuery {
    limit: Option<usize>,
    offset: Option<usize>,
    status: Option<String>,
    batch_id: Option<String>,
}

#[derive(Deserialize)]
struct ClearQuery {
    #[serde(default)]
    confirm: bool,
}

async fn list_codes(
    State(svc): State<AppState>,
    q: Result<Query<CodesQuery>, QueryRejection>,
) -> Result<Json<ListResult<CodeEntry>>, ServiceError> {
    let Query(q) = q?;
    let status = q
        .status
        .as_deref()
        .map(str::parse::<CodeStatus>)
        .transpose()
        .map_err(ServiceError::Validation)?;
    let mut params = ListParams::default();
    if let Some(limit) = q.limit {
        params.limit = limit;
    }
    params.offset = q.offset.unwrap_or(0);

    let filter = ListFilter {
        status,
        batch_id: q.batch_id,
    };
    Ok(Json(svc.list(&filter, &params).await?))
}

async fn get_code(
    State(svc): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CodeEntry>, ServiceError> {
    svc.lookup(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ServiceError::NotFound(format!("code '{}' not found", normalize(&id))))
}

/// Every outcome is a 200; the `result` field tells them apart.
async fn redeem_code(
    State(svc): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RedeemOutcome>, ServiceError> {
    Ok(Json(svc.redeem(&id).await?))
}

async fn get_stats(State(svc): State<AppState>) -> Result<Json<CodeStats>, ServiceError> {
    Ok(Json(svc.stats().await?))
}

async fn clear_codes(
    State(svc): State<AppState>,
    q: Result<Query<ClearQuery>, QueryRejection>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let Query(q) = q?;
    if !q.confirm {
        return Err(ServiceError::Validation(
            "clearing the registry requires confirm=true".into(),
        ));
    }
    svc.clear_all().await?;
    Ok(Json(serde_json::json!({"ok": true})))
}
