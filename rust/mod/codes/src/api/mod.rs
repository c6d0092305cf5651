pub mod batches;
pub mod codes;
pub mod sheet;

use std::sync::Arc;

use axum::Router;

use crate::service::CodeService;

/// Shared application state.
pub type AppState = Arc<CodeService>;

/// Build the codes API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/codes/v1", api_routes())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(batches::routes())
        .merge(codes::routes())
        .merge(sheet::routes())
}
