//! `voucher serve`: the codes module over HTTP.

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::response::IntoResponse;
use axum::routing::get;
use tracing::info;

use codes::{CodeService, CodesModule};
use voucher_core::{Module, now_rfc3339};

/// Module routes plus the system endpoints.
pub fn build_router(service: Arc<CodeService>) -> Router {
    let module = CodesModule::new(service);
    info!("mounting module {}", module.name());

    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .merge(module.routes())
}

async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
        "time": now_rfc3339(),
    }))
}

async fn version() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": "voucher",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn run(service: Arc<CodeService>, listen: &str) -> Result<()> {
    let app = build_router(service);
    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!("voucher server listening on {}", listen);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use codes::code::GeneratorConfig;
    use codes::sheet::SheetLayout;
    use voucher_core::ServiceConfig;

    async fn get_json(router: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn system_and_module_routes_are_mounted() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServiceConfig {
            data_dir: Some(dir.path().join("nested")),
            ..Default::default()
        };
        let svc = crate::commands::open_service(
            &config,
            GeneratorConfig::default(),
            SheetLayout::default(),
        )
        .unwrap();
        svc.generate(Some(3), Some("B1".into())).await.unwrap();
        let router = build_router(svc);

        let (status, health) = get_json(&router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["status"], "ok");

        let (_, version) = get_json(&router, "/version").await;
        assert_eq!(version["name"], "voucher");

        let (status, stats) = get_json(&router, "/codes/v1/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["total"], 3);
        assert!(dir.path().join("nested/voucher.redb").exists());
    }
}
