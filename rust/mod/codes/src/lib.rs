//! Single-use redemption code registry.
//!
//! [`code`] draws unique codes, [`store::RegistryStore`] persists them and
//! performs the one-time redemption, [`service::CodeService`] is the facade
//! shared by the HTTP routes in [`api`] and the command-line tool.

pub mod api;
pub mod code;
pub mod error;
pub mod model;
pub mod service;
pub mod sheet;
pub mod store;

use std::sync::Arc;

use axum::Router;
use voucher_core::Module;

pub use error::CodeError;
pub use service::CodeService;

/// Codes module: redemption code registry over HTTP.
pub struct CodesModule {
    service: Arc<CodeService>,
}

impl CodesModule {
    pub fn new(service: Arc<CodeService>) -> Self {
        Self { service }
    }
}

impl Module for CodesModule {
    fn name(&self) -> &str {
        "codes"
    }

    fn routes(&self) -> Router {
        api::router(Arc::clone(&self.service))
    }
}
