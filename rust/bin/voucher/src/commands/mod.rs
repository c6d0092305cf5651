pub mod codes;
pub mod serve;

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

// `::codes` is the library crate; `codes` alone is `commands::codes`.
use ::codes::CodeService;
use ::codes::code::GeneratorConfig;
use ::codes::sheet::SheetLayout;
use voucher_core::ServiceConfig;
use voucher_kv::{KVStore, RedbStore};

/// Open (or create) the database and build the service over it.
pub fn open_service(
    config: &ServiceConfig,
    generator: GeneratorConfig,
    layout: SheetLayout,
) -> Result<Arc<CodeService>> {
    let db_path = config.resolve_db_path();
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    debug!("opening registry at {}", db_path.display());

    let kv: Arc<dyn KVStore> = Arc::new(
        RedbStore::open(&db_path)
            .map_err(|e| anyhow::anyhow!("failed to open {}: {}", db_path.display(), e))?,
    );
    let service = CodeService::new(kv, generator, layout)?;
    Ok(Arc::new(service))
}
