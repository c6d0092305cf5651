//! CodeService, the facade every surface (HTTP, CLI) goes through.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use voucher_core::{ListParams, ListResult};
use voucher_kv::KVStore;

use crate::code::{CodeGenerator, GeneratorConfig};
use crate::error::CodeError;
use crate::model::{CodeEntry, CodeStats, CodeStatus, CountFilter, RedeemOutcome};
use crate::sheet::{SheetLayout, SheetPage};
use crate::store::RegistryStore;

/// Default number of codes placed on an exported sheet.
pub const DEFAULT_EXPORT_LIMIT: usize = 100;

/// A freshly committed batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedBatch {
    pub batch_id: String,
    pub codes: Vec<CodeEntry>,
}

/// Optional filters for listing.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub status: Option<CodeStatus>,
    pub batch_id: Option<String>,
}

pub struct CodeService {
    store: RegistryStore,
    generator: CodeGenerator,
    layout: SheetLayout,
}

impl CodeService {
    /// Service over `kv` with a randomly seeded generator.
    pub fn new(
        kv: Arc<dyn KVStore>,
        config: GeneratorConfig,
        layout: SheetLayout,
    ) -> Result<Self, CodeError> {
        Self::with_generator(RegistryStore::new(kv), CodeGenerator::new(config)?, layout)
    }

    pub fn with_generator(
        store: RegistryStore,
        generator: CodeGenerator,
        layout: SheetLayout,
    ) -> Result<Self, CodeError> {
        layout.validate()?;
        Ok(Self {
            store,
            generator,
            layout,
        })
    }

    pub fn layout(&self) -> SheetLayout {
        self.layout
    }

    pub async fn generate(
        &self,
        size: Option<usize>,
        batch_id: Option<String>,
    ) -> Result<GeneratedBatch, CodeError> {
        let codes = self.generator.generate(&self.store, size, batch_id).await?;
        // generate() never returns an empty batch.
        let batch_id = codes
            .first()
            .map(|e| e.batch_id.clone())
            .unwrap_or_default();
        Ok(GeneratedBatch { batch_id, codes })
    }

    pub async fn lookup(&self, id: &str) -> Result<Option<CodeEntry>, CodeError> {
        self.store.lookup(id).await
    }

    pub async fn redeem(&self, id: &str) -> Result<RedeemOutcome, CodeError> {
        self.store.redeem(id).await
    }

    /// Filtered, paginated listing, newest first.
    pub async fn list(
        &self,
        filter: &ListFilter,
        params: &ListParams,
    ) -> Result<ListResult<CodeEntry>, CodeError> {
        let entries = match (&filter.batch_id, filter.status) {
            (Some(batch_id), status) => self
                .store
                .list_by_batch(batch_id)
                .await?
                .into_iter()
                .filter(|e| status.is_none_or(|s| e.status == s))
                .collect(),
            (None, Some(status)) => self.store.list_by_status(status).await?,
            (None, None) => self.store.list_all().await?,
        };
        Ok(params.paginate(entries))
    }

    pub async fn stats(&self) -> Result<CodeStats, CodeError> {
        self.store.stats().await
    }

    pub async fn count(&self, filter: CountFilter) -> Result<usize, CodeError> {
        self.store.count(filter).await
    }

    /// Sheet pages for the newest `limit` unused codes, optionally of one batch.
    pub async fn export_sheet(
        &self,
        batch_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SheetPage>, CodeError> {
        let mut entries = match batch_id {
            Some(batch_id) => self.store.list_by_batch(batch_id).await?,
            None => self.store.list_by_status(CodeStatus::Unused).await?,
        };
        entries.retain(|e| !e.is_used());
        entries.truncate(limit);
        Ok(self.layout.paginate(&entries))
    }

    /// Destroy the whole registry. Callers confirm with the operator first.
    pub async fn clear_all(&self) -> Result<(), CodeError> {
        info!("clearing registry");
        self.store.clear_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    use voucher_kv::RedbStore;

    fn make_service() -> (CodeService, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let kv: Arc<dyn KVStore> =
            Arc::new(RedbStore::open(&dir.path().join("svc.redb")).unwrap());
        let svc =
            CodeService::new(kv, GeneratorConfig::default(), SheetLayout::default()).unwrap();
        (svc, dir)
    }

    #[tokio::test]
    async fn full_lifecycle() {
        let (svc, _dir) = make_service();

        let batch = svc.generate(Some(100), Some("B1".into())).await.unwrap();
        assert_eq!(batch.batch_id, "B1");
        assert_eq!(batch.codes.len(), 100);
        let distinct: HashSet<&str> = batch.codes.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(distinct.len(), 100);

        assert_eq!(svc.count(CountFilter::All).await.unwrap(), 100);
        assert_eq!(svc.count(CountFilter::Unused).await.unwrap(), 100);
        assert_eq!(svc.count(CountFilter::Used).await.unwrap(), 0);

        let first = batch.codes[0].id.clone();
        let outcome = svc.redeem(&first).await.unwrap();
        assert!(outcome.is_redeemed());
        let used_at = outcome.used_at().unwrap();
        assert_eq!(svc.count(CountFilter::Unused).await.unwrap(), 99);
        assert_eq!(svc.count(CountFilter::Used).await.unwrap(), 1);

        let entry = svc.lookup(&first).await.unwrap().unwrap();
        assert_eq!(entry.status, CodeStatus::Used);
        assert_eq!(entry.used_at, Some(used_at));

        let again = svc.redeem(&first).await.unwrap();
        assert_eq!(
            again,
            RedeemOutcome::AlreadyUsed {
                id: first.clone(),
                used_at,
            }
        );
        assert_eq!(
            svc.stats().await.unwrap(),
            CodeStats {
                total: 100,
                unused: 99,
                used: 1,
            }
        );

        assert_eq!(
            svc.redeem("ZZZZZZZZ").await.unwrap(),
            RedeemOutcome::NotFound {
                id: "ZZZZZZZZ".into()
            }
        );

        svc.clear_all().await.unwrap();
        assert_eq!(svc.count(CountFilter::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn list_filters_and_paginates() {
        let (svc, _dir) = make_service();
        let b1 = svc.generate(Some(5), Some("B1".into())).await.unwrap();
        svc.generate(Some(3), Some("B2".into())).await.unwrap();
        svc.redeem(&b1.codes[0].id).await.unwrap();

        let all = svc
            .list(&ListFilter::default(), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(all.total, 8);

        let used = svc
            .list(
                &ListFilter {
                    status: Some(CodeStatus::Used),
                    batch_id: None,
                },
                &ListParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(used.total, 1);
        assert_eq!(used.items[0].id, b1.codes[0].id);

        let b1_unused = svc
            .list(
                &ListFilter {
                    status: Some(CodeStatus::Unused),
                    batch_id: Some("B1".into()),
                },
                &ListParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(b1_unused.total, 4);
        assert!(b1_unused.items.iter().all(|e| e.batch_id == "B1"));

        let page = svc
            .list(&ListFilter::default(), &ListParams { limit: 3, offset: 6 })
            .await
            .unwrap();
        assert_eq!(page.total, 8);
        assert_eq!(page.items.len(), 2);
    }

    #[tokio::test]
    async fn export_places_only_unused_codes() {
        let (svc, _dir) = make_service();
        let batch = svc.generate(Some(30), Some("B1".into())).await.unwrap();
        svc.generate(Some(10), Some("B2".into())).await.unwrap();
        svc.redeem(&batch.codes[3].id).await.unwrap();

        let pages = svc.export_sheet(Some("B1"), DEFAULT_EXPORT_LIMIT).await.unwrap();
        let printed: Vec<&str> = pages
            .iter()
            .flat_map(|p| p.cells.iter().map(|c| c.id.as_str()))
            .collect();
        assert_eq!(printed.len(), 29);
        assert!(!printed.contains(&batch.codes[3].id.as_str()));
        assert_eq!(pages.len(), 2);

        let limited = svc.export_sheet(None, 25).await.unwrap();
        let count: usize = limited.iter().map(|p| p.cells.len()).sum();
        assert_eq!(count, 25);
    }

    #[tokio::test]
    async fn generate_without_batch_id_assigns_one() {
        let (svc, _dir) = make_service();
        let batch = svc.generate(None, None).await.unwrap();
        assert!(batch.batch_id.starts_with("BATCH-"));
        assert_eq!(batch.codes.len(), 100);
        assert!(batch.codes.iter().all(|e| e.batch_id == batch.batch_id));
    }
}
