use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use shared::{domain::ScanId, protocol::ScanPredictionUpdate};
use storage::Storage;

/// Update-by-id access to persisted scan records.
#[async_trait]
pub trait ScanStore: Send + Sync {
    async fn update_prediction(&self, scan_id: &ScanId, update: &ScanPredictionUpdate)
        -> Result<()>;
}

pub struct MissingScanStore;

#[async_trait]
impl ScanStore for MissingScanStore {
    async fn update_prediction(
        &self,
        scan_id: &ScanId,
        _update: &ScanPredictionUpdate,
    ) -> Result<()> {
        Err(anyhow!("scan store unavailable for scan {scan_id}"))
    }
}

#[async_trait]
impl ScanStore for Storage {
    async fn update_prediction(
        &self,
        scan_id: &ScanId,
        update: &ScanPredictionUpdate,
    ) -> Result<()> {
        if !self.update_scan_prediction(scan_id, update).await? {
            bail!("scan {scan_id} not found");
        }
        Ok(())
    }
}
