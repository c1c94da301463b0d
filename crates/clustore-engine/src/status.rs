//! 緩存狀態報告

use clustore_cache::StoredFile;
use clustore_core::{ClusterId, Result};
use serde::Serialize;
use std::fmt;

/// 單一聚類的狀態
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterStatus {
    pub cluster: ClusterId,
    pub n_spikes: usize,
    /// 一致性檢查結果（項目沒有檢查時為 None）
    pub consistent: Option<bool>,
}

/// 單一項目的狀態
#[derive(Debug, Clone, Serialize)]
pub struct ItemStatus {
    pub name: String,
    pub fields: Vec<String>,
    pub clusters: Vec<ClusterStatus>,
}

impl ItemStatus {
    /// 一致性檢查失敗的聚類
    pub fn stale_clusters(&self) -> Vec<ClusterId> {
        self.clusters
            .iter()
            .filter(|c| c.consistent == Some(false))
            .map(|c| c.cluster)
            .collect()
    }
}

/// 整體狀態報告
#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    pub items: Vec<ItemStatus>,
    pub files: Vec<StoredFile>,
}

impl StoreStatus {
    /// 所有有檢查的聚類都一致
    pub fn is_consistent(&self) -> bool {
        self.items.iter().all(|item| item.stale_clusters().is_empty())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            writeln!(f, "{}（{}）", item.name, item.fields.join(", "))?;
            for status in &item.clusters {
                let consistent = match status.consistent {
                    Some(true) => "true",
                    Some(false) => "false",
                    None => "-",
                };
                writeln!(
                    f,
                    "  {:>6} {:>8} {}",
                    status.cluster, status.n_spikes, consistent
                )?;
            }
        }
        writeln!(f, "{} 個檔案", self.files.len())?;
        for file in &self.files {
            writeln!(f, "  {} ({} B)", file.path.display(), file.size)?;
        }
        Ok(())
    }
}
