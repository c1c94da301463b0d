//! 聚類拓撲變更事件
//!
//! 事件由外部的聚類編輯層產生，緩存只負責回應。這裡的 `merge`、`assign`
//! 建構器只是依分割推導事件的輔助函式，供測試與沒有編輯層的呼叫者使用。

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::partition::Partition;
use crate::{ClusterId, Result, SpikeId, StoreError};

/// 變更類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateDescription {
    /// 合併
    Merge,
    /// 重新指派事件
    Assign,
    /// 分割
    Split,
    /// 復原
    Undo,
    /// 重做
    Redo,
}

/// 拓撲變更事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateInfo {
    /// 變更類型
    pub description: UpdateDescription,

    /// 新增的聚類
    pub added: Vec<ClusterId>,

    /// 刪除的聚類
    pub deleted: Vec<ClusterId>,

    /// 受影響的事件
    pub spikes: Vec<SpikeId>,

    /// 變更後的分割
    pub new_spikes_per_cluster: Partition,

    /// 變更前的分割
    pub old_spikes_per_cluster: Partition,
}

impl UpdateInfo {
    /// 合併多個聚類為 `to`
    ///
    /// `to` 已存在時其事件一併併入，並列在 `deleted` 中。
    pub fn merge(old: &Partition, clusters: &[ClusterId], to: ClusterId) -> Result<Self> {
        let mut deleted: BTreeSet<ClusterId> = clusters.iter().copied().collect();
        if old.contains(to) {
            deleted.insert(to);
        }
        let deleted: Vec<ClusterId> = deleted.into_iter().collect();

        let mut new = old.clone();
        let mut spikes = Vec::new();
        for &cluster in &deleted {
            let cluster_spikes = new
                .remove(cluster)
                .ok_or(StoreError::UnknownCluster(cluster))?;
            spikes.extend(cluster_spikes);
        }
        spikes.sort_unstable();
        new.insert(to, spikes.clone());

        Ok(Self {
            description: UpdateDescription::Merge,
            added: vec![to],
            deleted,
            spikes,
            new_spikes_per_cluster: new,
            old_spikes_per_cluster: old.clone(),
        })
    }

    /// 將事件指派到聚類 `to`
    ///
    /// 失去事件的聚類被刪除，其餘事件移到新聚類。新聚類ID由呼叫者以
    /// `next_id` 決定起點，依序取第一個在新舊分割中都未使用的ID。
    pub fn assign(
        old: &Partition,
        spike_ids: &[SpikeId],
        to: ClusterId,
        next_id: ClusterId,
    ) -> Result<Self> {
        let moved: BTreeSet<SpikeId> = spike_ids.iter().copied().collect();

        let mut deleted = Vec::new();
        let mut remainders = Vec::new();
        let mut found = BTreeSet::new();
        for (cluster, spikes) in old.iter() {
            let (taken, kept): (Vec<SpikeId>, Vec<SpikeId>) =
                spikes.iter().copied().partition(|spike| moved.contains(spike));
            if taken.is_empty() && cluster != to {
                continue;
            }
            found.extend(taken);
            deleted.push(cluster);
            if cluster != to && !kept.is_empty() {
                remainders.push(kept);
            }
        }

        if let Some(&spike) = moved.iter().find(|spike| !found.contains(spike)) {
            return Err(StoreError::SpikeNotInClusters { spike });
        }

        let mut new = old.clone();
        for &cluster in &deleted {
            new.remove(cluster);
        }

        let mut target: Vec<SpikeId> = moved.iter().copied().collect();
        target.extend(old.spikes(to).unwrap_or_default());
        target.sort_unstable();
        target.dedup();
        let mut added = vec![to];
        new.insert(to, target);

        let mut candidate = next_id;
        for kept in remainders {
            while new.contains(candidate) || old.contains(candidate) {
                candidate += 1;
            }
            new.insert(candidate, kept);
            added.push(candidate);
        }
        added.sort_unstable();

        let mut spikes: Vec<SpikeId> = deleted
            .iter()
            .flat_map(|&cluster| old.spikes(cluster).unwrap_or_default().iter().copied())
            .collect();
        spikes.sort_unstable();

        Ok(Self {
            description: UpdateDescription::Assign,
            added,
            deleted,
            spikes,
            new_spikes_per_cluster: new,
            old_spikes_per_cluster: old.clone(),
        })
    }

    /// 反向事件
    pub fn undo(&self) -> Self {
        Self {
            description: UpdateDescription::Undo,
            added: self.deleted.clone(),
            deleted: self.added.clone(),
            spikes: self.spikes.clone(),
            new_spikes_per_cluster: self.old_spikes_per_cluster.clone(),
            old_spikes_per_cluster: self.new_spikes_per_cluster.clone(),
        }
    }
}
