//! 聚類分割（聚類 → 事件列表）

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{ClusterId, SpikeId};

/// 聚類分割
///
/// 聚類按 ID 升冪排列，每個聚類的事件列表為升冪且彼此不相交。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    spikes_per_cluster: BTreeMap<ClusterId, Vec<SpikeId>>,
}

impl Partition {
    /// 創建空的分割
    pub fn new() -> Self {
        Self::default()
    }

    /// 由每個事件所屬的聚類建立分割（事件 ID = 索引）
    pub fn from_spike_clusters(spike_clusters: &[ClusterId]) -> Self {
        let mut spikes_per_cluster: BTreeMap<ClusterId, Vec<SpikeId>> = BTreeMap::new();
        for (spike, &cluster) in spike_clusters.iter().enumerate() {
            spikes_per_cluster
                .entry(cluster)
                .or_default()
                .push(spike as SpikeId);
        }
        Self { spikes_per_cluster }
    }

    /// 設定聚類的事件（自動排序）
    pub fn insert(&mut self, cluster: ClusterId, mut spikes: Vec<SpikeId>) {
        spikes.sort_unstable();
        self.spikes_per_cluster.insert(cluster, spikes);
    }

    /// 移除聚類，返回其事件
    pub fn remove(&mut self, cluster: ClusterId) -> Option<Vec<SpikeId>> {
        self.spikes_per_cluster.remove(&cluster)
    }

    pub fn spikes(&self, cluster: ClusterId) -> Option<&[SpikeId]> {
        self.spikes_per_cluster.get(&cluster).map(Vec::as_slice)
    }

    pub fn n_spikes(&self, cluster: ClusterId) -> usize {
        self.spikes(cluster).map_or(0, <[SpikeId]>::len)
    }

    pub fn contains(&self, cluster: ClusterId) -> bool {
        self.spikes_per_cluster.contains_key(&cluster)
    }

    /// 所有聚類ID（升冪）
    pub fn cluster_ids(&self) -> Vec<ClusterId> {
        self.spikes_per_cluster.keys().copied().collect()
    }

    /// 聚類數量
    pub fn len(&self) -> usize {
        self.spikes_per_cluster.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spikes_per_cluster.is_empty()
    }

    /// 事件總數
    pub fn total_spikes(&self) -> usize {
        self.spikes_per_cluster.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClusterId, &[SpikeId])> {
        self.spikes_per_cluster
            .iter()
            .map(|(&cluster, spikes)| (cluster, spikes.as_slice()))
    }
}

impl FromIterator<(ClusterId, Vec<SpikeId>)> for Partition {
    fn from_iter<I: IntoIterator<Item = (ClusterId, Vec<SpikeId>)>>(iter: I) -> Self {
        let mut partition = Partition::new();
        for (cluster, spikes) in iter {
            partition.insert(cluster, spikes);
        }
        partition
    }
}
