//! 緩存項目介面

use clustore_cache::{DiskStore, MemoryStore};
use clustore_core::{
    ClusterId, FieldSpec, Partition, Result, SpikeId, StoreError, StoreMode, Tier, UpdateInfo,
};
use std::ops::AddAssign;

/// 儲存層的唯讀檢視，供一致性檢查使用
#[derive(Clone, Copy)]
pub struct StoreView<'a> {
    memory: &'a MemoryStore,
    disk: Option<&'a DiskStore>,
    spikes_per_cluster: &'a Partition,
}

impl<'a> StoreView<'a> {
    pub fn new(
        memory: &'a MemoryStore,
        disk: Option<&'a DiskStore>,
        spikes_per_cluster: &'a Partition,
    ) -> Self {
        Self {
            memory,
            disk,
            spikes_per_cluster,
        }
    }

    pub fn memory(&self) -> &'a MemoryStore {
        self.memory
    }

    pub fn disk(&self) -> Result<&'a DiskStore> {
        self.disk.ok_or(StoreError::NoDiskStore)
    }

    pub fn spikes_per_cluster(&self) -> &'a Partition {
        self.spikes_per_cluster
    }
}

/// 傳給項目的儲存層與目前分割
pub struct Stores<'a> {
    memory: &'a mut MemoryStore,
    disk: Option<&'a mut DiskStore>,
    spikes_per_cluster: &'a Partition,
}

impl<'a> Stores<'a> {
    pub fn new(
        memory: &'a mut MemoryStore,
        disk: Option<&'a mut DiskStore>,
        spikes_per_cluster: &'a Partition,
    ) -> Self {
        Self {
            memory,
            disk,
            spikes_per_cluster,
        }
    }

    /// 唯讀檢視
    pub fn view(&self) -> StoreView<'_> {
        StoreView::new(&*self.memory, self.disk.as_deref(), self.spikes_per_cluster)
    }

    pub fn memory(&self) -> &MemoryStore {
        &*self.memory
    }

    pub fn memory_mut(&mut self) -> &mut MemoryStore {
        &mut *self.memory
    }

    pub fn disk(&self) -> Result<&DiskStore> {
        self.disk.as_deref().ok_or(StoreError::NoDiskStore)
    }

    pub fn disk_mut(&mut self) -> Result<&mut DiskStore> {
        self.disk.as_deref_mut().ok_or(StoreError::NoDiskStore)
    }

    /// 目前（事件之後）的分割
    pub fn spikes_per_cluster(&self) -> &'a Partition {
        self.spikes_per_cluster
    }

    /// 從各欄位所屬的儲存層刪除聚類的欄位
    pub fn erase_fields(&mut self, clusters: &[ClusterId], fields: &[FieldSpec]) -> Result<()> {
        let memory: Vec<&str> = names_in(fields, Tier::Memory);
        let disk: Vec<&str> = names_in(fields, Tier::Disk);

        if !memory.is_empty() {
            self.memory.erase_fields(clusters, &memory);
        }
        if !disk.is_empty() {
            self.disk_mut()?.erase_fields(clusters, &disk)?;
        }
        Ok(())
    }
}

fn names_in(fields: &[FieldSpec], tier: Tier) -> Vec<&str> {
    fields
        .iter()
        .filter(|spec| spec.tier == tier)
        .map(|spec| spec.name.as_str())
        .collect()
}

/// 緩存項目
///
/// 一個項目負責一個或多個欄位，知道如何為單一聚類計算這些欄位，
/// 以及如何回應拓撲變更事件。
pub trait StoreItem {
    /// 項目名稱
    fn name(&self) -> &str;

    /// 項目負責的欄位
    fn fields(&self) -> &[FieldSpec];

    /// 計算並寫入單一聚類的欄位
    fn store_cluster(
        &mut self,
        stores: &mut Stores<'_>,
        cluster: ClusterId,
        spikes: &[SpikeId],
        mode: StoreMode,
    ) -> Result<()>;

    /// 比較緩存與目前分割是否一致
    ///
    /// 返回 `None` 表示此項目沒有一致性檢查。
    fn is_consistent(
        &self,
        _view: &StoreView<'_>,
        _cluster: ClusterId,
        _spikes: &[SpikeId],
    ) -> Result<Option<bool>> {
        Ok(None)
    }

    /// 回應拓撲變更事件
    ///
    /// 覆寫時必須讓緩存與事件後的分割一致：被刪除的聚類不留下緩存，
    /// 新增的聚類不保留事件前的值。
    fn on_cluster(&mut self, stores: &mut Stores<'_>, up: &UpdateInfo) -> Result<()> {
        default_on_cluster(self, stores, up)
    }
}

/// 預設事件處理：刪除被刪除聚類的欄位，重新計算新增的聚類
pub fn default_on_cluster<I>(item: &mut I, stores: &mut Stores<'_>, up: &UpdateInfo) -> Result<()>
where
    I: StoreItem + ?Sized,
{
    stores.erase_fields(&up.deleted, item.fields())?;

    for &cluster in &up.added {
        let spikes = up
            .new_spikes_per_cluster
            .spikes(cluster)
            .ok_or(StoreError::UnknownCluster(cluster))?;
        item.store_cluster(stores, cluster, spikes, StoreMode::Force)?;
    }
    Ok(())
}

/// generate 的統計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateSummary {
    /// 實際計算的聚類數
    pub computed: usize,
    /// 因一致性檢查通過而跳過的聚類數
    pub skipped: usize,
}

impl AddAssign for GenerateSummary {
    fn add_assign(&mut self, other: Self) {
        self.computed += other.computed;
        self.skipped += other.skipped;
    }
}

/// 依聚類ID升冪為所有聚類寫入項目的欄位
///
/// `StoreMode::Default` 下，一致性檢查返回 `Some(true)` 的聚類會被跳過。
pub fn store_all_clusters(
    item: &mut dyn StoreItem,
    stores: &mut Stores<'_>,
    mode: StoreMode,
    progress_every: usize,
) -> Result<GenerateSummary> {
    let partition = stores.spikes_per_cluster();
    let total = partition.len();
    let mut summary = GenerateSummary::default();

    for (i, (cluster, spikes)) in partition.iter().enumerate() {
        let skip = mode == StoreMode::Default
            && item.is_consistent(&stores.view(), cluster, spikes)? == Some(true);
        if skip {
            tracing::debug!("項目 {} 聚類 {} 緩存一致，跳過", item.name(), cluster);
            summary.skipped += 1;
        } else {
            item.store_cluster(stores, cluster, spikes, mode)?;
            summary.computed += 1;
        }

        if progress_every > 0 && (i + 1) % progress_every == 0 {
            tracing::info!("項目 {}: {}/{} 個聚類", item.name(), i + 1, total);
        }
    }
    Ok(summary)
}
