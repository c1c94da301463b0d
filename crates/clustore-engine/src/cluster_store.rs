//! 聚類緩存協調器

use clustore_cache::{DiskStore, MemoryStore, StoredFile};
use clustore_core::{
    Array, ClusterId, Dtype, FieldSpec, FieldValue, Partition, Result, SpikeId, StoreConfig,
    StoreError, StoreMode, Tier, UpdateInfo,
};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::item::{store_all_clusters, GenerateSummary, StoreItem, StoreView, Stores};
use crate::reassembly::{reassemble, ClusterArray};
use crate::status::{ClusterStatus, ItemStatus, StoreStatus};

/// 聚類緩存
///
/// 持有已註冊的項目、兩個儲存層與目前的分割，負責批次生成與增量更新。
pub struct ClusterStore {
    /// 配置
    config: StoreConfig,

    /// 記憶體層
    memory_store: MemoryStore,

    /// 磁碟層（未設定目錄時為 None）
    disk_store: Option<DiskStore>,

    /// 已註冊的項目（依註冊順序）
    items: Vec<Box<dyn StoreItem>>,

    /// 欄位名 → (項目索引, 欄位宣告)
    fields: BTreeMap<String, (usize, FieldSpec)>,

    /// 目前的分割
    spikes_per_cluster: Partition,
}

impl ClusterStore {
    /// 依配置創建聚類緩存
    pub fn new(config: StoreConfig) -> Result<Self> {
        let disk_store = config.path.as_ref().map(DiskStore::new).transpose()?;
        Ok(Self {
            config,
            memory_store: MemoryStore::new(),
            disk_store,
            items: Vec::new(),
            fields: BTreeMap::new(),
            spikes_per_cluster: Partition::new(),
        })
    }

    /// 在目錄中開啟聚類緩存（沿用既有檔案）
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(StoreConfig::new(path))
    }

    /// 只使用記憶體層的聚類緩存
    pub fn in_memory() -> Self {
        Self {
            config: StoreConfig::in_memory(),
            memory_store: MemoryStore::new(),
            disk_store: None,
            items: Vec::new(),
            fields: BTreeMap::new(),
            spikes_per_cluster: Partition::new(),
        }
    }

    /// 註冊項目
    pub fn register_item<I: StoreItem + 'static>(&mut self, item: I) -> Result<()> {
        let index = self.items.len();
        let mut disk_fields = Vec::new();

        for spec in item.fields() {
            if self.fields.contains_key(&spec.name)
                || item.fields().iter().filter(|s| s.name == spec.name).count() > 1
            {
                return Err(StoreError::DuplicateField(spec.name.clone()));
            }
            if spec.is_disk() {
                if spec.dtype.is_none() {
                    return Err(StoreError::MissingDtype(spec.name.clone()));
                }
                if self.disk_store.is_none() {
                    tracing::warn!("項目 {} 的欄位 {} 需要磁碟目錄", item.name(), spec.name);
                    return Err(StoreError::NoDiskStore);
                }
                disk_fields.push(spec.name.clone());
            }
        }

        if let Some(disk_store) = self.disk_store.as_mut() {
            disk_store.register_file_extensions(disk_fields);
        }
        for spec in item.fields() {
            self.fields.insert(spec.name.clone(), (index, spec.clone()));
        }

        tracing::info!(
            "註冊項目 {}（{} 個欄位）",
            item.name(),
            item.fields().len()
        );
        self.items.push(Box::new(item));
        Ok(())
    }

    /// 註冊預設建構的項目
    pub fn register<I: StoreItem + Default + 'static>(&mut self) -> Result<()> {
        self.register_item(I::default())
    }

    /// 以配置中的預設模式生成所有緩存
    pub fn generate(&mut self, spikes_per_cluster: Partition) -> Result<GenerateSummary> {
        let mode = self.config.default_mode;
        self.generate_with_mode(spikes_per_cluster, mode)
    }

    /// 記錄分割，並為每個項目、每個聚類寫入欄位
    pub fn generate_with_mode(
        &mut self,
        spikes_per_cluster: Partition,
        mode: StoreMode,
    ) -> Result<GenerateSummary> {
        tracing::info!(
            "開始生成緩存：項目 {} 個，聚類 {} 個，事件 {} 個",
            self.items.len(),
            spikes_per_cluster.len(),
            spikes_per_cluster.total_spikes()
        );
        let start_time = std::time::Instant::now();

        self.spikes_per_cluster = spikes_per_cluster;

        let mut summary = GenerateSummary::default();
        for item in self.items.iter_mut() {
            tracing::debug!("生成項目 {}", item.name());
            let mut stores = Stores::new(
                &mut self.memory_store,
                self.disk_store.as_mut(),
                &self.spikes_per_cluster,
            );
            summary += store_all_clusters(
                item.as_mut(),
                &mut stores,
                mode,
                self.config.progress_every,
            )?;
        }

        tracing::info!(
            "緩存生成完成，耗時 {:?}：計算 {} 個，跳過 {} 個",
            start_time.elapsed(),
            summary.computed,
            summary.skipped
        );
        Ok(summary)
    }

    /// 處理拓撲變更事件
    pub fn on_cluster(&mut self, up: &UpdateInfo) -> Result<()> {
        tracing::info!(
            "聚類變更 {:?}：新增 {:?}，刪除 {:?}",
            up.description,
            up.added,
            up.deleted
        );

        self.spikes_per_cluster = up.new_spikes_per_cluster.clone();

        for item in self.items.iter_mut() {
            let mut stores = Stores::new(
                &mut self.memory_store,
                self.disk_store.as_mut(),
                &self.spikes_per_cluster,
            );
            item.on_cluster(&mut stores, up)?;
        }
        Ok(())
    }

    fn field_spec(&self, field: &str) -> Result<&FieldSpec> {
        self.fields
            .get(field)
            .map(|(_, spec)| spec)
            .ok_or_else(|| StoreError::UnknownField(field.to_string()))
    }

    fn disk(&self) -> Result<&DiskStore> {
        self.disk_store.as_ref().ok_or(StoreError::NoDiskStore)
    }

    /// 讀取單一聚類的欄位（交給欄位所屬的儲存層）
    pub fn field(&self, field: &str, cluster: ClusterId) -> Result<Option<FieldValue>> {
        let spec = self.field_spec(field)?;
        match (spec.tier, spec.dtype) {
            (Tier::Memory, _) => Ok(self.memory_store.load_field(cluster, field).cloned()),
            (Tier::Disk, Some(dtype)) => Ok(self
                .disk()?
                .load(cluster, field, dtype, None)?
                .map(FieldValue::Array)),
            (Tier::Disk, None) => Err(StoreError::MissingDtype(field.to_string())),
        }
    }

    fn cluster_array(&self, spec: &FieldSpec, cluster: ClusterId) -> Result<Option<Array>> {
        match spec.tier {
            Tier::Memory => match self.memory_store.load_field(cluster, &spec.name) {
                None => Ok(None),
                Some(FieldValue::Array(array)) => Ok(Some(array.clone())),
                Some(_) => Err(StoreError::NotAnArray {
                    cluster,
                    field: spec.name.clone(),
                }),
            },
            Tier::Disk => {
                let dtype = spec
                    .dtype
                    .ok_or_else(|| StoreError::MissingDtype(spec.name.clone()))?;
                self.disk()?.load(cluster, &spec.name, dtype, None)
            }
        }
    }

    /// 跨聚類讀取
    ///
    /// 返回與 `spikes` 同長同序的陣列；`spikes` 必須都屬於 `clusters`。
    pub fn load(&self, field: &str, clusters: &[ClusterId], spikes: &[SpikeId]) -> Result<Array> {
        let spec = self.field_spec(field)?;

        let mut data = Vec::with_capacity(clusters.len());
        for &cluster in clusters {
            let cluster_spikes = self
                .spikes_per_cluster
                .spikes(cluster)
                .ok_or(StoreError::UnknownCluster(cluster))?;
            let array = self.cluster_array(spec, cluster)?.ok_or_else(|| {
                StoreError::MissingClusterData {
                    cluster,
                    field: field.to_string(),
                }
            })?;
            data.push(ClusterArray {
                cluster,
                spikes: cluster_spikes,
                array,
            });
        }

        let dtype = spec
            .dtype
            .or_else(|| data.first().map(|d| d.array.dtype()))
            .unwrap_or(Dtype::F64);
        reassemble(field, dtype, spec.row_shape.as_deref(), &data, spikes)
    }

    /// 各項目、各聚類的一致性與磁碟檔案
    pub fn status(&self) -> Result<StoreStatus> {
        let mut items = Vec::with_capacity(self.items.len());

        let view = StoreView::new(
            &self.memory_store,
            self.disk_store.as_ref(),
            &self.spikes_per_cluster,
        );
        for item in &self.items {
            let mut clusters = Vec::with_capacity(self.spikes_per_cluster.len());
            for (cluster, spikes) in self.spikes_per_cluster.iter() {
                clusters.push(ClusterStatus {
                    cluster,
                    n_spikes: spikes.len(),
                    consistent: item.is_consistent(&view, cluster, spikes)?,
                });
            }
            items.push(ItemStatus {
                name: item.name().to_string(),
                fields: item.fields().iter().map(|s| s.name.clone()).collect(),
                clusters,
            });
        }

        Ok(StoreStatus {
            items,
            files: self.files()?,
        })
    }

    /// 以日誌輸出狀態報告
    pub fn display_status(&self) -> Result<()> {
        let status = self.status()?;
        tracing::info!("緩存狀態:\n{}", status);
        for item in &status.items {
            let stale = item.stale_clusters();
            if !stale.is_empty() {
                tracing::warn!("項目 {} 有 {} 個過期聚類: {:?}", item.name, stale.len(), stale);
            }
        }
        Ok(())
    }

    /// 磁碟上的緩存檔案
    pub fn files(&self) -> Result<Vec<StoredFile>> {
        match &self.disk_store {
            Some(disk_store) => disk_store.files(),
            None => Ok(Vec::new()),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn memory_store(&self) -> &MemoryStore {
        &self.memory_store
    }

    pub fn disk_store(&self) -> Option<&DiskStore> {
        self.disk_store.as_ref()
    }

    /// 目前的分割
    pub fn spikes_per_cluster(&self) -> &Partition {
        &self.spikes_per_cluster
    }

    /// 目前分割中的聚類ID（升冪）
    pub fn cluster_ids(&self) -> Vec<ClusterId> {
        self.spikes_per_cluster.cluster_ids()
    }

    /// 已註冊項目的名稱（依註冊順序）
    pub fn item_names(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.name()).collect()
    }

    /// 已註冊的欄位
    pub fn field_specs(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.values().map(|(_, spec)| spec)
    }
}
