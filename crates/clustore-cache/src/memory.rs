//! 記憶體緩存層

use clustore_core::{ClusterId, FieldMap, FieldValue};
use std::collections::BTreeMap;

/// 記憶體緩存
///
/// 每個聚類一筆欄位映射，只存活於行程生命週期內。
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<ClusterId, FieldMap>,
}

impl MemoryStore {
    /// 創建空的記憶體緩存
    pub fn new() -> Self {
        Self::default()
    }

    /// 合併欄位值到聚類的記錄（不存在時建立）
    pub fn store<K, I>(&mut self, cluster: ClusterId, fields: I)
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, FieldValue)>,
    {
        let record = self.records.entry(cluster).or_default();
        for (name, value) in fields {
            record.insert(name.into(), value);
        }
        if record.is_empty() {
            self.records.remove(&cluster);
        }
    }

    /// 聚類的完整欄位映射（未知聚類返回空映射）
    pub fn load(&self, cluster: ClusterId) -> FieldMap {
        self.records.get(&cluster).cloned().unwrap_or_default()
    }

    /// 單一欄位
    pub fn load_field(&self, cluster: ClusterId, name: &str) -> Option<&FieldValue> {
        self.records.get(&cluster)?.get(name)
    }

    /// 多個欄位，每個請求的名稱都會出現在結果中
    pub fn load_fields(
        &self,
        cluster: ClusterId,
        names: &[&str],
    ) -> BTreeMap<String, Option<FieldValue>> {
        names
            .iter()
            .map(|&name| (name.to_string(), self.load_field(cluster, name).cloned()))
            .collect()
    }

    /// 刪除聚類的記錄，不存在的ID會被忽略
    pub fn erase(&mut self, clusters: &[ClusterId]) {
        for cluster in clusters {
            self.records.remove(cluster);
        }
    }

    /// 只刪除指定欄位，記錄變空時一併刪除
    pub fn erase_fields(&mut self, clusters: &[ClusterId], names: &[&str]) {
        for cluster in clusters {
            let Some(record) = self.records.get_mut(cluster) else {
                continue;
            };
            for name in names {
                record.remove(*name);
            }
            if record.is_empty() {
                self.records.remove(cluster);
            }
        }
    }

    /// 目前記錄的聚類ID（升冪）
    pub fn cluster_ids(&self) -> Vec<ClusterId> {
        self.records.keys().copied().collect()
    }

    pub fn contains(&self, cluster: ClusterId) -> bool {
        self.records.contains_key(&cluster)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 清除所有記錄
    pub fn clear(&mut self) {
        self.records.clear();
    }
}
