//! 內建項目

use clustore_core::{
    ClusterId, FieldSpec, FieldValue, Result, SpikeId, StoreMode, UpdateDescription, UpdateInfo,
};

use crate::item::{default_on_cluster, StoreItem, StoreView, Stores};

/// 事件數欄位
pub const N_SPIKES: &str = "n_spikes";

/// 每個聚類的事件數（記憶體層）
///
/// 合併時直接加總被合併聚類的緩存值，不重新計算。
#[derive(Debug)]
pub struct SpikeCountItem {
    fields: Vec<FieldSpec>,
}

impl Default for SpikeCountItem {
    fn default() -> Self {
        Self {
            fields: vec![FieldSpec::memory(N_SPIKES)],
        }
    }
}

impl StoreItem for SpikeCountItem {
    fn name(&self) -> &str {
        "spike count"
    }

    fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    fn store_cluster(
        &mut self,
        stores: &mut Stores<'_>,
        cluster: ClusterId,
        spikes: &[SpikeId],
        _mode: StoreMode,
    ) -> Result<()> {
        stores
            .memory_mut()
            .store(cluster, [(N_SPIKES, FieldValue::from(spikes.len()))]);
        Ok(())
    }

    fn is_consistent(
        &self,
        view: &StoreView<'_>,
        cluster: ClusterId,
        spikes: &[SpikeId],
    ) -> Result<Option<bool>> {
        let cached = view
            .memory()
            .load_field(cluster, N_SPIKES)
            .and_then(FieldValue::as_int);
        Ok(Some(cached == Some(spikes.len() as i64)))
    }

    fn on_cluster(&mut self, stores: &mut Stores<'_>, up: &UpdateInfo) -> Result<()> {
        let &[merged] = up.added.as_slice() else {
            return default_on_cluster(self, stores, up);
        };
        if up.description != UpdateDescription::Merge {
            return default_on_cluster(self, stores, up);
        }

        // 沒有緩存的聚類以舊分割的事件數代替
        let total: i64 = up
            .deleted
            .iter()
            .map(|&cluster| {
                stores
                    .memory()
                    .load_field(cluster, N_SPIKES)
                    .and_then(FieldValue::as_int)
                    .unwrap_or_else(|| up.old_spikes_per_cluster.n_spikes(cluster) as i64)
            })
            .sum();

        tracing::debug!("合併 {:?} → {}，事件數 {}", up.deleted, merged, total);
        stores.erase_fields(&up.deleted, &self.fields)?;
        stores
            .memory_mut()
            .store(merged, [(N_SPIKES, FieldValue::Int(total))]);
        Ok(())
    }
}
