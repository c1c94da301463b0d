//! 跨聚類讀取的重組
//!
//! 每個聚類的緩存陣列與該聚類的事件列表同序（第 i 列對應第 i 個事件）。
//! 請求的事件可以跨聚類、重複、任意排序，輸出依請求的順序排列。

use clustore_core::{Array, ArrayData, ClusterId, Dtype, Result, SpikeId, StoreError};
use std::collections::HashMap;

/// 單一聚類的緩存陣列
#[derive(Debug, Clone)]
pub struct ClusterArray<'a> {
    pub cluster: ClusterId,
    pub spikes: &'a [SpikeId],
    pub array: Array,
}

/// 每列的元素數與列形狀
///
/// 有宣告的列形狀時以宣告為準；否則由陣列形狀推斷，一維陣列的長度
/// 必須是事件數的正整數倍。
fn row_layout(
    field: &str,
    data: &ClusterArray<'_>,
    declared: Option<&[usize]>,
) -> Result<Option<(usize, Vec<usize>)>> {
    let n_spikes = data.spikes.len();
    let len = data.array.len();
    let shape = data.array.shape();
    let stale = || StoreError::StaleField {
        cluster: data.cluster,
        field: field.to_string(),
        n_spikes,
        n_values: data.array.n_rows(),
    };

    if let Some(row_shape) = declared {
        let row_len: usize = row_shape.iter().product();
        if len != n_spikes * row_len || (shape.len() > 1 && shape[0] != n_spikes) {
            return Err(stale());
        }
        return Ok(Some((row_len, row_shape.to_vec())));
    }

    if shape.len() > 1 {
        if shape[0] != n_spikes {
            return Err(stale());
        }
        let row_shape = shape[1..].to_vec();
        return Ok(Some((row_shape.iter().product(), row_shape)));
    }

    if n_spikes == 0 {
        return if data.array.is_empty() {
            Ok(None)
        } else {
            Err(stale())
        };
    }
    // 空檔案或長度不足都視為過期
    if len < n_spikes || len % n_spikes != 0 {
        return Err(stale());
    }
    let row_len = len / n_spikes;
    let row_shape = if row_len == 1 { Vec::new() } else { vec![row_len] };
    Ok(Some((row_len, row_shape)))
}

/// 依請求順序重組跨聚類的數值
///
/// 請求中不屬於任何給定聚類的事件會返回 `SpikeNotInClusters`。
/// `row_shape` 為欄位宣告的列形狀，沒有宣告時由資料推斷。
pub fn reassemble(
    field: &str,
    dtype: Dtype,
    row_shape: Option<&[usize]>,
    data: &[ClusterArray<'_>],
    requested: &[SpikeId],
) -> Result<Array> {
    // 確認每列的長度一致
    let mut layout: Option<(usize, Vec<usize>)> = None;
    for cluster_data in data {
        if cluster_data.array.dtype() != dtype {
            return Err(StoreError::DtypeMismatch {
                expected: dtype,
                actual: cluster_data.array.dtype(),
            });
        }
        let Some(current) = row_layout(field, cluster_data, row_shape)? else {
            continue;
        };
        match &layout {
            Some(existing) if existing.0 != current.0 => {
                return Err(StoreError::ShapeMismatch {
                    len: cluster_data.array.len(),
                    shape: cluster_data.array.shape().to_vec(),
                });
            }
            Some(_) => {}
            None => layout = Some(current),
        }
    }
    let (row_len, row_shape) = layout
        .or_else(|| row_shape.map(|shape| (shape.iter().product(), shape.to_vec())))
        .unwrap_or((1, Vec::new()));

    // 事件 → (聚類索引, 聚類內位置)
    let n_total: usize = data.iter().map(|d| d.spikes.len()).sum();
    let mut index: HashMap<SpikeId, (usize, usize)> = HashMap::with_capacity(n_total);
    for (k, cluster_data) in data.iter().enumerate() {
        for (position, &spike) in cluster_data.spikes.iter().enumerate() {
            index.insert(spike, (k, position));
        }
    }

    let mut out = ArrayData::with_capacity(dtype, requested.len() * row_len);
    for &spike in requested {
        let &(k, position) = index
            .get(&spike)
            .ok_or(StoreError::SpikeNotInClusters { spike })?;
        out.push_row(data[k].array.data(), position, row_len)?;
    }

    let mut shape = Vec::with_capacity(1 + row_shape.len());
    shape.push(requested.len());
    shape.extend(row_shape);
    Array::new(out, shape)
}
