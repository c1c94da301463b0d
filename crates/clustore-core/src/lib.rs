//! # Clustore Core
//!
//! 核心資料模型與類型定義

pub mod array;
pub mod config;
pub mod field;
pub mod partition;
pub mod update;

// Re-export 主要類型
pub use array::{Array, ArrayData, Dtype};
pub use config::{StoreConfig, StoreMode};
pub use field::{FieldMap, FieldSpec, FieldValue, Tier};
pub use partition::Partition;
pub use update::{UpdateDescription, UpdateInfo};

/// 聚類ID
pub type ClusterId = u64;

/// 事件（spike）ID
pub type SpikeId = u64;

/// 聚類緩存錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("檔案讀寫錯誤: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON 解析錯誤: {0}")]
    Json(#[from] serde_json::Error),

    #[error("未知的欄位: {0}")]
    UnknownField(String),

    #[error("欄位重複註冊: {0}")]
    DuplicateField(String),

    #[error("未設定磁碟目錄")]
    NoDiskStore,

    #[error("磁碟欄位缺少元素類型: {0}")]
    MissingDtype(String),

    #[error("形狀不符: 元素數 {len}，形狀 {shape:?}")]
    ShapeMismatch { len: usize, shape: Vec<usize> },

    #[error("檔案損壞: {path}（{len} 位元組不是 {item_size} 的倍數）")]
    CorruptFile {
        path: String,
        len: usize,
        item_size: usize,
    },

    #[error("資料類型不符: 預期 {expected:?}，實際 {actual:?}")]
    DtypeMismatch { expected: Dtype, actual: Dtype },

    #[error("事件 {spike} 不屬於請求的聚類")]
    SpikeNotInClusters { spike: SpikeId },

    #[error("聚類 {cluster} 沒有欄位 {field} 的緩存")]
    MissingClusterData { cluster: ClusterId, field: String },

    #[error("欄位 {field} 已過期: 聚類 {cluster} 有 {n_spikes} 個事件，緩存有 {n_values} 個值")]
    StaleField {
        cluster: ClusterId,
        field: String,
        n_spikes: usize,
        n_values: usize,
    },

    #[error("欄位 {field} 在聚類 {cluster} 的值不是陣列，無法跨聚類讀取")]
    NotAnArray { cluster: ClusterId, field: String },

    #[error("未知的聚類: {0}")]
    UnknownCluster(ClusterId),
}

pub type Result<T> = std::result::Result<T, StoreError>;
