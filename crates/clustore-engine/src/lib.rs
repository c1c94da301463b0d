//! # Clustore Engine
//!
//! 緩存項目介面、聚類緩存協調器與跨聚類讀取

pub mod cluster_store;
pub mod item;
pub mod items;
pub mod reassembly;
pub mod status;

// Re-export 主要類型
pub use cluster_store::ClusterStore;
pub use item::{
    default_on_cluster, store_all_clusters, GenerateSummary, StoreItem, StoreView, Stores,
};
pub use items::SpikeCountItem;
pub use status::{ClusterStatus, ItemStatus, StoreStatus};
