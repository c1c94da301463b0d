//! # Clustore
//!
//! 聚類計算值緩存：記憶體與磁碟兩層緩存、可插拔的計算項目，
//! 以及隨聚類合併、分割增量更新的協調器。

pub use clustore_cache::{DiskStore, MemoryStore, StoredFile};
pub use clustore_core::*;
pub use clustore_engine::*;
