//! # Clustore Cache
//!
//! 兩層緩存：行程內記憶體與磁碟原始檔案

pub mod disk;
pub mod memory;

// Re-export 主要類型
pub use disk::{DiskStore, StoredFile};
pub use memory::MemoryStore;
