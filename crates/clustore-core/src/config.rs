//! 緩存配置

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::Result;

/// 計算模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    /// 若項目的一致性檢查通過則跳過計算
    #[default]
    Default,
    /// 無條件重新計算
    Force,
}

/// 聚類緩存配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// 磁碟緩存目錄（None 表示只使用記憶體層）
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// generate 的預設計算模式
    #[serde(default)]
    pub default_mode: StoreMode,

    /// generate 時每處理多少個聚類記錄一次進度（0 表示不記錄）
    #[serde(default)]
    pub progress_every: usize,
}

impl StoreConfig {
    /// 創建使用磁碟目錄的配置
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            default_mode: StoreMode::Default,
            progress_every: 0,
        }
    }

    /// 只使用記憶體層的配置
    pub fn in_memory() -> Self {
        Self {
            path: None,
            default_mode: StoreMode::Default,
            progress_every: 0,
        }
    }

    /// 建構器模式：設置預設計算模式
    pub fn with_default_mode(mut self, mode: StoreMode) -> Self {
        self.default_mode = mode;
        self
    }

    /// 建構器模式：設置進度記錄間隔
    pub fn with_progress_every(mut self, every: usize) -> Self {
        self.progress_every = every;
        self
    }

    /// 從 JSON 字串讀取配置
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// 從 JSON 檔案讀取配置
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}
