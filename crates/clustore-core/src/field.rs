//! 欄位模型

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::array::{Array, Dtype};

/// 單一聚類的欄位映射（欄位名 → 值）
pub type FieldMap = BTreeMap<String, FieldValue>;

/// 儲存層
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// 行程內記憶體
    Memory,
    /// 磁碟檔案
    Disk,
}

/// 欄位宣告
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// 欄位名稱
    pub name: String,

    /// 儲存層
    pub tier: Tier,

    /// 元素類型（磁碟欄位必填）
    pub dtype: Option<Dtype>,

    /// 每個事件一列的形狀（純量為空），None 表示由資料推斷
    #[serde(default)]
    pub row_shape: Option<Vec<usize>>,
}

impl FieldSpec {
    /// 記憶體欄位
    pub fn memory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tier: Tier::Memory,
            dtype: None,
            row_shape: None,
        }
    }

    /// 磁碟欄位
    pub fn disk(name: impl Into<String>, dtype: Dtype) -> Self {
        Self {
            name: name.into(),
            tier: Tier::Disk,
            dtype: Some(dtype),
            row_shape: None,
        }
    }

    /// 建構器模式：宣告每列的形狀
    pub fn with_row_shape(mut self, row_shape: &[usize]) -> Self {
        self.row_shape = Some(row_shape.to_vec());
        self
    }

    /// 每列的元素數（未宣告時為 None）
    pub fn row_len(&self) -> Option<usize> {
        self.row_shape.as_ref().map(|shape| shape.iter().product())
    }

    pub fn is_disk(&self) -> bool {
        self.tier == Tier::Disk
    }
}

/// 記憶體層的欄位值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
    Array(Array),
}

impl FieldValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(value) => Some(*value),
            FieldValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            FieldValue::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Array> {
        match self {
            FieldValue::Array(array) => Some(array),
            _ => None,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<usize> for FieldValue {
    fn from(value: usize) -> Self {
        FieldValue::Int(value as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Array> for FieldValue {
    fn from(array: Array) -> Self {
        FieldValue::Array(array)
    }
}
