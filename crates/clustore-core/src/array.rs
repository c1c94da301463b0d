//! 數值陣列模型
//!
//! 磁碟檔案只存放原始的 little-endian 元素，沒有任何標頭；
//! 讀取時必須由呼叫者提供 [`Dtype`] 與形狀。

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Result, StoreError};

/// 元素類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    U8,
    I32,
    I64,
    U64,
    F32,
    F64,
}

impl Dtype {
    /// 單一元素的位元組數
    pub fn item_size(self) -> usize {
        match self {
            Dtype::U8 => 1,
            Dtype::I32 | Dtype::F32 => 4,
            Dtype::I64 | Dtype::U64 | Dtype::F64 => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Dtype::U8 => "u8",
            Dtype::I32 => "i32",
            Dtype::I64 => "i64",
            Dtype::U64 => "u64",
            Dtype::F32 => "f32",
            Dtype::F64 => "f64",
        }
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 可存放於 [`ArrayData`] 的元素類型
pub trait Element: Copy + PartialEq + fmt::Debug + 'static {
    const DTYPE: Dtype;

    fn wrap(values: Vec<Self>) -> ArrayData;

    fn view(data: &ArrayData) -> Option<&[Self]>;

    fn write_le(self, out: &mut Vec<u8>);

    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_element {
    ($t:ty, $variant:ident) => {
        impl Element for $t {
            const DTYPE: Dtype = Dtype::$variant;

            fn wrap(values: Vec<Self>) -> ArrayData {
                ArrayData::$variant(values)
            }

            fn view(data: &ArrayData) -> Option<&[Self]> {
                match data {
                    ArrayData::$variant(values) => Some(values),
                    _ => None,
                }
            }

            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn read_le(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                buf.copy_from_slice(bytes);
                <$t>::from_le_bytes(buf)
            }
        }

        impl From<Vec<$t>> for Array {
            fn from(values: Vec<$t>) -> Self {
                Array::from_data(<$t as Element>::wrap(values))
            }
        }
    };
}

impl_element!(u8, U8);
impl_element!(i32, I32);
impl_element!(i64, I64);
impl_element!(u64, U64);
impl_element!(f32, F32);
impl_element!(f64, F64);

/// 依類型分派的扁平資料
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrayData {
    U8(Vec<u8>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! dispatch {
    ($data:expr, $values:ident => $body:expr) => {
        match $data {
            ArrayData::U8($values) => $body,
            ArrayData::I32($values) => $body,
            ArrayData::I64($values) => $body,
            ArrayData::U64($values) => $body,
            ArrayData::F32($values) => $body,
            ArrayData::F64($values) => $body,
        }
    };
}

fn encode<T: Element>(values: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * T::DTYPE.item_size());
    for &value in values {
        value.write_le(&mut out);
    }
    out
}

fn decode<T: Element>(bytes: &[u8]) -> ArrayData {
    T::wrap(
        bytes
            .chunks_exact(T::DTYPE.item_size())
            .map(T::read_le)
            .collect(),
    )
}

fn copy_row<T: Copy>(dst: &mut Vec<T>, src: &[T], row: usize, row_len: usize) -> Result<()> {
    let start = row * row_len;
    let values = src
        .get(start..start + row_len)
        .ok_or_else(|| StoreError::ShapeMismatch {
            len: src.len(),
            shape: vec![row + 1, row_len],
        })?;
    dst.extend_from_slice(values);
    Ok(())
}

impl ArrayData {
    /// 創建指定類型的空資料
    pub fn with_capacity(dtype: Dtype, capacity: usize) -> Self {
        match dtype {
            Dtype::U8 => ArrayData::U8(Vec::with_capacity(capacity)),
            Dtype::I32 => ArrayData::I32(Vec::with_capacity(capacity)),
            Dtype::I64 => ArrayData::I64(Vec::with_capacity(capacity)),
            Dtype::U64 => ArrayData::U64(Vec::with_capacity(capacity)),
            Dtype::F32 => ArrayData::F32(Vec::with_capacity(capacity)),
            Dtype::F64 => ArrayData::F64(Vec::with_capacity(capacity)),
        }
    }

    pub fn dtype(&self) -> Dtype {
        match self {
            ArrayData::U8(_) => Dtype::U8,
            ArrayData::I32(_) => Dtype::I32,
            ArrayData::I64(_) => Dtype::I64,
            ArrayData::U64(_) => Dtype::U64,
            ArrayData::F32(_) => Dtype::F32,
            ArrayData::F64(_) => Dtype::F64,
        }
    }

    pub fn len(&self) -> usize {
        dispatch!(self, values => values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 轉換為原始 little-endian 位元組
    pub fn to_le_bytes(&self) -> Vec<u8> {
        dispatch!(self, values => encode(values))
    }

    /// 以指定類型解讀原始位元組
    ///
    /// 不足一個元素的尾端位元組會被忽略，呼叫者應先檢查長度。
    pub fn from_le_bytes(dtype: Dtype, bytes: &[u8]) -> Self {
        match dtype {
            Dtype::U8 => decode::<u8>(bytes),
            Dtype::I32 => decode::<i32>(bytes),
            Dtype::I64 => decode::<i64>(bytes),
            Dtype::U64 => decode::<u64>(bytes),
            Dtype::F32 => decode::<f32>(bytes),
            Dtype::F64 => decode::<f64>(bytes),
        }
    }

    /// 從 `src` 複製第 `row` 列（每列 `row_len` 個元素）附加到尾端
    pub fn push_row(&mut self, src: &ArrayData, row: usize, row_len: usize) -> Result<()> {
        match (&mut *self, src) {
            (ArrayData::U8(dst), ArrayData::U8(src)) => copy_row(dst, src, row, row_len),
            (ArrayData::I32(dst), ArrayData::I32(src)) => copy_row(dst, src, row, row_len),
            (ArrayData::I64(dst), ArrayData::I64(src)) => copy_row(dst, src, row, row_len),
            (ArrayData::U64(dst), ArrayData::U64(src)) => copy_row(dst, src, row, row_len),
            (ArrayData::F32(dst), ArrayData::F32(src)) => copy_row(dst, src, row, row_len),
            (ArrayData::F64(dst), ArrayData::F64(src)) => copy_row(dst, src, row, row_len),
            (dst, src) => Err(StoreError::DtypeMismatch {
                expected: dst.dtype(),
                actual: src.dtype(),
            }),
        }
    }
}

/// 帶形狀的數值陣列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Array {
    data: ArrayData,
    shape: Vec<usize>,
}

impl Array {
    /// 創建陣列，形狀的乘積必須等於元素數
    pub fn new(data: ArrayData, shape: Vec<usize>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(StoreError::ShapeMismatch {
                len: data.len(),
                shape,
            });
        }
        Ok(Self { data, shape })
    }

    /// 以一維形狀包裝資料
    pub fn from_data(data: ArrayData) -> Self {
        let shape = vec![data.len()];
        Self { data, shape }
    }

    pub fn dtype(&self) -> Dtype {
        self.data.dtype()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 第一維的長度（0 維陣列視為 1 列）
    pub fn n_rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn into_data(self) -> ArrayData {
        self.data
    }

    /// 以指定元素類型檢視資料
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::view(&self.data)
    }

    /// 改變形狀
    pub fn reshape(self, shape: &[usize]) -> Result<Self> {
        Self::new(self.data, shape.to_vec())
    }

    /// 攤平成一維
    pub fn ravel(self) -> Self {
        Self::from_data(self.data)
    }
}

impl<T: Element> FromIterator<T> for Array {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Array::from_data(T::wrap(iter.into_iter().collect()))
    }
}
