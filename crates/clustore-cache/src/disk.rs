//! 磁碟緩存層
//!
//! 每個（聚類, 欄位）對應一個檔案 `<root>/<cluster>.<field>`，內容是原始的
//! little-endian 元素，沒有標頭。讀取時必須提供元素類型，以錯誤的類型或形狀
//! 讀取會得到錯誤的數值而不會報錯。
//!
//! 已知聚類由掃描目錄得出，不另外維護索引檔，因此重新啟動後狀態可直接沿用。

use chrono::{DateTime, Local};
use clustore_core::{Array, ArrayData, ClusterId, Dtype, Result, StoreError};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// 磁碟上的緩存檔案
#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    pub path: PathBuf,
    pub cluster: ClusterId,
    pub field: String,
    /// 檔案大小（位元組）
    pub size: u64,
    pub modified: Option<DateTime<Local>>,
}

/// 磁碟緩存
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
    extensions: BTreeSet<String>,
}

impl DiskStore {
    /// 在 `root` 建立磁碟緩存，目錄不存在時會自動建立
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        tracing::debug!("磁碟緩存目錄: {}", root.display());
        Ok(Self {
            root,
            extensions: BTreeSet::new(),
        })
    }

    /// 宣告磁碟欄位名稱（決定檔名與目錄掃描）
    pub fn register_file_extensions<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions.extend(names.into_iter().map(Into::into));
    }

    pub fn file_extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 聚類欄位的檔案路徑
    pub fn path(&self, cluster: ClusterId, field: &str) -> PathBuf {
        self.root.join(format!("{}.{}", cluster, field))
    }

    pub fn exists(&self, cluster: ClusterId, field: &str) -> bool {
        self.path(cluster, field).is_file()
    }

    /// 寫入欄位，覆蓋既有檔案
    ///
    /// 未註冊的欄位會自動註冊。
    pub fn store<'a, I>(&mut self, cluster: ClusterId, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a Array)>,
    {
        for (name, array) in fields {
            if !self.extensions.contains(name) {
                self.extensions.insert(name.to_string());
            }
            let path = self.path(cluster, name);
            fs::write(&path, array.data().to_le_bytes())?;
            tracing::debug!(
                "寫入 {}（{} 個 {} 元素）",
                path.display(),
                array.len(),
                array.dtype()
            );
        }
        Ok(())
    }

    /// 讀取單一欄位
    ///
    /// 檔案不存在時返回 `None`；給定 `shape` 時會重新塑形，否則返回一維陣列。
    pub fn load(
        &self,
        cluster: ClusterId,
        field: &str,
        dtype: Dtype,
        shape: Option<&[usize]>,
    ) -> Result<Option<Array>> {
        let path = self.path(cluster, field);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if bytes.len() % dtype.item_size() != 0 {
            return Err(StoreError::CorruptFile {
                path: path.display().to_string(),
                len: bytes.len(),
                item_size: dtype.item_size(),
            });
        }

        let array = Array::from_data(ArrayData::from_le_bytes(dtype, &bytes));
        match shape {
            Some(shape) => array.reshape(shape).map(Some),
            None => Ok(Some(array)),
        }
    }

    /// 讀取多個欄位，缺少的欄位對應 `None`
    pub fn load_fields(
        &self,
        cluster: ClusterId,
        fields: &[&str],
        dtype: Dtype,
        shape: Option<&[usize]>,
    ) -> Result<BTreeMap<String, Option<Array>>> {
        let mut loaded = BTreeMap::new();
        for &field in fields {
            loaded.insert(field.to_string(), self.load(cluster, field, dtype, shape)?);
        }
        Ok(loaded)
    }

    /// 刪除聚類的所有已知欄位檔案，不存在的檔案會被忽略
    pub fn erase(&mut self, clusters: &[ClusterId]) -> Result<()> {
        let names: Vec<String> = self.extensions.iter().cloned().collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        self.erase_fields(clusters, &names)
    }

    /// 只刪除指定欄位的檔案
    pub fn erase_fields(&mut self, clusters: &[ClusterId], fields: &[&str]) -> Result<()> {
        for &cluster in clusters {
            for field in fields {
                let path = self.path(cluster, field);
                match fs::remove_file(&path) {
                    Ok(()) => tracing::debug!("刪除 {}", path.display()),
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(())
    }

    /// 掃描目錄中所有已註冊欄位的檔案（依聚類、欄位排序）
    pub fn files(&self) -> Result<Vec<StoredFile>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some((cluster, field)) = file_name.to_str().and_then(|name| name.split_once('.'))
            else {
                continue;
            };
            let Ok(cluster) = cluster.parse::<ClusterId>() else {
                continue;
            };
            if !self.extensions.contains(field) {
                continue;
            }
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            files.push(StoredFile {
                path: entry.path(),
                cluster,
                field: field.to_string(),
                size: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Local>::from),
            });
        }
        files.sort_by(|a, b| (a.cluster, &a.field).cmp(&(b.cluster, &b.field)));
        Ok(files)
    }

    /// 目前至少有一個欄位檔案的聚類（升冪）
    pub fn cluster_ids(&self) -> Result<Vec<ClusterId>> {
        let clusters: BTreeSet<ClusterId> = self.files()?.into_iter().map(|f| f.cluster).collect();
        Ok(clusters.into_iter().collect())
    }
}
