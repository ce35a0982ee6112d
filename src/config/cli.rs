use crate::domain::ports::{ItemStore, Storage, StoreItem};
use crate::utils::error::{NormalizerError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory-backed blob store: a bucket is a directory under `base_path`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn resolve(&self, bucket: &str, key: &str) -> PathBuf {
        self.base_path.join(bucket).join(key)
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve(bucket, key);
        let data = fs::read(full_path)?;
        Ok(data)
    }

    async fn write_file(&self, bucket: &str, key: &str, data: &[u8]) -> Result<()> {
        let full_path = self.resolve(bucket, key);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(full_path, data)?;
        Ok(())
    }
}

/// Key-value store kept as one JSON object per table (`<dir>/<table>.json`),
/// keyed by item key. A put replaces the whole item.
#[derive(Debug, Clone)]
pub struct LocalItemStore {
    dir: PathBuf,
}

type Table = BTreeMap<String, BTreeMap<String, String>>;

impl LocalItemStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{}.json", table))
    }

    pub fn load_table(&self, table: &str) -> Result<Table> {
        let path = self.table_path(table);
        if !path.exists() {
            return Ok(Table::new());
        }
        let content = fs::read(&path)?;
        serde_json::from_slice(&content).map_err(|e| NormalizerError::ItemStore {
            message: format!("{} is not a valid table file: {}", path.display(), e),
        })
    }
}

impl ItemStore for LocalItemStore {
    async fn put_batch(&self, table: &str, items: &[StoreItem]) -> Result<Vec<String>> {
        let mut rows = self.load_table(table)?;
        for item in items {
            rows.insert(
                item.key.clone(),
                item.attributes
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            );
        }

        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_vec_pretty(&rows)?;
        fs::write(self.table_path(table), json)?;

        tracing::debug!("Stored {} items in {}", items.len(), table);
        Ok(Vec::new())
    }
}

/// Every `.csv` file directly inside `dir`, sorted by name.
pub fn discover_csv_files(dir: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if path.is_file() && is_csv {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                files.push(name.to_string());
            }
        }
    }
    files.sort();
    Ok(files)
}
