//! JsonFileStorage - ローカルファイルの key-value ストレージ
//!
//! ブラウザの localStorage に相当するもの。全レコードを一つの JSON
//! ドキュメントに保持し、書き込みは毎回 tmp ファイル + rename で
//! アトミックに置き換えます。
//!
//! ```json
//! { "version": 1, "operations": { "<id>": { ...record... } } }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::domain::{OperationId, OperationRecord, RecordPatch, StorageError};
use crate::ports::QueueStorage;

const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    version: u32,
    operations: BTreeMap<String, serde_json::Value>,
}

/// File-backed storage. One document per queue.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    /// In-memory copy of the document; every mutation is flushed before the
    /// lock is released.
    doc: Mutex<Document>,
}

impl JsonFileStorage {
    /// Open (or lazily create) the document at `path`.
    ///
    /// A missing file is an empty queue. A corrupt file is an error: the
    /// caller decides whether to start empty.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let doc = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Document>(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Document {
                version: DOCUMENT_VERSION,
                operations: BTreeMap::new(),
            },
            Err(err) => return Err(err.into()),
        };
        if doc.version > DOCUMENT_VERSION {
            return Err(StorageError::UnsupportedSchema {
                found: doc.version,
                supported: DOCUMENT_VERSION,
            });
        }
        Ok(Self {
            path,
            doc: Mutex::new(doc),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Best-effort atomic write (tmp + rename).
    async fn flush(&self, doc: &Document) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let bytes = serde_json::to_vec_pretty(doc)?;
        let tmp = self.path.with_extension(format!("tmp-{}", ulid::Ulid::new()));

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        if let Err(err) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err.into());
        }
        Ok(())
    }
}

#[async_trait]
impl QueueStorage for JsonFileStorage {
    async fn save(&self, record: &OperationRecord) -> Result<(), StorageError> {
        let value = record.encode()?;
        let mut doc = self.doc.lock().await;
        doc.version = DOCUMENT_VERSION;
        doc.operations.insert(record.id.to_string(), value);
        self.flush(&doc).await
    }

    async fn load_all(&self) -> Result<Vec<OperationRecord>, StorageError> {
        let doc = self.doc.lock().await;
        let values = doc
            .operations
            .iter()
            .map(|(id, v)| (OperationId::new(id.clone()), v.clone()));
        Ok(super::decode_records(values))
    }

    async fn update(&self, id: &OperationId, patch: &RecordPatch) -> Result<(), StorageError> {
        let mut doc = self.doc.lock().await;
        let Some(value) = doc.operations.get(id.as_str()) else {
            return Ok(());
        };
        let mut record = OperationRecord::decode(value.clone())?;
        record.apply(patch);
        doc.operations.insert(id.to_string(), record.encode()?);
        self.flush(&doc).await
    }

    async fn remove(&self, id: &OperationId) -> Result<(), StorageError> {
        let mut doc = self.doc.lock().await;
        if doc.operations.remove(id.as_str()).is_none() {
            return Ok(());
        }
        self.flush(&doc).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let mut doc = self.doc.lock().await;
        doc.operations.clear();
        self.flush(&doc).await
    }
}
