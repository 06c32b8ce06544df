//! Storage-Backends: Disk (persistent) und Memory (Fallback)
//!
//! Das `StorageBackend`-Trait abstrahiert den konkreten Speicher. Der
//! Disk-Store legt pro Eintrag eine JSON-Datei an; die Eintrags-Id wird
//! hex-kodiert als Dateiname verwendet, damit beliebige Ids keine
//! Pfad-Traversierung erlauben.

use std::path::PathBuf;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::entry::StoredKeyEntry;
use crate::error::{StorageError, StorageResult};

/// Abstraktes Backend fuer Schluessel-Eintraege
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn get(&self, id: &str) -> StorageResult<Option<StoredKeyEntry>>;

    async fn set(&self, entry: StoredKeyEntry) -> StorageResult<()>;

    async fn delete(&self, id: &str) -> StorageResult<()>;

    async fn clear(&self) -> StorageResult<()>;

    async fn list_ids(&self) -> StorageResult<Vec<String>>;
}

/// In-Memory-Backend (Fallback bei Restricted Storage)
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, StoredKeyEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryStore {
    async fn get(&self, id: &str) -> StorageResult<Option<StoredKeyEntry>> {
        Ok(self.entries.get(id).map(|e| e.clone()))
    }

    async fn set(&self, entry: StoredKeyEntry) -> StorageResult<()> {
        self.entries.insert(entry.id.clone(), entry);
        Ok(())
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        self.entries.remove(id);
        Ok(())
    }

    async fn clear(&self) -> StorageResult<()> {
        self.entries.clear();
        Ok(())
    }

    async fn list_ids(&self) -> StorageResult<Vec<String>> {
        Ok(self.entries.iter().map(|e| e.key().clone()).collect())
    }
}

/// Disk-Backend: eine JSON-Datei pro Eintrag
#[derive(Debug, Clone)]
pub struct DiskStore {
    base_dir: PathBuf,
}

impl DiskStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Dateipfad aus der Eintrags-Id (hex-kodiert, kein Pfad-Traversal)
    fn path_for(&self, id: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", hex::encode(id)))
    }

    fn id_from_filename(name: &str) -> StorageResult<String> {
        let stem = name
            .strip_suffix(".json")
            .ok_or_else(|| StorageError::UngueltigeDatei(name.to_string()))?;
        let bytes =
            hex::decode(stem).map_err(|_| StorageError::UngueltigeDatei(name.to_string()))?;
        String::from_utf8(bytes).map_err(|_| StorageError::UngueltigeDatei(name.to_string()))
    }
}

#[async_trait]
impl StorageBackend for DiskStore {
    async fn get(&self, id: &str) -> StorageResult<Option<StoredKeyEntry>> {
        let path = self.path_for(id);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&data)?))
    }

    async fn set(&self, entry: StoredKeyEntry) -> StorageResult<()> {
        tokio::fs::create_dir_all(&self.base_dir).await?;
        let path = self.path_for(&entry.id);
        let data = serde_json::to_vec_pretty(&entry)?;
        tokio::fs::write(&path, data).await?;
        debug!(id = %entry.id, path = %path.display(), "Schluessel-Eintrag gespeichert");
        Ok(())
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(()),
            // Bereits geloescht - kein Fehler
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self) -> StorageResult<()> {
        let ids = self.list_ids().await?;
        for id in ids {
            self.delete(&id).await?;
        }
        Ok(())
    }

    async fn list_ids(&self) -> StorageResult<Vec<String>> {
        let mut dir = match tokio::fs::read_dir(&self.base_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(item) = dir.next_entry().await? {
            let name = item.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            // Fremddateien im Verzeichnis werden uebersprungen
            if let Ok(id) = Self::id_from_filename(name) {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
