//! Schluessel-Storage-Manager
//!
//! Waehlt bei der ersten Benutzung das Backend: den Disk-Store, wenn er
//! einen funktionalen Roundtrip besteht und kein Restricted-Storage-Modus
//! aktiv ist; sonst den Memory-Store als Fallback (Warnung, nie fatal).
//! Die Initialisierung ist idempotent - konkurrierende Aufrufer teilen
//! sich denselben In-Flight-Future statt das Backend doppelt zu oeffnen.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::backend::{DiskStore, MemoryStore, StorageBackend};
use crate::entry::{KeyKind, StoredKeyEntry};
use crate::error::StorageResult;

/// Probe-Id des funktionalen Roundtrips
const PROBE_ID: &str = "__storage_probe__";

/// Prozessweiter Storage-Manager fuer Schluessel-Eintraege
///
/// Wird vom Aufrufer konstruiert und injiziert; `reset` existiert nur in
/// Test-Builds.
pub struct KeyStore {
    base_dir: PathBuf,
    restricted_mode: bool,
    backend: OnceCell<Arc<dyn StorageBackend>>,
}

impl KeyStore {
    /// `restricted_mode`: Ergebnis der Private-Mode-Erkennung; erzwingt
    /// den Memory-Fallback
    pub fn new(base_dir: impl Into<PathBuf>, restricted_mode: bool) -> Self {
        Self {
            base_dir: base_dir.into(),
            restricted_mode,
            backend: OnceCell::new(),
        }
    }

    /// Backend-Auswahl, einmalig und in-flight-dedupliziert
    async fn backend(&self) -> &Arc<dyn StorageBackend> {
        self.backend
            .get_or_init(|| async {
                if self.restricted_mode {
                    warn!("Restricted Storage erkannt, Schluessel bleiben im Speicher");
                    return Arc::new(MemoryStore::new()) as Arc<dyn StorageBackend>;
                }

                let disk = DiskStore::new(&self.base_dir);
                if Self::probe(&disk).await {
                    debug!(dir = %self.base_dir.display(), "Persistentes Schluessel-Backend aktiv");
                    Arc::new(disk) as Arc<dyn StorageBackend>
                } else {
                    warn!(
                        dir = %self.base_dir.display(),
                        "Persistenter Store besteht den Roundtrip nicht, Memory-Fallback"
                    );
                    Arc::new(MemoryStore::new()) as Arc<dyn StorageBackend>
                }
            })
            .await
    }

    /// Funktionaler Roundtrip: schreiben, lesen, vergleichen, loeschen
    async fn probe(disk: &DiskStore) -> bool {
        let probe = StoredKeyEntry::new(PROBE_ID, KeyKind::Aes);

        if disk.set(probe.clone()).await.is_err() {
            return false;
        }
        let read_back = match disk.get(PROBE_ID).await {
            Ok(Some(entry)) => entry,
            _ => return false,
        };
        let ok = read_back.id == probe.id && read_back.created_at == probe.created_at;
        let _ = disk.delete(PROBE_ID).await;
        ok
    }

    /// Liest einen Eintrag; abgelaufene Eintraege werden dabei geloescht
    /// und als "nicht gefunden" gemeldet
    pub async fn get(&self, id: &str) -> StorageResult<Option<StoredKeyEntry>> {
        let backend = self.backend().await;
        let Some(entry) = backend.get(id).await? else {
            return Ok(None);
        };

        if entry.is_expired(Utc::now()) {
            debug!(id, "Abgelaufener Schluessel-Eintrag beim Lesen geloescht");
            backend.delete(id).await?;
            return Ok(None);
        }
        Ok(Some(entry))
    }

    pub async fn set(&self, entry: StoredKeyEntry) -> StorageResult<()> {
        self.backend().await.set(entry).await
    }

    pub async fn delete(&self, id: &str) -> StorageResult<()> {
        self.backend().await.delete(id).await
    }

    pub async fn clear(&self) -> StorageResult<()> {
        self.backend().await.clear().await
    }

    pub async fn list_ids(&self) -> StorageResult<Vec<String>> {
        self.backend().await.list_ids().await
    }

    /// Sweep ueber alle Eintraege; entfernt die abgelaufenen und gibt
    /// deren Anzahl zurueck
    pub async fn cleanup_expired(&self) -> StorageResult<usize> {
        let backend = self.backend().await;
        let now = Utc::now();
        let mut removed = 0;

        for id in backend.list_ids().await? {
            if let Some(entry) = backend.get(&id).await? {
                if entry.is_expired(now) {
                    backend.delete(&id).await?;
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            info!(entfernt = removed, "Abgelaufene Schluessel-Eintraege entfernt");
        }
        Ok(removed)
    }

    /// Verwirft das gewaehlte Backend (Test-Isolation)
    #[cfg(test)]
    pub fn reset(&mut self) {
        self.backend = OnceCell::new();
    }
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("base_dir", &self.base_dir)
            .field("restricted_mode", &self.restricted_mode)
            .field("initialized", &self.backend.initialized())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(id: &str) -> StoredKeyEntry {
        StoredKeyEntry::new(id, KeyKind::Ecdsa)
    }

    #[tokio::test]
    async fn persistenter_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::new(dir.path(), false);

        store.set(entry("identitaet")).await.unwrap();
        assert!(store.get("identitaet").await.unwrap().is_some());

        // Zweite Instanz auf demselben Verzeichnis sieht den Eintrag
        let store2 = KeyStore::new(dir.path(), false);
        assert!(store2.get("identitaet").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn restricted_mode_erzwingt_memory() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::new(dir.path(), true);

        store.set(entry("fluechtig")).await.unwrap();
        assert!(store.get("fluechtig").await.unwrap().is_some());

        // Nichts ist auf der Disk gelandet
        let store2 = KeyStore::new(dir.path(), false);
        assert!(store2.get("fluechtig").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn kaputtes_verzeichnis_faellt_auf_memory_zurueck() {
        // Eine Datei als Basis-"Verzeichnis": der Roundtrip scheitert
        let file = tempfile::NamedTempFile::new().unwrap();
        let store = KeyStore::new(file.path(), false);

        // Nie fatal: Memory-Fallback traegt alle Operationen
        store.set(entry("a")).await.unwrap();
        assert!(store.get("a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn abgelaufener_eintrag_wird_beim_lesen_geloescht() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::new(dir.path(), false);

        let abgelaufen =
            entry("alt").with_expiry(Utc::now() - Duration::seconds(1));
        store.set(abgelaufen).await.unwrap();

        assert!(store.get("alt").await.unwrap().is_none());
        // Lazy-Delete hat den Eintrag wirklich entfernt
        assert!(store.list_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cleanup_expired_zaehlt_entfernte() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::new(dir.path(), false);

        store
            .set(entry("alt-1").with_expiry(Utc::now() - Duration::seconds(1)))
            .await
            .unwrap();
        store
            .set(entry("alt-2").with_expiry(Utc::now() - Duration::seconds(1)))
            .await
            .unwrap();
        store.set(entry("frisch")).await.unwrap();

        assert_eq!(store.cleanup_expired().await.unwrap(), 2);
        assert_eq!(store.list_ids().await.unwrap(), vec!["frisch"]);
    }

    #[tokio::test]
    async fn konkurrierende_initialisierung_teilt_ein_backend() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(KeyStore::new(dir.path(), false));

        let mut tasks = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store.set(entry(&format!("k{}", i))).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(store.list_ids().await.unwrap().len(), 8);
    }
}
