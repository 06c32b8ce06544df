//! Fehlertypen fuer die Schluessel-Persistenz

use thiserror::Error;

/// Fehler des Storage-Managers
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialisierungs-Fehler: {0}")]
    Serialisierung(#[from] serde_json::Error),

    #[error("Ungueltige Datei im Schluessel-Verzeichnis: {0}")]
    UngueltigeDatei(String),

    #[error(transparent)]
    Core(#[from] sealcall_core::CoreError),
}

pub type StorageResult<T> = Result<T, StorageError>;
