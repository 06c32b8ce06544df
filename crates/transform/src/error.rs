//! Fehlertypen fuer den Transform-Adapter

use thiserror::Error;

/// Fehler beim Verdrahten der Frame-Verschluesselung
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Kein Transform-Mechanismus verfuegbar")]
    KeinMechanismus,

    #[error("Frame-Worker ist beendet")]
    WorkerBeendet,

    #[error("Track-Setup fehlgeschlagen: {0}")]
    Track(String),

    #[error(transparent)]
    Crypto(#[from] sealcall_crypto::CryptoError),
}

pub type TransformResult<T> = Result<T, TransformError>;
