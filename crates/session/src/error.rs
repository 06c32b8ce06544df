//! Fehlertypen fuer das Session-Subsystem

use thiserror::Error;

/// Fehler im Key-Exchange und Schluessel-Lifecycle
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Ungueltiger Zustand fuer diese Operation: {0}")]
    UngueltigerZustand(String),

    #[error("Key-Exchange-Zeitlimit ueberschritten ({0} ms)")]
    Zeitlimit(u64),

    #[error("Maximale Versuche erreicht ({0})")]
    ZuVieleVersuche(u32),

    #[error("Nonce zu kurz: mindestens {mindestens} Bytes, erhalten {erhalten}")]
    NonceZuKurz { mindestens: usize, erhalten: usize },

    #[error("Session ist geschlossen")]
    Geschlossen,

    #[error(transparent)]
    Crypto(#[from] sealcall_crypto::CryptoError),

    #[error(transparent)]
    Core(#[from] sealcall_core::CoreError),
}

pub type SessionResult<T> = Result<T, SessionError>;
