//! Fehlertypen fuer sealcall-core

use thiserror::Error;

/// Fehler in den Basis-Typen und Kodierungen
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Ungueltige Base64-Kodierung: {0}")]
    UngueltigeBase64(#[from] base64::DecodeError),

    #[error("Ungueltige Hex-Kodierung: {0}")]
    UngueltigesHex(#[from] hex::FromHexError),

    #[error("Ungueltiger Fingerprint: erwartet 64 Hex-Zeichen, erhalten {0}")]
    UngueltigerFingerprint(usize),

    #[error("Puffer zu kurz: mindestens {mindestens} Bytes erwartet, erhalten {erhalten}")]
    PufferZuKurz { mindestens: usize, erhalten: usize },

    #[error("Ungueltige Daten: {0}")]
    UngueltigeDaten(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
