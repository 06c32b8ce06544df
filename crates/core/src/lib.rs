//! # sealcall-core
//!
//! Gemeinsame Typen und Utilities fuer das Sealcall E2EE-Subsystem.
//!
//! ## Module
//! - `encoding` - Binaer/Text-Konvertierung, Zufalls-Bytes, IV/Ciphertext-Framing
//! - `types` - Gebrandete String-Typen (Base64, Hex, Fingerprint) und `SecretBytes`
//! - `error` - Fehlertypen

pub mod encoding;
pub mod error;
pub mod types;

// Bequeme Re-Exports
pub use error::{CoreError, CoreResult};
pub use types::{Base64String, Fingerprint, HexString, SecretBytes};

pub use encoding::{combine, extract, random_bytes, IV_LEN, MIN_FRAME_LEN, TAG_LEN};
