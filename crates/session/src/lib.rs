//! # sealcall-session
//!
//! Key-Exchange-Protokoll einer Call-Seite: signierte Offer/Answer/Rotation-
//! Nachrichten, Nonce-Replay-Schutz und der Schluessel-Lifecycle als
//! expliziter Zustandsautomat.
//!
//! ## Zustandsautomat (pro Call-Seite)
//! ```text
//! NoKey -> LocalKeyGenerated -> AwaitingPeerMessage
//!       -> SharedKeyActive(g) -> Rotating -> SharedKeyActive(g+1) -> Closed
//! ```
//!
//! ## Module
//! - `message` - `KeyExchangeMessage` (Wire-Format, Signierung, Verifikation)
//! - `nonce` - Nonce-Registry mit 5-Minuten-Fenster und 60s-Purge
//! - `lifecycle` - `KeySession`, Rotation-Timer, Exchange-Schranken
//! - `error` - Fehlertypen

pub mod error;
pub mod lifecycle;
pub mod message;
pub mod nonce;

// Bequeme Re-Exports
pub use error::{SessionError, SessionResult};
pub use lifecycle::{
    DiscardReason, HandleOutcome, KeySession, RotationTimer, SessionConfig, SessionState,
};
pub use message::{KeyExchangeMessage, MessageKind, NONCE_MAX_AGE_MS, NONCE_MIN_BYTES};
pub use nonce::{NonceRegistry, NONCE_PURGE_INTERVAL};
