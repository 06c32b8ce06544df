//! # sealcall-storage
//!
//! Persistenz fuer Identitaets- und Sitzungs-Schluessel: ein Disk-Store
//! mit funktionalem Roundtrip-Check, ein Memory-Fallback fuer Restricted
//! Storage und Ablauf-Logik pro Eintrag.
//!
//! ## Module
//! - `entry` - `StoredKeyEntry` (portables Format, Ablauf)
//! - `backend` - `StorageBackend`-Trait, `DiskStore`, `MemoryStore`
//! - `manager` - `KeyStore` (Backend-Auswahl, Lazy-Expiry, Sweep)
//! - `error` - Fehlertypen

pub mod backend;
pub mod entry;
pub mod error;
pub mod manager;

// Bequeme Re-Exports
pub use backend::{DiskStore, MemoryStore, StorageBackend};
pub use entry::{KeyKind, StoredKeyEntry};
pub use error::{StorageError, StorageResult};
pub use manager::KeyStore;
