//! # sealcall-capability
//!
//! Runtime-Erkennung fuer das E2EE-Subsystem: welche Runtime-Familie laeuft,
//! welcher der drei Live-Media-Transform-Mechanismen verfuegbar ist, ob die
//! Krypto-Primitiven tatsaechlich funktionieren und ob Restricted-Storage
//! ("Private Browsing") aktiv ist.
//!
//! ## Module
//! - `env` - `RuntimeEnv`-Trait (Feature-Proben, Storage-Proben) + Mock
//! - `family` - Runtime-Familien-Erkennung aus User-Agent + Features
//! - `mechanism` - Prioritaets-Tabelle der Transform-Mechanismen
//! - `detector` - Memoisierte Proben mit In-Flight-Deduplikation

pub mod detector;
pub mod env;
pub mod family;
pub mod mechanism;

// Bequeme Re-Exports
pub use detector::{CapabilityReport, CryptoSupport, Detector};
pub use env::{MockRuntimeEnv, RuntimeEnv, RuntimeFeature};
pub use family::{detect_family, FamilyInfo, RuntimeFamily};
pub use mechanism::{select_mechanism, TransformMechanism};
