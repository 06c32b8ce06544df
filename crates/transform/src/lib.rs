//! # sealcall-transform
//!
//! Verdrahtet die Frame-Verschluesselung in die Live-Media-Pipeline einer
//! aktiven Verbindung. Die Pro-Frame-Arbeit laeuft in einem dedizierten
//! Worker-Task, erreichbar nur ueber Message-Passing; Schluessel-Bytes und
//! Stream-Endpunkte werden gemoved, nie geteilt.
//!
//! ## Module
//! - `worker` - Frame-Worker-Task, Nachrichten-Protokoll, Generation-Monotonie
//! - `media` - Nahtstellen-Traits zur Transport-Schicht
//! - `adapter` - `TransformAdapter` mit den drei Strategien und Teardown
//! - `error` - Fehlertypen

pub mod adapter;
pub mod error;
pub mod media;
pub mod worker;

// Bequeme Re-Exports
pub use adapter::{SetupResult, TransformAdapter};
pub use error::{TransformError, TransformResult};
pub use media::{MediaConnection, TrackHandle, TrackKind};
pub use worker::{
    frame_channel, Direction, FrameWorker, TrackEndpoints, WorkerEndpoints, WorkerMessage,
};
