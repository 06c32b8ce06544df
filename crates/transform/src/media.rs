//! Nahtstelle zur Transport-/Verhandlungs-Schicht
//!
//! Der Adapter verhandelt keine Verbindungen: er enumeriert nur die
//! Sender-/Receiver-Tracks einer bestehenden Verbindung und haengt
//! Transforms an. `MediaConnection` und `TrackHandle` sind die Traits,
//! die der Transport dafuer implementiert.

use std::sync::Arc;

use crate::error::TransformResult;
use crate::worker::{TrackEndpoints, WorkerEndpoints};

/// Art eines Media-Tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// Ein Sender- oder Receiver-Track einer aktiven Verbindung
pub trait TrackHandle: Send + Sync {
    fn id(&self) -> String;

    fn kind(&self) -> TrackKind;

    /// Strategie a: bindet den Transform an den Worker; der Track erhaelt
    /// seine Endpunkte, die Gegenstuecke gehen an den Worker
    fn bind_script_transform(&self, endpoints: TrackEndpoints) -> TransformResult<()>;

    /// Strategie b: der Track stellt seine eigenen Frame-Streams bereit;
    /// die Endpunkte werden an den Worker transferiert
    fn expose_frame_streams(&self) -> TransformResult<WorkerEndpoints>;

    /// Strategie c: weist ein in-process erstelltes Endpunkt-Paar direkt
    /// dem Track zu
    fn assign_transform(&self, endpoints: TrackEndpoints) -> TransformResult<()>;

    /// Stoppt den Track (gibt Capture-Hardware frei)
    fn stop(&self);
}

/// Eine aktive Verbindung mit Sender- und Receiver-Tracks
pub trait MediaConnection: Send + Sync {
    fn sender_tracks(&self) -> Vec<Arc<dyn TrackHandle>>;

    fn receiver_tracks(&self) -> Vec<Arc<dyn TrackHandle>>;

    /// Entfernt einen Track aus der Verbindung
    fn remove_track(&self, track_id: &str) -> TransformResult<()>;
}

// ---------------------------------------------------------------------------
// Test-Doubles
// ---------------------------------------------------------------------------
