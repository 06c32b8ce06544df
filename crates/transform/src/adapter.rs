//! Transform-Adapter: haengt die gewaehlte Strategie an eine Verbindung
//!
//! Genau ein Adapter pro Verbindung; er besitzt den Frame-Worker und die
//! Track-Registry exklusiv und wird nie zwischen Verbindungen geteilt.
//! Die Strategie wird einmal bei der Konstruktion gewaehlt, danach gibt
//! es kein dynamisches Verzweigen mehr.
//!
//! ## Teardown-Reihenfolge
//! Eine Runtime-Familie gibt den Hardware-Capture-Indikator nur frei,
//! wenn der Track erst aus der Verbindung entfernt und dann gestoppt wird;
//! die anderen verlangen stop-dann-remove. `cleanup` ist idempotent:
//! doppelter Aufruf oder Aufruf nach einem Teil-Fehler wirft nie und
//! leakt keine Tracks.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use sealcall_capability::{RuntimeFamily, TransformMechanism};
use sealcall_crypto::{CipherConfig, SymmetricKey};

use crate::error::{TransformError, TransformResult};
use crate::media::{MediaConnection, TrackHandle};
use crate::worker::{frame_channel, Direction, FrameWorker};

/// Strukturiertes Ergebnis des Transform-Setups
#[derive(Debug, Clone)]
pub struct SetupResult {
    pub success: bool,
    pub method: TransformMechanism,
    pub error: Option<String>,
}

struct AttachedTrack {
    track: Arc<dyn TrackHandle>,
    direction: Direction,
}

/// Verdrahtet Frame-Verschluesselung in die Tracks einer Verbindung
pub struct TransformAdapter {
    connection: Arc<dyn MediaConnection>,
    family: RuntimeFamily,
    mechanism: TransformMechanism,
    worker: FrameWorker,
    attached: DashMap<String, AttachedTrack>,
    /// Zuletzt gelieferter Schluessel (fuer Script-Transform: muss vor der
    /// Transform-Erstellung im Worker sein)
    last_key: Mutex<Option<(Vec<u8>, u64)>>,
}

impl TransformAdapter {
    /// Erstellt den Adapter fuer die von der Capability-Erkennung
    /// gewaehlte Strategie
    pub fn new(
        connection: Arc<dyn MediaConnection>,
        family: RuntimeFamily,
        mechanism: Option<TransformMechanism>,
        cipher_config: CipherConfig,
    ) -> TransformResult<Self> {
        let mechanism = mechanism.ok_or(TransformError::KeinMechanismus)?;
        Ok(Self {
            connection,
            family,
            mechanism,
            worker: FrameWorker::spawn(cipher_config),
            attached: DashMap::new(),
            last_key: Mutex::new(None),
        })
    }

    pub fn mechanism(&self) -> TransformMechanism {
        self.mechanism
    }

    /// Liefert einen (rotierten) Schluessel an den Worker
    pub fn update_key(&self, key: &SymmetricKey) -> TransformResult<()> {
        *self.last_key.lock() = Some((key.export_raw(), key.generation));
        self.worker.update_key(key.export_raw(), key.generation)
    }

    /// Haengt die Strategie an alle Sender- und Receiver-Tracks
    ///
    /// Ein Teil-Fehler bricht ab und wird als strukturiertes Ergebnis
    /// gemeldet; bereits angehaengte Tracks bleiben registriert, damit
    /// `cleanup` sie erreicht.
    pub fn attach(&self) -> SetupResult {
        let tracks = self
            .connection
            .sender_tracks()
            .into_iter()
            .map(|t| (t, Direction::Outgoing))
            .chain(
                self.connection
                    .receiver_tracks()
                    .into_iter()
                    .map(|t| (t, Direction::Incoming)),
            );

        for (track, direction) in tracks {
            if let Err(e) = self.attach_track(Arc::clone(&track), direction) {
                warn!(track = %track.id(), fehler = %e, "Transform-Setup fehlgeschlagen");
                return SetupResult {
                    success: false,
                    method: self.mechanism,
                    error: Some(e.to_string()),
                };
            }
        }

        info!(mechanismus = ?self.mechanism, "Transforms angehaengt");
        SetupResult {
            success: true,
            method: self.mechanism,
            error: None,
        }
    }

    fn attach_track(
        &self,
        track: Arc<dyn TrackHandle>,
        direction: Direction,
    ) -> TransformResult<()> {
        let track_id = track.id();

        match self.mechanism {
            TransformMechanism::ScriptTransform => {
                // Der Schluessel muss vor der Transform-Erstellung im
                // Worker sein
                if let Some((bytes, generation)) = self.last_key.lock().clone() {
                    self.worker.update_key(bytes, generation)?;
                }
                let (track_ep, worker_ep) = frame_channel();
                track.bind_script_transform(track_ep)?;
                self.worker
                    .setup_stream(track_id.clone(), direction, worker_ep)?;
            }
            TransformMechanism::EncodedStreams => {
                // Der Track stellt die Streams, die Endpunkte werden
                // transferiert; Schluessel kommen als separate Nachricht
                let worker_ep = track.expose_frame_streams()?;
                self.worker
                    .setup_stream(track_id.clone(), direction, worker_ep)?;
            }
            TransformMechanism::InsertableStreams => {
                // In-process Paar: eine Seite an den Track, die andere an
                // den Worker
                let (track_ep, worker_ep) = frame_channel();
                track.assign_transform(track_ep)?;
                self.worker
                    .setup_stream(track_id.clone(), direction, worker_ep)?;
            }
        }

        debug!(track = %track_id, ?direction, "Track angehaengt");
        self.attached
            .insert(track_id, AttachedTrack { track, direction });
        Ok(())
    }

    /// Baut alle Transforms und Tracks ab; idempotent
    pub fn cleanup(&self) {
        let ids: Vec<String> = self.attached.iter().map(|e| e.key().clone()).collect();

        for id in ids {
            let Some((_, entry)) = self.attached.remove(&id) else {
                continue;
            };

            match self.family {
                RuntimeFamily::Firefox => {
                    // Erst entfernen, dann stoppen - sonst bleibt der
                    // Capture-Indikator an
                    if let Err(e) = self.connection.remove_track(&id) {
                        warn!(track = %id, fehler = %e, "remove_track fehlgeschlagen");
                    }
                    entry.track.stop();
                }
                _ => {
                    entry.track.stop();
                    if let Err(e) = self.connection.remove_track(&id) {
                        warn!(track = %id, fehler = %e, "remove_track fehlgeschlagen");
                    }
                }
            }
            debug!(track = %id, ?entry.direction, "Track abgebaut");
        }

        self.worker.shutdown();
    }
}

impl std::fmt::Debug for TransformAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformAdapter")
            .field("family", &self.family)
            .field("mechanism", &self.mechanism)
            .field("attached", &self.attached.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::mock::{EventLog, MockConnection, MockTrack};
    use crate::media::TrackKind;

    fn adapter_with(
        connection: MockConnection,
        family: RuntimeFamily,
        mechanism: TransformMechanism,
    ) -> TransformAdapter {
        TransformAdapter::new(
            Arc::new(connection),
            family,
            Some(mechanism),
            CipherConfig::default(),
        )
        .unwrap()
    }

    fn simple_connection() -> (MockConnection, EventLog) {
        let events = EventLog::default();
        let conn = MockConnection::new(
            vec![
                MockTrack::new("audio-out", TrackKind::Audio, Arc::clone(&events)),
                MockTrack::new("video-out", TrackKind::Video, Arc::clone(&events)),
            ],
            vec![MockTrack::new(
                "audio-in",
                TrackKind::Audio,
                Arc::clone(&events),
            )],
        );
        (conn, events)
    }

    #[test]
    fn ohne_mechanismus_keine_konstruktion() {
        let (conn, _) = simple_connection();
        let result = TransformAdapter::new(
            Arc::new(conn),
            RuntimeFamily::Unknown,
            None,
            CipherConfig::default(),
        );
        assert!(matches!(result, Err(TransformError::KeinMechanismus)));
    }

    #[tokio::test]
    async fn attach_haengt_alle_tracks_an() {
        let (conn, _) = simple_connection();
        let senders = conn.senders.clone();
        let adapter = adapter_with(conn, RuntimeFamily::Chromium, TransformMechanism::EncodedStreams);

        let result = adapter.attach();
        assert!(result.success);
        assert_eq!(result.method, TransformMechanism::EncodedStreams);
        assert!(result.error.is_none());

        // Jeder Track hat seine Endpunkte erhalten
        for track in &senders {
            assert!(track.bound.lock().is_some());
        }
    }

    #[tokio::test]
    async fn teil_fehler_ergibt_strukturiertes_ergebnis() {
        let events = EventLog::default();
        let conn = MockConnection::new(
            vec![
                MockTrack::new("ok-track", TrackKind::Audio, Arc::clone(&events)),
                MockTrack::failing("kaputt", TrackKind::Video, Arc::clone(&events)),
            ],
            vec![],
        );
        let adapter = adapter_with(conn, RuntimeFamily::Chromium, TransformMechanism::EncodedStreams);

        let result = adapter.attach();
        assert!(!result.success);
        assert!(result.error.as_deref().is_some_and(|e| e.contains("kaputt")));

        // Cleanup nach Teil-Fehler wirft nicht und raeumt den
        // angehaengten Track ab
        adapter.cleanup();
        assert!(events.lock().iter().any(|e| e == "stop:ok-track"));
    }

    #[tokio::test]
    async fn cleanup_ist_idempotent() {
        let (conn, events) = simple_connection();
        let adapter = adapter_with(conn, RuntimeFamily::Chromium, TransformMechanism::InsertableStreams);

        assert!(adapter.attach().success);
        adapter.cleanup();
        let after_first = events.lock().len();
        adapter.cleanup();
        assert_eq!(events.lock().len(), after_first);
    }

    #[tokio::test]
    async fn teardown_reihenfolge_remove_vor_stop() {
        let events = EventLog::default();
        let conn = MockConnection::new(
            vec![MockTrack::new("t1", TrackKind::Audio, Arc::clone(&events))],
            vec![],
        );
        let adapter = adapter_with(conn, RuntimeFamily::Firefox, TransformMechanism::ScriptTransform);

        assert!(adapter.attach().success);
        adapter.cleanup();

        assert_eq!(*events.lock(), vec!["remove:t1", "stop:t1"]);
    }

    #[tokio::test]
    async fn teardown_reihenfolge_stop_vor_remove() {
        let events = EventLog::default();
        let conn = MockConnection::new(
            vec![MockTrack::new("t1", TrackKind::Audio, Arc::clone(&events))],
            vec![],
        );
        let adapter = adapter_with(conn, RuntimeFamily::Chromium, TransformMechanism::EncodedStreams);

        assert!(adapter.attach().success);
        adapter.cleanup();

        assert_eq!(*events.lock(), vec!["stop:t1", "remove:t1"]);
    }

    #[tokio::test]
    async fn script_transform_liefert_schluessel_vor_dem_setup() {
        let events = EventLog::default();
        let conn = MockConnection::new(
            vec![MockTrack::new("t1", TrackKind::Audio, Arc::clone(&events))],
            vec![],
        );
        let adapter = adapter_with(conn, RuntimeFamily::WebKit, TransformMechanism::ScriptTransform);

        let key = SymmetricKey::generate(1).unwrap();
        adapter.update_key(&key).unwrap();
        assert!(adapter.attach().success);

        // Der Worker kennt die Generation aus dem Vorab-Update
        assert_eq!(adapter.worker.generation().await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn frames_laufen_durch_den_adapter() {
        let events = EventLog::default();
        let track = MockTrack::new("audio-out", TrackKind::Audio, Arc::clone(&events));
        let conn = MockConnection::new(vec![Arc::clone(&track)], vec![]);
        let adapter = adapter_with(conn, RuntimeFamily::Chromium, TransformMechanism::EncodedStreams);

        let key = SymmetricKey::generate(0).unwrap();
        adapter.update_key(&key).unwrap();
        assert!(adapter.attach().success);

        let mut endpoints = track.bound.lock().take().unwrap();
        endpoints.frames_tx.send(b"frame".to_vec()).await.unwrap();
        let frame = endpoints.processed_rx.recv().await.unwrap();

        // Verschluesselt, nicht Passthrough
        assert_ne!(frame, b"frame");
        assert_eq!(frame.len(), 12 + 5 + 16);
    }
}
