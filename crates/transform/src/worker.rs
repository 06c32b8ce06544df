//! Frame-Worker: dedizierter Task fuer die Live-Verschluesselung
//!
//! Die eigentliche Pro-Frame-Arbeit laeuft in einem eigenen Task, der
//! ausschliesslich ueber Message-Passing erreichbar ist. Schluessel-Bytes
//! und Stream-Endpunkte werden per Move uebergeben (Ownership-Transfer),
//! nie geteilt - Haupt-Kontext und Worker koennen denselben Puffer nie
//! gleichzeitig anfassen.
//!
//! ## Generation-Monotonie
//! Ein Key-Update mit Generation <= der bereits installierten wird
//! ignoriert (geloggt, kein Fehler). Verspaetete oder umgeordnete Updates
//! koennen so nie auf einen alten Schluessel zurueckrollen.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use sealcall_crypto::{CipherConfig, FrameCipher, SymmetricKey};

use crate::error::{TransformError, TransformResult};

/// Kanal-Kapazitaet pro Frame-Stream
const FRAME_CHANNEL_CAPACITY: usize = 64;

/// Richtung eines Media-Tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ausgehend: Frames werden verschluesselt
    Outgoing,
    /// Eingehend: Frames werden (tolerant) entschluesselt
    Incoming,
}

/// Track-seitige Endpunkte eines Frame-Streams
///
/// Der Track schiebt rohe Frames in `frames_tx` und liest verarbeitete
/// Frames aus `processed_rx`.
#[derive(Debug)]
pub struct TrackEndpoints {
    pub frames_tx: mpsc::Sender<Vec<u8>>,
    pub processed_rx: mpsc::Receiver<Vec<u8>>,
}

/// Worker-seitige Endpunkte eines Frame-Streams (werden per Move an den
/// Worker uebergeben)
#[derive(Debug)]
pub struct WorkerEndpoints {
    pub frames_rx: mpsc::Receiver<Vec<u8>>,
    pub processed_tx: mpsc::Sender<Vec<u8>>,
}

/// Erstellt ein verbundenes Endpunkt-Paar fuer einen Frame-Stream
pub fn frame_channel() -> (TrackEndpoints, WorkerEndpoints) {
    let (frames_tx, frames_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
    let (processed_tx, processed_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
    (
        TrackEndpoints {
            frames_tx,
            processed_rx,
        },
        WorkerEndpoints {
            frames_rx,
            processed_tx,
        },
    )
}

/// Nachrichten-Protokoll des Workers
#[derive(Debug)]
pub enum WorkerMessage {
    /// Schluessel-Lieferung: rohe Bytes plus Generation
    KeyUpdate { key_bytes: Vec<u8>, generation: u64 },
    /// Stream-Setup: Endpunkte werden in den Worker transferiert
    SetupStream {
        track_id: String,
        direction: Direction,
        endpoints: WorkerEndpoints,
    },
    /// Aktuell installierte Generation abfragen
    Generation { reply: oneshot::Sender<Option<u64>> },
    Shutdown,
}

/// Handle auf den Frame-Worker-Task
#[derive(Debug)]
pub struct FrameWorker {
    tx: mpsc::UnboundedSender<WorkerMessage>,
    task: JoinHandle<()>,
}

impl FrameWorker {
    /// Startet den Worker mit der Cipher-Konfiguration der Runtime-Familie
    pub fn spawn(config: CipherConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(config, rx));
        Self { tx, task }
    }

    /// Liefert einen Schluessel an den Worker (Bytes werden gemoved)
    pub fn update_key(&self, key_bytes: Vec<u8>, generation: u64) -> TransformResult<()> {
        self.tx
            .send(WorkerMessage::KeyUpdate {
                key_bytes,
                generation,
            })
            .map_err(|_| TransformError::WorkerBeendet)
    }

    /// Transferiert Stream-Endpunkte in den Worker
    pub fn setup_stream(
        &self,
        track_id: String,
        direction: Direction,
        endpoints: WorkerEndpoints,
    ) -> TransformResult<()> {
        self.tx
            .send(WorkerMessage::SetupStream {
                track_id,
                direction,
                endpoints,
            })
            .map_err(|_| TransformError::WorkerBeendet)
    }

    /// Fragt die aktuell installierte Generation ab
    pub async fn generation(&self) -> TransformResult<Option<u64>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WorkerMessage::Generation { reply })
            .map_err(|_| TransformError::WorkerBeendet)?;
        rx.await.map_err(|_| TransformError::WorkerBeendet)
    }

    /// Beendet den Worker-Task
    pub fn shutdown(&self) {
        let _ = self.tx.send(WorkerMessage::Shutdown);
    }
}

impl Drop for FrameWorker {
    fn drop(&mut self) {
        let _ = self.tx.send(WorkerMessage::Shutdown);
        self.task.abort();
    }
}

/// Worker-Hauptschleife: besitzt den Schluessel-Zustand exklusiv
async fn run(config: CipherConfig, mut rx: mpsc::UnboundedReceiver<WorkerMessage>) {
    let cipher = FrameCipher::new(config);
    let (key_tx, _) = watch::channel::<Option<Arc<SymmetricKey>>>(None);
    let mut installed: Option<u64> = None;
    let mut pumps: Vec<JoinHandle<()>> = Vec::new();

    while let Some(msg) = rx.recv().await {
        match msg {
            WorkerMessage::KeyUpdate {
                key_bytes,
                generation,
            } => {
                if installed.is_some_and(|cur| generation <= cur) {
                    debug!(
                        generation,
                        installiert = ?installed,
                        "Key-Update mit alter Generation ignoriert"
                    );
                    continue;
                }
                match SymmetricKey::from_raw_bytes(key_bytes, generation) {
                    Ok(key) => {
                        installed = Some(generation);
                        // send_replace speichert auch ohne aktive Receiver
                        key_tx.send_replace(Some(Arc::new(key)));
                        debug!(generation, "Schluessel im Worker installiert");
                    }
                    Err(e) => warn!(fehler = %e, "Key-Update verworfen"),
                }
            }
            WorkerMessage::SetupStream {
                track_id,
                direction,
                endpoints,
            } => {
                debug!(track = %track_id, ?direction, "Frame-Stream eingerichtet");
                pumps.push(tokio::spawn(pump(
                    cipher.clone(),
                    key_tx.subscribe(),
                    direction,
                    endpoints,
                    track_id,
                )));
            }
            WorkerMessage::Generation { reply } => {
                let _ = reply.send(installed);
            }
            WorkerMessage::Shutdown => break,
        }
    }

    for pump in pumps {
        pump.abort();
    }
}

/// Pro-Stream-Schleife: liest rohe Frames, verarbeitet, schreibt zurueck
async fn pump(
    cipher: FrameCipher,
    key_rx: watch::Receiver<Option<Arc<SymmetricKey>>>,
    direction: Direction,
    mut endpoints: WorkerEndpoints,
    track_id: String,
) {
    while let Some(frame) = endpoints.frames_rx.recv().await {
        let key = key_rx.borrow().clone();

        let out = match direction {
            Direction::Outgoing => match &key {
                Some(key) => match cipher.encrypt(key, &frame) {
                    Ok(encrypted) => encrypted,
                    Err(e) => {
                        // Frame fallen lassen statt Plaintext zu leaken
                        warn!(track = %track_id, fehler = %e, "Frame-Verschluesselung fehlgeschlagen");
                        continue;
                    }
                },
                None => {
                    // Uebergangsphase vor dem Agreement
                    trace!(track = %track_id, "Ausgehender Frame ohne Schluessel, Passthrough");
                    frame
                }
            },
            Direction::Incoming => cipher.try_decrypt(key.as_deref(), &frame).data,
        };

        if endpoints.processed_tx.send(out).await.is_err() {
            break;
        }
    }
    trace!(track = %track_id, "Frame-Stream beendet");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
