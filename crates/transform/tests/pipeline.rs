//! End-to-End: Key-Exchange -> Adapter -> verschluesselte Frames
//!
//! Zwei Call-Seiten handeln einen Schluessel aus; jede Seite verdrahtet
//! ihn ueber ihren Adapter in die Media-Pipeline. Ein Frame, der die
//! Sende-Seite verlaesst, ist auf dem Draht opak und kommt auf der
//! Empfangs-Seite als Original wieder an.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;

use sealcall_capability::{RuntimeFamily, TransformMechanism};
use sealcall_crypto::CipherConfig;
use sealcall_session::{KeySession, SessionConfig};
use sealcall_transform::{
    MediaConnection, TrackEndpoints, TrackHandle, TrackKind, TransformAdapter, TransformResult,
};

struct TestTrack {
    id: String,
    bound: Mutex<Option<TrackEndpoints>>,
}

impl TestTrack {
    fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            bound: Mutex::new(None),
        })
    }
}

impl TrackHandle for TestTrack {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn kind(&self) -> TrackKind {
        TrackKind::Audio
    }

    fn bind_script_transform(&self, endpoints: TrackEndpoints) -> TransformResult<()> {
        *self.bound.lock() = Some(endpoints);
        Ok(())
    }

    fn expose_frame_streams(&self) -> TransformResult<sealcall_transform::WorkerEndpoints> {
        let (track_ep, worker_ep) = sealcall_transform::frame_channel();
        *self.bound.lock() = Some(track_ep);
        Ok(worker_ep)
    }

    fn assign_transform(&self, endpoints: TrackEndpoints) -> TransformResult<()> {
        *self.bound.lock() = Some(endpoints);
        Ok(())
    }

    fn stop(&self) {}
}

struct TestConnection {
    senders: Vec<Arc<TestTrack>>,
    receivers: Vec<Arc<TestTrack>>,
}

impl MediaConnection for TestConnection {
    fn sender_tracks(&self) -> Vec<Arc<dyn TrackHandle>> {
        self.senders
            .iter()
            .map(|t| Arc::clone(t) as Arc<dyn TrackHandle>)
            .collect()
    }

    fn receiver_tracks(&self) -> Vec<Arc<dyn TrackHandle>> {
        self.receivers
            .iter()
            .map(|t| Arc::clone(t) as Arc<dyn TrackHandle>)
            .collect()
    }

    fn remove_track(&self, _track_id: &str) -> TransformResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn ausgehandelter_schluessel_traegt_frames_ende_zu_ende() {
    sealcall_observability::init_from_env();

    // Key-Exchange
    let mut alice = KeySession::new(SessionConfig::default());
    alice.generate_local_keys().unwrap();
    let mut bob = KeySession::new(SessionConfig::default());
    bob.generate_local_keys().unwrap();

    let now = Utc::now().timestamp_millis();
    let offer = alice.create_offer().unwrap();
    bob.handle_message(&offer, now).unwrap();
    let answer = bob.create_answer().unwrap();
    alice.handle_message(&answer, now).unwrap();

    // Alice: ausgehender Track, Bob: eingehender Track
    let alice_track = TestTrack::new("audio");
    let alice_adapter = TransformAdapter::new(
        Arc::new(TestConnection {
            senders: vec![Arc::clone(&alice_track)],
            receivers: vec![],
        }),
        RuntimeFamily::Chromium,
        Some(TransformMechanism::EncodedStreams),
        CipherConfig::default(),
    )
    .unwrap();

    let bob_track = TestTrack::new("audio");
    let bob_adapter = TransformAdapter::new(
        Arc::new(TestConnection {
            senders: vec![],
            receivers: vec![Arc::clone(&bob_track)],
        }),
        RuntimeFamily::Chromium,
        Some(TransformMechanism::EncodedStreams),
        CipherConfig::default(),
    )
    .unwrap();

    alice_adapter
        .update_key(alice.shared_key().unwrap())
        .unwrap();
    bob_adapter.update_key(bob.shared_key().unwrap()).unwrap();
    assert!(alice_adapter.attach().success);
    assert!(bob_adapter.attach().success);

    let mut alice_ep = alice_track.bound.lock().take().unwrap();
    let mut bob_ep = bob_track.bound.lock().take().unwrap();

    // Frame durch Alices Sende-Pipeline
    let plaintext = b"geheimer media-frame".to_vec();
    alice_ep.frames_tx.send(plaintext.clone()).await.unwrap();
    let wire_frame = alice_ep.processed_rx.recv().await.unwrap();

    // Auf dem Draht ist der Frame opak
    assert_ne!(wire_frame, plaintext);
    assert_eq!(wire_frame.len(), plaintext.len() + 12 + 16);

    // Durch Bobs Empfangs-Pipeline zurueck zum Original
    bob_ep.frames_tx.send(wire_frame).await.unwrap();
    assert_eq!(bob_ep.processed_rx.recv().await.unwrap(), plaintext);

    alice_adapter.cleanup();
    bob_adapter.cleanup();
}
