//! End-to-End-Szenario des Key-Exchanges zweier Call-Seiten
//!
//! Deckt den kompletten Ablauf ab: signierte Offer mit Nonce N1 zum
//! Zeitpunkt T1, Verifikation gegen den Verifikations-Schluessel des
//! Senders, Ableitung des gemeinsamen Schluessels auf beiden Seiten,
//! Frame-Verschluesselung und das Replay-Fenster.

use chrono::Utc;

use sealcall_crypto::FrameCipher;
use sealcall_session::{
    DiscardReason, HandleOutcome, KeySession, SessionConfig, SessionState, NONCE_MAX_AGE_MS,
};

fn session() -> KeySession {
    sealcall_observability::init_from_env();
    let mut s = KeySession::new(SessionConfig::default());
    s.generate_local_keys().unwrap();
    s
}

#[test]
fn voller_ablauf_mit_frame_verschluesselung() {
    let mut alice = session();
    let mut bob = session();

    // Beide Seiten haben unterschiedliche Fingerprints F1 und F2
    let f1 = alice.local_fingerprint().unwrap().clone();
    let f2 = bob.local_fingerprint().unwrap().clone();
    assert_ne!(f1, f2);

    // Signierte Offer mit Nonce N1 zum Zeitpunkt T1
    let offer = alice.create_offer().unwrap();
    assert_eq!(offer.fingerprint, f1);

    let t1 = Utc::now().timestamp_millis();
    let outcome = bob.handle_message(&offer, t1).unwrap();
    assert_eq!(outcome, HandleOutcome::KeyInstalled { generation: 0 });

    let answer = bob.create_answer().unwrap();
    assert_eq!(answer.fingerprint, f2);
    alice.handle_message(&answer, t1).unwrap();

    // Beide Seiten haben denselben abgeleiteten Schluessel
    let key_a = alice.shared_key().unwrap();
    let key_b = bob.shared_key().unwrap();
    assert_eq!(key_a.key_bytes.as_bytes(), key_b.key_bytes.as_bytes());

    // 11 Bytes Plaintext -> 12 + 11 + 16 = 39 Bytes Frame
    let cipher = FrameCipher::default();
    let frame = cipher.encrypt(key_a, b"elf bytes!!").unwrap();
    assert_eq!(frame.len(), 39);
    assert_eq!(cipher.decrypt(key_b, &frame).unwrap(), b"elf bytes!!");
}

#[test]
fn replay_fenster_von_fuenf_minuten() {
    let mut alice = session();
    let mut bob = session();

    let offer = alice.create_offer().unwrap();
    let t1 = offer.timestamp;

    assert!(matches!(
        bob.handle_message(&offer, t1).unwrap(),
        HandleOutcome::KeyInstalled { .. }
    ));

    // Dieselbe Offer bei T1 + 1s: Replay innerhalb des Fensters
    assert_eq!(
        bob.handle_message(&offer, t1 + 1_000).unwrap(),
        HandleOutcome::Discarded(DiscardReason::Replay)
    );

    // Bei T1 + 301s ist die Nonce wieder frisch - die Nachricht selbst
    // ist dann aber aelter als das Fenster und wird deshalb verworfen
    assert_eq!(
        bob.handle_message(&offer, t1 + NONCE_MAX_AGE_MS + 1_000).unwrap(),
        HandleOutcome::Discarded(DiscardReason::Expired)
    );
}

#[test]
fn rotation_ueber_beide_seiten() {
    let mut alice = session();
    let mut bob = session();

    let offer = alice.create_offer().unwrap();
    let now = Utc::now().timestamp_millis();
    bob.handle_message(&offer, now).unwrap();
    let answer = bob.create_answer().unwrap();
    alice.handle_message(&answer, now).unwrap();

    let old_key = alice.shared_key().unwrap().key_bytes.to_vec();

    // Alice rotiert mit frischem ephemeren Paar
    let rotation = alice.begin_rotation().unwrap();
    assert_eq!(rotation.generation, 1);

    let outcome = bob.handle_message(&rotation, now).unwrap();
    assert_eq!(outcome, HandleOutcome::KeyInstalled { generation: 1 });

    // Neue Generation, neuer Schluessel
    assert_eq!(bob.generation(), Some(1));
    assert_ne!(bob.shared_key().unwrap().key_bytes.to_vec(), old_key);
    assert_eq!(
        bob.state(),
        SessionState::SharedKeyActive { generation: 1 }
    );
}
