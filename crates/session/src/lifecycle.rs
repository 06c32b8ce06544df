//! Schluessel-Lifecycle einer Call-Seite
//!
//! `KeySession` fuehrt den Zustandsautomaten aus §Lifecycle aus:
//! Initialisierung erzeugt die lokalen ECDH+ECDSA-Paare; eine verifizierte,
//! nicht-replayede, nicht-abgelaufene Offer/Answer leitet den gemeinsamen
//! Schluessel ab; Rotation laeuft mit frischem ephemeren Paar und
//! inkrementierter Generation; Teardown verwirft alles Session-Material.
//!
//! Netzwerk-/Angreifer-getriebene Probleme sind nie harte Fehler: sie werden
//! als `HandleOutcome::Discarded` gemeldet und der Call laeuft weiter.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use sealcall_crypto::{
    derive_shared_key, fingerprints_match, import_public_key, EcdhKeyPair, SigningKeyPair,
    SymmetricKey, VerifyKey,
};

use crate::error::{SessionError, SessionResult};
use crate::message::{KeyExchangeMessage, MessageKind, NONCE_MIN_BYTES};
use crate::nonce::NonceRegistry;

/// Konfiguration einer Session (Konstruktionszeit, injiziert)
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Intervall der automatischen Schluessel-Rotation
    pub rotation_interval: Duration,
    /// Wall-Clock-Zeitlimit des gesamten Exchanges
    pub exchange_timeout: Duration,
    /// Maximale Offer-Versuche bevor der Exchange als gescheitert gilt
    pub max_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rotation_interval: Duration::from_secs(60),
            exchange_timeout: Duration::from_secs(15),
            max_attempts: 5,
        }
    }
}

/// Zustand des Schluessel-Lifecycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoKey,
    LocalKeyGenerated,
    AwaitingPeerMessage,
    SharedKeyActive { generation: u64 },
    Rotating { next_generation: u64 },
    Closed,
}

/// Warum eine Nachricht verworfen wurde (Call laeuft weiter)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// Nachricht aelter als das Eindeutigkeits-Fenster
    Expired,
    /// Nonce-Replay innerhalb des Fensters
    Replay,
    /// Signatur verifiziert nicht
    InvalidSignature,
    /// Fingerprint passt nicht zum mitgelieferten Schluessel
    FingerprintMismatch,
    /// Generation <= aktuell installierter Generation
    StaleGeneration,
    /// Kein Verifikations-Schluessel bekannt und keiner mitgeliefert
    MissingVerifyKey,
    /// Nonce unterschreitet die Mindest-Laenge
    InvalidNonce,
    /// Nachricht passt nicht zum aktuellen Zustand
    WrongState,
}

/// Ergebnis von `handle_message`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    /// Gemeinsamer Schluessel installiert
    KeyInstalled { generation: u64 },
    /// Nachricht verworfen, Zustand unveraendert
    Discarded(DiscardReason),
}

/// Schluessel-Lifecycle einer Call-Seite
pub struct KeySession {
    config: SessionConfig,
    state: SessionState,

    ecdh: Option<EcdhKeyPair>,
    signing: Option<SigningKeyPair>,
    peer_verify: Option<VerifyKey>,
    shared_key: Option<SymmetricKey>,

    nonces: Arc<NonceRegistry>,
    exchange_started: Option<Instant>,
    attempts: u32,
}

impl KeySession {
    /// Erstellt eine Session im Zustand `NoKey`
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: SessionState::NoKey,
            ecdh: None,
            signing: None,
            peer_verify: None,
            shared_key: None,
            nonces: Arc::new(NonceRegistry::new()),
            exchange_started: None,
            attempts: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    /// Aktiver gemeinsamer Schluessel (falls vorhanden)
    pub fn shared_key(&self) -> Option<&SymmetricKey> {
        self.shared_key.as_ref()
    }

    /// Aktuell installierte Generation
    pub fn generation(&self) -> Option<u64> {
        self.shared_key.as_ref().map(|k| k.generation)
    }

    /// Eigener Fingerprint (nach `generate_local_keys`)
    pub fn local_fingerprint(&self) -> Option<&sealcall_core::types::Fingerprint> {
        self.ecdh.as_ref().map(|pair| &pair.fingerprint)
    }

    /// Geteilte Nonce-Registry (fuer den Purge-Task)
    pub fn nonce_registry(&self) -> Arc<NonceRegistry> {
        Arc::clone(&self.nonces)
    }

    /// Initialisierung: erzeugt lokale ECDH+ECDSA-Paare
    ///
    /// `NoKey -> LocalKeyGenerated`
    pub fn generate_local_keys(&mut self) -> SessionResult<()> {
        if self.state != SessionState::NoKey {
            return Err(SessionError::UngueltigerZustand(format!(
                "generate_local_keys in {:?}",
                self.state
            )));
        }
        self.ecdh = Some(EcdhKeyPair::generate()?);
        self.signing = Some(SigningKeyPair::generate()?);
        self.state = SessionState::LocalKeyGenerated;
        debug!("Lokale Schluessel-Paare erzeugt");
        Ok(())
    }

    /// Baut eine signierte Offer; wiederholbar bis `max_attempts`
    ///
    /// `LocalKeyGenerated -> AwaitingPeerMessage`
    pub fn create_offer(&mut self) -> SessionResult<KeyExchangeMessage> {
        match self.state {
            SessionState::LocalKeyGenerated | SessionState::AwaitingPeerMessage => {}
            _ => {
                return Err(SessionError::UngueltigerZustand(format!(
                    "create_offer in {:?}",
                    self.state
                )))
            }
        }

        self.check_exchange_deadline()?;
        if self.attempts >= self.config.max_attempts {
            return Err(SessionError::ZuVieleVersuche(self.config.max_attempts));
        }
        self.attempts += 1;

        let (ecdh, signing) = self.own_pairs()?;
        let msg = KeyExchangeMessage::build(MessageKind::Offer, ecdh, signing, 0, true)?;

        if self.exchange_started.is_none() {
            self.exchange_started = Some(Instant::now());
        }
        self.state = SessionState::AwaitingPeerMessage;
        debug!(versuch = self.attempts, "Offer erstellt");
        Ok(msg)
    }

    /// Baut eine signierte Answer auf eine verarbeitete Offer
    pub fn create_answer(&mut self) -> SessionResult<KeyExchangeMessage> {
        match self.state {
            SessionState::LocalKeyGenerated
            | SessionState::AwaitingPeerMessage
            | SessionState::SharedKeyActive { .. } => {}
            _ => {
                return Err(SessionError::UngueltigerZustand(format!(
                    "create_answer in {:?}",
                    self.state
                )))
            }
        }
        let (ecdh, signing) = self.own_pairs()?;
        Ok(KeyExchangeMessage::build(
            MessageKind::Answer,
            ecdh,
            signing,
            self.generation().unwrap_or(0),
            true,
        )?)
    }

    /// Startet eine Rotation: frisches ephemeres Paar, Generation + 1
    ///
    /// `SharedKeyActive(g) -> Rotating(g+1)`
    pub fn begin_rotation(&mut self) -> SessionResult<KeyExchangeMessage> {
        let SessionState::SharedKeyActive { generation } = self.state else {
            return Err(SessionError::UngueltigerZustand(format!(
                "begin_rotation in {:?}",
                self.state
            )));
        };

        let next = generation + 1;
        self.ecdh = Some(EcdhKeyPair::generate()?);
        let (ecdh, signing) = self.own_pairs()?;
        let msg = KeyExchangeMessage::build(MessageKind::Rotation, ecdh, signing, next, false)?;

        self.state = SessionState::Rotating {
            next_generation: next,
        };
        info!(generation = next, "Schluessel-Rotation gestartet");
        Ok(msg)
    }

    /// Verarbeitet eine eingehende Key-Exchange-Nachricht
    ///
    /// Verifiziert Signatur, Fingerprint, Nonce und Alter; leitet bei Erfolg
    /// den gemeinsamen Schluessel ab. Angreifer-/netzgetriebene Probleme
    /// ergeben `Discarded`, nie einen harten Fehler.
    pub fn handle_message(
        &mut self,
        msg: &KeyExchangeMessage,
        now_ms: i64,
    ) -> SessionResult<HandleOutcome> {
        if self.state == SessionState::Closed {
            return Err(SessionError::Geschlossen);
        }
        self.check_exchange_deadline()?;

        if self.ecdh.is_none() {
            return Ok(self.discard(DiscardReason::WrongState, msg));
        }

        // Nonce-Form
        match msg.nonce.decode() {
            Ok(bytes) if bytes.len() >= NONCE_MIN_BYTES => {}
            _ => return Ok(self.discard(DiscardReason::InvalidNonce, msg)),
        }

        // Alter
        if msg.is_expired(now_ms) {
            return Ok(self.discard(DiscardReason::Expired, msg));
        }

        // Replay (prueft und registriert atomar)
        if !self.nonces.check_and_record(&msg.nonce, now_ms) {
            return Ok(self.discard(DiscardReason::Replay, msg));
        }

        // Verifikations-Schluessel: mitgeliefert oder aus frueherer Nachricht
        let verify_key = match &msg.signing_public_key {
            Some(encoded) => match VerifyKey::import(encoded) {
                Ok(key) => key,
                Err(_) => return Ok(self.discard(DiscardReason::InvalidSignature, msg)),
            },
            None => match &self.peer_verify {
                Some(key) => key.clone(),
                None => return Ok(self.discard(DiscardReason::MissingVerifyKey, msg)),
            },
        };

        if !msg.verify_signature(&verify_key) {
            return Ok(self.discard(DiscardReason::InvalidSignature, msg));
        }

        // Remote-Schluessel importieren und Fingerprint gegenpruefen
        let remote = match import_public_key(&msg.public_key) {
            Ok(remote) => remote,
            Err(_) => return Ok(self.discard(DiscardReason::FingerprintMismatch, msg)),
        };
        if !fingerprints_match(&remote.fingerprint, &msg.fingerprint) {
            return Ok(self.discard(DiscardReason::FingerprintMismatch, msg));
        }

        // Generation darf nie zurueckrollen
        if let Some(current) = self.generation() {
            if msg.generation <= current {
                return Ok(self.discard(DiscardReason::StaleGeneration, msg));
            }
        }

        let local = self.ecdh.as_ref().ok_or_else(|| {
            SessionError::UngueltigerZustand("kein lokales Schluessel-Paar".to_string())
        })?;
        let key = derive_shared_key(local, &remote, msg.generation)?;

        self.peer_verify = Some(verify_key);
        self.shared_key = Some(key);
        self.state = SessionState::SharedKeyActive {
            generation: msg.generation,
        };
        self.exchange_started = None;
        self.attempts = 0;

        info!(art = %msg.kind, generation = msg.generation, "Gemeinsamer Schluessel installiert");
        Ok(HandleOutcome::KeyInstalled {
            generation: msg.generation,
        })
    }

    /// Teardown: verwirft alles Session-Material
    ///
    /// `* -> Closed`. Identitaets-Schluessel koennen vorab ueber den
    /// Storage-Manager persistiert worden sein.
    pub fn close(&mut self) {
        self.ecdh = None;
        self.signing = None;
        self.shared_key = None;
        self.peer_verify = None;
        self.state = SessionState::Closed;
        debug!("Session geschlossen, Schluessel-Material verworfen");
    }

    fn own_pairs(&self) -> SessionResult<(&EcdhKeyPair, &SigningKeyPair)> {
        match (&self.ecdh, &self.signing) {
            (Some(e), Some(s)) => Ok((e, s)),
            _ => Err(SessionError::UngueltigerZustand(
                "lokale Schluessel fehlen".to_string(),
            )),
        }
    }

    fn check_exchange_deadline(&self) -> SessionResult<()> {
        if let Some(started) = self.exchange_started {
            if started.elapsed() > self.config.exchange_timeout {
                return Err(SessionError::Zeitlimit(
                    self.config.exchange_timeout.as_millis() as u64,
                ));
            }
        }
        Ok(())
    }

    fn discard(&self, reason: DiscardReason, msg: &KeyExchangeMessage) -> HandleOutcome {
        warn!(art = %msg.kind, grund = ?reason, "Key-Exchange-Nachricht verworfen");
        HandleOutcome::Discarded(reason)
    }
}

impl std::fmt::Debug for KeySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySession")
            .field("state", &self.state)
            .field("attempts", &self.attempts)
            .field("has_shared_key", &self.shared_key.is_some())
            .finish()
    }
}

/// Periodischer Rotations-Trigger
///
/// Meldet faellige Rotationen ueber einen Channel; der Besitzer ruft dann
/// `begin_rotation` und verschickt die Nachricht ueber den Signaling-Kanal.
#[derive(Debug)]
pub struct RotationTimer {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl RotationTimer {
    /// Startet den Timer mit dem konfigurierten Intervall
    pub fn start(interval: Duration, due_tx: mpsc::UnboundedSender<()>) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // Erster Tick feuert sofort und wird uebersprungen
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if due_tx.send(()).is_err() {
                            break;
                        }
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
        });

        Self {
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for RotationTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
