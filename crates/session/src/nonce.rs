//! Nonce-Registry gegen Replay-Angriffe
//!
//! Eine Nonce muss innerhalb des 5-Minuten-Fensters eindeutig sein.
//! Nach Ablauf des Fensters gilt dieselbe Nonce wieder als frisch.
//! Ein Hintergrund-Task purgt gesehene Nonces alle 60 Sekunden.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use sealcall_core::types::HexString;

use crate::message::NONCE_MAX_AGE_MS;

/// Purge-Intervall des Hintergrund-Tasks
pub const NONCE_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Registry der gesehenen Nonces (nonce -> Zeitpunkt der Registrierung)
#[derive(Debug, Default)]
pub struct NonceRegistry {
    seen: DashMap<String, i64>,
}

impl NonceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prueft und registriert eine Nonce
    ///
    /// `true`: Nonce ist frisch und wurde registriert.
    /// `false`: Replay innerhalb des Fensters - Nachricht verwerfen.
    pub fn check_and_record(&self, nonce: &HexString, now_ms: i64) -> bool {
        let key = nonce.as_str().to_string();

        if let Some(entry) = self.seen.get(&key) {
            if now_ms.saturating_sub(*entry) <= NONCE_MAX_AGE_MS {
                debug!(nonce = %nonce, "Nonce-Replay innerhalb des Fensters");
                return false;
            }
            // Alter Eintrag ausserhalb des Fensters: gilt als frisch
        }

        self.seen.insert(key, now_ms);
        true
    }

    /// Entfernt alle Eintraege, die aelter als das Fenster sind
    ///
    /// Zaehlt die Entfernungen direkt im `retain`-Durchlauf; ein Vorher/
    /// Nachher-Vergleich der Laenge waere unter parallelen Inserts falsch.
    pub fn purge(&self, now_ms: i64) -> usize {
        let mut removed = 0usize;
        self.seen.retain(|_, recorded| {
            let fresh = now_ms.saturating_sub(*recorded) <= NONCE_MAX_AGE_MS;
            if !fresh {
                removed += 1;
            }
            fresh
        });
        if removed > 0 {
            trace!(entfernt = removed, "Nonce-Registry gepurgt");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Haelt den Purge-Task am Leben; Stop via `stop()` oder Drop
#[derive(Debug)]
pub struct NoncePurgeTask {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl NoncePurgeTask {
    /// Startet den periodischen Purge (alle 60s)
    pub fn start(registry: Arc<NonceRegistry>) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(NONCE_PURGE_INTERVAL);
            // Erster Tick feuert sofort und soll nichts tun
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        registry.purge(Utc::now().timestamp_millis());
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

    /// Stoppt den Task
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for NoncePurgeTask {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
