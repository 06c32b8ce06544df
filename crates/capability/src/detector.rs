//! Memoisierter Capability-Detector
//!
//! Alle Proben werden nach dem ersten Lauf gecacht; `reset()` leert die
//! Caches (Test-Isolation). Async-Proben mit Seiteneffekten deduplizieren
//! konkurrierende Aufrufer: laeuft eine Probe bereits, warten spaetere
//! Aufrufer auf deren Ergebnis statt die Probe erneut zu starten.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use sealcall_crypto::{EcdhKeyPair, FrameCipher, SigningKeyPair, SymmetricKey};

use crate::env::{RuntimeEnv, RuntimeFeature};
use crate::family::{detect_family, FamilyInfo, RuntimeFamily};
use crate::mechanism::{select_mechanism, TransformMechanism};

/// Quota unterhalb dieser Schwelle gilt als Private-Browsing-Indiz
/// (Chromium meldet in privaten Fenstern eine kuenstlich kleine Quota)
const PRIVATE_QUOTA_THRESHOLD: u64 = 500 * 1024 * 1024;

/// Ergebnis der Krypto-Primitiven-Probe
///
/// Feature-Existenz allein beweist keine Kurven-/Algorithmus-Unterstuetzung;
/// nur eine Wegwerf-Generierung tut das.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoSupport {
    pub ecdh: bool,
    pub aes_gcm: bool,
    pub ecdsa: bool,
}

/// Gesamtbild der Runtime-Faehigkeiten
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityReport {
    pub family: RuntimeFamily,
    pub major_version: Option<u32>,
    pub mechanism: Option<TransformMechanism>,
    pub crypto: CryptoSupport,
    pub private_mode: bool,
    pub secure_context: bool,
    pub worker: bool,
    pub shared_array_buffer: bool,
    pub crypto_provider: bool,
}

/// Capability-Detector mit memoisierten Proben
pub struct Detector {
    env: Arc<dyn RuntimeEnv>,

    family_cache: Mutex<Option<FamilyInfo>>,
    crypto_cache: Mutex<Option<CryptoSupport>>,
    private_cache: Mutex<Option<bool>>,

    // In-Flight-Serialisierung der seiteneffekt-behafteten Proben
    crypto_inflight: tokio::sync::Mutex<()>,
    private_inflight: tokio::sync::Mutex<()>,
}

impl Detector {
    pub fn new(env: Arc<dyn RuntimeEnv>) -> Self {
        Self {
            env,
            family_cache: Mutex::new(None),
            crypto_cache: Mutex::new(None),
            private_cache: Mutex::new(None),
            crypto_inflight: tokio::sync::Mutex::new(()),
            private_inflight: tokio::sync::Mutex::new(()),
        }
    }

    /// Leert alle Caches (fuer Test-Isolation)
    pub fn reset(&self) {
        *self.family_cache.lock() = None;
        *self.crypto_cache.lock() = None;
        *self.private_cache.lock() = None;
        debug!("Detector-Caches geleert");
    }

    /// Runtime-Familie (memoisiert nach erstem Aufruf)
    pub fn family(&self) -> FamilyInfo {
        let mut cache = self.family_cache.lock();
        if let Some(info) = *cache {
            return info;
        }
        let info = detect_family(&self.env.user_agent());
        debug!(familie = %info.family, version = ?info.major_version, "Runtime-Familie erkannt");
        *cache = Some(info);
        info
    }

    /// Gewaehlter Transform-Mechanismus laut Prioritaets-Tabelle
    pub fn mechanism(&self) -> Option<TransformMechanism> {
        select_mechanism(self.family().family, self.env.as_ref())
    }

    /// Krypto-Primitiven-Probe: Wegwerf-Schluessel generieren und Fehler
    /// abfangen. Dedupliziert konkurrierende Aufrufer.
    pub async fn probe_crypto_support(&self) -> CryptoSupport {
        if let Some(support) = *self.crypto_cache.lock() {
            return support;
        }

        let _inflight = self.crypto_inflight.lock().await;
        // Ein frueherer Aufrufer kann die Probe inzwischen beendet haben
        if let Some(support) = *self.crypto_cache.lock() {
            return support;
        }

        let support = if self.env.has_feature(RuntimeFeature::CryptoProvider) {
            CryptoSupport {
                ecdh: EcdhKeyPair::generate().is_ok(),
                aes_gcm: probe_aes_gcm(),
                ecdsa: SigningKeyPair::generate().is_ok(),
            }
        } else {
            CryptoSupport {
                ecdh: false,
                aes_gcm: false,
                ecdsa: false,
            }
        };

        info!(?support, "Krypto-Primitiven-Probe abgeschlossen");
        *self.crypto_cache.lock() = Some(support);
        support
    }

    /// Private-Browsing-Heuristik, pro Familie unterschiedlich.
    /// Dedupliziert konkurrierende Aufrufer.
    pub async fn detect_private_mode(&self) -> bool {
        if let Some(private) = *self.private_cache.lock() {
            return private;
        }

        let _inflight = self.private_inflight.lock().await;
        if let Some(private) = *self.private_cache.lock() {
            return private;
        }

        let family = self.family().family;
        let private = match family {
            // Chromium: kuenstlich kleine Quota in privaten Fenstern
            RuntimeFamily::Chromium => match self.env.storage_quota().await {
                Some(quota) => quota < PRIVATE_QUOTA_THRESHOLD,
                None => false,
            },
            // Firefox: transaktionaler DB-Zyklus schlaegt im privaten Modus fehl
            RuntimeFamily::Firefox => !self.env.database_cycle().await,
            // WebKit: localStorage-Roundtrip schlaegt fehl
            RuntimeFamily::WebKit | RuntimeFamily::Unknown => {
                !self.env.storage_roundtrip().await
            }
        };

        if private {
            info!(familie = %family, "Restricted-Storage (Private Browsing) erkannt");
        }
        *self.private_cache.lock() = Some(private);
        private
    }

    /// Vollstaendiger Capability-Report
    pub async fn report(&self) -> CapabilityReport {
        let info = self.family();
        CapabilityReport {
            family: info.family,
            major_version: info.major_version,
            mechanism: self.mechanism(),
            crypto: self.probe_crypto_support().await,
            private_mode: self.detect_private_mode().await,
            secure_context: self.env.is_secure_context(),
            worker: self.env.has_feature(RuntimeFeature::Worker),
            shared_array_buffer: self.env.has_feature(RuntimeFeature::SharedArrayBuffer),
            crypto_provider: self.env.has_feature(RuntimeFeature::CryptoProvider),
        }
    }
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Detector {{ family: {:?} }}", *self.family_cache.lock())
    }
}

/// AES-256-GCM mit einem Wegwerf-Schluessel einmal durchspielen
fn probe_aes_gcm() -> bool {
    let Ok(key) = SymmetricKey::generate(0) else {
        return false;
    };
    let cipher = FrameCipher::default();
    match cipher.encrypt(&key, b"probe") {
        Ok(frame) => cipher.decrypt(&key, &frame).is_ok(),
        Err(_) => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
