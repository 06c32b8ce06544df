//! Readiness-Aggregation
//!
//! Ein einziger Blocker macht E2EE unmoeglich; Warnungen sind rein
//! beratend und blockieren nie. Der Aufrufer entscheidet, ob ein Call
//! ohne E2EE fortgesetzt wird.

use serde::{Deserialize, Serialize};
use tracing::warn;

use sealcall_capability::{Detector, TransformMechanism};

/// Harte Blocker: jeder einzelne verhindert E2EE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Blocker {
    /// Kein Kryptografie-Provider vorhanden
    NoCryptoProvider,
    /// Runtime laeuft nicht in einem Secure Context
    InsecureContext,
    /// ECDH (P-256) nicht unterstuetzt
    EcdhUnsupported,
    /// AES-256-GCM nicht unterstuetzt
    AesGcmUnsupported,
    /// Keiner der drei Transform-Mechanismen verfuegbar
    NoTransformMechanism,
    /// Kein Hintergrund-Ausfuehrungskontext (Worker)
    NoWorkerSupport,
}

/// Beratende Warnungen, blockieren nie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Warning {
    /// Restricted-Storage erkannt: generierte Schluessel ueberleben die
    /// Session nicht
    PrivateModeDetected,
    /// Kein Shared-Memory-Puffer: moeglicherweise reduzierter Durchsatz
    NoSharedArrayBuffer,
}

/// Aggregiertes Readiness-Ergebnis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Readiness {
    pub ready: bool,
    /// Gewaehlter Mechanismus, falls einer verfuegbar ist
    pub method: Option<TransformMechanism>,
    pub blockers: Vec<Blocker>,
    pub warnings: Vec<Warning>,
}

/// Fuehrt alle Proben aus und aggregiert Blocker und Warnungen
pub async fn check_readiness(detector: &Detector) -> Readiness {
    let report = detector.report().await;

    let mut blockers = Vec::new();
    let mut warnings = Vec::new();

    if !report.crypto_provider {
        blockers.push(Blocker::NoCryptoProvider);
    }
    if !report.secure_context {
        blockers.push(Blocker::InsecureContext);
    }
    if report.crypto_provider && !report.crypto.ecdh {
        blockers.push(Blocker::EcdhUnsupported);
    }
    if report.crypto_provider && !report.crypto.aes_gcm {
        blockers.push(Blocker::AesGcmUnsupported);
    }
    if report.mechanism.is_none() {
        blockers.push(Blocker::NoTransformMechanism);
    }
    if !report.worker {
        blockers.push(Blocker::NoWorkerSupport);
    }

    if report.private_mode {
        warnings.push(Warning::PrivateModeDetected);
    }
    if !report.shared_array_buffer {
        warnings.push(Warning::NoSharedArrayBuffer);
    }

    let ready = blockers.is_empty();
    if !ready {
        warn!(?blockers, "E2EE nicht verfuegbar");
    }

    Readiness {
        ready,
        method: report.mechanism,
        blockers,
        warnings,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
