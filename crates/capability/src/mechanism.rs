//! Auswahl des Live-Media-Transform-Mechanismus
//!
//! Pro Runtime-Familie gibt es eine feste Prioritaets-Tabelle; gewaehlt
//! wird der erste verfuegbare Mechanismus. Die Auswahl ist deterministisch:
//! bei mehreren verfuegbaren Mechanismen gewinnt immer der fuer die Familie
//! als stabilste bekannte.

use serde::{Deserialize, Serialize};

use crate::env::{RuntimeEnv, RuntimeFeature};
use crate::family::RuntimeFamily;

/// Die drei Per-Frame-Transform-Mechanismen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformMechanism {
    /// Script-Transform-Objekt, an den Worker gebunden
    ScriptTransform,
    /// Sender/Receiver-exponierte Encoded-Streams, Endpunkte in den Worker
    /// transferiert
    EncodedStreams,
    /// In-Process-Stream-Paar, direkt als Transform-Property zugewiesen
    InsertableStreams,
}

impl std::fmt::Display for TransformMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransformMechanism::ScriptTransform => write!(f, "script-transform"),
            TransformMechanism::EncodedStreams => write!(f, "encoded-streams"),
            TransformMechanism::InsertableStreams => write!(f, "insertable-streams"),
        }
    }
}

impl TransformMechanism {
    fn feature(self) -> RuntimeFeature {
        match self {
            TransformMechanism::ScriptTransform => RuntimeFeature::ScriptTransform,
            TransformMechanism::EncodedStreams => RuntimeFeature::EncodedStreams,
            TransformMechanism::InsertableStreams => RuntimeFeature::InsertableStreams,
        }
    }
}

/// Feste Prioritaets-Tabelle pro Familie
///
/// Chromium faehrt am stabilsten mit Encoded-Streams; WebKit und Firefox
/// mit dem Script-Transform.
const fn priority_table(family: RuntimeFamily) -> [TransformMechanism; 3] {
    match family {
        RuntimeFamily::Chromium => [
            TransformMechanism::EncodedStreams,
            TransformMechanism::InsertableStreams,
            TransformMechanism::ScriptTransform,
        ],
        RuntimeFamily::Firefox | RuntimeFamily::WebKit | RuntimeFamily::Unknown => [
            TransformMechanism::ScriptTransform,
            TransformMechanism::EncodedStreams,
            TransformMechanism::InsertableStreams,
        ],
    }
}

/// Waehlt genau einen Mechanismus: erster verfuegbarer laut Tabelle
///
/// Reiner Existenz-Check, kein Aufruf des Mechanismus. `None` wenn die
/// Runtime keinen der drei Mechanismen anbietet.
pub fn select_mechanism(
    family: RuntimeFamily,
    env: &dyn RuntimeEnv,
) -> Option<TransformMechanism> {
    priority_table(family)
        .into_iter()
        .find(|mechanism| env.has_feature(mechanism.feature()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
