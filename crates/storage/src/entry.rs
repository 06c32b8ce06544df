//! Persistierte Schluessel-Eintraege
//!
//! Schluessel-Material wird nur in portabler, serialisierter Form abgelegt;
//! die nativen Handles bleiben im Prozess.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sealcall_core::types::{Base64String, Fingerprint};
use sealcall_crypto::PortableKey;

/// Art des persistierten Schluessels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    Ecdh,
    Ecdsa,
    Aes,
}

/// Ein persistierter Schluessel-Eintrag
///
/// Wird bei Ablauf (`expires_at`) beim naechsten Lesen geloescht oder vom
/// `cleanup_expired`-Sweep entfernt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredKeyEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: KeyKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_material: Option<Base64String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key_material: Option<Base64String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symmetric_key_material: Option<PortableKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<Fingerprint>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredKeyEntry {
    /// Eintrag ohne Ablauf
    pub fn new(id: impl Into<String>, kind: KeyKind) -> Self {
        Self {
            id: id.into(),
            kind,
            public_key_material: None,
            private_key_material: None,
            symmetric_key_material: None,
            fingerprint: None,
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
