//! Key-Exchange-Nachrichten (Wire-Format)
//!
//! Wird ueber den externen Signaling-Kanal transportiert (JSON).
//! Signiert wird der kanonische Payload `publicKeyBase64|timestampMs|nonceHex`,
//! der den Schluessel an Zeitpunkt und Nonce bindet.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use sealcall_core::encoding::random_bytes;
use sealcall_core::types::{Base64String, Fingerprint, HexString};
use sealcall_crypto::{
    sign_exchange_payload, verify_exchange_payload, EcdhKeyPair, SigningKeyPair, VerifyKey,
};

use crate::error::{SessionError, SessionResult};

/// Maximales Alter einer Nachricht bzw. Eindeutigkeits-Fenster einer Nonce
pub const NONCE_MAX_AGE_MS: i64 = 300_000;
/// Minimale Nonce-Laenge in Bytes
pub const NONCE_MIN_BYTES: usize = 16;

/// Art der Key-Exchange-Nachricht
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Offer,
    Answer,
    Rotation,
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageKind::Offer => write!(f, "offer"),
            MessageKind::Answer => write!(f, "answer"),
            MessageKind::Rotation => write!(f, "rotation"),
        }
    }
}

/// Signierte Key-Exchange-Nachricht
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyExchangeMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Oeffentlicher ECDH-Schluessel (Base64, unkomprimiertes SEC1)
    pub public_key: Base64String,
    /// SHA-256 Fingerprint des oeffentlichen Schluessels
    pub fingerprint: Fingerprint,
    /// ECDSA-Signatur ueber `publicKey|timestamp|nonce` (Base64)
    pub signature: Base64String,
    /// Rotations-Generation des angebotenen Schluessels
    pub generation: u64,
    /// Epoch-Millisekunden
    pub timestamp: i64,
    /// Zufalls-Nonce (Hex, >= 16 Bytes)
    pub nonce: HexString,
    /// Oeffentlicher ECDSA-Schluessel des Senders (nur in der ersten
    /// Nachricht noetig)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_public_key: Option<Base64String>,
}

impl KeyExchangeMessage {
    /// Baut und signiert eine Nachricht fuer das eigene ephemere Paar
    pub fn build(
        kind: MessageKind,
        ecdh: &EcdhKeyPair,
        signing: &SigningKeyPair,
        generation: u64,
        include_signing_key: bool,
    ) -> SessionResult<Self> {
        let nonce = HexString::from_bytes(&random_bytes(NONCE_MIN_BYTES));
        let timestamp = Utc::now().timestamp_millis();

        let signature =
            sign_exchange_payload(signing, &ecdh.public_key_base64, timestamp, &nonce)?;

        Ok(Self {
            kind,
            public_key: ecdh.public_key_base64.clone(),
            fingerprint: ecdh.fingerprint.clone(),
            signature,
            generation,
            timestamp,
            nonce,
            signing_public_key: include_signing_key
                .then(|| signing.public_key_base64.clone()),
        })
    }

    /// Verifiziert die Signatur gegen den Verifikations-Schluessel des
    /// Senders; gibt bei jedem Fehler `false` zurueck
    pub fn verify_signature(&self, key: &VerifyKey) -> bool {
        verify_exchange_payload(
            key,
            &self.public_key,
            self.timestamp,
            &self.nonce,
            &self.signature,
        )
    }

    /// Prueft die Mindest-Laenge der Nonce
    pub fn check_nonce_length(&self) -> SessionResult<()> {
        let bytes = self.nonce.decode()?;
        if bytes.len() < NONCE_MIN_BYTES {
            return Err(SessionError::NonceZuKurz {
                mindestens: NONCE_MIN_BYTES,
                erhalten: bytes.len(),
            });
        }
        Ok(())
    }

    /// Ist die Nachricht aelter als das Eindeutigkeits-Fenster?
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms.saturating_sub(self.timestamp) > NONCE_MAX_AGE_MS
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
