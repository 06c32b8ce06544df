//! Gebrandete String-Typen fuer das Kryptografie-Subsystem
//!
//! Base64-, Hex- und Fingerprint-Werte verwenden das Newtype-Pattern um
//! Verwechslungen zur Compilezeit auszuschliessen: ein Hex-Wert kann nie
//! dort landen, wo Base64 erwartet wird. Alle Typen validieren ihren
//! Inhalt bei der Konstruktion.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Base64-kodierter String (Standard-Alphabet, mit Padding)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Base64String(String);

impl Base64String {
    /// Validiert und uebernimmt einen Base64-String
    pub fn new(s: impl Into<String>) -> CoreResult<Self> {
        let s = s.into();
        BASE64.decode(&s)?;
        Ok(Self(s))
    }

    /// Kodiert rohe Bytes als Base64
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(BASE64.encode(bytes))
    }

    /// Dekodiert zurueck zu rohen Bytes
    pub fn decode(&self) -> CoreResult<Vec<u8>> {
        Ok(BASE64.decode(&self.0)?)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Base64String {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hex-kodierter String (Kleinbuchstaben)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HexString(String);

impl HexString {
    /// Validiert und uebernimmt einen Hex-String
    pub fn new(s: impl Into<String>) -> CoreResult<Self> {
        let s: String = s.into();
        hex::decode(&s)?;
        Ok(Self(s.to_lowercase()))
    }

    /// Kodiert rohe Bytes als Hex
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Dekodiert zurueck zu rohen Bytes
    pub fn decode(&self) -> CoreResult<Vec<u8>> {
        Ok(hex::decode(&self.0)?)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for HexString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SHA-256 Fingerprint eines oeffentlichen Schluessels (64 Hex-Zeichen)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Validiert und uebernimmt einen Fingerprint-String
    pub fn new(s: impl Into<String>) -> CoreResult<Self> {
        let s: String = s.into();
        if s.len() != 64 {
            return Err(CoreError::UngueltigerFingerprint(s.len()));
        }
        hex::decode(&s)?;
        Ok(Self(s.to_lowercase()))
    }

    /// Erstellt einen Fingerprint aus einem 32-Byte SHA-256 Digest
    pub fn from_digest(digest: [u8; 32]) -> Self {
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Rohe Digest-Bytes (32 Bytes)
    pub fn as_bytes(&self) -> CoreResult<Vec<u8>> {
        Ok(hex::decode(&self.0)?)
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sicherer Schluessel-Container (wird beim Drop genullt)
#[derive(Clone)]
pub struct SecretBytes(Vec<u8>);

impl Drop for SecretBytes {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretBytes([REDACTED] {} bytes)", self.0.len())
    }
}

impl SecretBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Kopiert den Inhalt heraus (fuer Transfer an den Worker)
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
