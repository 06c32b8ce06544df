//! AES-256-GCM Frame-Verschluesselung
//!
//! ## Wire-Format
//! ```text
//! [iv(12)] [ciphertext] [auth_tag(16)]
//! ```
//!
//! Pro `encrypt`-Aufruf wird ein frischer zufaelliger 12-Byte-IV erzeugt.
//! IV-Wiederverwendung unter demselben Schluessel ist eine harte
//! Invarianten-Verletzung und darf nie passieren.
//!
//! ## Runtime-Quirk
//! Eine Runtime-Familie lehnt einen expliziten Tag-Laengen-Parameter beim
//! Verschluesseln ab, obwohl sie immer den Standard-128-Bit-Tag verwendet.
//! `CipherConfig::include_tag_length` bildet das als Konstruktionszeit-Flag
//! ab (Standard: angeben; fuer die betroffene Familie: weglassen). Auf das
//! Ausgabeformat hat das Flag keinen Einfluss.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce as AesNonce};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use sealcall_core::encoding::{combine, extract, random_bytes, IV_LEN, MIN_FRAME_LEN, TAG_LEN};
use sealcall_core::types::{Base64String, SecretBytes};

use crate::error::{CryptoError, CryptoResult};

/// Laenge eines AES-256-Schluessels
const KEY_LEN: usize = 32;

/// Symmetrischer Sitzungs-Schluessel
///
/// Pro Richtung und Verbindung ist genau ein Schluessel aktiv; bei Rotation
/// wird er ersetzt (nie mutiert) und `generation` steigt monoton.
#[derive(Debug, Clone)]
pub struct SymmetricKey {
    /// Rohes Schluessel-Material (32 Bytes, genullt beim Drop)
    pub key_bytes: SecretBytes,
    /// Monoton steigender Rotations-Zaehler
    pub generation: u64,
    /// Erstellungs-Zeitpunkt
    pub created_at: DateTime<Utc>,
}

impl SymmetricKey {
    /// Generiert einen frischen zufaelligen Schluessel
    pub fn generate(generation: u64) -> CryptoResult<Self> {
        Self::from_raw_bytes(random_bytes(KEY_LEN), generation)
    }

    /// Uebernimmt rohe Schluessel-Bytes (z.B. aus ECDH-Ableitung oder
    /// Worker-Transfer)
    pub fn from_raw_bytes(bytes: Vec<u8>, generation: u64) -> CryptoResult<Self> {
        if bytes.len() != KEY_LEN {
            return Err(CryptoError::UngueltigeSchluesselLaenge {
                erwartet: KEY_LEN,
                erhalten: bytes.len(),
            });
        }
        Ok(Self {
            key_bytes: SecretBytes::new(bytes),
            generation,
            created_at: Utc::now(),
        })
    }

    /// Exportiert das rohe Schluessel-Material (fuer den Worker-Transfer;
    /// der Aufrufer uebernimmt die Ownership der Kopie)
    pub fn export_raw(&self) -> Vec<u8> {
        self.key_bytes.to_vec()
    }

    /// Exportiert in die portable Form (fuer die Persistenz-Grenze)
    pub fn to_portable(&self) -> PortableKey {
        PortableKey {
            kty: "oct".to_string(),
            k: Base64String::from_bytes(self.key_bytes.as_bytes()),
            generation: self.generation,
            created_at: self.created_at,
        }
    }

    /// Importiert aus der portablen Form
    pub fn from_portable(portable: &PortableKey) -> CryptoResult<Self> {
        let bytes = portable.k.decode()?;
        let mut key = Self::from_raw_bytes(bytes, portable.generation)?;
        key.created_at = portable.created_at;
        Ok(key)
    }
}

/// Portable, serialisierte Schluessel-Form fuer Grenzuebertritte
/// (Storage, Export)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortableKey {
    /// Schluessel-Typ ("oct" = symmetrisch)
    pub kty: String,
    /// Schluessel-Material, Base64
    pub k: Base64String,
    /// Rotations-Generation
    pub generation: u64,
    /// Erstellungs-Zeitpunkt
    pub created_at: DateTime<Utc>,
}

/// Konstruktionszeit-Konfiguration des Frame-Ciphers
#[derive(Debug, Clone, Copy)]
pub struct CipherConfig {
    /// Expliziten Tag-Laengen-Parameter an das Backend geben?
    /// (false fuer die Runtime-Familie, die ihn ablehnt)
    pub include_tag_length: bool,
}

impl Default for CipherConfig {
    fn default() -> Self {
        Self {
            include_tag_length: true,
        }
    }
}

/// Ergebnis von `try_decrypt`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TryDecryptOutcome {
    /// Entschluesselte Daten - oder die Original-Bytes bei Passthrough
    pub data: Vec<u8>,
    /// Wurde tatsaechlich entschluesselt?
    pub was_encrypted: bool,
}

/// AES-256-GCM Cipher fuer Media-Frames
#[derive(Debug, Clone)]
pub struct FrameCipher {
    config: CipherConfig,
}

impl FrameCipher {
    pub fn new(config: CipherConfig) -> Self {
        if !config.include_tag_length {
            // Tag ist trotzdem immer 128 Bit; das Flag betrifft nur den
            // Backend-Aufruf der betroffenen Runtime-Familie
            debug!("FrameCipher ohne expliziten Tag-Laengen-Parameter konfiguriert");
        }
        Self { config }
    }

    pub fn config(&self) -> CipherConfig {
        self.config
    }

    /// Verschluesselt einen Frame: frischer IV, 128-Bit-Tag,
    /// Ausgabe `iv || ciphertext || tag`
    pub fn encrypt(&self, key: &SymmetricKey, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        let cipher_key = Key::<Aes256Gcm>::from_slice(key.key_bytes.as_bytes());
        let cipher = Aes256Gcm::new(cipher_key);

        let iv = random_bytes(IV_LEN);
        let nonce = AesNonce::from_slice(&iv);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| CryptoError::Verschluesselung(e.to_string()))?;

        Ok(combine(&iv, &ciphertext))
    }

    /// Entschluesselt einen Frame; Tag-Mismatch oder korrupte Daten sind
    /// ein Fehler fuer den direkten Aufrufer
    pub fn decrypt(&self, key: &SymmetricKey, combined: &[u8]) -> CryptoResult<Vec<u8>> {
        if combined.len() < IV_LEN + TAG_LEN {
            return Err(CryptoError::UngueltigeDaten(format!(
                "Frame zu kurz: {} Bytes",
                combined.len()
            )));
        }

        let (iv, ciphertext) = extract(combined, IV_LEN)?;

        let cipher_key = Key::<Aes256Gcm>::from_slice(key.key_bytes.as_bytes());
        let cipher = Aes256Gcm::new(cipher_key);
        let nonce = AesNonce::from_slice(&iv);

        cipher
            .decrypt(nonce, ciphertext.as_slice())
            .map_err(|e| CryptoError::Entschluesselung(e.to_string()))
    }

    /// Tolerante Entschluesselung fuer die Uebergangsphase vor dem
    /// Schluessel-Agreement
    ///
    /// Gibt die Original-Bytes unveraendert zurueck wenn kein Schluessel
    /// vorliegt, die Daten kuerzer als ein minimaler gueltiger Frame sind
    /// oder die Entschluesselung fehlschlaegt. Ein Fehlschlag wird nur
    /// geloggt, nie propagiert - echte Korruption ist hier bewusst nicht
    /// von "noch unverschluesselt" unterscheidbar.
    pub fn try_decrypt(&self, key: Option<&SymmetricKey>, data: &[u8]) -> TryDecryptOutcome {
        let Some(key) = key else {
            return TryDecryptOutcome {
                data: data.to_vec(),
                was_encrypted: false,
            };
        };

        if data.len() < MIN_FRAME_LEN {
            return TryDecryptOutcome {
                data: data.to_vec(),
                was_encrypted: false,
            };
        }

        match self.decrypt(key, data) {
            Ok(decrypted) => TryDecryptOutcome {
                data: decrypted,
                was_encrypted: true,
            },
            Err(e) => {
                debug!(
                    generation = key.generation,
                    fehler = %e,
                    "try_decrypt: Passthrough nach fehlgeschlagener Entschluesselung"
                );
                TryDecryptOutcome {
                    data: data.to_vec(),
                    was_encrypted: false,
                }
            }
        }
    }
}

impl Default for FrameCipher {
    fn default() -> Self {
        Self::new(CipherConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
