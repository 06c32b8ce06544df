//! ECDSA-Signierung auf P-256 (SHA-256)
//!
//! Bindet Identitaet an ausgetauschte Schluessel: Key-Exchange-Nachrichten
//! werden ueber den kanonischen String `publicKeyBase64|timestampMs|nonceHex`
//! signiert. Das bindet einen konkreten Schluessel an einen Zeitpunkt und
//! eine Nonce und verhindert Replay- und Substitutions-Angriffe.
//!
//! `verify` gibt bei jedem Backend-Fehler `false` zurueck und wirft nie -
//! eine fehlgeschlagene Verifikation ist nie fatal fuer den Aufrufer.

use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde_json::Value;

use sealcall_core::types::{Base64String, Fingerprint, HexString};

use crate::agreement::compute_fingerprint;
use crate::error::{CryptoError, CryptoResult};

/// ECDSA-Schluessel-Paar (P-256), nur fuer Signierung/Verifikation
///
/// Gleiche Form wie `EcdhKeyPair`, wird aber nie fuer Vertraulichkeit genutzt.
pub struct SigningKeyPair {
    signing_key: SigningKey,
    /// Roher oeffentlicher Schluessel (65 Bytes, unkomprimiert)
    public_key_bytes: Vec<u8>,
    /// Base64-Export des Verifikations-Schluessels
    pub public_key_base64: Base64String,
    /// SHA-256 Fingerprint ueber die rohen Public-Key-Bytes
    pub fingerprint: Fingerprint,
}

impl SigningKeyPair {
    /// Generiert ein frisches ECDSA-Schluessel-Paar
    pub fn generate() -> CryptoResult<Self> {
        let signing_key = SigningKey::random(&mut OsRng);
        let public_key_bytes = signing_key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec();

        let fingerprint = compute_fingerprint(&public_key_bytes);
        let public_key_base64 = Base64String::from_bytes(&public_key_bytes);

        Ok(Self {
            signing_key,
            public_key_bytes,
            public_key_base64,
            fingerprint,
        })
    }

    pub fn public_key_bytes(&self) -> &[u8] {
        &self.public_key_bytes
    }

    /// Gibt den zugehoerigen Verifikations-Schluessel zurueck
    pub fn verify_key(&self) -> VerifyKey {
        VerifyKey {
            key: *self.signing_key.verifying_key(),
            raw: self.public_key_bytes.clone(),
        }
    }
}

impl std::fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningKeyPair {{ fingerprint: {} }}", self.fingerprint)
    }
}

/// Importierter Verifikations-Schluessel
#[derive(Debug, Clone)]
pub struct VerifyKey {
    key: VerifyingKey,
    raw: Vec<u8>,
}

impl VerifyKey {
    /// Importiert einen Verifikations-Schluessel aus Base64
    pub fn import(encoded: &Base64String) -> CryptoResult<Self> {
        let raw = encoded.decode()?;
        let key = VerifyingKey::from_sec1_bytes(&raw).map_err(|e| {
            CryptoError::UngueltigerOeffentlicherSchluessel(e.to_string())
        })?;
        Ok(Self { key, raw })
    }

    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw
    }
}

/// Signiert Daten; Ergebnis ist die 64-Byte-Signatur als Base64
pub fn sign(pair: &SigningKeyPair, data: &[u8]) -> CryptoResult<Base64String> {
    let signature: Signature = pair.signing_key.sign(data);
    Ok(Base64String::from_bytes(&signature.to_bytes()))
}

/// Verifiziert eine Signatur
///
/// Faengt jeden Fehler (kaputte Base64, falsche Laenge, ungueltige Signatur)
/// intern ab und gibt `false` zurueck statt zu propagieren.
pub fn verify(key: &VerifyKey, data: &[u8], signature: &Base64String) -> bool {
    let Ok(sig_bytes) = signature.decode() else {
        return false;
    };
    let Ok(sig) = Signature::from_slice(&sig_bytes) else {
        return false;
    };
    key.key.verify(data, &sig).is_ok()
}

/// Kanonisiert ein JSON-Objekt durch rekursives Sortieren der Schluessel
///
/// Garantiert reproduzierbare Signaturen unabhaengig von der
/// Einfuege-Reihenfolge der Felder.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = serde_json::Map::new();
            for k in keys {
                sorted.insert(k.clone(), canonicalize(&map[k]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Serialisiert ein JSON-Objekt kanonisch (sortierte Schluessel)
pub fn canonical_json(value: &Value) -> CryptoResult<String> {
    Ok(serde_json::to_string(&canonicalize(value))?)
}

/// Signiert ein JSON-Objekt ueber seine kanonische Serialisierung
pub fn sign_object(pair: &SigningKeyPair, object: &Value) -> CryptoResult<Base64String> {
    let canonical = canonical_json(object)?;
    sign(pair, canonical.as_bytes())
}

/// Verifiziert die Signatur eines JSON-Objekts
pub fn verify_object_signature(key: &VerifyKey, object: &Value, signature: &Base64String) -> bool {
    let Ok(canonical) = canonical_json(object) else {
        return false;
    };
    verify(key, canonical.as_bytes(), signature)
}

/// Baut den kanonischen Payload-String einer Key-Exchange-Nachricht:
/// `publicKeyBase64|timestampMs|nonceHex`
pub fn exchange_payload(public_key: &Base64String, timestamp_ms: i64, nonce: &HexString) -> String {
    format!("{}|{}|{}", public_key, timestamp_ms, nonce)
}

/// Signiert den kanonischen Key-Exchange-Payload
pub fn sign_exchange_payload(
    pair: &SigningKeyPair,
    public_key: &Base64String,
    timestamp_ms: i64,
    nonce: &HexString,
) -> CryptoResult<Base64String> {
    let payload = exchange_payload(public_key, timestamp_ms, nonce);
    sign(pair, payload.as_bytes())
}

/// Verifiziert den kanonischen Key-Exchange-Payload
pub fn verify_exchange_payload(
    key: &VerifyKey,
    public_key: &Base64String,
    timestamp_ms: i64,
    nonce: &HexString,
    signature: &Base64String,
) -> bool {
    let payload = exchange_payload(public_key, timestamp_ms, nonce);
    verify(key, payload.as_bytes(), signature)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn signieren_und_verifizieren() {
        let pair = SigningKeyPair::generate().unwrap();
        let data = b"Hallo, Sealcall!";

        let sig = sign(&pair, data).unwrap();
        assert_eq!(sig.decode().unwrap().len(), 64);
        assert!(verify(&pair.verify_key(), data, &sig));
    }

    #[test]
    fn manipulierte_daten_werden_abgelehnt() {
        let pair = SigningKeyPair::generate().unwrap();
        let sig = sign(&pair, b"Original").unwrap();
        assert!(!verify(&pair.verify_key(), b"Geaendert", &sig));
    }

    #[test]
    fn falscher_schluessel_wird_abgelehnt() {
        let pair1 = SigningKeyPair::generate().unwrap();
        let pair2 = SigningKeyPair::generate().unwrap();
        let sig = sign(&pair1, b"Daten").unwrap();
        assert!(!verify(&pair2.verify_key(), b"Daten", &sig));
    }

    #[test]
    fn kaputte_signatur_wirft_nie() {
        let pair = SigningKeyPair::generate().unwrap();
        let key = pair.verify_key();

        // Kein Base64-Fehler, aber falsche Laenge
        let kurz = Base64String::from_bytes(&[1, 2, 3]);
        assert!(!verify(&key, b"Daten", &kurz));

        // 64 Null-Bytes sind keine gueltige Signatur
        let nullen = Base64String::from_bytes(&[0u8; 64]);
        assert!(!verify(&key, b"Daten", &nullen));
    }

    #[test]
    fn verify_key_import_roundtrip() {
        let pair = SigningKeyPair::generate().unwrap();
        let imported = VerifyKey::import(&pair.public_key_base64).unwrap();

        let sig = sign(&pair, b"Import-Test").unwrap();
        assert!(verify(&imported, b"Import-Test", &sig));
    }

    #[test]
    fn objekt_signatur_unabhaengig_von_feld_reihenfolge() {
        let pair = SigningKeyPair::generate().unwrap();

        let a = json!({"b": 2, "a": 1, "nested": {"y": true, "x": [1, 2]}});
        let b = json!({"nested": {"x": [1, 2], "y": true}, "a": 1, "b": 2});

        let sig = sign_object(&pair, &a).unwrap();
        assert!(verify_object_signature(&pair.verify_key(), &b, &sig));
    }

    #[test]
    fn objekt_signatur_erkennt_aenderung() {
        let pair = SigningKeyPair::generate().unwrap();
        let original = json!({"key": "wert"});
        let geaendert = json!({"key": "anderer-wert"});

        let sig = sign_object(&pair, &original).unwrap();
        assert!(!verify_object_signature(&pair.verify_key(), &geaendert, &sig));
    }

    #[test]
    fn exchange_payload_format() {
        let pk = Base64String::from_bytes(b"pk");
        let nonce = HexString::from_bytes(&[0xab, 0xcd]);
        let payload = exchange_payload(&pk, 1234, &nonce);
        assert_eq!(payload, format!("{}|1234|abcd", pk));
    }

    #[test]
    fn exchange_payload_signatur_roundtrip() {
        let pair = SigningKeyPair::generate().unwrap();
        let pk = Base64String::from_bytes(&[0x04; 65]);
        let nonce = HexString::from_bytes(&[7u8; 16]);

        let sig = sign_exchange_payload(&pair, &pk, 1_700_000_000_000, &nonce).unwrap();
        assert!(verify_exchange_payload(
            &pair.verify_key(),
            &pk,
            1_700_000_000_000,
            &nonce,
            &sig
        ));

        // Anderer Zeitstempel -> Signatur passt nicht mehr
        assert!(!verify_exchange_payload(
            &pair.verify_key(),
            &pk,
            1_700_000_000_001,
            &nonce,
            &sig
        ));
    }
}
