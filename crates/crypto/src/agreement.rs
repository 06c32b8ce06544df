//! ECDH Key Agreement auf NIST P-256
//!
//! Jede Call-Seite erzeugt ein ephemeres P-256-Paar, tauscht den
//! oeffentlichen Schluessel ueber den Signaling-Kanal aus und leitet den
//! gemeinsamen AES-256-GCM-Schluessel ab. Oeffentliche Schluessel werden
//! unkomprimiert exportiert (SEC 1: `0x04 || x || y`, 65 Bytes).
//!
//! Der Fingerprint ist SHA-256 ueber die rohen exportierten Public-Key-Bytes,
//! hex-kodiert (64 Zeichen) - fuer menschliche und automatische Verifikation.

use p256::ecdh::diffie_hellman;
use p256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use p256::{EncodedPoint, PublicKey, SecretKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use sealcall_core::types::{Base64String, Fingerprint};

use crate::cipher::SymmetricKey;
use crate::error::{CryptoError, CryptoResult};

/// Laenge eines unkomprimierten P-256 Public Keys (SEC 1)
const PUBLIC_KEY_LEN: usize = 65;

/// Ephemeres ECDH-Schluessel-Paar (P-256)
///
/// Unveraenderlich nach Erstellung; gehoert exklusiv der Session, die es
/// erzeugt hat, und wird am Session-Ende verworfen.
pub struct EcdhKeyPair {
    secret_key: SecretKey,
    /// Roher oeffentlicher Schluessel (65 Bytes, unkomprimiert)
    public_key_bytes: Vec<u8>,
    /// Base64-Export des oeffentlichen Schluessels
    pub public_key_base64: Base64String,
    /// SHA-256 Fingerprint ueber die rohen Public-Key-Bytes
    pub fingerprint: Fingerprint,
}

impl EcdhKeyPair {
    /// Generiert ein frisches ephemeres Schluessel-Paar
    pub fn generate() -> CryptoResult<Self> {
        let secret_key = SecretKey::random(&mut OsRng);
        let public_key_bytes = secret_key
            .public_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec();

        let fingerprint = compute_fingerprint(&public_key_bytes);
        let public_key_base64 = Base64String::from_bytes(&public_key_bytes);

        Ok(Self {
            secret_key,
            public_key_bytes,
            public_key_base64,
            fingerprint,
        })
    }

    /// Roher oeffentlicher Schluessel (65 Bytes)
    pub fn public_key_bytes(&self) -> &[u8] {
        &self.public_key_bytes
    }
}

impl std::fmt::Debug for EcdhKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EcdhKeyPair {{ fingerprint: {} }}", self.fingerprint)
    }
}

/// Importierter oeffentlicher Schluessel der Gegenseite
///
/// Behaelt die rohen Bytes, damit der Fingerprint auch auf dem importierten
/// Handle berechnet werden kann.
#[derive(Debug, Clone)]
pub struct RemotePublicKey {
    key: PublicKey,
    raw: Vec<u8>,
    /// SHA-256 Fingerprint ueber die importierten Bytes
    pub fingerprint: Fingerprint,
}

impl RemotePublicKey {
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw
    }
}

/// Berechnet den SHA-256 Fingerprint ueber rohe Public-Key-Bytes
pub fn compute_fingerprint(public_key_bytes: &[u8]) -> Fingerprint {
    let digest: [u8; 32] = Sha256::digest(public_key_bytes).into();
    Fingerprint::from_digest(digest)
}

/// Rekonstruiert einen nutzbaren Remote-Schluessel aus Base64
pub fn import_public_key(encoded: &Base64String) -> CryptoResult<RemotePublicKey> {
    let raw = encoded.decode()?;

    if raw.len() != PUBLIC_KEY_LEN {
        return Err(CryptoError::UngueltigerOeffentlicherSchluessel(format!(
            "erwartet {} Bytes (unkomprimiert), erhalten {}",
            PUBLIC_KEY_LEN,
            raw.len()
        )));
    }
    if raw[0] != 0x04 {
        return Err(CryptoError::UngueltigerOeffentlicherSchluessel(
            "kein unkomprimiertes SEC1-Format (0x04-Praefix fehlt)".to_string(),
        ));
    }

    let encoded_point = EncodedPoint::from_bytes(&raw).map_err(|_| {
        CryptoError::UngueltigerOeffentlicherSchluessel("SEC1-Parsing fehlgeschlagen".to_string())
    })?;

    let key = PublicKey::from_encoded_point(&encoded_point)
        .into_option()
        .ok_or_else(|| {
            CryptoError::UngueltigerOeffentlicherSchluessel(
                "Punkt liegt nicht auf der P-256-Kurve".to_string(),
            )
        })?;

    let fingerprint = compute_fingerprint(&raw);

    Ok(RemotePublicKey {
        key,
        raw,
        fingerprint,
    })
}

/// Leitet den gemeinsamen symmetrischen Schluessel ab (ECDH)
///
/// Das DH-Ergebnis (x-Koordinate, 32 Bytes) wird direkt als
/// AES-256-GCM-Schluessel verwendet. `generation` startet bei 0 und wird
/// bei jeder Rotation inkrementiert.
pub fn derive_shared_key(
    local: &EcdhKeyPair,
    remote: &RemotePublicKey,
    generation: u64,
) -> CryptoResult<SymmetricKey> {
    let shared = diffie_hellman(local.secret_key.to_nonzero_scalar(), remote.key.as_affine());
    let bytes = shared.raw_secret_bytes().as_slice().to_vec();
    SymmetricKey::from_raw_bytes(bytes, generation)
}

/// Leitet eine beliebige Anzahl Bits aus dem DH-Geheimnis ab (HKDF-SHA256)
///
/// Fuer KDF-basierte Ableitungs-Varianten; `bits` muss ein Vielfaches von 8 sein.
pub fn derive_raw_bits(
    local: &EcdhKeyPair,
    remote: &RemotePublicKey,
    bits: usize,
) -> CryptoResult<Vec<u8>> {
    if bits == 0 || bits % 8 != 0 {
        return Err(CryptoError::KeyDerivation(format!(
            "Bit-Anzahl muss ein positives Vielfaches von 8 sein, erhalten {bits}"
        )));
    }

    let shared = diffie_hellman(local.secret_key.to_nonzero_scalar(), remote.key.as_affine());

    let hk = hkdf::Hkdf::<Sha256>::new(None, shared.raw_secret_bytes().as_slice());
    let mut okm = vec![0u8; bits / 8];
    hk.expand(b"sealcall-raw-bits-v1", &mut okm)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(okm)
}

/// Vergleicht zwei Fingerprints in konstanter Zeit
///
/// XOR-Akkumulation ohne Early-Exit, um Timing-Seitenkanaele zu vermeiden.
pub fn fingerprints_match(a: &Fingerprint, b: &Fingerprint) -> bool {
    let a = a.as_str().as_bytes();
    let b = b.as_str().as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for i in 0..a.len() {
        acc |= a[i] ^ b[i];
    }
    acc == 0
}

/// Kurzer Verifikations-Code fuer den Out-of-Band-Abgleich
///
/// Die ersten 12 Hex-Zeichen des Fingerprints werden als Zahl interpretiert
/// und als drei 3er-Gruppen formatiert: `"123-456-789"`.
pub fn short_verification_code(fingerprint: &Fingerprint) -> String {
    // 12 Hex-Zeichen passen immer in ein u64
    let prefix = &fingerprint.as_str()[..12];
    let value = u64::from_str_radix(prefix, 16).unwrap_or(0);
    let code = value % 1_000_000_000;
    let digits = format!("{code:09}");
    format!("{}-{}-{}", &digits[0..3], &digits[3..6], &digits[6..9])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_pair_generieren() {
        let pair = EcdhKeyPair::generate().unwrap();
        assert_eq!(pair.public_key_bytes().len(), 65);
        assert_eq!(pair.public_key_bytes()[0], 0x04);
        assert_eq!(pair.fingerprint.as_str().len(), 64);
    }

    #[test]
    fn fingerprint_ist_deterministisch() {
        let pair = EcdhKeyPair::generate().unwrap();
        let f1 = compute_fingerprint(pair.public_key_bytes());
        let f2 = compute_fingerprint(pair.public_key_bytes());
        assert_eq!(f1, f2);
        assert_eq!(f1, pair.fingerprint);
    }

    #[test]
    fn import_berechnet_gleichen_fingerprint() {
        let pair = EcdhKeyPair::generate().unwrap();
        let imported = import_public_key(&pair.public_key_base64).unwrap();
        assert_eq!(imported.fingerprint, pair.fingerprint);
        assert_eq!(imported.raw_bytes(), pair.public_key_bytes());
    }

    #[test]
    fn import_lehnt_falsche_laenge_ab() {
        let kurz = Base64String::from_bytes(&[0x04; 10]);
        assert!(import_public_key(&kurz).is_err());
    }

    #[test]
    fn import_lehnt_komprimiertes_format_ab() {
        let mut bytes = vec![0x02u8];
        bytes.extend_from_slice(&[0u8; 64]);
        let encoded = Base64String::from_bytes(&bytes);
        assert!(import_public_key(&encoded).is_err());
    }

    #[test]
    fn beide_seiten_leiten_gleichen_schluessel_ab() {
        let alice = EcdhKeyPair::generate().unwrap();
        let bob = EcdhKeyPair::generate().unwrap();

        let bob_pub = import_public_key(&bob.public_key_base64).unwrap();
        let alice_pub = import_public_key(&alice.public_key_base64).unwrap();

        let key_a = derive_shared_key(&alice, &bob_pub, 0).unwrap();
        let key_b = derive_shared_key(&bob, &alice_pub, 0).unwrap();

        assert_eq!(key_a.key_bytes.as_bytes(), key_b.key_bytes.as_bytes());
        assert_eq!(key_a.key_bytes.len(), 32);
    }

    #[test]
    fn derive_raw_bits_beide_seiten_gleich() {
        let alice = EcdhKeyPair::generate().unwrap();
        let bob = EcdhKeyPair::generate().unwrap();

        let bob_pub = import_public_key(&bob.public_key_base64).unwrap();
        let alice_pub = import_public_key(&alice.public_key_base64).unwrap();

        let bits_a = derive_raw_bits(&alice, &bob_pub, 512).unwrap();
        let bits_b = derive_raw_bits(&bob, &alice_pub, 512).unwrap();
        assert_eq!(bits_a, bits_b);
        assert_eq!(bits_a.len(), 64);
    }

    #[test]
    fn derive_raw_bits_lehnt_krumme_bits_ab() {
        let alice = EcdhKeyPair::generate().unwrap();
        let bob = EcdhKeyPair::generate().unwrap();
        let bob_pub = import_public_key(&bob.public_key_base64).unwrap();

        assert!(derive_raw_bits(&alice, &bob_pub, 7).is_err());
        assert!(derive_raw_bits(&alice, &bob_pub, 0).is_err());
    }

    #[test]
    fn fingerprints_match_konstante_zeit() {
        let pair = EcdhKeyPair::generate().unwrap();
        let other = EcdhKeyPair::generate().unwrap();

        assert!(fingerprints_match(&pair.fingerprint, &pair.fingerprint));
        assert!(!fingerprints_match(&pair.fingerprint, &other.fingerprint));
    }

    #[test]
    fn verification_code_format() {
        let f = Fingerprint::new(
            "00000000000000000000000000000000000000000000000000000000000000ff",
        )
        .unwrap();
        let code = short_verification_code(&f);
        assert_eq!(code.len(), 11);
        assert_eq!(code, "000-000-000");

        let pair = EcdhKeyPair::generate().unwrap();
        let code = short_verification_code(&pair.fingerprint);
        assert_eq!(code.len(), 11);
        assert_eq!(&code[3..4], "-");
        assert_eq!(&code[7..8], "-");
    }

    #[test]
    fn verification_code_deterministisch() {
        let pair = EcdhKeyPair::generate().unwrap();
        assert_eq!(
            short_verification_code(&pair.fingerprint),
            short_verification_code(&pair.fingerprint)
        );
    }
}
