//! # sealcall-facade
//!
//! Einziger Einstiegspunkt fuer Aufrufer: buendelt Key Agreement, Signierung
//! und Frame-Verschluesselung hinter einer Fassade und aggregiert die
//! Readiness-Pruefung. Aufrufender Code fasst die Krypto-Module nie direkt an.
//!
//! Die Fassade ist eine explizit konstruierte, injizierte Instanz - kein
//! Prozess-Singleton. "Eine Fassade pro Prozess" bleibt Konvention des
//! Aufrufers.

pub mod readiness;

use std::sync::Arc;

use tracing::debug;

use sealcall_capability::{Detector, RuntimeFamily};
use sealcall_core::types::Base64String;
use sealcall_crypto::{
    agreement, cipher::PortableKey, signing, CipherConfig, CryptoResult, EcdhKeyPair,
    FrameCipher, RemotePublicKey, SigningKeyPair, SymmetricKey, TryDecryptOutcome, VerifyKey,
};

pub use readiness::{check_readiness, Blocker, Readiness, Warning};

/// Fassade ueber Agreement, Signierung und Cipher
pub struct CryptoFacade {
    detector: Arc<Detector>,
    cipher: FrameCipher,
}

impl CryptoFacade {
    /// Erstellt die Fassade; der Tag-Laengen-Quirk wird hier einmalig aus
    /// der Runtime-Familie abgeleitet (Konstruktionszeit, nie pro Aufruf)
    pub fn new(detector: Arc<Detector>) -> Self {
        let family = detector.family().family;
        let config = CipherConfig {
            // WebKit lehnt den expliziten Tag-Laengen-Parameter ab
            include_tag_length: family != RuntimeFamily::WebKit,
        };
        debug!(familie = %family, tag_laenge = config.include_tag_length, "CryptoFacade erstellt");
        Self {
            detector,
            cipher: FrameCipher::new(config),
        }
    }

    /// Aggregierte Readiness-Pruefung
    pub async fn check_readiness(&self) -> Readiness {
        check_readiness(&self.detector).await
    }

    pub fn detector(&self) -> &Arc<Detector> {
        &self.detector
    }

    pub fn cipher(&self) -> &FrameCipher {
        &self.cipher
    }

    // --- Key Agreement ---

    pub fn generate_key_pair(&self) -> CryptoResult<EcdhKeyPair> {
        EcdhKeyPair::generate()
    }

    pub fn import_public_key(&self, encoded: &Base64String) -> CryptoResult<RemotePublicKey> {
        agreement::import_public_key(encoded)
    }

    pub fn derive_shared_key(
        &self,
        local: &EcdhKeyPair,
        remote: &RemotePublicKey,
        generation: u64,
    ) -> CryptoResult<SymmetricKey> {
        agreement::derive_shared_key(local, remote, generation)
    }

    // --- Signierung ---

    pub fn generate_signing_pair(&self) -> CryptoResult<SigningKeyPair> {
        SigningKeyPair::generate()
    }

    pub fn sign(&self, pair: &SigningKeyPair, data: &[u8]) -> CryptoResult<Base64String> {
        signing::sign(pair, data)
    }

    pub fn verify(&self, key: &VerifyKey, data: &[u8], signature: &Base64String) -> bool {
        signing::verify(key, data, signature)
    }

    // --- Frame-Verschluesselung ---

    pub fn encrypt(&self, key: &SymmetricKey, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        self.cipher.encrypt(key, plaintext)
    }

    pub fn decrypt(&self, key: &SymmetricKey, combined: &[u8]) -> CryptoResult<Vec<u8>> {
        self.cipher.decrypt(key, combined)
    }

    pub fn try_decrypt(&self, key: Option<&SymmetricKey>, data: &[u8]) -> TryDecryptOutcome {
        self.cipher.try_decrypt(key, data)
    }

    // --- Schluessel-Export/-Import fuer Grenzuebertritte ---

    /// Rohe Schluessel-Bytes fuer den Worker-Transfer (Ownership wandert
    /// zum Aufrufer)
    pub fn export_key_raw(&self, key: &SymmetricKey) -> Vec<u8> {
        key.export_raw()
    }

    /// Portable Form fuer die Persistenz-Grenze
    pub fn export_key_portable(&self, key: &SymmetricKey) -> PortableKey {
        key.to_portable()
    }

    pub fn import_key_portable(&self, portable: &PortableKey) -> CryptoResult<SymmetricKey> {
        SymmetricKey::from_portable(portable)
    }
}

impl std::fmt::Debug for CryptoFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CryptoFacade {{ config: {:?} }}", self.cipher.config())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use sealcall_capability::MockRuntimeEnv;

    fn facade(env: MockRuntimeEnv) -> CryptoFacade {
        CryptoFacade::new(Arc::new(Detector::new(env.shared())))
    }

    #[test]
    fn webkit_bekommt_tag_laengen_quirk() {
        let f = facade(MockRuntimeEnv::webkit());
        assert!(!f.cipher().config().include_tag_length);

        let f = facade(MockRuntimeEnv::chromium());
        assert!(f.cipher().config().include_tag_length);
    }

    #[test]
    fn fassade_roundtrip_ohne_direkte_modul_nutzung() {
        let f = facade(MockRuntimeEnv::chromium());

        let alice = f.generate_key_pair().unwrap();
        let bob = f.generate_key_pair().unwrap();

        let bob_pub = f.import_public_key(&bob.public_key_base64).unwrap();
        let alice_pub = f.import_public_key(&alice.public_key_base64).unwrap();

        let key_a = f.derive_shared_key(&alice, &bob_pub, 0).unwrap();
        let key_b = f.derive_shared_key(&bob, &alice_pub, 0).unwrap();

        let frame = f.encrypt(&key_a, b"Fassaden-Test").unwrap();
        assert_eq!(f.decrypt(&key_b, &frame).unwrap(), b"Fassaden-Test");
    }

    #[test]
    fn fassade_signatur_passthrough() {
        let f = facade(MockRuntimeEnv::firefox());
        let pair = f.generate_signing_pair().unwrap();
        let sig = f.sign(&pair, b"Daten").unwrap();
        assert!(f.verify(&pair.verify_key(), b"Daten", &sig));
    }

    #[test]
    fn portabler_export_import() {
        let f = facade(MockRuntimeEnv::chromium());
        let alice = f.generate_key_pair().unwrap();
        let bob = f.generate_key_pair().unwrap();
        let bob_pub = f.import_public_key(&bob.public_key_base64).unwrap();
        let key = f.derive_shared_key(&alice, &bob_pub, 2).unwrap();

        let portable = f.export_key_portable(&key);
        let restored = f.import_key_portable(&portable).unwrap();
        assert_eq!(restored.key_bytes.as_bytes(), key.key_bytes.as_bytes());
        assert_eq!(restored.generation, 2);

        let raw = f.export_key_raw(&key);
        assert_eq!(raw, key.key_bytes.as_bytes());
    }
}
