//! # sealcall-crypto
//!
//! Kryptografie-Kern fuer Sealcall: Key Agreement, Signierung und
//! symmetrische Frame-Verschluesselung.
//!
//! ## Module
//! - `agreement` - ECDH auf P-256 (ephemere Paare, Shared Key, Fingerprints)
//! - `signing` - ECDSA auf P-256 (Authentisierung der Key-Exchange-Nachrichten)
//! - `cipher` - AES-256-GCM Frame-Verschluesselung (`iv || ciphertext || tag`)
//! - `error` - Fehlertypen

pub mod agreement;
pub mod cipher;
pub mod error;
pub mod signing;

// Bequeme Re-Exports
pub use error::{CryptoError, CryptoResult};

pub use agreement::{
    compute_fingerprint, derive_raw_bits, derive_shared_key, fingerprints_match,
    import_public_key, short_verification_code, EcdhKeyPair, RemotePublicKey,
};
pub use cipher::{CipherConfig, FrameCipher, PortableKey, SymmetricKey, TryDecryptOutcome};
pub use signing::{
    exchange_payload, sign, sign_exchange_payload, sign_object, verify, verify_exchange_payload,
    verify_object_signature, SigningKeyPair, VerifyKey,
};
