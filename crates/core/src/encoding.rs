//! Puffer- und Kodierungs-Utilities
//!
//! Framing fuer verschluesselte Frames:
//! ```text
//! [iv(12)] [ciphertext] [auth_tag(16)]
//! ```
//! `extract` prueft nur die Laenge, nie den Auth-Tag - das passiert
//! erst bei der Entschluesselung.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{CoreError, CoreResult};

/// Laenge des Initialisierungsvektors (AES-GCM Standard)
pub const IV_LEN: usize = 12;
/// Laenge des Authentication-Tags (128 Bit)
pub const TAG_LEN: usize = 16;
/// Minimale Laenge eines gueltigen Frames: IV + Tag + 1 Byte Ciphertext
pub const MIN_FRAME_LEN: usize = IV_LEN + TAG_LEN + 1;

/// Erzeugt `n` kryptografisch sichere Zufalls-Bytes
pub fn random_bytes(n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    OsRng.fill_bytes(&mut buf);
    buf
}

/// Haengt IV und Ciphertext zu einem Frame zusammen: `iv || ciphertext`
pub fn combine(iv: &[u8], ciphertext: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(iv.len() + ciphertext.len());
    out.extend_from_slice(iv);
    out.extend_from_slice(ciphertext);
    out
}

/// Zerlegt einen Frame in `(iv, ciphertext)`
///
/// Total: ein zu kurzer Puffer ergibt einen Fehler, nie eine Panik.
pub fn extract(combined: &[u8], iv_len: usize) -> CoreResult<(Vec<u8>, Vec<u8>)> {
    if combined.len() < iv_len {
        return Err(CoreError::PufferZuKurz {
            mindestens: iv_len,
            erhalten: combined.len(),
        });
    }
    let (iv, ciphertext) = combined.split_at(iv_len);
    Ok((iv.to_vec(), ciphertext.to_vec()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_bytes_laenge_und_varianz() {
        let a = random_bytes(32);
        let b = random_bytes(32);
        assert_eq!(a.len(), 32);
        // Zwei Aufrufe duerfen praktisch nie identisch sein
        assert_ne!(a, b);
    }

    #[test]
    fn combine_und_extract_roundtrip() {
        let iv = random_bytes(IV_LEN);
        let ct = b"ciphertext-daten".to_vec();

        let frame = combine(&iv, &ct);
        assert_eq!(frame.len(), IV_LEN + ct.len());

        let (iv2, ct2) = extract(&frame, IV_LEN).unwrap();
        assert_eq!(iv2, iv);
        assert_eq!(ct2, ct);
    }

    #[test]
    fn extract_zu_kurzer_puffer_ergibt_fehler() {
        let result = extract(&[1, 2, 3], IV_LEN);
        assert!(matches!(result, Err(CoreError::PufferZuKurz { .. })));
    }

    #[test]
    fn extract_exakt_iv_laenge() {
        let iv = random_bytes(IV_LEN);
        let (iv2, ct) = extract(&iv, IV_LEN).unwrap();
        assert_eq!(iv2, iv);
        assert!(ct.is_empty());
    }

    #[test]
    fn min_frame_len_konstante() {
        // 12 + 16 + 1: kuerzere Frames koennen kein echter Ciphertext sein
        assert_eq!(MIN_FRAME_LEN, 29);
    }
}
