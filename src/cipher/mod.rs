//! Cipher adapters for the layered pipeline.
//!
//! Two inner layers ([`aes::AesLayer`], [`chacha::ChachaLayer`]) with raw
//! `iv ‖ ciphertext ‖ tag` framing, plus the distinguished
//! [`outer::OuterLayer`] that produces the textual wire format.

pub mod aes;
pub mod chacha;
pub mod outer;

pub use outer::OuterLayer;

use crate::derive::LayerKeys;
use crate::error::Result;
use crate::topology::LayerCipher;

/// Applies the selected inner cipher to one layer of plaintext.
pub fn encrypt_inner(cipher: LayerCipher, plaintext: &[u8], keys: &LayerKeys) -> Result<Vec<u8>> {
    match cipher {
        LayerCipher::Aes => aes::AesLayer::new(&keys.key).encrypt(plaintext, &keys.iv),
        LayerCipher::Chacha => chacha::ChachaLayer::new(&keys.key).encrypt(plaintext, &keys.iv),
    }
}

/// Inverts the selected inner cipher for one layer.
///
/// The IV travels inside `data`, so only the key half of `keys` is used.
pub fn decrypt_inner(cipher: LayerCipher, data: &[u8], keys: &LayerKeys) -> Result<Vec<u8>> {
    match cipher {
        LayerCipher::Aes => aes::AesLayer::new(&keys.key).decrypt(data),
        LayerCipher::Chacha => chacha::ChachaLayer::new(&keys.key).decrypt(data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IV_SIZE, KEY_SIZE};

    fn keys() -> LayerKeys {
        LayerKeys { key: [42u8; KEY_SIZE], iv: [7u8; IV_SIZE] }
    }

    #[test]
    fn test_dispatch_roundtrip() {
        for cipher in [LayerCipher::Aes, LayerCipher::Chacha] {
            let keys = keys();
            let ciphertext = encrypt_inner(cipher, b"layer data", &keys).unwrap();
            let plaintext = decrypt_inner(cipher, &ciphertext, &keys).unwrap();
            assert_eq!(plaintext, b"layer data");
        }
    }

    #[test]
    fn test_cross_cipher_decrypt_fails() {
        let keys = keys();
        let ciphertext = encrypt_inner(LayerCipher::Aes, b"layer data", &keys).unwrap();
        assert!(decrypt_inner(LayerCipher::Chacha, &ciphertext, &keys).is_err());
    }
}
