//! ChaCha20-Poly1305 inner layer.

use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, KeyInit},
};

use crate::config::{IV_SIZE, KEY_SIZE, TAG_SIZE};
use crate::error::{EngineError, Result};

/// ChaCha20-Poly1305 (IETF, 96-bit nonce) inner layer.
///
/// Same `iv ‖ ciphertext ‖ mac` framing as the AES layer, no associated
/// data. The 16-byte Poly1305 mac is appended by the primitive.
pub struct ChachaLayer {
    aead: ChaCha20Poly1305,
}

impl ChachaLayer {
    pub fn new(key: &[u8; KEY_SIZE]) -> Self {
        let aead = ChaCha20Poly1305::new_from_slice(key).expect("valid key size");
        Self { aead }
    }

    /// Encrypts one layer, prepending the IV to the ciphertext.
    pub fn encrypt(&self, plaintext: &[u8], iv: &[u8; IV_SIZE]) -> Result<Vec<u8>> {
        let nonce = Nonce::from_slice(iv);
        let ciphertext = self
            .aead
            .encrypt(nonce, plaintext)
            .map_err(|_| EngineError::Backend("ChaCha20-Poly1305 encryption failed".into()))?;

        let mut result = Vec::with_capacity(IV_SIZE + ciphertext.len());
        result.extend_from_slice(iv);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    /// Decrypts one layer from `iv ‖ ciphertext ‖ mac` framing.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < IV_SIZE + TAG_SIZE {
            return Err(EngineError::AuthenticationFailure);
        }

        let (iv, encrypted) = data.split_at(IV_SIZE);
        let nonce = Nonce::from_slice(iv);

        self.aead
            .decrypt(nonce, encrypted)
            .map_err(|_| EngineError::AuthenticationFailure)
    }
}
