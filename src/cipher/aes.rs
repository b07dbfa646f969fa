use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};

use crate::config::{IV_SIZE, KEY_SIZE, TAG_SIZE};
use crate::error::{EngineError, Result};

/// AES-256-GCM inner layer.
///
/// Encryption output is `iv ‖ ciphertext ‖ tag`; decryption parses the same
/// framing back. Stateless over its inputs: the key and IV are never
/// mutated, and the caller owns zeroing them.
pub struct AesLayer {
    aead: Aes256Gcm,
}

impl AesLayer {
    pub fn new(key: &[u8; KEY_SIZE]) -> Self {
        let aead = Aes256Gcm::new_from_slice(key).expect("valid key size");
        Self { aead }
    }

    /// Encrypts one layer, prepending the IV to the ciphertext.
    pub fn encrypt(&self, plaintext: &[u8], iv: &[u8; IV_SIZE]) -> Result<Vec<u8>> {
        let nonce = Nonce::from_slice(iv);
        let ciphertext = self
            .aead
            .encrypt(nonce, plaintext)
            .map_err(|_| EngineError::Backend("AES-GCM encryption failed".into()))?;

        let mut result = Vec::with_capacity(IV_SIZE + ciphertext.len());
        result.extend_from_slice(iv);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    /// Decrypts one layer from `iv ‖ ciphertext ‖ tag` framing.
    ///
    /// Length and tag failures both surface as the generic authentication
    /// error; inner framing problems are indistinguishable from tampering.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let layer = AesLayer::new(&[7u8; KEY_SIZE]);
        let iv = [9u8; IV_SIZE];

        let ciphertext = layer.encrypt(b"Hello, World!", &iv).unwrap();
        assert_eq!(&ciphertext[..IV_SIZE], &iv);
        assert_eq!(ciphertext.len(), IV_SIZE + 13 + TAG_SIZE);

        let decrypted = layer.decrypt(&ciphertext).unwrap();
        assert_eq!(decrypted, b"Hello, World!");
    }

    #[test]
    fn test_deterministic_for_fixed_key_and_iv() {
        let layer = AesLayer::new(&[7u8; KEY_SIZE]);
        let iv = [9u8; IV_SIZE];

        let a = layer.encrypt(b"data", &iv).unwrap();
        let b = layer.encrypt(b"data", &iv).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_decrypt_too_short() {
        let layer = AesLayer::new(&[7u8; KEY_SIZE]);
        let result = layer.decrypt(&[0u8; IV_SIZE + TAG_SIZE - 1]);
        assert!(matches!(result, Err(EngineError::AuthenticationFailure)));
    }

    #[test]
    fn test_decrypt_tampered() {
        let layer = AesLayer::new(&[7u8; KEY_SIZE]);
        let mut ciphertext = layer.encrypt(b"Hello, World!", &[9u8; IV_SIZE]).unwrap();

        if let Some(last) = ciphertext.last_mut() {
            *last ^= 0x01;
        }

        assert!(matches!(layer.decrypt(&ciphertext), Err(EngineError::AuthenticationFailure)));
    }

    #[test]
    fn test_decrypt_wrong_key() {
        let layer = AesLayer::new(&[7u8; KEY_SIZE]);
        let ciphertext = layer.encrypt(b"Hello, World!", &[9u8; IV_SIZE]).unwrap();

        let other = AesLayer::new(&[8u8; KEY_SIZE]);
        assert!(matches!(other.decrypt(&ciphertext), Err(EngineError::AuthenticationFailure)));
    }
}
