//! Distinguished outer ChaCha20-Poly1305 layer.
//!
//! The outer layer is always ChaCha20-Poly1305 and is the only layer whose
//! output leaves the engine: instead of raw `iv ‖ ciphertext ‖ mac` bytes it
//! produces the textual wire format `base64(iv).base64(ciphertext).base64(mac)`.
//! On decryption the IV comes from the wire string, not from key derivation.

use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, KeyInit},
};

use crate::config::{IV_SIZE, KEY_SIZE, TAG_SIZE};
use crate::error::{EngineError, Result};
use crate::wire::Envelope;

pub struct OuterLayer {
    aead: ChaCha20Poly1305,
}

impl OuterLayer {
    pub fn new(key: &[u8; KEY_SIZE]) -> Self {
        let aead = ChaCha20Poly1305::new_from_slice(key).expect("valid key size");
        Self { aead }
    }

    /// Encrypts the final layer and encodes it into the wire string.
    pub fn encrypt(&self, plaintext: &[u8], iv: &[u8; IV_SIZE]) -> Result<String> {
        let nonce = Nonce::from_slice(iv);
        let mut combined = self
            .aead
            .encrypt(nonce, plaintext)
            .map_err(|_| EngineError::Backend("ChaCha20-Poly1305 encryption failed".into()))?;

        // The primitive appends the 16-byte mac; the wire format carries it
        // as its own segment.
        let mac_bytes = combined.split_off(combined.len() - TAG_SIZE);
        let mac: [u8; TAG_SIZE] = mac_bytes
            .try_into()
            .map_err(|_| EngineError::Backend("unexpected mac length".into()))?;

        Ok(Envelope { iv: *iv, ciphertext: combined, mac }.encode())
    }

    /// Decodes the wire string and decrypts the outer layer.
    ///
    /// Shape problems (segment count, base64, IV/mac lengths) surface as
    /// [`EngineError::MalformedCiphertext`]; a well-formed envelope that
    /// fails verification surfaces as [`EngineError::AuthenticationFailure`].
    pub fn decrypt(&self, wire: &str) -> Result<Vec<u8>> {
        let envelope = Envelope::parse(wire)?;

        let mut combined = envelope.ciphertext;
        combined.extend_from_slice(&envelope.mac);

        let nonce = Nonce::from_slice(&envelope.iv);
        self.aead
            .decrypt(nonce, combined.as_slice())
            .map_err(|_| EngineError::AuthenticationFailure)
    }
}
