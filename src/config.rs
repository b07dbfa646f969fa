//! Global configuration constants.
//!
//! All cryptographic parameters and input-validation bounds used by the
//! engine live here. The values are part of the wire contract: changing any
//! of them makes previously produced ciphertexts undecryptable.

/// Application name used in user-facing output.
pub const APP_NAME: &str = "nestlock";

// === Cryptographic parameters ===

/// Size of symmetric keys in bytes.
///
/// 32 bytes (256 bits) for both AES-256-GCM and ChaCha20-Poly1305.
pub const KEY_SIZE: usize = 32;

/// Size of AEAD nonces in bytes.
///
/// 12 bytes (96 bits) is the standard nonce size for AES-GCM and the IETF
/// variant of ChaCha20-Poly1305. Every layer derives a fresh nonce from the
/// key-derivation step, so nonces are never reused under the same key.
pub const IV_SIZE: usize = 12;

/// Size of the GCM / Poly1305 authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// PBKDF2-HMAC-SHA256 iteration count for the password-stretch stage.
///
/// Each layer performs a full stretch over its transformed password, so the
/// total work factor scales with the number of layers.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

// === Input-validation bounds ===

/// Maximum number of decimal digits accepted in a nesting-rule string.
pub const MAX_RULE_DIGITS: usize = 1000;

/// Maximum number of inner layers a rule may expand to.
///
/// The binary expansion of the rule defines one layer per bit; anything
/// past this bound is rejected before any key derivation starts.
pub const MAX_LAYERS: usize = 100;
