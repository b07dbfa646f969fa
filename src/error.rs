//! Engine error taxonomy.
//!
//! Every failure mode of the layered pipeline maps to exactly one variant.
//! All variants are terminal for the operation that produced them; only
//! [`EngineError::EngineNotReady`] is worth retrying, and only with a fresh
//! engine instance.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The nesting rule is not a valid non-negative integer, or exceeds the
    /// digit bound.
    #[error("invalid nesting rule: {0}")]
    InvalidRule(String),

    /// The rule's binary expansion defines more layers than allowed.
    #[error("nesting rule expands to {bits} layers, maximum is {max}")]
    TopologyTooLong { bits: usize, max: usize },

    /// The password-transform expression failed to parse or evaluate.
    #[error("password transform error: {0}")]
    TransformError(String),

    /// The wire ciphertext does not have the expected shape.
    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// The recovered bytes are not valid UTF-8.
    #[error("decrypted data is not valid UTF-8 text")]
    MalformedPlaintext,

    /// AEAD tag verification failed at some layer.
    ///
    /// Deliberately generic: wrong password, wrong rule, wrong auxiliary
    /// strings and a tampered ciphertext are indistinguishable, and the
    /// failing layer index is never reported.
    #[error("decryption failed: authentication error")]
    AuthenticationFailure,

    /// The cryptographic backend failed its startup self-test.
    #[error("encryption engine is not ready")]
    EngineNotReady,

    /// Unexpected failure inside the cryptographic backend.
    #[error("cryptographic backend failure: {0}")]
    Backend(String),

    /// A required request field is missing or empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

pub type Result<T> = std::result::Result<T, EngineError>;
