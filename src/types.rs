//! Common type definitions for the layered encryption engine.
//!
//! - [`Action`]: distinguishes encryption from decryption requests
//! - [`AuxStrings`]: the three opaque salt/info strings from the caller
//! - [`Request`]: one unit of work submitted to the worker
//! - [`Notification`]: progress and terminal messages produced per request

use std::fmt::{Display, Formatter, Result};

use crate::error::EngineError;
use crate::secret::Secret;

/// The operation a request asks for.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    Encrypt,
    Decrypt,

    /// Alias for [`Action::Decrypt`]: runs the full decryption pipeline but
    /// is only interested in whether it succeeds.
    Verify,
}

impl Action {
    /// Returns the action name used in notifications and logs.
    #[inline]
    pub fn label(self) -> &'static str {
        match self {
            Self::Encrypt => "encrypt",
            Self::Decrypt => "decrypt",
            Self::Verify => "verify",
        }
    }

    /// Whether this action consumes ciphertext rather than plaintext.
    #[inline]
    pub fn takes_ciphertext(self) -> bool {
        matches!(self, Self::Decrypt | Self::Verify)
    }
}

impl Display for Action {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_str(self.label())
    }
}

/// The three auxiliary strings used as key-derivation salt and info.
///
/// Produced by an external collaborator; the engine treats them as opaque
/// UTF-8. Empty strings are valid (empty salt/info), so there is no
/// validation here beyond presence of the struct itself.
#[derive(Clone, Default, Debug)]
pub struct AuxStrings {
    /// PBKDF2 salt for every layer.
    pub path: String,
    /// HKDF salt for every layer.
    pub upper: String,
    /// HKDF info for every layer.
    pub lower: String,
}

impl AuxStrings {
    pub fn new(path: &str, upper: &str, lower: &str) -> Self {
        Self { path: path.to_owned(), upper: upper.to_owned(), lower: lower.to_owned() }
    }
}

/// One unit of work submitted to the [`crate::worker::Worker`].
pub struct Request {
    pub action: Action,

    /// Plaintext for encrypt, wire ciphertext for decrypt/verify.
    pub payload: String,

    pub password: Secret,

    /// Nesting rule: decimal seed of the layer topology.
    pub rule: String,

    /// Password-transform expression over `b` (byte) and `i` (round).
    pub transform: String,

    pub aux: AuxStrings,
}

impl Request {
    /// Checks that every field required for the action is present.
    ///
    /// Runs before any cryptographic work. Auxiliary strings are
    /// deliberately not checked: empty salt/info is a valid configuration.
    pub fn validate(&self) -> std::result::Result<(), EngineError> {
        if self.payload.is_empty() {
            let field = if self.action.takes_ciphertext() { "ciphertext" } else { "plaintext" };
            return Err(EngineError::MissingField(field));
        }

        if self.password.expose_secret().is_empty() {
            return Err(EngineError::MissingField("password"));
        }

        if self.rule.is_empty() {
            return Err(EngineError::MissingField("rule"));
        }

        if self.transform.is_empty() {
            return Err(EngineError::MissingField("transform"));
        }

        Ok(())
    }
}

/// A message produced while serving one request.
///
/// Each request yields zero or more `Progress` notifications followed by
/// exactly one `Success` or `Error`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    Progress {
        action: &'static str,
        current_step: usize,
        total_steps: usize,
    },

    Success {
        action: &'static str,
        result: String,
    },

    Error {
        action: &'static str,
        error: String,
    },
}

impl Notification {
    pub fn progress(action: Action, current_step: usize, total_steps: usize) -> Self {
        Self::Progress { action: action.label(), current_step, total_steps }
    }

    pub fn success(action: Action, result: String) -> Self {
        Self::Success { action: action.label(), result }
    }

    pub fn error(action: Action, error: &EngineError) -> Self {
        Self::Error { action: action.label(), error: error.to_string() }
    }
}
