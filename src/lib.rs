//! Nestlock - layered authenticated text encryption.
//!
//! Encrypts text through a variable-length chain of independently keyed
//! AEAD layers:
//! - a nesting rule's binary expansion selects AES-256-GCM or
//!   ChaCha20-Poly1305 per layer
//! - a caller-supplied transform diversifies the password for every layer
//! - PBKDF2 + HKDF derive a fresh key and IV per layer
//! - a distinguished outer ChaCha20-Poly1305 layer emits the dot-separated
//!   base64 wire format

pub mod app;
pub mod cipher;
pub mod config;
pub mod derive;
pub mod engine;
pub mod error;
pub mod secret;
pub mod topology;
pub mod transform;
pub mod types;
pub mod ui;
pub mod wire;
pub mod worker;
