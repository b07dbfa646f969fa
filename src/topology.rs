//! Layer-topology derivation.
//!
//! The nesting rule is a decimal string of up to 1000 digits. Its value's
//! binary expansion, most significant bit first, selects one inner cipher
//! per bit: `0` is AES-256-GCM, `1` is ChaCha20-Poly1305. A rule of zero
//! still yields a single `0` bit, so there is always at least one inner
//! layer. The distinguished outer layer is not part of the topology; it is
//! always ChaCha20-Poly1305.

use num_bigint::BigUint;

use crate::config::{MAX_LAYERS, MAX_RULE_DIGITS};
use crate::error::{EngineError, Result};

/// Cipher selected for one inner layer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LayerCipher {
    /// AES-256-GCM, chosen by a `0` bit.
    Aes,
    /// ChaCha20-Poly1305, chosen by a `1` bit.
    Chacha,
}

/// Derives the ordered inner-layer cipher sequence from a nesting rule.
///
/// Pure and deterministic: the same rule always yields the same sequence.
/// Fails with [`EngineError::InvalidRule`] on non-numeric or oversized
/// input, and with [`EngineError::TopologyTooLong`] when the binary
/// expansion defines more than [`MAX_LAYERS`] layers.
pub fn derive_topology(rule: &str) -> Result<Vec<LayerCipher>> {
    if rule.is_empty() {
        return Err(EngineError::InvalidRule("rule is empty".into()));
    }

    // Reject signs, whitespace and radix prefixes up front; BigUint parsing
    // is more permissive than the rule grammar allows.
    if !rule.bytes().all(|b| b.is_ascii_digit()) {
        return Err(EngineError::InvalidRule(format!(
            "{rule:?} is not a non-negative integer"
        )));
    }

    if rule.len() > MAX_RULE_DIGITS {
        return Err(EngineError::InvalidRule(format!(
            "rule has {} digits, maximum is {MAX_RULE_DIGITS}",
            rule.len()
        )));
    }

    let seed = BigUint::parse_bytes(rule.as_bytes(), 10)
        .ok_or_else(|| EngineError::InvalidRule(format!("{rule:?} is not a valid integer")))?;

    // `to_str_radix` prints zero as "0", which gives the required
    // single-layer topology for a zero rule.
    let bits = seed.to_str_radix(2);
    if bits.len() > MAX_LAYERS {
        return Err(EngineError::TopologyTooLong { bits: bits.len(), max: MAX_LAYERS });
    }

    Ok(bits
        .bytes()
        .map(|b| if b == b'0' { LayerCipher::Aes } else { LayerCipher::Chacha })
        .collect())
}
