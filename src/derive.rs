//! Per-layer key and IV derivation.
//!
//! Two stages, both deterministic:
//!
//! 1. Stretch: PBKDF2-HMAC-SHA256 over the layer's effective password with
//!    `path` as salt, 100,000 iterations, 256-bit output.
//! 2. Expand: HKDF-SHA256 over the stretched key with `upper` as salt and
//!    `lower` as info, producing 44 bytes split into a 32-byte key and a
//!    12-byte IV.
//!
//! The auxiliary strings are identical for every layer; only the effective
//! password changes, which is what makes each layer's key independent.
//! Intermediate buffers are zeroized before returning, and the returned
//! [`LayerKeys`] zeroizes itself on drop.

use hkdf::Hkdf;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::{IV_SIZE, KEY_SIZE, PBKDF2_ITERATIONS};
use crate::types::AuxStrings;

/// Key material for a single layer. Lives only for one cipher call.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct LayerKeys {
    pub key: [u8; KEY_SIZE],
    pub iv: [u8; IV_SIZE],
}

/// Derives one layer's key and IV from its effective password and the
/// auxiliary strings.
///
/// Empty auxiliary strings are valid: they become an empty salt or info.
pub fn derive_layer_keys(effective_password: &[u8], aux: &AuxStrings) -> LayerKeys {
    let mut stretched = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(
        effective_password,
        aux.path.as_bytes(),
        PBKDF2_ITERATIONS,
        &mut stretched,
    );

    let hkdf = Hkdf::<Sha256>::new(Some(aux.upper.as_bytes()), &stretched);
    let mut okm = [0u8; KEY_SIZE + IV_SIZE];
    hkdf.expand(aux.lower.as_bytes(), &mut okm)
        .expect("44 bytes is a valid HKDF-SHA256 output length");

    stretched.zeroize();

    let mut key = [0u8; KEY_SIZE];
    let mut iv = [0u8; IV_SIZE];
    key.copy_from_slice(&okm[..KEY_SIZE]);
    iv.copy_from_slice(&okm[KEY_SIZE..]);
    okm.zeroize();

    LayerKeys { key, iv }
}
