//! Wire encoding of the final ciphertext.
//!
//! The only persisted representation is an ASCII string of three standard
//! base64 segments joined by dots: `base64(iv).base64(ciphertext).base64(mac)`
//! with a 12-byte IV and a 16-byte MAC. Intermediate layer outputs are raw
//! binary and never leave the engine.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::config::{IV_SIZE, TAG_SIZE};
use crate::error::{EngineError, Result};

/// Decoded form of the wire ciphertext.
pub struct Envelope {
    pub iv: [u8; IV_SIZE],
    pub ciphertext: Vec<u8>,
    pub mac: [u8; TAG_SIZE],
}

impl Envelope {
    /// Encodes the envelope into the dot-separated wire string.
    pub fn encode(&self) -> String {
        format!(
            "{}.{}.{}",
            BASE64.encode(self.iv),
            BASE64.encode(&self.ciphertext),
            BASE64.encode(self.mac)
        )
    }

    /// Parses a wire string, failing with [`EngineError::MalformedCiphertext`]
    /// on anything but exactly three base64 segments with the right decoded
    /// IV and MAC lengths.
    pub fn parse(wire: &str) -> Result<Self> {
        let parts: Vec<&str> = wire.split('.').collect();
        if parts.len() != 3 {
            return Err(EngineError::MalformedCiphertext(format!(
                "expected 3 dot-separated segments, found {}",
                parts.len()
            )));
        }

        let decode = |segment: &str, name: &str| {
            BASE64
                .decode(segment)
                .map_err(|_| EngineError::MalformedCiphertext(format!("{name} segment is not valid base64")))
        };

        let iv_bytes = decode(parts[0], "iv")?;
        let ciphertext = decode(parts[1], "ciphertext")?;
        let mac_bytes = decode(parts[2], "mac")?;

        let iv: [u8; IV_SIZE] = iv_bytes
            .try_into()
            .map_err(|_| EngineError::MalformedCiphertext(format!("iv must be {IV_SIZE} bytes")))?;
        let mac: [u8; TAG_SIZE] = mac_bytes
            .try_into()
            .map_err(|_| EngineError::MalformedCiphertext(format!("mac must be {TAG_SIZE} bytes")))?;

        Ok(Self { iv, ciphertext, mac })
    }
}

#[cfg(test)]
mod tests {
    use base64::Engine as _;

    use super::*;

    fn sample() -> Envelope {
        Envelope { iv: [1u8; IV_SIZE], ciphertext: vec![2, 3, 4, 5], mac: [6u8; TAG_SIZE] }
    }

    #[test]
    fn test_roundtrip() {
        let wire = sample().encode();
        let parsed = Envelope::parse(&wire).unwrap();
        assert_eq!(parsed.iv, [1u8; IV_SIZE]);
        assert_eq!(parsed.ciphertext, vec![2, 3, 4, 5]);
        assert_eq!(parsed.mac, [6u8; TAG_SIZE]);
    }

    #[test]
    fn test_wire_is_ascii_with_two_dots() {
        let wire = sample().encode();
        assert!(wire.is_ascii());
        assert_eq!(wire.matches('.').count(), 2);
    }

    #[test]
    fn test_rejects_wrong_segment_count() {
        assert!(matches!(Envelope::parse("AAAA.BBBB"), Err(EngineError::MalformedCiphertext(_))));
        assert!(matches!(
            Envelope::parse("AAAA.BBBB.CCCC.DDDD"),
            Err(EngineError::MalformedCiphertext(_))
        ));
        assert!(matches!(Envelope::parse(""), Err(EngineError::MalformedCiphertext(_))));
    }

    #[test]
    fn test_rejects_invalid_base64() {
        let wire = sample().encode();
        let broken = wire.replacen('.', ".!", 1);
        assert!(matches!(Envelope::parse(&broken), Err(EngineError::MalformedCiphertext(_))));
    }

    #[test]
    fn test_rejects_wrong_iv_length() {
        let envelope = sample();
        let wire = format!(
            "{}.{}.{}",
            base64::engine::general_purpose::STANDARD.encode([1u8; IV_SIZE - 1]),
            base64::engine::general_purpose::STANDARD.encode(&envelope.ciphertext),
            base64::engine::general_purpose::STANDARD.encode(envelope.mac)
        );
        assert!(matches!(Envelope::parse(&wire), Err(EngineError::MalformedCiphertext(_))));
    }

    #[test]
    fn test_rejects_wrong_mac_length() {
        let envelope = sample();
        let wire = format!(
            "{}.{}.{}",
            base64::engine::general_purpose::STANDARD.encode(envelope.iv),
            base64::engine::general_purpose::STANDARD.encode(&envelope.ciphertext),
            base64::engine::general_purpose::STANDARD.encode([6u8; TAG_SIZE + 1])
        );
        assert!(matches!(Envelope::parse(&wire), Err(EngineError::MalformedCiphertext(_))));
    }
}
