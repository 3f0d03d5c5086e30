//! Byte-pair hex codec for device identifiers.
//!
//! Beacons advertise the UTF-8 bytes of a name as uppercase hex pairs
//! (`"Jo"` → `"4A6F"`). Provisioning uses the same encoding to assign a new
//! employee's identifier.

use thiserror::Error;

use crate::error::AttendanceResult;
use crate::types::ValidationError;

/// Highest numeric suffix tried when the plain encoded name is taken.
const MAX_NAME_SUFFIX: u32 = 10;

/// Reasons an identifier cannot be decoded into text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("identifier is empty")]
    Empty,
    #[error("identifier has odd length {len}")]
    OddLength { len: usize },
    #[error("invalid hex digit at position {position}")]
    InvalidDigit { position: usize },
    #[error("decoded bytes are not valid UTF-8")]
    InvalidUtf8,
}

/// Encodes text as uppercase byte-pair hex.
pub fn encode_identifier(text: &str) -> String {
    hex::encode_upper(text)
}

/// Decodes byte-pair hex (either case) back into text.
pub fn decode_identifier(identifier: &str) -> Result<String, DecodeError> {
    if identifier.is_empty() {
        return Err(DecodeError::Empty);
    }
    let bytes = hex::decode(identifier).map_err(|err| match err {
        hex::FromHexError::InvalidHexCharacter { index, .. } => {
            DecodeError::InvalidDigit { position: index }
        }
        hex::FromHexError::OddLength | hex::FromHexError::InvalidStringLength => {
            DecodeError::OddLength {
                len: identifier.len(),
            }
        }
    })?;
    String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)
}

/// Picks the identifier for a newly provisioned employee.
///
/// An explicit identifier is uppercased and must be free. Otherwise the
/// encoded name is used, then the encoded name suffixed with `" 2"` through
/// `" 10"`. `is_taken` reports whether a candidate is already assigned.
pub fn provision_identifier(
    name: &str,
    explicit: Option<&str>,
    mut is_taken: impl FnMut(&str) -> AttendanceResult<bool>,
) -> AttendanceResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::Empty { field: "name" }.into());
    }

    if let Some(explicit) = explicit.map(str::trim).filter(|s| !s.is_empty()) {
        let candidate = explicit.to_ascii_uppercase();
        if is_taken(&candidate)? {
            return Err(ValidationError::IdentifierTaken {
                identifier: candidate,
            }
            .into());
        }
        return Ok(candidate);
    }

    let base = encode_identifier(name);
    if !is_taken(&base)? {
        return Ok(base);
    }
    for suffix in 2..=MAX_NAME_SUFFIX {
        let candidate = encode_identifier(&format!("{name} {suffix}"));
        if !is_taken(&candidate)? {
            return Ok(candidate);
        }
    }
    Err(ValidationError::NoUniqueIdentifier {
        name: name.to_string(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::error::AttendanceError;

    #[test]
    fn encodes_uppercase_pairs() {
        assert_eq!(encode_identifier("Jo"), "4A6F");
        assert_eq!(encode_identifier("Ana Ruiz"), "416E61205275697A");
    }

    #[test]
    fn decoding_reverses_encoding() {
        for text in ["Jo", "Ana Ruiz", "Zoë Ångström", "李雷", "a-b_c 9"] {
            let encoded = encode_identifier(text);
            assert_eq!(decode_identifier(&encoded).unwrap(), text);
            assert_eq!(
                decode_identifier(&encoded.to_ascii_lowercase()).unwrap(),
                text
            );
        }
    }

    #[test]
    fn rejects_undecodable_input() {
        assert_eq!(decode_identifier(""), Err(DecodeError::Empty));
        assert_eq!(
            decode_identifier("4A6"),
            Err(DecodeError::OddLength { len: 3 })
        );
        assert_eq!(
            decode_identifier("4AZ6"),
            Err(DecodeError::InvalidDigit { position: 2 })
        );
        assert_eq!(
            decode_identifier("ZZ"),
            Err(DecodeError::InvalidDigit { position: 0 })
        );
        assert_eq!(decode_identifier("FFFE"), Err(DecodeError::InvalidUtf8));
    }

    fn validation(err: AttendanceError) -> ValidationError {
        match err {
            AttendanceError::Validation(inner) => inner,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn provisioning_prefers_explicit_identifier() {
        let result = provision_identifier("Jo", Some("beac0n"), |_| Ok(false));
        assert_eq!(result.unwrap(), "BEAC0N");
    }

    #[test]
    fn provisioning_rejects_taken_explicit_identifier() {
        let taken: HashSet<String> = ["BEAC0N".to_string()].into();
        let err = provision_identifier("Jo", Some("beac0n"), |c| Ok(taken.contains(c)))
            .unwrap_err();
        assert_eq!(
            validation(err),
            ValidationError::IdentifierTaken {
                identifier: "BEAC0N".to_string()
            }
        );
    }

    #[test]
    fn provisioning_suffixes_taken_names() {
        let taken: HashSet<String> = [encode_identifier("Jo"), encode_identifier("Jo 2")].into();
        let result = provision_identifier("Jo", None, |c| Ok(taken.contains(c)));
        assert_eq!(result.unwrap(), encode_identifier("Jo 3"));
    }

    #[test]
    fn provisioning_gives_up_after_last_suffix() {
        let err = provision_identifier("Jo", None, |_| Ok(true)).unwrap_err();
        assert_eq!(
            validation(err),
            ValidationError::NoUniqueIdentifier {
                name: "Jo".to_string()
            }
        );
    }

    #[test]
    fn provisioning_propagates_lookup_errors() {
        let err = provision_identifier("Jo", None, |_| {
            Err(AttendanceError::storage(std::io::Error::other("disk full")))
        })
        .unwrap_err();
        assert!(matches!(err, AttendanceError::Storage(_)));
    }
}
