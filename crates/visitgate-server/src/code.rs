//! Access code generation and validation.

use rand::RngExt;

use crate::error::AccessError;

/// Crockford base32: no `I`, `L`, `O` or `U`, so codes survive being read aloud.
const ALPHABET: &[u8] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Length of generated codes.
pub const CODE_LEN: usize = 10;

const MIN_SUPPLIED_LEN: usize = 4;
const MAX_SUPPLIED_LEN: usize = 64;

/// Generate a random access code.
pub fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..ALPHABET.len());
            ALPHABET[idx] as char
        })
        .collect()
}

/// Check a client-supplied code.
///
/// Codes travel in URL paths and QR payloads, so only ASCII alphanumerics,
/// `-` and `_` are accepted.
pub fn validate_code(code: &str) -> Result<(), AccessError> {
    if !(MIN_SUPPLIED_LEN..=MAX_SUPPLIED_LEN).contains(&code.len()) {
        return Err(AccessError::InvalidInput(format!(
            "access code must be {MIN_SUPPLIED_LEN}-{MAX_SUPPLIED_LEN} characters"
        )));
    }
    if !code
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(AccessError::InvalidInput(
            "access code may only contain letters, digits, '-' and '_'".into(),
        ));
    }
    Ok(())
}

/// Payload encoded into the access QR image.
pub fn qr_payload(code: &str) -> String {
    format!("visitgate:access:{code}")
}
