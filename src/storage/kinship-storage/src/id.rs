//! Record identifier generation.

use rand::{rngs::OsRng, RngCore};

/// Number of random bytes in an identifier.
const ID_BYTES: usize = 12;

/// Generates a random record identifier as 24 lowercase hex characters.
pub fn generate_id() -> String {
    let mut bytes = [0u8; ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex_encode(&bytes)
}

/// Returns true if `value` has the shape of an identifier produced by [`generate_id`].
pub fn is_valid_id(value: &str) -> bool {
    value.len() == ID_BYTES * 2
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        hex.push(HEX_CHARS[(byte >> 4) as usize] as char);
        hex.push(HEX_CHARS[(byte & 0x0F) as usize] as char);
    }
    hex
}
