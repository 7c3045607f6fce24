use rand::RngCore;
use subtle::ConstantTimeEq;

/// Amount of randomness in a download token. 32 bytes hex-encode to 64
/// characters.
pub const TOKEN_BYTES: usize = 32;

/// Generates a fresh high-entropy download token.
///
/// Tokens are generated once per completed job and are never derivable from
/// the job id; their validity is governed entirely by the job's status and
/// expiry.
pub fn generate() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Compares a client-provided token against the stored one in constant time,
/// so the comparison leaks no information about how much of the token was
/// right.
pub fn verify(provided: &str, expected: &str) -> bool {
    bool::from(provided.as_bytes().ct_eq(expected.as_bytes()))
}
