//! Share-token minting
//!
//! Tokens are opaque bearer credentials granting read access to a
//! link-visibility dashboard without authentication. 160 bits of
//! entropy, hex encoded.

use rand::RngCore;

const TOKEN_BYTES: usize = 20;

/// Mint a fresh share token.
pub fn mint() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
