//! PBKDF2-HMAC-SHA1 key derivation (RFC 2898).
//!
//! The ZIP AES scheme stretches the password and per-entry salt into
//! `key_len + mac_key_len + 2` bytes of key material with a fixed 1000
//! iterations; the trailing 2 bytes are the password verifier.

use crate::sha1::{HmacSha1, SHA1_DIGEST_SIZE};

/// Derive `dk_len` bytes from `password` and `salt`.
pub fn pbkdf2_hmac_sha1(password: &[u8], salt: &[u8], iterations: u32, dk_len: usize) -> Vec<u8> {
    let blocks = dk_len.div_ceil(SHA1_DIGEST_SIZE);
    let mut dk = Vec::with_capacity(blocks * SHA1_DIGEST_SIZE);

    for block_index in 1..=blocks as u32 {
        // U_1 = PRF(password, salt || INT(i))
        let mut mac = HmacSha1::new(password);
        mac.update(salt);
        mac.update(&block_index.to_be_bytes());
        let mut u = mac.finalize();
        let mut result = u;

        // U_2 .. U_c, XOR-folded
        for _ in 1..iterations {
            let mut mac = HmacSha1::new(password);
            mac.update(&u);
            u = mac.finalize();
            for (r, v) in result.iter_mut().zip(u.iter()) {
                *r ^= v;
            }
        }

        dk.extend_from_slice(&result);
    }

    dk.truncate(dk_len);
    dk
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc6070_one_iteration() {
        let result = pbkdf2_hmac_sha1(b"password", b"salt", 1, 20);
        let expected = [
            0x0c, 0x60, 0xc8, 0x0f, 0x96, 0x1f, 0x0e, 0x71, 0xf3, 0xa9, 0xb5, 0x24, 0xaf, 0x60,
            0x12, 0x06, 0x2f, 0xe0, 0x37, 0xa6,
        ];
        assert_eq!(result, expected);
    }

    #[test]
    fn test_rfc6070_two_iterations() {
        let result = pbkdf2_hmac_sha1(b"password", b"salt", 2, 20);
        let expected = [
            0xea, 0x6c, 0x01, 0x4d, 0xc7, 0x2d, 0x6f, 0x8c, 0xcd, 0x1e, 0xd9, 0x2a, 0xce, 0x1d,
            0x41, 0xf0, 0xd8, 0xde, 0x89, 0x57,
        ];
        assert_eq!(result, expected);
    }

    #[test]
    fn test_rfc6070_4096_iterations() {
        let result = pbkdf2_hmac_sha1(b"password", b"salt", 4096, 20);
        let expected = [
            0x4b, 0x00, 0x79, 0x01, 0xb7, 0x65, 0x48, 0x9a, 0xbe, 0xad, 0x49, 0xd9, 0x26, 0xf7,
            0x21, 0xd0, 0x65, 0xa4, 0x29, 0xc1,
        ];
        assert_eq!(result, expected);
    }

    #[test]
    fn test_rfc6070_long_output() {
        // 25 bytes exercises the multi-block path
        let result = pbkdf2_hmac_sha1(
            b"passwordPASSWORDpassword",
            b"saltSALTsaltSALTsaltSALTsaltSALTsalt",
            4096,
            25,
        );
        let expected = [
            0x3d, 0x2e, 0xec, 0x4f, 0xe4, 0x1c, 0x84, 0x9b, 0x80, 0xc8, 0xd8, 0x36, 0x62, 0xc0,
            0xe4, 0x4a, 0x8b, 0x29, 0x1a, 0x96, 0x4c, 0xf2, 0xf0, 0x70, 0x38,
        ];
        assert_eq!(result, expected);
    }

    #[test]
    fn test_deterministic_for_fixed_inputs() {
        let a = pbkdf2_hmac_sha1(b"secret", b"0123456789abcdef", 1000, 66);
        let b = pbkdf2_hmac_sha1(b"secret", b"0123456789abcdef", 1000, 66);
        assert_eq!(a, b);
        assert_eq!(a.len(), 66);

        let c = pbkdf2_hmac_sha1(b"secret", b"0123456789abcdeF", 1000, 66);
        assert_ne!(a, c);
    }
}
