//! SHA-1 (RFC 3174) and HMAC-SHA1 (RFC 2104).
//!
//! SHA-1 is broken for collision resistance but remains the hash the ZIP AES
//! scheme is specified over, both inside PBKDF2 and as the authentication
//! tag. The HMAC is streaming so the pipelines can authenticate ciphertext
//! without holding a whole entry in memory.

/// SHA-1 digest length in bytes.
pub const SHA1_DIGEST_SIZE: usize = 20;

/// SHA-1 block length in bytes.
const SHA1_BLOCK_SIZE: usize = 64;

/// SHA-1 hash state.
#[derive(Clone, Debug)]
pub struct Sha1 {
    state: [u32; 5],
    count: u64,
    buffer: [u8; SHA1_BLOCK_SIZE],
    buffer_len: usize,
}

impl Sha1 {
    const INIT_STATE: [u32; 5] = [0x67452301, 0xEFCDAB89, 0x98BADCFE, 0x10325476, 0xC3D2E1F0];

    /// Create a new SHA-1 hasher.
    pub fn new() -> Self {
        Self {
            state: Self::INIT_STATE,
            count: 0,
            buffer: [0u8; SHA1_BLOCK_SIZE],
            buffer_len: 0,
        }
    }

    /// Update the hash with new data.
    pub fn update(&mut self, data: &[u8]) {
        let mut offset = 0;
        self.count += (data.len() as u64) * 8;

        // Complete a buffered partial block first
        if self.buffer_len > 0 {
            let space = SHA1_BLOCK_SIZE - self.buffer_len;
            let to_copy = data.len().min(space);
            self.buffer[self.buffer_len..self.buffer_len + to_copy]
                .copy_from_slice(&data[..to_copy]);
            self.buffer_len += to_copy;
            offset += to_copy;

            if self.buffer_len == SHA1_BLOCK_SIZE {
                let block = self.buffer;
                self.compress(&block);
                self.buffer_len = 0;
            }
        }

        // Process complete blocks
        while offset + SHA1_BLOCK_SIZE <= data.len() {
            let mut block = [0u8; SHA1_BLOCK_SIZE];
            block.copy_from_slice(&data[offset..offset + SHA1_BLOCK_SIZE]);
            self.compress(&block);
            offset += SHA1_BLOCK_SIZE;
        }

        // Buffer the remainder
        if offset < data.len() {
            let remaining = data.len() - offset;
            self.buffer[..remaining].copy_from_slice(&data[offset..]);
            self.buffer_len = remaining;
        }
    }

    /// Finalize and return the digest.
    pub fn finalize(mut self) -> [u8; SHA1_DIGEST_SIZE] {
        let mut padding = [0u8; 72];
        padding[0] = 0x80;

        let padding_len = if self.buffer_len < 56 {
            56 - self.buffer_len
        } else {
            120 - self.buffer_len
        };

        // Message length in bits, big-endian, captured before the padding
        // passes through `update`
        let length_bytes = self.count.to_be_bytes();

        self.update(&padding[..padding_len]);
        self.update(&length_bytes);

        let mut result = [0u8; SHA1_DIGEST_SIZE];
        for (i, word) in self.state.iter().enumerate() {
            result[i * 4..(i + 1) * 4].copy_from_slice(&word.to_be_bytes());
        }
        result
    }

    /// Compress a single 64-byte block into the state.
    fn compress(&mut self, block: &[u8; SHA1_BLOCK_SIZE]) {
        let mut w = [0u32; 80];
        for i in 0..16 {
            w[i] = u32::from_be_bytes([
                block[i * 4],
                block[i * 4 + 1],
                block[i * 4 + 2],
                block[i * 4 + 3],
            ]);
        }
        for i in 16..80 {
            w[i] = (w[i - 3] ^ w[i - 8] ^ w[i - 14] ^ w[i - 16]).rotate_left(1);
        }

        let mut a = self.state[0];
        let mut b = self.state[1];
        let mut c = self.state[2];
        let mut d = self.state[3];
        let mut e = self.state[4];

        for (i, &w_i) in w.iter().enumerate() {
            let (f, k) = match i {
                0..=19 => ((b & c) | ((!b) & d), 0x5A827999u32),
                20..=39 => (b ^ c ^ d, 0x6ED9EBA1u32),
                40..=59 => ((b & c) | (b & d) | (c & d), 0x8F1BBCDCu32),
                _ => (b ^ c ^ d, 0xCA62C1D6u32),
            };

            let temp = a
                .rotate_left(5)
                .wrapping_add(f)
                .wrapping_add(e)
                .wrapping_add(k)
                .wrapping_add(w_i);
            e = d;
            d = c;
            c = b.rotate_left(30);
            b = a;
            a = temp;
        }

        self.state[0] = self.state[0].wrapping_add(a);
        self.state[1] = self.state[1].wrapping_add(b);
        self.state[2] = self.state[2].wrapping_add(c);
        self.state[3] = self.state[3].wrapping_add(d);
        self.state[4] = self.state[4].wrapping_add(e);
    }
}

impl Default for Sha1 {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute the SHA-1 digest of `data` in one call.
pub fn sha1(data: &[u8]) -> [u8; SHA1_DIGEST_SIZE] {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize()
}

/// Streaming HMAC-SHA1.
///
/// # Example
///
/// ```
/// use oxizip_crypto::sha1::HmacSha1;
///
/// let mut mac = HmacSha1::new(b"key");
/// mac.update(b"message ");
/// mac.update(b"in parts");
/// let tag = mac.finalize();
/// assert_eq!(tag.len(), 20);
/// ```
#[derive(Clone, Debug)]
pub struct HmacSha1 {
    inner: Sha1,
    opad: [u8; SHA1_BLOCK_SIZE],
}

impl HmacSha1 {
    /// Create a new MAC keyed with `key`.
    pub fn new(key: &[u8]) -> Self {
        let mut key_block = [0u8; SHA1_BLOCK_SIZE];
        if key.len() > SHA1_BLOCK_SIZE {
            let hash = sha1(key);
            key_block[..SHA1_DIGEST_SIZE].copy_from_slice(&hash);
        } else {
            key_block[..key.len()].copy_from_slice(key);
        }

        let mut ipad = [0x36u8; SHA1_BLOCK_SIZE];
        let mut opad = [0x5Cu8; SHA1_BLOCK_SIZE];
        for i in 0..SHA1_BLOCK_SIZE {
            ipad[i] ^= key_block[i];
            opad[i] ^= key_block[i];
        }

        let mut inner = Sha1::new();
        inner.update(&ipad);

        Self { inner, opad }
    }

    /// Feed message bytes into the MAC.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalize and return the full 20-byte tag.
    pub fn finalize(self) -> [u8; SHA1_DIGEST_SIZE] {
        let inner_hash = self.inner.finalize();
        let mut outer = Sha1::new();
        outer.update(&self.opad);
        outer.update(&inner_hash);
        outer.finalize()
    }
}

/// Compute HMAC-SHA1 of `message` under `key` in one call.
pub fn hmac_sha1(key: &[u8], message: &[u8]) -> [u8; SHA1_DIGEST_SIZE] {
    let mut mac = HmacSha1::new(key);
    mac.update(message);
    mac.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha1_empty() {
        let expected = [
            0xda, 0x39, 0xa3, 0xee, 0x5e, 0x6b, 0x4b, 0x0d, 0x32, 0x55, 0xbf, 0xef, 0x95, 0x60,
            0x18, 0x90, 0xaf, 0xd8, 0x07, 0x09,
        ];
        assert_eq!(sha1(b""), expected);
    }

    #[test]
    fn test_sha1_abc() {
        let expected = [
            0xa9, 0x99, 0x3e, 0x36, 0x47, 0x06, 0x81, 0x6a, 0xba, 0x3e, 0x25, 0x71, 0x78, 0x50,
            0xc2, 0x6c, 0x9c, 0xd0, 0xd8, 0x9d,
        ];
        assert_eq!(sha1(b"abc"), expected);
    }

    #[test]
    fn test_sha1_quick_brown_fox() {
        let expected = [
            0x2f, 0xd4, 0xe1, 0xc6, 0x7a, 0x2d, 0x28, 0xfc, 0xed, 0x84, 0x9e, 0xe1, 0xbb, 0x76,
            0xe7, 0x39, 0x1b, 0x93, 0xeb, 0x12,
        ];
        assert_eq!(sha1(b"The quick brown fox jumps over the lazy dog"), expected);
    }

    #[test]
    fn test_sha1_multi_block_streaming() {
        // 200 bytes crosses several 64-byte blocks; chunked updates must
        // match the one-shot digest.
        let data: Vec<u8> = (0..200).map(|i| (i % 251) as u8).collect();
        let oneshot = sha1(&data);

        let mut hasher = Sha1::new();
        for chunk in data.chunks(7) {
            hasher.update(chunk);
        }
        assert_eq!(hasher.finalize(), oneshot);
    }

    #[test]
    fn test_hmac_rfc2202_vector_1() {
        let key = [0x0b; 20];
        let expected = [
            0xb6, 0x17, 0x31, 0x86, 0x55, 0x05, 0x72, 0x64, 0xe2, 0x8b, 0xc0, 0xb6, 0xfb, 0x37,
            0x8c, 0x8e, 0xf1, 0x46, 0xbe, 0x00,
        ];
        assert_eq!(hmac_sha1(&key, b"Hi There"), expected);
    }

    #[test]
    fn test_hmac_rfc2202_vector_2() {
        let expected = [
            0xef, 0xfc, 0xdf, 0x6a, 0xe5, 0xeb, 0x2f, 0xa2, 0xd2, 0x74, 0x16, 0xd5, 0xf1, 0x84,
            0xdf, 0x9c, 0x25, 0x9a, 0x7c, 0x79,
        ];
        assert_eq!(hmac_sha1(b"Jefe", b"what do ya want for nothing?"), expected);
    }

    #[test]
    fn test_hmac_key_longer_than_block() {
        // RFC 2202 test vector 6
        let key = [0xaa; 80];
        let data = b"Test Using Larger Than Block-Size Key - Hash Key First";
        let expected = [
            0xaa, 0x4a, 0xe5, 0xe1, 0x52, 0x72, 0xd0, 0x0e, 0x95, 0x70, 0x56, 0x37, 0xce, 0x8a,
            0x3b, 0x55, 0xed, 0x40, 0x21, 0x12,
        ];
        assert_eq!(hmac_sha1(&key, data), expected);
    }

    #[test]
    fn test_hmac_streaming_matches_oneshot() {
        let key = b"streaming-key";
        let message: Vec<u8> = (0..1000).map(|i| (i * 7 % 256) as u8).collect();
        let oneshot = hmac_sha1(key, &message);

        let mut mac = HmacSha1::new(key);
        for chunk in message.chunks(33) {
            mac.update(chunk);
        }
        assert_eq!(mac.finalize(), oneshot);
    }
}
