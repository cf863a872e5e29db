//! Legacy PKWARE stream cipher (ZipCrypto).
//!
//! Three 32-bit rolling keys are seeded from the password through a
//! CRC-32-based mixing schedule and advanced byte-by-byte as plaintext
//! flows through. A 12-byte randomized header precedes the ciphertext; its
//! final byte echoes a check byte (the high byte of either the entry CRC or
//! the DOS modification time) and is the only password signal available
//! before full decryption.
//!
//! Known-plaintext attacks against this cipher are practical. It exists for
//! compatibility with archives that use it, nothing more.

use rand::RngCore;

/// Size of the encryption header in bytes.
pub const ZIPCRYPTO_HEADER_SIZE: usize = 12;

const INITIAL_KEY0: u32 = 0x12345678;
const INITIAL_KEY1: u32 = 0x23456789;
const INITIAL_KEY2: u32 = 0x34567890;

/// CRC-32 lookup table (polynomial 0xEDB88320, reflected), used by the key
/// update schedule.
const CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0usize;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB88320;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// Update a CRC-32 value with a single byte.
#[inline]
fn crc32_update(crc: u32, byte: u8) -> u32 {
    CRC32_TABLE[((crc ^ byte as u32) & 0xFF) as usize] ^ (crc >> 8)
}

/// The rolling three-key cipher state.
#[derive(Debug, Clone)]
pub struct ZipCryptoKeys {
    key0: u32,
    key1: u32,
    key2: u32,
}

impl ZipCryptoKeys {
    /// Initialize the key state from a password.
    #[must_use]
    pub fn new(password: &[u8]) -> Self {
        let mut keys = Self {
            key0: INITIAL_KEY0,
            key1: INITIAL_KEY1,
            key2: INITIAL_KEY2,
        };
        for &byte in password {
            keys.update(byte);
        }
        keys
    }

    /// Advance the key state with a plaintext byte:
    /// - key0 = crc32(key0, byte)
    /// - key1 = (key1 + (key0 & 0xff)) * 134775813 + 1
    /// - key2 = crc32(key2, key1 >> 24)
    #[inline]
    fn update(&mut self, byte: u8) {
        self.key0 = crc32_update(self.key0, byte);
        self.key1 = self
            .key1
            .wrapping_add(self.key0 & 0xFF)
            .wrapping_mul(134775813)
            .wrapping_add(1);
        self.key2 = crc32_update(self.key2, (self.key1 >> 24) as u8);
    }

    /// Pseudo-random byte from the current state:
    /// ((key2 | 2) * ((key2 | 2) ^ 1)) >> 8
    #[inline]
    fn stream_byte(&self) -> u8 {
        let temp = (self.key2 | 2) as u16;
        (temp.wrapping_mul(temp ^ 1) >> 8) as u8
    }

    /// Encrypt a single byte.
    #[inline]
    pub fn encrypt_byte(&mut self, byte: u8) -> u8 {
        let cipher_byte = byte ^ self.stream_byte();
        self.update(byte);
        cipher_byte
    }

    /// Decrypt a single byte.
    #[inline]
    pub fn decrypt_byte(&mut self, byte: u8) -> u8 {
        let plain_byte = byte ^ self.stream_byte();
        self.update(plain_byte);
        plain_byte
    }

    /// Encrypt a buffer in place.
    pub fn encrypt_buffer(&mut self, buffer: &mut [u8]) {
        for byte in buffer.iter_mut() {
            *byte = self.encrypt_byte(*byte);
        }
    }

    /// Decrypt a buffer in place.
    pub fn decrypt_buffer(&mut self, buffer: &mut [u8]) {
        for byte in buffer.iter_mut() {
            *byte = self.decrypt_byte(*byte);
        }
    }

    /// Generate the 12-byte encryption header: 11 random bytes plus the
    /// check byte, all encrypted through this key state.
    ///
    /// The caller picks the check byte: the high byte of the entry CRC, or
    /// the high byte of the DOS modification time when a data descriptor
    /// will carry the CRC instead.
    pub fn generate_header(&mut self, check_byte: u8) -> [u8; ZIPCRYPTO_HEADER_SIZE] {
        let mut random = [0u8; ZIPCRYPTO_HEADER_SIZE - 1];
        rand::rng().fill_bytes(&mut random);
        self.generate_header_from(check_byte, &random)
    }

    /// Header generation with caller-supplied random bytes (for tests).
    pub fn generate_header_from(
        &mut self,
        check_byte: u8,
        random: &[u8; ZIPCRYPTO_HEADER_SIZE - 1],
    ) -> [u8; ZIPCRYPTO_HEADER_SIZE] {
        let mut header = [0u8; ZIPCRYPTO_HEADER_SIZE];
        for (slot, &byte) in header.iter_mut().zip(random.iter()) {
            *slot = self.encrypt_byte(byte);
        }
        header[ZIPCRYPTO_HEADER_SIZE - 1] = self.encrypt_byte(check_byte);
        header
    }

    /// Decrypt a 12-byte encryption header and return its check byte.
    ///
    /// Comparing the result against the expected value catches most wrong
    /// passwords, but one in 256 slips through; the end-of-entry CRC is the
    /// authoritative check.
    pub fn decrypt_header(&mut self, header: &[u8; ZIPCRYPTO_HEADER_SIZE]) -> u8 {
        let mut last = 0u8;
        for &byte in header.iter() {
            last = self.decrypt_byte(byte);
        }
        last
    }

    /// Current key state, for tests.
    #[must_use]
    pub fn keys(&self) -> (u32, u32, u32) {
        (self.key0, self.key1, self.key2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_initialization_is_deterministic() {
        let a = ZipCryptoKeys::new(b"test");
        let b = ZipCryptoKeys::new(b"test");
        assert_eq!(a.keys(), b.keys());

        let c = ZipCryptoKeys::new(b"different");
        assert_ne!(a.keys(), c.keys());
    }

    #[test]
    fn test_empty_password_keeps_initial_keys() {
        let keys = ZipCryptoKeys::new(b"");
        assert_eq!(keys.keys(), (INITIAL_KEY0, INITIAL_KEY1, INITIAL_KEY2));
    }

    #[test]
    fn test_byte_roundtrip() {
        let mut enc = ZipCryptoKeys::new(b"password");
        let mut dec = ZipCryptoKeys::new(b"password");

        for original in [0x00u8, 0x42, 0xFF, 0x7F] {
            let encrypted = enc.encrypt_byte(original);
            assert_eq!(dec.decrypt_byte(encrypted), original);
        }
    }

    #[test]
    fn test_buffer_roundtrip() {
        let original = b"Some plaintext that is long enough to roll the keys around.";
        let mut data = original.to_vec();

        ZipCryptoKeys::new(b"secret").encrypt_buffer(&mut data);
        assert_ne!(&data[..], &original[..]);

        ZipCryptoKeys::new(b"secret").decrypt_buffer(&mut data);
        assert_eq!(&data[..], &original[..]);
    }

    #[test]
    fn test_wrong_password_garbles() {
        let original = b"payload";
        let mut data = original.to_vec();
        ZipCryptoKeys::new(b"right").encrypt_buffer(&mut data);
        ZipCryptoKeys::new(b"wrong").decrypt_buffer(&mut data);
        assert_ne!(&data[..], &original[..]);
    }

    #[test]
    fn test_header_check_byte_roundtrip() {
        let check = 0xDE;
        let random = [0x11u8; 11];

        let mut writer_keys = ZipCryptoKeys::new(b"pw");
        let header = writer_keys.generate_header_from(check, &random);

        let mut reader_keys = ZipCryptoKeys::new(b"pw");
        assert_eq!(reader_keys.decrypt_header(&header), check);
    }

    #[test]
    fn test_header_check_byte_wrong_password() {
        let check = 0xDE;
        let random = [0x2Au8; 11];

        let mut writer_keys = ZipCryptoKeys::new(b"correct");
        let header = writer_keys.generate_header_from(check, &random);

        // Not guaranteed for every password pair, but stable for this one.
        let mut reader_keys = ZipCryptoKeys::new(b"incorrect");
        assert_ne!(reader_keys.decrypt_header(&header), check);
    }

    #[test]
    fn test_cipher_state_continues_after_header() {
        // Data encrypted after the header must decrypt with the state left
        // by header processing, not a fresh state.
        let payload = b"trailing payload bytes";
        let mut writer_keys = ZipCryptoKeys::new(b"pw");
        let header = writer_keys.generate_header_from(0x55, &[0x00u8; 11]);
        let mut ciphertext = payload.to_vec();
        writer_keys.encrypt_buffer(&mut ciphertext);

        let mut reader_keys = ZipCryptoKeys::new(b"pw");
        reader_keys.decrypt_header(&header);
        reader_keys.decrypt_buffer(&mut ciphertext);
        assert_eq!(&ciphertext[..], &payload[..]);
    }
}
