//! RC4 stream cipher.
//!
//! Keystream generation is stateful: encrypting and decrypting are the
//! same XOR operation, and a TLS connection keeps one keystream state per
//! direction for the lifetime of the cipher epoch.
//!
//! **Security warning**: RC4 keystream biases are exploitable
//! (RFC 7465 prohibits it in new deployments). It exists here because
//! the legacy cipher suite this stack interoperates with requires it.

use slimtls_types::CryptoError;
use zeroize::Zeroize;

/// RC4 keystream state.
pub struct Rc4 {
    s: [u8; 256],
    i: u8,
    j: u8,
}

impl Rc4 {
    /// Key-scheduling algorithm: initialize the permutation from a key of
    /// 1..=256 bytes.
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        if key.is_empty() || key.len() > 256 {
            return Err(CryptoError::InvalidArg);
        }

        let mut s = [0u8; 256];
        for (i, v) in s.iter_mut().enumerate() {
            *v = i as u8;
        }

        let mut j: u8 = 0;
        for i in 0..256 {
            j = j
                .wrapping_add(s[i])
                .wrapping_add(key[i % key.len()]);
            s.swap(i, j as usize);
        }

        Ok(Self { s, i: 0, j: 0 })
    }

    /// XOR the next keystream bytes into `data` in place. Applying the
    /// same operation with an identically-keyed state decrypts.
    pub fn apply_keystream(&mut self, data: &mut [u8]) {
        for byte in data.iter_mut() {
            self.i = self.i.wrapping_add(1);
            self.j = self.j.wrapping_add(self.s[self.i as usize]);
            self.s.swap(self.i as usize, self.j as usize);
            let k = self.s[(self.s[self.i as usize].wrapping_add(self.s[self.j as usize])) as usize];
            *byte ^= k;
        }
    }
}

impl Drop for Rc4 {
    fn drop(&mut self) {
        self.s.zeroize();
        self.i = 0;
        self.j = 0;
    }
}
