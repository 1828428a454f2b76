//! HMAC (Hash-based Message Authentication Code), RFC 2104.
//!
//! HMAC(K, m) = H((K' XOR opad) || H((K' XOR ipad) || m))
//!
//! where K' is the key padded/hashed to block size, ipad = 0x36,
//! opad = 0x5c. The record layer instantiates this over MD5, the PRF over
//! SHA-256.

use crate::provider::Digest;
use slimtls_types::CryptoError;
use zeroize::Zeroize;

/// HMAC context using a boxed Digest for the underlying hash.
pub struct Hmac {
    /// Inner hash context (initialized with ipad-xored key).
    inner: Box<dyn Digest>,
    /// Outer hash context (initialized with opad-xored key).
    outer: Box<dyn Digest>,
    /// Factory to create fresh digest instances (for reset).
    factory: Box<dyn Fn() -> Box<dyn Digest> + Send + Sync>,
    /// Processed key block (for reset).
    key_block: Vec<u8>,
}

impl Hmac {
    /// Create a new HMAC instance with the given key and hash factory.
    pub fn new(
        hash_factory: impl Fn() -> Box<dyn Digest> + Send + Sync + 'static,
        key: &[u8],
    ) -> Result<Self, CryptoError> {
        let sample = hash_factory();
        let block_size = sample.block_size();
        let output_size = sample.output_size();
        drop(sample);

        // If key > block_size, hash it; otherwise pad with zeros
        let mut key_block = vec![0u8; block_size];
        if key.len() > block_size {
            let mut hasher = hash_factory();
            hasher.update(key)?;
            let mut hashed_key = vec![0u8; output_size];
            hasher.finish(&mut hashed_key)?;
            key_block[..output_size].copy_from_slice(&hashed_key);
            hashed_key.zeroize();
        } else {
            key_block[..key.len()].copy_from_slice(key);
        }

        let mut inner = hash_factory();
        let mut outer = hash_factory();

        let mut ipad_key = vec![0u8; block_size];
        for (i, byte) in ipad_key.iter_mut().enumerate() {
            *byte = key_block[i] ^ 0x36;
        }
        inner.update(&ipad_key)?;
        ipad_key.zeroize();

        let mut opad_key = vec![0u8; block_size];
        for (i, byte) in opad_key.iter_mut().enumerate() {
            *byte = key_block[i] ^ 0x5c;
        }
        outer.update(&opad_key)?;
        opad_key.zeroize();

        Ok(Self {
            inner,
            outer,
            factory: Box::new(hash_factory),
            key_block,
        })
    }

    /// The MAC output size in bytes (the hash output size).
    pub fn output_size(&self) -> usize {
        self.inner.output_size()
    }

    /// Feed data into the HMAC computation.
    pub fn update(&mut self, data: &[u8]) -> Result<(), CryptoError> {
        self.inner.update(data)
    }

    /// Finalize the HMAC computation and write the result to `out`.
    pub fn finish(&mut self, out: &mut [u8]) -> Result<(), CryptoError> {
        let output_size = self.inner.output_size();
        let mut inner_hash = vec![0u8; output_size];
        self.inner.finish(&mut inner_hash)?;

        self.outer.update(&inner_hash)?;
        inner_hash.zeroize();

        self.outer.finish(out)
    }

    /// Reset the HMAC state for reuse with the same key.
    pub fn reset(&mut self) {
        let block_size = self.inner.block_size();

        self.inner = (self.factory)();
        self.outer = (self.factory)();

        let mut ipad_key = vec![0u8; block_size];
        for (i, byte) in ipad_key.iter_mut().enumerate() {
            *byte = self.key_block[i] ^ 0x36;
        }
        // Update on a fresh context cannot fail
        let _ = self.inner.update(&ipad_key);
        ipad_key.zeroize();

        let mut opad_key = vec![0u8; block_size];
        for (i, byte) in opad_key.iter_mut().enumerate() {
            *byte = self.key_block[i] ^ 0x5c;
        }
        let _ = self.outer.update(&opad_key);
        opad_key.zeroize();
    }

    /// One-shot HMAC computation.
    pub fn mac(
        hash_factory: impl Fn() -> Box<dyn Digest> + Send + Sync + 'static,
        key: &[u8],
        data: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let mut ctx = Self::new(hash_factory, key)?;
        ctx.update(data)?;
        let output_size = ctx.inner.output_size();
        let mut out = vec![0u8; output_size];
        ctx.finish(&mut out)?;
        Ok(out)
    }
}

impl Drop for Hmac {
    fn drop(&mut self) {
        self.key_block.zeroize();
    }
}
