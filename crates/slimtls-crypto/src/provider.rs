//! Trait-based provider mechanism for cryptographic algorithms.
//!
//! This replaces the original's static function-pointer tables with
//! Rust's trait system; callers hold factories or boxed trait objects
//! instead of consulting process-wide registries.

use slimtls_types::CryptoError;

/// A hash / message digest algorithm.
pub trait Digest: Send + Sync {
    /// The output size in bytes.
    fn output_size(&self) -> usize;

    /// The internal block size in bytes.
    fn block_size(&self) -> usize;

    /// Feed data into the hash state.
    fn update(&mut self, data: &[u8]) -> Result<(), CryptoError>;

    /// Finalize the hash and write the digest to `out`.
    /// The length of `out` must be at least `output_size()`.
    fn finish(&mut self, out: &mut [u8]) -> Result<(), CryptoError>;

    /// Reset the hash state to process a new message.
    fn reset(&mut self);
}

/// A factory closure producing fresh digest contexts.
///
/// HMAC, the PRF, and the transcript hash all take one of these so they
/// can be instantiated over any of the stack's hash algorithms.
pub type DigestFactory = dyn Fn() -> Box<dyn Digest> + Send + Sync;
