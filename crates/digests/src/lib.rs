//! Streaming message digest primitives.
//!
//! The password-file format binds each list entry to the leading bits of a
//! 160-bit hash, so the hash identity is part of the on-disk format and is
//! not negotiable at run time. This crate wraps the RustCrypto RIPEMD-160
//! implementation behind a small streaming trait so higher layers can size
//! buffers from [`MessageDigest::DIGEST_LEN`] instead of hard-coding
//! algorithm knowledge.

mod ripemd160;

pub use ripemd160::Ripemd160;

/// Trait implemented by streaming digest algorithms.
///
/// Callers feed data incrementally via [`Self::update`] and then obtain the
/// final hash through [`Self::finalize`].
pub trait MessageDigest: Sized {
    /// Type returned when finalising the digest.
    type Digest: AsRef<[u8]> + Copy;

    /// Length of the final digest in bytes.
    const DIGEST_LEN: usize;

    /// Creates a hasher with an empty state.
    fn new() -> Self;

    /// Feeds additional bytes into the digest state.
    fn update(&mut self, data: &[u8]);

    /// Finalises the digest and returns the resulting hash.
    fn finalize(self) -> Self::Digest;

    /// Convenience helper that hashes `data` in a single call.
    fn digest(data: &[u8]) -> Self::Digest {
        let mut hasher = Self::new();
        hasher.update(data);
        hasher.finalize()
    }
}
