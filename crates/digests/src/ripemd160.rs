use digest::Digest;

use super::MessageDigest;

/// Streaming RIPEMD-160 hasher binding prefix passwords to one-time
/// passwords.
#[derive(Clone, Debug)]
pub struct Ripemd160 {
    inner: ripemd::Ripemd160,
}

impl Default for Ripemd160 {
    fn default() -> Self {
        Self::new()
    }
}

impl Ripemd160 {
    /// Creates a hasher with an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: ripemd::Ripemd160::new(),
        }
    }

    /// Feeds additional bytes into the digest state.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalises the digest and returns the 160-bit output.
    #[must_use]
    pub fn finalize(self) -> [u8; 20] {
        self.inner.finalize().into()
    }
}

impl MessageDigest for Ripemd160 {
    type Digest = [u8; 20];
    const DIGEST_LEN: usize = 20;

    fn new() -> Self {
        Ripemd160::new()
    }

    fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    fn finalize(self) -> Self::Digest {
        self.inner.finalize().into()
    }
}
