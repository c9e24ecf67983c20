//! Selection randomness for the multi-challenge fan-out.
//!
//! Hashes a handful of cheap entropy sources into a 160-bit state and
//! re-hashes it per draw. The stream only decides *which* list entries a
//! challenge names; secrecy lives in the password hashes, so high entropy
//! is not critical here. The kernel random device is still preferred when
//! it exists.

use std::fs::File;
use std::io::Read;
use std::time::{SystemTime, UNIX_EPOCH};

use digests::{MessageDigest, Ripemd160};
use rustix::time::{ClockId, clock_gettime};

/// Mixed into every state iteration; sites may vary it.
const SITE_SALT: &[u8] = b"AutomaGic";

pub(crate) struct SelectionRng {
    state: [u8; Ripemd160::DIGEST_LEN],
}

impl SelectionRng {
    /// Seeds the state from `/dev/urandom` (absence is tolerated), the
    /// wallclock, the process CPU clock, and process identifiers.
    pub(crate) fn new() -> Self {
        let mut md = Ripemd160::new();

        let mut noise = [0u8; Ripemd160::DIGEST_LEN];
        if let Ok(mut dev) = File::open("/dev/urandom") {
            if dev.read_exact(&mut noise).is_ok() {
                md.update(&noise);
            }
        }

        if let Ok(now) = SystemTime::now().duration_since(UNIX_EPOCH) {
            md.update(&now.as_secs().to_ne_bytes());
            md.update(&now.subsec_nanos().to_ne_bytes());
        }
        let cpu = clock_gettime(ClockId::ProcessCPUTime);
        md.update(&cpu.tv_sec.to_ne_bytes());
        md.update(&cpu.tv_nsec.to_ne_bytes());
        md.update(&std::process::id().to_ne_bytes());
        let ppid = rustix::process::getppid().map_or(0, |pid| pid.as_raw_nonzero().get());
        md.update(&ppid.to_ne_bytes());
        md.update(&rustix::process::getuid().as_raw().to_ne_bytes());

        Self {
            state: md.finalize(),
        }
    }

    /// Advances the state and reduces its low bits to an index below
    /// `modulus`. Modulo bias is acceptable at the list sizes the file
    /// format allows.
    pub(crate) fn next_index(&mut self, modulus: usize) -> usize {
        debug_assert!(modulus > 0);
        let mut md = Ripemd160::new();
        if let Ok(now) = SystemTime::now().duration_since(UNIX_EPOCH) {
            md.update(&now.as_secs().to_ne_bytes());
            md.update(&now.subsec_nanos().to_ne_bytes());
        }
        md.update(&self.state);
        md.update(SITE_SALT);
        self.state = md.finalize();

        let low = u32::from_ne_bytes([self.state[0], self.state[1], self.state[2], self.state[3]]);
        low as usize % modulus
    }
}
