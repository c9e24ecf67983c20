//! Response verification and entry consumption.
//!
//! The response arrives as one raw byte string: the user's memorised
//! prefix password immediately followed by the requested one-time
//! passwords, typed on whatever keyboard the untrusted terminal offers.
//! Verification first reconstructs the passwords from the right end of
//! the input, then recomputes each entry hash, and only after every
//! password matched does it touch the file.

use std::fs;

use digests::Ripemd160;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::challenge::Challenge;
use crate::encoding;
use crate::ident::IdentityGuard;
use crate::pwfile;

/// Outcome of a verification attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Every requested password matched; the used entries were consumed
    /// (or the lock was retained in their place).
    Ok,
    /// The response was too short or at least one password did not match.
    /// The password file is untouched.
    Wrong,
    /// The handle carries no challenge, usually because it was already
    /// spent by an earlier call.
    Error,
}

impl Challenge {
    /// Checks `response` against the issued challenge and spends the
    /// handle.
    ///
    /// Stray whitespace and control characters in the response are
    /// ignored, backspace and DEL are applied, and keystrokes that are
    /// easily confused with password glyphs are canonicalised before
    /// hashing. Whatever remains to the left of the one-time passwords is
    /// the prefix password.
    ///
    /// After this call `passwords()` is zero and any further call returns
    /// [`Verdict::Error`].
    pub fn verify(&mut self, response: &[u8]) -> Verdict {
        if self.passwords < 1 || self.passwords > self.multi {
            debug!("no challenge issued, or the handle was already spent");
            return Verdict::Error;
        }

        let _ident = IdentityGuard::switch(self.uid, self.gid);
        let verdict = self.check_and_consume(response);

        if self.locked {
            debug!(lock = %self.lockfilename.display(), "removing lock symlink");
            if let Err(err) = fs::remove_file(&self.lockfilename) {
                debug!(%err, "failed to unlink lock symlink");
            }
        }
        self.passwords = 0;
        verdict
    }

    fn check_and_consume(&mut self, response: &[u8]) -> Verdict {
        let pwlen = self.header.pwlen;
        let Some((prefix_len, otps)) = split_response(response, self.passwords, pwlen) else {
            debug!("entered password was too short");
            return Verdict::Wrong;
        };
        let otps = Zeroizing::new(otps);
        let prefix = &response[..prefix_len];
        if self.flags.debug {
            debug!(prefix = %String::from_utf8_lossy(prefix), "parsed prefix password");
            for i in 0..self.passwords {
                let otp = &otps[i * pwlen..(i + 1) * pwlen];
                debug!(index = i, otp = %String::from_utf8_lossy(otp), "parsed one-time password");
            }
        }

        for i in 0..self.passwords {
            let mut md = Ripemd160::new();
            md.update(prefix);
            md.update(&otps[i * pwlen..(i + 1) * pwlen]);
            let hash = md.finalize();
            let encoded = encoding::encode(&hash, self.header.hlen);
            if encoded.as_bytes() != self.hashes[i].as_slice() {
                debug!(index = i, "entered password did not match");
                return Verdict::Wrong;
            }
        }
        debug!("entered passwords are correct");

        match pwfile::consume(&self.filename, &self.magic, self.header, &self.selection) {
            Ok(cleared) => self.remaining -= cleared,
            Err(err) if self.passwords == 1 => {
                // the lock stays so the same password cannot be replayed
                warn!(
                    file = %self.filename.display(),
                    %err,
                    "could not consume the used password, keeping the lock in place"
                );
                self.locked = false;
            }
            Err(err) => {
                warn!(
                    file = %self.filename.display(),
                    %err,
                    "could not consume the used passwords, they remain live on disk"
                );
            }
        }
        Verdict::Ok
    }
}

/// Walks `response` from its last byte leftwards, resolving backspace and
/// DEL runs and dropping bytes that carry no password information, and
/// fills `passwords * pwlen` canonicalised characters (password `i`
/// starting at `i * pwlen`). Returns the prefix length and the password
/// buffer, or `None` when the input is exhausted before every slot is
/// filled.
fn split_response(response: &[u8], passwords: usize, pwlen: usize) -> Option<(usize, Vec<u8>)> {
    let mut otps = vec![0u8; passwords * pwlen];
    let mut l = response.len() as isize - 1;
    for i in (0..passwords).rev() {
        for j in (0..pwlen).rev() {
            let slot = i * pwlen + j;
            while otps[slot] == 0 {
                let mut deleted = 0usize;
                while l >= 0 {
                    let byte = response[l as usize];
                    if byte == 0x08 || byte == 0x7f {
                        deleted += 1;
                    } else if deleted > 0 {
                        deleted -= 1;
                    } else {
                        break;
                    }
                    l -= 1;
                }
                if l < 0 {
                    return None;
                }
                if let Some(canonical) = encoding::canonicalize(response[l as usize]) {
                    otps[slot] = canonical;
                }
                l -= 1;
            }
        }
    }
    Some(((l + 1) as usize, otps))
}
