//! Scoped effective-identity switching around password-file access.

use nix::unistd::{self, Gid, Uid};
use tracing::debug;

/// Switches the effective uid/gid for the lifetime of the guard and
/// restores the saved identity on drop, on every exit path.
///
/// Switch failures are logged and otherwise ignored: the file operations
/// that follow simply run with the caller's identity and fail with
/// ordinary permission errors, which the callers already handle.
pub(crate) struct IdentityGuard {
    saved_uid: Uid,
    saved_gid: Gid,
}

impl IdentityGuard {
    /// Saves the current effective identity and switches to `uid`/`gid`,
    /// group first.
    pub(crate) fn switch(uid: u32, gid: u32) -> Self {
        let saved_uid = unistd::geteuid();
        let saved_gid = unistd::getegid();
        if let Err(err) = unistd::setegid(Gid::from_raw(gid)) {
            debug!(from = saved_gid.as_raw(), to = gid, %err, "failed to change effective gid");
        }
        if let Err(err) = unistd::seteuid(Uid::from_raw(uid)) {
            debug!(from = saved_uid.as_raw(), to = uid, %err, "failed to change effective uid");
        }
        Self {
            saved_uid,
            saved_gid,
        }
    }
}

impl Drop for IdentityGuard {
    fn drop(&mut self) {
        if let Err(err) = unistd::seteuid(self.saved_uid) {
            debug!(to = self.saved_uid.as_raw(), %err, "failed to restore effective uid");
        }
        if let Err(err) = unistd::setegid(self.saved_gid) {
            debug!(to = self.saved_gid.as_raw(), %err, "failed to restore effective gid");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switching_to_the_current_identity_round_trips() {
        let uid = unistd::geteuid();
        let gid = unistd::getegid();
        {
            let _guard = IdentityGuard::switch(uid.as_raw(), gid.as_raw());
            assert_eq!(unistd::geteuid(), uid);
            assert_eq!(unistd::getegid(), gid);
        }
        assert_eq!(unistd::geteuid(), uid);
        assert_eq!(unistd::getegid(), gid);
    }
}
