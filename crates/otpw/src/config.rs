//! Process-wide configuration for the password-list scheme.

use std::time::Duration;

use tracing::debug;

use crate::users::UserEntry;

/// Characteristic first line of every password file this library accepts.
pub const MAGIC: &str = "OTPW1\n";

/// Width of the stored hash in encoded characters, 6 bits each.
///
/// The digest identity is baked into the file format through this width;
/// changing it requires a new magic line.
pub const HASH_LEN: usize = 12;

/// Upper bound on the challenge string handed to the caller, in bytes.
pub(crate) const CHALLENGE_MAX: usize = 80;

/// Account name probed by [`Config::detect_pseudouser`].
pub const AUTO_PSEUDOUSER: &str = "otpw";

/// Highest uid accepted for the automatically detected pseudouser.
pub const AUTO_PSEUDOUSER_MAX_UID: u32 = 999;

/// Knobs fixed before the first authentication call.
///
/// Normally the password file lives in the home directory of the user who
/// tries to log in and is accessed with that user's effective identity.
/// When [`pseudouser`](Self::pseudouser) is set, files live in the
/// pseudouser's home directory instead, named after the login name, and are
/// accessed with the pseudouser's identity; this keeps the scheme working
/// when home directories are unreadable to the login process.
#[derive(Clone, Debug)]
pub struct Config {
    /// Password file name relative to the user's home directory. Ignored
    /// when a pseudouser is configured.
    pub file_name: String,
    /// Suffix appended to the password file path to form the lock symlink.
    pub lock_suffix: String,
    /// Number of passwords requested while another entry is locked.
    pub multi: usize,
    /// Age beyond which a lock symlink is stale and may be reclaimed.
    /// `None` never reclaims.
    pub lock_timeout: Option<Duration>,
    /// Hash width the file header must declare.
    pub hash_len: usize,
    /// Recognised first line of a password file.
    pub magic: String,
    /// Optional service account that owns all password files.
    pub pseudouser: Option<UserEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file_name: ".otpw".to_owned(),
            lock_suffix: ".lock".to_owned(),
            multi: 3,
            lock_timeout: Some(Duration::from_secs(24 * 60 * 60)),
            hash_len: HASH_LEN,
            magic: MAGIC.to_owned(),
            pseudouser: None,
        }
    }
}

impl Config {
    /// Probes the user database for the [`AUTO_PSEUDOUSER`] account and
    /// adopts it when its uid does not exceed [`AUTO_PSEUDOUSER_MAX_UID`].
    ///
    /// Returns whether a pseudouser is configured afterwards.
    pub fn detect_pseudouser(&mut self) -> bool {
        match UserEntry::from_name(AUTO_PSEUDOUSER) {
            Ok(Some(user)) if user.uid <= AUTO_PSEUDOUSER_MAX_UID => {
                debug!(name = %user.name, uid = user.uid, "using pseudouser");
                self.pseudouser = Some(user);
            }
            Ok(Some(user)) => {
                debug!(
                    name = %user.name,
                    uid = user.uid,
                    "pseudouser candidate uid out of range, ignoring"
                );
            }
            Ok(None) => {}
            Err(err) => {
                debug!(%err, "pseudouser lookup failed");
            }
        }
        self.pseudouser.is_some()
    }
}
