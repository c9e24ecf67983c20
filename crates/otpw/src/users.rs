//! User database entries.
//!
//! The library needs only a small slice of a user record: the login name,
//! the numeric identity to access the password file with, and the home
//! directory the file lives in. The platform lookup (including its
//! re-entrant buffer sizing) is delegated to [`nix::unistd::User`].

use std::io;
use std::path::PathBuf;

use nix::unistd::{Uid, User};

/// The slice of a user database record needed for authentication.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserEntry {
    /// Login name.
    pub name: String,
    /// Numeric user id.
    pub uid: u32,
    /// Primary group id.
    pub gid: u32,
    /// Home directory.
    pub home: PathBuf,
}

impl UserEntry {
    /// Looks up `name` in the user database.
    pub fn from_name(name: &str) -> io::Result<Option<Self>> {
        Ok(User::from_name(name)
            .map_err(io::Error::from)?
            .map(Self::from_user))
    }

    /// Looks up a numeric uid in the user database.
    pub fn from_uid(uid: u32) -> io::Result<Option<Self>> {
        Ok(User::from_uid(Uid::from_raw(uid))
            .map_err(io::Error::from)?
            .map(Self::from_user))
    }

    fn from_user(user: User) -> Self {
        Self {
            name: user.name,
            uid: user.uid.as_raw(),
            gid: user.gid.as_raw(),
            home: user.dir,
        }
    }
}
