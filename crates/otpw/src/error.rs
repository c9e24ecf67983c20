//! Error types for challenge preparation.

use std::io;

use thiserror::Error;

/// Reasons why a one-time-password challenge cannot be issued.
///
/// Every variant means the same thing to the login flow, "one-time password
/// entry is not possible right now"; the distinctions exist for diagnostics
/// and tests. None of them reveal to the remote side whether a password
/// file exists.
#[derive(Debug, Error)]
pub enum PrepareError {
    /// The password file could not be opened or read.
    #[error("cannot access password file: {0}")]
    Io(
        #[from]
        #[source]
        io::Error,
    ),
    /// The first line of the file is not the recognised magic string.
    #[error("password file does not start with the magic line")]
    BadMagic,
    /// The header line is missing or is not four decimal integers.
    #[error("malformed password file header")]
    MalformedHeader,
    /// The header parameters violate the format bounds.
    #[error("header parameters ({entries} {challen} {hlen} {pwlen}) out of allowed range")]
    HeaderOutOfRange {
        /// Declared number of password lines.
        entries: i64,
        /// Declared challenge label width.
        challen: i64,
        /// Declared hash width.
        hlen: i64,
        /// Declared one-time password length.
        pwlen: i64,
    },
    /// The file ended before `entries` well-formed password lines.
    #[error("password file is truncated")]
    Truncated,
    /// Every entry has already been consumed.
    #[error("no one-time passwords left")]
    Exhausted,
    /// Another session holds the lock and too few passwords remain to issue
    /// a multi challenge against disjoint entries.
    #[error("{remaining} remaining passwords are not enough for a multi challenge")]
    TooFewForMulti {
        /// Live entries left in the file.
        remaining: usize,
    },
    /// The lock symlink target could not be read; the lock was removed.
    #[error("cannot read lock symlink target")]
    UnreadableLock(#[source] io::Error),
    /// The lock symlink target had the wrong length; the lock was removed.
    #[error("removed corrupt lock symlink")]
    CorruptLock,
    /// Creating or inspecting the lock symlink failed for a reason other
    /// than contention.
    #[error("lock operation failed: {0}")]
    Lock(#[source] io::Error),
}
