//! One-time password authentication against printed password lists.
//!
//! A user generates a finite list of one-time passwords and keeps it on
//! paper. During login the system issues a *challenge* naming which entries
//! of the list the user must type, prefixed with a memorised prefix
//! password; every successful verification consumes the referenced entries
//! irreversibly. Because each password is valid exactly once, logins from
//! keylogged or shoulder-surfed terminals do not expose a reusable secret.
//!
//! The flow has two halves:
//!
//! 1. [`Challenge::prepare`] opens the user's password file (under the
//!    user's own identity, or a configured pseudouser's), picks the entries
//!    to ask for, and interlocks against concurrent sessions with a lock
//!    symlink whose *target* is the challenged label.
//! 2. [`Challenge::verify`] normalises the typed response, recomputes the
//!    entry hashes, overwrites the used entries with hyphens, and releases
//!    the lock.
//!
//! Concurrency is mediated entirely through the filesystem: when another
//! session already holds the lock, `prepare` falls back to a
//! *multi-challenge* that asks for several passwords from entries disjoint
//! from the locked one.
//!
//! This crate is Unix-only: it relies on symlinks and on effective uid/gid
//! switching around file access.

mod challenge;
mod config;
pub mod encoding;
mod error;
mod ident;
mod pwfile;
mod rbg;
mod users;
mod verify;

pub use challenge::{Challenge, Flags};
pub use config::{AUTO_PSEUDOUSER, AUTO_PSEUDOUSER_MAX_UID, Config, HASH_LEN, MAGIC};
pub use error::PrepareError;
pub use users::UserEntry;
pub use verify::Verdict;
