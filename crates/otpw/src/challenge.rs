//! Challenge preparation.
//!
//! Preparing a challenge picks which password-list entries the user must
//! answer for and interlocks against concurrent sessions. The interlock is
//! a symlink next to the password file whose *target* is the challenged
//! label: the target comes into existence atomically with the link itself,
//! so a parallel session can read which entry is held without a race and
//! pick disjoint entries for its own, larger fallback challenge.

use std::fs;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::symlink;
use std::path::PathBuf;
use std::time::SystemTime;

use tracing::debug;

use crate::config::{CHALLENGE_MAX, Config};
use crate::error::PrepareError;
use crate::ident::IdentityGuard;
use crate::pwfile::{Header, PasswordTable};
use crate::rbg::SelectionRng;
use crate::users::UserEntry;

/// Attempts to create the lock symlink before concluding that another
/// session holds a fresh lock.
const LOCK_RETRIES: usize = 5;

/// Behaviour switches for [`Challenge::prepare`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Flags {
    /// Also emit diagnostics that echo typed input.
    pub debug: bool,
    /// Skip the lock-symlink interlock. Meant for test harnesses.
    pub no_lock: bool,
}

/// A live challenge: the labels the user must answer for and the state
/// needed to verify the response and consume the used entries.
///
/// Produced by [`Challenge::prepare`] and spent by exactly one
/// [`verify`](Challenge::verify) call.
#[derive(Debug)]
pub struct Challenge {
    pub(crate) challenge: String,
    pub(crate) selection: Vec<usize>,
    pub(crate) hashes: Vec<Vec<u8>>,
    pub(crate) uid: u32,
    pub(crate) gid: u32,
    pub(crate) filename: PathBuf,
    pub(crate) lockfilename: PathBuf,
    pub(crate) locked: bool,
    pub(crate) header: Header,
    pub(crate) remaining: usize,
    pub(crate) passwords: usize,
    pub(crate) flags: Flags,
    pub(crate) magic: String,
    pub(crate) multi: usize,
}

impl Challenge {
    /// Opens the password file of `user`, selects the entries to challenge,
    /// and acquires the lock.
    ///
    /// With no contention the challenge names the first live entry and the
    /// lock symlink is created. When another session holds a fresh lock,
    /// the fallback *multi challenge* names [`Config::multi`] entries
    /// disjoint from the held one and leaves the existing lock alone.
    ///
    /// Any error means one-time password entry is not possible right now;
    /// the caller should fall back to other authentication.
    pub fn prepare(
        config: &Config,
        user: &UserEntry,
        flags: Flags,
    ) -> Result<Self, PrepareError> {
        let (filename, uid, gid) = match &config.pseudouser {
            Some(pseudo) => (pseudo.home.join(&user.name), pseudo.uid, pseudo.gid),
            None => (user.home.join(&config.file_name), user.uid, user.gid),
        };
        let mut lockfilename = filename.clone().into_os_string();
        lockfilename.push(&config.lock_suffix);
        let lockfilename = PathBuf::from(lockfilename);

        let _ident = IdentityGuard::switch(uid, gid);
        let mut rng = SelectionRng::new();

        let table = PasswordTable::load(&filename, config).inspect_err(|err| {
            debug!(file = %filename.display(), %err, "cannot issue a challenge");
        })?;
        let remaining = table.remaining();
        let Some(first) = table.first_live() else {
            debug!(file = %filename.display(), "no passwords left");
            return Err(PrepareError::Exhausted);
        };

        let mut ch = Self {
            challenge: String::from_utf8_lossy(table.label(first)).into_owned(),
            selection: vec![first],
            hashes: vec![table.hash(first).to_vec()],
            uid,
            gid,
            filename,
            lockfilename,
            locked: false,
            header: table.header,
            remaining,
            passwords: 0,
            flags,
            magic: config.magic.clone(),
            multi: config.multi,
        };

        if flags.no_lock {
            ch.passwords = 1;
            return Ok(ch);
        }

        if ch.try_lock(config)? {
            ch.passwords = 1;
            return Ok(ch);
        }

        ch.multi_challenge(config, table, &mut rng)?;
        Ok(ch)
    }

    /// The issued challenge string: one label, or several joined by `/`.
    #[must_use]
    pub fn challenge(&self) -> &str {
        &self.challenge
    }

    /// Number of one-time passwords the user must type.
    #[must_use]
    pub fn passwords(&self) -> usize {
        self.passwords
    }

    /// Number of password lines in the file.
    #[must_use]
    pub fn entries(&self) -> usize {
        self.header.entries
    }

    /// Live entries left, updated after a successful verification.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Length of each one-time password on the printed list.
    #[must_use]
    pub fn pwlen(&self) -> usize {
        self.header.pwlen
    }

    /// Whether this challenge holds the lock symlink.
    #[must_use]
    pub fn locked(&self) -> bool {
        self.locked
    }

    /// Tries to create the lock symlink pointing at the primary label.
    ///
    /// Returns `Ok(true)` once the lock is ours. `Ok(false)` means another
    /// session holds a lock younger than the stale timeout; stale and
    /// vanished locks are retried up to [`LOCK_RETRIES`] times.
    fn try_lock(&mut self, config: &Config) -> Result<bool, PrepareError> {
        let mut attempts = 0;
        loop {
            match symlink(&self.challenge, &self.lockfilename) {
                Ok(()) => {
                    self.locked = true;
                    return Ok(true);
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
                Err(err) => {
                    debug!(lock = %self.lockfilename.display(), %err, "cannot create lock");
                    return Err(PrepareError::Lock(err));
                }
            }

            let mut repeat = false;
            match fs::symlink_metadata(&self.lockfilename) {
                Ok(meta) => {
                    if let Some(timeout) = config.lock_timeout {
                        let age = meta
                            .modified()
                            .ok()
                            .and_then(|mtime| SystemTime::now().duration_since(mtime).ok());
                        if age.is_some_and(|age| age > timeout) {
                            debug!(lock = %self.lockfilename.display(), "removing stale lock");
                            let _ = fs::remove_file(&self.lockfilename);
                            repeat = true;
                        }
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => repeat = true,
                Err(err) => {
                    debug!(lock = %self.lockfilename.display(), %err, "cannot stat lock");
                    return Err(PrepareError::Lock(err));
                }
            }

            attempts += 1;
            if !repeat || attempts >= LOCK_RETRIES {
                return Ok(false);
            }
        }
    }

    /// Issues several passwords at once while another session holds the
    /// lock, selecting only entries disjoint from the held label.
    fn multi_challenge(
        &mut self,
        config: &Config,
        mut table: PasswordTable,
        rng: &mut SelectionRng,
    ) -> Result<(), PrepareError> {
        self.challenge.clear();
        self.selection.clear();
        self.hashes.clear();

        let held = match fs::read_link(&self.lockfilename) {
            Ok(target) => {
                let bytes = target.as_os_str().as_bytes().to_vec();
                if bytes.len() != self.header.challen {
                    debug!(lock = %self.lockfilename.display(), "removing corrupt lock symlink");
                    let _ = fs::remove_file(&self.lockfilename);
                    return Err(PrepareError::CorruptLock);
                }
                bytes
            }
            Err(err) => {
                debug!(lock = %self.lockfilename.display(), %err, "cannot read lock target");
                let _ = fs::remove_file(&self.lockfilename);
                return Err(PrepareError::UnreadableLock(err));
            }
        };

        if self.remaining < (self.multi + 1).max(10) {
            debug!(
                remaining = self.remaining,
                "remaining passwords are not enough for a multi challenge"
            );
            return Err(PrepareError::TooFewForMulti {
                remaining: self.remaining,
            });
        }

        let entries = self.header.entries;
        let excluded = |table: &PasswordTable, j: usize| {
            table.is_consumed(j) || table.label(j) == held.as_slice()
        };
        while self.passwords < config.multi
            && self.challenge.len() + self.header.challen + 1 <= CHALLENGE_MAX
        {
            // random probe first, linear scan as the fallback
            let mut j = rng.next_index(entries);
            let mut attempts = 0;
            while excluded(&table, j) && attempts < 2 * entries {
                j = rng.next_index(entries);
                attempts += 1;
            }
            while excluded(&table, j) {
                j = (j + 1) % entries;
            }

            if self.passwords > 0 {
                self.challenge.push('/');
            }
            self.challenge
                .push_str(&String::from_utf8_lossy(table.label(j)));
            self.hashes.push(table.hash(j).to_vec());
            self.selection.push(j);
            self.passwords += 1;
            table.mark_consumed_local(j);
        }

        Ok(())
    }
}
