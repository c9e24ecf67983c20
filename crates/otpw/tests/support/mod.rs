//! Shared fixtures: password lists written the way the generator prints
//! them, with zero-padded decimal labels and real entry hashes.

#![allow(dead_code)]

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use digests::Ripemd160;
use otpw::{Config, UserEntry, encoding};
use tempfile::TempDir;

/// Hash width every fixture file declares.
pub const HLEN: usize = 12;

/// Ten distinct one-time passwords drawn from the password alphabet.
pub const OTPS: [&str; 10] = [
    "aaaaaaaa", "bcdefghi", "jkmnopqr", "stuvwxyz", "ABCDEFGH", "IJKMNOPQ", "RSTUVWXY", "Zabcdefg",
    "hijkmnop", "qrstuvwx",
];

/// The hash column of a live entry, as the generator would print it.
pub fn entry_hash(prefix: &str, otp: &str) -> String {
    let mut md = Ripemd160::new();
    md.update(prefix.as_bytes());
    md.update(otp.as_bytes());
    let hash = md.finalize();
    encoding::encode(&hash, HLEN)
}

/// A login user whose home directory is a fresh temporary directory.
pub struct Fixture {
    pub dir: TempDir,
    pub user: UserEntry,
    pub config: Config,
}

impl Fixture {
    pub fn path(&self) -> PathBuf {
        self.user.home.join(".otpw")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.user.home.join(".otpw.lock")
    }

    /// Writes a password list with all entries live, labelled `000`
    /// upwards, hashed with `prefix`.
    pub fn write_list(&self, prefix: &str, otps: &[&str]) {
        let pwlen = otps[0].len();
        let mut out = format!(
            "OTPW1\n# keep this list on paper\n{} 3 {HLEN} {pwlen}\n",
            otps.len()
        );
        for (i, otp) in otps.iter().enumerate() {
            let _ = writeln!(out, "{i:03}{}", entry_hash(prefix, otp));
        }
        fs::write(self.path(), out).expect("write password file");
    }

    /// Writes raw password-file contents verbatim.
    pub fn write_raw(&self, contents: &str) {
        fs::write(self.path(), contents).expect("write password file");
    }

    pub fn read_file(&self) -> Vec<u8> {
        fs::read(self.path()).expect("read password file")
    }

    /// Entry lines of the file, header stripped.
    pub fn entry_lines(&self) -> Vec<String> {
        let text = String::from_utf8(self.read_file()).expect("file is text");
        text.lines()
            .skip_while(|line| !line.chars().next().is_some_and(|c| c.is_ascii_digit()))
            .skip(1)
            .map(str::to_owned)
            .collect()
    }
}

/// A fixture acting as the current real user, so identity switching is a
/// no-op and file access just works.
pub fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let user = UserEntry {
        name: "alice".to_owned(),
        uid: nix::unistd::geteuid().as_raw(),
        gid: nix::unistd::getegid().as_raw(),
        home: dir.path().to_path_buf(),
    };
    Fixture {
        dir,
        user,
        config: Config::default(),
    }
}
