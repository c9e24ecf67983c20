//! End-to-end challenge and verification flows against real files.

mod support;

use std::fs;

use otpw::{Challenge, Flags, PrepareError, Verdict};
use support::{OTPS, fixture};

#[test]
fn single_challenge_consumes_the_first_entry() {
    let fx = fixture();
    fx.write_list("foo", &OTPS);

    let mut ch = Challenge::prepare(&fx.config, &fx.user, Flags::default()).expect("prepare");
    assert_eq!(ch.challenge(), "000");
    assert_eq!(ch.passwords(), 1);
    assert_eq!(ch.entries(), 10);
    assert_eq!(ch.remaining(), 10);
    assert!(ch.locked());

    // the lock's target names the challenged entry
    let target = fs::read_link(fx.lock_path()).expect("lock symlink");
    assert_eq!(target.as_os_str(), "000");

    assert_eq!(ch.verify(b"fooaaaaaaaa"), Verdict::Ok);
    assert_eq!(ch.remaining(), 9);

    let lines = fx.entry_lines();
    assert_eq!(lines[0], "-".repeat(15));
    assert!(lines[1..].iter().all(|line| !line.starts_with('-')));
    assert!(
        fs::symlink_metadata(fx.lock_path()).is_err(),
        "lock must be released"
    );
}

#[test]
fn a_wrong_password_leaves_the_file_untouched() {
    let fx = fixture();
    fx.write_list("foo", &OTPS);
    let before = fx.read_file();

    let mut ch = Challenge::prepare(&fx.config, &fx.user, Flags::default()).expect("prepare");
    assert_eq!(ch.verify(b"fooaaaaaaab"), Verdict::Wrong);

    assert_eq!(fx.read_file(), before, "file must be byte-identical");
    assert!(
        fs::symlink_metadata(fx.lock_path()).is_err(),
        "lock must be released even on a wrong password"
    );
}

#[test]
fn confusable_keystrokes_still_verify() {
    let fx = fixture();
    fx.write_list("p", &["IO/test2", "aaaaaaaa"]);

    let mut ch = Challenge::prepare(&fx.config, &fx.user, Flags::default()).expect("prepare");
    assert_eq!(ch.verify(b"pl0\\test2"), Verdict::Ok);
}

#[test]
fn backspaces_and_stray_whitespace_are_tolerated() {
    let fx = fixture();
    fx.write_list("foo", &OTPS);

    let mut ch = Challenge::prepare(&fx.config, &fx.user, Flags::default()).expect("prepare");
    // a mistyped X erased with backspace, and a space inside the password
    assert_eq!(ch.verify(b"fooaaaa aaaX\x08a"), Verdict::Ok);
}

#[test]
fn the_handle_is_spent_by_the_first_verify() {
    let fx = fixture();
    fx.write_list("foo", &OTPS);

    let mut ch = Challenge::prepare(&fx.config, &fx.user, Flags::default()).expect("prepare");
    assert_eq!(ch.verify(b"fooaaaaaaaa"), Verdict::Ok);
    assert_eq!(ch.passwords(), 0);
    assert_eq!(ch.verify(b"fooaaaaaaaa"), Verdict::Error);
}

#[test]
fn an_empty_prefix_password_is_legal() {
    let fx = fixture();
    fx.write_list("", &OTPS);

    let mut ch = Challenge::prepare(&fx.config, &fx.user, Flags::default()).expect("prepare");
    assert_eq!(ch.verify(b"aaaaaaaa"), Verdict::Ok);
}

#[test]
fn the_no_lock_flag_skips_the_interlock() {
    let fx = fixture();
    fx.write_list("foo", &OTPS);

    let flags = Flags {
        no_lock: true,
        ..Flags::default()
    };
    let mut ch = Challenge::prepare(&fx.config, &fx.user, flags).expect("prepare");
    assert!(!ch.locked());
    assert!(
        fs::symlink_metadata(fx.lock_path()).is_err(),
        "no lock symlink may be created"
    );
    assert_eq!(ch.verify(b"fooaaaaaaaa"), Verdict::Ok);
    assert_eq!(fx.entry_lines()[0], "-".repeat(15));
}

#[test]
fn an_exhausted_list_cannot_issue_a_challenge() {
    let fx = fixture();
    let mut contents = String::from("OTPW1\n10 3 12 8\n");
    for _ in 0..10 {
        contents.push_str("---------------\n");
    }
    fx.write_raw(&contents);

    let err = Challenge::prepare(&fx.config, &fx.user, Flags::default()).expect_err("exhausted");
    assert!(matches!(err, PrepareError::Exhausted));
    assert!(
        fs::symlink_metadata(fx.lock_path()).is_err(),
        "no lock may be created for a failed prepare"
    );
}

#[test]
fn a_consumed_head_moves_the_challenge_to_the_next_live_entry() {
    let fx = fixture();
    fx.write_list("foo", &OTPS);

    let mut first = Challenge::prepare(&fx.config, &fx.user, Flags::default()).expect("prepare");
    assert_eq!(first.verify(b"fooaaaaaaaa"), Verdict::Ok);

    let mut second = Challenge::prepare(&fx.config, &fx.user, Flags::default()).expect("prepare");
    assert_eq!(second.challenge(), "001");
    assert_eq!(second.verify(b"foobcdefghi"), Verdict::Ok);
    assert_eq!(second.remaining(), 8);
}

#[test]
fn the_last_live_entry_still_single_challenges_and_locks() {
    let fx = fixture();
    let contents = format!(
        "OTPW1\n3 3 12 8\n---------------\n---------------\n002{}\n",
        support::entry_hash("foo", "aaaaaaaa")
    );
    fx.write_raw(&contents);

    let mut ch = Challenge::prepare(&fx.config, &fx.user, Flags::default()).expect("prepare");
    assert_eq!(ch.challenge(), "002");
    assert_eq!(ch.remaining(), 1);
    assert!(ch.locked());

    assert_eq!(ch.verify(b"fooaaaaaaaa"), Verdict::Ok);
    assert_eq!(ch.remaining(), 0);
    assert!(fx.entry_lines().iter().all(|line| line.starts_with('-')));
}

#[test]
fn a_missing_password_file_reports_io() {
    let fx = fixture();
    let err = Challenge::prepare(&fx.config, &fx.user, Flags::default()).expect_err("no file");
    assert!(matches!(err, PrepareError::Io(_)));
}
