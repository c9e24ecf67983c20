//! Demonstration login driver.
//!
//! Resolves a login name, asks the library for a challenge, prompts for the
//! prefix password followed by the requested one-time passwords with echo
//! disabled, and reports the verdict. Real integrations replace this with
//! their own session plumbing; the library only ever sees a user entry and
//! the raw response string.

#![deny(unsafe_code)]

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use clap::{Arg, ArgAction, Command};
use is_terminal::IsTerminal;
use otpw::{Challenge, Config, Flags, UserEntry, Verdict};

fn main() -> ExitCode {
    let matches = Command::new("otpw-login")
        .about("Demonstration login that checks one-time passwords from a printed list")
        .arg(
            Arg::new("debug")
                .short('d')
                .action(ArgAction::SetTrue)
                .help("log library diagnostics to stderr"),
        )
        .arg(
            Arg::new("username")
                .value_name("USER")
                .help("login name; a trailing / is accepted and stripped"),
        )
        .get_matches();

    let debug = matches.get_flag("debug");
    if debug {
        tracing_subscriber::fmt()
            .with_writer(io::stderr)
            .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
            .init();
    }

    let raw = match matches.get_one::<String>("username") {
        Some(name) => name.clone(),
        None => match prompt_username() {
            Ok(name) => name,
            Err(err) => {
                eprintln!("cannot read login name: {err}");
                return ExitCode::FAILURE;
            }
        },
    };
    let username = login_name(&raw);
    if username.is_empty() {
        eprintln!("empty login name");
        return ExitCode::FAILURE;
    }

    run(username, debug)
}

fn run(username: &str, debug: bool) -> ExitCode {
    let user = match UserEntry::from_name(username) {
        Ok(Some(user)) => user,
        Ok(None) | Err(_) => {
            // deliberately the same message as a missing password file
            println!("Sorry, one-time password entry not possible at the moment.");
            return ExitCode::FAILURE;
        }
    };

    let config = Config::default();
    let flags = Flags {
        debug,
        no_lock: false,
    };
    let mut challenge = match Challenge::prepare(&config, &user, flags) {
        Ok(challenge) => challenge,
        Err(_) => {
            println!("Sorry, one-time password entry not possible at the moment.");
            return ExitCode::FAILURE;
        }
    };

    let response = match read_password(&format!("Password {}: ", challenge.challenge())) {
        Ok(response) => response,
        Err(err) => {
            eprintln!("cannot read password: {err}");
            return ExitCode::FAILURE;
        }
    };

    match challenge.verify(response.as_bytes()) {
        Verdict::Ok => {
            println!("Login correct");
            let entries = challenge.entries();
            let remaining = challenge.remaining();
            if entries > 2 * remaining {
                println!(
                    "Only {remaining} one-time passwords left ({}%), please generate a new list.",
                    remaining * 100 / entries
                );
            }
            ExitCode::SUCCESS
        }
        Verdict::Wrong | Verdict::Error => {
            println!("Login incorrect");
            ExitCode::FAILURE
        }
    }
}

fn prompt_username() -> io::Result<String> {
    print!("login: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\n', '\r']).to_owned())
}

/// Strips the trailing slash with which users traditionally request
/// one-time password mode; this demo supports no other mode.
fn login_name(raw: &str) -> &str {
    raw.strip_suffix('/').unwrap_or(raw)
}

fn read_password(prompt: &str) -> io::Result<String> {
    if io::stdin().is_terminal() {
        rpassword::prompt_password(prompt)
    } else {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\n', '\r']).to_owned())
    }
}
