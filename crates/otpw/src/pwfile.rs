//! On-disk password-file format.
//!
//! Layout: the magic line, an optional `#` comment line, a header of four
//! decimal integers (`entries challen hlen pwlen`), then exactly `entries`
//! password lines of `challen + hlen` bytes plus newline. A live line is a
//! challenge label followed by the encoded hash of prefix password and
//! one-time password; a consumed line is all hyphens. Every line has the
//! same length, which is what makes the in-place consumption rewrite safe.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::config::{CHALLENGE_MAX, Config};
use crate::error::PrepareError;

/// Header parameters of a password file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Header {
    /// Number of password lines in the file.
    pub(crate) entries: usize,
    /// Challenge label width in bytes.
    pub(crate) challen: usize,
    /// Encoded hash width in bytes.
    pub(crate) hlen: usize,
    /// One-time password length the user was told to print.
    pub(crate) pwlen: usize,
}

impl Header {
    /// Bytes per password line, excluding the newline.
    pub(crate) fn stride(&self) -> usize {
        self.challen + self.hlen
    }
}

/// A parsed password file: header plus a flat row table.
pub(crate) struct PasswordTable {
    pub(crate) header: Header,
    rows: Vec<u8>,
    remaining: usize,
}

impl PasswordTable {
    /// Opens and parses `path` under the current effective identity.
    pub(crate) fn load(path: &Path, config: &Config) -> Result<Self, PrepareError> {
        let file = File::open(path)?;
        Self::parse(BufReader::new(file), config)
    }

    /// Parses the format described in the module docs.
    pub(crate) fn parse<R: BufRead>(
        mut reader: R,
        config: &Config,
    ) -> Result<Self, PrepareError> {
        let mut line = Vec::new();
        read_line(&mut reader, &mut line)?;
        // the configured magic carries its newline, read_line strips it
        let magic = config.magic.as_bytes();
        if line != magic.strip_suffix(b"\n").unwrap_or(magic) {
            return Err(PrepareError::BadMagic);
        }

        read_line(&mut reader, &mut line)?;
        if line.first() == Some(&b'#') {
            read_line(&mut reader, &mut line)?;
        }
        let header = parse_header(&line, config)?;

        let stride = header.stride();
        let mut rows = Vec::with_capacity(header.entries * stride);
        let mut remaining = 0;
        for _ in 0..header.entries {
            read_line(&mut reader, &mut line).map_err(|_| PrepareError::Truncated)?;
            if line.len() != stride {
                return Err(PrepareError::Truncated);
            }
            if line[0] != b'-' {
                remaining += 1;
            }
            rows.extend_from_slice(&line);
        }

        Ok(Self {
            header,
            rows,
            remaining,
        })
    }

    /// Live entries left in the table.
    pub(crate) fn remaining(&self) -> usize {
        self.remaining
    }

    pub(crate) fn is_consumed(&self, index: usize) -> bool {
        self.rows[index * self.header.stride()] == b'-'
    }

    /// Index of the first live entry, scanning in file order.
    pub(crate) fn first_live(&self) -> Option<usize> {
        (0..self.header.entries).find(|&i| !self.is_consumed(i))
    }

    pub(crate) fn label(&self, index: usize) -> &[u8] {
        let start = index * self.header.stride();
        &self.rows[start..start + self.header.challen]
    }

    pub(crate) fn hash(&self, index: usize) -> &[u8] {
        let start = index * self.header.stride() + self.header.challen;
        &self.rows[start..start + self.header.hlen]
    }

    /// Marks an entry consumed in the local table only, so one challenge
    /// cannot select it twice. The file on disk is untouched.
    pub(crate) fn mark_consumed_local(&mut self, index: usize) {
        self.rows[index * self.header.stride()] = b'-';
        self.remaining -= 1;
    }
}

/// Reads one newline-terminated line into `buf`, stripping the newline.
/// A missing newline or end of file is an error.
fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> Result<(), PrepareError> {
    buf.clear();
    reader.read_until(b'\n', buf)?;
    if buf.pop() != Some(b'\n') {
        return Err(PrepareError::MalformedHeader);
    }
    Ok(())
}

/// Parses the four header integers and checks every format bound.
fn parse_header(line: &[u8], config: &Config) -> Result<Header, PrepareError> {
    let text = std::str::from_utf8(line).map_err(|_| PrepareError::MalformedHeader)?;
    let mut fields = text.split_whitespace().map(str::parse::<i64>);
    let mut next = || -> Result<i64, PrepareError> {
        match fields.next() {
            Some(Ok(value)) => Ok(value),
            _ => Err(PrepareError::MalformedHeader),
        }
    };
    let entries = next()?;
    let challen = next()?;
    let hlen = next()?;
    let pwlen = next()?;

    let multi = config.multi as i64;
    if !(1..=9999).contains(&entries)
        || !(1..=CHALLENGE_MAX as i64).contains(&challen)
        || (challen + 1).saturating_mul(multi) > CHALLENGE_MAX as i64
        || !(4..=999).contains(&pwlen)
        || hlen != config.hash_len as i64
    {
        return Err(PrepareError::HeaderOutOfRange {
            entries,
            challen,
            hlen,
            pwlen,
        });
    }

    Ok(Header {
        entries: entries as usize,
        challen: challen as usize,
        hlen: hlen as usize,
        pwlen: pwlen as usize,
    })
}

/// Overwrites the selected password lines with hyphens, in place.
///
/// Reopens `path` read-write, revalidates that magic and header still
/// match what was parsed at challenge time, then seeks to the byte-exact
/// offset of every selected line and replaces it with `challen + hlen`
/// hyphens plus newline. Line lengths never change, so the offsets of the
/// untouched lines stay valid. The rewrite is made durable before success
/// is reported.
pub(crate) fn consume(
    path: &Path,
    magic: &str,
    header: Header,
    selection: &[usize],
) -> io::Result<usize> {
    let mut file = File::options().read(true).write(true).open(path)?;
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)?;

    let mut pos = magic.len();
    if !contents.starts_with(magic.as_bytes()) {
        return Err(invalid("magic line changed under us"));
    }
    if contents.get(pos) == Some(&b'#') {
        pos = line_end(&contents, pos)? + 1;
    }
    let header_end = line_end(&contents, pos)?;
    let on_disk = std::str::from_utf8(&contents[pos..header_end])
        .map_err(|_| invalid("header is not text"))?;
    let declared: Vec<usize> = on_disk
        .split_whitespace()
        .take(4)
        .map_while(|field| field.parse().ok())
        .collect();
    if declared != [header.entries, header.challen, header.hlen, header.pwlen] {
        return Err(invalid("header changed under us"));
    }
    pos = header_end + 1;

    let stride = header.stride();
    let mut hyphens = vec![b'-'; stride + 1];
    hyphens[stride] = b'\n';
    let mut cleared = 0;
    for &index in selection {
        let offset = pos + index * (stride + 1);
        if offset + stride + 1 > contents.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "password file shrank under us",
            ));
        }
        file.seek(SeekFrom::Start(offset as u64))?;
        file.write_all(&hyphens)?;
        cleared += 1;
    }
    file.sync_all()?;
    Ok(cleared)
}

fn line_end(contents: &[u8], from: usize) -> io::Result<usize> {
    contents[from..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|i| from + i)
        .ok_or_else(|| invalid("unterminated line"))
}

fn invalid(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.to_owned())
}
