//! Dotted-numeric version ordering
//!
//! Versions compare segment by segment as integers, with the shorter side
//! padded by zeros, so `9.0.50 > 9.0.9` and `1.0 == 1.0.0`.

use crate::error::XtaskError;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

const SEPARATOR: char = '.';

/// A parsed version: a non-empty list of non-negative integers.
#[derive(Clone, Debug)]
pub struct Version {
    segments: Vec<u64>,
}

impl FromStr for Version {
    type Err = XtaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: String| XtaskError::MalformedVersion {
            version: s.to_string(),
            reason,
        };

        if s.is_empty() {
            return Err(malformed("empty version string".to_string()));
        }

        let segments = s
            .split(SEPARATOR)
            .enumerate()
            .map(|(i, seg)| {
                if seg.is_empty() {
                    return Err(malformed(format!("segment {} is empty", i + 1)));
                }
                if !seg.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(malformed(format!("segment '{seg}' is not a number")));
                }
                seg.parse::<u64>()
                    .map_err(|e| malformed(format!("segment '{seg}': {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Version { segments })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.segments.iter().map(u64::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let a = self.segments.get(i).copied().unwrap_or(0);
            let b = other.segments.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

/// Compare two version strings numerically.
pub fn compare(a: &str, b: &str) -> Result<Ordering, XtaskError> {
    let a: Version = a.parse()?;
    let b: Version = b.parse()?;
    Ok(a.cmp(&b))
}

/// True when `actual` is at least `required`.
pub fn meets_minimum(required: &str, actual: &str) -> Result<bool, XtaskError> {
    Ok(compare(actual, required)? != Ordering::Less)
}

/// Pull the version token out of free-form tool output such as
/// `QEMU emulator version 9.1.0 (Debian 1:9.1.0+ds-1)`.
///
/// The token is the leading dotted-numeric run of the word following
/// `version`, so `9.1.0-rc0` yields `9.1.0`. Returns `None` when no such
/// word exists.
pub fn extract_version(output: &str) -> Option<Version> {
    let mut words = output.split_whitespace();
    while let Some(word) = words.next() {
        if !word.eq_ignore_ascii_case("version") {
            continue;
        }
        let token = words.next()?;
        let end = token
            .find(|c: char| !(c.is_ascii_digit() || c == SEPARATOR))
            .unwrap_or(token.len());
        if let Ok(v) = token[..end].trim_end_matches(SEPARATOR).parse() {
            return Some(v);
        }
    }
    None
}
