//! Ordering for release version strings.
//!
//! Versions are compared as dot-ish sequences of integers with an optional
//! release-candidate marker:
//!
//! ```text
//! 1.0-rc.1  <  1.0-rc.2  <  1.0  =  1.0.0  <  1.0.1  <  9.0.20  <  9.1
//! ```
//!
//! Anything between digit runs is a separator, missing components count as
//! `0`, and a version without an `rc` marker sorts above the same version with
//! one.

use std::cmp::Ordering;

use once_cell::sync::Lazy;
use regex::Regex;

static RC_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)rc[^0-9]*([0-9]*)").expect("rc marker pattern is valid"));

static SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9]+").expect("separator pattern is valid"));

/// A version string broken into its numeric components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedVersion {
    /// Components of the version with any `rc` marker removed.
    pub main: Vec<u64>,
    /// Components of the `rc` marker, when one is present.
    pub pre_release: Option<Vec<u64>>,
}

impl ParsedVersion {
    pub fn parse(version: &str) -> Self {
        match RC_MARKER.captures(version) {
            Some(caps) => {
                let marker = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
                let digits = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                let stripped = format!("{}{}", &version[..marker.start], &version[marker.end..]);
                Self {
                    main: components(&stripped),
                    pre_release: Some(components(digits)),
                }
            }
            None => Self {
                main: components(version),
                pre_release: None,
            },
        }
    }

    pub fn is_pre_release(&self) -> bool {
        self.pre_release.is_some()
    }
}

/// Compare two version strings, ascending.
pub fn compare(a: &str, b: &str) -> Ordering {
    let a = ParsedVersion::parse(a);
    let b = ParsedVersion::parse(b);

    compare_components(&a.main, &b.main).then_with(|| match (&a.pre_release, &b.pre_release) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a_rc), Some(b_rc)) => compare_components(a_rc, b_rc),
    })
}

/// Component-wise comparison, padding the shorter sequence with zeros.
fn compare_components(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let left = a.get(i).copied().unwrap_or(0);
        let right = b.get(i).copied().unwrap_or(0);
        match left.cmp(&right) {
            Ordering::Equal => continue,
            decided => return decided,
        }
    }
    Ordering::Equal
}

/// Split on every run of non-digits. Empty or oversized pieces become `0`.
fn components(version: &str) -> Vec<u64> {
    if !version.bytes().any(|b| b.is_ascii_digit()) {
        return vec![0];
    }
    SEPARATORS
        .split(version)
        .map(|piece| piece.parse().unwrap_or(0))
        .collect()
}
