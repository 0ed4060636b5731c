//! Dotted version parsing and comparison.
//!
//! Versions are ordered sequences of non-negative integer components.
//! Comparison is positional with zero-padding, so "8" == "8.0".

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A parsed dotted version. Immutable once parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version(Vec<u32>);

impl Version {
    /// Parse a dotted version string.
    ///
    /// Permissive by design: a non-numeric component is treated as 0,
    /// so "8.x" parses as [8, 0] instead of failing. A leading 'v'
    /// prefix is stripped ("v20.11.1" style tags).
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        let s = s.strip_prefix('v').unwrap_or(s);
        let components = s
            .split('.')
            .map(|part| part.trim().parse::<u32>().unwrap_or(0))
            .collect();
        Version(components)
    }

    pub fn from_components(components: Vec<u32>) -> Self {
        Version(components)
    }

    pub fn components(&self) -> &[u32] {
        &self.0
    }

    /// First component, or 0 for an empty version.
    pub fn major(&self) -> u32 {
        self.0.first().copied().unwrap_or(0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// Positional comparison, padding the shorter sequence with zeros.
pub fn compare(a: &Version, b: &Version) -> Ordering {
    let len = a.0.len().max(b.0.len());
    for i in 0..len {
        let x = a.0.get(i).copied().unwrap_or(0);
        let y = b.0.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        compare(self, other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(compare(self, other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self, other)
    }
}

/// Extract version strings of the form `<name>X.Y` / `<name>-X.Y` /
/// `vX.Y.Z` from line-oriented command output, ascending and deduplicated.
///
/// This is the only package-index parsing the core does: a line-oriented
/// grep for `name-X.Y-suffix` shaped tokens.
pub fn extract_versions(output: &str, name: &str) -> Vec<Version> {
    let pattern = format!(r"{}-?(\d+(?:\.\d+)*)", regex::escape(name));
    let re = regex::Regex::new(&pattern).expect("static version pattern");

    let mut found: Vec<Version> = Vec::new();
    for line in output.lines() {
        for cap in re.captures_iter(line) {
            let version = Version::parse(&cap[1]);
            if !found.iter().any(|v| *v == version) {
                found.push(version);
            }
        }
    }
    found.sort();
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_versions_compare_equal() {
        let a = Version::parse("8.3");
        assert_eq!(compare(&a, &a), Ordering::Equal);
    }

    #[test]
    fn second_component_decides() {
        let a = Version::parse("8.3");
        let b = Version::parse("8.10");
        assert_eq!(compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn missing_trailing_component_is_zero() {
        let a = Version::parse("8");
        let b = Version::parse("8.0");
        assert_eq!(compare(&a, &b), Ordering::Equal);
        assert_eq!(a, b);
    }

    #[test]
    fn first_differing_component_wins() {
        let a = Version::parse("9.0");
        let b = Version::parse("8.9");
        assert_eq!(compare(&a, &b), Ordering::Greater);
    }

    #[test]
    fn malformed_component_parses_as_zero() {
        let a = Version::parse("8.x");
        assert_eq!(a.components(), &[8, 0]);
    }

    #[test]
    fn v_prefix_is_stripped() {
        let a = Version::parse("v20.11.1");
        assert_eq!(a.components(), &[20, 11, 1]);
    }

    #[test]
    fn display_round_trip() {
        let a = Version::parse("8.3.12");
        assert_eq!(a.to_string(), "8.3.12");
    }

    #[test]
    fn extract_from_package_listing() {
        let output = "php8.1-cli\nphp8.3-fpm\nphp8.1-fpm\nphp7.4\nnot-a-package\n";
        let versions = extract_versions(output, "php");
        let rendered: Vec<String> = versions.iter().map(|v| v.to_string()).collect();
        assert_eq!(rendered, vec!["7.4", "8.1", "8.3"]);
    }

    #[test]
    fn extract_from_tag_listing() {
        let output = "        v18.20.4   (LTS: Hydrogen)\n        v20.11.1   (LTS: Iron)\n";
        let versions = extract_versions(output, "v");
        assert_eq!(versions.last().unwrap().to_string(), "20.11.1");
    }
}
