//! Dotted-numeric object identifiers.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static DOTTED_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+(\.[0-9]+)*$").expect("static regex"));

/// Returns true if `s` matches the dotted-numeric grammar `^[0-9]+(\.[0-9]+)*$`.
///
/// A single leading dot (net-snmp style `.1.3.6`) is not part of the grammar;
/// callers that accept it strip it first.
pub fn is_dotted_numeric(s: &str) -> bool {
    DOTTED_NUMERIC.is_match(s)
}

/// Why a string could not be turned into an [`Oid`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OidParseError {
    #[error("'{0}' is not a dotted-numeric identifier")]
    Grammar(String),

    #[error("arc '{arc}' in '{oid}' exceeds 32 bits")]
    ArcOverflow { oid: String, arc: String },
}

/// A fully numeric OID such as `1.3.6.1.2.1.1.1.0`.
///
/// Ordering is lexicographic by arc, which is the SNMP traversal order: a
/// prefix sorts before every identifier in its subtree.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Oid {
    arcs: Vec<u32>,
}

impl Oid {
    pub fn new(arcs: Vec<u32>) -> Self {
        Self { arcs }
    }

    pub fn from_slice(arcs: &[u32]) -> Self {
        Self {
            arcs: arcs.to_vec(),
        }
    }

    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    /// True if `self` equals `prefix` or lies in its subtree.
    pub fn starts_with(&self, prefix: &Oid) -> bool {
        self.arcs.starts_with(&prefix.arcs)
    }

    /// True if `self` lies strictly below `root`.
    pub fn is_descendant_of(&self, root: &Oid) -> bool {
        self.arcs.len() > root.arcs.len() && self.starts_with(root)
    }

    /// Append a single arc, returning the child identifier.
    pub fn child(&self, arc: u32) -> Oid {
        let mut arcs = self.arcs.clone();
        arcs.push(arc);
        Oid { arcs }
    }

    /// Append several arcs.
    pub fn join(&self, suffix: &[u32]) -> Oid {
        let mut arcs = self.arcs.clone();
        arcs.extend_from_slice(suffix);
        Oid { arcs }
    }

    /// Arcs of `self` after `prefix`, or None if `prefix` is not a prefix.
    pub fn suffix_after(&self, prefix: &Oid) -> Option<&[u32]> {
        self.arcs.strip_prefix(prefix.arcs.as_slice())
    }

    pub fn to_dotted(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut iter = self.arcs.iter();
        if let Some(first) = iter.next() {
            write!(f, "{first}")?;
            for arc in iter {
                write!(f, ".{arc}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for Oid {
    type Err = OidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_dotted_numeric(s) {
            return Err(OidParseError::Grammar(s.to_string()));
        }
        let arcs = s
            .split('.')
            .map(|arc| {
                arc.parse::<u32>().map_err(|_| OidParseError::ArcOverflow {
                    oid: s.to_string(),
                    arc: arc.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Oid { arcs })
    }
}

impl TryFrom<String> for Oid {
    type Error = OidParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.to_string()
    }
}

/// Format a list of arcs as a dotted suffix (`".1.2"`), empty for no arcs.
pub fn dotted_suffix(arcs: &[u32]) -> String {
    arcs.iter().map(|a| format!(".{a}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(s: &str) -> Oid {
        s.parse().unwrap()
    }

    #[test]
    fn grammar_accepts_dotted_numbers() {
        for s in ["1", "1.3", "1.3.6.1.2.1.1.1.0", "0.0", "1.3.6.1.4.1.9999.42"] {
            assert!(is_dotted_numeric(s), "{s} should match");
        }
    }

    #[test]
    fn grammar_rejects_garbage() {
        for s in ["", ".", "1..3", ".1.3", "1.3.", "1.a.3", "sysDescr", "1.3 .6", "1,3"] {
            assert!(!is_dotted_numeric(s), "{s} should not match");
        }
    }

    #[test]
    fn grammar_is_ascii_only() {
        // Arabic-Indic and fullwidth digits.
        for s in ["\u{0661}.\u{0663}", "1.\u{FF13}.6"] {
            assert!(!is_dotted_numeric(s), "{s} should not match");
            assert!(matches!(s.parse::<Oid>(), Err(OidParseError::Grammar(_))));
        }
    }

    #[test]
    fn display_roundtrip() {
        assert_eq!(oid("1.3.6.1.2.1.1.1.0").to_string(), "1.3.6.1.2.1.1.1.0");
    }

    #[test]
    fn arc_overflow_rejected() {
        let err = "1.3.99999999999".parse::<Oid>().unwrap_err();
        assert!(matches!(err, OidParseError::ArcOverflow { .. }));
    }

    #[test]
    fn ordering_is_lexicographic_by_arc() {
        // Numeric, not string, comparison: 2 < 10
        assert!(oid("1.3.6.1.2.1.2.2.1.2") < oid("1.3.6.1.2.1.2.2.1.10"));
        // Prefix sorts first
        assert!(oid("1.3.6.1") < oid("1.3.6.1.0"));
        assert!(oid("1.3.6.1.2.1.2.2.1.1.3") < oid("1.3.6.1.2.1.2.2.1.2.1"));
    }

    #[test]
    fn subtree_membership() {
        let root = oid("1.3.6.1.2.1.2.2");
        assert!(oid("1.3.6.1.2.1.2.2.1.1.1").is_descendant_of(&root));
        assert!(!root.is_descendant_of(&root));
        assert!(root.starts_with(&root));
        assert!(!oid("1.3.6.1.2.1.2.3").is_descendant_of(&root));
        assert!(!oid("1.3.6.1.2.1.2.20").is_descendant_of(&root));
    }

    #[test]
    fn suffix_after_prefix() {
        let base = oid("1.3.6.1.2.1.2.2.1.2");
        assert_eq!(oid("1.3.6.1.2.1.2.2.1.2.7").suffix_after(&base), Some(&[7][..]));
        assert_eq!(oid("1.3.6.1.2.1.1").suffix_after(&base), None);
        assert_eq!(dotted_suffix(&[7, 1]), ".7.1");
        assert_eq!(dotted_suffix(&[]), "");
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&oid("1.3.6.1")).unwrap();
        assert_eq!(json, r#""1.3.6.1""#);
        let back: Oid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, oid("1.3.6.1"));
        assert!(serde_json::from_str::<Oid>(r#""1..3""#).is_err());
    }
}
