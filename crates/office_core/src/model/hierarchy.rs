//! Dotted-integer hierarchy paths.
//!
//! # Responsibility
//! - Parse and render office placement paths (`"."`, `".1."`, `".1.4."`).
//! - Derive parent ids and child paths without touching storage.
//!
//! # Invariants
//! - A path always starts and ends with `.`.
//! - Every segment is a positive integer without leading zeros.
//! - The root path `"."` has no segments and no parent.

use crate::model::office::OfficeId;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

static HIERARCHY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\.(?:[1-9][0-9]*\.)*$").expect("valid hierarchy regex"));

/// Error returned when a string is not a well-formed hierarchy path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyParseError {
    pub input: String,
}

impl Display for HierarchyParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed hierarchy path `{}`", self.input)
    }
}

impl Error for HierarchyParseError {}

/// Position of an office in the office tree.
///
/// Segments list ancestor ids from the root's id down to the direct parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hierarchy {
    segments: Vec<OfficeId>,
}

impl Hierarchy {
    /// The root path `"."`.
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parses a dotted-integer path.
    pub fn parse(value: &str) -> Result<Self, HierarchyParseError> {
        let malformed = || HierarchyParseError {
            input: value.to_string(),
        };
        if !HIERARCHY_RE.is_match(value) {
            return Err(malformed());
        }

        let segments = value
            .split('.')
            .filter(|segment| !segment.is_empty())
            .map(|segment| segment.parse::<OfficeId>().map_err(|_| malformed()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Direct parent id, `None` for the root.
    pub fn parent_id(&self) -> Option<OfficeId> {
        self.segments.last().copied()
    }

    /// Path of the parent office, `None` for the root.
    pub fn parent_path(&self) -> Option<Hierarchy> {
        let (_, ancestors) = self.segments.split_last()?;
        Some(Self {
            segments: ancestors.to_vec(),
        })
    }

    /// Path that a direct child of the office `office_id` (placed at `self`)
    /// must carry.
    pub fn child_path(&self, office_id: OfficeId) -> Hierarchy {
        let mut segments = self.segments.clone();
        segments.push(office_id);
        Self { segments }
    }

    /// Number of ancestors; zero for the root.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn segments(&self) -> &[OfficeId] {
        &self.segments
    }
}

impl Display for Hierarchy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(".")?;
        for segment in &self.segments {
            write!(f, "{segment}.")?;
        }
        Ok(())
    }
}

impl FromStr for Hierarchy {
    type Err = HierarchyParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl Serialize for Hierarchy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Hierarchy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::Hierarchy;

    #[test]
    fn parses_root_and_nested_paths() {
        let root = Hierarchy::parse(".").expect("root path should parse");
        assert!(root.is_root());
        assert_eq!(root.parent_id(), None);
        assert_eq!(root.parent_path(), None);

        let nested = Hierarchy::parse(".1.4.").expect("nested path should parse");
        assert_eq!(nested.segments(), &[1, 4]);
        assert_eq!(nested.parent_id(), Some(4));
        assert_eq!(nested.parent_path(), Some(Hierarchy::parse(".1.").unwrap()));
        assert_eq!(nested.depth(), 2);
    }

    #[test]
    fn rejects_malformed_paths() {
        for input in ["", "..", "1.", ".1", ".0.", ".01.", ".a.", ". .", ".1..2.", ".-1."] {
            assert!(
                Hierarchy::parse(input).is_err(),
                "`{input}` should be rejected"
            );
        }
    }

    #[test]
    fn display_matches_parsed_input() {
        for input in [".", ".1.", ".1.4.", ".12.305."] {
            assert_eq!(Hierarchy::parse(input).unwrap().to_string(), input);
        }
    }

    #[test]
    fn child_path_appends_parent_id() {
        let root = Hierarchy::root();
        assert_eq!(root.child_path(1).to_string(), ".1.");
        assert_eq!(root.child_path(1).child_path(7).to_string(), ".1.7.");
    }
}
