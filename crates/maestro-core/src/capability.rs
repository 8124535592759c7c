//! Capability tags.
//!
//! Tools and models declare what they are good at with tags drawn from a
//! fixed vocabulary. Request kinds map to required tags, and a tool becomes
//! eligible for a request when its tags intersect the required set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A capability tag from the fixed vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    General,
    Code,
    Terminal,
    Analysis,
    Debug,
    Test,
    Refactor,
    File,
    Search,
    Network,
    Documentation,
    Chat,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::General => "general",
            Capability::Code => "code",
            Capability::Terminal => "terminal",
            Capability::Analysis => "analysis",
            Capability::Debug => "debug",
            Capability::Test => "test",
            Capability::Refactor => "refactor",
            Capability::File => "file",
            Capability::Search => "search",
            Capability::Network => "network",
            Capability::Documentation => "documentation",
            Capability::Chat => "chat",
        }
    }

    /// Every tag in the vocabulary.
    pub fn all() -> &'static [Capability] {
        &[
            Capability::General,
            Capability::Code,
            Capability::Terminal,
            Capability::Analysis,
            Capability::Debug,
            Capability::Test,
            Capability::Refactor,
            Capability::File,
            Capability::Search,
            Capability::Network,
            Capability::Documentation,
            Capability::Chat,
        ]
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing a tag outside the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown capability tag: {0}")]
pub struct UnknownCapability(pub String);

impl FromStr for Capability {
    type Err = UnknownCapability;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Capability::all()
            .iter()
            .copied()
            .find(|cap| cap.as_str() == lowered)
            .ok_or_else(|| UnknownCapability(s.to_string()))
    }
}

/// Returned when building a [`CapabilitySet`] with no tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Capability set must contain at least one tag")]
pub struct EmptyCapabilitySet;

/// A non-empty, ordered set of capability tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Capability>", into = "Vec<Capability>")]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    pub fn new(tags: impl IntoIterator<Item = Capability>) -> Result<Self, EmptyCapabilitySet> {
        let set: BTreeSet<Capability> = tags.into_iter().collect();
        if set.is_empty() {
            return Err(EmptyCapabilitySet);
        }
        Ok(Self(set))
    }

    /// A set holding exactly one tag.
    pub fn single(tag: Capability) -> Self {
        Self(BTreeSet::from([tag]))
    }

    pub fn contains(&self, tag: Capability) -> bool {
        self.0.contains(&tag)
    }

    /// True when the two sets share at least one tag.
    pub fn intersects(&self, other: &CapabilitySet) -> bool {
        self.0.iter().any(|tag| other.0.contains(tag))
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<&str> = self.0.iter().map(|c| c.as_str()).collect();
        write!(f, "{{{}}}", tags.join(", "))
    }
}

impl TryFrom<Vec<Capability>> for CapabilitySet {
    type Error = EmptyCapabilitySet;

    fn try_from(value: Vec<Capability>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CapabilitySet> for Vec<Capability> {
    fn from(set: CapabilitySet) -> Self {
        set.0.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_rejected() {
        assert_eq!(CapabilitySet::new(Vec::new()), Err(EmptyCapabilitySet));
    }

    #[test]
    fn test_intersection() {
        let tool = CapabilitySet::new([Capability::Code, Capability::File]).unwrap();
        let debug = CapabilitySet::new([Capability::Debug, Capability::Code]).unwrap();
        let chat = CapabilitySet::single(Capability::Chat);

        assert!(tool.intersects(&debug));
        assert!(debug.intersects(&tool));
        assert!(!tool.intersects(&chat));
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("Terminal".parse::<Capability>().unwrap(), Capability::Terminal);
        assert_eq!(" code ".parse::<Capability>().unwrap(), Capability::Code);
        assert!("quantum".parse::<Capability>().is_err());
    }

    #[test]
    fn test_serde_roundtrip_and_empty_rejection() {
        let set = CapabilitySet::new([Capability::Debug, Capability::Code]).unwrap();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["code","debug"]"#);

        assert!(serde_json::from_str::<CapabilitySet>("[]").is_err());
    }

    #[test]
    fn test_display() {
        let set = CapabilitySet::new([Capability::Test, Capability::General]).unwrap();
        assert_eq!(set.to_string(), "{general, test}");
    }
}
