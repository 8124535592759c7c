//! Request kind → required capability tags.

use maestro_core::{Capability, CapabilitySet, RequestKind};
use std::collections::HashMap;

/// Maps each request kind to the capability tags a tool must offer (at
/// least one of) to be dispatched for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityTable {
    required: HashMap<RequestKind, CapabilitySet>,
}

impl Default for EligibilityTable {
    fn default() -> Self {
        use Capability::*;

        let entries: [(RequestKind, &[Capability]); 6] = [
            (RequestKind::Chat, &[General, Chat, Search]),
            (RequestKind::Command, &[Terminal, File, General]),
            (RequestKind::Analysis, &[Analysis, Code, Search, General]),
            (RequestKind::Refactor, &[Refactor, Code, File, Analysis]),
            (RequestKind::Debug, &[Debug, Code, Terminal, Analysis, General]),
            (RequestKind::Test, &[Test, Code, Terminal, General]),
        ];

        let required = entries
            .into_iter()
            .filter_map(|(kind, tags)| {
                CapabilitySet::new(tags.iter().copied())
                    .ok()
                    .map(|set| (kind, set))
            })
            .collect();

        Self { required }
    }
}

impl EligibilityTable {
    /// Replace the required tags for one kind.
    #[must_use]
    pub fn with_kind(mut self, kind: RequestKind, tags: CapabilitySet) -> Self {
        self.required.insert(kind, tags);
        self
    }

    pub fn required_for(&self, kind: RequestKind) -> Option<&CapabilitySet> {
        self.required.get(&kind)
    }

    /// True when `capabilities` intersects the required set for `kind`.
    pub fn is_eligible(&self, kind: RequestKind, capabilities: &CapabilitySet) -> bool {
        self.required_for(kind)
            .is_some_and(|required| required.intersects(capabilities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_every_kind_has_an_entry() {
        let table = EligibilityTable::default();
        for kind in RequestKind::all() {
            assert!(table.required_for(*kind).is_some(), "missing {kind}");
        }
    }

    #[rstest]
    #[case(RequestKind::Debug, Capability::Terminal, true)]
    #[case(RequestKind::Debug, Capability::Chat, false)]
    #[case(RequestKind::Chat, Capability::Search, true)]
    #[case(RequestKind::Chat, Capability::Code, false)]
    #[case(RequestKind::Refactor, Capability::File, true)]
    #[case(RequestKind::Refactor, Capability::General, false)]
    #[case(RequestKind::Test, Capability::Test, true)]
    #[case(RequestKind::Command, Capability::Network, false)]
    fn test_eligibility(
        #[case] kind: RequestKind,
        #[case] tag: Capability,
        #[case] expected: bool,
    ) {
        let table = EligibilityTable::default();
        assert_eq!(
            table.is_eligible(kind, &CapabilitySet::single(tag)),
            expected
        );
    }

    #[test]
    fn test_override() {
        let table = EligibilityTable::default()
            .with_kind(RequestKind::Chat, CapabilitySet::single(Capability::Network));
        assert!(table.is_eligible(RequestKind::Chat, &CapabilitySet::single(Capability::Network)));
        assert!(!table.is_eligible(RequestKind::Chat, &CapabilitySet::single(Capability::General)));
    }
}
