//! Per-kind prompt templates and sampling parameters.

use maestro_core::RequestKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// System prompt and sampling parameters for one request kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            system_prompt: "You are a helpful software engineering assistant.".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
        }
    }
}

/// Partial profile read from configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileOverride {
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// Lookup table from request kind to [`Profile`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileTable {
    profiles: HashMap<RequestKind, Profile>,
}

impl Default for ProfileTable {
    fn default() -> Self {
        let entries = [
            (
                RequestKind::Chat,
                "You are a helpful software engineering assistant. Answer clearly and concisely.",
                0.7,
                2048,
            ),
            (
                RequestKind::Command,
                "You turn requests into precise terminal commands and explain what they do.",
                0.2,
                1024,
            ),
            (
                RequestKind::Analysis,
                "You analyze code for structure, quality and potential problems.",
                0.3,
                4096,
            ),
            (
                RequestKind::Refactor,
                "You refactor code while preserving its behaviour. Show the changed code.",
                0.2,
                4096,
            ),
            (
                RequestKind::Debug,
                "You diagnose bugs from code and error output and propose minimal fixes.",
                0.1,
                2048,
            ),
            (
                RequestKind::Test,
                "You write focused, deterministic tests that cover edge cases.",
                0.3,
                4096,
            ),
        ];

        let profiles = entries
            .into_iter()
            .map(|(kind, prompt, temperature, max_tokens)| {
                (
                    kind,
                    Profile {
                        system_prompt: prompt.to_string(),
                        temperature,
                        max_tokens,
                    },
                )
            })
            .collect();

        Self { profiles }
    }
}

impl ProfileTable {
    /// Profile for `kind`, or [`Profile::default`] when the table has none.
    pub fn for_kind(&self, kind: RequestKind) -> Profile {
        self.profiles.get(&kind).cloned().unwrap_or_default()
    }

    /// Apply the fields set in `patch` to the profile of `kind`.
    #[must_use]
    pub fn with_override(mut self, kind: RequestKind, patch: &ProfileOverride) -> Self {
        let profile = self.profiles.entry(kind).or_default();
        if let Some(prompt) = &patch.system_prompt {
            profile.system_prompt = prompt.clone();
        }
        if let Some(temperature) = patch.temperature {
            profile.temperature = temperature;
        }
        if let Some(max_tokens) = patch.max_tokens {
            profile.max_tokens = max_tokens;
        }
        self
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&RequestKind, &Profile)> {
        self.profiles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_a_profile() {
        let table = ProfileTable::default();
        for kind in RequestKind::all() {
            assert!(table.profiles.contains_key(kind));
        }
        assert_eq!(table.for_kind(RequestKind::Debug).temperature, 0.1);
        assert_eq!(table.for_kind(RequestKind::Analysis).max_tokens, 4096);
    }

    #[test]
    fn test_override_is_partial() {
        let table = ProfileTable::default().with_override(
            RequestKind::Debug,
            &ProfileOverride {
                temperature: Some(0.0),
                ..Default::default()
            },
        );
        let debug = table.for_kind(RequestKind::Debug);
        assert_eq!(debug.temperature, 0.0);
        assert_eq!(debug.max_tokens, 2048);
        assert!(debug.system_prompt.contains("diagnose"));
    }
}
