//! Model selection policy.
//!
//! Resolution order for a request:
//!
//! 1. The preferred model, if any provider lists a matching name
//! 2. The first name from the per-kind preference table that is listed
//! 3. The first listed model
//! 4. [`OrchestratorError::NoModelsAvailable`]
//!
//! Names match exactly first, then as a case-insensitive substring. When a
//! preferred provider is given, its matches win over other providers'.

use maestro_core::{ModelDescriptor, OrchestratorError, OrchestratorResult, RequestKind};
use std::collections::HashMap;

/// Picks one model for a request from the current listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionPolicy {
    preferences: HashMap<RequestKind, Vec<String>>,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        const GPT: &str = "gpt-4o";
        const CLAUDE: &str = "claude-3-5-sonnet";
        const GEMINI: &str = "gemini-pro";
        const CODELLAMA: &str = "codellama";

        let table: [(RequestKind, &[&str]); 6] = [
            (RequestKind::Chat, &[GPT, CLAUDE, GEMINI, CODELLAMA]),
            (RequestKind::Command, &[GPT, CLAUDE, CODELLAMA]),
            (RequestKind::Analysis, &[CLAUDE, GPT, GEMINI]),
            (RequestKind::Refactor, &[CLAUDE, GPT, CODELLAMA]),
            (RequestKind::Debug, &[GPT, CLAUDE, CODELLAMA]),
            (RequestKind::Test, &[GPT, CLAUDE, CODELLAMA]),
        ];

        let preferences = table
            .into_iter()
            .map(|(kind, names)| (kind, names.iter().map(|n| n.to_string()).collect()))
            .collect();

        Self { preferences }
    }
}

type Matcher = fn(&ModelDescriptor, &str) -> bool;

fn exact(model: &ModelDescriptor, wanted: &str) -> bool {
    model.name == wanted
}

fn fuzzy(model: &ModelDescriptor, wanted: &str) -> bool {
    model.name.to_lowercase().contains(&wanted.to_lowercase())
}

fn find_by_name<'a>(
    models: &'a [ModelDescriptor],
    wanted: &str,
    provider: Option<&str>,
) -> Option<&'a ModelDescriptor> {
    const MATCHERS: [Matcher; 2] = [exact, fuzzy];

    MATCHERS.iter().find_map(|matches| {
        let from_provider = provider.and_then(|p| {
            models
                .iter()
                .find(|m| m.provider_name == p && matches(m, wanted))
        });
        from_provider.or_else(|| models.iter().find(|m| matches(m, wanted)))
    })
}

impl SelectionPolicy {
    /// Replace the preference list for one kind.
    #[must_use]
    pub fn with_preferences<I, S>(mut self, kind: RequestKind, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferences
            .insert(kind, names.into_iter().map(Into::into).collect());
        self
    }

    pub fn preferences_for(&self, kind: RequestKind) -> &[String] {
        self.preferences
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Select from `models`, the union of every provider's listing.
    pub fn select(
        &self,
        models: &[ModelDescriptor],
        kind: RequestKind,
        preferred_model: Option<&str>,
        preferred_provider: Option<&str>,
    ) -> OrchestratorResult<ModelDescriptor> {
        if let Some(wanted) = preferred_model {
            if let Some(model) = find_by_name(models, wanted, preferred_provider) {
                return Ok(model.clone());
            }
            tracing::debug!(
                preferred_model = wanted,
                "Preferred model not listed, falling back to kind preferences"
            );
        }

        for name in self.preferences_for(kind) {
            if let Some(model) = find_by_name(models, name, preferred_provider) {
                return Ok(model.clone());
            }
        }

        let from_provider = preferred_provider
            .and_then(|p| models.iter().find(|m| m.provider_name == p));
        from_provider
            .or_else(|| models.first())
            .cloned()
            .ok_or(OrchestratorError::NoModelsAvailable)
    }
}
