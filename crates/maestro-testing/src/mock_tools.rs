//! # Mock Tools for Testing
//!
//! Tools that return predictable responses and record how they were called.

use async_trait::async_trait;
use maestro_core::{Capability, CapabilitySet};
use maestro_tools::{Tool, ToolContext, ToolDescriptor, ToolError};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A mock tool that returns predefined responses keyed by request content.
///
/// Clones share call tracking, so a test can keep one handle and register
/// another.
#[derive(Debug, Clone)]
pub struct MockTool {
    descriptor: ToolDescriptor,
    responses: HashMap<String, Result<Value, String>>,
    default_response: Option<Result<Value, String>>,
    delay: Option<Duration>,
    available: bool,
    panics: bool,
    call_count: Arc<Mutex<usize>>,
    call_history: Arc<Mutex<Vec<Value>>>,
}

impl MockTool {
    /// Create a mock tool with the given name and capability tags.
    ///
    /// An empty tag list falls back to `general`.
    pub fn new(name: impl Into<String>, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        let name = name.into();
        let capabilities = CapabilitySet::new(capabilities)
            .unwrap_or_else(|_| CapabilitySet::single(Capability::General));
        Self {
            descriptor: ToolDescriptor::new(name.clone(), format!("Mock tool {name}"), capabilities),
            responses: HashMap::new(),
            default_response: None,
            delay: None,
            available: true,
            panics: false,
            call_count: Arc::new(Mutex::new(0)),
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Respond with `response` when the request content equals `input`.
    pub fn with_response(mut self, input: impl Into<String>, response: impl Into<Value>) -> Self {
        self.responses.insert(input.into(), Ok(response.into()));
        self
    }

    /// Fail with `error` when the request content equals `input`.
    pub fn with_failure(mut self, input: impl Into<String>, error: impl Into<String>) -> Self {
        self.responses.insert(input.into(), Err(error.into()));
        self
    }

    pub fn with_default_response(mut self, response: impl Into<Value>) -> Self {
        self.default_response = Some(Ok(response.into()));
        self
    }

    pub fn with_default_failure(mut self, error: impl Into<String>) -> Self {
        self.default_response = Some(Err(error.into()));
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Report the tool as unavailable.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Panic on every call.
    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    pub fn call_count(&self) -> usize {
        *lock(&self.call_count)
    }

    /// Arguments of every call, in order.
    pub fn call_history(&self) -> Vec<Value> {
        lock(&self.call_history).clone()
    }

    /// Check if the tool was called for a request with this content.
    pub fn was_called_with(&self, content: &str) -> bool {
        lock(&self.call_history)
            .iter()
            .any(|args| args.get("content").and_then(Value::as_str) == Some(content))
    }

    pub fn reset(&self) {
        *lock(&self.call_count) = 0;
        lock(&self.call_history).clear();
    }
}

fn content_key(args: &Value) -> String {
    match args.get("content").and_then(Value::as_str) {
        Some(content) => content.to_string(),
        None => args.to_string(),
    }
}

#[async_trait]
impl Tool for MockTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn invoke(&self, args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        *lock(&self.call_count) += 1;
        lock(&self.call_history).push(args.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.panics {
            panic!("mock tool '{}' panicked", self.descriptor.name);
        }

        let key = content_key(&args);
        let outcome = self
            .responses
            .get(&key)
            .or(self.default_response.as_ref())
            .cloned()
            .unwrap_or_else(|| Ok(Value::String(format!("Mock response for: {key}"))));
        outcome.map_err(ToolError::Execution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_core::RequestId;
    use serde_json::json;

    fn ctx() -> ToolContext {
        ToolContext::new(RequestId::new_unchecked("r1"), ".")
    }

    #[tokio::test]
    async fn test_matched_and_default_responses() {
        let tool = MockTool::new("lint", [Capability::Code])
            .with_response("fix it", json!("fixed"))
            .with_failure("break it", "boom");

        let ok = tool.invoke(json!({ "content": "fix it" }), &ctx()).await;
        assert_eq!(ok, Ok(json!("fixed")));

        let err = tool.invoke(json!({ "content": "break it" }), &ctx()).await;
        assert_eq!(err, Err(ToolError::Execution("boom".to_string())));

        let fallback = tool.invoke(json!({ "content": "other" }), &ctx()).await;
        assert_eq!(fallback, Ok(json!("Mock response for: other")));
    }

    #[tokio::test]
    async fn test_clones_share_tracking() {
        let tool = MockTool::new("lint", [Capability::Code]);
        let handle = tool.clone();

        tool.invoke(json!({ "content": "a" }), &ctx()).await.unwrap();
        tool.invoke(json!({ "content": "b" }), &ctx()).await.unwrap();

        assert_eq!(handle.call_count(), 2);
        assert!(handle.was_called_with("b"));
        handle.reset();
        assert_eq!(tool.call_count(), 0);
        assert!(tool.call_history().is_empty());
    }

    #[test]
    fn test_empty_capabilities_fall_back_to_general() {
        let tool = MockTool::new("misc", Vec::<Capability>::new());
        assert!(tool.capabilities().contains(Capability::General));
        assert!(!tool.clone().unavailable().is_available());
    }
}
