//! The decision step: one model call, classified.

use orderdesk_core::error::ProviderError;
use orderdesk_core::message::{Message, Role};
use orderdesk_core::provider::{Provider, ProviderRequest};
use orderdesk_core::tool::ToolDeclaration;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// What the model asked for.
#[derive(Debug, Clone)]
pub enum Decision {
    /// No tool calls: the message text is the answer.
    Terminal(Message),
    /// The assistant message carrying one or more tool calls.
    Continuation(Message),
}

impl Decision {
    pub fn message(&self) -> &Message {
        match self {
            Decision::Terminal(m) | Decision::Continuation(m) => m,
        }
    }
}

/// Model settings for the decision step.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub model: String,
    pub system: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub timeout: Duration,
}

impl From<&orderdesk_config::AppConfig> for ModelSettings {
    fn from(config: &orderdesk_config::AppConfig) -> Self {
        Self {
            model: config.model.model.clone(),
            system: config.agent.system_prompt.clone(),
            temperature: config.model.temperature,
            max_tokens: Some(config.model.max_tokens),
            timeout: config.model.timeout(),
        }
    }
}

pub struct DecisionStep {
    provider: Arc<dyn Provider>,
    settings: ModelSettings,
}

impl DecisionStep {
    pub fn new(provider: Arc<dyn Provider>, settings: ModelSettings) -> Self {
        Self { provider, settings }
    }

    /// Call the model exactly once. No retries: a failure or timeout is
    /// returned as-is.
    pub async fn decide(
        &self,
        history: &[Message],
        tools: &[ToolDeclaration],
    ) -> Result<Decision, ProviderError> {
        let request = ProviderRequest {
            model: self.settings.model.clone(),
            system: self.settings.system.clone(),
            messages: history.to_vec(),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            tools: tools.to_vec(),
        };

        let timeout = self.settings.timeout;
        let response = tokio::time::timeout(timeout, self.provider.complete(request))
            .await
            .map_err(|_| ProviderError::Timeout(timeout.as_secs()))??;

        if let Some(usage) = &response.usage {
            debug!(
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Model responded"
            );
        }

        Ok(classify(response.message))
    }
}

/// Terminal when there are no tool calls, Continuation otherwise. Calls
/// without an id get a fresh one so their results can be matched.
fn classify(mut message: Message) -> Decision {
    message.role = Role::Assistant;
    if message.tool_calls.is_empty() {
        return Decision::Terminal(message);
    }
    for call in &mut message.tool_calls {
        if call.id.is_empty() {
            call.id = format!("call_{}", uuid::Uuid::new_v4().simple());
        }
    }
    Decision::Continuation(message)
}
