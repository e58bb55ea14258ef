use crate::provider::{DialogueHandle, DialogueProvider, ProviderError, Role};
use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse,
    },
};
use async_trait::async_trait;
use tracing::debug;

/// Base URL of the public OpenAI API.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1/";
/// Base URL of Gemini's OpenAI-compatible endpoint.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

impl From<OpenAIError> for ProviderError {
    fn from(err: OpenAIError) -> Self {
        match err {
            OpenAIError::Reqwest(e) => ProviderError::Transport(e.to_string()),
            OpenAIError::ApiError(api) => {
                let code = api
                    .code
                    .as_ref()
                    .map(|code| format!("{code:?}"))
                    .unwrap_or_default();
                if code.contains("invalid_api_key") || code.contains("unauthorized") {
                    ProviderError::Auth(api.message)
                } else if code.contains("insufficient_quota") || code.contains("rate_limit") {
                    ProviderError::Quota(api.message)
                } else {
                    ProviderError::Other(api.message)
                }
            }
            other => ProviderError::Other(other.to_string()),
        }
    }
}

/// A [`DialogueProvider`] for any OpenAI-compatible chat-completions API.
///
/// The provider itself is stateless; the whole conversation travels on the
/// [`DialogueHandle`] and is replayed on every request.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration for the OpenAI client, including API key and base URL.
    /// * `model` - The model identifier to use for chat completions (e.g., "gemini-2.5-flash").
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

fn request_messages(
    handle: &DialogueHandle,
    text: &str,
) -> Result<Vec<ChatCompletionRequestMessage>, OpenAIError> {
    let mut messages = Vec::with_capacity(handle.history().len() + 1);
    for turn in handle.history() {
        let message: ChatCompletionRequestMessage = match turn.role {
            Role::User => ChatCompletionRequestUserMessageArgs::default()
                .content(turn.text.clone())
                .build()?
                .into(),
            Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                .content(turn.text.clone())
                .build()?
                .into(),
        };
        messages.push(message);
    }
    messages.push(
        ChatCompletionRequestUserMessageArgs::default()
            .content(text.to_string())
            .build()?
            .into(),
    );
    Ok(messages)
}

#[async_trait]
impl DialogueProvider for OpenAICompatibleClient {
    async fn open(&self, persona_prompt: &str) -> Result<DialogueHandle, ProviderError> {
        Ok(DialogueHandle::primed(persona_prompt))
    }

    async fn send(&self, handle: &mut DialogueHandle, text: &str) -> Result<String, ProviderError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(request_messages(handle, text)?)
            .build()?;

        debug!(model = %self.model, turns = handle.history().len() + 1, "Sending dialogue request");
        let response: CreateChatCompletionResponse = self.client.chat().create(request).await?;

        let reply = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                ProviderError::Other("Dialogue response had no text content.".to_string())
            })?;

        handle.record_exchange(text, &reply);
        Ok(reply)
    }
}
