use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AppError, AppResult};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";
const TEMPERATURE: f32 = 0.4;

/// "Loomia", the in-app assistant: a prompt-templating wrapper over the chat
/// completion API. The system prompt depends on whether a guest, host or
/// admin is asking; only the most recent turns of the conversation are
/// forwarded.
#[derive(Debug, Clone)]
pub struct AssistantService {
    client: Client,
    api_key: String,
    model: String,
    max_history_turns: usize,
}

// ============================================================================
// Chat Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

// ============================================================================
// Service
// ============================================================================

impl AssistantService {
    /// Returns None when no API key is configured; the endpoint then answers 503.
    pub fn new(config: &Config) -> Option<Self> {
        let api_key = config.assistant.openai_api_key.clone()?;
        Some(Self {
            client: Client::new(),
            api_key,
            model: config.assistant.model.clone(),
            max_history_turns: config.assistant.max_history_turns,
        })
    }

    pub async fn chat(
        &self,
        message: &str,
        user_role: &str,
        history: &[ChatMessage],
    ) -> AppResult<String> {
        let messages = build_messages(message, user_role, history, self.max_history_turns);

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", OPENAI_API_URL))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = match response.json::<OpenAiErrorResponse>().await {
                Ok(err) => err.error.message,
                Err(_) => format!("Chat completion failed with status {}", status),
            };
            return Err(AppError::Assistant(message));
        }

        let completion: ChatCompletionResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::Assistant("Empty completion".to_string()))
    }
}

/// Assemble the prompt: role-specific system message, bounded history, then
/// the new user message.
fn build_messages(
    message: &str,
    user_role: &str,
    history: &[ChatMessage],
    max_history_turns: usize,
) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage {
        role: "system".to_string(),
        content: system_prompt(user_role).to_string(),
    }];

    let start = history.len().saturating_sub(max_history_turns);
    messages.extend(history[start..].iter().cloned());

    messages.push(ChatMessage {
        role: "user".to_string(),
        content: message.to_string(),
    });

    messages
}

fn system_prompt(user_role: &str) -> &'static str {
    match user_role {
        "host" => {
            "You are Loomia, the Dialoom assistant for hosts. Help experts manage their \
             availability, pricing, Stripe payouts and video sessions on Dialoom. Answer \
             briefly and practically, in the language the user writes in. If a question \
             requires account-specific data you cannot see, say so and point the host to \
             the dashboard."
        }
        "admin" => {
            "You are Loomia, the Dialoom assistant for administrators. Help with platform \
             management topics: user moderation, content, bookings and payment operations. \
             Answer briefly, in the language the user writes in."
        }
        _ => {
            "You are Loomia, the Dialoom assistant for clients. Help users find experts, \
             book video consultations, understand pricing and add-on services, and join \
             their calls. Answer briefly and warmly, in the language the user writes in. \
             Never invent host names or prices."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: &str, content: &str) -> ChatMessage {
        ChatMessage {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn prompt_starts_with_role_specific_system_message() {
        let messages = build_messages("hola", "host", &[], 12);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains("hosts"));
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content, "hola");
    }

    #[test]
    fn unknown_role_gets_the_client_prompt() {
        let messages = build_messages("hi", "superuser", &[], 12);
        assert!(messages[0].content.contains("clients"));
    }

    #[test]
    fn history_is_bounded_to_most_recent_turns() {
        let history: Vec<ChatMessage> = (0..10)
            .map(|i| turn(if i % 2 == 0 { "user" } else { "assistant" }, &format!("m{}", i)))
            .collect();

        let messages = build_messages("latest", "guest", &history, 4);
        // system + 4 history turns + new message
        assert_eq!(messages.len(), 6);
        assert_eq!(messages[1].content, "m6");
        assert_eq!(messages[4].content, "m9");
        assert_eq!(messages[5].content, "latest");
    }
}
