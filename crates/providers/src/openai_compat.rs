//! OpenAI-compatible provider implementation.
//!
//! Works with: OpenAI, OpenRouter, Gemini (OpenAI surface), Ollama, vLLM,
//! Together AI, and any OpenAI-compatible endpoint.
//!
//! Supports:
//! - Chat completions with tool use / function calling
//! - Embeddings
//! - Health checks

use async_trait::async_trait;
use jobsuite_core::error::ProviderError;
use jobsuite_core::message::{Role, Turn, TurnToolCall};
use jobsuite_core::provider::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// An OpenAI-compatible provider.
///
/// Most hosted and local model servers expose `/chat/completions` and
/// `/embeddings` with this shape.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: build_client(Duration::from_secs(120)),
        }
    }

    /// Bound every HTTP request made by this provider.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Create a Gemini provider through its OpenAI-compatible surface.
    pub fn gemini(api_key: impl Into<String>) -> Self {
        Self::new(
            "gemini",
            "https://generativelanguage.googleapis.com/v1beta/openai",
            api_key,
        )
    }

    /// Create an Ollama provider (convenience constructor).
    pub fn ollama(base_url: Option<&str>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
        )
    }

    /// Convert the policy and turns to OpenAI API messages.
    ///
    /// The policy becomes a leading system message.
    fn to_api_messages(system: &str, turns: &[Turn]) -> Vec<ApiMessage> {
        let mut messages = Vec::with_capacity(turns.len() + 1);
        if !system.is_empty() {
            messages.push(ApiMessage {
                role: "system".into(),
                content: Some(system.to_string()),
                tool_calls: None,
                tool_call_id: None,
            });
        }

        messages.extend(turns.iter().map(|t| ApiMessage {
            role: match t.role {
                Role::User => "user".into(),
                Role::Model => "assistant".into(),
                Role::Tool => "tool".into(),
            },
            content: Some(t.content.clone()),
            tool_calls: if t.tool_calls.is_empty() {
                None
            } else {
                Some(
                    t.tool_calls
                        .iter()
                        .map(|tc| ApiToolCall {
                            id: tc.id.clone(),
                            r#type: "function".into(),
                            function: ApiFunction {
                                name: tc.name.clone(),
                                arguments: tc.arguments.clone(),
                            },
                        })
                        .collect(),
                )
            },
            tool_call_id: t.tool_call_id.clone(),
        }));

        messages
    }

    /// Convert tool definitions to OpenAI API format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    /// Map non-200 statuses to provider errors.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        Ok(response)
    }
}

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

fn map_send_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.system, &request.turns),
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        debug!(
            provider = %self.name,
            model = %request.model,
            turns = request.turns.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        let response = Self::check_status(response).await?;

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        parse_completion(api_response)
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(map_send_error)?;

        Ok(response.status().is_success())
    }

    async fn embed(
        &self,
        request: EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, ProviderError> {
        let url = format!("{}/embeddings", self.base_url);

        let body = serde_json::json!({
            "model": request.model,
            "input": request.inputs,
            "encoding_format": "float",
        });

        debug!(
            provider = %self.name,
            model = %request.model,
            count = request.inputs.len(),
            "Sending embedding request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        let response = Self::check_status(response).await?;

        let api_resp: EmbeddingApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse embedding response: {e}"),
            })?;

        parse_embeddings(api_resp, request.inputs.len())
    }
}

/// Turn the first choice of a chat completion into a model turn.
fn parse_completion(api_response: ApiResponse) -> Result<ProviderResponse, ProviderError> {
    let choice = api_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::ApiError {
            status_code: 200,
            message: "No choices in response".into(),
        })?;

    let tool_calls: Vec<TurnToolCall> = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| TurnToolCall {
            id: tc.id,
            name: tc.function.name,
            arguments: tc.function.arguments,
        })
        .collect();

    let content = choice.message.content.unwrap_or_default();
    let turn = if tool_calls.is_empty() {
        Turn::model(content)
    } else {
        Turn::model_tool_calls(content, tool_calls)
    };

    let usage = api_response.usage.map(|u| Usage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    Ok(ProviderResponse {
        turn,
        usage,
        model: api_response.model,
    })
}

/// Order embeddings by their `index` and check one came back per input.
fn parse_embeddings(
    api_resp: EmbeddingApiResponse,
    expected: usize,
) -> Result<EmbeddingResponse, ProviderError> {
    let mut data = api_resp.data;
    data.sort_by_key(|d| d.index);

    if data.len() != expected {
        return Err(ProviderError::ApiError {
            status_code: 200,
            message: format!("Expected {expected} embeddings, got {}", data.len()),
        });
    }

    Ok(EmbeddingResponse {
        embeddings: data.into_iter().map(|d| d.embedding).collect(),
        model: api_resp.model,
    })
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

// --- Embedding API types ---

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    model: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemini_constructor() {
        let provider = OpenAiCompatProvider::gemini("key");
        assert_eq!(provider.name(), "gemini");
        assert!(provider.base_url.contains("generativelanguage.googleapis.com"));
    }

    #[test]
    fn ollama_constructor() {
        let provider = OpenAiCompatProvider::ollama(None);
        assert_eq!(provider.name(), "ollama");
        assert!(provider.base_url.contains("localhost:11434"));
    }

    #[test]
    fn trailing_slash_trimmed() {
        let provider = OpenAiCompatProvider::new("custom", "http://localhost:8000/v1/", "");
        assert_eq!(provider.base_url, "http://localhost:8000/v1");
    }

    #[test]
    fn policy_becomes_system_message() {
        let turns = vec![Turn::user("Find analyst roles")];
        let api_messages = OpenAiCompatProvider::to_api_messages("routing policy", &turns);
        assert_eq!(api_messages.len(), 2);
        assert_eq!(api_messages[0].role, "system");
        assert_eq!(api_messages[0].content.as_deref(), Some("routing policy"));
        assert_eq!(api_messages[1].role, "user");
    }

    #[test]
    fn model_turn_maps_to_assistant_with_calls() {
        let turn = Turn::model_tool_calls(
            "",
            vec![TurnToolCall {
                id: "call_1".into(),
                name: "query_structured".into(),
                arguments: r#"{"query":"SELECT 1"}"#.into(),
            }],
        );
        let api_msgs = OpenAiCompatProvider::to_api_messages("", &[turn]);
        assert_eq!(api_msgs.len(), 1);
        assert_eq!(api_msgs[0].role, "assistant");
        let tc = api_msgs[0].tool_calls.as_ref().unwrap();
        assert_eq!(tc[0].function.name, "query_structured");
        assert_eq!(tc[0].r#type, "function");
    }

    #[test]
    fn tool_result_keeps_call_id() {
        let api_msgs =
            OpenAiCompatProvider::to_api_messages("", &[Turn::tool_result("call_1", "rows")]);
        assert_eq!(api_msgs[0].role, "tool");
        assert_eq!(api_msgs[0].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn tool_definition_conversion() {
        let tools = vec![ToolDefinition {
            name: "search_semantic".into(),
            description: "Search job descriptions".into(),
            parameters: serde_json::json!({"type": "object"}),
        }];
        let api_tools = OpenAiCompatProvider::to_api_tools(&tools);
        assert_eq!(api_tools.len(), 1);
        assert_eq!(api_tools[0].function.name, "search_semantic");
    }

    #[test]
    fn parse_tool_call_completion() {
        let data = r#"{
            "model": "gpt-4o",
            "choices": [{"message": {"role": "assistant", "content": null, "tool_calls": [
                {"id": "call_a", "type": "function", "function": {"name": "search_semantic", "arguments": "{\"query\":\"reporting\"}"}}
            ]}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        let response = parse_completion(parsed).unwrap();
        assert!(response.turn.is_tool_call());
        assert_eq!(response.turn.tool_calls[0].id, "call_a");
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn parse_text_completion() {
        let data = r#"{"model": "gpt-4o", "choices": [{"message": {"role": "assistant", "content": "42 students"}}]}"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        let response = parse_completion(parsed).unwrap();
        assert_eq!(response.turn.role, Role::Model);
        assert_eq!(response.turn.content, "42 students");
        assert!(response.usage.is_none());
    }

    #[test]
    fn completion_without_choices_is_error() {
        let parsed: ApiResponse = serde_json::from_str(r#"{"model": "m", "choices": []}"#).unwrap();
        assert!(parse_completion(parsed).is_err());
    }

    #[test]
    fn embeddings_reordered_by_index() {
        let data = r#"{
            "data": [
                {"embedding": [0.4, 0.5], "index": 1},
                {"embedding": [0.1, 0.2], "index": 0}
            ],
            "model": "text-embedding-3-small"
        }"#;
        let parsed: EmbeddingApiResponse = serde_json::from_str(data).unwrap();
        let response = parse_embeddings(parsed, 2).unwrap();
        assert_eq!(response.embeddings[0], vec![0.1, 0.2]);
        assert_eq!(response.embeddings[1], vec![0.4, 0.5]);
    }

    #[test]
    fn embedding_count_mismatch_is_error() {
        let data = r#"{"data": [{"embedding": [0.1], "index": 0}], "model": "m"}"#;
        let parsed: EmbeddingApiResponse = serde_json::from_str(data).unwrap();
        assert!(parse_embeddings(parsed, 2).is_err());
    }
}
