use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use atelier_client::ApiClient;

use crate::types::{AiResponse, ChatReply};

const RECOMMEND_ENDPOINT: &str = "/api/smartorder/recommend";
const DEFAULT_MODEL: &str = "qwen-plus";

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Fixed sampling parameters for the recommendation call.
#[derive(Debug, Clone, Serialize)]
struct ChatParameters {
    result_format: &'static str,
    top_p: f64,
    top_k: u32,
    seed: u32,
    repetition_penalty: f64,
    max_tokens: u32,
    think_content: bool,
}

impl Default for ChatParameters {
    fn default() -> Self {
        Self {
            result_format: "message",
            top_p: 0.8,
            top_k: 0,
            seed: 1234,
            repetition_penalty: 1.1,
            max_tokens: 16000,
            think_content: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct RecommendRequest<'a> {
    model: &'a str,
    input: RequestInput<'a>,
    parameters: ChatParameters,
}

#[derive(Debug, Serialize)]
struct RequestInput<'a> {
    messages: &'a [ChatMessage],
}

/// Chat-completion-shaped proxy response.
#[derive(Debug, Deserialize)]
pub struct RecommendResponse {
    #[serde(default)]
    output: ResponseOutput,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseOutput {
    #[serde(default)]
    choices: Vec<ResponseChoice>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Value,
}

/// Client for the recommendation proxy endpoint.
#[derive(Clone)]
pub struct RecommendClient {
    client: ApiClient,
    model: String,
}

impl RecommendClient {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Send the conversation and parse the model's answer per the fixed
    /// schema, degrading to a plain-chat reply when the content is not
    /// schema-shaped JSON.
    pub async fn recommend(&self, messages: &[ChatMessage]) -> Result<AiResponse> {
        let request = RecommendRequest {
            model: &self.model,
            input: RequestInput { messages },
            parameters: ChatParameters::default(),
        };
        let response: RecommendResponse =
            self.client.post_json(RECOMMEND_ENDPOINT, &request).await?;
        let content = extract_assistant_content(&response)?;
        Ok(parse_ai_response(&content))
    }
}

/// Pull the assistant text out of the first choice: a plain string, a
/// segment array, or the legacy top-level `output.text`.
pub fn extract_assistant_content(response: &RecommendResponse) -> Result<String> {
    if let Some(choice) = response.output.choices.first() {
        match &choice.message.content {
            Value::String(text) => return Ok(text.clone()),
            Value::Array(segments) => {
                let text: String = segments
                    .iter()
                    .filter_map(|seg| {
                        seg.get("text")
                            .or_else(|| seg.get("content"))
                            .and_then(Value::as_str)
                    })
                    .collect();
                return Ok(text);
            }
            _ => {}
        }
    }
    if let Some(text) = &response.output.text {
        return Ok(text.clone());
    }
    Err(anyhow!("无法解析模型返回 content"))
}

/// Parse the schema the system prompt demands. Content that is not
/// valid schema JSON becomes a plain chat reply carrying the raw text.
pub fn parse_ai_response(content: &str) -> AiResponse {
    match serde_json::from_str::<AiResponse>(content.trim()) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::debug!("recommendation content is not schema JSON: {err}");
            AiResponse::GeneralChat {
                reply: ChatReply {
                    text: content.to_string(),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with_content(content: Value) -> RecommendResponse {
        serde_json::from_value(serde_json::json!({
            "output": {"choices": [{"message": {"content": content}}]}
        }))
        .unwrap()
    }

    #[test]
    fn extracts_string_content() {
        let response = response_with_content(Value::String("你好".to_string()));
        assert_eq!(extract_assistant_content(&response).unwrap(), "你好");
    }

    #[test]
    fn extracts_segmented_content() {
        let response = response_with_content(serde_json::json!([
            {"text": "你"},
            {"content": "好"}
        ]));
        assert_eq!(extract_assistant_content(&response).unwrap(), "你好");
    }

    #[test]
    fn falls_back_to_output_text() {
        let response: RecommendResponse =
            serde_json::from_value(serde_json::json!({"output": {"text": "直接文本"}})).unwrap();
        assert_eq!(extract_assistant_content(&response).unwrap(), "直接文本");
    }

    #[test]
    fn missing_content_is_an_error() {
        let response: RecommendResponse =
            serde_json::from_value(serde_json::json!({"output": {}})).unwrap();
        assert!(extract_assistant_content(&response).is_err());
    }

    #[test]
    fn non_schema_content_degrades_to_chat() {
        match parse_ai_response("今天天气不错，想来点凉面吗？") {
            AiResponse::GeneralChat { reply } => {
                assert_eq!(reply.text, "今天天气不错，想来点凉面吗？");
            }
            other => panic!("expected chat fallback, got {other:?}"),
        }
    }

    #[test]
    fn schema_content_parses_to_recommendation() {
        let content = r#"{"type":"product_recommendation","reply":{"text":"推荐"},"order":{"store":"面馆","items":[]}}"#;
        assert!(matches!(
            parse_ai_response(content),
            AiResponse::ProductRecommendation { .. }
        ));
    }
}
