use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::ai::prompt::{build_prompt, SYSTEM_PROMPT};
use crate::ai::IngredientAnalyzer;
use crate::analysis::AnalysisResult;
use crate::config::Config;
use crate::error::AnalyzeError;
use crate::provider::Provider;

/// Sampling temperature for every request
pub const TEMPERATURE: f32 = 0.1;

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatResponseMessage>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

/// Client for any OpenAI-compatible `/chat/completions` endpoint
#[derive(Clone)]
pub struct ChatCompletionsClient {
    client: Client,
    provider: Provider,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl ChatCompletionsClient {
    pub fn new(provider: Provider, base_url: &str, model: &str, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            provider,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        }
    }

    pub fn from_config(config: &Config, provider: Provider) -> Self {
        Self::new(
            provider,
            &config.base_url_for(provider),
            &config.model_for(provider),
            config.api_key_for(provider),
        )
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub async fn query(&self, prompt: &str) -> Result<String, AnalyzeError> {
        if self.provider.requires_api_key() && self.api_key.is_none() {
            return Err(AnalyzeError::MissingApiKey(self.provider));
        }

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: TEMPERATURE,
        };

        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(%url, model = %self.model, "sending chat completion request");

        let mut builder = self.client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!("chat completion request failed: {}", e);
            AnalyzeError::Request(e)
        })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!("model endpoint returned {}: {}", status, body);
            return Err(AnalyzeError::InvalidResponse(format!("status {}", status)));
        }

        extract_content(&body)
    }
}

impl IngredientAnalyzer for ChatCompletionsClient {
    async fn analyze(&self, ingredients: &[String]) -> Result<AnalysisResult, AnalyzeError> {
        let prompt = build_prompt(ingredients);
        let content = self.query(&prompt).await?;
        parse_completion(&content)
    }
}

/// Pull `choices[0].message.content` out of a completion envelope
fn extract_content(body: &str) -> Result<String, AnalyzeError> {
    let envelope: ChatResponse = serde_json::from_str(body)
        .map_err(|e| AnalyzeError::InvalidResponse(format!("undecodable envelope: {}", e)))?;

    envelope
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| AnalyzeError::InvalidResponse("no choices in response".to_string()))
}

/// Decode the model's message content into an analysis
pub fn parse_completion(content: &str) -> Result<AnalysisResult, AnalyzeError> {
    serde_json::from_str(content.trim()).map_err(|e| {
        tracing::warn!("model output was not valid JSON: {}", e);
        AnalyzeError::InvalidJson(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answer one HTTP request with a canned response; yields the raw request
    async fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);

                let text = String::from_utf8_lossy(&request);
                if let Some(end) = text.find("\r\n\r\n") {
                    let content_length = text[..end]
                        .lines()
                        .filter_map(|line| line.split_once(':'))
                        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&request).into_owned()
        });

        (format!("http://{}/v1", addr), handle)
    }

    #[tokio::test]
    async fn test_server_error_is_invalid_response() {
        let (base_url, server) =
            serve_once("500 Internal Server Error", r#"{"error":"boom"}"#.to_string()).await;
        let client = ChatCompletionsClient::new(Provider::Ollama, &base_url, "llama3.2", None);

        let err = client.analyze(&["oats".to_string()]).await.unwrap_err();

        match err {
            AnalyzeError::InvalidResponse(msg) => assert!(msg.contains("500"), "{}", msg),
            other => panic!("expected InvalidResponse, got {:?}", other),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_successful_completion_is_decoded() {
        let content = r#"{"inferred_intent":{"label":"fat_loss","confidence":0.7},"overall_assessment":"Lean."}"#;
        let body = serde_json::json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
        })
        .to_string();
        let (base_url, server) = serve_once("200 OK", body).await;
        let client = ChatCompletionsClient::new(
            Provider::Groq,
            &base_url,
            "llama-3.1-8b-instant",
            Some("test-key".to_string()),
        );

        let result = client.analyze(&["glucomannan".to_string()]).await.unwrap();
        assert_eq!(result.inferred_intent.unwrap().label, "fat_loss");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1/chat/completions "), "{}", request);
        assert!(request.to_lowercase().contains("authorization: bearer test-key"));
        assert!(request.contains("glucomannan"));
        assert!(request.contains("llama-3.1-8b-instant"));
    }

    #[test]
    fn test_extract_content_from_envelope() {
        let body = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"{\"overall_assessment\":\"ok\"}"}}]}"#;
        assert_eq!(extract_content(body).unwrap(), r#"{"overall_assessment":"ok"}"#);
    }

    #[test]
    fn test_empty_choices_is_invalid_response() {
        let err = extract_content(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, AnalyzeError::InvalidResponse(_)));

        let err = extract_content(r#"{"error":{"message":"rate limited"}}"#).unwrap_err();
        assert!(matches!(err, AnalyzeError::InvalidResponse(_)));

        let err = extract_content("").unwrap_err();
        assert!(matches!(err, AnalyzeError::InvalidResponse(_)));
    }

    #[test]
    fn test_non_json_content_is_invalid_json() {
        let err = parse_completion("Sure! Here is the analysis: ...").unwrap_err();
        assert!(matches!(err, AnalyzeError::InvalidJson(_)));
        assert!(err.to_string().starts_with("model did not return valid JSON"));
    }

    #[test]
    fn test_parse_completion_tolerates_whitespace() {
        let result = parse_completion("\n  {\"inferred_intent\":{\"label\":\"fat_loss\",\"confidence\":0.4}}  \n").unwrap();
        assert_eq!(result.inferred_intent.unwrap().label, "fat_loss");
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let client = ChatCompletionsClient::new(Provider::Groq, "http://127.0.0.1:9", "m", None);
        let err = client.analyze(&["oats".to_string()]).await.unwrap_err();
        assert!(matches!(err, AnalyzeError::MissingApiKey(Provider::Groq)));
    }

    #[test]
    fn test_request_body_shape() {
        let request = ChatRequest {
            model: "llama-3.1-8b-instant".to_string(),
            messages: vec![ChatMessage { role: "user".to_string(), content: "hi".to_string() }],
            temperature: TEMPERATURE,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "llama-3.1-8b-instant");
        assert_eq!(value["messages"][0]["role"], "user");
        assert!((value["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ChatCompletionsClient::new(Provider::Ollama, "http://localhost:11434/v1/", "llama3.2", None);
        assert_eq!(client.base_url, "http://localhost:11434/v1");
        assert_eq!(client.model(), "llama3.2");
    }
}
