// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Reply shown when the model answers with nothing.
pub const NO_ANSWER_REPLY: &str = "对不起，我现在无法回答这个问题。";
/// Reply shown when the request fails for any reason.
pub const CONNECTION_ERROR_REPLY: &str = "连接智能助手时发生错误，请稍后再试。";

pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Consultations send one user turn with the preamble folded into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    model: String,
    timeout: Duration,
    temperature: f32,
    api_key: Option<String>,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("llm.base_url must not be empty");
        }
        let parsed = Url::parse(&base_url)
            .with_context(|| format!("llm.base_url {base_url:?} is not a valid URL"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "llm.base_url must use http or https, got {:?}",
                parsed.scheme()
            );
        }
        if model.trim().is_empty() {
            bail!("llm.model must not be empty");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            model: model.trim().to_owned(),
            timeout,
            temperature: DEFAULT_TEMPERATURE,
            api_key: None,
            http,
        })
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn authorize(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    pub fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .authorize(self.http.get(format!("{}/models", self.base_url)))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let parsed: ModelsResponse = response.json().context("decode model list")?;
        Ok(parsed.data.into_iter().map(|model| model.id).collect())
    }

    pub fn ping(&self) -> Result<()> {
        let models = self.list_models()?;
        if !models.iter().any(|name| name == &self.model) {
            bail!(
                "model {:?} is not offered by {} -- set llm.model to one of: {}",
                self.model,
                self.base_url,
                models.join(", ")
            );
        }
        Ok(())
    }

    pub fn chat_complete(&self, messages: &[Message]) -> Result<String> {
        let request = ChatRequest::new(&self.model, messages, self.temperature);
        debug!(model = %self.model, messages = messages.len(), "sending chat completion");
        let response = self
            .authorize(
                self.http
                    .post(format!("{}/chat/completions", self.base_url)),
            )
            .json(&request)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let parsed: ChatCompletionResponse = response.json().context("decode chat response")?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| anyhow!("no choices in chat response"))?;
        Ok(content)
    }
}

const CONSULT_PREAMBLE: &str = "You are an expert AI assistant for \"Hui Zao Jia\" (汇造价), \
a professional Chinese cost engineering platform.\n\
Your expertise includes: 2024 lists (清单), quotas (定额), indicator data (指标数据), \
and policy files (政策文件).";

/// Builds the single user message sent for one consultation turn.
pub fn build_consult_prompt(category: &str, question: &str) -> String {
    format!(
        "{CONSULT_PREAMBLE}\nCurrent context category: {category}.\n\
         Please answer the following user question in professional Chinese:\n{question}"
    )
}

/// Asks one question and always produces displayable text: the reply, or a
/// fixed apology when the reply is empty or the request fails.
pub fn consult(client: &Client, category: &str, question: &str) -> String {
    let prompt = build_consult_prompt(category, question);
    match client.chat_complete(&[Message::user(prompt)]) {
        Ok(reply) if reply.trim().is_empty() => {
            info!(category, "model returned an empty reply");
            NO_ANSWER_REPLY.to_owned()
        }
        Ok(reply) => {
            info!(category, chars = reply.chars().count(), "model replied");
            reply
        }
        Err(error) => {
            warn!(category, error = %format!("{error:#}"), "chat request failed");
            CONNECTION_ERROR_REPLY.to_owned()
        }
    }
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- check llm.base_url and your network ({})",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(error) = parsed.error
        && !error.message.is_empty()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), error.message);
    }

    if status == StatusCode::UNAUTHORIZED {
        return anyhow!(
            "server error (401): unauthorized -- export the API key named by llm.api_key_env"
        );
    }

    if body.len() < 100 && !body.contains('{') && !body.trim().is_empty() {
        return anyhow!("server error ({}): {}", status.as_u16(), body.trim());
    }

    anyhow!("server returned {}", status.as_u16())
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    temperature: f32,
}

impl<'a> ChatRequest<'a> {
    fn new(model: &'a str, messages: &'a [Message], temperature: f32) -> Self {
        Self {
            model,
            messages: messages
                .iter()
                .map(|message| ChatMessage {
                    role: message.role.as_str(),
                    content: &message.content,
                })
                .collect(),
            stream: false,
            temperature,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<ModelRow>,
}

#[derive(Debug, Deserialize)]
struct ModelRow {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::{
        ChatRequest, Client, Message, Role, StatusCode, build_consult_prompt,
        clean_error_response,
    };
    use std::time::Duration;

    #[test]
    fn consult_prompt_carries_category_and_question() {
        let prompt = build_consult_prompt("政策文件", "2024清单有哪些变化？");
        assert!(prompt.starts_with("You are an expert AI assistant for \"Hui Zao Jia\""));
        assert!(prompt.contains("定额"));
        assert!(prompt.contains("Current context category: 政策文件."));
        assert!(prompt.ends_with("2024清单有哪些变化？"));
    }

    #[test]
    fn client_rejects_bad_settings() {
        let timeout = Duration::from_secs(1);
        assert!(Client::new("", "m", timeout).is_err());
        assert!(Client::new("not a url", "m", timeout).is_err());
        assert!(Client::new("ftp://example.com", "m", timeout).is_err());
        assert!(Client::new("http://localhost:1/v1", " ", timeout).is_err());
        let client = Client::new("http://localhost:1/v1/", "m", timeout).expect("valid client");
        assert_eq!(client.base_url(), "http://localhost:1/v1");
        assert!(!client.has_api_key());
        assert!(!client.with_api_key(Some("  ".to_owned())).has_api_key());
    }

    #[test]
    fn request_body_is_non_streaming() {
        let messages = [Message::user("hi"), Message::user("again")];
        let request = ChatRequest::new("m", &messages, 0.2);
        let body = serde_json::to_value(&request).expect("serializes");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][1]["role"], Role::User.as_str());
        assert_eq!(body["messages"][1]["content"], "again");
        assert_eq!(body["messages"][0]["content"], "hi");
    }

    #[test]
    fn error_bodies_are_summarized() {
        let error = clean_error_response(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"message":"model not loaded"}}"#,
        );
        assert_eq!(error.to_string(), "server error (400): model not loaded");

        let error = clean_error_response(StatusCode::UNAUTHORIZED, "");
        assert!(error.to_string().contains("llm.api_key_env"));

        let error = clean_error_response(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(error.to_string(), "server error (502): upstream down");

        let error = clean_error_response(StatusCode::INTERNAL_SERVER_ERROR, "{broken");
        assert_eq!(error.to_string(), "server returned 500");
    }
}
