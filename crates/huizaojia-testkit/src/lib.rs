// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! A scripted OpenAI-compatible endpoint for tests.

use anyhow::{Result, anyhow};
use std::io::Read;
use std::thread::{self, JoinHandle};
use tiny_http::{Header, Response, Server};

/// Base URL nothing listens on.
pub const UNREACHABLE_BASE_URL: &str = "http://127.0.0.1:1/v1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockReply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl MockReply {
    pub fn chat(content: &str) -> Self {
        Self::json(
            200,
            serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": content } }]
            }),
        )
    }

    pub fn models(ids: &[&str]) -> Self {
        let data: Vec<_> = ids.iter().map(|id| serde_json::json!({ "id": id })).collect();
        Self::json(200, serde_json::json!({ "data": data }))
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": { "message": message } }))
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: body.to_owned(),
        }
    }

    fn json(status: u16, value: serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub authorization: Option<String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> Result<serde_json::Value> {
        serde_json::from_str(&self.body)
            .map_err(|error| anyhow!("request body is not JSON: {error}"))
    }
}

/// Answers one request per scripted reply, in order, then stops.
pub struct MockChatServer {
    base_url: String,
    handle: JoinHandle<Result<Vec<RecordedRequest>>>,
}

impl MockChatServer {
    pub fn start(replies: Vec<MockReply>) -> Result<Self> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let base_url = format!("http://{}/v1", server.server_addr());

        let handle = thread::spawn(move || {
            let mut recorded = Vec::with_capacity(replies.len());
            for reply in replies {
                let mut request = server
                    .recv()
                    .map_err(|error| anyhow!("receive request: {error}"))?;
                let mut body = String::new();
                request
                    .as_reader()
                    .read_to_string(&mut body)
                    .map_err(|error| anyhow!("read request body: {error}"))?;
                let authorization = request
                    .headers()
                    .iter()
                    .find(|header| header.field.equiv("Authorization"))
                    .map(|header| header.value.as_str().to_owned());
                recorded.push(RecordedRequest {
                    method: request.method().to_string(),
                    url: request.url().to_owned(),
                    authorization,
                    body,
                });

                let header = Header::from_bytes("Content-Type", reply.content_type)
                    .map_err(|()| anyhow!("invalid content type {}", reply.content_type))?;
                let response = Response::from_string(reply.body)
                    .with_status_code(reply.status)
                    .with_header(header);
                request
                    .respond(response)
                    .map_err(|error| anyhow!("send response: {error}"))?;
            }
            Ok(recorded)
        });

        Ok(Self { base_url, handle })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Waits for every scripted reply to be served and returns the requests.
    pub fn finish(self) -> Result<Vec<RecordedRequest>> {
        self.handle
            .join()
            .map_err(|_| anyhow!("mock server thread panicked"))?
    }
}
