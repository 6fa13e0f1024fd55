use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::error::ChatError;
use crate::events::Message;

/// Raw response body, chunk by chunk
pub type ByteStream = BoxStream<'static, Result<Bytes, ChatError>>;

/// Something that can turn a conversation history into a streamed reply.
pub trait ChatTransport: Send + Sync + 'static {
    /// Send the whole history and return the open response body.
    ///
    /// Resolves once the endpoint has answered with a success status. Read
    /// failures on the returned stream surface as
    /// [`ChatError::StreamInterrupted`].
    fn open_stream(
        &self,
        messages: &[Message],
    ) -> impl Future<Output = Result<ByteStream, ChatError>> + Send;
}

/// Request body sent to the chat endpoint
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: &'a [Message],
}

/// HTTP client for the configured chat endpoint
#[derive(Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl LlmClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: None,
        }
    }

    /// Build a client from the resolved configuration
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint()?.to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Send `Authorization: Bearer <key>` with every request
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ChatTransport for LlmClient {
    fn open_stream(
        &self,
        messages: &[Message],
    ) -> impl Future<Output = Result<ByteStream, ChatError>> + Send {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&ChatRequest { messages });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        debug!(url = %self.endpoint, messages = messages.len(), "sending streaming chat request");

        async move {
            let response = request.send().await.map_err(map_send_error)?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ChatError::Transport {
                    status: status.as_u16(),
                    body,
                });
            }

            let body = response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|e| ChatError::StreamInterrupted(e.to_string())));
            Ok(body.boxed())
        }
    }
}

/// Map a failure to send the request at all.
fn map_send_error(err: reqwest::Error) -> ChatError {
    if err.is_timeout() {
        ChatError::Request(format!("timed out: {err}"))
    } else if err.is_connect() {
        ChatError::Request(format!("could not connect: {err}"))
    } else {
        ChatError::Request(err.to_string())
    }
}
