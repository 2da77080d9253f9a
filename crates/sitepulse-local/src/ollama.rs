use crate::config::OllamaConfig;
use serde::{Deserialize, Serialize};
use sitepulse_core::{Error, Extractor, Result};
use std::time::Duration;
use tracing::info;

const SYSTEM_PROMPT: &str = "You extract specific information from web page text. \
Follow these rules strictly:\n\
1. Extract only information that directly matches the user's description.\n\
2. Do not add comments, explanations, or any other text.\n\
3. If nothing matches, reply with an empty string.\n\
4. Output only the requested data.";

fn user_prompt(chunk: &str, instruction: &str) -> String {
    format!("Description of what to extract: {instruction}\n\nPage text:\n{chunk}")
}

#[derive(Debug, Clone)]
pub struct OllamaExtractor {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OllamaExtractor {
    pub fn new(client: reqwest::Client, cfg: OllamaConfig) -> Self {
        Self {
            client,
            base_url: cfg.base_url,
            model: cfg.model,
            timeout: cfg.timeout,
        }
    }

    pub fn from_env(client: reqwest::Client) -> Self {
        Self::new(client, OllamaConfig::from_env())
    }

    fn endpoint_chat(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One `/api/chat` round trip for a single chunk.
    async fn ask(&self, chunk: &str, instruction: &str) -> Result<String> {
        let prompt = user_prompt(chunk, instruction);
        let turn = ChatTurn {
            model: &self.model,
            stream: false,
            messages: [
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: &prompt,
                },
            ],
        };

        let resp = self
            .client
            .post(self.endpoint_chat())
            .timeout(self.timeout)
            .json(&turn)
            .send()
            .await
            .map_err(|e| Error::Llm(format!("ollama unreachable: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Llm(format!("ollama chat HTTP {status}")));
        }
        let reply: ChatReply = resp
            .json()
            .await
            .map_err(|e| Error::Llm(format!("unexpected ollama reply: {e}")))?;
        Ok(reply.message.content)
    }
}

#[async_trait::async_trait]
impl Extractor for OllamaExtractor {
    /// One request per chunk, in order; responses are joined with newlines.
    async fn extract(&self, chunks: &[String], instruction: &str) -> Result<String> {
        let mut parsed = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            parsed.push(self.ask(chunk, instruction).await?);
            info!(model = %self.model, "parsed chunk {} of {}", i + 1, chunks.len());
        }
        Ok(parsed.join("\n"))
    }
}

#[derive(Serialize)]
struct ChatTurn<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatReply {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn extractor(addr: SocketAddr) -> OllamaExtractor {
        OllamaExtractor::new(
            reqwest::Client::new(),
            OllamaConfig {
                base_url: format!("http://{addr}/"),
                model: "stub".to_string(),
                timeout: Duration::from_secs(5),
            },
        )
    }

    #[tokio::test]
    async fn extract_calls_once_per_chunk_and_joins_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let app = Router::new().route(
            "/api/chat",
            post(move |Json(body): Json<serde_json::Value>| {
                let calls = calls2.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let user = body["messages"][1]["content"].as_str().unwrap_or("");
                    let chunk = user.rsplit('\n').next().unwrap_or("").to_string();
                    assert_eq!(body["model"], "stub");
                    assert_eq!(body["stream"], false);
                    assert!(user.contains("find prices"));
                    Json(serde_json::json!({
                        "message": {"role": "assistant", "content": format!("got:{chunk}")}
                    }))
                }
            }),
        );
        let addr = serve(app).await;

        let chunks = vec!["alpha".to_string(), "beta".to_string()];
        let out = extractor(addr).extract(&chunks, "find prices").await.unwrap();
        assert_eq!(out, "got:alpha\ngot:beta");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn extract_of_no_chunks_makes_no_requests() {
        // Nothing listens on this port; any request would fail.
        let addr: SocketAddr = "127.0.0.1:9".parse().unwrap();
        let out = extractor(addr).extract(&[], "anything").await.unwrap();
        assert_eq!(out, "");
    }

    #[tokio::test]
    async fn non_success_status_is_an_llm_error() {
        let app = Router::new().route(
            "/api/chat",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model not found") }),
        );
        let addr = serve(app).await;
        let err = extractor(addr)
            .extract(&["x".to_string()], "y")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Llm(ref m) if m.contains("500")), "{err}");
    }
}
