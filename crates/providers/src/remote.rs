//! Remote provider — HTTPS cloud endpoint, bearer-token authenticated.
//!
//! Mirrors the teacher's `OpenAiCompatProvider`: a single base URL, a
//! bearer token read once at construction, and SSE streaming parsed with
//! the shared [`crate::sse`] helper. Model identifiers routed here always
//! carry a `<provider>/<model>` prefix (spec §4.1); the prefix is stripped
//! before it reaches the wire.

use discuss_domain::error::{Error, Result};
use discuss_domain::stream::{StreamChunk, Usage};
use serde_json::Value;

use crate::sse::drain_data_lines;
use crate::traits::{
    ChatMessage, ChunkSink, CompletionOptions, CompletionResult, HealthStatus, LlmProvider,
    ModelDescriptor, Role,
};
use crate::util::from_reqwest;

pub struct RemoteProvider {
    id: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl RemoteProvider {
    pub fn new(id: impl Into<String>, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(300))
                .build()
                .expect("reqwest client"),
        }
    }

    /// Strip this provider's routing prefix (`"<id>/"`) off a model
    /// identifier before it is sent on the wire.
    fn wire_model<'a>(&self, model: &'a str) -> &'a str {
        model
            .split_once('/')
            .map(|(_, rest)| rest)
            .unwrap_or(model)
    }

    fn body(&self, model: &str, messages: &[ChatMessage], options: &CompletionOptions, stream: bool) -> Value {
        let msgs: Vec<Value> = messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": match m.role { Role::System => "system", Role::User => "user" },
                    "content": m.content,
                })
            })
            .collect();
        let mut body = serde_json::json!({
            "model": self.wire_model(model),
            "messages": msgs,
            "stream": stream,
        });
        if let Some(t) = options.temperature {
            body["temperature"] = serde_json::json!(t);
        }
        if let Some(m) = options.max_tokens {
            body["max_tokens"] = serde_json::json!(m);
        }
        body
    }
}

#[async_trait::async_trait]
impl LlmProvider for RemoteProvider {
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>> {
        let resp = self
            .client
            .get(format!("{}/v1/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(from_reqwest)?;
        if !resp.status().is_success() {
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("non-2xx response: {}", resp.status()),
            });
        }
        let body: Value = resp.json().await.map_err(from_reqwest)?;
        let models = body["data"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| {
                let raw_id = m["id"].as_str()?.to_string();
                let prefixed = format!("{}/{raw_id}", self.id);
                Some(ModelDescriptor {
                    provider_id: self.id.clone(),
                    model_id: prefixed,
                    display_name: raw_id,
                    context_length_hint: m["context_length"].as_u64().map(|v| v as u32),
                })
            })
            .collect();
        Ok(models)
    }

    async fn health(&self) -> HealthStatus {
        let resp = self
            .client
            .get(format!("{}/v1/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await;
        match resp {
            Ok(r) if r.status().is_success() => {
                HealthStatus { connected: true, message: format!("reachable at {}", self.base_url) }
            }
            Ok(r) => HealthStatus {
                connected: false,
                message: format!("non-2xx response: {}", r.status()),
            },
            Err(e) => HealthStatus { connected: false, message: from_reqwest(e).to_string() },
        }
    }

    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<CompletionResult> {
        let body = self.body(model, messages, options, false);
        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;
        if !resp.status().is_success() {
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("non-2xx response: {}", resp.status()),
            });
        }
        let json: Value = resp.json().await.map_err(from_reqwest)?;
        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        let usage = json.get("usage").map(|u| Usage {
            prompt_tokens: u["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            completion_tokens: u["completion_tokens"].as_u64().unwrap_or(0) as u32,
            total_tokens: u["total_tokens"].as_u64().unwrap_or(0) as u32,
        });
        Ok(CompletionResult { content, usage })
    }

    async fn complete_stream<'a>(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &CompletionOptions,
        mut sink: ChunkSink<'a>,
    ) -> Result<Option<Usage>> {
        let body = self.body(model, messages, options, true);
        let mut resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        if !resp.status().is_success() {
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("non-2xx response: {}", resp.status()),
            });
        }

        let mut buffer = String::new();
        let mut usage = None;

        while let Some(bytes) = resp.chunk().await.map_err(from_reqwest)? {
            buffer.push_str(&String::from_utf8_lossy(&bytes));
            for data in drain_data_lines(&mut buffer) {
                if data == "[DONE]" {
                    continue;
                }
                let Ok(json) = serde_json::from_str::<Value>(&data) else { continue };
                let delta = json["choices"][0]["delta"]["content"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                if let Some(u) = json.get("usage") {
                    usage = Some(Usage {
                        prompt_tokens: u["prompt_tokens"].as_u64().unwrap_or(0) as u32,
                        completion_tokens: u["completion_tokens"].as_u64().unwrap_or(0) as u32,
                        total_tokens: u["total_tokens"].as_u64().unwrap_or(0) as u32,
                    });
                }
                if !delta.is_empty() {
                    sink(StreamChunk { content: delta, done: false, usage: None });
                }
            }
        }

        sink(StreamChunk { content: String::new(), done: true, usage });
        Ok(usage)
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_routing_prefix_before_wire() {
        let p = RemoteProvider::new("cloud", "https://api.example.com", "key");
        assert_eq!(p.wire_model("cloud/gpt-4o"), "gpt-4o");
        assert_eq!(p.wire_model("unprefixed"), "unprefixed");
    }

    #[test]
    fn build_request_body_uses_wire_model() {
        let p = RemoteProvider::new("cloud", "https://api.example.com", "key");
        let msgs = vec![ChatMessage::user("hi")];
        let body = p.body("cloud/gpt-4o", &msgs, &CompletionOptions::default(), false);
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["stream"], false);
    }
}
