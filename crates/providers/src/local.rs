//! Local provider — HTTP to a co-located inference daemon.
//!
//! Port selection works by probing a small candidate list once at
//! construction (mirrors `sa_providers`' pattern of resolving an adapter's
//! wire details eagerly in `from_config`, e.g. `OpenAiCompatProvider::
//! from_config`). Model identifiers routed here carry no provider prefix.

use std::sync::RwLock;

use discuss_domain::error::{Error, Result};
use discuss_domain::stream::{StreamChunk, Usage};
use serde_json::Value;

use crate::sse::drain_data_lines;
use crate::traits::{
    ChatMessage, ChunkSink, CompletionOptions, CompletionResult, HealthStatus, LlmProvider,
    ModelDescriptor, Role,
};
use crate::util::from_reqwest;

/// Candidate ports probed, in order, for the local inference daemon.
pub const DEFAULT_CANDIDATE_PORTS: &[u16] = &[11434, 8080, 5000, 1234];

pub struct LocalProvider {
    id: String,
    client: reqwest::Client,
    candidate_ports: Vec<u16>,
    /// Resolved base URL, cached after the first successful probe.
    resolved_base_url: RwLock<Option<String>>,
}

impl LocalProvider {
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_ports(id, DEFAULT_CANDIDATE_PORTS.to_vec())
    }

    pub fn with_ports(id: impl Into<String>, candidate_ports: Vec<u16>) -> Self {
        Self {
            id: id.into(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(300))
                .build()
                .expect("reqwest client"),
            candidate_ports,
            resolved_base_url: RwLock::new(None),
        }
    }

    /// Probe each candidate port's `/health` endpoint until one answers.
    async fn resolve_base_url(&self) -> Result<String> {
        if let Some(url) = self.resolved_base_url.read().unwrap().clone() {
            return Ok(url);
        }

        for port in &self.candidate_ports {
            let url = format!("http://127.0.0.1:{port}");
            let probe = self.client.get(format!("{url}/health")).send().await;
            if let Ok(resp) = probe {
                if resp.status().is_success() {
                    *self.resolved_base_url.write().unwrap() = Some(url.clone());
                    return Ok(url);
                }
            }
        }

        Err(Error::Provider {
            provider: self.id.clone(),
            message: format!(
                "no local inference daemon responded on candidate ports {:?}",
                self.candidate_ports
            ),
        })
    }

    fn body(model: &str, messages: &[ChatMessage], options: &CompletionOptions, stream: bool) -> Value {
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
            "model": model,
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
impl LlmProvider for LocalProvider {
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>> {
        let base = self.resolve_base_url().await?;
        let resp = self
            .client
            .get(format!("{base}/v1/models"))
            .send()
            .await
            .map_err(from_reqwest)?;
        let body: Value = resp.json().await.map_err(from_reqwest)?;
        let models = body["data"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| {
                let id = m["id"].as_str()?.to_string();
                Some(ModelDescriptor {
                    provider_id: self.id.clone(),
                    model_id: id.clone(),
                    display_name: id,
                    context_length_hint: m["context_length"].as_u64().map(|v| v as u32),
                })
            })
            .collect();
        Ok(models)
    }

    async fn health(&self) -> HealthStatus {
        match self.resolve_base_url().await {
            Ok(base) => HealthStatus { connected: true, message: format!("reachable at {base}") },
            Err(e) => HealthStatus { connected: false, message: e.to_string() },
        }
    }

    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<CompletionResult> {
        let base = self.resolve_base_url().await?;
        let body = Self::body(model, messages, options, false);
        let resp = self
            .client
            .post(format!("{base}/v1/chat/completions"))
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
        let base = self.resolve_base_url().await?;
        let body = Self::body(model, messages, options, true);
        let mut resp = self
            .client
            .post(format!("{base}/v1/chat/completions"))
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
        let mut emitted_done = false;

        loop {
            match resp.chunk().await.map_err(from_reqwest)? {
                Some(bytes) => {
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
                None => break,
            }
        }

        if !emitted_done {
            sink(StreamChunk { content: String::new(), done: true, usage });
            emitted_done = true;
        }
        let _ = emitted_done;
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
    fn build_request_body_shape() {
        let msgs = vec![ChatMessage::system("sys"), ChatMessage::user("hi")];
        let body = LocalProvider::body("llama3", &msgs, &CompletionOptions::default(), true);
        assert_eq!(body["model"], "llama3");
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
    }
}
