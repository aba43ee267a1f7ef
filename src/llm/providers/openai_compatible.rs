use std::collections::BTreeMap;

use async_trait::async_trait;
use futures_util::StreamExt;

use crate::errors::{DeskPilotError, DeskPilotResult};
use crate::llm::provider::{ChunkSink, LlmProvider};
use crate::llm::sse_parser;
use crate::llm::types::{
    CallConfig, ChatMessage, FunctionCall, LlmResponse, StreamChunk, StreamChunkKind, ToolCall,
    ToolDef,
};

pub struct OpenAiCompatibleProvider {
    id: String,
    api_base: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(id: String, api_base: String, api_key: String) -> Self {
        Self {
            id,
            api_base,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Derive the provider's model-listing endpoint from the completions URL.
    fn models_url(&self) -> String {
        match self.api_base.strip_suffix("/chat/completions") {
            Some(base) => format!("{base}/models"),
            None => self.api_base.clone(),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.id
    }

    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolDef>,
        cfg: &CallConfig,
        sink: &dyn ChunkSink,
    ) -> DeskPilotResult<LlmResponse> {
        let mut body = serde_json::json!({
            "model": cfg.model,
            "messages": &messages,
            "stream": cfg.stream,
            "temperature": cfg.temperature,
        });

        if !tools.is_empty() {
            body["tools"] = serde_json::to_value(&tools)?;
            body["tool_choice"] = serde_json::json!("auto");
        }

        tracing::debug!(
            provider = %self.id,
            model = %cfg.model,
            stream = cfg.stream,
            messages = messages.len(),
            tools = tools.len(),
            "sending LLM request"
        );

        let response = self
            .client
            .post(&self.api_base)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(DeskPilotError::LlmProvider(format!("{}: {}", status, err_body)));
        }

        if cfg.stream {
            self.handle_stream(response, sink).await
        } else {
            self.handle_json(response, sink).await
        }
    }

    async fn probe(&self) -> DeskPilotResult<()> {
        let url = self.models_url();
        match self.client.get(&url).bearer_auth(&self.api_key).send().await {
            Ok(resp) => {
                tracing::debug!(provider = %self.id, status = %resp.status(), "probe ok");
                Ok(())
            }
            Err(e) if e.is_connect() || e.is_timeout() => Err(DeskPilotError::ModelUnavailable(
                format!("{} ({url})", e),
            )),
            Err(e) => Err(DeskPilotError::Http(e)),
        }
    }
}

impl OpenAiCompatibleProvider {
    /// Handle SSE streaming response.
    /// Streams chunks to the sink and accumulates the full response to return.
    async fn handle_stream(
        &self,
        response: reqwest::Response,
        sink: &dyn ChunkSink,
    ) -> DeskPilotResult<LlmResponse> {
        let mut byte_stream = response.bytes_stream();
        let mut line_buf = String::new();

        let mut resp_content = String::new();
        let mut resp_reasoning = String::new();
        // Tool call accumulator: delta index → (id, type, name, accumulated_arguments)
        let mut tc_builders: BTreeMap<usize, (String, String, String, String)> = BTreeMap::new();
        let mut done_emitted = false;

        'stream: while let Some(result) = byte_stream.next().await {
            let bytes = result?;
            let text = String::from_utf8_lossy(&bytes);

            for ch in text.chars() {
                if ch == '\n' {
                    let line = line_buf.trim().to_string();
                    line_buf.clear();

                    if line.is_empty() {
                        continue;
                    }

                    match sse_parser::parse_sse_line(&line) {
                        Ok(Some(chunk)) => {
                            let is_done = matches!(chunk.kind, StreamChunkKind::Done);

                            // Accumulate before forwarding
                            match &chunk.kind {
                                StreamChunkKind::Reasoning => {
                                    resp_reasoning.push_str(&chunk.content);
                                }
                                StreamChunkKind::Content => {
                                    resp_content.push_str(&chunk.content);
                                }
                                StreamChunkKind::ToolCall => {
                                    merge_tool_call_deltas(&chunk.content, &mut tc_builders);
                                }
                                _ => {}
                            }

                            sink.emit(&chunk);

                            if is_done {
                                done_emitted = true;
                                break 'stream;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            tracing::debug!("SSE parse skipped: {e}");
                        }
                    }
                } else {
                    line_buf.push(ch);
                }
            }
        }

        // Fallback Done in case stream ended without [DONE] marker
        if !done_emitted {
            sink.emit(&StreamChunk {
                kind: StreamChunkKind::Done,
                content: String::new(),
            });
        }

        let tool_calls = build_tool_calls(tc_builders);

        tracing::info!(
            content_len = resp_content.len(),
            reasoning_len = resp_reasoning.len(),
            tool_calls = tool_calls.len(),
            tools = ?tool_calls.iter().map(|tc| tc.function.name.as_str()).collect::<Vec<_>>(),
            "LLM stream complete"
        );

        Ok(LlmResponse {
            content: resp_content,
            reasoning: resp_reasoning,
            tool_calls,
        })
    }

    /// Handle a non-streaming JSON response.
    async fn handle_json(
        &self,
        response: reqwest::Response,
        sink: &dyn ChunkSink,
    ) -> DeskPilotResult<LlmResponse> {
        let json: serde_json::Value = response.json().await?;

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();

        let tool_calls: Vec<ToolCall> = json["choices"][0]["message"]["tool_calls"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .map(|tc| ToolCall {
                        id: tc["id"].as_str().unwrap_or("").to_string(),
                        call_type: tc["type"].as_str().unwrap_or("function").to_string(),
                        function: FunctionCall {
                            name: tc["function"]["name"].as_str().unwrap_or("").to_string(),
                            arguments: tc["function"]["arguments"]
                                .as_str()
                                .unwrap_or("{}")
                                .to_string(),
                        },
                    })
                    .collect()
            })
            .unwrap_or_default();

        tracing::info!(
            content_len = content.len(),
            tool_calls = tool_calls.len(),
            "LLM JSON response received"
        );

        if !content.is_empty() {
            sink.emit(&StreamChunk {
                kind: StreamChunkKind::Content,
                content: content.clone(),
            });
        }
        if !tool_calls.is_empty() {
            if let Ok(tc_json) = serde_json::to_string(&tool_calls) {
                sink.emit(&StreamChunk {
                    kind: StreamChunkKind::ToolCall,
                    content: tc_json,
                });
            }
        }
        sink.emit(&StreamChunk {
            kind: StreamChunkKind::Done,
            content: String::new(),
        });

        Ok(LlmResponse {
            content,
            reasoning: String::new(),
            tool_calls,
        })
    }
}

/// Merge streaming tool-call delta fragments into the accumulator map (keyed by delta index).
fn merge_tool_call_deltas(
    chunk_content: &str,
    builders: &mut BTreeMap<usize, (String, String, String, String)>,
) {
    let Ok(deltas) = serde_json::from_str::<Vec<serde_json::Value>>(chunk_content) else {
        return;
    };
    for delta in deltas {
        let idx = delta["index"].as_u64().unwrap_or(0) as usize;
        let entry = builders.entry(idx).or_default();

        if let Some(id) = delta["id"].as_str() {
            if !id.is_empty() {
                entry.0 = id.to_string();
            }
        }
        if let Some(t) = delta["type"].as_str() {
            if !t.is_empty() {
                entry.1 = t.to_string();
            }
        }
        if let Some(name) = delta["function"]["name"].as_str() {
            if !name.is_empty() {
                entry.2.push_str(name);
            }
        }
        if let Some(args) = delta["function"]["arguments"].as_str() {
            entry.3.push_str(args);
        }
    }
}

/// Convert accumulated tool-call builders into typed `ToolCall` structs.
fn build_tool_calls(
    builders: BTreeMap<usize, (String, String, String, String)>,
) -> Vec<ToolCall> {
    builders
        .into_values()
        .filter(|(_, _, name, _)| !name.is_empty())
        .map(|(id, call_type, name, arguments)| ToolCall {
            id,
            call_type: if call_type.is_empty() {
                "function".to_string()
            } else {
                call_type
            },
            function: FunctionCall { name, arguments },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deltas_accumulate_across_fragments() {
        let mut builders = BTreeMap::new();
        merge_tool_call_deltas(
            r#"[{"index":0,"id":"call_1","type":"function","function":{"name":"click_","arguments":"{\"sel"}}]"#,
            &mut builders,
        );
        merge_tool_call_deltas(
            r#"[{"index":0,"function":{"name":"element","arguments":"ector\":\"name:Seven\"}"}}]"#,
            &mut builders,
        );

        let calls = build_tool_calls(builders);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].function.name, "click_element");
        assert_eq!(calls[0].function.arguments, r#"{"selector":"name:Seven"}"#);
    }

    #[test]
    fn interleaved_indices_preserve_request_order() {
        let mut builders = BTreeMap::new();
        merge_tool_call_deltas(
            r#"[{"index":1,"id":"b","function":{"name":"type_text","arguments":"{}"}}]"#,
            &mut builders,
        );
        merge_tool_call_deltas(
            r#"[{"index":0,"id":"a","function":{"name":"screenshot","arguments":"{}"}}]"#,
            &mut builders,
        );

        let calls = build_tool_calls(builders);
        assert_eq!(calls.len(), 2);
        // BTreeMap keying by delta index restores the order the model requested.
        assert_eq!(calls[0].function.name, "screenshot");
        assert_eq!(calls[1].function.name, "type_text");
    }

    #[test]
    fn nameless_builders_are_dropped() {
        let mut builders = BTreeMap::new();
        merge_tool_call_deltas(r#"[{"index":0,"id":"x"}]"#, &mut builders);
        assert!(build_tool_calls(builders).is_empty());
    }

    #[test]
    fn models_url_derivation() {
        let p = OpenAiCompatibleProvider::new(
            "test".into(),
            "http://localhost:11434/v1/chat/completions".into(),
            String::new(),
        );
        assert_eq!(p.models_url(), "http://localhost:11434/v1/models");
    }
}
