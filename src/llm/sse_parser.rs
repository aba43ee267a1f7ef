use crate::errors::{DeskPilotError, DeskPilotResult};
use crate::llm::types::{StreamChunk, StreamChunkKind};

/// Parses a raw SSE line (OpenAI-compatible format) into a StreamChunk.
/// Returns None if the line is a keep-alive or non-data line.
pub fn parse_sse_line(line: &str) -> DeskPilotResult<Option<StreamChunk>> {
    if line.is_empty() || line.starts_with(':') {
        return Ok(None);
    }

    let data = if let Some(d) = line.strip_prefix("data: ") {
        d.trim()
    } else {
        return Ok(None);
    };

    if data == "[DONE]" {
        return Ok(Some(StreamChunk {
            kind: StreamChunkKind::Done,
            content: String::new(),
        }));
    }

    let json: serde_json::Value =
        serde_json::from_str(data).map_err(|e| DeskPilotError::SseParsing(e.to_string()))?;

    if let Some(choices) = json["choices"].as_array() {
        if let Some(first) = choices.first() {
            let delta = &first["delta"];

            // Reasoning content (some models like DeepSeek expose this)
            if let Some(reasoning) = delta["reasoning_content"].as_str() {
                if !reasoning.is_empty() {
                    return Ok(Some(StreamChunk {
                        kind: StreamChunkKind::Reasoning,
                        content: reasoning.to_string(),
                    }));
                }
            }

            if let Some(tool_calls) = delta["tool_calls"].as_array() {
                if !tool_calls.is_empty() {
                    return Ok(Some(StreamChunk {
                        kind: StreamChunkKind::ToolCall,
                        content: serde_json::to_string(tool_calls)
                            .map_err(|e| DeskPilotError::SseParsing(e.to_string()))?,
                    }));
                }
            }

            if let Some(content) = delta["content"].as_str() {
                if !content.is_empty() {
                    return Ok(Some(StreamChunk {
                        kind: StreamChunkKind::Content,
                        content: content.to_string(),
                    }));
                }
            }

            // Finish reason signals done
            if first["finish_reason"].as_str().is_some() {
                return Ok(Some(StreamChunk {
                    kind: StreamChunkKind::Done,
                    content: String::new(),
                }));
            }
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_marker() {
        let chunk = parse_sse_line("data: [DONE]").unwrap().unwrap();
        assert_eq!(chunk.kind, StreamChunkKind::Done);
    }

    #[test]
    fn keep_alive_is_skipped() {
        assert!(parse_sse_line(": ping").unwrap().is_none());
        assert!(parse_sse_line("").unwrap().is_none());
        assert!(parse_sse_line("event: message").unwrap().is_none());
    }

    #[test]
    fn content_delta() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;
        let chunk = parse_sse_line(line).unwrap().unwrap();
        assert_eq!(chunk.kind, StreamChunkKind::Content);
        assert_eq!(chunk.content, "Hel");
    }

    #[test]
    fn tool_call_delta() {
        let line = r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"id":"c1","function":{"name":"screenshot","arguments":""}}]}}]}"#;
        let chunk = parse_sse_line(line).unwrap().unwrap();
        assert_eq!(chunk.kind, StreamChunkKind::ToolCall);
        assert!(chunk.content.contains("screenshot"));
    }

    #[test]
    fn finish_reason_maps_to_done() {
        let line = r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        let chunk = parse_sse_line(line).unwrap().unwrap();
        assert_eq!(chunk.kind, StreamChunkKind::Done);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_sse_line("data: {not json").is_err());
    }
}
