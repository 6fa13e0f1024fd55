//! Extraction of text increments from chat-completion chunk payloads.

use serde::Deserialize;
use tracing::trace;

use crate::error::FrameParseError;
use crate::streaming::Frame;

/// The subset of a streamed chat-completion chunk that carries text.
///
/// Every level is optional; anything else in the payload is ignored.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChunkPayload {
    /// Kept untyped so a malformed sibling choice cannot spoil the first one
    #[serde(default)]
    choices: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

impl ChunkPayload {
    pub(crate) fn parse(payload: &str) -> Result<Self, FrameParseError> {
        Ok(serde_json::from_str(payload)?)
    }

    /// `choices[0].delta.content`, if present and non-empty
    pub(crate) fn into_content(self) -> Result<Option<String>, FrameParseError> {
        let Some(first) = self.choices.and_then(|choices| choices.into_iter().next()) else {
            return Ok(None);
        };
        if first.is_null() {
            return Ok(None);
        }
        let choice = ChunkChoice::deserialize(first)?;
        Ok(choice
            .delta
            .and_then(|delta| delta.content)
            .filter(|content| !content.is_empty()))
    }
}

/// Parse a data-frame payload and return the text it appends, if any.
///
/// Malformed payloads are expected mid-stream and are discarded silently.
pub fn extract_delta(payload: &str) -> Option<String> {
    match ChunkPayload::parse(payload).and_then(ChunkPayload::into_content) {
        Ok(content) => content,
        Err(err) => {
            trace!(error = %err, payload, "discarding unparseable frame");
            None
        }
    }
}

/// Convenience over [`extract_delta`] for decoded frames.
pub fn frame_delta(frame: &Frame) -> Option<String> {
    match frame {
        Frame::Data(payload) => extract_delta(payload),
        Frame::Done => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_choice_content() {
        let payload = r#"{"id":"c1","choices":[{"index":0,"delta":{"role":"assistant","content":"Hel"},"finish_reason":null}]}"#;
        assert_eq!(extract_delta(payload).as_deref(), Some("Hel"));
    }

    #[test]
    fn only_first_choice_is_read() {
        let payload = r#"{"choices":[{"delta":{}},{"delta":{"content":"second"}}]}"#;
        assert_eq!(extract_delta(payload), None);
    }

    #[test]
    fn malformed_sibling_choices_are_ignored() {
        for payload in [
            r#"{"choices":[{"delta":{"content":"Hi"}},null]}"#,
            r#"{"choices":[{"delta":{"content":"Hi"}},{"delta":{"content":7}}]}"#,
            r#"{"choices":[{"delta":{"content":"Hi"}},"junk"]}"#,
        ] {
            assert_eq!(extract_delta(payload).as_deref(), Some("Hi"), "payload: {payload}");
        }
    }

    #[test]
    fn unrelated_fields_of_any_shape_are_ignored() {
        let payload = r#"{"id":null,"usage":[1,2],"choices":[{"index":"x","delta":{"role":5,"content":"ok"},"logprobs":{}}]}"#;
        assert_eq!(extract_delta(payload).as_deref(), Some("ok"));
    }

    #[test]
    fn missing_fields_yield_no_delta() {
        for payload in [
            r#"{}"#,
            r#"{"choices":[]}"#,
            r#"{"choices":null}"#,
            r#"{"choices":[{}]}"#,
            r#"{"choices":[{"delta":null}]}"#,
            r#"{"choices":[null]}"#,
            r#"{"choices":[{"delta":{"content":null}}]}"#,
            r#"{"choices":[{"delta":{"content":""}}]}"#,
        ] {
            assert_eq!(extract_delta(payload), None, "payload: {payload}");
        }
    }

    #[test]
    fn malformed_payloads_are_swallowed() {
        for payload in [
            r#"{"choices":[{"delta":{"content":"trunc"#,
            "not json",
            "42",
            r#""just a string""#,
            r#"{"choices":"nope"}"#,
            r#"{"choices":[{"delta":{"content":7}}]}"#,
        ] {
            assert_eq!(extract_delta(payload), None, "payload: {payload}");
        }
    }

    #[test]
    fn parse_error_is_reported_internally() {
        assert!(ChunkPayload::parse("{").is_err());
    }

    #[test]
    fn done_frame_has_no_delta() {
        assert_eq!(frame_delta(&Frame::Done), None);
        let frame = Frame::Data(r#"{"choices":[{"delta":{"content":"lo"}}]}"#.into());
        assert_eq!(frame_delta(&frame).as_deref(), Some("lo"));
    }
}
