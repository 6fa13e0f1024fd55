//! Server-sent event framing for the chat stream.
//!
//! Bytes arrive in arbitrary chunks. [`FrameDecoder`] carries incomplete UTF-8
//! sequences and unterminated lines across calls, so a frame split over two
//! reads is decoded exactly as if it had arrived whole.

use tracing::trace;

/// Prefix marking a line as a data frame
pub const DATA_PREFIX: &str = "data: ";

/// Payload that ends the stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// One decoded protocol unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Payload text after the `data: ` prefix
    Data(String),
    /// The `[DONE]` marker
    Done,
}

/// Incremental decoder from raw byte chunks to [`Frame`]s
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Bytes of a multi-byte character cut off at the end of the last chunk
    utf8_tail: Vec<u8>,
    /// Text after the last newline seen so far
    line_buf: String,
    /// Set once `[DONE]` has been decoded
    finished: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the termination marker has been seen
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed one chunk and collect every frame completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let text = self.decode_utf8(chunk);
        self.line_buf.push_str(&text);

        let mut frames = Vec::new();
        while let Some(newline_pos) = self.line_buf.find('\n') {
            let line: String = self.line_buf.drain(..=newline_pos).collect();
            self.process_line(&line, &mut frames);
        }
        frames
    }

    /// Flush whatever is buffered once the transport reports end-of-stream.
    pub fn finish(&mut self) -> Vec<Frame> {
        if !self.utf8_tail.is_empty() {
            let tail = std::mem::take(&mut self.utf8_tail);
            self.line_buf.push_str(&String::from_utf8_lossy(&tail));
        }

        let line = std::mem::take(&mut self.line_buf);
        let mut frames = Vec::new();
        if !line.is_empty() {
            self.process_line(&line, &mut frames);
        }
        frames
    }

    fn process_line(&mut self, line: &str, frames: &mut Vec<Frame>) {
        if self.finished {
            return;
        }

        let line = line.trim_end();
        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            if !line.is_empty() {
                trace!(line, "ignoring non-data line");
            }
            return;
        };

        if payload == DONE_SENTINEL {
            self.finished = true;
            frames.push(Frame::Done);
        } else {
            frames.push(Frame::Data(payload.to_string()));
        }
    }

    /// Decode as much of `tail + chunk` as forms complete characters.
    ///
    /// Invalid sequences become U+FFFD; a truncated sequence at the very end is
    /// held back for the next chunk.
    fn decode_utf8(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.utf8_tail);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.utf8_tail = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(payload: &str) -> Frame {
        Frame::Data(payload.to_string())
    }

    #[test]
    fn decodes_complete_lines_in_one_chunk() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(b"data: {\"a\":1}\n\ndata: {\"b\":2}\n\n");
        assert_eq!(frames, vec![data("{\"a\":1}"), data("{\"b\":2}")]);
    }

    #[test]
    fn buffers_line_split_across_chunks() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"data: {\"choi").is_empty());
        assert!(decoder.push(b"ces\":[]").is_empty());
        let frames = decoder.push(b"}\n");
        assert_eq!(frames, vec![data("{\"choices\":[]}")]);
    }

    #[test]
    fn holds_partial_multibyte_character() {
        let mut decoder = FrameDecoder::new();
        let bytes = "data: café\n".as_bytes();
        // split inside the two-byte 'é'
        let split = bytes.len() - 2;
        assert!(decoder.push(&bytes[..split]).is_empty());
        let frames = decoder.push(&bytes[split..]);
        assert_eq!(frames, vec![data("café")]);
    }

    #[test]
    fn invalid_utf8_is_replaced_not_fatal() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(b"data: a\xFFb\n");
        assert_eq!(frames, vec![data("a\u{FFFD}b")]);
    }

    #[test]
    fn ignores_lines_without_data_prefix() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(b": keep-alive\nevent: message\nid: 7\ndata:nospace\ndata: x\n");
        assert_eq!(frames, vec![data("x")]);
    }

    #[test]
    fn strips_carriage_returns() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(b"data: one\r\ndata: [DONE]\r\n");
        assert_eq!(frames, vec![data("one"), Frame::Done]);
    }

    #[test]
    fn done_latches_and_suppresses_later_frames() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(b"data: a\ndata: [DONE]\ndata: b\n");
        assert_eq!(frames, vec![data("a"), Frame::Done]);
        assert!(decoder.is_finished());
        assert!(decoder.push(b"data: c\n").is_empty());
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn finish_flushes_unterminated_line() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"data: tail").is_empty());
        assert_eq!(decoder.finish(), vec![data("tail")]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn byte_at_a_time_matches_whole_input() {
        let input = "data: {\"x\":\"日本\"}\n\ndata: [DONE]\n".as_bytes();
        let mut whole = FrameDecoder::new();
        let expected = whole.push(input);

        let mut split = FrameDecoder::new();
        let mut frames = Vec::new();
        for byte in input {
            frames.extend(split.push(std::slice::from_ref(byte)));
        }
        frames.extend(split.finish());
        assert_eq!(frames, expected);
    }
}
