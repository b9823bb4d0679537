//! SSE line and frame parsing.
//!
//! A frame is a run of `event:`/`data:`/`id:` lines closed by a blank line.
//! Lines starting with `:` are comments.

/// Represents a parsed SSE line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    /// Event type declaration (e.g., "event: jobs")
    Event(String),
    /// Data payload (e.g., "data: {\"id\": 1}")
    Data(String),
    /// Last event id
    Id(String),
    /// Empty line - signals end of frame
    Empty,
    /// Comment line (starts with ':'), also used for unknown fields
    Comment(String),
}

/// One complete SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    /// Data lines joined with `\n`
    pub data: String,
    pub id: Option<String>,
}

/// Strip the single optional space after a field colon.
fn field_value(rest: &str) -> &str {
    rest.strip_prefix(' ').unwrap_or(rest)
}

/// Parse a single SSE line into its component type
pub fn parse_sse_line(line: &str) -> SseLine {
    if line.is_empty() {
        return SseLine::Empty;
    }

    if let Some(stripped) = line.strip_prefix(':') {
        return SseLine::Comment(stripped.trim().to_string());
    }

    if let Some(rest) = line.strip_prefix("event:") {
        return SseLine::Event(rest.trim().to_string());
    }

    if let Some(rest) = line.strip_prefix("data:") {
        return SseLine::Data(field_value(rest).to_string());
    }

    if let Some(rest) = line.strip_prefix("id:") {
        return SseLine::Id(field_value(rest).to_string());
    }

    // Unknown line format - treat as comment
    SseLine::Comment(line.to_string())
}

/// Stateful SSE parser that accumulates lines and emits complete frames
#[derive(Debug, Default)]
pub struct SseParser {
    current_event: Option<String>,
    current_id: Option<String>,
    data_buffer: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line (without its terminator). Returns a frame when the line
    /// closes one that carried data.
    pub fn feed_line(&mut self, line: &str) -> Option<SseFrame> {
        match parse_sse_line(line) {
            SseLine::Event(event) => {
                self.current_event = Some(event);
                None
            }
            SseLine::Data(data) => {
                self.data_buffer.push(data);
                None
            }
            SseLine::Id(id) => {
                self.current_id = Some(id);
                None
            }
            SseLine::Empty => self.try_emit(),
            SseLine::Comment(_) => None,
        }
    }

    fn try_emit(&mut self) -> Option<SseFrame> {
        let event = self.current_event.take();
        let id = self.current_id.take();
        if self.data_buffer.is_empty() {
            return None;
        }
        let data = self.data_buffer.join("\n");
        self.data_buffer.clear();
        Some(SseFrame { event, data, id })
    }

    pub fn reset(&mut self) {
        self.current_event = None;
        self.current_id = None;
        self.data_buffer.clear();
    }
}

/// Longest line [`LineBuffer`] keeps by default.
pub const MAX_LINE_BYTES: usize = 1 << 20;

/// Splits a chunked byte stream into lines.
///
/// Chunk boundaries may fall anywhere, including inside a multi-byte
/// character. `\r\n` and `\n` both terminate a line. A line longer than
/// the limit is dropped whole, up to and including its terminator.
#[derive(Debug)]
pub struct LineBuffer {
    pending: Vec<u8>,
    max_line: usize,
    discarding: bool,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_line,
            discarding: false,
        }
    }

    /// Append `chunk` and return every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            if self.discarding {
                self.discarding = false;
                continue;
            }
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.len() > self.max_line {
                tracing::warn!(bytes = line.len(), limit = self.max_line, "Dropping oversized SSE line");
                continue;
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        if self.pending.len() > self.max_line {
            if !self.discarding {
                tracing::warn!(limit = self.max_line, "SSE line exceeds limit; discarding until next line break");
            }
            self.pending.clear();
            self.discarding = true;
        }
        lines
    }

    /// Bytes received after the last line break.
    pub fn remainder(&self) -> &[u8] {
        &self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_line() {
        assert_eq!(parse_sse_line(""), SseLine::Empty);
    }

    #[test]
    fn test_parse_comment_line() {
        assert_eq!(
            parse_sse_line(": keep-alive"),
            SseLine::Comment("keep-alive".to_string())
        );
        assert_eq!(
            parse_sse_line("retry: 100"),
            SseLine::Comment("retry: 100".to_string())
        );
    }

    #[test]
    fn test_parse_event_line() {
        assert_eq!(parse_sse_line("event: jobs"), SseLine::Event("jobs".to_string()));
        assert_eq!(parse_sse_line("event:jobs"), SseLine::Event("jobs".to_string()));
    }

    #[test]
    fn test_data_keeps_inner_whitespace() {
        assert_eq!(parse_sse_line("data:  x "), SseLine::Data(" x ".to_string()));
        assert_eq!(parse_sse_line("data:{\"a\":1}"), SseLine::Data("{\"a\":1}".to_string()));
        assert_eq!(parse_sse_line("id: 7"), SseLine::Id("7".to_string()));
    }

    #[test]
    fn test_parser_joins_multiline_data() {
        let mut parser = SseParser::new();
        assert!(parser.feed_line("event: status").is_none());
        assert!(parser.feed_line("id: 3").is_none());
        assert!(parser.feed_line("data: line one").is_none());
        assert!(parser.feed_line("data: line two").is_none());
        let frame = parser.feed_line("").unwrap();
        assert_eq!(frame.event.as_deref(), Some("status"));
        assert_eq!(frame.id.as_deref(), Some("3"));
        assert_eq!(frame.data, "line one\nline two");

        // State does not leak into the next frame
        parser.feed_line("data: next");
        let frame = parser.feed_line("").unwrap();
        assert_eq!(frame.event, None);
        assert_eq!(frame.data, "next");
    }

    #[test]
    fn test_parser_skips_frames_without_data() {
        let mut parser = SseParser::new();
        parser.feed_line(": ping");
        assert!(parser.feed_line("").is_none());
        parser.feed_line("event: lonely");
        assert!(parser.feed_line("").is_none());
        parser.feed_line("data: x");
        assert_eq!(parser.feed_line("").unwrap().event, None);
    }

    #[test]
    fn test_parser_reset() {
        let mut parser = SseParser::new();
        parser.feed_line("event: jobs");
        parser.feed_line("data: partial");
        parser.reset();
        assert!(parser.feed_line("").is_none());
    }

    #[test]
    fn test_line_buffer_split_chunks() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(b"data: a").is_empty());
        assert_eq!(buffer.push(b"bc\r\n\ndata"), vec!["data: abc".to_string(), String::new()]);
        assert_eq!(buffer.remainder(), b"data");
    }

    #[test]
    fn test_line_buffer_split_multibyte_char() {
        let bytes = "data: é\n".as_bytes();
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(&bytes[..7]).is_empty());
        assert_eq!(buffer.push(&bytes[7..]), vec!["data: é".to_string()]);
    }

    #[test]
    fn test_line_buffer_drops_unterminated_flood() {
        let mut buffer = LineBuffer::with_max_line(8);
        assert!(buffer.push(b"data: 0123").is_empty());
        assert!(buffer.push(b"456789").is_empty());
        assert!(buffer.push(&[b'x'; 64]).is_empty());
        assert!(buffer.remainder().len() <= 8);

        assert_eq!(buffer.push(b"tail\ndata: ok\n"), vec!["data: ok".to_string()]);
        assert!(buffer.remainder().is_empty());
    }

    #[test]
    fn test_line_buffer_drops_long_terminated_line() {
        let mut buffer = LineBuffer::with_max_line(8);
        assert_eq!(
            buffer.push(b"data: far too long\ndata: a\n"),
            vec!["data: a".to_string()]
        );
    }
}
