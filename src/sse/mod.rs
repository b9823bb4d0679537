//! SSE (Server-Sent Events) support
//!
//! SSE format consists of:
//! - `event: <type>` - event type line
//! - `data: <json>` - data payload line, repeatable
//! - Empty line - signals end of frame
//! - Lines starting with `:` - comments (ignored)
//!
//! # Module structure
//! - `parser` - line splitting and frame assembly
//! - `push` - a [`PushSource`](crate::realtime::PushSource) reading `/events`

mod parser;
mod push;

pub use parser::{parse_sse_line, LineBuffer, SseFrame, SseLine, SseParser, MAX_LINE_BYTES};
pub use push::{SsePushSource, EVENTS_PATH};
