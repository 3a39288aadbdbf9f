//! Turning a model reply into displayable parts.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::api::ModelReply;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Segment {
    Text { content: String },
    Code { language: String, code: String },
}

/// A reply split into its thinking span and text/code segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderedReply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    pub segments: Vec<Segment>,
}

fn thinking_span() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)<think>(.*?)</think>").expect("valid thinking pattern"))
}

fn fence_opener() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"```(\w+)?\n").expect("valid fence pattern"))
}

/// Pull the first `<think>...</think>` span out of `text`.
pub fn split_thinking(text: &str) -> (Option<String>, String) {
    match thinking_span().captures(text) {
        Some(caps) => {
            let span = caps.get(0).map_or(0..0, |m| m.range());
            let thinking = caps.get(1).map_or("", |m| m.as_str()).trim().to_string();
            let mut rest = String::with_capacity(text.len());
            rest.push_str(&text[..span.start]);
            rest.push_str(&text[span.end..]);
            (Some(thinking), rest.trim().to_string())
        }
        None => (None, text.trim().to_string()),
    }
}

/// Split `text` into alternating prose and fenced code. Code is kept
/// byte for byte; an unclosed fence runs to the end of the text.
pub fn segments(text: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut rest = text;

    while let Some(caps) = fence_opener().captures(rest) {
        let Some(opener) = caps.get(0) else { break };
        push_text(&mut out, &rest[..opener.start()]);

        let language = caps
            .get(1)
            .map_or("text", |m| m.as_str())
            .to_string();
        let body = &rest[opener.end()..];

        match body.find("```") {
            Some(end) => {
                out.push(Segment::Code {
                    language,
                    code: body[..end].to_string(),
                });
                rest = &body[end + 3..];
            }
            None => {
                out.push(Segment::Code {
                    language,
                    code: body.to_string(),
                });
                rest = "";
            }
        }
    }

    push_text(&mut out, rest);
    out
}

fn push_text(out: &mut Vec<Segment>, text: &str) {
    let text = text.trim_matches('\n');
    if !text.trim().is_empty() {
        out.push(Segment::Text {
            content: text.to_string(),
        });
    }
}

pub fn present_text(text: &str) -> RenderedReply {
    let (thinking, answer) = split_thinking(text);
    RenderedReply {
        thinking,
        segments: segments(&answer),
    }
}

/// Render a reply. Reasoning the endpoint returned separately is used when
/// the content carries no thinking span of its own.
pub fn present(reply: &ModelReply) -> RenderedReply {
    let mut rendered = present_text(reply.content_or_empty());
    if rendered.thinking.is_none() {
        rendered.thinking = reply
            .reasoning
            .as_ref()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
    }
    rendered
}
