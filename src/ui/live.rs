use colored::*;

use super::highlight::CodeBuffer;
use crate::api::StreamDelta;

const OPEN: &str = "<think>";
const CLOSE: &str = "</think>";

/// Renders a streamed reply as it arrives.
///
/// Reasoning deltas and `<think>` spans in the content go to a dimmed
/// REASONING box; the rest goes through a [`CodeBuffer`]. Tags split across
/// chunks are held back until they can be recognised.
pub struct LiveRenderer {
    code: CodeBuffer,
    pending: String,
    in_think: bool,
    reasoning_open: bool,
}

impl Default for LiveRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveRenderer {
    pub fn new() -> Self {
        Self {
            code: CodeBuffer::new(),
            pending: String::new(),
            in_think: false,
            reasoning_open: false,
        }
    }

    pub fn push(&mut self, delta: &StreamDelta) -> String {
        let mut out = String::new();
        if let Some(reasoning) = &delta.reasoning {
            out.push_str(&self.reasoning(reasoning));
        }
        if let Some(content) = &delta.content {
            self.pending.push_str(content);
            out.push_str(&self.drain(false));
        }
        out
    }

    pub fn finish(&mut self) -> String {
        let mut out = self.drain(true);
        out.push_str(&self.close_reasoning());
        out.push_str(&self.code.flush());
        out
    }

    fn drain(&mut self, at_end: bool) -> String {
        let mut out = String::new();
        loop {
            let tag = if self.in_think { CLOSE } else { OPEN };
            if let Some(pos) = self.pending.find(tag) {
                let before: String = self.pending.drain(..pos + tag.len()).collect();
                out.push_str(&self.emit(&before[..pos]));
                self.in_think = !self.in_think;
                if self.in_think {
                    out.push_str(&self.open_reasoning());
                } else {
                    out.push_str(&self.close_reasoning());
                }
                continue;
            }

            let held = if at_end { 0 } else { partial_tag_len(&self.pending, tag) };
            let ready: String = self.pending.drain(..self.pending.len() - held).collect();
            out.push_str(&self.emit(&ready));
            return out;
        }
    }

    fn emit(&mut self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        if self.in_think {
            self.reasoning(text)
        } else {
            let mut out = self.close_reasoning();
            out.push_str(&self.code.append(text));
            out
        }
    }

    fn reasoning(&mut self, text: &str) -> String {
        let mut out = self.open_reasoning();
        out.push_str(&text.dimmed().to_string());
        out
    }

    fn open_reasoning(&mut self) -> String {
        if self.reasoning_open {
            return String::new();
        }
        self.reasoning_open = true;
        format!("{}[{}]\n", "┌─".dimmed(), "REASONING".cyan())
    }

    fn close_reasoning(&mut self) -> String {
        if !self.reasoning_open {
            return String::new();
        }
        self.reasoning_open = false;
        format!("\n{}\n", "└─".dimmed())
    }
}

/// Length of the longest suffix of `text` that is a proper prefix of `tag`.
fn partial_tag_len(text: &str, tag: &str) -> usize {
    (1..tag.len())
        .rev()
        .find(|&n| text.ends_with(&tag[..n]))
        .unwrap_or(0)
}
