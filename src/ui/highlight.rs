use colored::*;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Style, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};
use terminal_size::{terminal_size, Width};

const FENCE: &str = "```";
const THEME: &str = "Solarized (dark)";
const MAX_RULE: usize = 60;

/// Incremental renderer for text that may contain fenced code blocks.
///
/// Text outside fences passes through. Code inside a fence is boxed and
/// highlighted line by line as complete lines arrive, so it can be fed
/// streamed chunks.
pub struct CodeBuffer {
    buffer: String,
    fence: Option<Fence>,
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
}

struct Fence {
    label: Option<String>,
    content: String,
    shown_lines: usize,
}

impl Default for CodeBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeBuffer {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            fence: None,
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
        }
    }

    pub fn append(&mut self, content: &str) -> String {
        self.buffer.push_str(content);
        let mut output = String::new();

        while !self.buffer.is_empty() {
            if self.fence.is_none() {
                let Some(start) = self.buffer.find(FENCE) else {
                    let ready = self.buffer.len() - held_backticks(&self.buffer);
                    output.extend(self.buffer.drain(..ready));
                    break;
                };
                let after = &self.buffer[start + FENCE.len()..];
                // The label line must be complete before the box can open.
                let Some(newline) = after.find('\n') else {
                    output.push_str(&self.buffer[..start]);
                    self.buffer.drain(..start);
                    break;
                };

                let label = after[..newline].trim();
                let label = (!label.is_empty()).then(|| label.to_string());
                output.push_str(&self.buffer[..start]);
                output.push_str(&header(label.as_deref()));
                self.buffer.drain(..start + FENCE.len() + newline + 1);
                self.fence = Some(Fence {
                    label,
                    content: String::new(),
                    shown_lines: 0,
                });
            } else if let Some(end) = self.buffer.find(FENCE) {
                let closing: String = self.buffer.drain(..end + FENCE.len()).collect();
                if let Some(fence) = self.fence.as_mut() {
                    fence.content.push_str(&closing[..end]);
                }
                output.push_str(&self.close_fence(true));
            } else {
                let ready = self.buffer.len() - held_backticks(&self.buffer);
                let chunk: String = self.buffer.drain(..ready).collect();
                if let Some(fence) = self.fence.as_mut() {
                    fence.content.push_str(&chunk);
                }
                output.push_str(&self.highlight_complete_lines());
                break;
            }
        }

        output
    }

    /// Emit everything still buffered, closing an unterminated fence.
    pub fn flush(&mut self) -> String {
        let rest = std::mem::take(&mut self.buffer);
        match self.fence.as_mut() {
            Some(fence) => {
                fence.content.push_str(&rest);
                self.close_fence(false)
            }
            None => rest,
        }
    }

    /// Box `body` as a whole. Unlike `append`, backticks in `body` are
    /// ordinary text.
    pub fn render_block(&self, label: &str, body: &str) -> String {
        let mut code = body.to_string();
        if !code.ends_with('\n') {
            code.push('\n');
        }
        let mut output = header(Some(label));
        output.push_str(&self.highlight(&code, Some(label)));
        output.push_str(&footer());
        output
    }

    fn highlight_complete_lines(&mut self) -> String {
        let Some(fence) = self.fence.as_mut() else {
            return String::new();
        };
        // The last line may still grow.
        let complete = fence.content.matches('\n').count();
        if complete <= fence.shown_lines {
            return String::new();
        }
        let fresh: String = fence
            .content
            .split_inclusive('\n')
            .skip(fence.shown_lines)
            .take(complete - fence.shown_lines)
            .collect();
        fence.shown_lines = complete;
        let label = fence.label.clone();
        self.highlight(&fresh, label.as_deref())
    }

    fn close_fence(&mut self, strip_trailing_newline: bool) -> String {
        let Some(fence) = self.fence.take() else {
            return String::new();
        };
        let mut rest: String = fence
            .content
            .split_inclusive('\n')
            .skip(fence.shown_lines)
            .collect();
        if !rest.is_empty() && !rest.ends_with('\n') {
            rest.push('\n');
        }

        let mut output = String::new();
        if !rest.is_empty() {
            output.push_str(&self.highlight(&rest, fence.label.as_deref()));
        }
        output.push_str(&footer());

        if strip_trailing_newline && self.buffer.starts_with('\n') {
            self.buffer.remove(0);
        }
        output
    }

    fn highlight(&self, code: &str, label: Option<&str>) -> String {
        let Some(theme) = self.theme_set.themes.get(THEME) else {
            return code.to_string();
        };
        let syntax = label
            .and_then(|lang| {
                self.syntax_set
                    .find_syntax_by_token(lang)
                    .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
            })
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let mut highlighter = HighlightLines::new(syntax, theme);
        let mut output = String::new();
        for line in LinesWithEndings::from(code) {
            match highlighter.highlight_line(line, &self.syntax_set) {
                Ok(ranges) => {
                    let ranges: Vec<(Style, &str)> = ranges;
                    output.push_str(&as_24_bit_terminal_escaped(&ranges[..], false));
                }
                Err(e) => {
                    tracing::debug!(error = %e, "highlighting failed; emitting plain line");
                    output.push_str(line);
                }
            }
        }
        // Reset attributes so the footer is not tinted.
        output.push_str("\x1b[0m");
        output
    }
}

/// Trailing backticks that may be the start of a fence split across chunks.
fn held_backticks(s: &str) -> usize {
    (s.len() - s.trim_end_matches('`').len()).min(2)
}

fn rule_width() -> usize {
    terminal_size()
        .map(|(Width(w), _)| w as usize)
        .unwrap_or(MAX_RULE)
        .clamp(20, MAX_RULE)
}

fn header(label: Option<&str>) -> String {
    let label = label.unwrap_or("code");
    let used = label.chars().count() + 4;
    format!(
        "{}[{}]{}\n",
        "┌─".dimmed(),
        label.cyan(),
        "─".repeat(rule_width().saturating_sub(used)).dimmed()
    )
}

fn footer() -> String {
    format!("{}\n", format!("└{}", "─".repeat(rule_width() - 1)).dimmed())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(chunks: &[&str]) -> String {
        colored::control::set_override(false);
        let mut buffer = CodeBuffer::new();
        let mut out = String::new();
        for chunk in chunks {
            out.push_str(&buffer.append(chunk));
        }
        out.push_str(&buffer.flush());
        out
    }

    fn strip_ansi(s: &str) -> String {
        let re = regex::Regex::new(r"\x1b\[[0-9;]*m").unwrap();
        re.replace_all(s, "").into_owned()
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(render(&["hello ", "world"]), "hello world");
    }

    #[test]
    fn test_code_block_is_boxed() {
        let out = strip_ansi(&render(&["before\n```rust\nlet x = 1;\n```\nafter"]));
        assert!(out.starts_with("before\n┌─[rust]"));
        assert!(out.contains("let x = 1;\n└"));
        assert!(out.ends_with("after"));
        assert!(!out.contains("```"));
    }

    #[test]
    fn test_fence_split_across_chunks() {
        let out = strip_ansi(&render(&["``", "`py", "\nprint(1)\npri", "nt(2)\n``", "`"]));
        assert!(out.contains("[py]"));
        assert!(out.contains("print(1)\nprint(2)\n"));
        assert!(out.trim_end().ends_with('─'));
    }

    #[test]
    fn test_render_block_keeps_backticks_inside_box() {
        colored::control::set_override(false);
        let buffer = CodeBuffer::new();
        let out = strip_ansi(&buffer.render_block("TOOL: echo", "before\n```\nafter"));
        assert!(out.starts_with("┌─[TOOL: echo]"));
        assert!(out.contains("before\n```\nafter\n└"));
        assert_eq!(out.matches('└').count(), 1);
        assert!(out.ends_with("─\n"));
    }

    #[test]
    fn test_unterminated_fence_is_closed_on_flush() {
        let out = strip_ansi(&render(&["```\nhalf"]));
        assert!(out.contains("[code]"));
        assert!(out.contains("half\n└"));
    }
}
