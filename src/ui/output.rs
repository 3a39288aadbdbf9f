use colored::*;

use super::highlight::CodeBuffer;
use super::presentation::{RenderedReply, Segment};
use crate::error::ToolChatError;

fn boxed(label: &str, body: &str) -> String {
    CodeBuffer::new().render_block(label, body)
}

pub fn display_tool_result(name: &str, result: &str) {
    print!("{}", boxed(&format!("TOOL: {}", name), result));
}

pub fn display_tool_error(name: &str, error: &str) {
    print!("{}", boxed(&format!("TOOL ERROR: {}", name), error));
}

pub fn display_reasoning(reasoning: &str) {
    let cleaned = reasoning.replace("**", "");
    println!();
    print!("{}", boxed("REASONING", cleaned.trim()));
}

/// Print an exchange failure as the single visible outcome.
pub fn display_error(error: &ToolChatError) {
    eprintln!("{} {}", "Error:".red().bold(), error);
}

pub fn display_rendered(reply: &RenderedReply) {
    if let Some(thinking) = &reply.thinking {
        display_reasoning(thinking);
    }
    for segment in &reply.segments {
        match segment {
            Segment::Text { content } => println!("{}", format_markdown(content)),
            Segment::Code { language, code } => print!("{}", boxed(language, code)),
        }
    }
}

/// Headings in bold, `- ` bullets as dots.
pub fn format_markdown(text: &str) -> String {
    text.lines()
        .map(|line| {
            if let Some(heading) = line.strip_prefix("### ") {
                heading.bold().to_string()
            } else if let Some(heading) = line.strip_prefix("## ") {
                heading.bold().underline().to_string()
            } else if let Some(item) = line.strip_prefix("- ") {
                format!("  {} {}", "•".cyan(), item)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boxed_body_with_fence_stays_boxed() {
        colored::control::set_override(false);
        let out = boxed("TOOL ERROR: run", "bad input:\n```\nrm -rf\n```\ntrailing");
        let out = regex::Regex::new(r"\x1b\[[0-9;]*m")
            .unwrap()
            .replace_all(&out, "")
            .into_owned();
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].contains("[TOOL ERROR: run]"));
        assert!(lines.last().unwrap().starts_with('└'));
        assert!(lines.iter().any(|l| l.contains("trailing")));
        assert_eq!(lines.iter().filter(|l| l.starts_with('└')).count(), 1);
    }

    #[test]
    fn test_format_markdown_headings_and_bullets() {
        colored::control::set_override(false);
        assert_eq!(
            format_markdown("## Title\n### Sub\n- one\nplain"),
            "Title\nSub\n  • one\nplain"
        );
    }
}
