//! Speech-to-text through an external binary (whisper.cpp style).

use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::config::TranscriptionConfig;
use crate::error::{Result, ToolChatError};

pub struct Transcriber {
    binary: String,
    model: String,
    args: Vec<String>,
    output_dir: PathBuf,
    timeout: Duration,
}

impl Transcriber {
    pub fn from_config(config: &TranscriptionConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            model: config.model.clone(),
            args: config.args.clone(),
            output_dir: config
                .output_dir
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Run the binary on `input` and return the reformatted transcript.
    pub async fn transcribe(&self, input: &Path, cancel: &CancellationToken) -> Result<String> {
        if !input.is_file() {
            return Err(ToolChatError::ExternalProcess(format!(
                "Audio file not found: {}",
                input.display()
            )));
        }

        let output_base = self
            .output_dir
            .join(format!("toolchat-transcript-{}", uuid::Uuid::new_v4()));
        let output_file = TranscriptFile(output_base.with_extension("txt"));
        let args = self.template_args(input, &output_base);

        tracing::info!(
            binary = %self.binary,
            input = %input.display(),
            timeout_secs = self.timeout.as_secs(),
            "starting transcription"
        );
        let start_time = Instant::now();

        let mut cmd = Command::new(&self.binary);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            ToolChatError::ExternalProcess(format!("Failed to spawn '{}': {}", self.binary, e))
        })?;

        let output = tokio::select! {
            _ = cancel.cancelled() => return Err(ToolChatError::Cancelled),
            result = tokio::time::timeout(self.timeout, child.wait_with_output()) => match result {
                Ok(output) => output.map_err(|e| {
                    ToolChatError::ExternalProcess(format!("Failed to wait for process: {}", e))
                })?,
                Err(_) => return Err(ToolChatError::Timeout),
            },
        };

        tracing::debug!(
            exit_code = output.status.code().unwrap_or(-1),
            duration_secs = start_time.elapsed().as_secs_f64(),
            "transcription process finished"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ToolChatError::ExternalProcess(format!(
                "'{}' exited with code {}: {}",
                self.binary,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        let raw = tokio::fs::read_to_string(&output_file.0).await.map_err(|e| {
            ToolChatError::ExternalProcess(format!(
                "Failed to read transcript {}: {}",
                output_file.0.display(),
                e
            ))
        })?;

        Ok(format_transcript(&raw))
    }

    fn template_args(&self, input: &Path, output_base: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output_base.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{model}", &self.model)
                    .replace("{input}", &input)
                    .replace("{output}", &output)
            })
            .collect()
    }
}

/// Transcript written by the binary; removed however the run ends.
struct TranscriptFile(PathBuf);

impl Drop for TranscriptFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.0) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(file = %self.0.display(), error = %e, "could not remove transcript file")
            }
        }
    }
}

fn timestamp_line() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\[([^\]]+)\]\s*(.*)$").expect("valid timestamp pattern"))
}

/// `[timestamp] text` becomes `timestamp - text`; other lines pass through.
pub fn format_transcript_line(line: &str) -> String {
    match timestamp_line().captures(line.trim()) {
        Some(caps) => format!("{} - {}", caps[1].trim(), caps[2].trim()),
        None => line.trim().to_string(),
    }
}

pub fn format_transcript(raw: &str) -> String {
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .map(format_transcript_line)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_transcript_line() {
        assert_eq!(
            format_transcript_line("[00:00:00.000 --> 00:00:02.500]   Hello there."),
            "00:00:00.000 --> 00:00:02.500 - Hello there."
        );
        assert_eq!(format_transcript_line("  plain words "), "plain words");
    }

    #[test]
    fn test_format_transcript_drops_blank_lines() {
        let raw = "[00:01] one\n\n[00:02] two\n";
        assert_eq!(format_transcript(raw), "00:01 - one\n00:02 - two");
    }

    #[test]
    fn test_template_args_substitutes_placeholders() {
        let transcriber = Transcriber::from_config(&TranscriptionConfig {
            model: "base.bin".to_string(),
            ..Default::default()
        });
        let args = transcriber.template_args(Path::new("/tmp/in.wav"), Path::new("/tmp/out"));
        assert_eq!(
            args,
            vec!["-m", "base.bin", "-f", "/tmp/in.wav", "-otxt", "-of", "/tmp/out"]
        );
    }

    #[tokio::test]
    async fn test_missing_input_is_external_process_error() {
        let transcriber = Transcriber::from_config(&TranscriptionConfig::default());
        let err = transcriber
            .transcribe(Path::new("/definitely/not/here.wav"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "external_process_error");
    }

    #[tokio::test]
    async fn test_spawn_failure_is_external_process_error() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("clip.wav");
        std::fs::write(&input, b"RIFF").unwrap();

        let transcriber = Transcriber::from_config(&TranscriptionConfig {
            binary: "toolchat-no-such-binary".to_string(),
            output_dir: Some(temp_dir.path().to_string_lossy().into_owned()),
            ..Default::default()
        });
        let err = transcriber
            .transcribe(&input, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "external_process_error");
        assert!(err.to_string().contains("Failed to spawn"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_binary_and_reads_output_file() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("clip.wav");
        std::fs::write(&input, b"RIFF").unwrap();

        // `sh -c 'printf ... > "$0.txt"' {output}` stands in for the real binary.
        let transcriber = Transcriber::from_config(&TranscriptionConfig {
            binary: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                r#"printf '[00:00] hi\n[00:02] bye\n' > "$0.txt""#.to_string(),
                "{output}".to_string(),
            ],
            output_dir: Some(temp_dir.path().to_string_lossy().into_owned()),
            ..Default::default()
        });

        let text = transcriber
            .transcribe(&input, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(text, "00:00 - hi\n00:02 - bye");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_run_leaves_no_transcript_behind() {
        let input_dir = TempDir::new().unwrap();
        let input = input_dir.path().join("clip.wav");
        std::fs::write(&input, b"RIFF").unwrap();
        let output_dir = TempDir::new().unwrap();

        let transcriber = Transcriber::from_config(&TranscriptionConfig {
            binary: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                r#"printf partial > "$0.txt"; exit 1"#.to_string(),
                "{output}".to_string(),
            ],
            output_dir: Some(output_dir.path().to_string_lossy().into_owned()),
            ..Default::default()
        });

        let err = transcriber
            .transcribe(&input, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "external_process_error");
        assert_eq!(std::fs::read_dir(output_dir.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_run_removes_transcript() {
        let input_dir = TempDir::new().unwrap();
        let input = input_dir.path().join("clip.wav");
        std::fs::write(&input, b"RIFF").unwrap();
        let output_dir = TempDir::new().unwrap();

        let transcriber = Transcriber::from_config(&TranscriptionConfig {
            binary: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                r#"printf '[00:00] ok\n' > "$0.txt""#.to_string(),
                "{output}".to_string(),
            ],
            output_dir: Some(output_dir.path().to_string_lossy().into_owned()),
            ..Default::default()
        });

        let text = transcriber
            .transcribe(&input, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(text, "00:00 - ok");
        assert_eq!(std::fs::read_dir(output_dir.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_process() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("clip.wav");
        std::fs::write(&input, b"RIFF").unwrap();

        let mut config = TranscriptionConfig {
            binary: "sleep".to_string(),
            args: vec!["5".to_string()],
            ..Default::default()
        };
        config.timeout_secs = 0;
        let transcriber = Transcriber::from_config(&config);

        let err = transcriber
            .transcribe(&input, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolChatError::Timeout));
    }
}
