mod cli;

use clap::Parser;
use colored::*;
use serde_json::json;
use std::io::{self, Write};
use std::process;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use cli::Args;
use toolchat::api::{ChatClient, ModelReply, StreamDelta, StreamSink};
use toolchat::config::Config;
use toolchat::dispatch::{Exchange, ExchangeOutcome, ExchangeSettings, ToolObserver, ToolRun};
use toolchat::tools::{build_registry, ToolRegistry, ToolSettings};
use toolchat::transcription::Transcriber;
use toolchat::ui::output::{display_error, display_rendered, display_tool_error, display_tool_result};
use toolchat::ui::{present, LiveRenderer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match Config::from_env_and_overrides(&args.overrides()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red(), e);
            process::exit(1);
        }
    };

    toolchat::init_tracing(if config.verbose { "toolchat=debug" } else { "warn" });

    let settings = ToolSettings {
        transcriber: Some(Arc::new(Transcriber::from_config(&config.transcription))),
    };
    let registry = build_registry(&config.tools, settings);

    if args.list_tools {
        print_tools(&registry);
        return Ok(());
    }

    let cancel = CancellationToken::new();
    spawn_ctrl_c(cancel.clone());

    if let Some(path) = &args.transcribe {
        let arguments = json!({ "path": path.to_string_lossy() });
        match registry.invoke("transcribe_audio", arguments, &cancel).await {
            Ok(value) => {
                let text = value
                    .get("transcription")
                    .and_then(|t| t.as_str())
                    .unwrap_or_default();
                display_tool_result("transcribe_audio", text);
                return Ok(());
            }
            Err(e) => {
                display_tool_error("transcribe_audio", &e.to_string());
                process::exit(1);
            }
        }
    }

    if args.message.is_empty() {
        print_usage();
        process::exit(1);
    }
    let message = args.message.join(" ");

    let live = Arc::new(Mutex::new(LiveRenderer::new()));
    let mut client = ChatClient::new(&config)?;
    if config.stream {
        let renderer = live.clone();
        let sink: StreamSink = Arc::new(move |delta: &StreamDelta| {
            if let Ok(mut renderer) = renderer.lock() {
                print!("{}", renderer.push(delta));
                let _ = io::stdout().flush();
            }
        });
        client = client.with_stream_sink(sink);
    }

    if config.verbose {
        eprintln!("{}", format!("[toolchat] Endpoint: {}", client.endpoint()).dimmed());
        eprintln!("{}", format!("[toolchat] Model: {}", config.model).dimmed());
        eprintln!(
            "{}",
            format!(
                "[toolchat] Tools: {} (max hops {})",
                registry.list_tools().len(),
                config.max_hops
            )
            .dimmed()
        );
    }

    let observer: ToolObserver = Arc::new(|run: &ToolRun| {
        display_tool_result(&run.tool, &run.result.to_string());
    });

    let registry = registry.into_shared();
    let exchange_settings = ExchangeSettings::from_config(&config);
    let report = Exchange::new(&client, &registry, &exchange_settings)
        .with_cancellation(cancel)
        .with_tool_observer(observer)
        .run(&message)
        .await;

    match report.outcome {
        ExchangeOutcome::Done(reply) => {
            let rendered = present(&reply);
            if rendered.thinking.is_none() && rendered.segments.is_empty() {
                display_empty_reply(&reply, config.max_hops);
            } else if reply.streamed {
                if let Ok(mut renderer) = live.lock() {
                    print!("{}", renderer.finish());
                }
                println!();
            } else {
                display_rendered(&rendered);
            }
        }
        ExchangeOutcome::InputRequired(call) => {
            println!(
                "{} The model wants to run '{}', which needs input from you.",
                "Input required:".yellow().bold(),
                call.tool_name
            );
            if call.tool_name == "transcribe_audio" {
                println!("Run again with {} to provide the recording.", "--transcribe <FILE>".cyan());
            }
        }
        ExchangeOutcome::Failed(error) => {
            display_error(&error);
            process::exit(1);
        }
    }

    Ok(())
}

/// A reply with nothing to show, usually a tool call past the hop limit.
fn display_empty_reply(reply: &ModelReply, max_hops: u32) {
    match reply.first_tool_call() {
        Some(call) => println!(
            "{} The model asked for '{}' after {} tool call(s); raise --max-hops to allow it.",
            "Not run:".yellow().bold(),
            call.function.name,
            max_hops
        ),
        None => println!("{}", "The model returned an empty reply.".dimmed()),
    }
}

fn spawn_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "\nCancelled.".yellow());
            cancel.cancel();
        }
    });
}

fn print_tools(registry: &ToolRegistry) {
    if registry.list_tools().is_empty() {
        println!("{}", "No tools registered.".yellow());
        return;
    }
    for tool in registry.list_tools() {
        let marker = if tool.requires_interactive_input {
            " (needs user input)".dimmed().to_string()
        } else {
            String::new()
        };
        println!("{}{}", tool.name.cyan().bold(), marker);
        println!("  {}", tool.description);
    }
}

fn print_usage() {
    println!("{}", "Usage: toolchat [OPTIONS] <message>".yellow());
    println!();
    println!("Examples:");
    println!("  toolchat what is 2 plus 3");
    println!("  toolchat --max-hops 2 multiply 4 by 5 then add 1");
    println!("  toolchat --transcribe meeting.wav");
    println!("  toolchat --list-tools");
    println!();
    println!("Run 'toolchat --help' for all options.");
}
