use clap::Parser;
use std::path::PathBuf;

use toolchat::config::ConfigOverrides;

#[derive(Parser, Debug)]
#[command(name = "toolchat")]
#[command(about = "Chat with a local model that can call tools", long_about = None)]
pub struct Args {
    #[arg(
        long = "api-endpoint",
        help = "Custom API base URL (e.g., http://localhost:1234/v1)"
    )]
    pub api_endpoint: Option<String>,

    #[arg(short = 'm', long = "model", help = "Model name sent with each request")]
    pub model: Option<String>,

    #[arg(
        long = "max-hops",
        help = "Maximum tool calls serviced for one message (default 1)"
    )]
    pub max_hops: Option<u32>,

    #[arg(long = "no-tools", help = "Do not advertise tools for this message")]
    pub no_tools: bool,

    #[arg(long = "no-stream", help = "Wait for the whole reply instead of streaming it")]
    pub no_stream: bool,

    #[arg(
        long = "transcribe",
        value_name = "FILE",
        help = "Transcribe an audio file and print the result"
    )]
    pub transcribe: Option<PathBuf>,

    #[arg(long = "list-tools", help = "Print the tools that would be advertised")]
    pub list_tools: bool,

    #[arg(short = 'c', long = "config", help = "Read configuration from this file")]
    pub config: Option<PathBuf>,

    #[arg(short = 'v', long = "verbose", help = "Log requests and tool calls to stderr")]
    pub verbose: bool,

    #[arg(help = "Message to send")]
    pub message: Vec<String>,
}

impl Args {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_path: self.config.clone(),
            api_endpoint: self.api_endpoint.clone(),
            model: self.model.clone(),
            max_hops: self.max_hops,
            no_tools: self.no_tools,
            no_stream: self.no_stream,
            verbose: self.verbose,
        }
    }
}
