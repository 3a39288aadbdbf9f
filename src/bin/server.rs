use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::process;

use toolchat::config::defaults::DEFAULT_BIND_ADDR;
use toolchat::config::{Config, ConfigOverrides};
use toolchat::server::{AppState, Server};

#[derive(Parser, Debug)]
#[command(name = "toolchat-server")]
#[command(about = "Serve the toolchat web client and its JSON API", long_about = None)]
struct Args {
    #[arg(short = 'b', long = "bind", help = "Address to listen on (default 127.0.0.1:3000)")]
    bind: Option<String>,

    #[arg(long = "static-dir", help = "Directory served at /")]
    static_dir: Option<PathBuf>,

    #[arg(long = "api-endpoint", help = "Custom API base URL")]
    api_endpoint: Option<String>,

    #[arg(long = "max-hops", help = "Maximum tool calls serviced per message")]
    max_hops: Option<u32>,

    #[arg(short = 'c', long = "config", help = "Read configuration from this file")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    toolchat::init_tracing("info,tower_http=debug");

    let overrides = ConfigOverrides {
        config_path: args.config.clone(),
        api_endpoint: args.api_endpoint.clone(),
        max_hops: args.max_hops,
        ..Default::default()
    };
    let config = match Config::from_env_and_overrides(&overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red(), e);
            process::exit(1);
        }
    };

    let bind = args
        .bind
        .or_else(|| config.server.bind.clone())
        .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
    let static_dir = args
        .static_dir
        .unwrap_or_else(|| PathBuf::from(&config.server.static_dir));

    let state = match AppState::from_config(&config) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            process::exit(1);
        }
    };

    let mut server = match Server::start(&bind, state, &static_dir).await {
        Ok(server) => server,
        Err(e) => {
            eprintln!("{} failed to bind {}: {}", "Error:".red(), bind, e);
            process::exit(1);
        }
    };

    println!(
        "{} http://{}",
        "Server running at".green(),
        server.addr()
    );
    println!("{}", format!("Model endpoint: {}", config.api_endpoint).dimmed());

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
    tracing::info!("shutting down");
    server.shutdown();
    server.join().await;
}
