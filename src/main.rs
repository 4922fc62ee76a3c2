//! Command-line entry point.
//!
//! Usage:
//!   OPENAI_API_KEY=sk-... pc-agent serve --port 8081
//!   ANTHROPIC_API_KEY=sk-... pc-agent call get_pc_settings "what is my username"
//!   pc-agent tools
//!   pc-agent check --live

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use pc_agent::{
    extract_with_mode, AppState, Capability, Dispatcher, LlmClient, Settings, ToolError,
    ToolRegistry, ToolRequest,
};

#[derive(Parser)]
#[command(name = "pc-agent", about = "Control and troubleshoot your PC using natural language")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Bind address (overrides HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port (overrides PORT)
        #[arg(long, short = 'p')]
        port: Option<u16>,
    },
    /// Run one tool and print its result
    Call {
        /// Tool name: run_diagnosis, get_pc_settings or execute_troubleshooting
        tool: String,

        /// What you want, in plain words
        text: String,
    },
    /// List available tools
    Tools,
    /// Check environment, provider selection and JSON extraction
    Check {
        /// Also make one real LLM round trip
        #[arg(long)]
        live: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let settings = Settings::from_env();

    match cli.command {
        Command::Tools => {
            list_tools();
            ExitCode::SUCCESS
        }
        Command::Check { live } => check(settings, live).await,
        Command::Serve { host, port } => match settings {
            Ok(s) => serve(s, host, port).await,
            Err(e) => config_failure(&e),
        },
        Command::Call { tool, text } => match settings {
            Ok(s) => call(&s, &tool, text).await,
            Err(e) => config_failure(&e),
        },
    }
}

fn config_failure(e: &ToolError) -> ExitCode {
    eprintln!("error: {e}");
    ExitCode::FAILURE
}

async fn serve(settings: Settings, host: Option<String>, port: Option<u16>) -> ExitCode {
    let host = host.unwrap_or_else(|| settings.host.clone());
    let port = port.unwrap_or(settings.port);
    let addr: SocketAddr = match format!("{host}:{port}").parse() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: invalid bind address {host}:{port}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let state = match AppState::from_settings(&settings) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match pc_agent::server::serve(state, addr).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: server failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn call(settings: &Settings, tool: &str, text: String) -> ExitCode {
    let capability = match ToolRegistry::builtin().lookup(tool) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let llm = match LlmClient::from_settings(settings) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let dispatcher = Dispatcher::from_settings(settings, llm);
    let result = dispatcher.call(ToolRequest::new(capability, text)).await;
    println!("{}", result.result);
    if result.is_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn list_tools() {
    for tool in ToolRegistry::builtin().schemas() {
        println!(
            "{:<26} {}",
            tool["name"].as_str().unwrap_or(""),
            tool["description"].as_str().unwrap_or("")
        );
    }
}

const EXTRACTION_FIXTURES: [&str; 3] = [
    r#"{"command": "echo test"}"#,
    "```json\n{\"command\": \"echo test\"}\n```",
    "```\n{\"command\": \"echo test\"}\n```",
];

async fn check(settings: Result<Settings, ToolError>, live: bool) -> ExitCode {
    let mut ok = true;

    println!("Environment");
    println!("  os:         {}", pc_agent::host::os_label());
    println!("  shell:      {}", pc_agent::exec::shell_label());

    // Reported, not fatal.
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            ok = false;
            println!("  config:     FAILED {e}");
            Settings::default()
        }
    };
    println!("  credential: {}", settings.credential_summary());

    let llm = match LlmClient::from_settings(&settings) {
        Ok(c) => c,
        Err(e) => {
            ok = false;
            println!("  provider:   FAILED {e}");
            LlmClient::unconfigured()
        }
    };
    println!("  provider:   {}", llm.describe());

    println!("\nJSON extraction ({:?})", settings.fence_mode);
    for (i, fixture) in EXTRACTION_FIXTURES.iter().enumerate() {
        let extracted = extract_with_mode(fixture, settings.fence_mode);
        match serde_json::from_str::<serde_json::Value>(&extracted) {
            Ok(v) => println!("  case {}: ok {v}", i + 1),
            Err(e) => {
                ok = false;
                println!("  case {}: FAILED {e}", i + 1);
            }
        }
    }

    println!("\nTools");
    for cap in Capability::ALL {
        println!("  {cap}");
    }

    if live {
        println!("\nLLM round trip");
        match llm
            .get_llm_response(r#"Return only this JSON: {"test": "success"}"#, "hello")
            .await
        {
            Ok(reply) => {
                let extracted = extract_with_mode(&reply, settings.fence_mode);
                match serde_json::from_str::<serde_json::Value>(&extracted) {
                    Ok(v) => println!("  ok {v}"),
                    Err(e) => {
                        ok = false;
                        println!("  FAILED to parse reply: {e}\n  raw: {reply:?}");
                    }
                }
            }
            Err(e) => {
                ok = false;
                println!("  FAILED {e}");
            }
        }
    }

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
