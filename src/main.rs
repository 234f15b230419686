use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use triage_graph::triage::config::{build_workflow, ConfigLoader};
use triage_graph::triage::server;
use triage_graph::triage::workflow::AttendantWorkflow;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a single query
    Ask {
        /// The query to send
        #[arg(short, long)]
        query: String,
    },
    /// Interactive chat loop; `/exit` or `/sair` quits
    Chat,
    /// Serve the HTTP API
    Serve {
        /// Port to listen on (overrides the configuration file)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

const EXIT_COMMANDS: [&str; 2] = ["/exit", "/sair"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    let config =
        ConfigLoader::load(args.config.as_deref()).context("Failed to load configuration")?;
    let workflow = Arc::new(
        build_workflow(&config).map_err(|e| anyhow::anyhow!("Failed to build workflow: {}", e))?,
    );

    match args.command {
        Commands::Ask { query } => {
            let response = workflow.invoke(&query).await?;
            println!("{}", response.final_answer);
        }
        Commands::Chat => chat(&workflow).await?,
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.server.port);
            server::serve(workflow, port)
                .await
                .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;
        }
    }

    Ok(())
}

async fn chat(workflow: &AttendantWorkflow) -> anyhow::Result<()> {
    println!("Type your question ({} to quit)", EXIT_COMMANDS.join(" or "));
    let stdin = io::stdin();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if EXIT_COMMANDS.contains(&query) {
            break;
        }

        match workflow.invoke(query).await {
            Ok(response) => println!("{}\n", response.final_answer),
            Err(e) => {
                log::error!("Invocation failed: {}", e);
                eprintln!("Error: {}", e);
            }
        }
    }

    Ok(())
}
