//! Management CLI for kvrouter's admin surface.

use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "kvrouter-cli")]
#[command(about = "Management CLI for kvrouter", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:11300")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check router status
    Status,
    /// Dump the routing counters
    Stats {
        /// A single counter name to query
        name: Option<String>,
    },
    /// List destination health
    Destinations,
    /// Reload the topology from disk
    Reload,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let response = match cli.command {
        Commands::Status => client.get(format!("{}/status", cli.url)).send().await?,
        Commands::Stats { name: Some(name) } => {
            client
                .get(format!("{}/stats/{}", cli.url, name))
                .send()
                .await?
        }
        Commands::Stats { name: None } => client.get(format!("{}/stats", cli.url)).send().await?,
        Commands::Destinations => {
            client
                .get(format!("{}/destinations", cli.url))
                .send()
                .await?
        }
        Commands::Reload => client.post(format!("{}/reload", cli.url)).send().await?,
    };

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        eprintln!("Error: admin API returned status {status}");
        eprintln!("{body}");
        std::process::exit(1);
    }

    match serde_json::from_str::<Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
    }
    Ok(())
}
