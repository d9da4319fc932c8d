use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod call_cmd;
mod chat_cmd;
mod client;

use client::GatewayClient;

#[derive(Parser)]
#[command(name = "toolgate", about = "toolgate CLI - call gateway tools from a terminal")]
struct Cli {
    /// toolgate server URL
    #[arg(long, env = "TOOLGATE_URL", default_value = "http://localhost:4000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tools the server exposes
    Tools,

    /// Call a tool and print the envelope
    Call {
        /// Tool name
        name: String,

        /// JSON object of arguments
        arguments: Option<String>,
    },

    /// Interactive chat: `/tool <name> [json]` calls a tool, other text is echoed
    Chat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = GatewayClient::new(&cli.url);

    match cli.command {
        Commands::Tools => call_cmd::list_tools(&client).await,
        Commands::Call { name, arguments } => {
            let ok = call_cmd::call(&client, &name, arguments.as_deref()).await?;
            if !ok {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Chat => chat_cmd::run(&client).await,
    }
}
