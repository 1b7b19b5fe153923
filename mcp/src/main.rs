//! `websets-mcp` — MCP server for the Exa Websets API over stdio.

use clap::Parser;
use websets_mcp_runtime::McpCommands;

#[derive(Parser)]
#[command(
    name = "websets-mcp",
    version,
    about = "MCP server exposing Exa Websets tools over stdio"
)]
struct Cli {
    /// Base address of the Websets API
    #[arg(
        long,
        env = "EXA_BASE_URL",
        default_value = "https://api.exa.ai/websets/v0",
        global = true
    )]
    base_url: String,

    #[command(subcommand)]
    command: McpCommands,
}

#[tokio::main]
async fn main() {
    // Local overrides for development; missing .env is not an error.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let code = websets_mcp_runtime::run(&cli.base_url, cli.command).await;
    std::process::exit(code);
}
