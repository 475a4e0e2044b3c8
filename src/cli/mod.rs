pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "reqhub")]
#[command(about = "ReqHub CLI - tokens, authorization checks and access-level administration")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Mint a signed API token with the configured JWT secret")]
    Token {
        #[arg(long, help = "Corporate account")]
        account: String,
        #[arg(long, help = "User id")]
        user: String,
        #[arg(long, help = "Lifetime in hours (defaults to SECURITY_JWT_EXPIRY_HOURS)")]
        hours: Option<i64>,
    },

    #[command(about = "Approval authorization against the database")]
    Authz {
        #[command(subcommand)]
        cmd: commands::authz::AuthzCommands,
    },

    #[command(about = "Access-level matrix and user access levels")]
    Access {
        #[command(subcommand)]
        cmd: commands::access::AccessCommands,
    },

    #[command(about = "Apply database migrations")]
    Migrate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Token { account, user, hours } => commands::token::handle(&account, &user, hours, output_format),
        Commands::Authz { cmd } => commands::authz::handle(cmd, output_format).await,
        Commands::Access { cmd } => commands::access::handle(cmd, output_format).await,
        Commands::Migrate => {
            crate::database::DatabaseManager::migrate().await?;
            utils::output_success(output_format, "Migrations applied", None)
        }
    }
}
