use clap::Subcommand;
use serde_json::json;
use std::collections::BTreeSet;

use crate::authz::{AccessLevel, PermissionVector};
use crate::cli::{utils::output_success, OutputFormat};
use crate::database::PgStore;
use crate::services::AccessService;

#[derive(Subcommand)]
pub enum AccessCommands {
    #[command(about = "Grant every mapped capability to access levels at or above a threshold")]
    Seed {
        #[arg(long)]
        account: String,
        #[arg(long, default_value_t = 5, help = "Lowest access level granted each capability")]
        min_level: u8,
    },

    #[command(about = "Set a user's account-wide or project-specific access level")]
    SetUser {
        #[arg(long)]
        account: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        level: u8,
        #[arg(long, help = "Project id for a project-specific override")]
        project: Option<String>,
    },

    #[command(about = "Show an account's permission matrix")]
    Show {
        #[arg(long)]
        account: String,
    },
}

fn parse_level(level: u8) -> anyhow::Result<AccessLevel> {
    AccessLevel::new(level).ok_or_else(|| anyhow::anyhow!("access level must be between 1 and 9, got {}", level))
}

pub async fn handle(cmd: AccessCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let store = PgStore::shared();
    let service = AccessService::new(&store);

    match cmd {
        AccessCommands::Seed { account, min_level } => {
            let threshold = parse_level(min_level)?;
            let grants = PermissionVector::from_levels(AccessLevel::all().filter(|level| *level >= threshold));

            let categories: BTreeSet<(String, String)> = service
                .list_api_categories()
                .await?
                .into_iter()
                .map(|c| (c.category_header, c.category_sub_header))
                .collect();

            for (header, sub_header) in &categories {
                service.upsert_definition(&account, header, sub_header, grants).await?;
            }

            output_success(
                output_format,
                &format!(
                    "Seeded {} capabilities for '{}' at levels {}-9",
                    categories.len(),
                    account,
                    threshold
                ),
                Some(json!({ "capabilities": categories.len(), "level_grants": grants })),
            )
        }
        AccessCommands::SetUser {
            account,
            user,
            level,
            project,
        } => {
            let level = parse_level(level)?;
            service
                .set_user_access_level(&account, &user, project.as_deref(), level)
                .await?;

            output_success(
                output_format,
                &format!("User '{}' in '{}' set to access level {}", user, account, level),
                Some(json!({ "user_id": user, "project_id": project, "access_level": level })),
            )
        }
        AccessCommands::Show { account } => {
            let definitions = service.list_definitions(&account).await?;
            match output_format {
                OutputFormat::Json => output_success(
                    output_format,
                    &format!("{} definitions", definitions.len()),
                    Some(serde_json::to_value(&definitions)?),
                ),
                OutputFormat::Text => {
                    for def in &definitions {
                        let levels = def
                            .level_grants
                            .allowed_levels()
                            .iter()
                            .map(|l| l.to_string())
                            .collect::<Vec<_>>()
                            .join(",");
                        println!("{:<20} {:<20} [{}]", def.category_header, def.category_sub_header, levels);
                    }
                    Ok(())
                }
            }
        }
    }
}
