use clap::Subcommand;
use serde_json::json;

use crate::authz::{ApprovalAuthorizer, AuthScope, LevelHierarchy};
use crate::cli::{utils::output_success, OutputFormat};
use crate::database::PgStore;
use crate::types::ProjectScope;

#[derive(Subcommand)]
pub enum AuthzCommands {
    #[command(about = "Check whether a user may approve a project, level or requirement")]
    Check {
        #[arg(long)]
        account: String,
        #[arg(long)]
        project: String,
        #[arg(long)]
        user: String,
        #[arg(long, help = "Requirement id (omit or 0 for none)")]
        req_id: Option<i64>,
        #[arg(long, help = "Functional level id (omit or 0 for none)")]
        level_id: Option<i64>,
    },

    #[command(about = "Show a functional level and its ancestors")]
    Path {
        #[arg(long)]
        account: String,
        #[arg(long)]
        project: String,
        #[arg(long)]
        level_id: i64,
    },
}

pub async fn handle(cmd: AuthzCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let store = PgStore::shared();

    match cmd {
        AuthzCommands::Check {
            account,
            project,
            user,
            req_id,
            level_id,
        } => {
            let scope = ProjectScope::new(account, project);
            let target = AuthScope::from_ids(req_id, level_id)?;
            let authorized = ApprovalAuthorizer::new(&store)
                .is_user_authorized_to_approve(&scope, &user, target)
                .await?;

            let message = format!(
                "User '{}' is {}authorized to approve {} in {}",
                user,
                if authorized { "" } else { "not " },
                target,
                scope
            );
            output_success(
                output_format,
                &message,
                Some(json!({ "authorized": authorized, "target": target })),
            )
        }
        AuthzCommands::Path {
            account,
            project,
            level_id,
        } => {
            let scope = ProjectScope::new(account, project);
            let path = LevelHierarchy::new(&store).path(&scope, level_id).await?;
            let chain = path
                .levels
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(" -> ");

            output_success(
                output_format,
                &format!("{} ({:?})", chain, path.end),
                Some(serde_json::to_value(&path)?),
            )
        }
    }
}
