use chrono::Duration;
use serde_json::json;

use crate::auth::{generate_jwt, Claims};
use crate::cli::{utils::output_success, OutputFormat};

pub fn handle(account: &str, user: &str, hours: Option<i64>, output_format: OutputFormat) -> anyhow::Result<()> {
    let claims = match hours {
        Some(hours) if hours > 0 => Claims::with_expiry(account, user, Duration::hours(hours)),
        Some(hours) => anyhow::bail!("--hours must be positive, got {}", hours),
        None => Claims::new(account, user),
    };
    let token = generate_jwt(&claims)?;

    match output_format {
        OutputFormat::Text => println!("{}", token),
        OutputFormat::Json => output_success(
            output_format,
            "Token generated",
            Some(json!({
                "token": token,
                "corporate_account": claims.corporate_account,
                "user_id": claims.user_id,
                "expires_at": claims.exp
            })),
        )?,
    }
    Ok(())
}
