use sqlx::{Postgres, Transaction};

use crate::database::manager::DatabaseError;

/// Sequence handing out functional level ids within a project
pub const LEVEL_SEQUENCE: &str = "functional_level";

/// Allocate the next value of a per-(account, project) sequence.
///
/// The counter row is locked with `SELECT ... FOR UPDATE` for the rest of the
/// caller's transaction, so concurrent inserts never receive the same value.
/// A missing counter row starts at 1.
pub async fn next_value(
    tx: &mut Transaction<'_, Postgres>,
    corporate_account: &str,
    project_id: &str,
    sequence_name: &str,
) -> Result<i64, DatabaseError> {
    sqlx::query(
        "INSERT INTO account_sequences (corporate_account, project_id, sequence_name, last_value)
         VALUES ($1, $2, $3, 0)
         ON CONFLICT (corporate_account, project_id, sequence_name) DO NOTHING",
    )
    .bind(corporate_account)
    .bind(project_id)
    .bind(sequence_name)
    .execute(&mut **tx)
    .await?;

    let (current,): (i64,) = sqlx::query_as(
        "SELECT last_value FROM account_sequences
         WHERE corporate_account = $1 AND project_id = $2 AND sequence_name = $3
         FOR UPDATE",
    )
    .bind(corporate_account)
    .bind(project_id)
    .bind(sequence_name)
    .fetch_one(&mut **tx)
    .await?;

    let next = current + 1;
    sqlx::query(
        "UPDATE account_sequences SET last_value = $4
         WHERE corporate_account = $1 AND project_id = $2 AND sequence_name = $3",
    )
    .bind(corporate_account)
    .bind(project_id)
    .bind(sequence_name)
    .bind(next)
    .execute(&mut **tx)
    .await?;

    Ok(next)
}
