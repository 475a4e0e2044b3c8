use async_trait::async_trait;
use sqlx::PgPool;

use crate::authz::{AccessLevel, AccessMatrixStore, AuthScope, GrantStore, LevelStore, PermissionVector};
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{
    AccessLevelDefinition, ApiAccessCategory, ApprovalDecision, ApproverGrant, DecisionRecord, FunctionalLevel,
    LevelChanges, LevelDependents, NewLevel, Reparent,
};
use crate::database::sequence::{self, LEVEL_SEQUENCE};
use crate::types::{LevelId, ProjectScope, RequirementId, ROOT_PARENT};

const LEVEL_COLUMNS: &str = "corporate_account, project_id, level_id, parent_level_id, level_description, \
                             status, created_by, created_at, updated_at";

const GRANT_COLUMNS: &str = "corporate_account, project_id, req_id, level_id, approval_user_id, \
                             approval_status, approver_comments, created_at, updated_at";

const DECISION_COLUMNS: &str = "corporate_account, project_id, req_id, level_id, approval_user_id, \
                                approval_status, approver_comments, decided_at";

const DEFINITION_COLUMNS: &str = "corporate_account, category_header, category_sub_header, level_grants";

/// PostgreSQL implementation of the authorization store traits
#[derive(Clone, Default)]
pub struct PgStore {
    pool: Option<PgPool>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Some(pool) }
    }

    /// Store that goes through the application pool owned by [`DatabaseManager`]
    pub fn shared() -> Self {
        Self { pool: None }
    }

    async fn pool(&self) -> Result<PgPool, DatabaseError> {
        match &self.pool {
            Some(pool) => Ok(pool.clone()),
            None => DatabaseManager::pool().await,
        }
    }
}

#[async_trait]
impl LevelStore for PgStore {
    async fn parent_of(&self, scope: &ProjectScope, level_id: LevelId) -> Result<Option<LevelId>, DatabaseError> {
        let parent = sqlx::query_scalar::<_, i64>(
            "SELECT parent_level_id FROM functional_levels
             WHERE corporate_account = $1 AND project_id = $2 AND level_id = $3",
        )
        .bind(&scope.corporate_account)
        .bind(&scope.project_id)
        .bind(level_id)
        .fetch_optional(&self.pool().await?)
        .await?;

        Ok(parent)
    }

    async fn get_level(&self, scope: &ProjectScope, level_id: LevelId) -> Result<Option<FunctionalLevel>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM functional_levels
             WHERE corporate_account = $1 AND project_id = $2 AND level_id = $3",
            LEVEL_COLUMNS
        );

        let level = sqlx::query_as::<_, FunctionalLevel>(&sql)
            .bind(&scope.corporate_account)
            .bind(&scope.project_id)
            .bind(level_id)
            .fetch_optional(&self.pool().await?)
            .await?;

        Ok(level)
    }

    async fn list_levels(&self, scope: &ProjectScope) -> Result<Vec<FunctionalLevel>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM functional_levels
             WHERE corporate_account = $1 AND project_id = $2
             ORDER BY level_id",
            LEVEL_COLUMNS
        );

        let levels = sqlx::query_as::<_, FunctionalLevel>(&sql)
            .bind(&scope.corporate_account)
            .bind(&scope.project_id)
            .fetch_all(&self.pool().await?)
            .await?;

        Ok(levels)
    }

    async fn insert_level(&self, scope: &ProjectScope, level: NewLevel) -> Result<FunctionalLevel, DatabaseError> {
        let mut tx = self.pool().await?.begin().await?;

        let level_id = sequence::next_value(&mut tx, &scope.corporate_account, &scope.project_id, LEVEL_SEQUENCE).await?;

        let sql = format!(
            "INSERT INTO functional_levels
                (corporate_account, project_id, level_id, parent_level_id, level_description, status, created_by)
             VALUES ($1, $2, $3, $4, $5, 'Active', $6)
             RETURNING {}",
            LEVEL_COLUMNS
        );

        let created = sqlx::query_as::<_, FunctionalLevel>(&sql)
            .bind(&scope.corporate_account)
            .bind(&scope.project_id)
            .bind(level_id)
            .bind(level.parent_level_id)
            .bind(&level.level_description)
            .bind(&level.created_by)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn update_level(
        &self,
        scope: &ProjectScope,
        level_id: LevelId,
        changes: LevelChanges,
    ) -> Result<Option<FunctionalLevel>, DatabaseError> {
        let sql = format!(
            "UPDATE functional_levels SET
                level_description = COALESCE($4, level_description),
                status = COALESCE($5, status),
                updated_at = now()
             WHERE corporate_account = $1 AND project_id = $2 AND level_id = $3
             RETURNING {}",
            LEVEL_COLUMNS
        );

        let updated = sqlx::query_as::<_, FunctionalLevel>(&sql)
            .bind(&scope.corporate_account)
            .bind(&scope.project_id)
            .bind(level_id)
            .bind(changes.level_description)
            .bind(changes.status.map(|s| s.as_str()))
            .fetch_optional(&self.pool().await?)
            .await?;

        Ok(updated)
    }

    async fn reparent_level(
        &self,
        scope: &ProjectScope,
        level_id: LevelId,
        new_parent_level_id: LevelId,
        max_depth: usize,
    ) -> Result<Reparent, DatabaseError> {
        let mut tx = self.pool().await?.begin().await?;

        // Concurrent moves in one project serialize on the project's level rows
        sqlx::query(
            "SELECT level_id FROM functional_levels
             WHERE corporate_account = $1 AND project_id = $2
             FOR UPDATE",
        )
        .bind(&scope.corporate_account)
        .bind(&scope.project_id)
        .execute(&mut *tx)
        .await?;

        if new_parent_level_id != ROOT_PARENT {
            let closes_loop = sqlx::query_scalar::<_, bool>(
                "WITH RECURSIVE chain (level_id, parent_level_id, depth) AS (
                    SELECT level_id, parent_level_id, 0 FROM functional_levels
                     WHERE corporate_account = $1 AND project_id = $2 AND level_id = $3
                    UNION ALL
                    SELECT f.level_id, f.parent_level_id, c.depth + 1
                      FROM functional_levels f
                      JOIN chain c ON f.level_id = c.parent_level_id
                     WHERE f.corporate_account = $1 AND f.project_id = $2
                       AND c.level_id <> $4 AND c.depth < $5::INT
                 )
                 SELECT EXISTS (SELECT 1 FROM chain WHERE level_id = $4)",
            )
            .bind(&scope.corporate_account)
            .bind(&scope.project_id)
            .bind(new_parent_level_id)
            .bind(level_id)
            .bind(i32::try_from(max_depth).unwrap_or(i32::MAX))
            .fetch_one(&mut *tx)
            .await?;

            if closes_loop {
                tx.rollback().await?;
                return Ok(Reparent::WouldCreateCycle);
            }
        }

        let sql = format!(
            "UPDATE functional_levels SET parent_level_id = $4, updated_at = now()
             WHERE corporate_account = $1 AND project_id = $2 AND level_id = $3
             RETURNING {}",
            LEVEL_COLUMNS
        );
        let moved = sqlx::query_as::<_, FunctionalLevel>(&sql)
            .bind(&scope.corporate_account)
            .bind(&scope.project_id)
            .bind(level_id)
            .bind(new_parent_level_id)
            .fetch_optional(&mut *tx)
            .await?;

        match moved {
            Some(level) => {
                tx.commit().await?;
                Ok(Reparent::Moved(level))
            }
            None => {
                tx.rollback().await?;
                Ok(Reparent::LevelMissing)
            }
        }
    }

    async fn level_dependents(&self, scope: &ProjectScope, level_id: LevelId) -> Result<LevelDependents, DatabaseError> {
        let (child_levels, requirements, integration_requirements, approver_grants): (i64, i64, i64, i64) =
            sqlx::query_as(
                "SELECT
                    (SELECT COUNT(*) FROM functional_levels
                      WHERE corporate_account = $1 AND project_id = $2 AND parent_level_id = $3),
                    (SELECT COUNT(*) FROM requirements
                      WHERE corporate_account = $1 AND project_id = $2 AND level_id = $3),
                    (SELECT COUNT(*) FROM integration_requirements
                      WHERE corporate_account = $1 AND project_id = $2 AND level_id = $3),
                    (SELECT COUNT(*) FROM requirements_approvers
                      WHERE corporate_account = $1 AND project_id = $2 AND req_id = 0 AND level_id = $3)",
            )
            .bind(&scope.corporate_account)
            .bind(&scope.project_id)
            .bind(level_id)
            .fetch_one(&self.pool().await?)
            .await?;

        Ok(LevelDependents {
            child_levels,
            requirements,
            integration_requirements,
            approver_grants,
        })
    }

    async fn delete_level(&self, scope: &ProjectScope, level_id: LevelId) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "DELETE FROM functional_levels
             WHERE corporate_account = $1 AND project_id = $2 AND level_id = $3",
        )
        .bind(&scope.corporate_account)
        .bind(&scope.project_id)
        .bind(level_id)
        .execute(&self.pool().await?)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn requirement_level(
        &self,
        scope: &ProjectScope,
        req_id: RequirementId,
    ) -> Result<Option<LevelId>, DatabaseError> {
        let level = sqlx::query_scalar::<_, i64>(
            "SELECT level_id FROM requirements
             WHERE corporate_account = $1 AND project_id = $2 AND req_id = $3",
        )
        .bind(&scope.corporate_account)
        .bind(&scope.project_id)
        .bind(req_id)
        .fetch_optional(&self.pool().await?)
        .await?;

        Ok(level)
    }

    async fn integration_requirement_level(
        &self,
        scope: &ProjectScope,
        req_id: RequirementId,
    ) -> Result<Option<LevelId>, DatabaseError> {
        let level = sqlx::query_scalar::<_, i64>(
            "SELECT level_id FROM integration_requirements
             WHERE corporate_account = $1 AND project_id = $2 AND req_id = $3",
        )
        .bind(&scope.corporate_account)
        .bind(&scope.project_id)
        .bind(req_id)
        .fetch_optional(&self.pool().await?)
        .await?;

        Ok(level)
    }
}

#[async_trait]
impl GrantStore for PgStore {
    async fn has_project_grant(&self, scope: &ProjectScope, user_id: &str) -> Result<bool, DatabaseError> {
        let found = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                SELECT 1 FROM requirements_approvers
                WHERE corporate_account = $1 AND project_id = $2 AND approval_user_id = $3
                  AND req_id = 0 AND level_id = 0)",
        )
        .bind(&scope.corporate_account)
        .bind(&scope.project_id)
        .bind(user_id)
        .fetch_one(&self.pool().await?)
        .await?;

        Ok(found)
    }

    async fn has_requirement_grant(
        &self,
        scope: &ProjectScope,
        user_id: &str,
        req_id: RequirementId,
    ) -> Result<bool, DatabaseError> {
        let found = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                SELECT 1 FROM requirements_approvers
                WHERE corporate_account = $1 AND project_id = $2 AND approval_user_id = $3
                  AND req_id = $4 AND level_id = 0)",
        )
        .bind(&scope.corporate_account)
        .bind(&scope.project_id)
        .bind(user_id)
        .bind(req_id)
        .fetch_one(&self.pool().await?)
        .await?;

        Ok(found)
    }

    async fn has_level_grant(
        &self,
        scope: &ProjectScope,
        user_id: &str,
        level_ids: &[LevelId],
    ) -> Result<bool, DatabaseError> {
        if level_ids.is_empty() {
            return Ok(false);
        }

        let found = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                SELECT 1 FROM requirements_approvers
                WHERE corporate_account = $1 AND project_id = $2 AND approval_user_id = $3
                  AND req_id = 0 AND level_id = ANY($4))",
        )
        .bind(&scope.corporate_account)
        .bind(&scope.project_id)
        .bind(user_id)
        .bind(level_ids.to_vec())
        .fetch_one(&self.pool().await?)
        .await?;

        Ok(found)
    }

    async fn list_grants(
        &self,
        scope: &ProjectScope,
        user_id: Option<&str>,
    ) -> Result<Vec<ApproverGrant>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM requirements_approvers
             WHERE corporate_account = $1 AND project_id = $2
               AND ($3::TEXT IS NULL OR approval_user_id = $3)
             ORDER BY approval_user_id, level_id, req_id",
            GRANT_COLUMNS
        );

        let grants = sqlx::query_as::<_, ApproverGrant>(&sql)
            .bind(&scope.corporate_account)
            .bind(&scope.project_id)
            .bind(user_id)
            .fetch_all(&self.pool().await?)
            .await?;

        Ok(grants)
    }

    async fn insert_grant(
        &self,
        scope: &ProjectScope,
        user_id: &str,
        target: AuthScope,
    ) -> Result<Option<ApproverGrant>, DatabaseError> {
        let (req_id, level_id) = target.to_columns();
        let sql = format!(
            "INSERT INTO requirements_approvers
                (corporate_account, project_id, req_id, level_id, approval_user_id, approval_status)
             VALUES ($1, $2, $3, $4, $5, 'Pending')
             ON CONFLICT (corporate_account, project_id, req_id, level_id, approval_user_id) DO NOTHING
             RETURNING {}",
            GRANT_COLUMNS
        );

        let grant = sqlx::query_as::<_, ApproverGrant>(&sql)
            .bind(&scope.corporate_account)
            .bind(&scope.project_id)
            .bind(req_id)
            .bind(level_id)
            .bind(user_id)
            .fetch_optional(&self.pool().await?)
            .await?;

        Ok(grant)
    }

    async fn record_decision(
        &self,
        scope: &ProjectScope,
        decision: &ApprovalDecision,
    ) -> Result<DecisionRecord, DatabaseError> {
        let (req_id, level_id) = decision.target.to_columns();
        let sql = format!(
            "INSERT INTO approval_decisions
                (corporate_account, project_id, req_id, level_id, approval_user_id, approval_status, approver_comments)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (corporate_account, project_id, req_id, level_id, approval_user_id) DO UPDATE SET
                approval_status = EXCLUDED.approval_status,
                approver_comments = EXCLUDED.approver_comments,
                decided_at = now()
             RETURNING {}",
            DECISION_COLUMNS
        );

        let record = sqlx::query_as::<_, DecisionRecord>(&sql)
            .bind(&scope.corporate_account)
            .bind(&scope.project_id)
            .bind(req_id)
            .bind(level_id)
            .bind(&decision.approval_user_id)
            .bind(decision.approval_status.as_str())
            .bind(&decision.approver_comments)
            .fetch_one(&self.pool().await?)
            .await?;

        Ok(record)
    }

    async fn list_decisions(&self, scope: &ProjectScope, target: AuthScope) -> Result<Vec<DecisionRecord>, DatabaseError> {
        let (req_id, level_id) = target.to_columns();
        let sql = format!(
            "SELECT {} FROM approval_decisions
             WHERE corporate_account = $1 AND project_id = $2 AND req_id = $3 AND level_id = $4
             ORDER BY decided_at, approval_user_id",
            DECISION_COLUMNS
        );

        let records = sqlx::query_as::<_, DecisionRecord>(&sql)
            .bind(&scope.corporate_account)
            .bind(&scope.project_id)
            .bind(req_id)
            .bind(level_id)
            .fetch_all(&self.pool().await?)
            .await?;

        Ok(records)
    }

    async fn delete_grant(&self, scope: &ProjectScope, user_id: &str, target: AuthScope) -> Result<bool, DatabaseError> {
        let (req_id, level_id) = target.to_columns();
        let result = sqlx::query(
            "DELETE FROM requirements_approvers
             WHERE corporate_account = $1 AND project_id = $2 AND req_id = $3 AND level_id = $4
               AND approval_user_id = $5",
        )
        .bind(&scope.corporate_account)
        .bind(&scope.project_id)
        .bind(req_id)
        .bind(level_id)
        .bind(user_id)
        .execute(&self.pool().await?)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AccessMatrixStore for PgStore {
    async fn account_access_level(&self, account: &str, user_id: &str) -> Result<Option<i16>, DatabaseError> {
        let level = sqlx::query_scalar::<_, i16>(
            "SELECT access_level FROM user_accounts WHERE corporate_account = $1 AND user_id = $2",
        )
        .bind(account)
        .bind(user_id)
        .fetch_optional(&self.pool().await?)
        .await?;

        Ok(level)
    }

    async fn project_access_level(
        &self,
        account: &str,
        user_id: &str,
        project_id: &str,
    ) -> Result<Option<i16>, DatabaseError> {
        let level = sqlx::query_scalar::<_, Option<i16>>(
            "SELECT access_level FROM user_projects
             WHERE corporate_account = $1 AND user_id = $2 AND project_id = $3",
        )
        .bind(account)
        .bind(user_id)
        .bind(project_id)
        .fetch_optional(&self.pool().await?)
        .await?;

        Ok(level.flatten())
    }

    async fn set_account_access_level(
        &self,
        account: &str,
        user_id: &str,
        level: AccessLevel,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO user_accounts (corporate_account, user_id, access_level)
             VALUES ($1, $2, $3)
             ON CONFLICT (corporate_account, user_id) DO UPDATE SET
                access_level = EXCLUDED.access_level,
                updated_at = now()",
        )
        .bind(account)
        .bind(user_id)
        .bind(level.get() as i16)
        .execute(&self.pool().await?)
        .await?;

        Ok(())
    }

    async fn set_project_access_level(
        &self,
        account: &str,
        user_id: &str,
        project_id: &str,
        level: AccessLevel,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO user_projects (corporate_account, user_id, project_id, access_level)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (corporate_account, user_id, project_id) DO UPDATE SET
                access_level = EXCLUDED.access_level,
                updated_at = now()",
        )
        .bind(account)
        .bind(user_id)
        .bind(project_id)
        .bind(level.get() as i16)
        .execute(&self.pool().await?)
        .await?;

        Ok(())
    }

    async fn api_category(&self, api_name: &str) -> Result<Option<ApiAccessCategory>, DatabaseError> {
        let category = sqlx::query_as::<_, ApiAccessCategory>(
            "SELECT api_name, category_header, category_sub_header
             FROM api_access_categories WHERE api_name = $1",
        )
        .bind(api_name)
        .fetch_optional(&self.pool().await?)
        .await?;

        Ok(category)
    }

    async fn list_api_categories(&self) -> Result<Vec<ApiAccessCategory>, DatabaseError> {
        let categories = sqlx::query_as::<_, ApiAccessCategory>(
            "SELECT api_name, category_header, category_sub_header
             FROM api_access_categories ORDER BY api_name",
        )
        .fetch_all(&self.pool().await?)
        .await?;

        Ok(categories)
    }

    async fn definition(
        &self,
        account: &str,
        category_header: &str,
        category_sub_header: &str,
    ) -> Result<Option<AccessLevelDefinition>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM account_access_levels
             WHERE corporate_account = $1 AND category_header = $2 AND category_sub_header = $3",
            DEFINITION_COLUMNS
        );

        let definition = sqlx::query_as::<_, AccessLevelDefinition>(&sql)
            .bind(account)
            .bind(category_header)
            .bind(category_sub_header)
            .fetch_optional(&self.pool().await?)
            .await?;

        Ok(definition)
    }

    async fn list_definitions(&self, account: &str) -> Result<Vec<AccessLevelDefinition>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM account_access_levels
             WHERE corporate_account = $1
             ORDER BY category_header, category_sub_header",
            DEFINITION_COLUMNS
        );

        let definitions = sqlx::query_as::<_, AccessLevelDefinition>(&sql)
            .bind(account)
            .fetch_all(&self.pool().await?)
            .await?;

        Ok(definitions)
    }

    async fn upsert_definition(
        &self,
        account: &str,
        category_header: &str,
        category_sub_header: &str,
        level_grants: PermissionVector,
    ) -> Result<AccessLevelDefinition, DatabaseError> {
        let sql = format!(
            "INSERT INTO account_access_levels (corporate_account, category_header, category_sub_header, level_grants)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (corporate_account, category_header, category_sub_header) DO UPDATE SET
                level_grants = EXCLUDED.level_grants,
                updated_at = now()
             RETURNING {}",
            DEFINITION_COLUMNS
        );

        let definition = sqlx::query_as::<_, AccessLevelDefinition>(&sql)
            .bind(account)
            .bind(category_header)
            .bind(category_sub_header)
            .bind(Vec::<bool>::from(level_grants))
            .fetch_one(&self.pool().await?)
            .await?;

        Ok(definition)
    }

    async fn set_level_permission(
        &self,
        account: &str,
        category_header: &str,
        category_sub_header: &str,
        level: AccessLevel,
        allowed: bool,
    ) -> Result<Option<AccessLevelDefinition>, DatabaseError> {
        // Postgres arrays are 1-based, matching access level numbering
        let sql = format!(
            "UPDATE account_access_levels SET
                level_grants[$4] = $5,
                updated_at = now()
             WHERE corporate_account = $1 AND category_header = $2 AND category_sub_header = $3
             RETURNING {}",
            DEFINITION_COLUMNS
        );

        let definition = sqlx::query_as::<_, AccessLevelDefinition>(&sql)
            .bind(account)
            .bind(category_header)
            .bind(category_sub_header)
            .bind(level.get() as i32)
            .bind(allowed)
            .fetch_optional(&self.pool().await?)
            .await?;

        Ok(definition)
    }
}
