use super::{is_foreign_key_violation, observe, PgStore, PgTx};
use crate::errors::ReviewError;
use crate::models::User;
use crate::repositories::UserRepository;
use async_trait::async_trait;
use std::time::Instant;
use tracing::instrument;

#[async_trait]
impl UserRepository for PgStore {
    #[instrument(skip_all, fields(user_id = %user_id))]
    async fn get_user(&self, tx: &mut PgTx, user_id: &str) -> Result<User, ReviewError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, username, team_name, is_active
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await;

        observe("get_user", start, result)
            .map_err(|e| ReviewError::Database(format!("Failed to fetch user: {}", e)))?
            .ok_or_else(|| ReviewError::NotFound(format!("user {}", user_id)))
    }

    #[instrument(skip_all, fields(user_id = %user.user_id, team_name = %user.team_name))]
    async fn upsert_user(&self, tx: &mut PgTx, user: &User) -> Result<(), ReviewError> {
        let start = Instant::now();
        let result = sqlx::query(
            r#"
            INSERT INTO users (user_id, username, team_name, is_active)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                username = EXCLUDED.username,
                team_name = EXCLUDED.team_name,
                is_active = EXCLUDED.is_active,
                updated_at = NOW()
            "#,
        )
        .bind(&user.user_id)
        .bind(&user.username)
        .bind(&user.team_name)
        .bind(user.is_active)
        .execute(&mut **tx)
        .await;

        match observe("upsert_user", start, result) {
            Ok(_) => Ok(()),
            Err(e) if is_foreign_key_violation(&e) => {
                Err(ReviewError::NotFound(format!("team {}", user.team_name)))
            }
            Err(e) => Err(ReviewError::Database(format!("Failed to upsert user: {}", e))),
        }
    }

    #[instrument(skip_all, fields(user_id = %user.user_id))]
    async fn update_user(&self, tx: &mut PgTx, user: &User) -> Result<(), ReviewError> {
        let start = Instant::now();
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = $2, team_name = $3, is_active = $4, updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(&user.user_id)
        .bind(&user.username)
        .bind(&user.team_name)
        .bind(user.is_active)
        .execute(&mut **tx)
        .await;

        let updated = observe("update_user", start, result)
            .map_err(|e| ReviewError::Database(format!("Failed to update user: {}", e)))?
            .rows_affected();

        if updated == 0 {
            return Err(ReviewError::NotFound(format!("user {}", user.user_id)));
        }
        Ok(())
    }

    #[instrument(skip_all, fields(team_name = %team_name))]
    async fn get_team_members(
        &self,
        tx: &mut PgTx,
        team_name: &str,
    ) -> Result<Vec<User>, ReviewError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, username, team_name, is_active
            FROM users
            WHERE team_name = $1
            ORDER BY username, user_id
            "#,
        )
        .bind(team_name)
        .fetch_all(&mut **tx)
        .await;

        observe("get_team_members", start, result)
            .map_err(|e| ReviewError::Database(format!("Failed to fetch team members: {}", e)))
    }

    #[instrument(skip_all, fields(team_name = %team_name))]
    async fn lock_team_members(
        &self,
        tx: &mut PgTx,
        team_name: &str,
    ) -> Result<Vec<User>, ReviewError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, username, team_name, is_active
            FROM users
            WHERE team_name = $1
            ORDER BY username, user_id
            FOR UPDATE
            "#,
        )
        .bind(team_name)
        .fetch_all(&mut **tx)
        .await;

        observe("lock_team_members", start, result)
            .map_err(|e| ReviewError::Database(format!("Failed to lock team members: {}", e)))
    }

    #[instrument(skip_all, fields(team_name = %team_name, count = user_ids.len()))]
    async fn deactivate_users(
        &self,
        tx: &mut PgTx,
        team_name: &str,
        user_ids: &[String],
    ) -> Result<(), ReviewError> {
        let start = Instant::now();
        let result: Result<Vec<String>, sqlx::Error> = sqlx::query_scalar(
            r#"
            SELECT user_id
            FROM users
            WHERE team_name = $1 AND user_id = ANY($2)
            "#,
        )
        .bind(team_name)
        .bind(user_ids)
        .fetch_all(&mut **tx)
        .await;

        let members = observe("check_team_membership", start, result).map_err(|e| {
            ReviewError::Database(format!("Failed to check team membership: {}", e))
        })?;

        if let Some(missing) = user_ids.iter().find(|id| !members.contains(id)) {
            return Err(ReviewError::NotFound(format!(
                "user {} in team {}",
                missing, team_name
            )));
        }

        let start = Instant::now();
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_active = FALSE, updated_at = NOW()
            WHERE team_name = $1 AND user_id = ANY($2)
            "#,
        )
        .bind(team_name)
        .bind(user_ids)
        .execute(&mut **tx)
        .await;

        let updated = observe("deactivate_users", start, result)
            .map_err(|e| ReviewError::Database(format!("Failed to deactivate users: {}", e)))?
            .rows_affected();

        tracing::debug!(
            target: "review.repository.users",
            team_name = %team_name,
            updated = updated,
            "Users deactivated"
        );

        Ok(())
    }
}
