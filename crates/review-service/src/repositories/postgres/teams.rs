use super::{is_unique_violation, observe, PgStore, PgTx};
use crate::errors::ReviewError;
use crate::models::{Team, User};
use crate::repositories::TeamRepository;
use async_trait::async_trait;
use std::time::Instant;
use tracing::instrument;

#[async_trait]
impl TeamRepository for PgStore {
    #[instrument(skip_all, fields(team_name = %team_name))]
    async fn create_team(&self, tx: &mut PgTx, team_name: &str) -> Result<(), ReviewError> {
        let start = Instant::now();
        let result = sqlx::query(
            r#"
            INSERT INTO teams (team_name)
            VALUES ($1)
            "#,
        )
        .bind(team_name)
        .execute(&mut **tx)
        .await;

        match observe("create_team", start, result) {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                Err(ReviewError::TeamExists(team_name.to_string()))
            }
            Err(e) => Err(ReviewError::Database(format!("Failed to create team: {}", e))),
        }
    }

    #[instrument(skip_all, fields(team_name = %team_name))]
    async fn team_exists(&self, tx: &mut PgTx, team_name: &str) -> Result<bool, ReviewError> {
        let start = Instant::now();
        let result: Result<bool, sqlx::Error> =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM teams WHERE team_name = $1)")
                .bind(team_name)
                .fetch_one(&mut **tx)
                .await;

        observe("team_exists", start, result)
            .map_err(|e| ReviewError::Database(format!("Failed to check team: {}", e)))
    }

    #[instrument(skip_all, fields(team_name = %team_name))]
    async fn get_team(&self, tx: &mut PgTx, team_name: &str) -> Result<Team, ReviewError> {
        if !self.team_exists(tx, team_name).await? {
            return Err(ReviewError::NotFound(format!("team {}", team_name)));
        }

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

        let members = observe("get_team", start, result)
            .map_err(|e| ReviewError::Database(format!("Failed to fetch team members: {}", e)))?;

        Ok(Team {
            team_name: team_name.to_string(),
            members,
        })
    }
}
