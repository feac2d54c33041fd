use super::{is_foreign_key_violation, is_unique_violation, observe, PgStore, PgTx};
use crate::errors::ReviewError;
use crate::models::{AssignmentStats, PrStatus, PullRequest};
use crate::repositories::PullRequestRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Instant;
use tracing::instrument;

/// Pull request joined with its reviewers in assignment order.
const SELECT_PULL_REQUEST: &str = r#"
    SELECT
        p.pull_request_id,
        p.pull_request_name,
        p.author_id,
        p.status,
        p.created_at,
        p.merged_at,
        COALESCE(
            ARRAY_AGG(r.user_id ORDER BY r.assignment_id) FILTER (WHERE r.user_id IS NOT NULL),
            '{}'
        ) AS assigned_reviewers
    FROM pull_requests p
    LEFT JOIN pr_reviewers r ON r.pull_request_id = p.pull_request_id
"#;

#[derive(Debug, sqlx::FromRow)]
struct PullRequestRow {
    pull_request_id: String,
    pull_request_name: String,
    author_id: String,
    status: String,
    created_at: DateTime<Utc>,
    merged_at: Option<DateTime<Utc>>,
    assigned_reviewers: Vec<String>,
}

impl TryFrom<PullRequestRow> for PullRequest {
    type Error = ReviewError;

    fn try_from(row: PullRequestRow) -> Result<Self, Self::Error> {
        let status = PrStatus::from_db_str(&row.status).ok_or_else(|| {
            ReviewError::Database(format!(
                "Unknown pull request status '{}' for {}",
                row.status, row.pull_request_id
            ))
        })?;

        Ok(PullRequest {
            pull_request_id: row.pull_request_id,
            pull_request_name: row.pull_request_name,
            author_id: row.author_id,
            status,
            assigned_reviewers: row.assigned_reviewers,
            created_at: row.created_at,
            merged_at: row.merged_at,
        })
    }
}

/// Insert reviewers in the given order, skipping ones already attached.
async fn insert_reviewers(
    tx: &mut PgTx,
    operation: &'static str,
    pull_request_id: &str,
    user_ids: &[String],
) -> Result<(), ReviewError> {
    let start = Instant::now();
    let result = sqlx::query(
        r#"
        INSERT INTO pr_reviewers (pull_request_id, user_id)
        SELECT $1, reviewer.user_id
        FROM UNNEST($2::TEXT[]) WITH ORDINALITY AS reviewer(user_id, ord)
        ORDER BY reviewer.ord
        ON CONFLICT (pull_request_id, user_id) DO NOTHING
        "#,
    )
    .bind(pull_request_id)
    .bind(user_ids)
    .execute(&mut **tx)
    .await;

    match observe(operation, start, result) {
        Ok(_) => Ok(()),
        Err(e) if is_foreign_key_violation(&e) => Err(ReviewError::NotFound(format!(
            "pull request {} or reviewer",
            pull_request_id
        ))),
        Err(e) => Err(ReviewError::Database(format!(
            "Failed to assign reviewers: {}",
            e
        ))),
    }
}

#[async_trait]
impl PullRequestRepository for PgStore {
    #[instrument(skip_all, fields(pull_request_id = %pr.pull_request_id))]
    async fn create_pull_request(
        &self,
        tx: &mut PgTx,
        pr: &PullRequest,
    ) -> Result<(), ReviewError> {
        let start = Instant::now();
        let result = sqlx::query(
            r#"
            INSERT INTO pull_requests (
                pull_request_id, pull_request_name, author_id, status, created_at, merged_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&pr.pull_request_id)
        .bind(&pr.pull_request_name)
        .bind(&pr.author_id)
        .bind(pr.status.as_db_str())
        .bind(pr.created_at)
        .bind(pr.merged_at)
        .execute(&mut **tx)
        .await;

        match observe("create_pull_request", start, result) {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                Err(ReviewError::PrExists(pr.pull_request_id.clone()))
            }
            Err(e) if is_foreign_key_violation(&e) => {
                Err(ReviewError::NotFound(format!("user {}", pr.author_id)))
            }
            Err(e) => Err(ReviewError::Database(format!(
                "Failed to create pull request: {}",
                e
            ))),
        }
    }

    #[instrument(skip_all, fields(pull_request_id = %pull_request_id))]
    async fn pull_request_exists(
        &self,
        tx: &mut PgTx,
        pull_request_id: &str,
    ) -> Result<bool, ReviewError> {
        let start = Instant::now();
        let result: Result<bool, sqlx::Error> = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM pull_requests WHERE pull_request_id = $1)",
        )
        .bind(pull_request_id)
        .fetch_one(&mut **tx)
        .await;

        observe("pull_request_exists", start, result)
            .map_err(|e| ReviewError::Database(format!("Failed to check pull request: {}", e)))
    }

    #[instrument(skip_all, fields(pull_request_id = %pull_request_id))]
    async fn get_pull_request(
        &self,
        tx: &mut PgTx,
        pull_request_id: &str,
    ) -> Result<PullRequest, ReviewError> {
        let start = Instant::now();
        let query = format!(
            "{} WHERE p.pull_request_id = $1 GROUP BY p.pull_request_id",
            SELECT_PULL_REQUEST
        );
        let result = sqlx::query_as::<_, PullRequestRow>(&query)
            .bind(pull_request_id)
            .fetch_optional(&mut **tx)
            .await;

        observe("get_pull_request", start, result)
            .map_err(|e| ReviewError::Database(format!("Failed to fetch pull request: {}", e)))?
            .ok_or_else(|| ReviewError::NotFound(format!("pull request {}", pull_request_id)))?
            .try_into()
    }

    #[instrument(skip_all, fields(pull_request_id = %pull_request_id))]
    async fn lock_pull_request(
        &self,
        tx: &mut PgTx,
        pull_request_id: &str,
    ) -> Result<PullRequest, ReviewError> {
        // FOR UPDATE can't be combined with the aggregate, so lock first.
        let start = Instant::now();
        let result: Result<Option<String>, sqlx::Error> = sqlx::query_scalar(
            r#"
            SELECT pull_request_id
            FROM pull_requests
            WHERE pull_request_id = $1
            FOR UPDATE
            "#,
        )
        .bind(pull_request_id)
        .fetch_optional(&mut **tx)
        .await;

        observe("lock_pull_request", start, result)
            .map_err(|e| ReviewError::Database(format!("Failed to lock pull request: {}", e)))?
            .ok_or_else(|| ReviewError::NotFound(format!("pull request {}", pull_request_id)))?;

        self.get_pull_request(tx, pull_request_id).await
    }

    #[instrument(
        skip_all,
        fields(pull_request_id = %pr.pull_request_id, status = pr.status.as_db_str())
    )]
    async fn update_pull_request(
        &self,
        tx: &mut PgTx,
        pr: &PullRequest,
    ) -> Result<(), ReviewError> {
        let start = Instant::now();
        let result = sqlx::query(
            r#"
            UPDATE pull_requests
            SET pull_request_name = $2, status = $3, merged_at = $4
            WHERE pull_request_id = $1
            "#,
        )
        .bind(&pr.pull_request_id)
        .bind(&pr.pull_request_name)
        .bind(pr.status.as_db_str())
        .bind(pr.merged_at)
        .execute(&mut **tx)
        .await;

        let updated = observe("update_pull_request", start, result)
            .map_err(|e| ReviewError::Database(format!("Failed to update pull request: {}", e)))?
            .rows_affected();

        if updated == 0 {
            return Err(ReviewError::NotFound(format!(
                "pull request {}",
                pr.pull_request_id
            )));
        }

        let start = Instant::now();
        let result = sqlx::query(
            r#"
            DELETE FROM pr_reviewers
            WHERE pull_request_id = $1 AND NOT (user_id = ANY($2))
            "#,
        )
        .bind(&pr.pull_request_id)
        .bind(&pr.assigned_reviewers)
        .execute(&mut **tx)
        .await;

        observe("prune_reviewers", start, result)
            .map_err(|e| ReviewError::Database(format!("Failed to sync reviewers: {}", e)))?;

        insert_reviewers(
            tx,
            "sync_reviewers",
            &pr.pull_request_id,
            &pr.assigned_reviewers,
        )
        .await
    }

    #[instrument(skip_all, fields(pull_request_id = %pull_request_id, count = user_ids.len()))]
    async fn assign_reviewers(
        &self,
        tx: &mut PgTx,
        pull_request_id: &str,
        user_ids: &[String],
    ) -> Result<(), ReviewError> {
        insert_reviewers(tx, "assign_reviewers", pull_request_id, user_ids).await
    }

    #[instrument(skip_all, fields(pull_request_id = %pull_request_id, user_id = %user_id))]
    async fn remove_reviewer(
        &self,
        tx: &mut PgTx,
        pull_request_id: &str,
        user_id: &str,
    ) -> Result<(), ReviewError> {
        let start = Instant::now();
        let result = sqlx::query(
            r#"
            DELETE FROM pr_reviewers
            WHERE pull_request_id = $1 AND user_id = $2
            "#,
        )
        .bind(pull_request_id)
        .bind(user_id)
        .execute(&mut **tx)
        .await;

        let removed = observe("remove_reviewer", start, result)
            .map_err(|e| ReviewError::Database(format!("Failed to remove reviewer: {}", e)))?
            .rows_affected();

        if removed == 0 {
            return Err(ReviewError::NotFound(format!(
                "reviewer {} on pull request {}",
                user_id, pull_request_id
            )));
        }
        Ok(())
    }

    #[instrument(skip_all, fields(pull_request_id = %pull_request_id, user_id = %user_id))]
    async fn add_reviewer(
        &self,
        tx: &mut PgTx,
        pull_request_id: &str,
        user_id: &str,
    ) -> Result<(), ReviewError> {
        insert_reviewers(tx, "add_reviewer", pull_request_id, &[user_id.to_string()]).await
    }

    #[instrument(skip_all, fields(user_id = %user_id))]
    async fn open_pull_request_ids_by_reviewer(
        &self,
        tx: &mut PgTx,
        user_id: &str,
    ) -> Result<Vec<String>, ReviewError> {
        let start = Instant::now();
        let result: Result<Vec<String>, sqlx::Error> = sqlx::query_scalar(
            r#"
            SELECT p.pull_request_id
            FROM pull_requests p
            JOIN pr_reviewers r ON r.pull_request_id = p.pull_request_id
            WHERE r.user_id = $1 AND p.status = 'OPEN'
            ORDER BY p.created_at, p.pull_request_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut **tx)
        .await;

        observe("open_pull_request_ids_by_reviewer", start, result).map_err(|e| {
            ReviewError::Database(format!("Failed to fetch open reviews: {}", e))
        })
    }

    #[instrument(skip_all, fields(user_id = %user_id))]
    async fn pull_requests_by_reviewer(
        &self,
        tx: &mut PgTx,
        user_id: &str,
    ) -> Result<Vec<PullRequest>, ReviewError> {
        let start = Instant::now();
        let query = format!(
            r#"{}
            WHERE p.pull_request_id IN (
                SELECT pull_request_id FROM pr_reviewers WHERE user_id = $1
            )
            GROUP BY p.pull_request_id
            ORDER BY p.created_at, p.pull_request_id"#,
            SELECT_PULL_REQUEST
        );
        let result = sqlx::query_as::<_, PullRequestRow>(&query)
            .bind(user_id)
            .fetch_all(&mut **tx)
            .await;

        observe("pull_requests_by_reviewer", start, result)
            .map_err(|e| ReviewError::Database(format!("Failed to fetch reviews: {}", e)))?
            .into_iter()
            .map(PullRequest::try_from)
            .collect()
    }

    #[instrument(skip_all)]
    async fn assignment_stats(&self, tx: &mut PgTx) -> Result<AssignmentStats, ReviewError> {
        let start = Instant::now();
        let result: Result<Vec<(String, i64)>, sqlx::Error> = sqlx::query_as(
            r#"
            SELECT user_id, COUNT(*)
            FROM pr_reviewers
            GROUP BY user_id
            "#,
        )
        .fetch_all(&mut **tx)
        .await;

        let by_user = observe("stats_by_user", start, result)
            .map_err(|e| ReviewError::Database(format!("Failed to fetch stats: {}", e)))?;

        let start = Instant::now();
        let result: Result<Vec<(String, i64)>, sqlx::Error> = sqlx::query_as(
            r#"
            SELECT p.pull_request_id, COUNT(r.user_id)
            FROM pull_requests p
            LEFT JOIN pr_reviewers r ON r.pull_request_id = p.pull_request_id
            GROUP BY p.pull_request_id
            "#,
        )
        .fetch_all(&mut **tx)
        .await;

        let by_pr = observe("stats_by_pr", start, result)
            .map_err(|e| ReviewError::Database(format!("Failed to fetch stats: {}", e)))?;

        Ok(AssignmentStats {
            by_user: by_user.into_iter().collect(),
            by_pr: by_pr.into_iter().collect(),
        })
    }
}
