//! User service.

use crate::errors::ReviewError;
use crate::models::{PullRequest, User};
use crate::repositories::{PullRequestRepository, UserRepository};
use crate::services::{finish, require_id};
use tracing::instrument;

/// Service for user operations.
#[derive(Debug, Clone)]
pub struct UserService<S> {
    store: S,
}

impl<S> UserService<S>
where
    S: UserRepository + PullRequestRepository,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Set the activity flag of one user.
    ///
    /// Open reviews held by the user are left as they are. Use bulk
    /// deactivation to move them.
    ///
    /// # Errors
    ///
    /// - `ReviewError::InvalidArgument` - blank id
    /// - `ReviewError::NotFound` - no such user
    #[instrument(skip_all, fields(user_id = %user_id, is_active = is_active))]
    pub async fn set_is_active(&self, user_id: &str, is_active: bool) -> Result<User, ReviewError> {
        let user_id = require_id("user_id", user_id)?;

        let mut tx = self.store.begin().await?;
        let result: Result<User, ReviewError> = async {
            let mut user = self.store.get_user(&mut tx, &user_id).await?;
            user.is_active = is_active;
            self.store.update_user(&mut tx, &user).await?;
            Ok(user)
        }
        .await;
        let user = finish(&self.store, tx, result).await?;

        tracing::info!(
            target: "review.service.user",
            user_id = %user.user_id,
            is_active = user.is_active,
            "User activity updated"
        );

        Ok(user)
    }

    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn get_user(&self, user_id: &str) -> Result<User, ReviewError> {
        let user_id = require_id("user_id", user_id)?;

        let mut tx = self.store.begin().await?;
        let result = self.store.get_user(&mut tx, &user_id).await;
        finish(&self.store, tx, result).await
    }

    /// Pull requests on which `user_id` is a reviewer, oldest first.
    ///
    /// An unknown user simply has no reviews.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn get_reviews(&self, user_id: &str) -> Result<Vec<PullRequest>, ReviewError> {
        let user_id = require_id("user_id", user_id)?;

        let mut tx = self.store.begin().await?;
        let result = self.store.pull_requests_by_reviewer(&mut tx, &user_id).await;
        finish(&self.store, tx, result).await
    }
}
