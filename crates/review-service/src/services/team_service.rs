//! Team service.
//!
//! Creates teams together with their members and reads rosters back.

use crate::errors::ReviewError;
use crate::models::{Team, User};
use crate::repositories::{TeamRepository, UserRepository};
use crate::services::{finish, require_id};
use std::collections::HashSet;
use tracing::instrument;

/// Service for team operations.
#[derive(Debug, Clone)]
pub struct TeamService<S> {
    store: S,
}

impl<S> TeamService<S>
where
    S: TeamRepository + UserRepository,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create a team and upsert its members.
    ///
    /// Existing users listed as members are moved into the new team. A
    /// member with a blank `team_name` joins `team_name`.
    ///
    /// # Errors
    ///
    /// - `ReviewError::InvalidArgument` - blank names or ids, no members,
    ///   duplicate member ids, or a member naming a different team
    /// - `ReviewError::TeamExists` - the team already exists
    /// - `ReviewError::Database` - storage failure
    #[instrument(skip_all, fields(team_name = %team_name, members = members.len()))]
    pub async fn create_team(
        &self,
        team_name: &str,
        members: Vec<User>,
    ) -> Result<Team, ReviewError> {
        let team_name = require_id("team_name", team_name)?;
        let members = normalize_members(&team_name, members)?;

        let mut tx = self.store.begin().await?;
        let result: Result<Team, ReviewError> = async {
            if self.store.team_exists(&mut tx, &team_name).await? {
                return Err(ReviewError::TeamExists(team_name.clone()));
            }
            self.store.create_team(&mut tx, &team_name).await?;
            for member in &members {
                self.store.upsert_user(&mut tx, member).await?;
            }
            self.store.get_team(&mut tx, &team_name).await
        }
        .await;
        let team = finish(&self.store, tx, result).await?;

        tracing::info!(
            target: "review.service.team",
            team_name = %team.team_name,
            members = team.members.len(),
            "Team created"
        );

        Ok(team)
    }

    /// Fetch a team with members ordered by username.
    ///
    /// # Errors
    ///
    /// - `ReviewError::InvalidArgument` - blank name
    /// - `ReviewError::NotFound` - no such team
    #[instrument(skip_all, fields(team_name = %team_name))]
    pub async fn get_team(&self, team_name: &str) -> Result<Team, ReviewError> {
        let team_name = require_id("team_name", team_name)?;

        let mut tx = self.store.begin().await?;
        let result = self.store.get_team(&mut tx, &team_name).await;
        finish(&self.store, tx, result).await
    }
}

fn normalize_members(team_name: &str, members: Vec<User>) -> Result<Vec<User>, ReviewError> {
    if members.is_empty() {
        return Err(ReviewError::InvalidArgument(
            "members must not be empty".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(members.len());
    members
        .into_iter()
        .map(|member| {
            let user_id = require_id("user_id", &member.user_id)?;
            let username = require_id("username", &member.username)?;

            let member_team = member.team_name.trim();
            if !member_team.is_empty() && member_team != team_name {
                return Err(ReviewError::InvalidArgument(format!(
                    "member {} belongs to team {}, not {}",
                    user_id, member_team, team_name
                )));
            }
            if !seen.insert(user_id.clone()) {
                return Err(ReviewError::InvalidArgument(format!(
                    "duplicate member {}",
                    user_id
                )));
            }

            Ok(User {
                user_id,
                username,
                team_name: team_name.to_string(),
                is_active: member.is_active,
            })
        })
        .collect()
}
