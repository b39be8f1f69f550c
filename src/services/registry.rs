//! Team and user registry.

use serde::Serialize;

use crate::error::AppError;
use crate::models::{NewMember, Team, TeamWithMembers, UserWithTeam};
use crate::store::StoreTx;

/// A freshly registered team with the echo of its registered members.
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredTeam {
    pub team: Team,
    pub members: Vec<NewMember>,
}

/// Create a team with a fresh id. Fails if the name is taken.
pub async fn create_team(tx: &mut dyn StoreTx, name: &str) -> Result<Team, AppError> {
    if name.trim().is_empty() {
        return Err(AppError::bad_input_field("team_name is required", "team_name"));
    }

    if tx.find_team_by_name(name).await?.is_some() {
        return Err(AppError::team_exists(name));
    }

    let team = Team {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
    };

    // The name may have been taken since the lookup above.
    if !tx.insert_team(&team).await? {
        return Err(AppError::team_exists(name));
    }

    log::info!("Created team {} ({})", team.name, team.id);
    Ok(team)
}

/// Upsert every member into the team.
///
/// Existing users are moved to this team and get the submitted username and
/// activity. All members are validated before anything is written.
pub async fn register_members(
    tx: &mut dyn StoreTx,
    team_id: &str,
    members: Vec<NewMember>,
) -> Result<Vec<NewMember>, AppError> {
    if tx.get_team(team_id).await?.is_none() {
        return Err(AppError::team_not_found(team_id));
    }

    if let Some(index) = members.iter().position(|m| m.user_id.trim().is_empty()) {
        return Err(AppError::bad_member("user_id is required", index));
    }

    for member in &members {
        tx.upsert_user(&member.clone().into_user(team_id)).await?;
    }

    log::info!("Registered {} member(s) in team {}", members.len(), team_id);
    Ok(members)
}

/// Create a team and register its members in one step.
pub async fn add_team(
    tx: &mut dyn StoreTx,
    name: &str,
    members: Vec<NewMember>,
) -> Result<RegisteredTeam, AppError> {
    let team = create_team(tx, name).await?;
    let members = register_members(tx, &team.id, members).await?;
    Ok(RegisteredTeam { team, members })
}

pub async fn get_team(tx: &mut dyn StoreTx, name: &str) -> Result<TeamWithMembers, AppError> {
    let team = tx
        .find_team_by_name(name)
        .await?
        .ok_or_else(|| AppError::team_not_found(name))?;
    let members = tx.team_members(&team.id).await?;
    Ok(TeamWithMembers { team, members })
}

pub async fn set_user_active(
    tx: &mut dyn StoreTx,
    user_id: &str,
    is_active: bool,
) -> Result<UserWithTeam, AppError> {
    let mut user = tx
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::user_not_found(user_id))?;

    if !tx.set_user_active(user_id, is_active).await? {
        return Err(AppError::user_not_found(user_id));
    }
    user.is_active = is_active;

    let team = tx.get_team(&user.team_id).await?.ok_or_else(|| {
        AppError::storage_with_op(
            format!("user {} references missing team {}", user.id, user.team_id),
            "set_user_active",
        )
    })?;

    log::info!("User {} is_active={}", user.id, is_active);
    Ok(UserWithTeam {
        user,
        team_name: team.name,
    })
}
