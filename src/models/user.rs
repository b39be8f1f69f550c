//! User model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A team member who can author and review pull requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub team_id: String,
    /// Available to take on new review work.
    pub is_active: bool,
}

/// Member entry of a team registration request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMember {
    pub user_id: String,
    pub username: String,
    pub is_active: bool,
}

impl NewMember {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>, is_active: bool) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            is_active,
        }
    }

    /// Bind this member to a team.
    pub fn into_user(self, team_id: &str) -> User {
        User {
            id: self.user_id,
            username: self.username,
            team_id: team_id.to_string(),
            is_active: self.is_active,
        }
    }
}

/// A user together with the name of the team it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct UserWithTeam {
    pub user: User,
    pub team_name: String,
}
