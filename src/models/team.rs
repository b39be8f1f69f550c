//! Team model.

use serde::Serialize;
use sqlx::FromRow;

use super::User;

/// A named group of users that review each other's pull requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Team {
    pub id: String,
    pub name: String,
}

/// A team together with its current members in display order.
#[derive(Debug, Clone, Serialize)]
pub struct TeamWithMembers {
    pub team: Team,
    pub members: Vec<User>,
}
