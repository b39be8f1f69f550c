//! Data models for the dispenser.
//!
//! These models represent the entities stored by the directory store and the
//! snapshots returned by dispenser operations. Row types derive `FromRow` for
//! SQLx queries.

pub mod pull_request;
pub mod team;
pub mod user;

pub use pull_request::{PrStatus, PullRequest, PullRequestSnapshot, ReviewSummary};
pub use team::{Team, TeamWithMembers};
pub use user::{NewMember, User, UserWithTeam};
