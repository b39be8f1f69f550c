//! Application error types.
//!
//! Every failure of a dispenser operation maps to exactly one variant. The
//! variants serialize to a structured JSON object and carry a stable
//! machine-readable code used by the HTTP layer.

use serde::Serialize;
use thiserror::Error;

/// Application-level errors returned by dispenser operations.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum AppError {
    /// A team with this name is already registered.
    #[error("Team already exists: {team_name}")]
    TeamExists { team_name: String },

    /// No team with this name or id.
    #[error("Team not found: {team}")]
    TeamNotFound { team: String },

    /// No user with this id.
    #[error("User not found: {user_id}")]
    UserNotFound { user_id: String },

    /// A member in a registration request is malformed.
    #[error("Invalid member: {message}")]
    BadMember {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },

    /// An open pull request with the same author and title exists.
    #[error("Pull request already exists and is open: {title}")]
    PrExists {
        title: String,
        author_id: String,
    },

    /// No pull request with this id.
    #[error("Pull request not found: {pr_id}")]
    PrNotFound { pr_id: String },

    /// The pull request is merged and can no longer be changed.
    #[error("Pull request is merged: {pr_id}")]
    PrMerged { pr_id: String },

    /// The user is not a reviewer of the pull request.
    #[error("User {user_id} is not assigned to pull request {pr_id}")]
    NotAssigned { pr_id: String, user_id: String },

    /// No active teammate is available to take over a review.
    #[error("No replacement candidate for pull request {pr_id}")]
    NoCandidate { pr_id: String },

    /// Database operation failed.
    #[error("Database error: {message}")]
    Storage {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        operation: Option<String>,
    },

    /// The operation did not finish within the request deadline.
    #[error("Operation timed out: {operation}")]
    Timeout { operation: String },

    /// Malformed request.
    #[error("Invalid input: {message}")]
    BadInput {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },
}

impl AppError {
    pub fn team_exists(team_name: impl Into<String>) -> Self {
        Self::TeamExists {
            team_name: team_name.into(),
        }
    }

    pub fn team_not_found(team: impl Into<String>) -> Self {
        Self::TeamNotFound { team: team.into() }
    }

    pub fn user_not_found(user_id: impl Into<String>) -> Self {
        Self::UserNotFound {
            user_id: user_id.into(),
        }
    }

    /// Create a bad member error for the member at `index`.
    pub fn bad_member(message: impl Into<String>, index: usize) -> Self {
        Self::BadMember {
            message: message.into(),
            index: Some(index),
        }
    }

    pub fn pr_exists(title: impl Into<String>, author_id: impl Into<String>) -> Self {
        Self::PrExists {
            title: title.into(),
            author_id: author_id.into(),
        }
    }

    pub fn pr_not_found(pr_id: impl Into<String>) -> Self {
        Self::PrNotFound {
            pr_id: pr_id.into(),
        }
    }

    pub fn pr_merged(pr_id: impl Into<String>) -> Self {
        Self::PrMerged {
            pr_id: pr_id.into(),
        }
    }

    pub fn not_assigned(pr_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::NotAssigned {
            pr_id: pr_id.into(),
            user_id: user_id.into(),
        }
    }

    pub fn no_candidate(pr_id: impl Into<String>) -> Self {
        Self::NoCandidate {
            pr_id: pr_id.into(),
        }
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            operation: None,
        }
    }

    /// Create a storage error with operation context.
    pub fn storage_with_op(message: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            operation: Some(operation.into()),
        }
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Create an invalid input error.
    pub fn bad_input(message: impl Into<String>) -> Self {
        Self::BadInput {
            message: message.into(),
            field: None,
        }
    }

    /// Create an invalid input error with field name.
    pub fn bad_input_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::BadInput {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::TeamExists { .. } => "TEAM_EXISTS",
            Self::TeamNotFound { .. } => "NOT_FOUND",
            Self::UserNotFound { .. } => "USER_NOT_FOUND",
            Self::BadMember { .. } => "BAD_MEMBER",
            Self::PrExists { .. } => "PR_EXISTS",
            Self::PrNotFound { .. } => "PR_NOT_FOUND",
            Self::PrMerged { .. } => "PR_MERGED",
            Self::NotAssigned { .. } => "NOT_ASSIGNED",
            Self::NoCandidate { .. } => "NO_CANDIDATE",
            Self::Storage { .. } => "DB_ERROR",
            Self::Timeout { .. } => "TIMEOUT",
            Self::BadInput { .. } => "BAD_REQUEST",
        }
    }

    /// Whether a caller may retry the whole operation.
    ///
    /// Lookup and conflict errors need corrected input; only storage
    /// failures and deadline expiry are transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Timeout { .. })
    }
}

// Conversions from common error types

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::storage(err.to_string())
    }
}

impl From<crate::db::DbError> for AppError {
    fn from(err: crate::db::DbError) -> Self {
        Self::storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let err = AppError::storage("connection failed");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"type\":\"Storage\""));
        assert!(json.contains("connection failed"));
    }

    #[test]
    fn test_not_assigned_details() {
        let err = AppError::not_assigned("pr-1", "u2");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"pr_id\":\"pr-1\""));
        assert!(json.contains("\"user_id\":\"u2\""));
    }

    #[test]
    fn test_optional_fields_not_serialized() {
        let err = AppError::storage("error");
        let json = serde_json::to_string(&err).unwrap();
        // operation is None, so should not appear
        assert!(!json.contains("operation"));
    }

    #[test]
    fn test_display_impl() {
        let err = AppError::team_exists("core");
        assert_eq!(format!("{}", err), "Team already exists: core");
    }

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            AppError::team_exists("t"),
            AppError::team_not_found("t"),
            AppError::user_not_found("u"),
            AppError::bad_member("empty", 0),
            AppError::pr_exists("t", "u"),
            AppError::pr_not_found("p"),
            AppError::pr_merged("p"),
            AppError::not_assigned("p", "u"),
            AppError::no_candidate("p"),
            AppError::storage("s"),
            AppError::timeout("op"),
            AppError::bad_input("b"),
        ];
        let mut codes: Vec<&str> = errors.iter().map(AppError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_only_transient_errors_are_retryable() {
        assert!(AppError::storage("disk full").is_retryable());
        assert!(AppError::timeout("create_pr").is_retryable());
        assert!(!AppError::pr_exists("Fix bug", "a").is_retryable());
        assert!(!AppError::user_not_found("a").is_retryable());
        assert!(!AppError::no_candidate("p").is_retryable());
    }
}
