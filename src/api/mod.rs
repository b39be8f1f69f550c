//! REST API routes.
//!
//! Routes live under `/v1` and map one-to-one onto [`Dispenser`]
//! operations. Failures are returned as
//! `{"error": {"code": ..., "message": ...}}` with a status code derived
//! from the error kind.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::models::{NewMember, PrStatus, PullRequestSnapshot, ReviewSummary, User};
use crate::services::Dispenser;

// ── Error handling ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

/// Wrapper to make AppError usable as an axum error response.
pub struct ApiErr(AppError);

impl ApiErr {
    fn status(&self) -> StatusCode {
        match &self.0 {
            AppError::TeamNotFound { .. }
            | AppError::UserNotFound { .. }
            | AppError::PrNotFound { .. } => StatusCode::NOT_FOUND,
            AppError::TeamExists { .. }
            | AppError::BadMember { .. }
            | AppError::BadInput { .. } => StatusCode::BAD_REQUEST,
            AppError::PrExists { .. }
            | AppError::PrMerged { .. }
            | AppError::NotAssigned { .. }
            | AppError::NoCandidate { .. } => StatusCode::CONFLICT,
            AppError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            AppError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorEnvelope {
            error: ErrorBody {
                code: self.0.code(),
                message: self.0.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<AppError> for ApiErr {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiErr> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiErr(AppError::bad_input(rejection.body_text())))
}

fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, ApiErr> {
    params
        .map(|Query(value)| value)
        .map_err(|rejection| ApiErr(AppError::bad_input(rejection.body_text())))
}

fn require(value: &str, field: &str) -> Result<(), ApiErr> {
    if value.trim().is_empty() {
        return Err(ApiErr(AppError::bad_input_field(
            format!("{} is required", field),
            field,
        )));
    }
    Ok(())
}

// ── Request types ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct AddTeamRequest {
    team_name: String,
    #[serde(default)]
    members: Vec<NewMember>,
}

#[derive(Deserialize)]
struct TeamQuery {
    team_name: String,
}

#[derive(Deserialize)]
struct SetUserActiveRequest {
    user_id: String,
    is_active: bool,
}

#[derive(Deserialize)]
struct UserQuery {
    user_id: String,
}

#[derive(Deserialize)]
struct CreatePrRequest {
    title: String,
    author_id: String,
}

#[derive(Deserialize)]
struct MergePrRequest {
    pr_id: String,
}

#[derive(Deserialize)]
struct ReassignRequest {
    pr_id: String,
    old_reviewer_id: String,
}

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct MemberResponse {
    user_id: String,
    username: String,
    is_active: bool,
}

impl From<NewMember> for MemberResponse {
    fn from(member: NewMember) -> Self {
        Self {
            user_id: member.user_id,
            username: member.username,
            is_active: member.is_active,
        }
    }
}

impl From<User> for MemberResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            is_active: user.is_active,
        }
    }
}

#[derive(Serialize)]
struct TeamResponse {
    team_name: String,
    members: Vec<MemberResponse>,
}

#[derive(Serialize)]
struct AddTeamResponse {
    team: TeamResponse,
}

#[derive(Serialize)]
struct UserResponse {
    user_id: String,
    username: String,
    team_name: String,
    is_active: bool,
}

#[derive(Serialize)]
struct SetUserActiveResponse {
    user: UserResponse,
}

#[derive(Serialize)]
struct ReviewItem {
    pr_id: String,
    title: String,
    author_id: String,
    status: PrStatus,
}

impl From<ReviewSummary> for ReviewItem {
    fn from(review: ReviewSummary) -> Self {
        Self {
            pr_id: review.pr_id,
            title: review.title,
            author_id: review.author_id,
            status: review.status,
        }
    }
}

#[derive(Serialize)]
struct ReviewListResponse {
    user_id: String,
    items: Vec<ReviewItem>,
}

#[derive(Serialize)]
struct PullRequestResponse {
    pr_id: String,
    title: String,
    author_id: String,
    status: PrStatus,
    assigned_reviewers: Vec<String>,
    merged_at: Option<DateTime<Utc>>,
}

impl From<PullRequestSnapshot> for PullRequestResponse {
    fn from(snapshot: PullRequestSnapshot) -> Self {
        let pr = snapshot.pull_request;
        Self {
            pr_id: pr.id,
            title: pr.title,
            author_id: pr.author_id,
            status: pr.status,
            assigned_reviewers: snapshot.reviewers,
            merged_at: pr.merged_at,
        }
    }
}

#[derive(Serialize)]
struct PrEnvelope {
    pr: PullRequestResponse,
}

#[derive(Serialize)]
struct ReassignResponse {
    pr: PullRequestResponse,
    replaced_by: String,
}

// ── Route builder ────────────────────────────────────────────────────────────

/// Shared state for the API routes.
#[derive(Clone)]
pub struct ApiState {
    pub dispenser: Arc<Dispenser>,
}

/// Build the full router with CORS and request tracing.
pub fn router(dispenser: Arc<Dispenser>) -> Router {
    let v1 = Router::new()
        .route("/team/add", post(add_team))
        .route("/team/get", get(get_team))
        .route("/users/setIsActive", post(set_user_active))
        .route("/users/getReview", get(get_user_reviews))
        .route("/pullRequest/create", post(create_pr))
        .route("/pullRequest/merge", post(merge_pr))
        .route("/pullRequest/reassign", post(reassign_reviewer));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::OPTIONS,
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::PUT,
        ])
        .allow_headers(Any)
        .expose_headers([header::LINK])
        .max_age(Duration::from_secs(300));

    Router::new()
        .route("/health", get(health))
        .nest("/v1", v1)
        .fallback(unknown_route)
        .with_state(ApiState { dispenser })
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn unknown_route() -> (StatusCode, Json<ErrorEnvelope>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorEnvelope {
            error: ErrorBody {
                code: "NOT_FOUND",
                message: "route not found".to_string(),
            },
        }),
    )
}

/// POST /v1/team/add: create a team with its members.
async fn add_team(
    State(state): State<ApiState>,
    payload: Result<Json<AddTeamRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AddTeamResponse>), ApiErr> {
    let request = json_body(payload)?;
    let registered = state
        .dispenser
        .add_team(&request.team_name, request.members)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AddTeamResponse {
            team: TeamResponse {
                team_name: registered.team.name,
                members: registered.members.into_iter().map(MemberResponse::from).collect(),
            },
        }),
    ))
}

/// GET /v1/team/get?team_name=X: team with its members.
async fn get_team(
    State(state): State<ApiState>,
    params: Result<Query<TeamQuery>, QueryRejection>,
) -> Result<Json<TeamResponse>, ApiErr> {
    let query = query_params(params)?;
    require(&query.team_name, "team_name")?;

    let team = state.dispenser.get_team(&query.team_name).await?;
    Ok(Json(TeamResponse {
        team_name: team.team.name,
        members: team.members.into_iter().map(MemberResponse::from).collect(),
    }))
}

/// POST /v1/users/setIsActive: toggle a user's availability.
async fn set_user_active(
    State(state): State<ApiState>,
    payload: Result<Json<SetUserActiveRequest>, JsonRejection>,
) -> Result<Json<SetUserActiveResponse>, ApiErr> {
    let request = json_body(payload)?;
    require(&request.user_id, "user_id")?;

    let updated = state
        .dispenser
        .set_user_active(&request.user_id, request.is_active)
        .await?;

    Ok(Json(SetUserActiveResponse {
        user: UserResponse {
            user_id: updated.user.id,
            username: updated.user.username,
            team_name: updated.team_name,
            is_active: updated.user.is_active,
        },
    }))
}

/// GET /v1/users/getReview?user_id=X: pull requests the user reviews.
async fn get_user_reviews(
    State(state): State<ApiState>,
    params: Result<Query<UserQuery>, QueryRejection>,
) -> Result<Json<ReviewListResponse>, ApiErr> {
    let query = query_params(params)?;
    require(&query.user_id, "user_id")?;

    let reviews = state.dispenser.list_reviews_for_user(&query.user_id).await?;
    Ok(Json(ReviewListResponse {
        user_id: query.user_id,
        items: reviews.into_iter().map(ReviewItem::from).collect(),
    }))
}

/// POST /v1/pullRequest/create: open a pull request and assign reviewers.
async fn create_pr(
    State(state): State<ApiState>,
    payload: Result<Json<CreatePrRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PrEnvelope>), ApiErr> {
    let request = json_body(payload)?;
    require(&request.author_id, "author_id")?;

    let created = state
        .dispenser
        .create_pr(&request.title, &request.author_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PrEnvelope {
            pr: created.into(),
        }),
    ))
}

/// POST /v1/pullRequest/merge: merge a pull request (idempotent).
async fn merge_pr(
    State(state): State<ApiState>,
    payload: Result<Json<MergePrRequest>, JsonRejection>,
) -> Result<Json<PrEnvelope>, ApiErr> {
    let request = json_body(payload)?;
    require(&request.pr_id, "pr_id")?;

    let merged = state.dispenser.merge_pr(&request.pr_id).await?;
    Ok(Json(PrEnvelope { pr: merged.into() }))
}

/// POST /v1/pullRequest/reassign: replace one reviewer.
async fn reassign_reviewer(
    State(state): State<ApiState>,
    payload: Result<Json<ReassignRequest>, JsonRejection>,
) -> Result<Json<ReassignResponse>, ApiErr> {
    let request = json_body(payload)?;
    require(&request.pr_id, "pr_id")?;
    require(&request.old_reviewer_id, "old_reviewer_id")?;

    let result = state
        .dispenser
        .reassign_reviewer(&request.pr_id, &request.old_reviewer_id)
        .await?;

    Ok(Json(ReassignResponse {
        pr: result.snapshot.into(),
        replaced_by: result.replaced_by,
    }))
}
