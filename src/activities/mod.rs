use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::shared::error::ApiError;
use crate::shared::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityType {
    #[serde(rename = "Email Sent")]
    EmailSent,
    #[serde(rename = "Call Made")]
    CallMade,
    #[serde(rename = "Meeting Scheduled")]
    MeetingScheduled,
    #[serde(rename = "Proposal Sent")]
    ProposalSent,
    #[serde(rename = "Follow Up")]
    FollowUp,
    #[serde(rename = "Note Added")]
    NoteAdded,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmailSent => "Email Sent",
            Self::CallMade => "Call Made",
            Self::MeetingScheduled => "Meeting Scheduled",
            Self::ProposalSent => "Proposal Sent",
            Self::FollowUp => "Follow Up",
            Self::NoteAdded => "Note Added",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        [
            Self::EmailSent,
            Self::CallMade,
            Self::MeetingScheduled,
            Self::ProposalSent,
            Self::FollowUp,
            Self::NoteAdded,
        ]
        .iter()
        .copied()
        .find(|t| t.as_str() == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityOutcome {
    Positive,
    Neutral,
    Negative,
    #[serde(rename = "No Response")]
    NoResponse,
}

impl ActivityOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Neutral => "Neutral",
            Self::Negative => "Negative",
            Self::NoResponse => "No Response",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        [Self::Positive, Self::Neutral, Self::Negative, Self::NoResponse]
            .iter()
            .copied()
            .find(|o| o.as_str() == value)
    }
}

/// A timestamped interaction linked to exactly one lead. Created on explicit
/// logging, never mutated or deleted through this surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub activity_type: ActivityType,
    pub lead_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_name: Option<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ActivityOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActivity {
    pub activity_type: ActivityType,
    pub lead_id: String,
    pub description: String,
    pub outcome: Option<ActivityOutcome>,
}

#[derive(Debug, Serialize)]
pub struct ActivityListResponse {
    pub activities: Vec<Activity>,
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub activity: Activity,
}

pub async fn list_activities(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ActivityListResponse>, ApiError> {
    let activities = state.store.list_activities(None).await?;
    Ok(Json(ActivityListResponse { activities }))
}

pub async fn create_activity(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewActivity>,
) -> Result<Json<ActivityResponse>, ApiError> {
    if req.lead_id.trim().is_empty() {
        return Err(ApiError::Validation("leadId is required".into()));
    }
    let activity = state.store.create_activity(&req).await?;
    Ok(Json(ActivityResponse { activity }))
}

pub async fn list_lead_activities(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ActivityListResponse>, ApiError> {
    let activities = state.store.list_activities(Some(id.as_str())).await?;
    Ok(Json(ActivityListResponse { activities }))
}

pub fn configure_activity_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/activities",
            get(list_activities).post(create_activity),
        )
        .route("/api/activities/lead/:id", get(list_lead_activities))
}
