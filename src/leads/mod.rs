use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::llm::{OutreachChannel, OutreachTone, ScoreResult};
use crate::scoring::ScoreLabel;
use crate::shared::error::ApiError;
use crate::shared::state::AppState;
use crate::workflows::WorkflowTrigger;

pub const HOT_LEAD_THRESHOLD: u8 = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Proposal,
    Won,
    Lost,
}

impl LeadStatus {
    /// Canonical pipeline order. Aggregations and the funnel view must not
    /// reorder this.
    pub const ALL: [LeadStatus; 6] = [
        Self::New,
        Self::Contacted,
        Self::Qualified,
        Self::Proposal,
        Self::Won,
        Self::Lost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Contacted => "Contacted",
            Self::Qualified => "Qualified",
            Self::Proposal => "Proposal",
            Self::Won => "Won",
            Self::Lost => "Lost",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.as_str() == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeadSource {
    Website,
    LinkedIn,
    Referral,
    #[serde(rename = "Cold Outreach")]
    ColdOutreach,
    Event,
}

impl LeadSource {
    pub const ALL: [LeadSource; 5] = [
        Self::Website,
        Self::LinkedIn,
        Self::Referral,
        Self::ColdOutreach,
        Self::Event,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Website => "Website",
            Self::LinkedIn => "LinkedIn",
            Self::Referral => "Referral",
            Self::ColdOutreach => "Cold Outreach",
            Self::Event => "Event",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.as_str() == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallStatus {
    #[serde(rename = "Not Called")]
    NotCalled,
    Scheduled,
    Completed,
    #[serde(rename = "No Answer")]
    NoAnswer,
    #[serde(rename = "Callback Requested")]
    CallbackRequested,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotCalled => "Not Called",
            Self::Scheduled => "Scheduled",
            Self::Completed => "Completed",
            Self::NoAnswer => "No Answer",
            Self::CallbackRequested => "Callback Requested",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        [
            Self::NotCalled,
            Self::Scheduled,
            Self::Completed,
            Self::NoAnswer,
            Self::CallbackRequested,
        ]
        .iter()
        .copied()
        .find(|s| s.as_str() == value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_source: Option<LeadSource>,
    pub status: LeadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_score_label: Option<ScoreLabel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_insights: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_strengths: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concerns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_next_step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_contacted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_follow_up: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_status: Option<CallStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLead {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub linkedin_url: Option<String>,
    pub lead_source: Option<LeadSource>,
    pub status: Option<LeadStatus>,
    pub notes: Option<String>,
}

/// Partial update; only present fields are written to the record store.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub linkedin_url: Option<String>,
    pub lead_source: Option<LeadSource>,
    pub status: Option<LeadStatus>,
    pub notes: Option<String>,
    pub ai_score: Option<u8>,
    pub ai_score_label: Option<ScoreLabel>,
    pub ai_insights: Option<String>,
    pub key_strengths: Option<Vec<String>>,
    pub concerns: Option<Vec<String>>,
    pub suggested_next_step: Option<String>,
    pub last_contacted: Option<String>,
    pub next_follow_up: Option<String>,
    pub call_status: Option<CallStatus>,
    pub call_summary: Option<String>,
}

impl LeadPatch {
    pub fn from_score(result: &ScoreResult) -> Self {
        Self {
            ai_score: Some(result.score),
            ai_score_label: Some(result.score_label),
            ai_insights: Some(result.insights.clone()),
            key_strengths: Some(result.key_strengths.clone()),
            concerns: Some(result.concerns.clone()),
            suggested_next_step: Some(result.suggested_next_step.clone()),
            ..Self::default()
        }
    }
}

/// Optional list filters; independently optional, conjunctive when combined.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadFilter {
    pub search: Option<String>,
    pub score_label: Option<ScoreLabel>,
    pub status: Option<LeadStatus>,
    pub source: Option<LeadSource>,
}

impl LeadFilter {
    pub fn is_empty(&self) -> bool {
        self.search.is_none()
            && self.score_label.is_none()
            && self.status.is_none()
            && self.source.is_none()
    }

    /// In-memory evaluation used by the demo store. The search term matches
    /// case-insensitively as a substring of name, email or company.
    pub fn matches(&self, lead: &Lead) -> bool {
        if let Some(search) = &self.search {
            let q = search.to_lowercase();
            let company = lead.company.as_deref().unwrap_or("");
            if !lead.name.to_lowercase().contains(&q)
                && !lead.email.to_lowercase().contains(&q)
                && !company.to_lowercase().contains(&q)
            {
                return false;
            }
        }
        if let Some(label) = self.score_label {
            if lead.ai_score_label != Some(label) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if lead.status != status {
                return false;
            }
        }
        if let Some(source) = self.source {
            if lead.lead_source != Some(source) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Serialize)]
pub struct LeadListResponse {
    pub leads: Vec<Lead>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct LeadResponse {
    pub lead: Lead,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkScoreRequest {
    pub lead_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkScoreItem {
    pub id: String,
    #[serde(flatten)]
    pub result: Option<ScoreResult>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkScoreResponse {
    pub results: Vec<BulkScoreItem>,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub leads: Vec<NewLead>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportItem {
    pub name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub imported: Vec<Lead>,
    pub count: usize,
    pub results: Vec<ImportItem>,
}

#[derive(Debug, Deserialize)]
pub struct OutreachRequest {
    #[serde(rename = "type")]
    pub channel: OutreachChannel,
    pub tone: OutreachTone,
}

#[derive(Debug, Serialize)]
pub struct OutreachResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub message: String,
    #[serde(rename = "type")]
    pub channel: OutreachChannel,
    pub tone: OutreachTone,
}

pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<LeadFilter>,
) -> Result<Json<LeadListResponse>, ApiError> {
    let leads = state.store.list_leads(&filter).await?;
    let total = leads.len();
    Ok(Json(LeadListResponse { leads, total }))
}

pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewLead>,
) -> Result<Json<LeadResponse>, ApiError> {
    if req.name.trim().is_empty() || req.email.trim().is_empty() {
        return Err(ApiError::Validation("name and email are required".into()));
    }

    let mut lead = state.store.create_lead(&req).await?;

    // Auto-score when a classifier is configured; a scoring failure must not
    // fail the create.
    if let Some(classifier) = &state.classifier {
        match classifier.score_lead(&lead).await {
            Ok(result) => {
                match state
                    .store
                    .update_lead(&lead.id, &LeadPatch::from_score(&result))
                    .await
                {
                    Ok(updated) => lead = updated,
                    Err(e) => log::error!("failed to store score for lead {}: {e}", lead.id),
                }
                if result.score >= HOT_LEAD_THRESHOLD {
                    state.workflows.emit(
                        WorkflowTrigger::HotLead,
                        json!({ "lead": lead, "score": result }),
                    );
                }
            }
            Err(e) => log::error!("AI scoring failed for new lead {}: {e}", lead.id),
        }
    }

    Ok(Json(LeadResponse { lead }))
}

pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<LeadResponse>, ApiError> {
    let lead = state.store.get_lead(&id).await?;
    Ok(Json(LeadResponse { lead }))
}

pub async fn update_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<LeadPatch>,
) -> Result<Json<LeadResponse>, ApiError> {
    let lead = state.store.update_lead(&id, &patch).await?;
    Ok(Json(LeadResponse { lead }))
}

pub async fn delete_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.delete_lead(&id).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn score_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<LeadResponse>, ApiError> {
    let classifier = state
        .classifier
        .as_ref()
        .ok_or(ApiError::NotConfigured("OpenAI API key"))?;

    let lead = state.store.get_lead(&id).await?;
    let result = classifier.score_lead(&lead).await?;
    let updated = state
        .store
        .update_lead(&id, &LeadPatch::from_score(&result))
        .await?;

    Ok(Json(LeadResponse { lead: updated }))
}

pub async fn generate_outreach(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<OutreachRequest>,
) -> Result<Json<OutreachResponse>, ApiError> {
    let classifier = state
        .classifier
        .as_ref()
        .ok_or(ApiError::NotConfigured("OpenAI API key"))?;

    let lead = state.store.get_lead(&id).await?;
    let outreach = classifier
        .generate_outreach(&lead, req.channel, req.tone)
        .await?;

    Ok(Json(OutreachResponse {
        subject: outreach.subject,
        message: outreach.message,
        channel: req.channel,
        tone: req.tone,
    }))
}

pub async fn bulk_score(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BulkScoreRequest>,
) -> Result<Json<BulkScoreResponse>, ApiError> {
    let classifier = state
        .classifier
        .as_ref()
        .ok_or(ApiError::NotConfigured("OpenAI API key"))?;

    // One classifier call per id, strictly sequential; a failing item only
    // marks its own result entry.
    let mut results = Vec::with_capacity(req.lead_ids.len());
    for id in req.lead_ids {
        let outcome = async {
            let lead = state.store.get_lead(&id).await?;
            let result = classifier.score_lead(&lead).await?;
            state
                .store
                .update_lead(&id, &LeadPatch::from_score(&result))
                .await?;
            Ok::<ScoreResult, ApiError>(result)
        }
        .await;

        match outcome {
            Ok(result) => results.push(BulkScoreItem {
                id,
                result: Some(result),
                success: true,
                error: None,
            }),
            Err(e) => {
                log::warn!("bulk score failed for lead {id}: {e}");
                results.push(BulkScoreItem {
                    id,
                    result: None,
                    success: false,
                    error: Some("Failed to score".into()),
                });
            }
        }
    }

    Ok(Json(BulkScoreResponse { results }))
}

pub async fn import_leads(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ImportRequest>,
) -> Result<Json<ImportResponse>, ApiError> {
    let mut imported = Vec::new();
    let mut results = Vec::with_capacity(req.leads.len());

    for data in req.leads {
        let name = data.name.clone();
        let record = NewLead {
            status: Some(LeadStatus::New),
            ..data
        };
        match state.store.create_lead(&record).await {
            Ok(lead) => {
                imported.push(lead);
                results.push(ImportItem {
                    name,
                    success: true,
                    error: None,
                });
            }
            Err(e) => {
                log::error!("failed to import lead {name:?}: {e}");
                results.push(ImportItem {
                    name,
                    success: false,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    let count = imported.len();
    Ok(Json(ImportResponse {
        imported,
        count,
        results,
    }))
}

pub fn configure_lead_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/leads", get(list_leads).post(create_lead))
        .route(
            "/api/leads/:id",
            get(get_lead).patch(update_lead).delete(delete_lead),
        )
        .route("/api/leads/:id/score", post(score_lead))
        .route("/api/leads/:id/outreach", post(generate_outreach))
        .route("/api/leads/bulk-score", post(bulk_score))
        .route("/api/leads/import", post(import_leads))
}
