use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::leads::{CallStatus, Lead, LeadFilter, LeadSource, LeadStatus};
use crate::scoring::ScoreLabel;
use crate::shared::error::ApiError;
use crate::shared::state::AppState;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PipelineEntry {
    pub status: LeadStatus,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SourceEntry {
    pub source: LeadSource,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FunnelStage {
    pub stage: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsOverview {
    pub total_leads: usize,
    pub hot_leads: usize,
    pub warm_leads: usize,
    pub cold_leads: usize,
    pub conversion_rate: u32,
    pub calls_scheduled_today: usize,
}

/// One entry per status in canonical pipeline order, zero counts included.
pub fn pipeline_breakdown(leads: &[Lead]) -> Vec<PipelineEntry> {
    LeadStatus::ALL
        .iter()
        .map(|&status| PipelineEntry {
            status,
            count: leads.iter().filter(|l| l.status == status).count(),
        })
        .collect()
}

/// One entry per source that has at least one lead, canonical source order.
pub fn source_breakdown(leads: &[Lead]) -> Vec<SourceEntry> {
    LeadSource::ALL
        .iter()
        .map(|&source| SourceEntry {
            source,
            count: leads.iter().filter(|l| l.lead_source == Some(source)).count(),
        })
        .filter(|entry| entry.count > 0)
        .collect()
}

/// Forward-progress stages only; Lost is not part of the funnel.
pub fn funnel_stages(leads: &[Lead]) -> Vec<FunnelStage> {
    let count_for = |status: LeadStatus| leads.iter().filter(|l| l.status == status).count();
    vec![
        FunnelStage {
            stage: "Total",
            count: leads.len(),
        },
        FunnelStage {
            stage: LeadStatus::Contacted.as_str(),
            count: count_for(LeadStatus::Contacted),
        },
        FunnelStage {
            stage: LeadStatus::Qualified.as_str(),
            count: count_for(LeadStatus::Qualified),
        },
        FunnelStage {
            stage: LeadStatus::Proposal.as_str(),
            count: count_for(LeadStatus::Proposal),
        },
        FunnelStage {
            stage: LeadStatus::Won.as_str(),
            count: count_for(LeadStatus::Won),
        },
    ]
}

pub fn overview(leads: &[Lead]) -> AnalyticsOverview {
    let bucket_count = |label: ScoreLabel| {
        leads
            .iter()
            .filter(|l| ScoreLabel::from_score(l.ai_score.unwrap_or(0)) == label)
            .count()
    };

    let total = leads.len();
    let won = leads.iter().filter(|l| l.status == LeadStatus::Won).count();
    let conversion_rate = if total > 0 {
        ((won as f64 / total as f64) * 100.0).round() as u32
    } else {
        0
    };

    AnalyticsOverview {
        total_leads: total,
        hot_leads: bucket_count(ScoreLabel::Hot),
        warm_leads: bucket_count(ScoreLabel::Warm),
        cold_leads: bucket_count(ScoreLabel::Cold),
        conversion_rate,
        calls_scheduled_today: leads
            .iter()
            .filter(|l| l.call_status == Some(CallStatus::Scheduled))
            .count(),
    }
}

pub async fn get_overview(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AnalyticsOverview>, ApiError> {
    let leads = state.store.list_leads(&LeadFilter::default()).await?;
    Ok(Json(overview(&leads)))
}

pub async fn get_pipeline(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let leads = state.store.list_leads(&LeadFilter::default()).await?;
    Ok(Json(
        serde_json::json!({ "pipeline": pipeline_breakdown(&leads) }),
    ))
}

pub async fn get_sources(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let leads = state.store.list_leads(&LeadFilter::default()).await?;
    Ok(Json(
        serde_json::json!({ "sources": source_breakdown(&leads) }),
    ))
}

pub async fn get_funnel(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let leads = state.store.list_leads(&LeadFilter::default()).await?;
    Ok(Json(serde_json::json!({ "funnel": funnel_stages(&leads) })))
}

pub fn configure_analytics_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/analytics/overview", get(get_overview))
        .route("/api/analytics/pipeline", get(get_pipeline))
        .route("/api/analytics/sources", get(get_sources))
        .route("/api/analytics/funnel", get(get_funnel))
}
