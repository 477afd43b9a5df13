use async_trait::async_trait;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::leads::CallStatus;
use crate::shared::error::ApiError;
use crate::shared::retry::retry_with_backoff;
use crate::shared::state::AppState;
use crate::workflows::WorkflowTrigger;

const DEFAULT_BASE_URL: &str = "https://api.vapi.ai";

#[derive(Debug, thiserror::Error)]
pub enum TelephonyError {
    #[error("telephony request failed: {0}")]
    Upstream(String),
}

impl From<reqwest::Error> for TelephonyError {
    fn from(e: reqwest::Error) -> Self {
        Self::Upstream(e.to_string())
    }
}

/// One telephony session tied to a lead.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub status: CallStatus,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleCallRequest {
    pub phone_number: String,
    pub lead_name: String,
    pub lead_company: Option<String>,
    pub lead_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledCall {
    pub call_id: String,
    pub status: String,
}

/// Completion notification delivered asynchronously by the vendor.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CallCompletion {
    pub call_id: String,
    pub status: CallStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

/// Seam for the voice-call scheduling vendor.
#[async_trait]
pub trait Telephony: Send + Sync {
    async fn schedule_call(
        &self,
        request: &ScheduleCallRequest,
    ) -> Result<ScheduledCall, TelephonyError>;

    async fn list_calls(&self) -> Result<Vec<Call>, TelephonyError>;
}

/// Parses the vendor's webhook body into a completion event. The payload
/// shape varies between webhook versions, so every field is read leniently
/// and missing fields never fail the parse.
pub fn parse_call_webhook(body: &Value) -> CallCompletion {
    let message = if body["message"].is_object() {
        &body["message"]
    } else {
        body
    };

    let vendor_status = message["status"].as_str().unwrap_or("");
    let ended_reason = message["endedReason"].as_str().unwrap_or("");
    let status = if vendor_status == "no-answer" || ended_reason == "no-answer" {
        CallStatus::NoAnswer
    } else if vendor_status == "busy" || ended_reason == "busy" {
        CallStatus::CallbackRequested
    } else {
        CallStatus::Completed
    };

    let call_id = message["call"]["id"]
        .as_str()
        .or_else(|| message["id"].as_str())
        .unwrap_or("")
        .to_string();

    let duration = message["call"]["duration"]
        .as_u64()
        .or_else(|| message["duration"].as_u64())
        .map(|d| d as u32);

    let summary = message["analysis"]["summary"]
        .as_str()
        .or_else(|| message["summary"].as_str())
        .map(String::from);

    let outcome = message["analysis"]["successEvaluation"]
        .as_str()
        .unwrap_or("unknown")
        .to_string();

    CallCompletion {
        call_id,
        status,
        duration,
        summary,
        outcome,
        transcript: message["transcript"].as_str().map(String::from),
    }
}

pub struct VapiClient {
    client: reqwest::Client,
    api_key: String,
    assistant_id: String,
    base_url: String,
}

impl VapiClient {
    pub fn new(api_key: String, assistant_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            assistant_id,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    async fn send_with_retry(
        &self,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, TelephonyError> {
        // Transport errors and 5xx are retried with doubling delays; client
        // errors are returned to the caller immediately.
        let response = retry_with_backoff(3, Duration::from_millis(250), || {
            let request = build();
            async move {
                let response = request.send().await?;
                if response.status().is_server_error() {
                    return response.error_for_status();
                }
                Ok(response)
            }
        })
        .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TelephonyError::Upstream(format!("{status}: {body}")));
        }
        Ok(response)
    }
}

#[async_trait]
impl Telephony for VapiClient {
    async fn schedule_call(
        &self,
        request: &ScheduleCallRequest,
    ) -> Result<ScheduledCall, TelephonyError> {
        let first_message = match &request.lead_company {
            Some(company) => format!(
                "Hi, this is Sarah from the sales team. Am I speaking with {} from {company}?",
                request.lead_name
            ),
            None => format!(
                "Hi, this is Sarah from the sales team. Am I speaking with {}?",
                request.lead_name
            ),
        };
        let body = json!({
            "assistantId": self.assistant_id,
            "customer": {
                "number": request.phone_number,
                "name": request.lead_name,
            },
            "assistantOverrides": {
                "firstMessage": first_message,
            },
        });

        let url = format!("{}/call", self.base_url);
        let response = self
            .send_with_retry(|| {
                self.client
                    .post(&url)
                    .bearer_auth(&self.api_key)
                    .json(&body)
            })
            .await?;

        let data: Value = response.json().await?;
        Ok(ScheduledCall {
            call_id: data["id"].as_str().unwrap_or("").to_string(),
            status: data["status"].as_str().unwrap_or("").to_string(),
        })
    }

    async fn list_calls(&self) -> Result<Vec<Call>, TelephonyError> {
        let url = format!("{}/call", self.base_url);
        let response = self
            .send_with_retry(|| self.client.get(&url).bearer_auth(&self.api_key))
            .await?;

        let data: Value = response.json().await?;
        let calls = data
            .as_array()
            .into_iter()
            .flatten()
            .map(|raw| {
                let completion = parse_call_webhook(raw);
                Call {
                    id: raw["id"].as_str().unwrap_or("").to_string(),
                    lead_id: None,
                    lead_name: raw["customer"]["name"].as_str().map(String::from),
                    scheduled_at: raw["createdAt"].as_str().map(String::from),
                    completed_at: raw["endedAt"].as_str().map(String::from),
                    duration: completion.duration,
                    outcome: Some(completion.outcome),
                    summary: completion.summary,
                    status: if raw["endedAt"].is_string() {
                        completion.status
                    } else {
                        CallStatus::Scheduled
                    },
                }
            })
            .collect();
        Ok(calls)
    }
}

/// Fixture telephony used when no vendor credentials are configured.
pub struct DemoTelephony;

#[async_trait]
impl Telephony for DemoTelephony {
    async fn schedule_call(
        &self,
        _request: &ScheduleCallRequest,
    ) -> Result<ScheduledCall, TelephonyError> {
        Ok(ScheduledCall {
            call_id: format!("call_demo_{}", Uuid::new_v4().simple()),
            status: "scheduled".to_string(),
        })
    }

    async fn list_calls(&self) -> Result<Vec<Call>, TelephonyError> {
        Ok(crate::store::demo::seed_calls())
    }
}

pub async fn list_calls(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let telephony = state
        .telephony
        .as_ref()
        .ok_or(ApiError::NotConfigured("Vapi API key"))?;
    let calls = telephony.list_calls().await?;
    Ok(Json(json!({ "calls": calls })))
}

pub async fn schedule_call(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScheduleCallRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let telephony = state
        .telephony
        .as_ref()
        .ok_or(ApiError::NotConfigured("Vapi API key"))?;
    if req.phone_number.trim().is_empty() {
        return Err(ApiError::Validation("phoneNumber is required".into()));
    }

    let scheduled = telephony.schedule_call(&req).await?;
    Ok(Json(json!({
        "callId": scheduled.call_id,
        "status": scheduled.status,
    })))
}

/// Completion notifications from the vendor. The call-completed workflow is
/// emitted as a detached side effect; the vendor only needs an ack.
pub async fn call_webhook(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let completion = parse_call_webhook(&body);
    log::info!(
        "call {} completed with status {}",
        completion.call_id,
        completion.status.as_str()
    );

    state.workflows.emit(
        WorkflowTrigger::CallCompleted,
        serde_json::to_value(&completion).unwrap_or(Value::Null),
    );

    Ok(Json(json!({ "received": true })))
}

pub fn configure_call_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/calls", get(list_calls))
        .route("/api/calls/schedule", post(schedule_call))
        .route("/api/calls/webhook", post(call_webhook))
}
