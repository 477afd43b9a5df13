use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use leadserver::api_router::configure_api_routes;
use leadserver::calls::{DemoTelephony, Telephony};
use leadserver::config::{
    AirtableConfig, AppConfig, OpenAiConfig, ServerConfig, VapiConfig, WorkflowConfig,
};
use leadserver::leads::Lead;
use leadserver::llm::{
    Classifier, ClassifierError, DemoClassifier, Outreach, OutreachChannel, OutreachTone,
    ScoreResult,
};
use leadserver::scoring::ScoreLabel;
use leadserver::shared::state::AppState;
use leadserver::store::{DemoStore, RecordStore};
use leadserver::workflows::WorkflowDispatcher;

fn demo_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        },
        demo_mode: true,
        airtable: AirtableConfig {
            api_key: None,
            base_id: None,
        },
        openai: OpenAiConfig {
            api_key: None,
            model: "gpt-4o-mini".into(),
        },
        vapi: VapiConfig {
            api_key: None,
            assistant_id: None,
        },
        workflows: WorkflowConfig {
            hot_lead_webhook: None,
            cold_lead_webhook: None,
            call_completed_webhook: None,
            webhook_secret: None,
        },
    }
}

fn demo_state(classifier: Option<Arc<dyn Classifier>>) -> Arc<AppState> {
    let config = demo_config();
    Arc::new(AppState {
        workflows: Arc::new(WorkflowDispatcher::new(config.workflows.clone(), true)),
        store: Arc::new(DemoStore::new()),
        classifier,
        telephony: Some(Arc::new(DemoTelephony) as Arc<dyn Telephony>),
        config,
    })
}

fn app(state: Arc<AppState>) -> axum::Router {
    configure_api_routes().with_state(state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body read failed");
    serde_json::from_slice(&bytes).expect("body is not JSON")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn list_leads_returns_seeded_data() {
    let app = app(demo_state(Some(Arc::new(DemoClassifier))));
    let response = app.oneshot(get("/api/leads")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let leads = body["leads"].as_array().unwrap();
    assert!(leads.len() >= 6);
    assert_eq!(body["total"].as_u64().unwrap() as usize, leads.len());
}

#[tokio::test]
async fn list_leads_applies_conjunctive_filters() {
    let app = app(demo_state(None));
    let response = app
        .oneshot(get("/api/leads?search=sarah&status=Qualified"))
        .await
        .unwrap();
    let body = body_json(response).await;
    let leads = body["leads"].as_array().unwrap();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0]["name"], "Sarah Chen");
}

#[tokio::test]
async fn create_lead_is_auto_scored_with_consistent_label() {
    let app = app(demo_state(Some(Arc::new(DemoClassifier))));
    let response = app
        .oneshot(post(
            "/api/leads",
            json!({ "name": "Grace Hopper", "email": "grace@navy.mil", "company": "US Navy" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let lead = &body["lead"];
    assert_eq!(lead["status"], "New");
    let score = lead["aiScore"].as_u64().unwrap() as u8;
    assert_eq!(
        lead["aiScoreLabel"].as_str().unwrap(),
        ScoreLabel::from_score(score).as_str()
    );
}

#[tokio::test]
async fn create_lead_without_email_is_rejected() {
    let app = app(demo_state(None));
    let response = app
        .oneshot(post("/api/leads", json!({ "name": "No Email", "email": "" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_lead_returns_404() {
    let app = app(demo_state(None));
    let response = app.oneshot(get("/api/leads/recMissing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn analytics_overview_matches_seed_buckets() {
    let state = demo_state(None);
    let leads = state
        .store
        .list_leads(&leadserver::leads::LeadFilter::default())
        .await
        .unwrap();
    let expected_hot = leads
        .iter()
        .filter(|l| ScoreLabel::from_score(l.ai_score.unwrap_or(0)) == ScoreLabel::Hot)
        .count();

    let response = app(state).oneshot(get("/api/analytics/overview")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["hotLeads"].as_u64().unwrap() as usize, expected_hot);
    assert_eq!(body["totalLeads"].as_u64().unwrap() as usize, leads.len());
}

#[tokio::test]
async fn analytics_pipeline_has_all_six_stages() {
    let app = app(demo_state(None));
    let response = app.oneshot(get("/api/analytics/pipeline")).await.unwrap();
    let body = body_json(response).await;

    let pipeline = body["pipeline"].as_array().unwrap();
    assert_eq!(pipeline.len(), 6);
    let order: Vec<&str> = pipeline
        .iter()
        .map(|p| p["status"].as_str().unwrap())
        .collect();
    assert_eq!(
        order,
        vec!["New", "Contacted", "Qualified", "Proposal", "Won", "Lost"]
    );
}

#[tokio::test]
async fn analytics_funnel_never_contains_lost() {
    let app = app(demo_state(None));
    let response = app.oneshot(get("/api/analytics/funnel")).await.unwrap();
    let body = body_json(response).await;

    let stages: Vec<&str> = body["funnel"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["stage"].as_str().unwrap())
        .collect();
    assert_eq!(stages, vec!["Total", "Contacted", "Qualified", "Proposal", "Won"]);
}

#[tokio::test]
async fn activities_for_lead_are_scoped() {
    let app = app(demo_state(None));
    let response = app
        .oneshot(get("/api/activities/lead/recDemoSarahChen"))
        .await
        .unwrap();
    let body = body_json(response).await;
    let activities = body["activities"].as_array().unwrap();
    assert!(!activities.is_empty());
    assert!(activities
        .iter()
        .all(|a| a["leadId"] == "recDemoSarahChen"));
}

#[tokio::test]
async fn schedule_call_returns_demo_call() {
    let app = app(demo_state(None));
    let response = app
        .oneshot(post(
            "/api/calls/schedule",
            json!({ "phoneNumber": "+14155550100", "leadName": "Sarah Chen" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body["callId"].as_str().unwrap().starts_with("call_demo_"));
}

#[tokio::test]
async fn call_webhook_acks_vendor_payload() {
    let app = app(demo_state(None));
    let response = app
        .oneshot(post(
            "/api/calls/webhook",
            json!({ "message": { "id": "call9", "status": "ended" } }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["received"], true);
}

#[tokio::test]
async fn outreach_respects_channel_limits() {
    let app = app(demo_state(Some(Arc::new(DemoClassifier))));
    let response = app
        .oneshot(post(
            "/api/leads/recDemoSarahChen/outreach",
            json!({ "type": "sms", "tone": "casual" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().chars().count() <= 160);
    assert!(body["subject"].is_null());
    assert_eq!(body["type"], "sms");
}

#[tokio::test]
async fn score_route_requires_classifier() {
    let app = app(demo_state(None));
    let response = app
        .oneshot(post("/api/leads/recDemoSarahChen/score", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("not configured"));
}

/// Classifier stub that fails for one specific lead, for exercising
/// per-item isolation in batch scoring.
struct FlakyClassifier;

#[async_trait]
impl Classifier for FlakyClassifier {
    async fn score_lead(&self, lead: &Lead) -> Result<ScoreResult, ClassifierError> {
        if lead.name.contains("Marcus") {
            return Err(ClassifierError::Upstream("model unavailable".into()));
        }
        Ok(ScoreResult {
            score: 81,
            score_label: ScoreLabel::from_score(81),
            insights: "Strong fit".into(),
            key_strengths: vec!["Senior title".into()],
            concerns: vec![],
            suggested_next_step: "Book a demo".into(),
        })
    }

    async fn generate_outreach(
        &self,
        _lead: &Lead,
        _channel: OutreachChannel,
        _tone: OutreachTone,
    ) -> Result<Outreach, ClassifierError> {
        Err(ClassifierError::Upstream("not implemented".into()))
    }
}

#[tokio::test]
async fn bulk_score_isolates_per_item_failures() {
    let app = app(demo_state(Some(Arc::new(FlakyClassifier))));
    let response = app
        .oneshot(post(
            "/api/leads/bulk-score",
            json!({ "leadIds": ["recDemoSarahChen", "recDemoMarcusWebb"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);

    assert_eq!(results[0]["id"], "recDemoSarahChen");
    assert_eq!(results[0]["success"], true);
    assert_eq!(results[0]["score"], 81);

    assert_eq!(results[1]["id"], "recDemoMarcusWebb");
    assert_eq!(results[1]["success"], false);
    assert!(results[1]["score"].is_null());
    assert_eq!(results[1]["error"], "Failed to score");
}

#[tokio::test]
async fn import_reports_per_item_results() {
    let app = app(demo_state(None));
    let response = app
        .oneshot(post(
            "/api/leads/import",
            json!({ "leads": [
                { "name": "Lin Zhou", "email": "lin@example.com" },
                { "name": "Omar Haddad", "email": "omar@example.com" }
            ]}),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["imported"].as_array().unwrap().len(), 2);
    assert!(body["results"]
        .as_array()
        .unwrap()
        .iter()
        .all(|r| r["success"] == true));
}

#[tokio::test]
async fn workflow_webhook_rejects_bad_secret() {
    let mut config = demo_config();
    config.workflows.webhook_secret = Some("s3cret".into());
    let state = Arc::new(AppState {
        workflows: Arc::new(WorkflowDispatcher::new(config.workflows.clone(), false)),
        store: Arc::new(DemoStore::new()),
        classifier: None,
        telephony: None,
        config,
    });
    let router = app(state);

    let unauthorized = router
        .clone()
        .oneshot(post("/api/workflows/webhook", json!({ "event": "x" })))
        .await
        .unwrap();
    assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);

    let authorized = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/workflows/webhook")
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-webhook-secret", "s3cret")
                .body(Body::from(json!({ "event": "x" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(authorized.status(), StatusCode::OK);
}

#[tokio::test]
async fn workflow_trigger_succeeds_in_demo_mode() {
    let app = app(demo_state(None));
    let response = app
        .oneshot(post(
            "/api/workflows/trigger",
            json!({ "triggerType": "hot_lead", "data": { "leadId": "rec1" } }),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn delete_then_get_is_404() {
    let state = demo_state(None);
    let router = app(state);

    let deleted = router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/leads/recDemoJakeMorris")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::OK);
    assert_eq!(body_json(deleted).await["success"], true);

    let missing = router.oneshot(get("/api/leads/recDemoJakeMorris")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}
