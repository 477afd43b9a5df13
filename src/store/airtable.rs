//! Airtable record-store client.
//!
//! Leads live in a "Leads" table and activities in an "Activities" table;
//! the select-option vocabulary for the score label field is fetched from
//! the metadata API once per process and reused (soft cache, safe to lose).

use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;

use async_trait::async_trait;

use crate::activities::{Activity, ActivityOutcome, ActivityType, NewActivity};
use crate::leads::{CallStatus, Lead, LeadFilter, LeadPatch, LeadSource, LeadStatus, NewLead};
use crate::scoring::{reconcile_label, ScoreLabel};
use crate::store::{RecordStore, StoreError};

const DEFAULT_BASE_URL: &str = "https://api.airtable.com";
const LEADS_TABLE: &str = "Leads";
const ACTIVITIES_TABLE: &str = "Activities";
const SCORE_LABEL_FIELD: &str = "AI Score Label";

pub struct AirtableStore {
    client: reqwest::Client,
    api_key: String,
    base_id: String,
    base_url: String,
    label_options: RwLock<Option<Vec<String>>>,
}

#[derive(Debug, Deserialize)]
struct RecordList {
    #[serde(default)]
    records: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct Record {
    id: String,
    #[serde(default)]
    fields: Value,
}

impl AirtableStore {
    pub fn new(api_key: String, base_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_id,
            base_url: DEFAULT_BASE_URL.to_string(),
            label_options: RwLock::new(None),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/v0/{}/{table}", self.base_url, self.base_id)
    }

    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Upstream(format!("{status}: {body}")));
        }
        Ok(response)
    }

    /// Accepted select options for the score label field, fetched at most
    /// once per process. Fetch failures are logged and leave the cache
    /// unpopulated so a later call may retry.
    async fn score_label_options(&self) -> Vec<String> {
        if let Some(options) = self.label_options.read().await.as_ref() {
            return options.clone();
        }

        let options = match self.fetch_score_label_options().await {
            Ok(options) => options,
            Err(e) => {
                log::warn!("failed to fetch score label vocabulary: {e}");
                return Vec::new();
            }
        };

        log::info!("score label options: {options:?}");
        *self.label_options.write().await = Some(options.clone());
        options
    }

    async fn fetch_score_label_options(&self) -> Result<Vec<String>, StoreError> {
        let url = format!("{}/v0/meta/bases/{}/tables", self.base_url, self.base_id);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let meta: Value = self.check(response).await?.json().await?;

        let options = meta["tables"]
            .as_array()
            .into_iter()
            .flatten()
            .find(|t| t["name"] == LEADS_TABLE)
            .and_then(|t| t["fields"].as_array())
            .into_iter()
            .flatten()
            .find(|f| f["name"] == SCORE_LABEL_FIELD)
            .and_then(|f| f["options"]["choices"].as_array())
            .map(|choices| {
                choices
                    .iter()
                    .filter_map(|c| c["name"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        Ok(options)
    }

    async fn resolve_label(&self, label: ScoreLabel) -> String {
        let options = self.score_label_options().await;
        reconcile_label(label.as_str(), &options)
    }

    async fn lead_query(
        &self,
        formula: Option<String>,
    ) -> Result<Vec<Lead>, StoreError> {
        let mut query: Vec<(String, String)> = vec![
            ("pageSize".into(), "100".into()),
            ("sort[0][field]".into(), "Created".into()),
            ("sort[0][direction]".into(), "desc".into()),
        ];
        if let Some(formula) = formula {
            query.push(("filterByFormula".into(), formula));
        }

        let response = self
            .client
            .get(self.table_url(LEADS_TABLE))
            .bearer_auth(&self.api_key)
            .query(&query)
            .send()
            .await?;
        let list: RecordList = self.check(response).await?.json().await?;
        Ok(list.records.iter().map(record_to_lead).collect())
    }

    async fn write_lead_fields(&self, patch: &LeadPatch) -> Value {
        let mut fields = Map::new();
        let mut put = |name: &str, value: Value| {
            fields.insert(name.to_string(), value);
        };

        if let Some(v) = &patch.name {
            put("Name", json!(v));
        }
        if let Some(v) = &patch.email {
            put("Email", json!(v));
        }
        if let Some(v) = &patch.phone {
            put("Phone", json!(v));
        }
        if let Some(v) = &patch.company {
            put("Company", json!(v));
        }
        if let Some(v) = &patch.title {
            put("Title", json!(v));
        }
        if let Some(v) = &patch.linkedin_url {
            put("LinkedIn URL", json!(v));
        }
        if let Some(v) = patch.lead_source {
            put("Lead Source", json!(v.as_str()));
        }
        if let Some(v) = patch.status {
            put("Status", json!(v.as_str()));
        }
        if let Some(v) = &patch.notes {
            put("Notes", json!(v));
        }
        if let Some(v) = patch.ai_score {
            put("AI Score", json!(v));
        }
        if let Some(v) = &patch.ai_insights {
            put("AI Insights", json!(v));
        }
        if let Some(v) = &patch.key_strengths {
            put("Key Strengths", json!(serde_json::to_string(v).unwrap_or_default()));
        }
        if let Some(v) = &patch.concerns {
            put("Concerns", json!(serde_json::to_string(v).unwrap_or_default()));
        }
        if let Some(v) = &patch.suggested_next_step {
            put("Suggested Next Step", json!(v));
        }
        if let Some(v) = &patch.last_contacted {
            put("Last Contacted", json!(v));
        }
        if let Some(v) = &patch.next_follow_up {
            put("Next Follow Up", json!(v));
        }
        if let Some(v) = patch.call_status {
            put("Vapi Call Status", json!(v.as_str()));
        }
        if let Some(v) = &patch.call_summary {
            put("Vapi Call Summary", json!(v));
        }

        // The store's accepted label strings may be decorated; write whatever
        // the vocabulary actually accepts for the chosen bucket.
        if let Some(label) = patch.ai_score_label {
            let resolved = self.resolve_label(label).await;
            fields.insert(SCORE_LABEL_FIELD.to_string(), json!(resolved));
        }

        Value::Object(fields)
    }
}

#[async_trait]
impl RecordStore for AirtableStore {
    async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>, StoreError> {
        let resolved_label = match filter.score_label {
            Some(label) => Some(self.resolve_label(label).await),
            None => None,
        };
        let formula = build_filter_formula(filter, resolved_label.as_deref());
        self.lead_query(formula).await
    }

    async fn get_lead(&self, id: &str) -> Result<Lead, StoreError> {
        let response = self
            .client
            .get(format!("{}/{id}", self.table_url(LEADS_TABLE)))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let record: Record = self.check(response).await?.json().await?;
        Ok(record_to_lead(&record))
    }

    async fn create_lead(&self, data: &NewLead) -> Result<Lead, StoreError> {
        let patch = LeadPatch {
            name: Some(data.name.clone()),
            email: Some(data.email.clone()),
            phone: data.phone.clone(),
            company: data.company.clone(),
            title: data.title.clone(),
            linkedin_url: data.linkedin_url.clone(),
            lead_source: data.lead_source,
            status: Some(data.status.unwrap_or(LeadStatus::New)),
            notes: data.notes.clone(),
            ..LeadPatch::default()
        };
        let fields = self.write_lead_fields(&patch).await;

        let response = self
            .client
            .post(self.table_url(LEADS_TABLE))
            .bearer_auth(&self.api_key)
            .json(&json!({ "fields": fields }))
            .send()
            .await?;
        let record: Record = self.check(response).await?.json().await?;
        Ok(record_to_lead(&record))
    }

    async fn update_lead(&self, id: &str, patch: &LeadPatch) -> Result<Lead, StoreError> {
        let fields = self.write_lead_fields(patch).await;

        let response = self
            .client
            .patch(format!("{}/{id}", self.table_url(LEADS_TABLE)))
            .bearer_auth(&self.api_key)
            .json(&json!({ "fields": fields }))
            .send()
            .await?;
        let record: Record = self.check(response).await?.json().await?;
        Ok(record_to_lead(&record))
    }

    async fn delete_lead(&self, id: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .delete(format!("{}/{id}", self.table_url(LEADS_TABLE)))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        self.check(response).await?;
        Ok(())
    }

    async fn list_activities(&self, lead_id: Option<&str>) -> Result<Vec<Activity>, StoreError> {
        let mut query: Vec<(String, String)> = vec![
            ("sort[0][field]".into(), "Created".into()),
            ("sort[0][direction]".into(), "desc".into()),
        ];
        if let Some(id) = lead_id {
            query.push((
                "filterByFormula".into(),
                format!("FIND(\"{}\", ARRAYJOIN({{Lead}}))", escape_formula(id)),
            ));
        }

        let response = self
            .client
            .get(self.table_url(ACTIVITIES_TABLE))
            .bearer_auth(&self.api_key)
            .query(&query)
            .send()
            .await?;
        let list: RecordList = self.check(response).await?.json().await?;
        Ok(list.records.iter().map(record_to_activity).collect())
    }

    async fn create_activity(&self, data: &NewActivity) -> Result<Activity, StoreError> {
        let mut fields = Map::new();
        fields.insert("Activity Type".into(), json!(data.activity_type.as_str()));
        fields.insert("Lead".into(), json!([data.lead_id]));
        fields.insert("Description".into(), json!(data.description));
        if let Some(outcome) = data.outcome {
            fields.insert("Outcome".into(), json!(outcome.as_str()));
        }

        let response = self
            .client
            .post(self.table_url(ACTIVITIES_TABLE))
            .bearer_auth(&self.api_key)
            .json(&json!({ "fields": Value::Object(fields) }))
            .send()
            .await?;
        let record: Record = self.check(response).await?.json().await?;
        Ok(record_to_activity(&record))
    }
}

/// Escapes user input for interpolation inside a double-quoted formula
/// string. Unescaped quotes would let a search term rewrite the filter.
fn escape_formula(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn build_filter_formula(filter: &LeadFilter, resolved_label: Option<&str>) -> Option<String> {
    let mut clauses = Vec::new();

    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        let term = escape_formula(search);
        clauses.push(format!(
            "OR(FIND(LOWER(\"{term}\"), LOWER({{Name}})), \
             FIND(LOWER(\"{term}\"), LOWER({{Email}})), \
             FIND(LOWER(\"{term}\"), LOWER({{Company}})))"
        ));
    }
    if let Some(label) = resolved_label {
        clauses.push(format!(
            "{{{SCORE_LABEL_FIELD}}} = \"{}\"",
            escape_formula(label)
        ));
    }
    if let Some(status) = filter.status {
        clauses.push(format!("{{Status}} = \"{}\"", status.as_str()));
    }
    if let Some(source) = filter.source {
        clauses.push(format!("{{Lead Source}} = \"{}\"", source.as_str()));
    }

    match clauses.len() {
        0 => None,
        1 => Some(clauses.remove(0)),
        _ => Some(format!("AND({})", clauses.join(", "))),
    }
}

fn field_str(fields: &Value, name: &str) -> Option<String> {
    fields[name].as_str().map(String::from)
}

fn field_list(fields: &Value, name: &str) -> Option<Vec<String>> {
    let raw = fields[name].as_str()?;
    serde_json::from_str(raw).ok()
}

fn record_to_lead(record: &Record) -> Lead {
    let fields = &record.fields;
    Lead {
        id: record.id.clone(),
        name: field_str(fields, "Name").unwrap_or_default(),
        email: field_str(fields, "Email").unwrap_or_default(),
        phone: field_str(fields, "Phone"),
        company: field_str(fields, "Company"),
        title: field_str(fields, "Title"),
        linkedin_url: field_str(fields, "LinkedIn URL"),
        lead_source: field_str(fields, "Lead Source")
            .as_deref()
            .and_then(LeadSource::parse),
        status: field_str(fields, "Status")
            .as_deref()
            .and_then(LeadStatus::parse)
            .unwrap_or(LeadStatus::New),
        ai_score: fields["AI Score"]
            .as_f64()
            .map(|s| s.clamp(0.0, 100.0).round() as u8),
        ai_score_label: field_str(fields, SCORE_LABEL_FIELD)
            .as_deref()
            .and_then(ScoreLabel::parse),
        ai_insights: field_str(fields, "AI Insights"),
        key_strengths: field_list(fields, "Key Strengths"),
        concerns: field_list(fields, "Concerns"),
        suggested_next_step: field_str(fields, "Suggested Next Step"),
        last_contacted: field_str(fields, "Last Contacted"),
        next_follow_up: field_str(fields, "Next Follow Up"),
        notes: field_str(fields, "Notes"),
        call_status: field_str(fields, "Vapi Call Status")
            .as_deref()
            .and_then(CallStatus::parse),
        call_summary: field_str(fields, "Vapi Call Summary"),
        created_at: field_str(fields, "Created"),
    }
}

fn record_to_activity(record: &Record) -> Activity {
    let fields = &record.fields;
    Activity {
        id: record.id.clone(),
        activity_type: field_str(fields, "Activity Type")
            .as_deref()
            .and_then(ActivityType::parse)
            .unwrap_or(ActivityType::NoteAdded),
        lead_id: fields["Lead"][0].as_str().unwrap_or_default().to_string(),
        lead_name: None,
        description: field_str(fields, "Description").unwrap_or_default(),
        outcome: field_str(fields, "Outcome")
            .as_deref()
            .and_then(ActivityOutcome::parse),
        created_at: field_str(fields, "Created"),
    }
}
