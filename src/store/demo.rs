//! In-memory record store used when no Airtable credentials are configured.
//! Seeded with a small fixture data set so every surface has something to
//! show; selected once at startup, never consulted per request.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::activities::{Activity, ActivityOutcome, ActivityType, NewActivity};
use crate::calls::Call;
use crate::leads::{CallStatus, Lead, LeadFilter, LeadPatch, LeadSource, LeadStatus, NewLead};
use crate::scoring::ScoreLabel;
use crate::store::{RecordStore, StoreError};

pub struct DemoStore {
    leads: RwLock<Vec<Lead>>,
    activities: RwLock<Vec<Activity>>,
}

impl DemoStore {
    pub fn new() -> Self {
        Self {
            leads: RwLock::new(seed_leads()),
            activities: RwLock::new(seed_activities()),
        }
    }
}

impl Default for DemoStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for DemoStore {
    async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>, StoreError> {
        let leads = self.leads.read().await;
        Ok(leads.iter().filter(|l| filter.matches(l)).cloned().collect())
    }

    async fn get_lead(&self, id: &str) -> Result<Lead, StoreError> {
        let leads = self.leads.read().await;
        leads
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn create_lead(&self, data: &NewLead) -> Result<Lead, StoreError> {
        let lead = Lead {
            id: format!("rec_demo_{}", Uuid::new_v4().simple()),
            name: data.name.clone(),
            email: data.email.clone(),
            phone: data.phone.clone(),
            company: data.company.clone(),
            title: data.title.clone(),
            linkedin_url: data.linkedin_url.clone(),
            lead_source: data.lead_source,
            status: data.status.unwrap_or(LeadStatus::New),
            ai_score: None,
            ai_score_label: None,
            ai_insights: None,
            key_strengths: None,
            concerns: None,
            suggested_next_step: None,
            last_contacted: None,
            next_follow_up: None,
            notes: data.notes.clone(),
            call_status: Some(CallStatus::NotCalled),
            call_summary: None,
            created_at: Some(Utc::now().to_rfc3339()),
        };
        self.leads.write().await.push(lead.clone());
        Ok(lead)
    }

    async fn update_lead(&self, id: &str, patch: &LeadPatch) -> Result<Lead, StoreError> {
        let mut leads = self.leads.write().await;
        let lead = leads
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(StoreError::NotFound)?;
        apply_patch(lead, patch);
        Ok(lead.clone())
    }

    async fn delete_lead(&self, id: &str) -> Result<(), StoreError> {
        let mut leads = self.leads.write().await;
        let before = leads.len();
        leads.retain(|l| l.id != id);
        if leads.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_activities(&self, lead_id: Option<&str>) -> Result<Vec<Activity>, StoreError> {
        let activities = self.activities.read().await;
        Ok(activities
            .iter()
            .filter(|a| lead_id.map(|id| a.lead_id == id).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn create_activity(&self, data: &NewActivity) -> Result<Activity, StoreError> {
        let lead_name = {
            let leads = self.leads.read().await;
            leads
                .iter()
                .find(|l| l.id == data.lead_id)
                .map(|l| l.name.clone())
        };
        let activity = Activity {
            id: format!("act_demo_{}", Uuid::new_v4().simple()),
            activity_type: data.activity_type,
            lead_id: data.lead_id.clone(),
            lead_name,
            description: data.description.clone(),
            outcome: data.outcome,
            created_at: Some(Utc::now().to_rfc3339()),
        };
        self.activities.write().await.push(activity.clone());
        Ok(activity)
    }
}

fn apply_patch(lead: &mut Lead, patch: &LeadPatch) {
    if let Some(v) = &patch.name {
        lead.name = v.clone();
    }
    if let Some(v) = &patch.email {
        lead.email = v.clone();
    }
    if let Some(v) = &patch.phone {
        lead.phone = Some(v.clone());
    }
    if let Some(v) = &patch.company {
        lead.company = Some(v.clone());
    }
    if let Some(v) = &patch.title {
        lead.title = Some(v.clone());
    }
    if let Some(v) = &patch.linkedin_url {
        lead.linkedin_url = Some(v.clone());
    }
    if let Some(v) = patch.lead_source {
        lead.lead_source = Some(v);
    }
    if let Some(v) = patch.status {
        lead.status = v;
    }
    if let Some(v) = &patch.notes {
        lead.notes = Some(v.clone());
    }
    if let Some(v) = patch.ai_score {
        lead.ai_score = Some(v);
    }
    if let Some(v) = patch.ai_score_label {
        lead.ai_score_label = Some(v);
    }
    if let Some(v) = &patch.ai_insights {
        lead.ai_insights = Some(v.clone());
    }
    if let Some(v) = &patch.key_strengths {
        lead.key_strengths = Some(v.clone());
    }
    if let Some(v) = &patch.concerns {
        lead.concerns = Some(v.clone());
    }
    if let Some(v) = &patch.suggested_next_step {
        lead.suggested_next_step = Some(v.clone());
    }
    if let Some(v) = &patch.last_contacted {
        lead.last_contacted = Some(v.clone());
    }
    if let Some(v) = &patch.next_follow_up {
        lead.next_follow_up = Some(v.clone());
    }
    if let Some(v) = patch.call_status {
        lead.call_status = Some(v);
    }
    if let Some(v) = &patch.call_summary {
        lead.call_summary = Some(v.clone());
    }
}

struct SeedLead {
    id: &'static str,
    name: &'static str,
    email: &'static str,
    phone: Option<&'static str>,
    company: &'static str,
    title: &'static str,
    source: LeadSource,
    status: LeadStatus,
    score: u8,
    insights: &'static str,
    call_status: CallStatus,
}

fn seed_leads() -> Vec<Lead> {
    let seeds = [
        SeedLead {
            id: "recDemoSarahChen",
            name: "Sarah Chen",
            email: "sarah.chen@techflow.io",
            phone: Some("+14155550142"),
            company: "TechFlow",
            title: "VP of Engineering",
            source: LeadSource::Referral,
            status: LeadStatus::Qualified,
            score: 88,
            insights: "Senior decision maker at a growing mid-market company, referred by an existing customer.",
            call_status: CallStatus::Scheduled,
        },
        SeedLead {
            id: "recDemoMarcusWebb",
            name: "Marcus Webb",
            email: "marcus@webbconsulting.com",
            phone: Some("+14155550177"),
            company: "Webb Consulting",
            title: "Principal Consultant",
            source: LeadSource::LinkedIn,
            status: LeadStatus::Contacted,
            score: 62,
            insights: "Engaged consultant with relevant client base, but small firm and unclear budget authority.",
            call_status: CallStatus::Completed,
        },
        SeedLead {
            id: "recDemoPriyaPatel",
            name: "Priya Patel",
            email: "priya.patel@novabank.com",
            phone: None,
            company: "Nova Bank",
            title: "Director of Operations",
            source: LeadSource::Event,
            status: LeadStatus::Proposal,
            score: 75,
            insights: "Enterprise prospect met at the operations summit; active evaluation underway.",
            call_status: CallStatus::NotCalled,
        },
        SeedLead {
            id: "recDemoTomNguyen",
            name: "Tom Nguyen",
            email: "tom.nguyen@gmail.com",
            phone: Some("+14155550119"),
            company: "Freelance",
            title: "Developer",
            source: LeadSource::Website,
            status: LeadStatus::New,
            score: 24,
            insights: "Personal email and no company attached; likely an individual exploring the product.",
            call_status: CallStatus::NotCalled,
        },
        SeedLead {
            id: "recDemoElenaRossi",
            name: "Elena Rossi",
            email: "e.rossi@meridianretail.com",
            phone: Some("+14155550163"),
            company: "Meridian Retail",
            title: "CEO",
            source: LeadSource::Referral,
            status: LeadStatus::Won,
            score: 92,
            insights: "C-suite buyer with an urgent automation initiative and board approval in place.",
            call_status: CallStatus::Completed,
        },
        SeedLead {
            id: "recDemoJakeMorris",
            name: "Jake Morris",
            email: "jmorris@outlook.com",
            phone: None,
            company: "",
            title: "",
            source: LeadSource::ColdOutreach,
            status: LeadStatus::Lost,
            score: 15,
            insights: "Cold-sourced contact with minimal profile data; no response to two follow-ups.",
            call_status: CallStatus::NoAnswer,
        },
    ];

    seeds
        .into_iter()
        .map(|s| Lead {
            id: s.id.into(),
            name: s.name.into(),
            email: s.email.into(),
            phone: s.phone.map(String::from),
            company: (!s.company.is_empty()).then(|| s.company.to_string()),
            title: (!s.title.is_empty()).then(|| s.title.to_string()),
            linkedin_url: None,
            lead_source: Some(s.source),
            status: s.status,
            ai_score: Some(s.score),
            ai_score_label: Some(ScoreLabel::from_score(s.score)),
            ai_insights: Some(s.insights.into()),
            key_strengths: None,
            concerns: None,
            suggested_next_step: None,
            last_contacted: None,
            next_follow_up: None,
            notes: None,
            call_status: Some(s.call_status),
            call_summary: None,
            created_at: Some(Utc::now().to_rfc3339()),
        })
        .collect()
}

fn seed_activities() -> Vec<Activity> {
    let entries = [
        (
            "actDemo1",
            ActivityType::CallMade,
            "recDemoMarcusWebb",
            "Marcus Webb",
            "Intro call; walked through the platform overview.",
            Some(ActivityOutcome::Positive),
        ),
        (
            "actDemo2",
            ActivityType::ProposalSent,
            "recDemoPriyaPatel",
            "Priya Patel",
            "Sent the operations-automation proposal and pricing sheet.",
            None,
        ),
        (
            "actDemo3",
            ActivityType::EmailSent,
            "recDemoSarahChen",
            "Sarah Chen",
            "Shared the engineering case study ahead of the scheduled call.",
            Some(ActivityOutcome::NoResponse),
        ),
        (
            "actDemo4",
            ActivityType::MeetingScheduled,
            "recDemoSarahChen",
            "Sarah Chen",
            "Demo call booked for Thursday.",
            None,
        ),
        (
            "actDemo5",
            ActivityType::FollowUp,
            "recDemoJakeMorris",
            "Jake Morris",
            "Second follow-up attempt; no answer.",
            Some(ActivityOutcome::Negative),
        ),
    ];

    entries
        .into_iter()
        .map(|(id, activity_type, lead_id, lead_name, description, outcome)| Activity {
            id: id.into(),
            activity_type,
            lead_id: lead_id.into(),
            lead_name: Some(lead_name.into()),
            description: description.into(),
            outcome,
            created_at: Some(Utc::now().to_rfc3339()),
        })
        .collect()
}

pub fn seed_calls() -> Vec<Call> {
    vec![
        Call {
            id: "callDemo1".into(),
            lead_id: Some("recDemoSarahChen".into()),
            lead_name: Some("Sarah Chen".into()),
            scheduled_at: Some(Utc::now().to_rfc3339()),
            completed_at: None,
            duration: None,
            outcome: None,
            summary: None,
            status: CallStatus::Scheduled,
        },
        Call {
            id: "callDemo2".into(),
            lead_id: Some("recDemoMarcusWebb".into()),
            lead_name: Some("Marcus Webb".into()),
            scheduled_at: Some(Utc::now().to_rfc3339()),
            completed_at: Some(Utc::now().to_rfc3339()),
            duration: Some(312),
            outcome: Some("interested".into()),
            summary: Some(
                "Discussed current tooling and agreed to a technical deep-dive next week.".into(),
            ),
            status: CallStatus::Completed,
        },
        Call {
            id: "callDemo3".into(),
            lead_id: Some("recDemoJakeMorris".into()),
            lead_name: Some("Jake Morris".into()),
            scheduled_at: Some(Utc::now().to_rfc3339()),
            completed_at: None,
            duration: None,
            outcome: None,
            summary: None,
            status: CallStatus::NoAnswer,
        },
    ]
}
