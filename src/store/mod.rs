use async_trait::async_trait;

use crate::activities::{Activity, NewActivity};
use crate::leads::{Lead, LeadFilter, LeadPatch, NewLead};

pub mod airtable;
pub mod demo;

pub use airtable::AirtableStore;
pub use demo::DemoStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("record store request failed: {0}")]
    Upstream(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        Self::Upstream(e.to_string())
    }
}

/// Seam for the external system of record. Field-level mapping between the
/// domain model and the store's named columns lives behind this trait.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>, StoreError>;

    async fn get_lead(&self, id: &str) -> Result<Lead, StoreError>;

    async fn create_lead(&self, data: &NewLead) -> Result<Lead, StoreError>;

    async fn update_lead(&self, id: &str, patch: &LeadPatch) -> Result<Lead, StoreError>;

    async fn delete_lead(&self, id: &str) -> Result<(), StoreError>;

    async fn list_activities(&self, lead_id: Option<&str>) -> Result<Vec<Activity>, StoreError>;

    async fn create_activity(&self, data: &NewActivity) -> Result<Activity, StoreError>;
}
