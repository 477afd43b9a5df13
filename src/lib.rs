pub mod activities;
pub mod analytics;
pub mod api_router;
pub mod calls;
pub mod config;
pub mod leads;
pub mod llm;
pub mod scoring;
pub mod shared;
pub mod store;
pub mod workflows;

use std::sync::Arc;

use crate::calls::{DemoTelephony, Telephony, VapiClient};
use crate::config::AppConfig;
use crate::llm::{Classifier, DemoClassifier, OpenAiClassifier};
use crate::shared::state::AppState;
use crate::store::{AirtableStore, DemoStore, RecordStore};
use crate::workflows::WorkflowDispatcher;

/// Builds the collaborator strategy from configuration. Live clients are
/// used where credentials exist; otherwise the demo fixtures stand in. This
/// is the only place the demo/live decision is made.
pub fn build_state(config: AppConfig) -> Arc<AppState> {
    let store: Arc<dyn RecordStore> = if config.demo_mode {
        Arc::new(DemoStore::new())
    } else {
        // demo_mode is forced on when either credential is missing, so both
        // are present here.
        Arc::new(AirtableStore::new(
            config.airtable.api_key.clone().unwrap_or_default(),
            config.airtable.base_id.clone().unwrap_or_default(),
        ))
    };

    let classifier: Option<Arc<dyn Classifier>> = if config.demo_mode {
        Some(Arc::new(DemoClassifier))
    } else {
        config.openai.api_key.clone().map(|key| {
            Arc::new(OpenAiClassifier::new(key, config.openai.model.clone()))
                as Arc<dyn Classifier>
        })
    };

    let telephony: Option<Arc<dyn Telephony>> = if config.demo_mode {
        Some(Arc::new(DemoTelephony))
    } else {
        match (
            config.vapi.api_key.clone(),
            config.vapi.assistant_id.clone(),
        ) {
            (Some(key), Some(assistant)) => {
                Some(Arc::new(VapiClient::new(key, assistant)) as Arc<dyn Telephony>)
            }
            _ => None,
        }
    };

    let workflows = Arc::new(WorkflowDispatcher::new(
        config.workflows.clone(),
        config.demo_mode,
    ));

    Arc::new(AppState {
        config,
        store,
        classifier,
        telephony,
        workflows,
    })
}
