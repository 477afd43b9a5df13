use std::sync::Arc;

use crate::calls::Telephony;
use crate::config::AppConfig;
use crate::llm::Classifier;
use crate::store::RecordStore;
use crate::workflows::WorkflowDispatcher;

/// Shared application state. The collaborator strategy (live vendors or demo
/// fixtures) is decided once when this is built; handlers never re-read the
/// environment.
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn RecordStore>,
    pub classifier: Option<Arc<dyn Classifier>>,
    pub telephony: Option<Arc<dyn Telephony>>,
    pub workflows: Arc<WorkflowDispatcher>,
}
