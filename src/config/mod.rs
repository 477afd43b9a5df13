#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub demo_mode: bool,
    pub airtable: AirtableConfig,
    pub openai: OpenAiConfig,
    pub vapi: VapiConfig,
    pub workflows: WorkflowConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct AirtableConfig {
    pub api_key: Option<String>,
    pub base_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct VapiConfig {
    pub api_key: Option<String>,
    pub assistant_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub hot_lead_webhook: Option<String>,
    pub cold_lead_webhook: Option<String>,
    pub call_completed_webhook: Option<String>,
    pub webhook_secret: Option<String>,
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    /// Reads the full configuration from the environment. Called exactly once
    /// at startup; the resulting strategy objects are passed to handlers
    /// explicitly.
    pub fn from_env() -> Self {
        let airtable = AirtableConfig {
            api_key: env_opt("AIRTABLE_API_KEY"),
            base_id: env_opt("AIRTABLE_BASE_ID"),
        };

        // Demo mode is either explicit or forced by missing record-store
        // credentials.
        let demo_mode = env_opt("DEMO_MODE")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
            || airtable.api_key.is_none()
            || airtable.base_id.is_none();

        Self {
            server: ServerConfig {
                host: env_opt("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
                port: env_opt("SERVER_PORT")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8080),
            },
            demo_mode,
            airtable,
            openai: OpenAiConfig {
                api_key: env_opt("OPENAI_API_KEY"),
                model: env_opt("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            },
            vapi: VapiConfig {
                api_key: env_opt("VAPI_API_KEY"),
                assistant_id: env_opt("VAPI_ASSISTANT_ID"),
            },
            workflows: WorkflowConfig {
                hot_lead_webhook: env_opt("N8N_HOT_LEAD_WEBHOOK"),
                cold_lead_webhook: env_opt("N8N_COLD_LEAD_WEBHOOK"),
                call_completed_webhook: env_opt("N8N_CALL_COMPLETED_WEBHOOK"),
                webhook_secret: env_opt("N8N_WEBHOOK_SECRET"),
            },
        }
    }
}
