use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::leads::Lead;
use crate::scoring::ScoreLabel;

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("classifier request failed: {0}")]
    Upstream(String),
    #[error("failed to parse classifier response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ClassifierError {
    fn from(e: reqwest::Error) -> Self {
        Self::Upstream(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutreachChannel {
    Email,
    Linkedin,
    Sms,
}

impl OutreachChannel {
    /// Body-only length ceiling per channel, in characters.
    pub fn max_body_chars(&self) -> usize {
        match self {
            Self::Email => 500,
            Self::Linkedin => 300,
            Self::Sms => 160,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Linkedin => "linkedin",
            Self::Sms => "sms",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutreachTone {
    Professional,
    Casual,
    Friendly,
}

impl OutreachTone {
    fn description(&self) -> &'static str {
        match self {
            Self::Professional => "formal, business-appropriate, and authoritative",
            Self::Casual => "relaxed, conversational, and approachable",
            Self::Friendly => "warm, personable, and enthusiastic",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub score: u8,
    pub score_label: ScoreLabel,
    pub insights: String,
    pub key_strengths: Vec<String>,
    pub concerns: Vec<String>,
    pub suggested_next_step: String,
}

#[derive(Debug, Clone)]
pub struct Outreach {
    pub subject: Option<String>,
    pub message: String,
}

/// Seam for the LLM-backed scoring and copy-generation collaborator.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn score_lead(&self, lead: &Lead) -> Result<ScoreResult, ClassifierError>;

    async fn generate_outreach(
        &self,
        lead: &Lead,
        channel: OutreachChannel,
        tone: OutreachTone,
    ) -> Result<Outreach, ClassifierError>;
}

const SCORING_SYSTEM_PROMPT: &str = r#"You are an expert B2B sales lead scoring assistant. Analyze the provided lead information and return a JSON object with the following fields:
- score: number between 0-100
- insights: 2-3 sentence analysis of the lead quality
- keyStrengths: array of 2-4 specific strengths
- concerns: array of 0-3 specific concerns
- suggestedNextStep: one specific actionable recommendation

Scoring criteria (weight each appropriately):
1. Title/Seniority: C-suite/VP (30pts), Director (20pts), Manager (10pts), Individual (5pts)
2. Company: Enterprise 500+ (25pts), Mid-market (15pts), Small business (10pts), No company/Freelance (2pts)
3. Lead Source: Referral (20pts), Event (15pts), LinkedIn (12pts), Website (10pts), Cold Outreach (5pts)
4. Email Domain: Corporate (15pts), Personal/Gmail etc (3pts)
5. Profile Completeness: Full profile (10pts), Partial (5pts), Minimal (2pts)

Return ONLY valid JSON, no other text."#;

fn lead_summary(lead: &Lead) -> String {
    format!(
        "Lead Information:\n\
         - Name: {}\n\
         - Email: {}\n\
         - Company: {}\n\
         - Title: {}\n\
         - Phone: {}\n\
         - LinkedIn: {}\n\
         - Lead Source: {}\n\
         - Notes: {}",
        lead.name,
        lead.email,
        lead.company.as_deref().unwrap_or("Not provided"),
        lead.title.as_deref().unwrap_or("Not provided"),
        lead.phone.as_deref().unwrap_or("Not provided"),
        lead.linkedin_url.as_deref().unwrap_or("Not provided"),
        lead.lead_source
            .map(|s| s.as_str())
            .unwrap_or("Not provided"),
        lead.notes.as_deref().unwrap_or("None"),
    )
}

fn outreach_context(lead: &Lead) -> String {
    format!(
        "Lead Information:\n\
         - Name: {}\n\
         - Company: {}\n\
         - Title: {}\n\
         - Lead Source: {}\n\
         - AI Insights: {}\n\
         - Key Strengths: {}\n\
         - Suggested Next Step: {}",
        lead.name,
        lead.company.as_deref().unwrap_or("Unknown"),
        lead.title.as_deref().unwrap_or("Unknown"),
        lead.lead_source.map(|s| s.as_str()).unwrap_or("Unknown"),
        lead.ai_insights.as_deref().unwrap_or("No insights available"),
        lead.key_strengths
            .as_ref()
            .map(|s| s.join(", "))
            .unwrap_or_else(|| "Unknown".into()),
        lead.suggested_next_step
            .as_deref()
            .unwrap_or("General follow-up"),
    )
}

fn channel_instructions(channel: OutreachChannel) -> &'static str {
    match channel {
        OutreachChannel::Email => {
            "Write a personalized sales email. Include a subject line on the first line prefixed \
             with \"Subject: \". The email should have a greeting, body, and sign-off."
        }
        OutreachChannel::Linkedin => {
            "Write a LinkedIn connection request message or InMail. Keep it concise and \
             networking-focused. No subject line needed."
        }
        OutreachChannel::Sms => {
            "Write a brief, impactful SMS message. Must be under 160 characters. No \
             greeting/sign-off needed, just the core message."
        }
    }
}

/// Extracts the first `{...}` span from model output. LLMs occasionally wrap
/// JSON in prose or fences even when told not to.
fn extract_json_object(content: &str) -> Result<&str, ClassifierError> {
    let start = content
        .find('{')
        .ok_or_else(|| ClassifierError::Parse("no JSON object in response".into()))?;
    let end = content
        .rfind('}')
        .ok_or_else(|| ClassifierError::Parse("no JSON object in response".into()))?;
    Ok(&content[start..=end])
}

/// Strips the quote characters LLMs sometimes wrap around string values.
fn strip_wrapping_quotes(value: &str) -> String {
    value
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}

fn clean_value(value: &Value) -> String {
    match value {
        Value::String(s) => strip_wrapping_quotes(s),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn clean_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().map(clean_value).collect())
        .unwrap_or_default()
}

pub(crate) fn parse_score_response(content: &str) -> Result<ScoreResult, ClassifierError> {
    let raw: Value = serde_json::from_str(extract_json_object(content)?)
        .map_err(|e| ClassifierError::Parse(e.to_string()))?;

    let score = raw
        .get("score")
        .and_then(Value::as_f64)
        .ok_or_else(|| ClassifierError::Parse("score field missing".into()))?;
    let score = score.clamp(0.0, 100.0).round() as u8;

    let suggested = clean_value(raw.get("suggestedNextStep").unwrap_or(&Value::Null));
    Ok(ScoreResult {
        score,
        score_label: ScoreLabel::from_score(score),
        insights: clean_value(raw.get("insights").unwrap_or(&Value::Null)),
        key_strengths: clean_list(raw.get("keyStrengths")),
        concerns: clean_list(raw.get("concerns")),
        suggested_next_step: if suggested.is_empty() {
            "Follow up with more information".into()
        } else {
            suggested
        },
    })
}

fn truncate_chars(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        value.to_string()
    } else {
        value.chars().take(max).collect()
    }
}

/// Splits an email's `Subject:` first line off the body and enforces the
/// channel's body length ceiling as a safety net over the prompt contract.
pub(crate) fn parse_outreach_response(content: &str, channel: OutreachChannel) -> Outreach {
    let mut subject = None;
    let mut message = content.trim().to_string();

    if channel == OutreachChannel::Email {
        if let Some(line) = message.lines().find(|l| l.trim_start().starts_with("Subject:")) {
            let raw = line.trim_start();
            subject = Some(raw["Subject:".len()..].trim().to_string());
            let remaining: Vec<&str> = message
                .lines()
                .filter(|l| !l.trim_start().starts_with("Subject:"))
                .collect();
            message = remaining.join("\n").trim().to_string();
        }
    }

    Outreach {
        subject,
        message: truncate_chars(&message, channel.max_body_chars()),
    }
}

/// OpenAI-compatible chat-completions client.
pub struct OpenAiClassifier {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiClassifier {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    async fn chat(&self, system: &str, user: &str) -> Result<String, ClassifierError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "model": self.model,
                "temperature": 0.3,
                "messages": [
                    {"role": "system", "content": system},
                    {"role": "user", "content": user}
                ]
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Upstream(format!(
                "chat completion returned {status}: {body}"
            )));
        }

        let result: Value = response.json().await?;
        let content = result["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();
        Ok(content)
    }
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    async fn score_lead(&self, lead: &Lead) -> Result<ScoreResult, ClassifierError> {
        let content = self.chat(SCORING_SYSTEM_PROMPT, &lead_summary(lead)).await?;
        parse_score_response(&content)
    }

    async fn generate_outreach(
        &self,
        lead: &Lead,
        channel: OutreachChannel,
        tone: OutreachTone,
    ) -> Result<Outreach, ClassifierError> {
        let system = format!(
            "You are an expert sales copywriter. Generate a {} message for a sales outreach.\n\n\
             {}\n\n\
             Tone: {}\n\
             Maximum length: {} characters (for the body, excluding subject line)\n\n\
             Personalize the message based on the lead's information. Reference their role, \
             company, or any relevant details. Make it feel genuine, not templated.\n\n\
             If the lead has AI insights, use them to inform the message angle.",
            channel.as_str(),
            channel_instructions(channel),
            tone.description(),
            channel.max_body_chars(),
        );

        let content = self.chat(&system, &outreach_context(lead)).await?;
        Ok(parse_outreach_response(&content, channel))
    }
}

/// Fixture classifier used when no LLM credentials are configured.
pub struct DemoClassifier;

#[async_trait]
impl Classifier for DemoClassifier {
    async fn score_lead(&self, lead: &Lead) -> Result<ScoreResult, ClassifierError> {
        let score: u8 = rand::rng().random_range(30..90);
        let label = ScoreLabel::from_score(score);
        let potential = match label {
            ScoreLabel::Hot => "strong",
            ScoreLabel::Warm => "moderate",
            ScoreLabel::Cold => "limited",
        };
        let role = lead
            .title
            .as_deref()
            .map(|t| format!("Their role as {t}"))
            .unwrap_or_else(|| "Their profile".into());
        let company = lead.company.as_deref().unwrap_or("their organization");

        Ok(ScoreResult {
            score,
            score_label: label,
            insights: format!(
                "{} shows {potential} potential based on updated analysis. {role} at {company} \
                 indicates {} in the buying process.",
                lead.name,
                if score >= 70 {
                    "high buying authority"
                } else {
                    "some influence"
                },
            ),
            key_strengths: lead
                .key_strengths
                .clone()
                .unwrap_or_else(|| vec!["Profile data available".into()]),
            concerns: lead
                .concerns
                .clone()
                .unwrap_or_else(|| vec!["Needs further qualification".into()]),
            suggested_next_step: if score >= 70 {
                "Schedule a demo call this week".into()
            } else {
                "Send educational content and follow up in 5 days".into()
            },
        })
    }

    async fn generate_outreach(
        &self,
        lead: &Lead,
        channel: OutreachChannel,
        _tone: OutreachTone,
    ) -> Result<Outreach, ClassifierError> {
        let first_name = lead.name.split_whitespace().next().unwrap_or(&lead.name);
        let company = lead.company.as_deref();

        let outreach = match channel {
            OutreachChannel::Email => Outreach {
                subject: Some(format!(
                    "Quick question about {} workflow",
                    company.unwrap_or("your")
                )),
                message: format!(
                    "Hi {first_name},\n\nI noticed {} in a great position to leverage AI \
                     automation for your business processes.\n\nI'd love to share how our \
                     platform could help streamline your operations.\n\nWould you have 15 \
                     minutes this week for a quick chat?\n\nBest regards,\nSarah",
                    company
                        .map(|c| format!("{c} is"))
                        .unwrap_or_else(|| "you're".into()),
                ),
            },
            OutreachChannel::Linkedin => Outreach {
                subject: None,
                message: format!(
                    "Hi {first_name}, I came across your profile{} - impressive! I'm working on \
                     AI-powered sales automation and think it could be valuable for your work. \
                     Would love to connect and share some insights. No pitch, just genuine \
                     conversation.",
                    company
                        .map(|c| format!(" and {c}'s work"))
                        .unwrap_or_default(),
                ),
            },
            OutreachChannel::Sms => Outreach {
                subject: None,
                message: format!(
                    "Hi {first_name}, Sarah from SalesAI here. Quick Q: is {} exploring AI \
                     automation? Happy to share a relevant case study.",
                    company.unwrap_or("your team"),
                ),
            },
        };

        Ok(Outreach {
            subject: outreach.subject,
            message: truncate_chars(&outreach.message, channel.max_body_chars()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_json_response() {
        let content = r#"{"score": 82, "insights": "Strong lead.", "keyStrengths": ["VP title"], "concerns": [], "suggestedNextStep": "Book a demo"}"#;
        let result = parse_score_response(content).unwrap();
        assert_eq!(result.score, 82);
        assert_eq!(result.score_label, ScoreLabel::Hot);
        assert_eq!(result.key_strengths, vec!["VP title"]);
        assert_eq!(result.suggested_next_step, "Book a demo");
    }

    #[test]
    fn parses_json_wrapped_in_prose() {
        let content = "Here is the analysis:\n```json\n{\"score\": 45, \"insights\": \"ok\", \"keyStrengths\": [], \"concerns\": [\"small company\"], \"suggestedNextStep\": \"Follow up\"}\n```";
        let result = parse_score_response(content).unwrap();
        assert_eq!(result.score, 45);
        assert_eq!(result.score_label, ScoreLabel::Warm);
    }

    #[test]
    fn clamps_out_of_range_scores() {
        let content = r#"{"score": 140, "insights": "x", "keyStrengths": [], "concerns": [], "suggestedNextStep": "y"}"#;
        assert_eq!(parse_score_response(content).unwrap().score, 100);

        let content = r#"{"score": -3, "insights": "x", "keyStrengths": [], "concerns": [], "suggestedNextStep": "y"}"#;
        let result = parse_score_response(content).unwrap();
        assert_eq!(result.score, 0);
        assert_eq!(result.score_label, ScoreLabel::Cold);
    }

    #[test]
    fn strips_quotes_wrapped_around_values() {
        let content = r#"{"score": 60, "insights": "\"Quoted insight\"", "keyStrengths": ["'VP'"], "concerns": [], "suggestedNextStep": ""}"#;
        let result = parse_score_response(content).unwrap();
        assert_eq!(result.insights, "Quoted insight");
        assert_eq!(result.key_strengths, vec!["VP"]);
        assert_eq!(result.suggested_next_step, "Follow up with more information");
    }

    #[test]
    fn label_always_derived_from_score_not_model() {
        let content = r#"{"score": 20, "scoreLabel": "Hot", "insights": "x", "keyStrengths": [], "concerns": [], "suggestedNextStep": "y"}"#;
        let result = parse_score_response(content).unwrap();
        assert_eq!(result.score_label, ScoreLabel::Cold);
    }

    #[test]
    fn rejects_response_without_json() {
        assert!(parse_score_response("no json here").is_err());
    }

    #[test]
    fn email_subject_line_is_split_off() {
        let content = "Subject: Let's talk\n\nHi Ada,\n\nShort body.\n\nBest,\nSarah";
        let outreach = parse_outreach_response(content, OutreachChannel::Email);
        assert_eq!(outreach.subject.as_deref(), Some("Let's talk"));
        assert!(outreach.message.starts_with("Hi Ada"));
        assert!(!outreach.message.contains("Subject:"));
    }

    #[test]
    fn non_email_channels_have_no_subject() {
        let outreach = parse_outreach_response("Quick note", OutreachChannel::Sms);
        assert!(outreach.subject.is_none());
        assert_eq!(outreach.message, "Quick note");
    }

    #[test]
    fn body_is_truncated_at_channel_ceiling() {
        let long = "x".repeat(1000);
        let outreach = parse_outreach_response(&long, OutreachChannel::Sms);
        assert_eq!(outreach.message.chars().count(), 160);

        let outreach = parse_outreach_response(&long, OutreachChannel::Linkedin);
        assert_eq!(outreach.message.chars().count(), 300);
    }

    #[tokio::test]
    async fn demo_classifier_is_internally_consistent() {
        let lead = Lead {
            id: "rec".into(),
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            phone: None,
            company: Some("Analytical Engines".into()),
            title: None,
            linkedin_url: None,
            lead_source: None,
            status: crate::leads::LeadStatus::New,
            ai_score: None,
            ai_score_label: None,
            ai_insights: None,
            key_strengths: None,
            concerns: None,
            suggested_next_step: None,
            last_contacted: None,
            next_follow_up: None,
            notes: None,
            call_status: None,
            call_summary: None,
            created_at: None,
        };

        for _ in 0..20 {
            let result = DemoClassifier.score_lead(&lead).await.unwrap();
            assert!((30..90).contains(&result.score));
            assert_eq!(result.score_label, ScoreLabel::from_score(result.score));
        }

        let sms = DemoClassifier
            .generate_outreach(&lead, OutreachChannel::Sms, OutreachTone::Casual)
            .await
            .unwrap();
        assert!(sms.message.chars().count() <= 160);
    }
}
