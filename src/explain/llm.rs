//! LLM-backed explanations
//!
//! The model only narrates a decision that has already been made. Both
//! Anthropic-style and OpenAI-compatible endpoints are spoken through one
//! request path; the format decides the body shape, the auth header and
//! where the text sits in the reply.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::error::{Result, RivalError};
use crate::evaluator::reasoning::mood_label;
use crate::explain::{ExplanationRequest, Explainer};

const SYSTEM_PROMPT: &str = "You narrate the reasoning of a computer opponent in a \
    board game about buying property. Explain the given decision in one or two short \
    sentences, in character. Do not suggest a different action.";

const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Sentences kept from the model's answer
const MAX_SENTENCES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFormat {
    Anthropic,
    OpenAI,
}

impl ApiFormat {
    pub fn detect(url: &str) -> Self {
        if url.contains("anthropic.com") {
            ApiFormat::Anthropic
        } else {
            ApiFormat::OpenAI
        }
    }

    /// Request body for one narration prompt
    pub fn body(&self, model: &str, max_tokens: u32, prompt: &str) -> Value {
        match self {
            ApiFormat::Anthropic => json!({
                "model": model,
                "max_tokens": max_tokens,
                "system": SYSTEM_PROMPT,
                "messages": [{ "role": "user", "content": prompt }],
            }),
            ApiFormat::OpenAI => json!({
                "model": model,
                "max_tokens": max_tokens,
                "messages": [
                    { "role": "system", "content": SYSTEM_PROMPT },
                    { "role": "user", "content": prompt },
                ],
            }),
        }
    }

    /// Narration text inside a successful reply
    pub fn extract<'a>(&self, reply: &'a Value) -> Option<&'a str> {
        let pointer = match self {
            ApiFormat::Anthropic => "/content/0/text",
            ApiFormat::OpenAI => "/choices/0/message/content",
        };
        reply.pointer(pointer).and_then(Value::as_str)
    }
}

/// Endpoint settings for [`LlmExplainer`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    pub api_key: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Short answers keep the call inside the explanation timeout
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_tokens() -> u32 {
    160
}

impl LlmSettings {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_url: default_api_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
        }
    }

    /// Required: LLM_API_KEY. Optional: LLM_API_URL, LLM_MODEL
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| RivalError::ExplanationFailure("LLM_API_KEY not set".into()))?;
        let mut settings = Self::new(&api_key);
        if let Ok(url) = std::env::var("LLM_API_URL") {
            settings.api_url = url;
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            settings.model = model;
        }
        Ok(settings)
    }
}

pub struct LlmExplainer {
    client: Client,
    settings: LlmSettings,
    format: ApiFormat,
}

impl LlmExplainer {
    pub fn new(settings: LlmSettings) -> Self {
        Self {
            client: Client::new(),
            format: ApiFormat::detect(&settings.api_url),
            settings,
        }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(LlmSettings::from_env()?))
    }

    pub fn api_format(&self) -> ApiFormat {
        self.format
    }

    /// Facts handed to the model
    pub fn build_prompt(request: &ExplanationRequest<'_>) -> String {
        let decision = request.decision;
        let analysis = request.analysis;
        let mut prompt = format!(
            "Opponent: {}\nStrategy: {}\nMood: {}\nGame phase: {} (turn {}, {} turns left)\n\
             Cash: {:.0}, net worth {:.0}, money rank {} of {}\n\
             Decision: {} (confidence {:.2})\nEngine reasoning: {}\n",
            request.opponent.name,
            request.opponent.strategy.name(),
            mood_label(request.opponent.emotion.mood),
            analysis.phase.name(),
            request.game.turn,
            analysis.turns_remaining,
            analysis.economics.cash,
            analysis.economics.net_worth,
            analysis.economics.money_rank,
            analysis.player_count(),
            decision.action_type(),
            decision.confidence,
            decision.reasoning,
        );
        for threat in analysis.threats.iter().take(2) {
            prompt.push_str(&format!("Threat: {}\n", threat.description));
        }
        for opportunity in analysis.opportunities.iter().take(2) {
            prompt.push_str(&format!("Opportunity: {}\n", opportunity.description));
        }
        if let Some(alternative) = decision.alternatives.first() {
            prompt.push_str(&format!(
                "Runner-up: {} at {:.2}\n",
                alternative.action_type(),
                alternative.score
            ));
        }
        prompt
    }

    async fn post(&self, body: &Value) -> Result<Value> {
        let request = self.client.post(&self.settings.api_url).json(body);
        let request = match self.format {
            ApiFormat::Anthropic => request
                .header("x-api-key", &self.settings.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION),
            ApiFormat::OpenAI => request.bearer_auth(&self.settings.api_key),
        };

        let response = request
            .send()
            .await
            .map_err(|e| RivalError::ExplanationFailure(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(RivalError::ExplanationFailure(format!(
                "{} answered {}",
                self.settings.api_url, status
            )));
        }
        response
            .json()
            .await
            .map_err(|e| RivalError::ExplanationFailure(e.to_string()))
    }
}

/// Collapse whitespace, drop wrapping quotes and keep the first sentences
pub fn tidy(text: &str) -> Option<String> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let unquoted = collapsed.trim_matches(|c: char| c == '"' || c == '\'').trim();
    if unquoted.is_empty() {
        return None;
    }

    let mut end = unquoted.len();
    let mut sentences = 0;
    for (i, c) in unquoted.char_indices() {
        if matches!(c, '.' | '!' | '?') {
            sentences += 1;
            if sentences == MAX_SENTENCES {
                end = i + c.len_utf8();
                break;
            }
        }
    }
    Some(unquoted[..end].to_string())
}

#[async_trait]
impl Explainer for LlmExplainer {
    async fn explain(&self, request: &ExplanationRequest<'_>) -> Result<String> {
        let prompt = Self::build_prompt(request);
        let body = self
            .format
            .body(&self.settings.model, self.settings.max_tokens, &prompt);
        let reply = self.post(&body).await?;
        self.format
            .extract(&reply)
            .and_then(tidy)
            .ok_or_else(|| RivalError::ExplanationFailure("blank explanation".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::core::types::PlayerId;
    use crate::evaluator::{analyze_situation, DecisionResult};
    use crate::game::{GameState, PlayerSnapshot};
    use crate::opponent::{Difficulty, OpponentState, Personality};

    #[test]
    fn test_format_detection() {
        assert_eq!(
            ApiFormat::detect("https://api.anthropic.com/v1/messages"),
            ApiFormat::Anthropic
        );
        assert_eq!(
            ApiFormat::detect("https://api.deepseek.com/chat/completions"),
            ApiFormat::OpenAI
        );
    }

    #[test]
    fn test_body_places_system_prompt_per_format() {
        let anthropic = ApiFormat::Anthropic.body("m", 64, "why?");
        assert_eq!(anthropic["system"], SYSTEM_PROMPT);
        assert_eq!(anthropic["messages"][0]["content"], "why?");

        let openai = ApiFormat::OpenAI.body("m", 64, "why?");
        assert!(openai.get("system").is_none());
        assert_eq!(openai["messages"][0]["role"], "system");
        assert_eq!(openai["messages"][1]["content"], "why?");
    }

    #[test]
    fn test_extract_reads_each_reply_shape() {
        let anthropic = json!({ "content": [{ "type": "text", "text": "Buying now." }] });
        assert_eq!(ApiFormat::Anthropic.extract(&anthropic), Some("Buying now."));

        let openai = json!({ "choices": [{ "message": { "content": "Holding cash." } }] });
        assert_eq!(ApiFormat::OpenAI.extract(&openai), Some("Holding cash."));
        assert_eq!(ApiFormat::OpenAI.extract(&anthropic), None);
    }

    #[test]
    fn test_tidy_keeps_two_sentences() {
        assert_eq!(
            tidy("  \"Jade is cheap.  I want the set! Rivals are broke. Ha.\"  ").as_deref(),
            Some("Jade is cheap. I want the set!")
        );
        assert_eq!(tidy("no full stop").as_deref(), Some("no full stop"));
        assert_eq!(tidy(" \"\" "), None);
    }

    #[test]
    fn test_prompt_carries_decision() {
        let me = PlayerId::new();
        let game = GameState::builder("g")
            .player(PlayerSnapshot::new(me, "Lin", 800.0))
            .board_len(10)
            .build();
        let opponent = OpponentState::new(
            me,
            "Lin",
            Personality::default(),
            Difficulty::Normal,
            &EngineConfig::default(),
        );
        let analysis = analyze_situation(&game, me).expect("analysis");
        let decision = DecisionResult::fallback(me, "test");
        let prompt = LlmExplainer::build_prompt(&ExplanationRequest {
            opponent: &opponent,
            decision: &decision,
            game: &game,
            analysis: &analysis,
        });
        assert!(prompt.contains("Opponent: Lin"));
        assert!(prompt.contains("Decision: end_turn"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_explanation_failure() {
        let explainer = LlmExplainer::new(LlmSettings {
            api_url: "http://127.0.0.1:9/v1/chat".into(),
            ..LlmSettings::new("key")
        });
        assert_eq!(explainer.api_format(), ApiFormat::OpenAI);
        let result = explainer.post(&json!({})).await;
        assert!(matches!(result, Err(RivalError::ExplanationFailure(_))));
    }
}
