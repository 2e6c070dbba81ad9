//! Turning a free-text travel request into a start and an end place.
//!
//! Hosted models answer with text that is supposed to be a JSON object but
//! often is not quite one (the T5 tokenizer cannot emit braces), so every
//! model answer goes through [`extract_json`] before its fields are read.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::PlannerSettings;
use crate::error::{QueryError, UpstreamError};
use crate::models::ModelKind;

const T5_MAX_NEW_TOKENS: u32 = 64;

static BARE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([{,]\s*)([A-Za-z_][\w ]*?)\s*:").expect("valid regex"));
static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*([}\]])").expect("valid regex"));
static MISSING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r#""\s+""#).expect("valid regex"));
static BARE_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#":\s*([^"\s{\[][^,}\]]*?)\s*([,}\]])"#).expect("valid regex"));
static FROM_TO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bfrom\s+(.+?)\s+to\s+(.+?)\s*(?:[.,;!?]|\b(?:via|and|with|by|then|stopping)\b|$)",
    )
    .expect("valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TravelIntent {
    pub start: String,
    pub end: String,
}

/// Fix the usual ways model output falls short of JSON.
pub fn repair_json(text: &str) -> String {
    let text = BARE_KEY.replace_all(text, r#"$1"$2":"#);
    let text = text.replace('\'', "\"");
    let text = TRAILING_COMMA.replace_all(&text, "$1");
    let text = MISSING_COMMA.replace_all(&text, r#"", ""#);
    BARE_VALUE
        .replace_all(&text, |caps: &Captures| {
            let value = caps[1].trim();
            if is_json_literal(value) {
                format!(": {value}{}", &caps[2])
            } else {
                format!(": \"{value}\"{}", &caps[2])
            }
        })
        .into_owned()
}

fn is_json_literal(value: &str) -> bool {
    matches!(value, "true" | "false" | "null") || value.parse::<f64>().is_ok()
}

/// Parse model output as a JSON value, closing a missing brace and repairing
/// it when a plain parse fails.
pub fn extract_json(text: &str) -> Result<Value, QueryError> {
    let mut candidate = text.trim().to_string();
    if !candidate.contains('{') {
        candidate.insert(0, '{');
    }
    if !candidate.contains('}') {
        candidate.push('}');
    }

    if let Ok(value) = serde_json::from_str(&candidate) {
        return Ok(value);
    }

    let candidate = candidate.replace("True", "true").replace("False", "false");
    let repaired = repair_json(&candidate);
    serde_json::from_str(&repaired).map_err(|_| {
        tracing::debug!("unrepairable model output: {repaired}");
        QueryError::Unparseable {
            raw: text.to_string(),
        }
    })
}

pub fn intent_from_value(value: &Value) -> Result<TravelIntent, QueryError> {
    let field = |name: &'static str| {
        value
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or(QueryError::MissingField(name))
    };
    Ok(TravelIntent {
        start: field("start")?,
        end: field("end")?,
    })
}

pub fn intent_from_text(text: &str) -> Result<TravelIntent, QueryError> {
    intent_from_value(&extract_json(text)?)
}

/// "... from X to Y ..." without any model.
pub fn parse_with_rules(query: &str) -> Option<TravelIntent> {
    let caps = FROM_TO.captures(query)?;
    let start = caps[1].trim().to_string();
    let end = caps[2].trim().to_string();
    (!start.is_empty() && !end.is_empty()).then_some(TravelIntent { start, end })
}

fn gemini_prompt(query: &str) -> String {
    format!(
        "Extract the start and end locations of the journey in the travel request below. \
         Reply with JSON only, shaped as {{\"start\": \"<place>\", \"end\": \"<place>\"}}, \
         using place names a geocoder can resolve.\n\nRequest: {query}"
    )
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum T5Response {
    Batch(Vec<T5Generation>),
    Single(T5Generation),
}

#[derive(Debug, Deserialize)]
struct T5Generation {
    generated_text: String,
}

impl T5Response {
    fn into_text(self) -> Option<String> {
        match self {
            T5Response::Batch(batch) => batch.into_iter().next().map(|g| g.generated_text),
            T5Response::Single(single) => Some(single.generated_text),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

impl GeminiResponse {
    fn into_text(self) -> Option<String> {
        let candidate = self.candidates.into_iter().next()?;
        let text: String = candidate
            .content
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

/// Calls the selected hosted model and reads a [`TravelIntent`] out of its
/// answer.
pub struct QueryInterpreter {
    http: reqwest::Client,
    t5_url: Option<String>,
    t5_token: Option<String>,
    gemini_url: String,
    gemini_api_key: Option<String>,
    gemini_model: String,
}

impl QueryInterpreter {
    pub fn new(http: reqwest::Client, settings: &PlannerSettings) -> Self {
        Self {
            http,
            t5_url: settings.t5_url.clone(),
            t5_token: settings.t5_token.clone(),
            gemini_url: settings.gemini_url.trim_end_matches('/').to_string(),
            gemini_api_key: settings.gemini_api_key.clone(),
            gemini_model: settings.gemini_model.clone(),
        }
    }

    pub async fn interpret(&self, query: &str, model: ModelKind) -> Result<TravelIntent, QueryError> {
        let text = match model {
            ModelKind::Rules => return rules_or_unparseable(query),
            ModelKind::T5 => match &self.t5_url {
                Some(url) => self.generate_t5(url, query).await?,
                None => {
                    tracing::warn!("no T5 endpoint configured, falling back to rules");
                    return rules_or_unparseable(query);
                }
            },
            ModelKind::Gemini => match &self.gemini_api_key {
                Some(key) => self.generate_gemini(key, query).await?,
                None => {
                    tracing::warn!("no Gemini API key configured, falling back to rules");
                    return rules_or_unparseable(query);
                }
            },
        };

        tracing::debug!("{model} answered: {text}");
        intent_from_text(&text)
    }

    async fn generate_t5(&self, url: &str, query: &str) -> Result<String, UpstreamError> {
        const SERVICE: &str = "t5";
        let mut request = self.http.post(url).json(&json!({
            "inputs": query,
            "parameters": { "max_new_tokens": T5_MAX_NEW_TOKENS },
        }));
        if let Some(token) = &self.t5_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(UpstreamError::http(SERVICE))?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                service: SERVICE,
                status,
            });
        }
        let body: T5Response = response.json().await.map_err(UpstreamError::http(SERVICE))?;
        body.into_text().ok_or(UpstreamError::Payload {
            service: SERVICE,
            message: "no generation in response".into(),
        })
    }

    async fn generate_gemini(&self, key: &str, query: &str) -> Result<String, UpstreamError> {
        const SERVICE: &str = "gemini";
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.gemini_url, self.gemini_model
        );
        let response = self
            .http
            .post(url)
            .query(&[("key", key)])
            .json(&json!({
                "contents": [{ "parts": [{ "text": gemini_prompt(query) }] }],
                "generationConfig": {
                    "temperature": 0,
                    "responseMimeType": "application/json",
                },
            }))
            .send()
            .await
            .map_err(UpstreamError::http(SERVICE))?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                service: SERVICE,
                status,
            });
        }
        let body: GeminiResponse = response.json().await.map_err(UpstreamError::http(SERVICE))?;
        body.into_text().ok_or(UpstreamError::Payload {
            service: SERVICE,
            message: "no candidate text in response".into(),
        })
    }
}

fn rules_or_unparseable(query: &str) -> Result<TravelIntent, QueryError> {
    parse_with_rules(query).ok_or_else(|| QueryError::Unparseable {
        raw: query.to_string(),
    })
}
