use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::menu::WeeklyMenu;
use crate::settings::{PipelineError, Settings};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatEnvelope {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Last-resort parser: asks a chat-completion model to map free text onto
/// the menu schema.
#[derive(Clone)]
pub struct ModelExtractor {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
    api_key: String,
}

impl ModelExtractor {
    pub fn new(client: Client, settings: &Settings) -> Result<Self, PipelineError> {
        Ok(Self {
            client,
            endpoint: settings.llm_endpoint.clone(),
            model: settings.llm_model.clone(),
            temperature: settings.llm_temperature,
            api_key: settings.require_api_key()?.to_string(),
        })
    }

    /// `Some(empty menu)` when the model found nothing or answered garbage,
    /// `None` when the call itself failed or the service reported an error.
    pub async fn extract(&self, source_text: &str, today: NaiveDate) -> Option<WeeklyMenu> {
        info!("Sending {} chars to {}", source_text.chars().count(), self.model);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system_prompt(today) },
                ChatMessage {
                    role: "user",
                    content: format!("Page or document content:\n\n{}", source_text),
                },
            ],
            temperature: self.temperature,
        };

        let response = match self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!("Model request failed: {}", e);
                return None;
            }
        };
        let status = response.status();
        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                warn!("Reading model response failed: {}", e);
                return None;
            }
        };

        let envelope: ChatEnvelope = match serde_json::from_str(&body) {
            Ok(env) => env,
            Err(e) => {
                warn!("Undecodable model response ({}): {}", status, e);
                return None;
            }
        };
        if let Some(err) = envelope.error {
            error!("Model service error ({}): {}", status, err);
            return None;
        }
        if !status.is_success() {
            warn!("Model service returned {}", status);
            return None;
        }

        let content = envelope
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();
        let menu = parse_completion(&content);
        if menu.is_empty() {
            warn!("Model found no menu in the text");
        } else {
            info!("Model extracted {} days", menu.days.len());
        }
        Some(menu)
    }
}

/// Turn raw completion text into a menu. Fences, prose around the JSON and
/// malformed JSON are all tolerated; the worst case is an empty menu.
pub fn parse_completion(content: &str) -> WeeklyMenu {
    let json = json_span(content);
    match serde_json::from_str::<WeeklyMenu>(&json) {
        Ok(menu) => menu.validated(),
        Err(e) => {
            warn!("Model reply is not menu JSON: {}", e);
            WeeklyMenu::empty()
        }
    }
}

/// Drop code fences, then slice from the first `{` to the last `}`.
fn json_span(content: &str) -> String {
    let unfenced = content.replace("```json", "").replace("```", "");
    let trimmed = unfenced.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => trimmed[start..=end].to_string(),
        _ => trimmed.to_string(),
    }
}

fn system_prompt(today: NaiveDate) -> String {
    format!(
        r#"You extract daily lunch menus from restaurant web pages. The text may be badly formatted: tables flattened into lines, leftovers of navigation, several weeks mixed together.

Today's date (for resolving dates and "today"): {today}

RULES:
1. Look for sections such as "Polední menu", "Denní nabídka", "Menu na týden", "Lunch menu".
2. When rows carry dates (e.g. 22. 1.) or day names (e.g. Pondělí), assign the dishes to the right day.
3. Ignore the permanent menu (burgers, pizza, drinks) unless it is part of the daily lunch section.
4. If a table fell apart into text, put it back together logically.
5. A dish without a stated price gets 0. Never omit a field.
6. Only output dishes that appear in the text. Never invent dishes.

OUTPUT (JSON only):
{{
  "poledni_nabidka": [
    {{
      "den": "Pondělí",
      "polevky": ["Zelňačka"],
      "hlavni_chody": [
        {{"cislo": 1, "nazev": "Guláš s pěti", "popis": "", "cena_bez_polevky": 150, "cena_s_polevkou": 0}}
      ]
    }}
  ]
}}

If there is no menu, return: {{"poledni_nabidka": []}}"#,
        today = today.format("%-d. %-m. %Y")
    )
}
