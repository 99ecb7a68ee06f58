//! Gemini gateway: builds the vision prompt, posts it to `generateContent`
//! over REST and digs the first JSON object out of the reply text.
//!
//! The gateway never substitutes a mock result itself. Every failure mode is
//! a typed [`GatewayError`] and the orchestrator in the parent module decides
//! what happens next, so "who answered this request" stays observable in one
//! place.

use std::time::Duration;

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::types::AnalysisRequest;
use crate::config::GeminiConfig;

/// Harm categories relaxed to BLOCK_NONE. Civic reports legitimately show
/// carcasses, sewage and accident scenes, which default thresholds tend to
/// refuse.
const RELAXED_HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gemini request failed: {0}")]
    Request(reqwest::Error),
    #[error("gemini call timed out")]
    Timeout,
    #[error("gemini returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("gemini reply was empty or blocked")]
    EmptyReply,
    #[error("no JSON object in the gemini reply")]
    Unparseable,
}

impl GatewayError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Request(err)
        }
    }
}

pub struct GeminiClient {
    http: reqwest::Client,
    cfg: GeminiConfig,
}

impl GeminiClient {
    pub fn new(cfg: GeminiConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("civic-issue-analyzer/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(cfg.timeout)
            .build()
            .expect("reqwest client");
        Self { http, cfg }
    }

    /// One full round trip: prompt + inline image out, parsed JSON object
    /// back. The image payload is forwarded untouched, whatever its size.
    pub async fn call_model(&self, req: &AnalysisRequest) -> Result<Value, GatewayError> {
        #[derive(Serialize)]
        struct InlineData<'a> {
            mime_type: &'a str,
            data: &'a str,
        }
        #[derive(Serialize)]
        #[serde(untagged)]
        enum Part<'a> {
            Text { text: &'a str },
            Inline { inline_data: InlineData<'a> },
        }
        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }
        #[derive(Serialize)]
        struct GenRequest<'a> {
            contents: [Content<'a>; 1],
            #[serde(rename = "safetySettings")]
            safety_settings: Vec<SafetySetting>,
        }
        #[derive(Deserialize)]
        struct GenResponse {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            #[serde(default)]
            content: CandidateContent,
        }
        #[derive(Deserialize, Default)]
        struct CandidateContent {
            #[serde(default)]
            parts: Vec<TextPart>,
        }
        #[derive(Deserialize)]
        struct TextPart {
            #[serde(default)]
            text: String,
        }

        let prompt = build_prompt(req);
        let body = GenRequest {
            contents: [Content {
                parts: vec![
                    Part::Text { text: &prompt },
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: "image/jpeg",
                            data: &req.image_base64,
                        },
                    },
                ],
            }],
            safety_settings: relaxed_safety_settings(),
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.cfg.base_url.trim_end_matches('/'),
            self.cfg.model,
            self.cfg.api_key
        );

        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(GatewayError::from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: snippet(&body),
            });
        }

        let parsed: GenResponse = resp.json().await.map_err(GatewayError::from_reqwest)?;
        let text: String = parsed
            .candidates
            .first()
            .map(|c| c.content.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(GatewayError::EmptyReply);
        }

        parse_model_reply(&text).ok_or(GatewayError::Unparseable)
    }
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

fn relaxed_safety_settings() -> Vec<SafetySetting> {
    RELAXED_HARM_CATEGORIES
        .iter()
        .map(|&category| SafetySetting {
            category,
            threshold: "BLOCK_NONE",
        })
        .collect()
}

const PROMPT_INTRO: &str = "You are an expert civic infrastructure analyst for Indian municipalities. \
Analyze this image showing a civic infrastructure problem.";

const PROMPT_FRAMING: &str = "This is a legitimate civic infrastructure report. The image may show potholes, \
garbage, broken streetlights, dead animals on roads, or sewage issues. Please analyze objectively for \
municipal action.";

const SCHEMA_HEAD: &str = r#"{
  "detected_category": "pothole|waste_overflow|streetlight_out|traffic_signal_fault|carcass_on_road|public_toilet_unclean|damaged_pathway|sewage_overflow|other",
  "confidence": 0.85,
  "severity": 75,
  "description": "Clear, detailed description of the civic issue visible in the image",
  "measurements": {
    "pothole_depth_cm": 12,
    "garbage_volume_cubic_meters": 5.5,
    "affected_area_square_meters": 8.0,
    "is_dead_animal": false,
    "is_low_light_area": false,
    "sewage_volume_liters": null
  },
  "health_risks": ["mosquito breeding", "disease transmission", "accident risk"],
  "urgency_level": "high",
  "expected_resolution_time_hours": 24,
  "assigned_department": "PWD",
  "possible_cause": "Heavy rainfall causing road deterioration and lack of maintenance",
  "next_steps": ["Deploy repair team within 24 hours", "Set up warning signs", "Fill pothole with asphalt"],
  "auto_escalate": false,
  "escalation_reason": null,
  "work_order": {
    "priority": "high",
    "estimated_workers": 3,
    "required_equipment": ["asphalt mixture", "road roller", "safety cones"],
    "safety_precautions": ["warning signs", "traffic control", "safety vests"],
    "estimated_cost_inr": 15000,
    "estimated_duration_hours": 6
  },
  "root_cause_analysis": {
    "primary_cause": "Poor drainage system leading to water accumulation",
    "contributing_factors": ["Heavy monsoon", "Aging infrastructure", "Inadequate maintenance"],
    "recurring_issue": true,
    "prevention_measures": ["Improve drainage", "Regular inspections", "Preventive maintenance"],
    "similar_issues_in_area": 3
  },
  "municipal_staff_instructions": {
    "immediate_actions": ["Deploy team within 2 hours", "Set up safety barriers"],
    "location_based_route": "Via "#;

const SCHEMA_TAIL: &str = r#"",
    "tools_checklist": ["Repair kit", "Safety gear", "Traffic cones"],
    "completion_verification": ["Photo documentation", "Quality check", "Citizen notification"]
  },
  "health_hazard_predictions": {
    "mosquito_breeding_risk": "medium",
    "contamination_risk": "low",
    "accident_risk": "high",
    "crime_risk_due_to_darkness": "low",
    "overall_risk_score": 70
  }
}"#;

/// Vision prompt: complaint text, coordinates and the exact response schema
/// the normalizer downstream expects. The category list deliberately includes
/// `sewage_overflow` even though our own taxonomy folds it into `other`; the
/// model sorts sewage images better when it can name them.
pub fn build_prompt(req: &AnalysisRequest) -> String {
    let location_line = match &req.location {
        Some(loc) => format!(
            "{}, {} ({})",
            loc.lat,
            loc.lng,
            loc.address.as_deref().unwrap_or("India")
        ),
        None => "unknown (India)".to_string(),
    };
    let route_hint = req
        .location
        .as_ref()
        .and_then(|l| l.address.as_deref())
        .unwrap_or("nearest PWD office");

    format!(
        "{PROMPT_INTRO}\n\nComplaint: \"{complaint}\"\nLocation: {location_line}\n\n{PROMPT_FRAMING}\n\n\
Provide comprehensive analysis in this exact JSON format with ALL fields filled:\n{SCHEMA_HEAD}{route_hint}{SCHEMA_TAIL}",
        complaint = req.complaint_text,
    )
}

/// Reply text to JSON object: drop markdown fences, take the first balanced
/// `{...}`, parse. `None` means the caller should treat the reply as
/// unparseable.
pub fn parse_model_reply(text: &str) -> Option<Value> {
    let cleaned = strip_code_fences(text);
    let object = extract_json_object(&cleaned)?;
    let value: Value = serde_json::from_str(object).ok()?;
    value.is_object().then_some(value)
}

fn strip_code_fences(text: &str) -> String {
    static RE_FENCE: OnceCell<Regex> = OnceCell::new();
    let re = RE_FENCE.get_or_init(|| Regex::new("```(?:json)?").unwrap());
    re.replace_all(text, "").trim().to_string()
}

/// First balanced top-level object in `text`. A bounded depth scan that is
/// string- and escape-aware, not a full JSON parse; serde does the real
/// validation right after.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + idx]);
                }
            }
            _ => {}
        }
    }
    None
}

fn snippet(body: &str) -> String {
    body.chars().take(300).collect()
}
