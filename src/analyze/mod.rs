// src/analyze/mod.rs
//! Analysis pipeline entry: one request in, one unified result out, with the
//! gateway-or-mock decision made here and nowhere else.

pub mod catalog;
pub mod gemini;
pub mod mock;
pub mod types;

use std::sync::Mutex;
use std::time::Instant;

use chrono::Utc;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use serde_json::Value;
use tracing::{info, warn};

use self::gemini::{GatewayError, GeminiClient};
use self::mock::{JitterSource, ThreadRngJitter};
use self::types::{
    clamp01, escalation_for, AnalysisRequest, AnalysisResult, Category, Department,
    HealthHazardPredictions, Measurements, RiskLevel, RootCauseAnalysis, SeverityTier,
    StaffInstructions, UrgencyLevel, WorkOrder,
};
use crate::config::AppConfig;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("analyze_requests_total", "Analysis requests received.");
        describe_counter!(
            "analyze_fallback_total",
            "Analyses served by the mock classifier, labelled by reason."
        );
        describe_counter!(
            "analyze_gateway_errors_total",
            "Gemini gateway calls that did not produce a usable reply."
        );
        describe_histogram!(
            "analyze_gateway_elapsed_ms",
            "Gemini round-trip latency in milliseconds."
        );
    });
}

/// Short stable id for logging; complaint text itself never hits the log.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Why a request ended up on the mock classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// No Gemini API key in the environment.
    NotConfigured,
    /// `AI_TEST_MODE=mock` pinned this process to the mock path.
    ForcedMock,
    /// The HTTP call itself failed (transport or non-2xx status).
    Gateway(String),
    /// The model answered with nothing usable, or the call timed out.
    EmptyReply,
    /// Reply text contained no parseable JSON object.
    UnparseableReply,
}

impl FallbackReason {
    /// Stable label used for the metrics dimension and the reason header.
    pub fn label(&self) -> &'static str {
        match self {
            FallbackReason::NotConfigured => "not_configured",
            FallbackReason::ForcedMock => "forced_mock",
            FallbackReason::Gateway(_) => "gateway_error",
            FallbackReason::EmptyReply => "empty_reply",
            FallbackReason::UnparseableReply => "unparseable_reply",
        }
    }
}

impl From<GatewayError> for FallbackReason {
    fn from(err: GatewayError) -> Self {
        match err {
            // An expired call and a blocked reply look the same downstream.
            GatewayError::EmptyReply | GatewayError::Timeout => FallbackReason::EmptyReply,
            GatewayError::Unparseable => FallbackReason::UnparseableReply,
            other => FallbackReason::Gateway(other.to_string()),
        }
    }
}

/// An analysis plus the provenance the API layer needs for its headers.
#[derive(Debug)]
pub struct AnalysisOutcome {
    pub result: AnalysisResult,
    pub fallback: Option<FallbackReason>,
}

impl AnalysisOutcome {
    pub fn ai_used(&self) -> bool {
        self.fallback.is_none()
    }
}

/// The orchestrator. Owns the optional gateway and the jitter source the
/// mock draws from; shared behind an `Arc` by every handler.
pub struct AnalysisService {
    gateway: Option<GeminiClient>,
    force_mock: bool,
    jitter: Mutex<Box<dyn JitterSource>>,
}

impl AnalysisService {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::with_jitter(
            cfg.gemini.clone().map(GeminiClient::new),
            cfg.force_mock,
            Box::new(ThreadRngJitter),
        )
    }

    /// Full-control constructor; tests pin the jitter sequence through this.
    pub fn with_jitter(
        gateway: Option<GeminiClient>,
        force_mock: bool,
        jitter: Box<dyn JitterSource>,
    ) -> Self {
        Self {
            gateway,
            force_mock,
            jitter: Mutex::new(jitter),
        }
    }

    /// Analyze one report. Never fails: every gateway problem degrades to
    /// the mock classifier with the reason recorded.
    pub async fn analyze(&self, req: &AnalysisRequest) -> AnalysisOutcome {
        ensure_metrics_described();
        counter!("analyze_requests_total").increment(1);

        if self.force_mock {
            return self.mock_takeover(req, FallbackReason::ForcedMock);
        }
        let Some(gateway) = &self.gateway else {
            return self.mock_takeover(req, FallbackReason::NotConfigured);
        };

        let started = Instant::now();
        match gateway.call_model(req).await {
            Ok(raw) => {
                histogram!("analyze_gateway_elapsed_ms")
                    .record(started.elapsed().as_millis() as f64);
                let result = normalize_model_reply(raw, req);
                info!(
                    id = %anon_hash(&req.complaint_text),
                    category = result.predicted_category.as_str(),
                    severity = result.final_severity,
                    "analysis served by gemini"
                );
                AnalysisOutcome {
                    result,
                    fallback: None,
                }
            }
            Err(err) => {
                histogram!("analyze_gateway_elapsed_ms")
                    .record(started.elapsed().as_millis() as f64);
                counter!("analyze_gateway_errors_total").increment(1);
                warn!(error = %err, "gemini call failed, mock takes over");
                self.mock_takeover(req, FallbackReason::from(err))
            }
        }
    }

    fn mock_takeover(&self, req: &AnalysisRequest, reason: FallbackReason) -> AnalysisOutcome {
        counter!("analyze_fallback_total", "reason" => reason.label()).increment(1);
        let mut jitter = self.jitter.lock().expect("jitter mutex poisoned");
        let result = mock::classify(req, jitter.as_mut());
        info!(
            id = %anon_hash(&req.complaint_text),
            category = result.predicted_category.as_str(),
            severity = result.final_severity,
            reason = reason.label(),
            "analysis served by mock classifier"
        );
        AnalysisOutcome {
            result,
            fallback: Some(reason),
        }
    }
}

/// Shape the model's free-form JSON into the unified contract.
///
/// Derived fields (tier, escalation, review flag) are recomputed here no
/// matter what the model claimed. Absent or invalid blocks take the same
/// derivations the mock uses, minus the randomness: recurring stays false,
/// counts stay zero, magnitudes stay null.
pub fn normalize_model_reply(raw: Value, req: &AnalysisRequest) -> AnalysisResult {
    let category = raw
        .get("detected_category")
        .and_then(Value::as_str)
        .map(Category::from_wire)
        .unwrap_or(Category::Other);

    let severity = match raw.get("severity").and_then(Value::as_f64) {
        Some(s) if s != 0.0 => s.round().clamp(0.0, 100.0) as u8,
        _ => 50,
    };
    let tier = SeverityTier::from_severity(severity);

    let confidence = clamp01(raw.get("confidence").and_then(Value::as_f64).unwrap_or(0.5));

    let model_reason = raw
        .get("escalation_reason")
        .and_then(Value::as_str)
        .map(str::to_string);
    let (auto_escalate, escalation_reason) = escalation_for(severity, model_reason);

    let department = raw
        .get("assigned_department")
        .and_then(Value::as_str)
        .and_then(Department::from_wire)
        .unwrap_or_else(|| catalog::department(category));

    let urgency_level = raw
        .get("urgency_level")
        .and_then(Value::as_str)
        .and_then(UrgencyLevel::from_wire)
        .unwrap_or_else(|| UrgencyLevel::from_severity(severity));

    let resolution_hours = raw
        .get("expected_resolution_time_hours")
        .and_then(Value::as_u64)
        .map(|h| h as u32)
        .unwrap_or_else(|| mock::resolution_hours(severity));

    let description = raw
        .get("description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| mock::synthesize_description(category, &req.complaint_text));

    let possible_cause = raw
        .get("possible_cause")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| catalog::possible_cause(category).to_string());

    let health_risks = string_list(raw.get("health_risks"))
        .unwrap_or_else(|| owned(catalog::health_risks(category)));
    let next_steps =
        string_list(raw.get("next_steps")).unwrap_or_else(|| owned(catalog::next_steps(category)));

    let measurements = normalize_measurements(raw.get("measurements"), category);
    let work_order = normalize_work_order(raw.get("work_order"), category, severity);
    let root_cause_analysis = normalize_root_cause(raw.get("root_cause_analysis"), category);
    let municipal_staff_instructions =
        normalize_staff_instructions(raw.get("municipal_staff_instructions"), category, req);
    let health_hazard_predictions =
        normalize_hazards(raw.get("health_hazard_predictions"), category, severity);

    let needs_human_review = confidence < 0.7 || tier == SeverityTier::Critical;

    AnalysisResult {
        predicted_category: category,
        category_confidence: confidence,
        final_severity: severity,
        severity_level: tier,
        description,
        measurements,
        health_risks,
        urgency_level,
        expected_resolution_time: format!("{resolution_hours} hours"),
        assigned_department: department,
        possible_cause,
        next_steps,
        auto_escalate,
        escalation_reason,
        work_order,
        root_cause_analysis,
        municipal_staff_instructions,
        health_hazard_predictions,
        needs_human_review,
        processed_at: Utc::now(),
        raw_model_output: raw,
    }
}

/// Non-empty list of strings, or `None`. Non-string elements are dropped
/// rather than failing the whole list.
fn string_list(v: Option<&Value>) -> Option<Vec<String>> {
    let items: Vec<String> = v?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();
    (!items.is_empty()).then_some(items)
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn u32_or(v: Option<&Value>, default: u32) -> u32 {
    v.and_then(Value::as_u64)
        .map(|n| n.min(u32::MAX as u64) as u32)
        .unwrap_or(default)
}

fn normalize_measurements(v: Option<&Value>, category: Category) -> Measurements {
    let base = mock::baseline_measurements(category);
    let Some(obj) = v.filter(|v| v.is_object()) else {
        return base;
    };
    Measurements {
        pothole_depth_cm: obj
            .get("pothole_depth_cm")
            .and_then(Value::as_f64)
            .filter(|f| *f >= 0.0)
            .map(|f| f.round() as u32)
            .or(base.pothole_depth_cm),
        garbage_volume_cubic_meters: obj
            .get("garbage_volume_cubic_meters")
            .and_then(Value::as_f64)
            .or(base.garbage_volume_cubic_meters),
        affected_area_square_meters: obj
            .get("affected_area_square_meters")
            .and_then(Value::as_f64)
            .or(base.affected_area_square_meters),
        is_dead_animal: obj
            .get("is_dead_animal")
            .and_then(Value::as_bool)
            .unwrap_or(base.is_dead_animal),
        is_low_light_area: obj
            .get("is_low_light_area")
            .and_then(Value::as_bool)
            .unwrap_or(base.is_low_light_area),
        sewage_volume_liters: obj
            .get("sewage_volume_liters")
            .and_then(Value::as_f64)
            .or(base.sewage_volume_liters),
    }
}

fn normalize_work_order(v: Option<&Value>, category: Category, severity: u8) -> WorkOrder {
    let derived = mock::work_order_for(category, severity);
    let Some(obj) = v.filter(|v| v.is_object()) else {
        return derived;
    };
    WorkOrder {
        priority: obj
            .get("priority")
            .and_then(Value::as_str)
            .and_then(UrgencyLevel::from_wire)
            .unwrap_or(derived.priority),
        estimated_workers: u32_or(obj.get("estimated_workers"), derived.estimated_workers),
        required_equipment: string_list(obj.get("required_equipment"))
            .unwrap_or(derived.required_equipment),
        safety_precautions: string_list(obj.get("safety_precautions"))
            .unwrap_or(derived.safety_precautions),
        estimated_cost_inr: u32_or(obj.get("estimated_cost_inr"), derived.estimated_cost_inr),
        estimated_duration_hours: u32_or(
            obj.get("estimated_duration_hours"),
            derived.estimated_duration_hours,
        ),
    }
}

fn normalize_root_cause(v: Option<&Value>, category: Category) -> RootCauseAnalysis {
    let obj = v.filter(|v| v.is_object());
    let get = |key: &str| obj.and_then(|o| o.get(key));
    RootCauseAnalysis {
        primary_cause: get("primary_cause")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| catalog::root_cause(category).to_string()),
        contributing_factors: string_list(get("contributing_factors"))
            .unwrap_or_else(|| owned(catalog::contributing_factors(category))),
        recurring_issue: get("recurring_issue")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        prevention_measures: string_list(get("prevention_measures"))
            .unwrap_or_else(|| owned(catalog::prevention_measures(category))),
        similar_issues_in_area: get("similar_issues_in_area")
            .and_then(Value::as_u64)
            .map(|n| n.min(u32::MAX as u64) as u32)
            .unwrap_or(0),
    }
}

fn normalize_staff_instructions(
    v: Option<&Value>,
    category: Category,
    req: &AnalysisRequest,
) -> StaffInstructions {
    let derived = mock::staff_instructions_for(category, req.location.as_ref());
    let Some(obj) = v.filter(|v| v.is_object()) else {
        return derived;
    };
    StaffInstructions {
        immediate_actions: string_list(obj.get("immediate_actions"))
            .unwrap_or(derived.immediate_actions),
        location_based_route: obj
            .get("location_based_route")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .unwrap_or(derived.location_based_route),
        tools_checklist: string_list(obj.get("tools_checklist")).unwrap_or(derived.tools_checklist),
        completion_verification: string_list(obj.get("completion_verification"))
            .unwrap_or(derived.completion_verification),
    }
}

fn normalize_hazards(
    v: Option<&Value>,
    category: Category,
    severity: u8,
) -> HealthHazardPredictions {
    let derived = mock::hazard_predictions_for(category, severity);
    let Some(obj) = v.filter(|v| v.is_object()) else {
        return derived;
    };
    let risk = |key: &str, fallback: RiskLevel| {
        obj.get(key)
            .and_then(Value::as_str)
            .and_then(RiskLevel::from_wire)
            .unwrap_or(fallback)
    };
    HealthHazardPredictions {
        mosquito_breeding_risk: risk("mosquito_breeding_risk", derived.mosquito_breeding_risk),
        contamination_risk: risk("contamination_risk", derived.contamination_risk),
        accident_risk: risk("accident_risk", derived.accident_risk),
        crime_risk_due_to_darkness: risk(
            "crime_risk_due_to_darkness",
            derived.crime_risk_due_to_darkness,
        ),
        overall_risk_score: obj
            .get("overall_risk_score")
            .and_then(Value::as_f64)
            .map(|f| f.round().clamp(0.0, 100.0) as u8)
            .unwrap_or(derived.overall_risk_score),
    }
}
