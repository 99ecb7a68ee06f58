//! types.rs — the unified analysis contract shared by the Gemini path and the
//! mock classifier.
//!
//! One `AnalysisResult` per request, assembled synchronously and handed back
//! to the caller; the service keeps no copy. Derived fields (severity tier,
//! escalation, review flag) are always recomputed here, never trusted from
//! the model reply.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canned reason attached to every auto-escalated result that did not bring
/// its own explanation.
pub const ESCALATION_REASON: &str =
    "Critical severity detected requiring immediate attention";

/// Fixed enumeration of recognized civic issue types. Anything the model
/// claims outside this set (including `sewage_overflow`) collapses to
/// [`Category::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Pothole,
    WasteOverflow,
    StreetlightOut,
    TrafficSignalFault,
    CarcassOnRoad,
    PublicToiletUnclean,
    DamagedPathway,
    Other,
}

impl Category {
    /// Every category, in keyword-priority order (used by tests and by the
    /// catalog coverage checks).
    pub const ALL: [Category; 8] = [
        Category::Pothole,
        Category::WasteOverflow,
        Category::StreetlightOut,
        Category::TrafficSignalFault,
        Category::CarcassOnRoad,
        Category::PublicToiletUnclean,
        Category::DamagedPathway,
        Category::Other,
    ];

    /// Allow-list normalization for model output.
    pub fn from_wire(s: &str) -> Category {
        match s {
            "pothole" => Category::Pothole,
            "waste_overflow" => Category::WasteOverflow,
            "streetlight_out" => Category::StreetlightOut,
            "traffic_signal_fault" => Category::TrafficSignalFault,
            "carcass_on_road" => Category::CarcassOnRoad,
            "public_toilet_unclean" => Category::PublicToiletUnclean,
            "damaged_pathway" => Category::DamagedPathway,
            _ => Category::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Pothole => "pothole",
            Category::WasteOverflow => "waste_overflow",
            Category::StreetlightOut => "streetlight_out",
            Category::TrafficSignalFault => "traffic_signal_fault",
            Category::CarcassOnRoad => "carcass_on_road",
            Category::PublicToiletUnclean => "public_toilet_unclean",
            Category::DamagedPathway => "damaged_pathway",
            Category::Other => "other",
        }
    }

    /// Human-readable form for descriptions ("waste overflow", not
    /// "waste_overflow").
    pub fn display_name(self) -> String {
        self.as_str().replace('_', " ")
    }
}

/// Municipal department codes. Assignment is a deterministic function of the
/// category on the mock path; the model may propose one on the real path but
/// it is validated against this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Department {
    Pwd,
    Swm,
    Electrical,
    Traffic,
    Health,
    Sanitation,
    Helpdesk,
}

impl Department {
    pub fn from_wire(s: &str) -> Option<Department> {
        match s {
            "PWD" => Some(Department::Pwd),
            "SWM" => Some(Department::Swm),
            "ELECTRICAL" => Some(Department::Electrical),
            "TRAFFIC" => Some(Department::Traffic),
            "HEALTH" => Some(Department::Health),
            "SANITATION" => Some(Department::Sanitation),
            "HELPDESK" => Some(Department::Helpdesk),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Department::Pwd => "PWD",
            Department::Swm => "SWM",
            Department::Electrical => "ELECTRICAL",
            Department::Traffic => "TRAFFIC",
            Department::Health => "HEALTH",
            Department::Sanitation => "SANITATION",
            Department::Helpdesk => "HELPDESK",
        }
    }
}

/// Coarse severity bucket. Always derived from the 0–100 score; the
/// boundaries are inclusive (85 is already critical).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityTier {
    Low,
    Medium,
    High,
    Critical,
}

impl SeverityTier {
    pub fn from_severity(severity: u8) -> SeverityTier {
        if severity >= 85 {
            SeverityTier::Critical
        } else if severity >= 65 {
            SeverityTier::High
        } else if severity >= 40 {
            SeverityTier::Medium
        } else {
            SeverityTier::Low
        }
    }
}

/// Urgency label used for the work order priority and dispatch hints. The
/// mock derivation buckets at 75/50 (exclusive), which is why it differs
/// from [`SeverityTier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl UrgencyLevel {
    pub fn from_severity(severity: u8) -> UrgencyLevel {
        if severity > 75 {
            UrgencyLevel::High
        } else if severity > 50 {
            UrgencyLevel::Medium
        } else {
            UrgencyLevel::Low
        }
    }

    pub fn from_wire(s: &str) -> Option<UrgencyLevel> {
        match s {
            "low" => Some(UrgencyLevel::Low),
            "medium" => Some(UrgencyLevel::Medium),
            "high" => Some(UrgencyLevel::High),
            "critical" => Some(UrgencyLevel::Critical),
            _ => None,
        }
    }
}

/// Three-step risk scale for the hazard prediction block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_wire(s: &str) -> Option<RiskLevel> {
        match s {
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            _ => None,
        }
    }
}

/// Optional geolocation attached by the reporting client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub address: Option<String>,
}

/// Incoming analysis request. `imageBase64` is opaque here: it is forwarded
/// to the model untouched and never validated for size or type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    #[serde(rename = "imageBase64", default)]
    pub image_base64: String,
    #[serde(rename = "complaintText")]
    pub complaint_text: String,
    #[serde(default)]
    pub location: Option<Location>,
}

/// Category-dependent measurements. All six fields are always present on the
/// wire; numeric fields irrelevant to the category stay null, the two flags
/// default to false.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Measurements {
    pub pothole_depth_cm: Option<u32>,
    pub garbage_volume_cubic_meters: Option<f64>,
    pub affected_area_square_meters: Option<f64>,
    pub is_dead_animal: bool,
    pub is_low_light_area: bool,
    pub sewage_volume_liters: Option<f64>,
}

/// Draft work order for the assigned crew.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub priority: UrgencyLevel,
    pub estimated_workers: u32,
    pub required_equipment: Vec<String>,
    pub safety_precautions: Vec<String>,
    pub estimated_cost_inr: u32,
    pub estimated_duration_hours: u32,
}

/// Why the issue exists and how to keep it from coming back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootCauseAnalysis {
    pub primary_cause: String,
    pub contributing_factors: Vec<String>,
    pub recurring_issue: bool,
    pub prevention_measures: Vec<String>,
    pub similar_issues_in_area: u32,
}

/// Field checklist handed to the municipal crew.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffInstructions {
    pub immediate_actions: Vec<String>,
    pub location_based_route: String,
    pub tools_checklist: Vec<String>,
    pub completion_verification: Vec<String>,
}

/// Health hazard outlook. `overall_risk_score` mirrors the severity score on
/// the mock path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthHazardPredictions {
    pub mosquito_breeding_risk: RiskLevel,
    pub contamination_risk: RiskLevel,
    pub accident_risk: RiskLevel,
    pub crime_risk_due_to_darkness: RiskLevel,
    pub overall_risk_score: u8,
}

/// The unified output contract handed to clients, snake_case keys throughout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub predicted_category: Category,
    pub category_confidence: f64,
    pub final_severity: u8,
    pub severity_level: SeverityTier,
    pub description: String,
    pub measurements: Measurements,
    pub health_risks: Vec<String>,
    pub urgency_level: UrgencyLevel,
    pub expected_resolution_time: String,
    pub assigned_department: Department,
    pub possible_cause: String,
    pub next_steps: Vec<String>,
    pub auto_escalate: bool,
    pub escalation_reason: Option<String>,
    pub work_order: WorkOrder,
    pub root_cause_analysis: RootCauseAnalysis,
    pub municipal_staff_instructions: StaffInstructions,
    pub health_hazard_predictions: HealthHazardPredictions,
    pub needs_human_review: bool,
    pub processed_at: DateTime<Utc>,
    pub raw_model_output: serde_json::Value,
}

/// Escalation is strictly-above-85; the reason travels only with an actual
/// escalation. A caller-supplied reason (from the model) is kept, otherwise
/// the canned one is used.
pub fn escalation_for(severity: u8, reason: Option<String>) -> (bool, Option<String>) {
    if severity > 85 {
        (true, Some(reason.unwrap_or_else(|| ESCALATION_REASON.to_string())))
    } else {
        (false, None)
    }
}

pub fn clamp01(x: f64) -> f64 {
    if x < 0.0 {
        0.0
    } else if x > 1.0 {
        1.0
    } else {
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tier_boundaries_are_inclusive() {
        assert_eq!(SeverityTier::from_severity(39), SeverityTier::Low);
        assert_eq!(SeverityTier::from_severity(40), SeverityTier::Medium);
        assert_eq!(SeverityTier::from_severity(64), SeverityTier::Medium);
        assert_eq!(SeverityTier::from_severity(65), SeverityTier::High);
        assert_eq!(SeverityTier::from_severity(84), SeverityTier::High);
        assert_eq!(SeverityTier::from_severity(85), SeverityTier::Critical);
        assert_eq!(SeverityTier::from_severity(100), SeverityTier::Critical);
    }

    #[test]
    fn unknown_categories_collapse_to_other() {
        assert_eq!(Category::from_wire("pothole"), Category::Pothole);
        assert_eq!(Category::from_wire("sewage_overflow"), Category::Other);
        assert_eq!(Category::from_wire("SPACE DEBRIS"), Category::Other);
        assert_eq!(Category::from_wire(""), Category::Other);
    }

    #[test]
    fn department_codes_serialize_uppercase() {
        let v = serde_json::to_value(Department::Pwd).unwrap();
        assert_eq!(v, json!("PWD"));
        assert_eq!(Department::from_wire("SANITATION"), Some(Department::Sanitation));
        assert_eq!(Department::from_wire("pwd"), None);
    }

    #[test]
    fn escalation_boundary_is_strictly_above_85() {
        let (esc, reason) = escalation_for(85, None);
        assert!(!esc);
        assert!(reason.is_none());

        let (esc, reason) = escalation_for(86, None);
        assert!(esc);
        assert_eq!(reason.as_deref(), Some(ESCALATION_REASON));

        // A model-supplied reason survives, but only when escalating.
        let (esc, reason) = escalation_for(90, Some("burst main".into()));
        assert!(esc);
        assert_eq!(reason.as_deref(), Some("burst main"));
        let (esc, reason) = escalation_for(10, Some("burst main".into()));
        assert!(!esc);
        assert!(reason.is_none());
    }

    #[test]
    fn measurements_serialize_irrelevant_fields_as_null() {
        let m = Measurements {
            pothole_depth_cm: Some(12),
            affected_area_square_meters: Some(1.5),
            ..Default::default()
        };
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["pothole_depth_cm"], json!(12));
        assert!(v["garbage_volume_cubic_meters"].is_null());
        assert!(v["sewage_volume_liters"].is_null());
        assert_eq!(v["is_dead_animal"], json!(false));
        assert_eq!(v["is_low_light_area"], json!(false));
    }

    #[test]
    fn request_accepts_the_documented_shape() {
        let req: AnalysisRequest = serde_json::from_value(json!({
            "imageBase64": "AAAA",
            "complaintText": "Large pothole near the bus stop",
            "location": { "lat": 28.6, "lng": 77.2, "address": "MG Road" }
        }))
        .unwrap();
        assert_eq!(req.complaint_text, "Large pothole near the bus stop");
        let loc = req.location.unwrap();
        assert_eq!(loc.address.as_deref(), Some("MG Road"));

        // Image and location are optional; complaint text is not.
        let req: AnalysisRequest =
            serde_json::from_value(json!({ "complaintText": "" })).unwrap();
        assert!(req.image_base64.is_empty());
        assert!(req.location.is_none());
        assert!(serde_json::from_value::<AnalysisRequest>(json!({})).is_err());
    }
}
