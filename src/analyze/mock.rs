//! Deterministic-by-construction mock classifier.
//!
//! Serves every analysis the Gemini gateway cannot: category comes from a
//! keyword scan of the complaint text, severity and confidence from bounded
//! jitter, everything else from the catalog and fixed severity buckets. The
//! jitter goes through [`JitterSource`] so tests can pin the exact draws;
//! production uses the thread-local RNG.

use chrono::Utc;
use rand::Rng;
use serde_json::json;

use super::catalog;
use super::types::{
    escalation_for, AnalysisRequest, AnalysisResult, Category, HealthHazardPredictions, Location,
    Measurements, RiskLevel, SeverityTier, StaffInstructions, UrgencyLevel, WorkOrder,
};

/// Marker embedded in `raw_model_output` so callers can tell a mock analysis
/// from a real one without reading headers.
pub const MOCK_NOTE: &str = "Mock analysis - Gemini API key not configured or rate limited";

/// Uniform draws in `[0, 1)`. One production impl, one pinned impl for tests.
pub trait JitterSource: Send {
    fn unit(&mut self) -> f64;
}

/// Production source backed by the thread-local RNG.
#[derive(Debug, Default)]
pub struct ThreadRngJitter;

impl JitterSource for ThreadRngJitter {
    fn unit(&mut self) -> f64 {
        rand::rng().random()
    }
}

/// Replays a fixed sequence of draws. Panics when the sequence runs dry, so a
/// test that mis-counts the draw order fails loudly instead of drifting.
#[derive(Debug)]
pub struct FixedJitter {
    draws: Vec<f64>,
    next: usize,
}

impl FixedJitter {
    pub fn new(draws: Vec<f64>) -> Self {
        Self { draws, next: 0 }
    }

    /// Shorthand for "every draw returns the same value".
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value; 16])
    }
}

impl JitterSource for FixedJitter {
    fn unit(&mut self) -> f64 {
        let v = self
            .draws
            .get(self.next)
            .copied()
            .unwrap_or_else(|| panic!("jitter sequence exhausted after {} draws", self.next));
        self.next += 1;
        v
    }
}

/// Keyword chain over the lowercased complaint text. First hit wins, so
/// "pothole next to the garbage pile" stays a pothole. Hindi terms match the
/// same way since `contains` is byte-exact after lowercasing.
pub fn infer_category(text: &str) -> Category {
    let lower = text.to_lowercase();
    if lower.contains("pothole") || lower.contains("गड्ढा") {
        Category::Pothole
    } else if lower.contains("garbage") || lower.contains("कचरा") || lower.contains("waste") {
        Category::WasteOverflow
    } else if lower.contains("light") || lower.contains("लाइट") {
        Category::StreetlightOut
    } else if lower.contains("signal") || lower.contains("traffic") {
        Category::TrafficSignalFault
    } else if lower.contains("animal") || lower.contains("carcass") || lower.contains("dead") {
        Category::CarcassOnRoad
    } else if lower.contains("toilet") || lower.contains("शौचालय") {
        Category::PublicToiletUnclean
    } else if lower.contains("pathway") || lower.contains("pavement") {
        Category::DamagedPathway
    } else {
        Category::Other
    }
}

/// Category-shaped measurements with jittered magnitudes. Draw order is part
/// of the contract: depth/volume first, affected area second.
pub fn mock_measurements(category: Category, jitter: &mut dyn JitterSource) -> Measurements {
    let mut m = Measurements::default();
    match category {
        Category::Pothole => {
            m.pothole_depth_cm = Some(8 + (jitter.unit() * 15.0).floor() as u32);
            m.affected_area_square_meters = Some(0.5 + jitter.unit() * 2.0);
        }
        Category::WasteOverflow => {
            m.garbage_volume_cubic_meters = Some(2.0 + jitter.unit() * 8.0);
            m.affected_area_square_meters = Some(5.0 + jitter.unit() * 15.0);
        }
        Category::CarcassOnRoad => {
            m.is_dead_animal = true;
            m.affected_area_square_meters = Some(1.0 + jitter.unit() * 3.0);
        }
        Category::StreetlightOut => {
            m.is_low_light_area = true;
        }
        _ => {}
    }
    m
}

/// The no-randomness shape of [`mock_measurements`]: only the boolean flags
/// that follow from the category, every magnitude left null. Used when a
/// model reply omitted the measurement block entirely.
pub fn baseline_measurements(category: Category) -> Measurements {
    Measurements {
        is_dead_animal: category == Category::CarcassOnRoad,
        is_low_light_area: category == Category::StreetlightOut,
        ..Default::default()
    }
}

/// Resolution promise by severity bucket: 12h above 75, 24h above 50,
/// otherwise 48h.
pub fn resolution_hours(severity: u8) -> u32 {
    if severity > 75 {
        12
    } else if severity > 50 {
        24
    } else {
        48
    }
}

/// Draft work order from severity bucket plus catalog equipment lists.
pub fn work_order_for(category: Category, severity: u8) -> WorkOrder {
    let (cost, duration) = if severity > 75 {
        (25_000, 8)
    } else if severity > 50 {
        (15_000, 6)
    } else {
        (8_000, 4)
    };
    WorkOrder {
        priority: UrgencyLevel::from_severity(severity),
        estimated_workers: if category == Category::Pothole { 3 } else { 2 },
        required_equipment: owned(catalog::required_equipment(category)),
        safety_precautions: owned(catalog::safety_precautions(category)),
        estimated_cost_inr: cost,
        estimated_duration_hours: duration,
    }
}

/// Hazard outlook per category. Overall score mirrors the severity.
pub fn hazard_predictions_for(category: Category, severity: u8) -> HealthHazardPredictions {
    let high_if = |hit: bool| if hit { RiskLevel::High } else { RiskLevel::Low };
    HealthHazardPredictions {
        mosquito_breeding_risk: high_if(category == Category::WasteOverflow),
        contamination_risk: high_if(category == Category::WasteOverflow),
        accident_risk: high_if(matches!(
            category,
            Category::Pothole | Category::DamagedPathway
        )),
        crime_risk_due_to_darkness: if category == Category::StreetlightOut {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        },
        overall_risk_score: severity,
    }
}

/// Crew checklist: first two remediation steps, a route hint built from the
/// reported address, the category's equipment, and a fixed sign-off list.
pub fn staff_instructions_for(
    category: Category,
    location: Option<&Location>,
) -> StaffInstructions {
    let via = location
        .and_then(|l| l.address.as_deref())
        .unwrap_or("nearest municipal office");
    StaffInstructions {
        immediate_actions: catalog::next_steps(category)
            .iter()
            .take(2)
            .map(|s| s.to_string())
            .collect(),
        location_based_route: format!("Via {via} - optimized route"),
        tools_checklist: owned(catalog::required_equipment(category)),
        completion_verification: vec![
            "Photo documentation".to_string(),
            "Quality inspection".to_string(),
            "Notify citizen via app".to_string(),
        ],
    }
}

/// One-line description: detected category plus the first 100 characters of
/// the complaint.
pub fn synthesize_description(category: Category, complaint: &str) -> String {
    let head: String = complaint.chars().take(100).collect();
    format!(
        "AI detected {} based on image analysis. {}",
        category.display_name(),
        head
    )
}

/// Full mock analysis. Exactly the draws described above, in order:
/// severity, confidence, category measurements, recurring flag, similar-issue
/// count. Everything else is a pure function of category and severity.
pub fn classify(req: &AnalysisRequest, jitter: &mut dyn JitterSource) -> AnalysisResult {
    let category = infer_category(&req.complaint_text);
    let severity = 50 + (jitter.unit() * 40.0).floor() as u8;
    let confidence = 0.75 + jitter.unit() * 0.2;
    let measurements = mock_measurements(category, jitter);
    let recurring_issue = jitter.unit() > 0.5;
    let similar_issues_in_area = (jitter.unit() * 5.0).floor() as u32;

    let (auto_escalate, escalation_reason) = escalation_for(severity, None);

    AnalysisResult {
        predicted_category: category,
        category_confidence: confidence,
        final_severity: severity,
        severity_level: SeverityTier::from_severity(severity),
        description: synthesize_description(category, &req.complaint_text),
        measurements,
        health_risks: owned(catalog::health_risks(category)),
        urgency_level: UrgencyLevel::from_severity(severity),
        expected_resolution_time: format!("{} hours", resolution_hours(severity)),
        assigned_department: catalog::department(category),
        possible_cause: catalog::possible_cause(category).to_string(),
        next_steps: owned(catalog::next_steps(category)),
        auto_escalate,
        escalation_reason,
        work_order: work_order_for(category, severity),
        root_cause_analysis: super::types::RootCauseAnalysis {
            primary_cause: catalog::root_cause(category).to_string(),
            contributing_factors: owned(catalog::contributing_factors(category)),
            recurring_issue,
            prevention_measures: owned(catalog::prevention_measures(category)),
            similar_issues_in_area,
        },
        municipal_staff_instructions: staff_instructions_for(category, req.location.as_ref()),
        health_hazard_predictions: hazard_predictions_for(category, severity),
        needs_human_review: confidence < 0.7 || severity > 85,
        processed_at: Utc::now(),
        raw_model_output: json!({ "note": MOCK_NOTE }),
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::types::Department;

    fn request(text: &str) -> AnalysisRequest {
        AnalysisRequest {
            image_base64: String::new(),
            complaint_text: text.to_string(),
            location: None,
        }
    }

    #[test]
    fn keyword_chain_first_hit_wins() {
        assert_eq!(infer_category("Huge pothole near the garbage dump"), Category::Pothole);
        assert_eq!(infer_category("garbage everywhere"), Category::WasteOverflow);
        assert_eq!(infer_category("Street LIGHT broken"), Category::StreetlightOut);
        assert_eq!(infer_category("heavy traffic, no signal"), Category::TrafficSignalFault);
        assert_eq!(infer_category("dead rat outside school"), Category::CarcassOnRoad);
        assert_eq!(infer_category("toilet block filthy"), Category::PublicToiletUnclean);
        assert_eq!(infer_category("broken pavement slabs"), Category::DamagedPathway);
        assert_eq!(infer_category("tree fell on my fence"), Category::Other);
    }

    #[test]
    fn hindi_keywords_are_recognized() {
        assert_eq!(infer_category("सड़क पर बड़ा गड्ढा है"), Category::Pothole);
        assert_eq!(infer_category("कचरा फैला हुआ है"), Category::WasteOverflow);
        assert_eq!(infer_category("लाइट बंद है"), Category::StreetlightOut);
        assert_eq!(infer_category("शौचालय गंदा है"), Category::PublicToiletUnclean);
    }

    #[test]
    fn lowest_jitter_gives_the_floor_of_every_range() {
        let mut jitter = FixedJitter::constant(0.0);
        let result = classify(&request("pothole on the highway"), &mut jitter);

        assert_eq!(result.final_severity, 50);
        assert!((result.category_confidence - 0.75).abs() < 1e-9);
        assert_eq!(result.measurements.pothole_depth_cm, Some(8));
        assert_eq!(result.measurements.affected_area_square_meters, Some(0.5));
        assert!(!result.root_cause_analysis.recurring_issue);
        assert_eq!(result.root_cause_analysis.similar_issues_in_area, 0);
        assert_eq!(result.severity_level, SeverityTier::Medium);
        assert_eq!(result.urgency_level, UrgencyLevel::Low);
        assert_eq!(result.expected_resolution_time, "48 hours");
        assert!(!result.auto_escalate);
        assert!(result.escalation_reason.is_none());
        assert!(!result.needs_human_review);
        assert_eq!(result.raw_model_output["note"], MOCK_NOTE);
    }

    #[test]
    fn highest_jitter_stays_inside_the_documented_caps() {
        let mut jitter = FixedJitter::constant(0.999_999);
        let result = classify(&request("pothole again"), &mut jitter);

        assert_eq!(result.final_severity, 89);
        assert!(result.category_confidence < 0.95);
        assert_eq!(result.measurements.pothole_depth_cm, Some(22));
        assert!(result.root_cause_analysis.recurring_issue);
        assert_eq!(result.root_cause_analysis.similar_issues_in_area, 4);
        // 89 is critical tier and strictly above the escalation line.
        assert_eq!(result.severity_level, SeverityTier::Critical);
        assert!(result.auto_escalate);
        assert_eq!(
            result.escalation_reason.as_deref(),
            Some(crate::analyze::types::ESCALATION_REASON)
        );
        assert!(result.needs_human_review);
    }

    #[test]
    fn draw_order_is_severity_confidence_measurements_recurring_similar() {
        // Streetlight takes no measurement draws, so the third and fourth
        // values land on recurring/similar.
        let mut jitter = FixedJitter::new(vec![0.5, 0.0, 0.9, 0.6]);
        let result = classify(&request("street light out"), &mut jitter);

        assert_eq!(result.final_severity, 70);
        assert!(result.measurements.is_low_light_area);
        assert_eq!(result.measurements.pothole_depth_cm, None);
        assert!(result.root_cause_analysis.recurring_issue);
        assert_eq!(result.root_cause_analysis.similar_issues_in_area, 3);
    }

    #[test]
    fn waste_overflow_measurements_and_hazards() {
        let mut jitter = FixedJitter::constant(0.0);
        let result = classify(&request("waste piling up"), &mut jitter);

        assert_eq!(result.predicted_category, Category::WasteOverflow);
        assert_eq!(result.assigned_department, Department::Swm);
        assert_eq!(result.measurements.garbage_volume_cubic_meters, Some(2.0));
        assert_eq!(result.measurements.affected_area_square_meters, Some(5.0));
        assert_eq!(
            result.health_hazard_predictions.mosquito_breeding_risk,
            RiskLevel::High
        );
        assert_eq!(
            result.health_hazard_predictions.contamination_risk,
            RiskLevel::High
        );
        assert_eq!(
            result.health_hazard_predictions.crime_risk_due_to_darkness,
            RiskLevel::Low
        );
    }

    #[test]
    fn carcass_sets_the_dead_animal_flag() {
        let mut jitter = FixedJitter::constant(0.5);
        let result = classify(&request("dead dog on the flyover"), &mut jitter);

        assert!(result.measurements.is_dead_animal);
        assert_eq!(result.measurements.affected_area_square_meters, Some(2.5));
        assert_eq!(result.assigned_department, Department::Health);
    }

    #[test]
    fn route_hint_uses_the_reported_address_when_present() {
        let with_address = staff_instructions_for(
            Category::Pothole,
            Some(&Location {
                lat: 28.6,
                lng: 77.2,
                address: Some("MG Road".to_string()),
            }),
        );
        assert_eq!(with_address.location_based_route, "Via MG Road - optimized route");

        let without = staff_instructions_for(Category::Pothole, None);
        assert_eq!(
            without.location_based_route,
            "Via nearest municipal office - optimized route"
        );
        assert_eq!(without.immediate_actions.len(), 2);
    }

    #[test]
    fn description_truncates_long_complaints() {
        let long = "x".repeat(300);
        let desc = synthesize_description(Category::Other, &long);
        assert!(desc.starts_with("AI detected other based on image analysis."));
        assert!(desc.len() < 160);
    }

    #[test]
    fn production_jitter_respects_all_ranges() {
        let mut jitter = ThreadRngJitter;
        for _ in 0..200 {
            let result = classify(&request("pothole check"), &mut jitter);
            assert!((50..=89).contains(&result.final_severity));
            assert!((0.75..0.95).contains(&result.category_confidence));
            let depth = result.measurements.pothole_depth_cm.unwrap();
            assert!((8..=22).contains(&depth));
            assert!(result.root_cause_analysis.similar_issues_in_area <= 4);
            // Mock confidence never dips below 0.75, so review only triggers
            // past the escalation line.
            assert_eq!(result.needs_human_review, result.final_severity > 85);
        }
    }
}
