//! Static reference data keyed by issue category: health risks, department
//! routing, causes, next steps, crew equipment and prevention advice.
//!
//! Every lookup is an exhaustive `match`, so adding a `Category` variant
//! without extending the catalog is a compile error, not a silent fallback.
//! The `Other` arm doubles as the answer for anything the classifiers could
//! not place.

use super::types::{Category, Department};

/// Public-health risks typically created by an issue of this kind.
pub fn health_risks(category: Category) -> &'static [&'static str] {
    match category {
        Category::Pothole => &["Accident risk", "Vehicle damage", "Pedestrian injuries"],
        Category::WasteOverflow => &[
            "Mosquito breeding",
            "Disease transmission",
            "Foul odor",
            "Rat infestation",
        ],
        Category::StreetlightOut => &[
            "Crime risk",
            "Accident risk at night",
            "Pedestrian safety concern",
        ],
        Category::TrafficSignalFault => {
            &["Traffic accidents", "Road rage incidents", "Congestion"]
        }
        Category::CarcassOnRoad => &[
            "Disease transmission",
            "Contamination of water/food",
            "Foul odor",
            "Fly breeding",
            "Public health emergency",
        ],
        Category::PublicToiletUnclean => &[
            "Disease transmission",
            "Bacterial infection risk",
            "Unhygienic conditions",
        ],
        Category::DamagedPathway => &[
            "Trip hazard",
            "Elderly fall risk",
            "Wheelchair accessibility issue",
        ],
        Category::Other => &["General safety concern"],
    }
}

/// Which municipal department owns this kind of issue.
pub fn department(category: Category) -> Department {
    match category {
        Category::Pothole | Category::DamagedPathway => Department::Pwd,
        Category::WasteOverflow => Department::Swm,
        Category::StreetlightOut => Department::Electrical,
        Category::TrafficSignalFault => Department::Traffic,
        Category::CarcassOnRoad => Department::Health,
        Category::PublicToiletUnclean => Department::Sanitation,
        Category::Other => Department::Helpdesk,
    }
}

/// Most likely proximate cause, phrased for the citizen-facing report.
pub fn possible_cause(category: Category) -> &'static str {
    match category {
        Category::Pothole => {
            "Heavy monsoon rainfall causing road surface deterioration and inadequate road maintenance"
        }
        Category::WasteOverflow => {
            "Irregular waste collection schedule and insufficient bin capacity for the area"
        }
        Category::StreetlightOut => {
            "Electrical fault or bulb/fixture damage due to weather or vandalism"
        }
        Category::TrafficSignalFault => "Electrical malfunction or timer system failure",
        Category::CarcassOnRoad => {
            "Stray animal death, requires immediate removal for public health"
        }
        Category::PublicToiletUnclean => {
            "Inadequate cleaning schedule and lack of regular maintenance"
        }
        Category::DamagedPathway => {
            "Weather erosion, heavy foot traffic, or poor initial construction"
        }
        Category::Other => "Requires further investigation to determine root cause",
    }
}

/// Ordered remediation steps. The first two double as the crew's
/// immediate actions.
pub fn next_steps(category: Category) -> &'static [&'static str] {
    match category {
        Category::Pothole => &[
            "Dispatch road repair team within 24 hours",
            "Set up warning signs and barriers",
            "Fill pothole with asphalt mixture",
            "Inspect surrounding area for additional damage",
        ],
        Category::WasteOverflow => &[
            "Send waste collection team immediately",
            "Clean and sanitize affected area",
            "Increase collection frequency for this location",
            "Add additional bins if needed",
        ],
        Category::StreetlightOut => &[
            "Send electrician to inspect within 12 hours",
            "Replace bulb or repair fixture",
            "Test electrical connections",
            "Add to regular maintenance schedule",
        ],
        Category::TrafficSignalFault => &[
            "Alert traffic police immediately",
            "Deploy manual traffic control",
            "Send technician for emergency repair",
            "Install temporary signals if needed",
        ],
        Category::CarcassOnRoad => &[
            "Dispatch health team immediately (within 2 hours)",
            "Remove and dispose of carcass safely",
            "Sanitize affected area thoroughly",
            "Investigate source and prevent recurrence",
        ],
        Category::PublicToiletUnclean => &[
            "Send sanitation team for deep cleaning",
            "Repair any damaged facilities",
            "Increase cleaning frequency",
            "Install hygiene monitoring system",
        ],
        Category::DamagedPathway => &[
            "Inspect extent of damage",
            "Set up barriers for safety",
            "Schedule repair work",
            "Resurface affected area",
        ],
        Category::Other => &[
            "Assess situation",
            "Assign to appropriate department",
            "Schedule site inspection",
        ],
    }
}

/// Equipment the dispatched crew should load before leaving.
pub fn required_equipment(category: Category) -> &'static [&'static str] {
    match category {
        Category::Pothole => &["Asphalt mixture", "Road roller", "Safety cones", "Jackhammer"],
        Category::WasteOverflow => &[
            "Garbage truck",
            "Cleaning tools",
            "Sanitizer",
            "Additional bins",
        ],
        Category::StreetlightOut => &[
            "Ladder",
            "Replacement bulbs",
            "Electrical testing equipment",
            "Safety gear",
        ],
        Category::TrafficSignalFault => &[
            "Signal repair tools",
            "Replacement parts",
            "Testing equipment",
            "Traffic cones",
        ],
        Category::CarcassOnRoad => &[
            "Protective suits",
            "Sanitizing equipment",
            "Body bags",
            "Disposal vehicle",
        ],
        Category::PublicToiletUnclean => &[
            "Cleaning supplies",
            "Disinfectants",
            "Repair tools",
            "Protective gear",
        ],
        Category::DamagedPathway => &[
            "Concrete mixer",
            "Paving stones",
            "Safety barriers",
            "Leveling tools",
        ],
        Category::Other => &["Standard municipal equipment"],
    }
}

pub fn safety_precautions(category: Category) -> &'static [&'static str] {
    match category {
        Category::Pothole => &[
            "Set up warning signs",
            "Use safety vests",
            "Divert traffic if needed",
        ],
        Category::WasteOverflow => &[
            "Wear protective gloves",
            "Use face masks",
            "Sanitize after work",
        ],
        Category::StreetlightOut => &[
            "Work during daylight if possible",
            "Use safety harness",
            "Follow electrical safety protocols",
        ],
        Category::TrafficSignalFault => &[
            "Coordinate with traffic police",
            "Use high-visibility clothing",
            "Work during low-traffic hours",
        ],
        Category::CarcassOnRoad => &[
            "Wear full protective equipment",
            "Follow biohazard protocols",
            "Sanitize all equipment",
            "Report to health department",
        ],
        Category::PublicToiletUnclean => &[
            "Wear protective gear",
            "Use proper ventilation",
            "Follow sanitation protocols",
        ],
        Category::DamagedPathway => &[
            "Cordon off work area",
            "Warn pedestrians",
            "Ensure proper lighting",
        ],
        Category::Other => &["Follow standard safety procedures"],
    }
}

/// Systemic cause behind the category, for the root-cause block.
pub fn root_cause(category: Category) -> &'static str {
    match category {
        Category::Pothole => {
            "Poor drainage system causing water accumulation and road deterioration"
        }
        Category::WasteOverflow => {
            "Inadequate waste collection frequency and insufficient bin capacity"
        }
        Category::StreetlightOut => {
            "Aging electrical infrastructure and lack of preventive maintenance"
        }
        Category::TrafficSignalFault => "Power fluctuations and lack of backup systems",
        Category::CarcassOnRoad => {
            "Stray animal population and lack of animal control measures"
        }
        Category::PublicToiletUnclean => {
            "Insufficient cleaning staff and lack of regular maintenance schedule"
        }
        Category::DamagedPathway => {
            "Heavy foot traffic combined with poor quality construction materials"
        }
        Category::Other => "Multiple factors contributing to infrastructure degradation",
    }
}

pub fn contributing_factors(category: Category) -> &'static [&'static str] {
    match category {
        Category::Pothole => &[
            "Heavy monsoon rainfall",
            "High traffic volume",
            "Poor quality asphalt",
            "Delayed maintenance",
        ],
        Category::WasteOverflow => &[
            "Population growth",
            "Irregular collection",
            "Insufficient bins",
            "Lack of segregation",
        ],
        Category::StreetlightOut => &["Weather damage", "Vandalism", "Power surges", "Old fixtures"],
        Category::TrafficSignalFault => &[
            "Power outages",
            "Component failure",
            "Weather conditions",
            "Lack of monitoring",
        ],
        Category::CarcassOnRoad => &[
            "Stray animal accidents",
            "Delayed reporting",
            "Limited cleanup resources",
        ],
        Category::PublicToiletUnclean => &[
            "High usage",
            "Insufficient cleaning",
            "Vandalism",
            "Water shortage",
        ],
        Category::DamagedPathway => &[
            "Weather erosion",
            "Tree roots",
            "Poor drainage",
            "Construction defects",
        ],
        Category::Other => &["Multiple environmental and human factors"],
    }
}

pub fn prevention_measures(category: Category) -> &'static [&'static str] {
    match category {
        Category::Pothole => &[
            "Regular road inspections",
            "Improved drainage",
            "Quality materials",
            "Timely repairs",
        ],
        Category::WasteOverflow => &[
            "Increase bin capacity",
            "More frequent collection",
            "Public awareness",
            "Waste segregation",
        ],
        Category::StreetlightOut => &[
            "Preventive maintenance",
            "LED upgrades",
            "Remote monitoring",
            "Quick response team",
        ],
        Category::TrafficSignalFault => &[
            "Backup power systems",
            "Regular testing",
            "Modern controllers",
            "24/7 monitoring",
        ],
        Category::CarcassOnRoad => &[
            "Animal control programs",
            "Quick response system",
            "Public reporting app",
            "Awareness campaigns",
        ],
        Category::PublicToiletUnclean => &[
            "More cleaning staff",
            "Regular schedules",
            "User feedback system",
            "Better facilities",
        ],
        Category::DamagedPathway => &[
            "Quality construction",
            "Regular maintenance",
            "Proper drainage",
            "Tree management",
        ],
        Category::Other => &["Regular monitoring and preventive maintenance"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::types::Category;

    #[test]
    fn every_category_has_complete_reference_data() {
        for cat in Category::ALL {
            assert!(!health_risks(cat).is_empty(), "health risks for {cat:?}");
            assert!(!next_steps(cat).is_empty(), "next steps for {cat:?}");
            assert!(
                !required_equipment(cat).is_empty(),
                "equipment for {cat:?}"
            );
            assert!(
                !safety_precautions(cat).is_empty(),
                "precautions for {cat:?}"
            );
            assert!(
                !contributing_factors(cat).is_empty(),
                "factors for {cat:?}"
            );
            assert!(
                !prevention_measures(cat).is_empty(),
                "prevention for {cat:?}"
            );
            assert!(!possible_cause(cat).is_empty());
            assert!(!root_cause(cat).is_empty());
        }
    }

    #[test]
    fn department_routing_matches_municipal_ownership() {
        assert_eq!(department(Category::Pothole), Department::Pwd);
        assert_eq!(department(Category::DamagedPathway), Department::Pwd);
        assert_eq!(department(Category::WasteOverflow), Department::Swm);
        assert_eq!(department(Category::StreetlightOut), Department::Electrical);
        assert_eq!(department(Category::TrafficSignalFault), Department::Traffic);
        assert_eq!(department(Category::CarcassOnRoad), Department::Health);
        assert_eq!(
            department(Category::PublicToiletUnclean),
            Department::Sanitation
        );
        assert_eq!(department(Category::Other), Department::Helpdesk);
    }

    #[test]
    fn immediate_actions_source_has_at_least_two_steps() {
        // Staff instructions take the first two next-steps entries, so every
        // category must provide at least two.
        for cat in Category::ALL {
            assert!(next_steps(cat).len() >= 2, "next steps for {cat:?}");
        }
    }
}
