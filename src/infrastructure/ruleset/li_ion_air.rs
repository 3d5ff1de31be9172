//! Lithium battery air classification
//!
//! Produces a dangerous-goods profile for batteries shipped by air. The
//! shipper declaration threshold is a placeholder until the carrier tables
//! are modelled.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::workflow::{Ruleset, RulesetInputs, WorkflowError};

pub const LI_ION_AIR_V1: &str = "ruleset_li_ion_air_v1";

/// Packing instruction for lithium-ion cells and batteries
const PI_LITHIUM_ION: &str = "PI965";

/// Packing instruction for lithium metal cells and batteries
const PI_LITHIUM_METAL: &str = "PI968";

/// Packages above this count need a shipper declaration
const MAX_QTY_WITHOUT_DECLARATION: f64 = 2.0;

/// Watt-hour or lithium content that needs a shipper declaration
static HIGH_CONTENT_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(^9\d|1\d\d)").unwrap());

/// Dangerous-goods profile computed for a shipment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DgProfile {
    pub un: String,
    pub pi: String,
    pub requires_shipper_decl: bool,
    pub labels: Vec<String>,
}

/// Inputs: `un_number`, `wh_or_li_content`, `qty_per_pkg`, `pi_candidate`,
/// `battery_configuration`
#[derive(Debug, Default, Clone, Copy)]
pub struct LiIonAirRuleset;

impl LiIonAirRuleset {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, inputs: &RulesetInputs) -> DgProfile {
        let un_number = text_input(inputs, "un_number");
        let content = text_input(inputs, "wh_or_li_content");
        let pi_candidate = text_input(inputs, "pi_candidate");
        let qty_per_pkg = number_input(inputs, "qty_per_pkg");

        let is_li_ion = un_number.starts_with("UN348");

        let pi = if !pi_candidate.is_empty() && pi_candidate != "unknown" {
            pi_candidate
        } else if is_li_ion {
            PI_LITHIUM_ION.to_string()
        } else {
            PI_LITHIUM_METAL.to_string()
        };

        let requires_shipper_decl =
            qty_per_pkg > MAX_QTY_WITHOUT_DECLARATION || HIGH_CONTENT_PATTERN.is_match(&content);

        let label = if requires_shipper_decl {
            "Class 9"
        } else {
            "Lithium Battery Mark"
        };

        DgProfile {
            un: un_number,
            pi,
            requires_shipper_decl,
            labels: vec![label.to_string()],
        }
    }
}

impl Ruleset for LiIonAirRuleset {
    fn name(&self) -> &str {
        LI_ION_AIR_V1
    }

    fn compute(&self, inputs: &RulesetInputs) -> Result<Value, WorkflowError> {
        let profile = self.classify(inputs);

        serde_json::to_value(&profile)
            .map_err(|e| WorkflowError::ruleset_execution(LI_ION_AIR_V1, e.to_string()))
    }
}

/// Missing, null, false and zero inputs read as empty text
fn text_input(inputs: &RulesetInputs, key: &str) -> String {
    match inputs.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) if n.as_f64() != Some(0.0) => n.to_string(),
        Some(Value::Bool(true)) => "true".to_string(),
        _ => String::new(),
    }
}

/// Non-numeric inputs read as zero
fn number_input(inputs: &RulesetInputs, key: &str) -> f64 {
    match inputs.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or_default(),
        Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inputs(pairs: &[(&str, Value)]) -> RulesetInputs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_lithium_ion_defaults() {
        let profile = LiIonAirRuleset::new().classify(&inputs(&[
            ("un_number", json!("UN3481")),
            ("wh_or_li_content", json!("50")),
            ("qty_per_pkg", json!(1)),
        ]));

        assert_eq!(profile.un, "UN3481");
        assert_eq!(profile.pi, "PI965");
        assert!(!profile.requires_shipper_decl);
        assert_eq!(profile.labels, vec!["Lithium Battery Mark"]);
    }

    #[test]
    fn test_lithium_metal_defaults_to_pi968() {
        let profile = LiIonAirRuleset::new().classify(&inputs(&[
            ("un_number", json!("UN3090")),
            ("pi_candidate", json!("unknown")),
        ]));

        assert_eq!(profile.pi, "PI968");
    }

    #[test]
    fn test_pi_candidate_overrides_default() {
        let profile = LiIonAirRuleset::new().classify(&inputs(&[
            ("un_number", json!("UN3480")),
            ("pi_candidate", json!("PI966")),
        ]));

        assert_eq!(profile.pi, "PI966");
    }

    #[test]
    fn test_quantity_requires_declaration() {
        let profile = LiIonAirRuleset::new().classify(&inputs(&[
            ("un_number", json!("UN3480")),
            ("wh_or_li_content", json!("20")),
            ("qty_per_pkg", json!("3")),
        ]));

        assert!(profile.requires_shipper_decl);
        assert_eq!(profile.labels, vec!["Class 9"]);
    }

    #[test]
    fn test_high_content_requires_declaration() {
        let ruleset = LiIonAirRuleset::new();

        for content in ["95", "120Wh", "2.160"] {
            let profile = ruleset.classify(&inputs(&[
                ("un_number", json!("UN3480")),
                ("wh_or_li_content", json!(content)),
                ("qty_per_pkg", json!(1)),
            ]));
            assert!(profile.requires_shipper_decl, "content {}", content);
        }

        let profile = ruleset.classify(&inputs(&[("wh_or_li_content", json!("85"))]));
        assert!(!profile.requires_shipper_decl);
    }

    #[test]
    fn test_numeric_content_is_read_as_text() {
        let profile = LiIonAirRuleset::new().classify(&inputs(&[
            ("un_number", json!("UN3480")),
            ("wh_or_li_content", json!(99)),
        ]));

        assert!(profile.requires_shipper_decl);
    }

    #[test]
    fn test_missing_inputs() {
        let profile = LiIonAirRuleset::new().classify(&RulesetInputs::new());

        assert_eq!(profile.un, "");
        assert_eq!(profile.pi, "PI968");
        assert!(!profile.requires_shipper_decl);
    }

    #[test]
    fn test_compute_returns_profile_object() {
        let value = LiIonAirRuleset::new()
            .compute(&inputs(&[("un_number", json!("UN3480"))]))
            .unwrap();

        assert_eq!(value["un"], json!("UN3480"));
        assert_eq!(value["pi"], json!("PI965"));
        assert_eq!(value["requires_shipper_decl"], json!(false));
        assert_eq!(value["labels"], json!(["Lithium Battery Mark"]));
    }
}
