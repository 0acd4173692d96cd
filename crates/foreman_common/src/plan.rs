//! Plan domain model and the strict JSON Schemas sent with each planning call.
//!
//! Two target schemas exist: the canonical labeled-step list returned by the
//! pipeline, and the chronological task plan used by the secondary planning
//! operation. One deployment picks one canonical step count (5 or 6); the
//! schema builder bakes it in as minItems == maxItems.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Incoming plan request: a base64 image (possibly data-URI wrapped) and the
/// user's goal. Immutable; discarded once the pipeline completes or fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub image_data: String,
    pub user_goal: String,
}

/// One discrete physical action: a labeled safe target, the unsafe
/// alternative to avoid, and the explanatory text around both.
///
/// `sequence` numbers are dense and 1-based within a plan; order is
/// chronological execution order and is preserved end-to-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub sequence: u32,
    pub target_label: String,
    pub required_value: String,
    pub correct_target: String,
    pub unsafe_alternative: String,
    pub rationale_text: String,
    pub warning_text: String,
    /// Reference diagram URL; empty when no diagram applies.
    pub diagram_url: String,
    pub requires_verification: bool,
    pub verification_criteria: String,
}

/// Safety classification for a chronological plan action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLevel {
    Safe,
    Caution,
    Warning,
}

impl SafetyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Caution => "caution",
            Self::Warning => "warning",
        }
    }
}

/// One action in a chronological task plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanAction {
    pub step_number: u32,
    pub action: String,
    pub component: String,
    pub safety_level: SafetyLevel,
    pub estimated_time_seconds: u32,
}

/// Common error condition with recovery guidance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorState {
    pub error_name: String,
    pub symptoms: Vec<String>,
    pub recovery_steps: Vec<String>,
}

/// Complete chronological task plan (secondary target schema).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPlan {
    pub identified_component: String,
    pub component_state: String,
    pub goal: String,
    pub plan_steps: Vec<PlanAction>,
    pub common_errors: Vec<ErrorState>,
    pub total_estimated_time_seconds: u32,
}

/// Strict schema for a fixed-length labeled-step plan.
///
/// The array is wrapped in a `steps`-keyed object because the upstream API
/// rejects top-level arrays in strict mode.
pub fn step_list_schema(plan_length: usize) -> Value {
    json!({
        "type": "object",
        "properties": {
            "steps": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "sequence": {"type": "integer", "minimum": 1},
                        "target_label": {"type": "string", "description": "Physical label on the hardware, e.g. 'GPIO Pin 17'"},
                        "required_value": {"type": "string", "description": "Specific value or tool needed, e.g. '220 ohm resistor'"},
                        "correct_target": {"type": "string", "description": "Correct connection point or location"},
                        "unsafe_alternative": {"type": "string", "description": "Common dangerous mistake to avoid"},
                        "rationale_text": {"type": "string", "description": "Why this step matters and how to do it"},
                        "warning_text": {"type": "string", "description": "What goes wrong with the unsafe alternative and why"},
                        "diagram_url": {"type": "string", "description": "Reference diagram URL, empty string when none applies"},
                        "requires_verification": {"type": "boolean"},
                        "verification_criteria": {"type": "string", "description": "What a completion photo must show"}
                    },
                    "required": [
                        "sequence",
                        "target_label",
                        "required_value",
                        "correct_target",
                        "unsafe_alternative",
                        "rationale_text",
                        "warning_text",
                        "diagram_url",
                        "requires_verification",
                        "verification_criteria"
                    ],
                    "additionalProperties": false
                },
                "minItems": plan_length,
                "maxItems": plan_length
            }
        },
        "required": ["steps"],
        "additionalProperties": false
    })
}

/// Strict schema for the chronological task plan.
pub fn task_plan_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "identified_component": {"type": "string"},
            "component_state": {"type": "string"},
            "goal": {"type": "string"},
            "plan_steps": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "step_number": {"type": "integer", "minimum": 1},
                        "action": {"type": "string"},
                        "component": {"type": "string"},
                        "safety_level": {"type": "string", "enum": ["safe", "caution", "warning"]},
                        "estimated_time_seconds": {"type": "integer", "minimum": 1}
                    },
                    "required": ["step_number", "action", "component", "safety_level", "estimated_time_seconds"],
                    "additionalProperties": false
                },
                "minItems": 1
            },
            "common_errors": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "error_name": {"type": "string"},
                        "symptoms": {"type": "array", "items": {"type": "string"}, "minItems": 1},
                        "recovery_steps": {"type": "array", "items": {"type": "string"}, "minItems": 1}
                    },
                    "required": ["error_name", "symptoms", "recovery_steps"],
                    "additionalProperties": false
                },
                "minItems": 1,
                "maxItems": 3
            },
            "total_estimated_time_seconds": {"type": "integer", "minimum": 1}
        },
        "required": [
            "identified_component",
            "component_state",
            "goal",
            "plan_steps",
            "common_errors",
            "total_estimated_time_seconds"
        ],
        "additionalProperties": false
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_list_schema_fixes_count() {
        let schema = step_list_schema(5);
        assert_eq!(schema["properties"]["steps"]["minItems"], 5);
        assert_eq!(schema["properties"]["steps"]["maxItems"], 5);

        let schema = step_list_schema(6);
        assert_eq!(schema["properties"]["steps"]["maxItems"], 6);
    }

    #[test]
    fn test_step_list_schema_requires_every_field() {
        let schema = step_list_schema(6);
        let required = schema["properties"]["steps"]["items"]["required"]
            .as_array()
            .unwrap();
        assert_eq!(required.len(), 10);
        assert!(required.iter().any(|f| f == "target_label"));
        assert!(required.iter().any(|f| f == "diagram_url"));
    }

    #[test]
    fn test_safety_level_wire_names() {
        assert_eq!(
            serde_json::to_string(&SafetyLevel::Caution).unwrap(),
            "\"caution\""
        );
        let level: SafetyLevel = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(level, SafetyLevel::Warning);
    }

    #[test]
    fn test_plan_step_round_trip() {
        let step = PlanStep {
            sequence: 1,
            target_label: "GPIO Pin 17".to_string(),
            required_value: "220 ohm resistor".to_string(),
            correct_target: "Pin 17".to_string(),
            unsafe_alternative: "5V Pin".to_string(),
            rationale_text: "Limits current to the LED.".to_string(),
            warning_text: "5V would burn out the LED.".to_string(),
            diagram_url: String::new(),
            requires_verification: true,
            verification_criteria: "Resistor seated in holes 7 and 9".to_string(),
        };
        let json = serde_json::to_string(&step).unwrap();
        let back: PlanStep = serde_json::from_str(&json).unwrap();
        assert_eq!(back, step);
    }

    #[test]
    fn test_task_plan_schema_bounds_errors() {
        let schema = task_plan_schema();
        assert_eq!(schema["properties"]["common_errors"]["minItems"], 1);
        assert_eq!(schema["properties"]["common_errors"]["maxItems"], 3);
    }
}
