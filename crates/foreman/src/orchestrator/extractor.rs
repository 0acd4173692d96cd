//! Structured output extractor & validator.
//!
//! Takes the model's final JSON text and produces a fully-typed plan or a
//! classified error. Validation walks the raw `Value` field by field so the
//! error can name the first offending field and the violated constraint;
//! there is no partial acceptance of a malformed entity.

use foreman_common::{
    ErrorState, ForemanError, PlanAction, PlanStep, SafetyLevel, TaskPlan,
};
use serde_json::{Map, Value};
use url::Url;

/// Parse and validate a fixed-length labeled-step list.
///
/// Accepts the canonical `{"steps": [...]}` wrapping (strict mode rejects
/// top-level arrays) and, for older deployments, a bare array root.
pub fn extract_steps(raw: &str, expected_len: usize) -> Result<Vec<PlanStep>, ForemanError> {
    let root: Value = serde_json::from_str(raw)
        .map_err(|e| ForemanError::malformed(format!("not valid JSON: {}", e), raw))?;

    let items: &[Value] = match &root {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => map
            .get("steps")
            .and_then(|v| v.as_array())
            .map(|a| a.as_slice())
            .ok_or_else(|| ForemanError::schema("steps", "array field"))?,
        _ => return Err(ForemanError::schema("steps", "array or wrapping object")),
    };

    if items.len() != expected_len {
        return Err(ForemanError::schema(
            "steps",
            format!("exactly {} items, got {}", expected_len, items.len()),
        ));
    }

    let mut steps = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        steps.push(parse_step(item, index)?);
    }

    // Sequence numbers are dense, 1-based, and in chronological order.
    for (index, step) in steps.iter().enumerate() {
        let expected = (index + 1) as u32;
        if step.sequence != expected {
            return Err(ForemanError::schema(
                format!("steps[{}].sequence", index),
                format!("dense sequence number {}", expected),
            ));
        }
    }

    Ok(steps)
}

fn parse_step(item: &Value, index: usize) -> Result<PlanStep, ForemanError> {
    let path = |field: &str| format!("steps[{}].{}", index, field);

    let obj = item
        .as_object()
        .ok_or_else(|| ForemanError::schema(format!("steps[{}]", index), "object"))?;

    let sequence = require_positive_int(obj, "sequence", &path("sequence"))? as u32;
    let target_label = require_string(obj, "target_label", &path("target_label"))?;
    let required_value = require_string(obj, "required_value", &path("required_value"))?;
    let correct_target = require_string(obj, "correct_target", &path("correct_target"))?;
    let unsafe_alternative =
        require_string(obj, "unsafe_alternative", &path("unsafe_alternative"))?;
    let rationale_text = require_string(obj, "rationale_text", &path("rationale_text"))?;
    let warning_text = require_string(obj, "warning_text", &path("warning_text"))?;
    let requires_verification =
        require_bool(obj, "requires_verification", &path("requires_verification"))?;
    let verification_criteria =
        require_string(obj, "verification_criteria", &path("verification_criteria"))?;

    // diagram_url is the one field where empty is a valid value.
    let diagram_url = obj
        .get("diagram_url")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ForemanError::schema(path("diagram_url"), "string"))?
        .to_string();
    if !diagram_url.is_empty() && Url::parse(&diagram_url).is_err() {
        return Err(ForemanError::schema(
            path("diagram_url"),
            "well-formed URL or empty string",
        ));
    }

    Ok(PlanStep {
        sequence,
        target_label,
        required_value,
        correct_target,
        unsafe_alternative,
        rationale_text,
        warning_text,
        diagram_url,
        requires_verification,
        verification_criteria,
    })
}

/// Parse and validate a chronological task plan.
pub fn extract_task_plan(raw: &str) -> Result<TaskPlan, ForemanError> {
    let root: Value = serde_json::from_str(raw)
        .map_err(|e| ForemanError::malformed(format!("not valid JSON: {}", e), raw))?;
    let obj = root
        .as_object()
        .ok_or_else(|| ForemanError::schema("plan", "object root"))?;

    let identified_component =
        require_string(obj, "identified_component", "identified_component")?;
    let component_state = require_string(obj, "component_state", "component_state")?;
    let goal = require_string(obj, "goal", "goal")?;

    let steps_value = obj
        .get("plan_steps")
        .and_then(|v| v.as_array())
        .ok_or_else(|| ForemanError::schema("plan_steps", "array field"))?;
    if steps_value.is_empty() {
        return Err(ForemanError::schema("plan_steps", "at least 1 item"));
    }

    let mut plan_steps = Vec::with_capacity(steps_value.len());
    for (index, item) in steps_value.iter().enumerate() {
        plan_steps.push(parse_plan_action(item, index)?);
    }

    let errors_value = obj
        .get("common_errors")
        .and_then(|v| v.as_array())
        .ok_or_else(|| ForemanError::schema("common_errors", "array field"))?;
    if errors_value.is_empty() || errors_value.len() > 3 {
        return Err(ForemanError::schema("common_errors", "between 1 and 3 items"));
    }

    let mut common_errors = Vec::with_capacity(errors_value.len());
    for (index, item) in errors_value.iter().enumerate() {
        common_errors.push(parse_error_state(item, index)?);
    }

    let total_estimated_time_seconds = require_positive_int(
        obj,
        "total_estimated_time_seconds",
        "total_estimated_time_seconds",
    )? as u32;

    Ok(TaskPlan {
        identified_component,
        component_state,
        goal,
        plan_steps,
        common_errors,
        total_estimated_time_seconds,
    })
}

fn parse_plan_action(item: &Value, index: usize) -> Result<PlanAction, ForemanError> {
    let path = |field: &str| format!("plan_steps[{}].{}", index, field);

    let obj = item
        .as_object()
        .ok_or_else(|| ForemanError::schema(format!("plan_steps[{}]", index), "object"))?;

    let step_number = require_positive_int(obj, "step_number", &path("step_number"))? as u32;
    let action = require_string(obj, "action", &path("action"))?;
    let component = require_string(obj, "component", &path("component"))?;

    let safety_level = match obj.get("safety_level").and_then(|v| v.as_str()) {
        Some("safe") => SafetyLevel::Safe,
        Some("caution") => SafetyLevel::Caution,
        Some("warning") => SafetyLevel::Warning,
        _ => {
            return Err(ForemanError::schema(
                path("safety_level"),
                "one of safe|caution|warning",
            ))
        }
    };

    let estimated_time_seconds =
        require_positive_int(obj, "estimated_time_seconds", &path("estimated_time_seconds"))?
            as u32;

    Ok(PlanAction {
        step_number,
        action,
        component,
        safety_level,
        estimated_time_seconds,
    })
}

fn parse_error_state(item: &Value, index: usize) -> Result<ErrorState, ForemanError> {
    let path = |field: &str| format!("common_errors[{}].{}", index, field);

    let obj = item
        .as_object()
        .ok_or_else(|| ForemanError::schema(format!("common_errors[{}]", index), "object"))?;

    let error_name = require_string(obj, "error_name", &path("error_name"))?;
    let symptoms = require_string_list(obj, "symptoms", &path("symptoms"))?;
    let recovery_steps = require_string_list(obj, "recovery_steps", &path("recovery_steps"))?;

    Ok(ErrorState {
        error_name,
        symptoms,
        recovery_steps,
    })
}

fn require_string(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<String, ForemanError> {
    let value = obj
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ForemanError::schema(path, "string"))?;
    if value.is_empty() {
        return Err(ForemanError::schema(path, "non-empty string"));
    }
    Ok(value.to_string())
}

fn require_positive_int(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<u64, ForemanError> {
    let value = obj
        .get(key)
        .and_then(|v| v.as_u64())
        .ok_or_else(|| ForemanError::schema(path, "integer >= 1"))?;
    if value < 1 {
        return Err(ForemanError::schema(path, "integer >= 1"));
    }
    Ok(value)
}

fn require_bool(obj: &Map<String, Value>, key: &str, path: &str) -> Result<bool, ForemanError> {
    obj.get(key)
        .and_then(|v| v.as_bool())
        .ok_or_else(|| ForemanError::schema(path, "boolean"))
}

fn require_string_list(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<Vec<String>, ForemanError> {
    let items = obj
        .get(key)
        .and_then(|v| v.as_array())
        .ok_or_else(|| ForemanError::schema(path, "array of strings"))?;
    if items.is_empty() {
        return Err(ForemanError::schema(path, "at least 1 item"));
    }
    items
        .iter()
        .map(|v| {
            v.as_str()
                .map(|s| s.to_string())
                .ok_or_else(|| ForemanError::schema(path, "array of strings"))
        })
        .collect()
}
