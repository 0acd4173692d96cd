//! Planning prompts: labeled-step plans (combined and two-stage) and the
//! chronological task plan.

use super::sanitize_inline;

/// Instruction appended after the model stops requesting tools, before the
/// single strict-schema call that produces the final answer. A turn that
/// accepts arbitrary tool use cannot also enforce a strict output schema, so
/// the loop switches modes here.
pub const FINALIZE_INSTRUCTION: &str =
    "Now restate your complete plan as JSON conforming exactly to the provided schema.";

/// System prompt for the combined single-call path: vision, planning, and
/// optional web search in one conversation.
pub fn build_combined_system_prompt(plan_length: usize) -> String {
    format!(
        r#"You are Foreman, a patient tutor who guides complete beginners through manual tasks across all domains: electronics, plumbing, automotive, home repair, carpentry, and appliance maintenance.

PERSONA:
- Patient, encouraging, and extremely descriptive
- Simple language, no assumed prior knowledge
- Explain the purpose (the why) before the instructions (the how)

STEP REQUIREMENTS:
1. Produce EXACTLY {n} distinct, sequential steps - not {fewer}, not {more}.
2. Each step covers ONE physical action or component. Split compound actions
   (prepare first part, prepare second part, connect them) into separate steps.
3. For every step populate:
   - target_label: the physical label on the hardware (e.g. "GPIO Pin 17", "Hot Water Valve")
   - required_value: the specific value or tool needed (e.g. "220 ohm resistor", "8mm wrench")
   - correct_target: the correct connection point or location
   - unsafe_alternative: the common dangerous mistake to avoid
   - rationale_text: two or three short paragraphs - why the step matters, then the exact physical movements, then what success looks like
   - warning_text: exactly what goes wrong with the unsafe alternative and why, with a beginner-friendly analogy
   - requires_verification: true when the user should photograph completion before moving on
   - verification_criteria: what the photo must show

WEB SEARCH:
- When the plan references specific pins, connectors, or fittings, use the
  web_search tool to find a pinout or technical diagram.
- Put the found URL in diagram_url for the FIRST step only; other steps use an
  empty string.

LABELING:
- Adapt terminology to the task domain (electronics pins, plumbing fittings,
  automotive fasteners).

Output exactly {n} steps in valid JSON conforming to the schema."#,
        n = plan_length,
        fewer = plan_length.saturating_sub(1),
        more = plan_length + 1,
    )
}

/// User prompt for the combined single-call path.
pub fn build_combined_user_prompt(user_goal: &str, plan_length: usize) -> String {
    format!(
        "Analyze this image and generate a beginner-friendly task plan with \
         exactly {} detailed steps for: {}. Break compound actions into \
         separate steps, use physical labels, and search for a technical \
         diagram URL for step 1.",
        plan_length,
        sanitize_inline(user_goal)
    )
}

/// System prompt for the two-stage planning call, fed the vision stage's
/// description.
pub fn build_plan_system_prompt(context: &str, plan_length: usize) -> String {
    format!(
        r#"You are a universal task planning expert skilled in electronics, plumbing, automotive, carpentry, appliance repair, and general handyman work.

Based on the context: {context} - generate a {n}-step, chronologically optimal and SAFE task plan.

For each step include:
1. The safe action, location, or component to use (the correct choice)
2. The unsafe alternative (the common mistake to avoid)
3. Detailed rationale explaining why the safe option is correct
4. A safety-focused warning explaining why the unsafe option is dangerous

Examples across domains:
- Electronics: connect to GPIO 14 (safe) vs the 5V pin (unsafe - can destroy the component)
- Plumbing: tighten the P-trap hand-tight (safe) vs with a pipe wrench (unsafe - cracks the fitting)
- Automotive: check oil with the engine cold (safe) vs hot (unsafe - burn risk)

The output MUST conform exactly to the provided JSON Schema."#,
        context = sanitize_inline(context),
        n = plan_length,
    )
}

/// User prompt for the two-stage planning call.
pub fn build_plan_user_prompt(context: &str, user_goal: &str, plan_length: usize) -> String {
    format!(
        "Context: {}\nUser Goal: {}\n\nGenerate a complete {}-step task plan \
         with safety guidance. Adapt the terminology to the task domain.",
        sanitize_inline(context),
        sanitize_inline(user_goal),
        plan_length
    )
}

/// System prompt for the chronological task plan operation.
pub fn build_task_plan_system_prompt(component: &str, component_state: &str) -> String {
    format!(
        r#"You are a specialized hardware architect with expertise in {component}.

Generate a safe, chronologically optimal plan to achieve the user's goal.

REQUIREMENTS:
1. Steps in strict chronological order
2. A safety level per step: "safe", "caution", or "warning"
3. Realistic time estimates for each step
4. At least one common error state with recovery steps
5. Focus on {component} in its current state: {state}

Respond with valid JSON matching the exact schema provided."#,
        component = sanitize_inline(component),
        state = sanitize_inline(component_state),
    )
}

/// User prompt for the chronological task plan operation.
pub fn build_task_plan_user_prompt(
    component: &str,
    component_state: &str,
    user_goal: &str,
) -> String {
    format!(
        "Hardware: {}\nCurrent State: {}\nUser Goal: {}\n\nGenerate a complete, safe task plan.",
        sanitize_inline(component),
        sanitize_inline(component_state),
        sanitize_inline(user_goal)
    )
}
