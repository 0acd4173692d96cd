//! Vision identification prompts.

use super::sanitize_inline;

/// System instruction for the identification call. The subject is always
/// equipment, never a person; the reply must be one technical sentence the
/// planning stage can consume verbatim.
pub const VISION_SYSTEM_PROMPT: &str = r#"You are analyzing an image of hardware, tools, or equipment for a technical assistance application. The image never shows a person - only electronic components, machinery, plumbing, appliances, or similar objects.

Describe what you see in a single technical sentence using this format:
[Component Type], [Current State], [Key Technical Features].

Examples:
- "Raspberry Pi 4 board, unpowered, 40-pin GPIO header visible"
- "Arduino Uno microcontroller, USB port visible, no power LED"
- "PVC pipe fitting, P-trap disconnected, threaded connections visible"
- "Car engine bay, dipstick removed, oil cap visible"

Be precise and technical. No speculation beyond what is visible."#;

/// User prompt for the identification call; the goal steers attention toward
/// the relevant features.
pub fn build_vision_user_prompt(user_goal: &str) -> String {
    format!(
        "Identify the equipment in this image for task assistance. \
         The user wants to: {}. \
         Focus on the type of device, its current state \
         (powered/unpowered/assembled/disassembled), and any visible \
         technical features such as ports, connectors, or labels.",
        sanitize_inline(user_goal)
    )
}
