//! Prompt templates for the vision and planning calls.
//!
//! Prompts are pure string templates with enumerated inputs, kept apart from
//! the retry and validation logic so they can be swapped without touching
//! control flow. Runtime values pass through `sanitize_inline` before
//! embedding; raw newlines inside an inlined value have corrupted upstream
//! requests before.

pub mod planner;
pub mod vision;

pub use planner::*;
pub use vision::*;

/// Collapse CR/LF/tab runs to single spaces and trim.
pub fn sanitize_inline(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut last_was_space = false;
    for ch in value.chars() {
        let ch = if ch == '\n' || ch == '\r' || ch == '\t' {
            ' '
        } else {
            ch
        };
        if ch == ' ' {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}
