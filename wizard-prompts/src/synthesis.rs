//! Instruction wrapping the assembled document for final synthesis.

use crate::template::{InstructionTemplate, TemplateResult, TemplateVars};

const SYNTHESIS_TEMPLATE: &str = "Turn the following requirements into a structured, detailed prompt:\n\n\
{{document}}\n\n\
The prompt must include:\n\
1. A precise description of the website and its goals\n\
2. Details of the target audience\n\
3. The technical requirements and the technology to use\n\
4. Design details and visual identity\n\
5. Any other important requirements";

/// Builds the final-generation instruction around `document`.
///
/// # Errors
///
/// Propagates [`crate::template::TemplateError`] from rendering.
pub fn synthesis_instruction(document: &str) -> TemplateResult<String> {
    let mut vars = TemplateVars::new();
    vars.insert("document".into(), document.to_owned());
    InstructionTemplate::new(SYNTHESIS_TEMPLATE).render(&vars)
}
