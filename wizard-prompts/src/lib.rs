//! Instruction text for the prompt wizard.
//!
//! Holds the built-in step catalog, the per-field suggestion briefs with their
//! fallback sets, and the final synthesis instruction.

#![warn(missing_docs, clippy::pedantic)]

pub mod catalog;
pub mod suggestions;
pub mod synthesis;
pub mod template;

pub use catalog::builtin_steps;
pub use suggestions::{DEFAULT_SET_LEN, SuggestionBrief, SuggestionContext};
pub use synthesis::synthesis_instruction;
pub use template::{InstructionTemplate, TemplateError, TemplateResult, TemplateVars};
