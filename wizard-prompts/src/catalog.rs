//! Built-in website-brief step catalog.

use wizard_primitives::{FieldId, Result, SelectionPolicy, Step, ValidationGate};

/// Field holding the project goal and type.
pub const GOAL: &str = "goal";
/// Field holding the target audience.
pub const AUDIENCE: &str = "audience";
/// Field holding the technical requirements.
pub const REQUIREMENTS: &str = "requirements";
/// Field holding the design direction.
pub const DESIGN: &str = "design";

/// The four built-in steps, in order.
///
/// # Errors
///
/// Only fails if a built-in descriptor is malformed.
pub fn builtin_steps() -> Result<Vec<Step>> {
    Ok(vec![
        Step::builder(FieldId::new(GOAL)?)
            .title("Project goal")?
            .description("What is the goal and type of the website?")
            .hint("e.g. an online store for handmade jewellery")
            .gate(ValidationGate::NonEmpty)
            .suggestion_gate(ValidationGate::MinWords(2))
            .selection(SelectionPolicy::Exclusive)
            .build()?,
        Step::builder(FieldId::new(AUDIENCE)?)
            .title("Target audience")?
            .description("Who is the website for?")
            .hint("Age group, interests, language, country")
            .gate(ValidationGate::NonEmpty)
            .build()?,
        Step::builder(FieldId::new(REQUIREMENTS)?)
            .title("Technical requirements")?
            .description("Which features and technologies does the website need?")
            .gate(ValidationGate::MinChars(5))
            .build()?,
        Step::builder(FieldId::new(DESIGN)?)
            .title("Design and look")?
            .description("How should the website look and feel?")
            .hint("Colours, typography, overall style")
            .gate(ValidationGate::MinChars(5))
            .action_label("Get prompt")
            .build()?,
    ])
}
