//! Step descriptors bound to wizard fields.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Error, Result};
use crate::ids::FieldId;

const MAX_TITLE_LEN: usize = 96;

/// Rule a field value must satisfy before the wizard moves past its step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "min", rename_all = "snake_case")]
pub enum ValidationGate {
    /// Any value is accepted, including an empty one.
    #[default]
    Open,
    /// The trimmed value must not be empty.
    NonEmpty,
    /// The trimmed value must contain at least this many characters.
    MinChars(usize),
    /// The value must contain at least this many whitespace-separated words.
    MinWords(usize),
}

impl ValidationGate {
    /// Checks the supplied value against the gate.
    ///
    /// # Errors
    ///
    /// Returns a [`GateViolation`] describing why the value was rejected.
    pub fn check(self, value: &str) -> std::result::Result<(), GateViolation> {
        let trimmed = value.trim();
        match self {
            Self::Open => Ok(()),
            Self::NonEmpty if trimmed.is_empty() => Err(GateViolation::Empty),
            Self::NonEmpty => Ok(()),
            Self::MinChars(min) => {
                let actual = trimmed.chars().count();
                if actual < min {
                    Err(GateViolation::TooShort { min, actual })
                } else {
                    Ok(())
                }
            }
            Self::MinWords(min) => {
                let actual = trimmed.split_whitespace().count();
                if actual < min {
                    Err(GateViolation::TooFewWords { min, actual })
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Reason a value failed its [`ValidationGate`].
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum GateViolation {
    /// The value was blank.
    #[error("value is required")]
    Empty,
    /// The value had fewer characters than required.
    #[error("value must be at least {min} characters (got {actual})")]
    TooShort {
        /// Minimum accepted length.
        min: usize,
        /// Observed trimmed length.
        actual: usize,
    },
    /// The value had fewer words than required.
    #[error("value must contain at least {min} words (got {actual})")]
    TooFewWords {
        /// Minimum accepted word count.
        min: usize,
        /// Observed word count.
        actual: usize,
    },
}

/// How toggling one suggestion affects the others offered for the same field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Every suggestion is selected or deselected on its own.
    #[default]
    Independent,
    /// Selecting a suggestion deselects every other one for the field.
    Exclusive,
}

/// Static descriptor of one wizard step, bound to a single field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    field: FieldId,
    title: String,
    description: String,
    hint: Option<String>,
    gate: ValidationGate,
    suggestion_gate: Option<ValidationGate>,
    selection: SelectionPolicy,
    action_label: Option<String>,
}

impl Step {
    /// Starts building a step bound to the supplied field.
    #[must_use]
    pub fn builder(field: FieldId) -> StepBuilder {
        StepBuilder {
            field,
            title: None,
            description: String::new(),
            hint: None,
            gate: ValidationGate::default(),
            suggestion_gate: None,
            selection: SelectionPolicy::default(),
            action_label: None,
        }
    }

    /// Identifier of the field this step edits.
    #[must_use]
    pub fn field(&self) -> &FieldId {
        &self.field
    }

    /// Section title, also used as the heading in the assembled document.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Question shown under the title.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Placeholder or example text for the input.
    #[must_use]
    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    /// Gate checked before moving forward.
    #[must_use]
    pub const fn gate(&self) -> ValidationGate {
        self.gate
    }

    /// Gate checked before explicitly requesting suggestions.
    #[must_use]
    pub const fn suggestion_gate(&self) -> Option<ValidationGate> {
        self.suggestion_gate
    }

    /// Selection policy for this step's suggestions.
    #[must_use]
    pub const fn selection(&self) -> SelectionPolicy {
        self.selection
    }

    /// Label of the forward action, when it differs from the default.
    #[must_use]
    pub fn action_label(&self) -> Option<&str> {
        self.action_label.as_deref()
    }
}

/// Builder for [`Step`].
#[derive(Debug)]
pub struct StepBuilder {
    field: FieldId,
    title: Option<String>,
    description: String,
    hint: Option<String>,
    gate: ValidationGate,
    suggestion_gate: Option<ValidationGate>,
    selection: SelectionPolicy,
    action_label: Option<String>,
}

impl StepBuilder {
    /// Sets the display title.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStep`] if the title is blank or too long.
    pub fn title(mut self, title: impl Into<String>) -> Result<Self> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(Error::InvalidStep {
                reason: "title cannot be empty".into(),
            });
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(Error::InvalidStep {
                reason: format!("title length must be <= {MAX_TITLE_LEN}"),
            });
        }
        self.title = Some(title);
        Ok(self)
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the input hint.
    #[must_use]
    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Sets the forward validation gate.
    #[must_use]
    pub fn gate(mut self, gate: ValidationGate) -> Self {
        self.gate = gate;
        self
    }

    /// Sets the gate checked before explicit suggestion requests.
    #[must_use]
    pub fn suggestion_gate(mut self, gate: ValidationGate) -> Self {
        self.suggestion_gate = Some(gate);
        self
    }

    /// Sets the suggestion selection policy.
    #[must_use]
    pub fn selection(mut self, selection: SelectionPolicy) -> Self {
        self.selection = selection;
        self
    }

    /// Overrides the label of the forward action.
    #[must_use]
    pub fn action_label(mut self, label: impl Into<String>) -> Self {
        self.action_label = Some(label.into());
        self
    }

    /// Finalises the step descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStep`] if no title was provided.
    pub fn build(self) -> Result<Step> {
        let title = self.title.ok_or_else(|| Error::InvalidStep {
            reason: "title must be provided".into(),
        })?;

        Ok(Step {
            field: self.field,
            title,
            description: self.description,
            hint: self.hint,
            gate: self.gate,
            suggestion_gate: self.suggestion_gate,
            selection: self.selection,
            action_label: self.action_label,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_chars_counts_trimmed_value() {
        let gate = ValidationGate::MinChars(5);
        assert_eq!(
            gate.check("site"),
            Err(GateViolation::TooShort { min: 5, actual: 4 })
        );
        assert_eq!(gate.check("   site   "), Err(GateViolation::TooShort { min: 5, actual: 4 }));
        assert!(gate.check("a site").is_ok());
    }

    #[test]
    fn min_words_and_non_empty() {
        assert!(ValidationGate::MinWords(2).check("shop").is_err());
        assert!(ValidationGate::MinWords(2).check("local shop").is_ok());
        assert_eq!(ValidationGate::NonEmpty.check("  \n"), Err(GateViolation::Empty));
        assert!(ValidationGate::Open.check("").is_ok());
    }

    #[test]
    fn builds_step() {
        let step = Step::builder(FieldId::new("design").unwrap())
            .title("Design and look")
            .map(|b| {
                b.description("How should the site look?")
                    .hint("Colours, fonts, overall style")
                    .gate(ValidationGate::MinChars(5))
                    .action_label("Get prompt")
            })
            .and_then(StepBuilder::build)
            .expect("build");

        assert_eq!(step.title(), "Design and look");
        assert_eq!(step.gate(), ValidationGate::MinChars(5));
        assert_eq!(step.selection(), SelectionPolicy::Independent);
        assert_eq!(step.action_label(), Some("Get prompt"));
        assert!(step.suggestion_gate().is_none());
    }

    #[test]
    fn step_requires_title() {
        let err = Step::builder(FieldId::new("goal").unwrap())
            .build()
            .expect_err("title missing");
        assert!(matches!(err, Error::InvalidStep { .. }));

        assert!(Step::builder(FieldId::new("goal").unwrap()).title("  ").is_err());
    }
}
