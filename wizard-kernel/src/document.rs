//! Field map and deterministic document assembly.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use wizard_primitives::{FieldId, Step};

/// Current text of every wizard field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldMap {
    values: HashMap<FieldId, String>,
}

impl FieldMap {
    /// Creates a map with an empty value for each step's field.
    #[must_use]
    pub fn for_steps(steps: &[Step]) -> Self {
        Self {
            values: steps
                .iter()
                .map(|step| (step.field().clone(), String::new()))
                .collect(),
        }
    }

    /// Value of `field`; unknown fields read as empty.
    #[must_use]
    pub fn get(&self, field: &FieldId) -> &str {
        self.values.get(field).map_or("", String::as_str)
    }

    /// Returns `true` if `field` belongs to the map.
    #[must_use]
    pub fn contains(&self, field: &FieldId) -> bool {
        self.values.contains_key(field)
    }

    /// Overwrites `field`, returning `false` if it is unknown.
    pub(crate) fn set(&mut self, field: &FieldId, value: String) -> bool {
        match self.values.get_mut(field) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.values.values_mut().for_each(String::clear);
    }
}

/// One titled section of a [`Document`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Section {
    title: String,
    body: String,
}

impl Section {
    /// Heading taken from the step title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Field value at assembly time.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }
}

/// Snapshot of every field rendered in step order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Document {
    sections: Vec<Section>,
}

impl Document {
    /// Sections in step order.
    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Renders the document text.
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, section) in self.sections.iter().enumerate() {
            if index > 0 {
                f.write_str("\n\n")?;
            }
            write!(f, "{}:\n{}", section.title, section.body)?;
        }
        Ok(())
    }
}

/// Builds one section per step, in order, including empty ones.
#[must_use]
pub fn assemble(fields: &FieldMap, steps: &[Step]) -> Document {
    Document {
        sections: steps
            .iter()
            .map(|step| Section {
                title: step.title().to_owned(),
                body: fields.get(step.field()).to_owned(),
            })
            .collect(),
    }
}
