//! `{{variable}}` instruction templates.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Result alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors raised while rendering an instruction template.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TemplateError {
    /// A referenced variable had neither a value nor a default.
    #[error("missing template variable: {name}")]
    MissingVariable {
        /// Name of the missing variable.
        name: String,
    },

    /// A `{{` was never closed.
    #[error("unterminated placeholder at byte {offset}")]
    Unterminated {
        /// Byte offset of the opening braces.
        offset: usize,
    },
}

/// Variable bindings supplied at render time.
pub type TemplateVars = BTreeMap<String, String>;

/// Instruction text with `{{name}}` placeholders.
///
/// Substituted values are inserted verbatim and never re-scanned, so user
/// text containing braces cannot inject further placeholders.
///
/// ```
/// use wizard_prompts::template::{InstructionTemplate, TemplateVars};
///
/// let template = InstructionTemplate::new("Suggest {{count}} ideas for {{topic}}.")
///     .with_default("count", "5");
/// let mut vars = TemplateVars::new();
/// vars.insert("topic".into(), "a bakery site".into());
/// assert_eq!(template.render(&vars).unwrap(), "Suggest 5 ideas for a bakery site.");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionTemplate {
    source: String,
    #[serde(default)]
    defaults: TemplateVars,
}

impl InstructionTemplate {
    /// Creates a template from its source text.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            defaults: TemplateVars::new(),
        }
    }

    /// Binds a fallback value used when render-time variables omit `name`.
    #[must_use]
    pub fn with_default(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(name.into(), value.into());
        self
    }

    /// Raw template text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names referenced by the template, in order of first appearance.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Unterminated`] for an unclosed placeholder.
    pub fn placeholders(&self) -> TemplateResult<Vec<&str>> {
        let mut names = Vec::new();
        for segment in Segments::new(&self.source) {
            if let Segment::Placeholder(name) = segment? {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }

    /// Renders the template, preferring `vars` over defaults.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::MissingVariable`] when a placeholder has no
    /// binding, or [`TemplateError::Unterminated`] for malformed source.
    pub fn render(&self, vars: &TemplateVars) -> TemplateResult<String> {
        let mut out = String::with_capacity(self.source.len());
        for segment in Segments::new(&self.source) {
            match segment? {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = vars
                        .get(name)
                        .or_else(|| self.defaults.get(name))
                        .ok_or_else(|| TemplateError::MissingVariable {
                            name: name.to_owned(),
                        })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

impl fmt::Display for InstructionTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

enum Segment<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

struct Segments<'a> {
    source: &'a str,
    cursor: usize,
}

impl<'a> Segments<'a> {
    const fn new(source: &'a str) -> Self {
        Self { source, cursor: 0 }
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = TemplateResult<Segment<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.source[self.cursor..];
        if rest.is_empty() {
            return None;
        }
        match rest.find("{{") {
            Some(0) => {
                let open = self.cursor;
                let Some(close) = rest.find("}}") else {
                    self.cursor = self.source.len();
                    return Some(Err(TemplateError::Unterminated { offset: open }));
                };
                self.cursor += close + 2;
                Some(Ok(Segment::Placeholder(rest[2..close].trim())))
            }
            Some(start) => {
                self.cursor += start;
                Some(Ok(Segment::Literal(&rest[..start])))
            }
            None => {
                self.cursor = self.source.len();
                Some(Ok(Segment::Literal(rest)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> TemplateVars {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn renders_with_defaults_and_overrides() {
        let template = InstructionTemplate::new("{{greeting}}, {{ name }}!").with_default("greeting", "Hello");

        assert_eq!(template.render(&vars(&[("name", "Ada")])).unwrap(), "Hello, Ada!");
        assert_eq!(
            template
                .render(&vars(&[("name", "Ada"), ("greeting", "Hi")]))
                .unwrap(),
            "Hi, Ada!"
        );
    }

    #[test]
    fn missing_variable_is_reported() {
        let err = InstructionTemplate::new("Goal: {{goal}}")
            .render(&TemplateVars::new())
            .expect_err("goal unbound");
        assert_eq!(err, TemplateError::MissingVariable { name: "goal".into() });
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let rendered = InstructionTemplate::new("Value: {{value}}")
            .render(&vars(&[("value", "{{goal}}")]))
            .unwrap();
        assert_eq!(rendered, "Value: {{goal}}");
    }

    #[test]
    fn unterminated_placeholder() {
        let template = InstructionTemplate::new("ok {{broken");
        assert_eq!(
            template.render(&TemplateVars::new()),
            Err(TemplateError::Unterminated { offset: 3 })
        );
    }

    #[test]
    fn lists_placeholders_once() {
        let template = InstructionTemplate::new("{{a}} {{b}} {{a}}");
        assert_eq!(template.placeholders().unwrap(), vec!["a", "b"]);
    }
}
