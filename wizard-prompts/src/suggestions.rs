//! Per-field suggestion instructions and their built-in fallback sets.

use std::fmt::Write as _;

use crate::catalog::{AUDIENCE, DESIGN, GOAL, REQUIREMENTS};
use crate::template::{InstructionTemplate, TemplateResult, TemplateVars};

/// Number of items in every built-in default set.
pub const DEFAULT_SET_LEN: usize = 5;

const SUGGESTION_TEMPLATE: &str = "{{context}}Suggest exactly {{count}} {{subject}}. \
Reply only with a numbered list in this format, without any other text:\n{{format}}";

/// What to ask a provider for when suggesting answers to one field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SuggestionBrief {
    subject: &'static str,
    line_format: &'static str,
    defaults: [&'static str; DEFAULT_SET_LEN],
}

impl SuggestionBrief {
    /// Brief for the given field id; unknown fields get a generic brief.
    #[must_use]
    pub fn for_field(field: &str) -> &'static Self {
        match field {
            GOAL => &GOAL_BRIEF,
            AUDIENCE => &AUDIENCE_BRIEF,
            REQUIREMENTS => &REQUIREMENTS_BRIEF,
            DESIGN => &DESIGN_BRIEF,
            _ => &GENERIC_BRIEF,
        }
    }

    /// Noun phrase describing the requested items.
    #[must_use]
    pub const fn subject(&self) -> &'static str {
        self.subject
    }

    /// Shape each returned line should follow.
    #[must_use]
    pub const fn line_format(&self) -> &'static str {
        self.line_format
    }

    /// Fixed items offered when the provider cannot be reached.
    #[must_use]
    pub const fn defaults(&self) -> &[&'static str; DEFAULT_SET_LEN] {
        &self.defaults
    }

    /// Renders the provider instruction asking for `count` numbered lines.
    ///
    /// # Errors
    ///
    /// Propagates [`crate::template::TemplateError`] from rendering.
    pub fn instruction(&self, count: usize, context: &SuggestionContext) -> TemplateResult<String> {
        let mut format = String::new();
        for n in 1..=count {
            let _ = writeln!(format, "{n}. {}", self.line_format);
        }

        let mut vars = TemplateVars::new();
        vars.insert("context".into(), context.render());
        vars.insert("count".into(), count.to_string());
        vars.insert("subject".into(), self.subject.into());
        vars.insert("format".into(), format.trim_end().to_owned());
        InstructionTemplate::new(SUGGESTION_TEMPLATE).render(&vars)
    }
}

/// Values already collected that condition a suggestion request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SuggestionContext {
    entries: Vec<(String, String)>,
}

impl SuggestionContext {
    /// Creates an empty context.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds a labelled value; blank values are skipped.
    #[must_use]
    pub fn with_entry(mut self, label: impl Into<String>, value: impl AsRef<str>) -> Self {
        let value = value.as_ref().trim();
        if !value.is_empty() {
            self.entries.push((label.into(), value.to_owned()));
        }
        self
    }

    /// Labelled values in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Returns `true` when nothing has been collected yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn render(&self) -> String {
        if self.entries.is_empty() {
            return String::new();
        }
        let mut out = String::from("Based on:\n");
        for (n, (label, value)) in self.entries.iter().enumerate() {
            let _ = writeln!(out, "{}. {label}: \"{value}\"", n + 1);
        }
        out.push('\n');
        out
    }
}

static GOAL_BRIEF: SuggestionBrief = SuggestionBrief {
    subject: "similar and innovative website ideas",
    line_format: "[website idea]",
    defaults: [
        "An online store for handmade jewellery",
        "A portfolio site for a freelance photographer",
        "A booking platform for a local fitness studio",
        "A blog about sustainable travel",
        "A landing page for a personal budgeting app",
    ],
};

static AUDIENCE_BRIEF: SuggestionBrief = SuggestionBrief {
    subject: "additional target audience segments",
    line_format: "Age group: [age] | Interests: [interests] | Language: [language] | Country: [country]",
    defaults: [
        "Age group: 18-24 | Interests: technology, gaming | Language: English | Country: United States",
        "Age group: 25-34 | Interests: careers, productivity | Language: English | Country: United Kingdom",
        "Age group: 35-44 | Interests: family, home improvement | Language: English | Country: Canada",
        "Age group: 45-60 | Interests: travel, health | Language: English | Country: Australia",
        "Age group: 18-30 | Interests: fashion, social media | Language: Arabic | Country: Saudi Arabia",
    ],
};

static REQUIREMENTS_BRIEF: SuggestionBrief = SuggestionBrief {
    subject: "additional technical requirements",
    line_format: "[technical requirement]",
    defaults: [
        "Responsive layout that works on phones and desktops",
        "Secure user sign-up and login",
        "Fast page loads with optimised images",
        "Search engine friendly page structure",
        "Contact form with email notifications",
    ],
};

static DESIGN_BRIEF: SuggestionBrief = SuggestionBrief {
    subject: "additional design ideas",
    line_format: "[design idea]",
    defaults: [
        "Clean minimalist layout with generous white space",
        "Bold brand colours with strong contrast",
        "Modern sans-serif typography",
        "Subtle animations while scrolling",
        "Dark mode support",
    ],
};

static GENERIC_BRIEF: SuggestionBrief = SuggestionBrief {
    subject: "short candidate answers",
    line_format: "[answer]",
    defaults: [
        "Describe the main objective in one sentence",
        "Add a concrete example",
        "Mention any constraints",
        "Say what success looks like",
        "Note anything to avoid",
    ],
};
