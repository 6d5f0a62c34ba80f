//! Step sequencing state machine.

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wizard_primitives::{FieldId, GateViolation, Step};
use wizard_prompts::SuggestionContext;

use crate::document::{self, Document, FieldMap};
use crate::scheduler::{SchedulerError, SchedulerResult, TaskScheduler};
use crate::suggestions::{GenerateOutcome, SuggestionEngine, SuggestionError, SuggestionResult};

const DEFAULT_NEXT_LABEL: &str = "Next";

/// Errors emitted by the step sequencer.
#[derive(Debug, Error)]
pub enum SequencerError {
    /// The field value did not satisfy the step gate.
    #[error("{field}: {violation}")]
    Validation {
        /// Field that failed.
        field: FieldId,
        /// Why it failed.
        #[source]
        violation: GateViolation,
    },
    /// The field does not belong to any step.
    #[error("unknown field {field}")]
    UnknownField {
        /// Requested field.
        field: FieldId,
    },
    /// Completion was requested before the goal step was confirmed.
    #[error("project goal not set")]
    MissingGoal,
    /// A sequencer needs at least one step.
    #[error("step catalog is empty")]
    EmptyCatalog,
    /// Two steps are bound to the same field.
    #[error("field {field} is used by more than one step")]
    DuplicateField {
        /// Repeated field.
        field: FieldId,
    },
    /// A background prefetch could not run.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    /// A background prefetch panicked or was aborted.
    #[error("suggestion prefetch for {field} did not complete: {reason}")]
    Prefetch {
        /// Field being prefetched.
        field: FieldId,
        /// Join failure description.
        reason: String,
    },
    /// The suggestion engine failed.
    #[error(transparent)]
    Suggestion(#[from] SuggestionError),
}

/// Result alias used for sequencer operations.
pub type SequencerResult<T> = Result<T, SequencerError>;

/// Background suggestion request started by [`StepSequencer::advance`].
#[derive(Debug)]
pub struct PrefetchHandle {
    field: FieldId,
    handle: JoinHandle<SchedulerResult<SuggestionResult<GenerateOutcome>>>,
}

impl PrefetchHandle {
    /// Field being prefetched.
    #[must_use]
    pub fn field(&self) -> &FieldId {
        &self.field
    }

    /// Waits for the prefetch to finish.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError`] if the task was aborted, the scheduler
    /// closed before it started, or the engine failed.
    pub async fn join(self) -> SequencerResult<GenerateOutcome> {
        let joined = self.handle.await.map_err(|err| SequencerError::Prefetch {
            field: self.field,
            reason: err.to_string(),
        })?;
        Ok(joined??)
    }
}

/// Result of a successful [`StepSequencer::advance`].
#[derive(Debug)]
pub enum Transition {
    /// The position moved forward.
    Moved {
        /// New zero-based position.
        position: usize,
        /// Suggestion prefetch for the newly active field, if one started.
        prefetch: Option<PrefetchHandle>,
    },
    /// The last step passed its gate; the document is ready for synthesis.
    Complete(Document),
}

/// Presentation-facing view of the current position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Zero-based position.
    pub position: usize,
    /// Number of steps.
    pub total: usize,
    /// Whether the first step is active.
    pub is_first: bool,
    /// Whether the last step is active.
    pub is_last: bool,
    /// Label for the forward action.
    pub next_label: String,
}

/// Ordered steps, the authoritative field map, and the current position.
#[derive(Debug)]
pub struct StepSequencer {
    steps: Vec<Step>,
    position: usize,
    fields: FieldMap,
    session_goal: Option<String>,
    engine: SuggestionEngine,
    scheduler: TaskScheduler,
}

impl StepSequencer {
    /// Creates a sequencer positioned on the first step.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::EmptyCatalog`] for an empty step list and
    /// [`SequencerError::DuplicateField`] when two steps share a field.
    pub fn new(
        steps: Vec<Step>,
        engine: SuggestionEngine,
        scheduler: TaskScheduler,
    ) -> SequencerResult<Self> {
        if steps.is_empty() {
            return Err(SequencerError::EmptyCatalog);
        }
        let mut seen = HashSet::new();
        for step in &steps {
            if !seen.insert(step.field()) {
                return Err(SequencerError::DuplicateField {
                    field: step.field().clone(),
                });
            }
        }
        Ok(Self {
            fields: FieldMap::for_steps(&steps),
            steps,
            position: 0,
            session_goal: None,
            engine,
            scheduler,
        })
    }

    /// Zero-based position of the active step.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// The active step.
    #[must_use]
    pub fn current_step(&self) -> &Step {
        &self.steps[self.position]
    }

    /// All steps in order.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The field map.
    #[must_use]
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Current value of `field`.
    #[must_use]
    pub fn field_value(&self, field: &FieldId) -> &str {
        self.fields.get(field)
    }

    /// Goal confirmed by advancing past the first step.
    #[must_use]
    pub fn session_goal(&self) -> Option<&str> {
        self.session_goal.as_deref()
    }

    /// Suggestion engine shared with background prefetches.
    #[must_use]
    pub fn engine(&self) -> &SuggestionEngine {
        &self.engine
    }

    /// Overwrites `field` with `value`.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::UnknownField`] if no step owns `field`.
    pub fn set_field_value(&mut self, field: &FieldId, value: impl Into<String>) -> SequencerResult<()> {
        if self.fields.set(field, value.into()) {
            Ok(())
        } else {
            Err(SequencerError::UnknownField {
                field: field.clone(),
            })
        }
    }

    /// Validates the active field and moves forward.
    ///
    /// Must be called from within a Tokio runtime for the prefetch to start;
    /// without one the move still happens and no prefetch is returned.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Validation`] when the gate fails and
    /// [`SequencerError::MissingGoal`] when completing without a confirmed
    /// goal. The position never changes on error.
    pub fn advance(&mut self) -> SequencerResult<Transition> {
        let step = &self.steps[self.position];
        let value = self.fields.get(step.field());
        step.gate()
            .check(value)
            .map_err(|violation| SequencerError::Validation {
                field: step.field().clone(),
                violation,
            })?;

        if self.position == 0 {
            let goal = value.trim();
            info!(goal_chars = goal.len(), "project goal confirmed");
            self.session_goal = (!goal.is_empty()).then(|| goal.to_owned());
        }

        if self.is_last() {
            if self.session_goal.is_none() {
                return Err(SequencerError::MissingGoal);
            }
            info!("wizard complete");
            return Ok(Transition::Complete(self.document()));
        }

        let leaving = step.field().clone();
        self.position += 1;
        debug!(from = %leaving, position = self.position, "step advanced");

        Ok(Transition::Moved {
            position: self.position,
            prefetch: self.prefetch_current(),
        })
    }

    /// Moves back one step; returns `false` on the first step.
    pub fn retreat(&mut self) -> bool {
        if self.position == 0 {
            return false;
        }
        let leaving = self.current_step().field().clone();
        self.position -= 1;
        debug!(from = %leaving, position = self.position, "step retreated");
        true
    }

    /// Toggles suggestion `index` of the active field and returns the new value.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Suggestion`] for an out-of-range index.
    pub fn toggle_suggestion(&mut self, index: usize) -> SequencerResult<&str> {
        let step = &self.steps[self.position];
        let field = step.field().clone();
        let value = self
            .engine
            .toggle(&field, index, self.fields.get(&field), step.selection())?;
        self.fields.set(&field, value);
        Ok(self.fields.get(&field))
    }

    /// Explicitly requests suggestions for the active field.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Validation`] when the step's suggestion
    /// gate rejects the current value, or the engine's error.
    pub async fn request_suggestions(&self) -> SequencerResult<GenerateOutcome> {
        let step = self.current_step();
        let field = step.field();
        if let Some(gate) = step.suggestion_gate() {
            gate.check(self.fields.get(field))
                .map_err(|violation| SequencerError::Validation {
                    field: field.clone(),
                    violation,
                })?;
        }
        let context = self.suggestion_context(field);
        Ok(self.engine.generate(field, &context).await?)
    }

    /// Collected values that condition suggestions for `field`.
    ///
    /// The goal field sees its own draft; later fields see the confirmed
    /// goal, every earlier step's answer, then their own draft.
    #[must_use]
    pub fn suggestion_context(&self, field: &FieldId) -> SuggestionContext {
        let own = self.fields.get(field);
        let goal_field = self.steps[0].field();
        if field == goal_field {
            return SuggestionContext::new().with_entry("Current idea", own);
        }

        let mut context = SuggestionContext::new()
            .with_entry("Project goal", self.session_goal.as_deref().unwrap_or_default());
        for step in self.steps.iter().skip(1).take_while(|step| step.field() != field) {
            context = context.with_entry(step.title(), self.fields.get(step.field()));
        }
        context.with_entry("Current answer", own)
    }

    /// Position summary for rendering step indicators.
    #[must_use]
    pub fn progress(&self) -> Progress {
        Progress {
            position: self.position,
            total: self.steps.len(),
            is_first: self.position == 0,
            is_last: self.is_last(),
            next_label: self
                .current_step()
                .action_label()
                .unwrap_or(DEFAULT_NEXT_LABEL)
                .to_owned(),
        }
    }

    /// Assembles the current field map.
    #[must_use]
    pub fn document(&self) -> Document {
        document::assemble(&self.fields, &self.steps)
    }

    /// Returns to the first step with every field and suggestion cleared.
    pub fn reset(&mut self) {
        self.position = 0;
        self.fields.clear();
        self.session_goal = None;
        self.engine.reset();
        info!("wizard reset");
    }

    fn is_last(&self) -> bool {
        self.position + 1 == self.steps.len()
    }

    // A request still running for the field is kept: navigation never
    // bumps its token, so its result lands when the user comes back.
    fn prefetch_current(&self) -> Option<PrefetchHandle> {
        let field = self.current_step().field().clone();
        if self.engine.has_suggestions(&field) || self.engine.is_in_progress(&field) {
            return None;
        }

        let engine = self.engine.clone();
        let context = self.suggestion_context(&field);
        let task_field = field.clone();
        let prefetch = async move { engine.generate(&task_field, &context).await };
        match self.scheduler.spawn(field.as_str(), prefetch) {
            Ok(handle) => Some(PrefetchHandle { field, handle }),
            Err(err) => {
                warn!(%field, error = %err, "suggestion prefetch skipped");
                None
            }
        }
    }
}
