//! Per-action debounce guard.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

/// Logical user action subject to debouncing.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ActionKey {
    /// Forward navigation.
    Next,
    /// Backward navigation.
    Prev,
    /// Final synthesis.
    Generate,
    /// Explicit suggestion refresh for the active field.
    Refresh,
    /// Click on the suggestion at this index.
    Example(usize),
    /// Caller-defined action.
    Custom(String),
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Next => f.write_str("next"),
            Self::Prev => f.write_str("prev"),
            Self::Generate => f.write_str("generate"),
            Self::Refresh => f.write_str("refresh"),
            Self::Example(index) => write!(f, "example-{index}"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

/// Rejects repeats of the same action inside a fixed window.
///
/// Purely a time comparison: callers check, skip when suppressed, and mark
/// the invocation otherwise. Nothing ever waits.
#[derive(Debug)]
pub struct DebounceGuard {
    window: Duration,
    last: HashMap<ActionKey, Instant>,
}

impl DebounceGuard {
    /// Creates a guard with the supplied window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last: HashMap::new(),
        }
    }

    /// Configured window.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Returns `true` if `key` was marked less than one window ago.
    #[must_use]
    pub fn should_suppress(&self, key: &ActionKey) -> bool {
        self.last
            .get(key)
            .is_some_and(|at| at.elapsed() < self.window)
    }

    /// Records an invocation of `key` now.
    pub fn mark_invoked(&mut self, key: ActionKey) {
        self.last.insert(key, Instant::now());
    }

    /// Checks and marks in one step; returns `false` when suppressed.
    pub fn try_invoke(&mut self, key: ActionKey) -> bool {
        if self.should_suppress(&key) {
            tracing::trace!(action = %key, "action debounced");
            return false;
        }
        self.mark_invoked(key);
        true
    }
}

impl Default for DebounceGuard {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn suppresses_inside_window() {
        let mut guard = DebounceGuard::default();
        assert!(!guard.should_suppress(&ActionKey::Next));

        guard.mark_invoked(ActionKey::Next);
        assert!(guard.should_suppress(&ActionKey::Next));
        advance(Duration::from_millis(499)).await;
        assert!(guard.should_suppress(&ActionKey::Next));
        advance(Duration::from_millis(1)).await;
        assert!(!guard.should_suppress(&ActionKey::Next));
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_independent() {
        let mut guard = DebounceGuard::new(Duration::from_millis(500));
        assert!(guard.try_invoke(ActionKey::Example(0)));
        assert!(!guard.try_invoke(ActionKey::Example(0)));
        assert!(guard.try_invoke(ActionKey::Example(1)));
        assert!(guard.try_invoke(ActionKey::Prev));
        assert!(guard.try_invoke(ActionKey::Refresh));
        assert!(guard.try_invoke(ActionKey::Generate));
    }

    #[test]
    fn action_names() {
        assert_eq!(ActionKey::Example(3).to_string(), "example-3");
        assert_eq!(ActionKey::Generate.to_string(), "generate");
        assert_eq!(ActionKey::Custom("copy".into()).to_string(), "copy");
    }
}
