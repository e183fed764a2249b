//! Error types for action configuration and dispatch reporting

use thiserror::Error;

/// Boxed error returned by fallible listeners and hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Configuration errors, returned while defining or looking up actions.
///
/// These are integrator bugs: they surface immediately from
/// [`ActionRegistry::define`](crate::ActionRegistry::define) and are never
/// retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("action `{name}` is already defined")]
    DuplicateAction { name: String },

    #[error("action `{name}` declares {found} argument role(s) but its argument type takes {expected}")]
    ShapeMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("action `{name}` has an invalid log template: {source}")]
    Template {
        name: String,
        #[source]
        source: TemplateError,
    },

    #[error("action `{name}` is not defined")]
    UnknownAction { name: String },

    #[error("action `{name}` takes `{actual}`, not `{requested}`")]
    TypeMismatch {
        name: String,
        actual: &'static str,
        requested: &'static str,
    },
}

impl ActionError {
    /// Name of the action the error refers to
    pub fn action(&self) -> &str {
        match self {
            ActionError::DuplicateAction { name }
            | ActionError::ShapeMismatch { name, .. }
            | ActionError::Template { name, .. }
            | ActionError::UnknownAction { name }
            | ActionError::TypeMismatch { name, .. } => name,
        }
    }
}

/// Problems found while parsing a log message template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("placeholder `{{{0}}}` does not name an argument")]
    UnknownArgument(String),

    #[error("unclosed `{{` at byte {0}")]
    Unclosed(usize),

    #[error("unmatched `}}` at byte {0}")]
    UnmatchedClose(usize),
}

/// Failures that happen while an action is being dispatched.
///
/// Dispatch errors never reach the caller of
/// [`ActionHandle::invoke`](crate::ActionHandle::invoke). They are handed to
/// the registry's [`Reporter`](crate::Reporter) instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("pre-dispatch hook for `{action}` failed: {message}")]
    Hook { action: String, message: String },

    #[error("listener #{subscription} on `{action}` failed: {message}")]
    Listener {
        action: String,
        subscription: u64,
        message: String,
    },
}

impl DispatchError {
    /// Name of the action whose dispatch failed
    pub fn action(&self) -> &str {
        match self {
            DispatchError::Hook { action, .. } | DispatchError::Listener { action, .. } => action,
        }
    }

    /// Failure message from the hook or listener
    pub fn message(&self) -> &str {
        match self {
            DispatchError::Hook { message, .. } | DispatchError::Listener { message, .. } => {
                message
            }
        }
    }
}
