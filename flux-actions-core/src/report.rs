//! Reporting of failures that occur during dispatch
//!
//! Hooks and listeners may fail; the registry contains those failures and
//! hands them to a [`Reporter`]. Nothing propagates to the caller of
//! [`ActionHandle::invoke`](crate::ActionHandle::invoke).

use crate::error::DispatchError;

/// Receives dispatch failures.
///
/// Implement this trait to route failures somewhere other than `tracing`,
/// e.g. into an error panel or a test assertion. A reporter that panics is
/// caught and logged at error level; the dispatch carries on.
pub trait Reporter {
    /// Called once per failed hook or listener
    fn report(&self, error: &DispatchError);
}

impl<F> Reporter for F
where
    F: Fn(&DispatchError),
{
    fn report(&self, error: &DispatchError) {
        self(error)
    }
}

/// Default reporter: logs each failure at `warn` level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, error: &DispatchError) {
        match error {
            DispatchError::Hook { action, message } => {
                tracing::warn!(action = %action, error = %message, "pre-dispatch hook failed");
            }
            DispatchError::Listener {
                action,
                subscription,
                message,
            } => {
                tracing::warn!(
                    action = %action,
                    subscription = subscription,
                    error = %message,
                    "listener failed"
                );
            }
        }
    }
}

/// A reporter that drops every failure
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl Reporter for NoopReporter {
    fn report(&self, _error: &DispatchError) {}
}

/// Fan a failure out to several reporters, in insertion order
#[derive(Default)]
pub struct ComposedReporter {
    reporters: Vec<Box<dyn Reporter>>,
}

impl std::fmt::Debug for ComposedReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposedReporter")
            .field("reporters_count", &self.reporters.len())
            .finish()
    }
}

impl ComposedReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reporter to the composition
    pub fn add<R: Reporter + 'static>(&mut self, reporter: R) {
        self.reporters.push(Box::new(reporter));
    }

    /// Builder-style [`add`](Self::add)
    pub fn with<R: Reporter + 'static>(mut self, reporter: R) -> Self {
        self.add(reporter);
        self
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }
}

impl Reporter for ComposedReporter {
    fn report(&self, error: &DispatchError) {
        for reporter in &self.reporters {
            reporter.report(error);
        }
    }
}
