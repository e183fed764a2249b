//! Test utilities for code built on flux-actions
//!
//! - [`Recorder`]: a listener that records every argument tuple it receives
//! - [`RecordingReporter`]: a reporter that collects dispatch failures
//!
//! # Example
//!
//! ```
//! use flux_actions_core::testing::{Recorder, RecordingReporter};
//! use flux_actions_core::ActionRegistry;
//!
//! let reporter = RecordingReporter::new();
//! let registry = ActionRegistry::new().with_reporter(reporter.clone());
//! let removed = registry.action::<(String,)>("itemRemoved").unwrap();
//!
//! let recorder = Recorder::new();
//! let _sub = recorder.attach(&removed);
//! removed.invoke(("abc123".to_string(),));
//!
//! assert_eq!(recorder.calls(), vec![("abc123".to_string(),)]);
//! assert!(reporter.is_empty());
//! ```

use crate::args::Arguments;
use crate::error::DispatchError;
use crate::handle::ActionHandle;
use crate::report::Reporter;
use crate::subscription::Subscription;
use std::cell::RefCell;
use std::rc::Rc;

/// Records every dispatch delivered to its listener.
///
/// Clones share the same record.
pub struct Recorder<A> {
    calls: Rc<RefCell<Vec<A>>>,
}

impl<A> Clone for Recorder<A> {
    fn clone(&self) -> Self {
        Self {
            calls: Rc::clone(&self.calls),
        }
    }
}

impl<A> Default for Recorder<A> {
    fn default() -> Self {
        Self {
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl<A: Clone + 'static> Recorder<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A listener closure that appends to this recorder
    pub fn listener(&self) -> impl Fn(&A) + 'static {
        let calls = Rc::clone(&self.calls);
        move |args: &A| calls.borrow_mut().push(args.clone())
    }

    /// Subscribe this recorder to `handle`
    pub fn attach(&self, handle: &ActionHandle<A>) -> Subscription
    where
        A: Arguments,
    {
        handle.subscribe(self.listener())
    }

    /// All recorded argument tuples, oldest first
    pub fn calls(&self) -> Vec<A> {
        self.calls.borrow().clone()
    }

    pub fn last(&self) -> Option<A> {
        self.calls.borrow().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }
}

/// Collects reported dispatch failures. Clones share the same list.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    errors: Rc<RefCell<Vec<DispatchError>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All reported failures, oldest first
    pub fn errors(&self) -> Vec<DispatchError> {
        self.errors.borrow().clone()
    }

    /// Failures reported for one action
    pub fn errors_for(&self, action: &str) -> Vec<DispatchError> {
        self.errors
            .borrow()
            .iter()
            .filter(|e| e.action() == action)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.errors.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.errors.borrow_mut().clear();
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, error: &DispatchError) {
        self.errors.borrow_mut().push(error.clone());
    }
}
