//! The action registry
//!
//! An [`ActionRegistry`] is owned by the application's composition root and
//! cloned (cheaply) into whatever produces or consumes actions. It defines
//! actions, hands out typed [`ActionHandle`]s and owns the diagnostic
//! channel shared by every action it defines.
//!
//! # Example
//!
//! ```
//! use flux_actions_core::{ActionDef, ActionRegistry, RegistryConfig};
//!
//! let registry = ActionRegistry::with_config(RegistryConfig::default().with_history(10));
//! let item_removed = registry
//!     .define(ActionDef::<(String,)>::new("itemRemoved").args(["id"]).log("Item {id} removed."))
//!     .unwrap();
//!
//! let _sub = item_removed.subscribe(|(id,)| assert_eq!(id, "abc123"));
//! item_removed.invoke(("abc123".to_string(),));
//!
//! assert_eq!(registry.history()[0].message, "Item abc123 removed.");
//! ```

use crate::action::{ActionDef, ActionSet, ActionSpec, Message};
use crate::args::Arguments;
use crate::config::RegistryConfig;
use crate::diagnostics::{DispatchLog, DispatchLogEntry, LogFilter, LOG_TARGET};
use crate::error::{ActionError, DispatchError};
use crate::handle::{ActionCore, ActionHandle, LogMessage};
use crate::report::{Reporter, TracingReporter};
use std::any::{type_name, Any};
use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

/// Diagnostic state shared by every action of one registry
pub(crate) struct Shared {
    filter: LogFilter,
    history: RefCell<Option<DispatchLog>>,
    reporter: RefCell<Rc<dyn Reporter>>,
}

impl Shared {
    fn new(config: RegistryConfig) -> Self {
        Self {
            filter: config.log,
            history: RefCell::new(config.history.map(DispatchLog::new)),
            reporter: RefCell::new(Rc::new(TracingReporter)),
        }
    }

    pub(crate) fn should_log(&self, action: &str) -> bool {
        self.filter.should_log(action)
    }

    /// Emit one pre-dispatch log line
    pub(crate) fn emit(&self, action: &str, message: String) {
        tracing::debug!(target: LOG_TARGET, action = %action, "{message}");
        if let Some(history) = self.history.borrow_mut().as_mut() {
            history.push(action, message);
        }
    }

    pub(crate) fn report(&self, error: &DispatchError) {
        // Clone out so a reporter may itself touch the registry
        let reporter = Rc::clone(&self.reporter.borrow());
        if panic::catch_unwind(AssertUnwindSafe(|| reporter.report(error))).is_err() {
            tracing::error!(action = %error.action(), %error, "reporter panicked");
        }
    }
}

struct Entry {
    spec: ActionSpec,
    type_name: &'static str,
    core: Rc<dyn Any>,
}

#[derive(Default)]
struct Actions {
    entries: Vec<Entry>,
    by_name: HashMap<String, usize>,
}

struct RegistryInner {
    shared: Rc<Shared>,
    actions: RefCell<Actions>,
}

/// Registry of named, typed actions.
///
/// Cloning yields another reference to the same registry. The registry is
/// single-threaded (`!Send`); dispatch happens on the thread that owns it.
#[derive(Clone)]
pub struct ActionRegistry {
    inner: Rc<RegistryInner>,
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.names())
            .field("log", &self.inner.shared.filter)
            .finish()
    }
}

impl ActionRegistry {
    /// Create a registry that logs every action and keeps no history
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            inner: Rc::new(RegistryInner {
                shared: Rc::new(Shared::new(config)),
                actions: RefCell::new(Actions::default()),
            }),
        }
    }

    /// Create a registry configured from `FLUX_ACTIONS_LOG` / `FLUX_ACTIONS_HISTORY`
    pub fn from_env() -> Self {
        Self::with_config(RegistryConfig::from_env())
    }

    /// Replace the reporter receiving dispatch failures (builder style)
    pub fn with_reporter<R: Reporter + 'static>(self, reporter: R) -> Self {
        self.set_reporter(reporter);
        self
    }

    /// Replace the reporter receiving dispatch failures
    pub fn set_reporter<R: Reporter + 'static>(&self, reporter: R) {
        *self.inner.shared.reporter.borrow_mut() = Rc::new(reporter);
    }

    /// Define a new action.
    ///
    /// Fails if the name is taken, if the declared roles do not match the
    /// argument tuple, or if the log template references an unknown role.
    /// The registry is unchanged after a failure.
    pub fn define<A: Arguments>(&self, def: ActionDef<A>) -> Result<ActionHandle<A>, ActionError> {
        if self.contains(def.name()) {
            return Err(ActionError::DuplicateAction { name: def.name });
        }

        let args = def.roles()?;
        let template = def.template(&args)?;

        let ActionDef {
            name,
            message,
            hook,
            ..
        } = def;
        let source = template.as_ref().map(|t| t.as_str().to_string());
        let message = match message {
            Some(Message::Format(format)) => Some(LogMessage::Format(format)),
            _ => template.map(LogMessage::Template),
        };

        let spec = ActionSpec {
            name: name.clone(),
            args,
            message: source,
        };
        let handle = ActionHandle::from_core(Rc::new(ActionCore::new(
            spec.clone(),
            message,
            hook,
            Rc::clone(&self.inner.shared),
        )));

        let mut actions = self.inner.actions.borrow_mut();
        let index = actions.entries.len();
        actions.entries.push(Entry {
            spec,
            type_name: type_name::<A>(),
            core: handle.core_any(),
        });
        actions.by_name.insert(name, index);

        tracing::debug!(action = %handle.name(), args = ?handle.shape(), "action defined");
        Ok(handle)
    }

    /// Define an action without a log message or hook
    pub fn action<A: Arguments>(&self, name: &str) -> Result<ActionHandle<A>, ActionError> {
        self.define(ActionDef::new(name))
    }

    /// Define every action of an [`ActionSet`]
    pub fn register<S: ActionSet>(&self) -> Result<S, ActionError> {
        S::register(self)
    }

    /// Look up a defined action by name with its argument type
    pub fn handle<A: Arguments>(&self, name: &str) -> Result<ActionHandle<A>, ActionError> {
        let actions = self.inner.actions.borrow();
        let entry = actions
            .by_name
            .get(name)
            .map(|&index| &actions.entries[index])
            .ok_or_else(|| ActionError::UnknownAction {
                name: name.to_string(),
            })?;

        let core = Rc::clone(&entry.core)
            .downcast::<ActionCore<A>>()
            .map_err(|_| ActionError::TypeMismatch {
                name: name.to_string(),
                actual: entry.type_name,
                requested: type_name::<A>(),
            })?;
        Ok(ActionHandle::from_core(core))
    }

    /// Fail with `DuplicateAction` if any of `names` is already defined
    /// (or repeated within `names`)
    pub fn check_available(&self, names: &[&str]) -> Result<(), ActionError> {
        for (i, name) in names.iter().enumerate() {
            if self.contains(name) || names[..i].contains(name) {
                return Err(ActionError::DuplicateAction {
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.actions.borrow().by_name.contains_key(name)
    }

    /// Names of all defined actions, in definition order
    pub fn names(&self) -> Vec<String> {
        self.inner
            .actions
            .borrow()
            .entries
            .iter()
            .map(|entry| entry.spec.name.clone())
            .collect()
    }

    /// Descriptions of all defined actions, in definition order
    pub fn specs(&self) -> Vec<ActionSpec> {
        self.inner
            .actions
            .borrow()
            .entries
            .iter()
            .map(|entry| entry.spec.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.actions.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The active log filter
    pub fn log_filter(&self) -> &LogFilter {
        &self.inner.shared.filter
    }

    /// Recent log lines, oldest first (empty when history is disabled)
    pub fn history(&self) -> Vec<DispatchLogEntry> {
        self.inner
            .shared
            .history
            .borrow()
            .as_ref()
            .map(|log| log.entries().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear_history(&self) {
        if let Some(log) = self.inner.shared.history.borrow_mut().as_mut() {
            log.clear();
        }
    }
}
