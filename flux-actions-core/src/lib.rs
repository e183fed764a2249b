//! Core registry and handles for flux-actions
//!
//! This crate provides the mechanism behind Flux-style actions: named, typed
//! dispatch points that synchronously fan their arguments out to subscribed
//! listeners, after a diagnostic pre-dispatch hook.
//!
//! # Core Concepts
//!
//! - **ActionRegistry**: owns the set of defined actions and the diagnostic channel
//! - **ActionHandle**: cloneable, typed handle used to invoke and subscribe
//! - **Subscription**: explicit, cancellable listener registration
//! - **ActionSet**: a struct of handles registered together
//! - **Reporter**: where hook and listener failures go
//!
//! # Basic Example
//!
//! ```
//! use flux_actions_core::prelude::*;
//!
//! let registry = ActionRegistry::new();
//! let filter_changed = registry
//!     .define(
//!         ActionDef::<(String,)>::new("filterChanged")
//!             .args(["filter"])
//!             .log("Filter changed to: {filter}."),
//!     )
//!     .unwrap();
//!
//! let sub = filter_changed.subscribe(|(filter,)| println!("new filter: {filter}"));
//! filter_changed.invoke(("{name: 'x'}".to_string(),));
//! sub.cancel();
//! ```
//!
//! # Dispatch Semantics
//!
//! `invoke` is a synchronous notification:
//!
//! 1. The pre-dispatch hook runs (template log line, then custom hook).
//! 2. Every listener registered when dispatch started runs, in subscription
//!    order, unless it was cancelled before its turn.
//! 3. Failures (errors or panics) of the hook or of a listener are handed to
//!    the registry's [`Reporter`] and never stop the remaining listeners.
//!
//! Listeners may invoke other actions; nested dispatches complete before the
//! outer one continues.

pub mod action;
pub mod args;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod handle;
pub mod registry;
pub mod report;
pub mod subscription;
pub mod template;
pub mod testing;

// Core exports
pub use action::{ActionDef, ActionSet, ActionSpec};
pub use args::Arguments;
pub use config::RegistryConfig;
pub use handle::ActionHandle;
pub use registry::ActionRegistry;
pub use subscription::{Subscription, SubscriptionGuard};
pub use template::LogTemplate;

// Error exports
pub use error::{ActionError, BoxError, DispatchError, TemplateError};

// Diagnostics exports
pub use diagnostics::{glob_match, DispatchLog, DispatchLogEntry, LogFilter};
pub use report::{ComposedReporter, NoopReporter, Reporter, TracingReporter};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::action::{ActionDef, ActionSet, ActionSpec};
    pub use crate::args::Arguments;
    pub use crate::config::RegistryConfig;
    pub use crate::diagnostics::LogFilter;
    pub use crate::error::{ActionError, BoxError, DispatchError};
    pub use crate::handle::ActionHandle;
    pub use crate::registry::ActionRegistry;
    pub use crate::report::{Reporter, TracingReporter};
    pub use crate::subscription::{Subscription, SubscriptionGuard};
}
