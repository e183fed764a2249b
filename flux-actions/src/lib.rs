//! flux-actions: Typed Flux-style actions for Rust
//!
//! Actions are named dispatch points. Invoking one runs a diagnostic
//! pre-dispatch hook and then calls every subscribed listener, in order,
//! with the action's arguments. Stores and views subscribe; controllers invoke.
//!
//! # Example
//! ```
//! use flux_actions::prelude::*;
//!
//! #[derive(ActionSet)]
//! struct DocumentActions {
//!     #[action(args = "filter", log = "Filter changed to: {filter}.")]
//!     filter_changed: ActionHandle<(String,)>,
//!
//!     #[action(args = "namespace", log = "Namespace changed to: {namespace}.")]
//!     namespace_changed: ActionHandle<(String,)>,
//! }
//!
//! let registry = ActionRegistry::new();
//! let actions = DocumentActions::register(&registry).unwrap();
//!
//! let sub = actions
//!     .filter_changed
//!     .subscribe(|(filter,)| println!("filter is now {filter}"));
//! actions.filter_changed.invoke(("{}".to_string(),));
//! sub.cancel();
//!
//! assert!(registry.contains("namespaceChanged"));
//! ```

// Re-export everything from core
pub use flux_actions_core::*;

// Re-export derive macros
pub use flux_actions_macros::ActionSet;

/// Prelude for convenient imports
pub mod prelude {
    // Traits
    pub use flux_actions_core::{ActionSet, Arguments, Reporter};

    // Registry and handles
    pub use flux_actions_core::{
        ActionDef, ActionHandle, ActionRegistry, ActionSpec, Subscription, SubscriptionGuard,
    };

    // Configuration and diagnostics
    pub use flux_actions_core::{LogFilter, RegistryConfig, TracingReporter};

    // Errors
    pub use flux_actions_core::{ActionError, BoxError, DispatchError};

    // Derive macros
    pub use flux_actions_macros::ActionSet;
}
