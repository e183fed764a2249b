//! Action definitions and declarative action sets

use crate::args::Arguments;
use crate::error::{ActionError, BoxError};
use crate::registry::ActionRegistry;
use crate::template::LogTemplate;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

pub(crate) type Callback<A> = Rc<dyn Fn(&A) -> Result<(), BoxError>>;
pub(crate) type Formatter<A> = Rc<dyn Fn(&A) -> String>;

pub(crate) enum Message<A> {
    Template(String),
    Format(Formatter<A>),
}

/// Builder describing one action before it is defined on a registry.
///
/// # Example
///
/// ```
/// use flux_actions_core::{ActionDef, ActionRegistry};
///
/// let registry = ActionRegistry::new();
/// let item_removed = registry
///     .define(
///         ActionDef::<(String,)>::new("itemRemoved")
///             .args(["id"])
///             .log("Item {id} removed."),
///     )
///     .unwrap();
///
/// assert_eq!(item_removed.name(), "itemRemoved");
/// assert_eq!(item_removed.shape(), ["id"]);
/// ```
pub struct ActionDef<A> {
    pub(crate) name: String,
    pub(crate) shape: Option<Vec<String>>,
    pub(crate) message: Option<Message<A>>,
    pub(crate) hook: Option<Callback<A>>,
}

impl<A: Arguments> ActionDef<A> {
    /// Start a definition for the action called `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shape: None,
            message: None,
            hook: None,
        }
    }

    /// Declare the argument roles, in positional order.
    ///
    /// The number of roles must match the argument tuple's arity. Without
    /// this call the roles default to `arg0`, `arg1`, ...
    pub fn args<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shape = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    /// Log a message built from a `{role}` template before every dispatch
    pub fn log(mut self, template: impl Into<String>) -> Self {
        self.message = Some(Message::Template(template.into()));
        self
    }

    /// Log a message computed from the arguments before every dispatch
    pub fn log_with<F>(mut self, format: F) -> Self
    where
        F: Fn(&A) -> String + 'static,
    {
        self.message = Some(Message::Format(Rc::new(format)));
        self
    }

    /// Run a side effect before every dispatch
    pub fn hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&A) + 'static,
    {
        self.hook = Some(Rc::new(move |args: &A| {
            hook(args);
            Ok::<(), BoxError>(())
        }));
        self
    }

    /// Run a fallible side effect before every dispatch.
    ///
    /// An error is reported and does not stop listeners from running.
    pub fn try_hook<F, E>(mut self, hook: F) -> Self
    where
        F: Fn(&A) -> Result<(), E> + 'static,
        E: Into<BoxError>,
    {
        self.hook = Some(Rc::new(move |args: &A| hook(args).map_err(Into::into)));
        self
    }

    /// Name this definition will be registered under
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check the declared roles and the log template without defining
    /// anything. [`ActionRegistry::define`] runs the same checks.
    pub fn validate(&self) -> Result<(), ActionError> {
        let roles = self.roles()?;
        self.template(&roles).map(|_| ())
    }

    /// Declared roles, or `arg0..` when none were declared
    pub(crate) fn roles(&self) -> Result<Vec<String>, ActionError> {
        match &self.shape {
            Some(roles) if roles.len() != A::ARITY => Err(ActionError::ShapeMismatch {
                name: self.name.clone(),
                expected: A::ARITY,
                found: roles.len(),
            }),
            Some(roles) => Ok(roles.clone()),
            None => Ok((0..A::ARITY).map(|i| format!("arg{i}")).collect()),
        }
    }

    /// Parsed log template, if the message is a template
    pub(crate) fn template(&self, roles: &[String]) -> Result<Option<LogTemplate>, ActionError> {
        match &self.message {
            Some(Message::Template(source)) => LogTemplate::parse(source, roles)
                .map(Some)
                .map_err(|source| ActionError::Template {
                    name: self.name.clone(),
                    source,
                }),
            _ => Ok(None),
        }
    }
}

/// Serializable description of one configured action:
/// the `(name, argument shape, log message template)` tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub name: String,
    pub args: Vec<String>,
    /// Log template, if the action logs through a template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<A: Arguments> From<ActionSpec> for ActionDef<A> {
    /// Build a definition from a configured `(name, args, message)` entry.
    /// The shape and template are checked by
    /// [`ActionRegistry::define`](crate::ActionRegistry::define) as usual.
    fn from(spec: ActionSpec) -> Self {
        let def = ActionDef::new(spec.name).args(spec.args);
        match spec.message {
            Some(template) => def.log(template),
            None => def,
        }
    }
}

/// A group of actions registered together.
///
/// Usually derived with `#[derive(ActionSet)]` on a struct whose fields are
/// [`ActionHandle`](crate::ActionHandle)s; the struct then acts as the
/// importable set of stable handles for one feature area.
pub trait ActionSet: Sized {
    /// Define every action of the set on `registry`.
    ///
    /// Fails without defining anything if one of the names is taken.
    fn register(registry: &ActionRegistry) -> Result<Self, ActionError>;

    /// Describe the actions of this set, in declaration order
    fn specs(&self) -> Vec<ActionSpec>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_records_shape() {
        let def = ActionDef::<(String, u32)>::new("pageLoaded").args(["namespace", "page"]);
        assert_eq!(def.name(), "pageLoaded");
        assert_eq!(
            def.shape,
            Some(vec!["namespace".to_string(), "page".to_string()])
        );
        assert!(def.message.is_none());
        assert!(def.hook.is_none());
    }

    #[test]
    fn test_hook_wraps_infallible_closure() {
        let def = ActionDef::<(u32,)>::new("fetchNextDocuments").hook(|_| {});
        let hook = def.hook.unwrap();
        assert!(hook(&(1,)).is_ok());
    }

    #[test]
    fn test_try_hook_converts_error() {
        let def = ActionDef::<(u32,)>::new("fetchNextDocuments")
            .try_hook(|(page,)| if *page > 10 { Err("too far") } else { Ok(()) });
        let hook = def.hook.unwrap();
        assert!(hook(&(3,)).is_ok());
        assert_eq!(hook(&(11,)).unwrap_err().to_string(), "too far");
    }

    #[test]
    fn test_validate_checks_shape_and_template() {
        assert!(ActionDef::<(String,)>::new("itemRemoved")
            .args(["id"])
            .log("Item {id} removed.")
            .validate()
            .is_ok());

        let err = ActionDef::<(String,)>::new("itemRemoved")
            .args(["id", "reason"])
            .validate()
            .unwrap_err();
        assert!(matches!(err, ActionError::ShapeMismatch { expected: 1, found: 2, .. }));

        let err = ActionDef::<(String,)>::new("itemRemoved")
            .args(["id"])
            .log("Item {key} removed.")
            .validate()
            .unwrap_err();
        assert_eq!(err.action(), "itemRemoved");
        assert!(matches!(err, ActionError::Template { .. }));
    }

    #[test]
    fn test_default_roles() {
        let def = ActionDef::<(u32, String)>::new("pageLoaded");
        assert_eq!(def.roles().unwrap(), vec!["arg0", "arg1"]);
        assert!(def.template(&[]).unwrap().is_none());
    }

    #[test]
    fn test_spec_serialization_skips_missing_message() {
        let spec = ActionSpec {
            name: "componentRegistered".to_string(),
            args: vec!["component".to_string()],
            message: None,
        };
        let json = serde_json::to_string(&spec).unwrap();
        assert_eq!(json, r#"{"name":"componentRegistered","args":["component"]}"#);

        let back: ActionSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }

    #[test]
    fn test_definition_from_configured_spec() {
        let spec: ActionSpec = serde_json::from_str(
            r#"{"name":"itemRemoved","args":["id"],"message":"Item {id} removed."}"#,
        )
        .unwrap();
        let def = ActionDef::<(String,)>::from(spec);

        assert_eq!(def.name(), "itemRemoved");
        assert_eq!(def.shape, Some(vec!["id".to_string()]));
        assert!(matches!(def.message, Some(Message::Template(ref t)) if t == "Item {id} removed."));
    }
}
