//! Action handles: subscription and synchronous fan-out dispatch

use crate::action::{ActionSpec, Callback, Formatter};
use crate::args::Arguments;
use crate::error::{BoxError, DispatchError};
use crate::registry::Shared;
use crate::subscription::{Detach, Subscription};
use crate::template::LogTemplate;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

pub(crate) enum LogMessage<A> {
    Template(LogTemplate),
    Format(Formatter<A>),
}

impl<A: Arguments> LogMessage<A> {
    fn render(&self, args: &A) -> String {
        match self {
            LogMessage::Template(template) => template.render(&args.render()),
            LogMessage::Format(format) => format(args),
        }
    }
}

struct Slot<A> {
    id: u64,
    once: bool,
    live: Rc<Cell<bool>>,
    callback: Callback<A>,
}

/// Per-action state shared by every clone of its handle
pub(crate) struct ActionCore<A> {
    name: Rc<str>,
    spec: ActionSpec,
    message: Option<LogMessage<A>>,
    hook: Option<Callback<A>>,
    slots: RefCell<Vec<Slot<A>>>,
    next_id: Cell<u64>,
    shared: Rc<Shared>,
}

impl<A: Arguments> ActionCore<A> {
    pub(crate) fn new(
        spec: ActionSpec,
        message: Option<LogMessage<A>>,
        hook: Option<Callback<A>>,
        shared: Rc<Shared>,
    ) -> Self {
        Self {
            name: Rc::from(spec.name.as_str()),
            spec,
            message,
            hook,
            slots: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            shared,
        }
    }

    fn pre_dispatch(&self, args: &A) {
        if let Some(message) = &self.message {
            if self.shared.should_log(&self.name) {
                match guarded(|| Ok(message.render(args))) {
                    Ok(line) => self.shared.emit(&self.name, line),
                    Err(message) => self.report_hook(message),
                }
            }
        }

        if let Some(hook) = &self.hook {
            if let Err(message) = guarded(|| hook(args)) {
                self.report_hook(message);
            }
        }
    }

    fn report_hook(&self, message: String) {
        self.shared.report(&DispatchError::Hook {
            action: self.name.to_string(),
            message,
        });
    }
}

impl<A: 'static> Detach for ActionCore<A> {
    fn detach(&self, id: u64) {
        // Drop the removed listener only after the borrow is released: its
        // captures may cancel other subscriptions on this action.
        let removed = {
            let mut slots = self.slots.borrow_mut();
            slots
                .iter()
                .position(|slot| slot.id == id)
                .map(|index| slots.remove(index))
        };
        drop(removed);
    }
}

/// Callable, cloneable handle to one defined action.
///
/// `A` is the action's argument tuple. Handles are cheap to clone; every clone
/// refers to the same listener list.
pub struct ActionHandle<A: Arguments> {
    core: Rc<ActionCore<A>>,
}

impl<A: Arguments> Clone for ActionHandle<A> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<A: Arguments> std::fmt::Debug for ActionHandle<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionHandle")
            .field("name", &self.core.name)
            .field("args", &self.core.spec.args)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl<A: Arguments> ActionHandle<A> {
    pub(crate) fn from_core(core: Rc<ActionCore<A>>) -> Self {
        Self { core }
    }

    pub(crate) fn core_any(&self) -> Rc<dyn Any> {
        self.core.clone()
    }

    /// The action's name
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// The declared argument roles
    pub fn shape(&self) -> &[String] {
        &self.core.spec.args
    }

    /// The `(name, args, message)` description of this action
    pub fn spec(&self) -> ActionSpec {
        self.core.spec.clone()
    }

    /// Number of currently registered listeners
    pub fn listener_count(&self) -> usize {
        self.core.slots.borrow().len()
    }

    /// Register a listener, invoked on every dispatch until cancelled.
    ///
    /// Registering the same closure twice yields two independent
    /// subscriptions.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&A) + 'static,
    {
        self.insert(
            Rc::new(move |args: &A| {
                listener(args);
                Ok::<(), BoxError>(())
            }),
            false,
        )
    }

    /// Register a fallible listener.
    ///
    /// An error is reported through the registry's reporter; the remaining
    /// listeners still run.
    pub fn try_subscribe<F, E>(&self, listener: F) -> Subscription
    where
        F: Fn(&A) -> Result<(), E> + 'static,
        E: Into<BoxError>,
    {
        self.insert(
            Rc::new(move |args: &A| listener(args).map_err(Into::into)),
            false,
        )
    }

    /// Register a listener that is cancelled after its first call
    pub fn subscribe_once<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&A) + 'static,
    {
        self.insert(
            Rc::new(move |args: &A| {
                listener(args);
                Ok::<(), BoxError>(())
            }),
            true,
        )
    }

    /// Forward every dispatch into a tokio channel.
    ///
    /// A closed receiver is reported as a listener failure on each dispatch
    /// until the subscription is cancelled.
    #[cfg(feature = "channels")]
    pub fn forward(&self, tx: tokio::sync::mpsc::UnboundedSender<A>) -> Subscription
    where
        A: Clone,
    {
        self.try_subscribe(move |args: &A| {
            tx.send(args.clone())
                .map_err(|_| BoxError::from("forward channel closed"))
        })
    }

    fn insert(&self, callback: Callback<A>, once: bool) -> Subscription {
        let id = self.core.next_id.get();
        self.core.next_id.set(id + 1);

        let live = Rc::new(Cell::new(true));
        self.core.slots.borrow_mut().push(Slot {
            id,
            once,
            live: Rc::clone(&live),
            callback,
        });
        tracing::trace!(action = %self.core.name, subscription = id, "listener added");

        let owner: Weak<dyn Detach> = Rc::downgrade(&self.core) as Weak<dyn Detach>;
        Subscription::new(Rc::clone(&self.core.name), id, live, owner)
    }

    /// Dispatch `args`: run the pre-dispatch hook, then every listener
    /// registered at this moment, in subscription order.
    ///
    /// Returns once every listener has run. Hook and listener failures
    /// (errors or panics) are reported, never returned. Listeners may
    /// subscribe, cancel or invoke actions re-entrantly; listeners added
    /// during a dispatch first run on the next one.
    pub fn invoke(&self, args: A) {
        let core = &self.core;
        let span = tracing::debug_span!("dispatch", action = %core.name);
        let _entered = span.enter();

        core.pre_dispatch(&args);

        let snapshot: Vec<(u64, bool, Rc<Cell<bool>>, Callback<A>)> = core
            .slots
            .borrow()
            .iter()
            .map(|slot| {
                (
                    slot.id,
                    slot.once,
                    Rc::clone(&slot.live),
                    Rc::clone(&slot.callback),
                )
            })
            .collect();

        for (id, once, live, callback) in snapshot {
            if !live.get() {
                continue;
            }
            if once {
                live.set(false);
                core.detach(id);
            }
            if let Err(message) = guarded(|| callback(&args)) {
                core.shared.report(&DispatchError::Listener {
                    action: core.name.to_string(),
                    subscription: id,
                    message,
                });
            }
        }
    }
}

/// Run `f`, converting both error returns and panics into a message.
fn guarded<T>(f: impl FnOnce() -> Result<T, BoxError>) -> Result<T, String> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(err.to_string()),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panicked: {msg}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionDef;
    use crate::registry::ActionRegistry;
    use crate::testing::{Recorder, RecordingReporter};

    fn registry() -> (ActionRegistry, RecordingReporter) {
        let reporter = RecordingReporter::new();
        let registry = ActionRegistry::new().with_reporter(reporter.clone());
        (registry, reporter)
    }

    #[test]
    fn test_listeners_run_in_subscription_order() {
        let (registry, _) = registry();
        let action = registry.action::<(u32,)>("tick").unwrap();
        let order = Rc::new(RefCell::new(Vec::new()));

        let subs: Vec<_> = ["L1", "L2", "L3"]
            .into_iter()
            .map(|label| {
                let order = order.clone();
                action.subscribe(move |_| order.borrow_mut().push(label))
            })
            .collect();

        action.invoke((1,));
        assert_eq!(*order.borrow(), vec!["L1", "L2", "L3"]);
        assert_eq!(subs.len(), 3);
    }

    #[test]
    fn test_args_delivered_unmodified_to_hook_and_listeners() {
        let (registry, _) = registry();
        let hook_seen = Rc::new(RefCell::new(Vec::new()));
        let seen = hook_seen.clone();
        let action = registry
            .define(
                ActionDef::<(String, u32)>::new("moved")
                    .args(["id", "index"])
                    .hook(move |args| seen.borrow_mut().push(args.clone())),
            )
            .unwrap();

        let first = Recorder::new();
        let second = Recorder::new();
        let _a = first.attach(&action);
        let _b = second.attach(&action);

        action.invoke(("doc-1".to_string(), 4));

        let expected = vec![("doc-1".to_string(), 4)];
        assert_eq!(*hook_seen.borrow(), expected);
        assert_eq!(first.calls(), expected);
        assert_eq!(second.calls(), expected);
    }

    #[test]
    fn test_cancel_stops_delivery() {
        let (registry, _) = registry();
        let action = registry.action::<(u32,)>("tick").unwrap();
        let recorder = Recorder::new();
        let sub = recorder.attach(&action);

        action.invoke((1,));
        sub.cancel();
        action.invoke((2,));

        assert_eq!(recorder.calls(), vec![(1,)]);
        assert_eq!(action.listener_count(), 0);
    }

    #[test]
    fn test_duplicate_listener_gets_independent_subscriptions() {
        let (registry, _) = registry();
        let action = registry.action::<()>("refresh").unwrap();
        let count = Rc::new(Cell::new(0));
        let listener = {
            let count = count.clone();
            move |_: &()| count.set(count.get() + 1)
        };

        let first = action.subscribe(listener.clone());
        let second = action.subscribe(listener);
        assert_ne!(first.id(), second.id());

        action.invoke(());
        assert_eq!(count.get(), 2);

        first.cancel();
        action.invoke(());
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn test_failing_listener_is_isolated() {
        let (registry, reporter) = registry();
        let action = registry.action::<(String,)>("itemRemoved").unwrap();
        let recorder = Recorder::new();

        let _bad = action.try_subscribe(|_| Err("listener exploded"));
        let _panicky = action.subscribe(|_| panic!("listener panicked"));
        let _good = recorder.attach(&action);

        action.invoke(("abc123".to_string(),));

        assert_eq!(recorder.len(), 1);
        let errors = reporter.errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message(), "listener exploded");
        assert_eq!(errors[1].message(), "panicked: listener panicked");
        assert!(errors
            .iter()
            .all(|e| matches!(e, DispatchError::Listener { action, .. } if action == "itemRemoved")));
    }

    #[test]
    fn test_failing_hook_does_not_block_listeners() {
        let (registry, reporter) = registry();
        let action = registry
            .define(ActionDef::<(u32,)>::new("page").try_hook(|_| Err("hook failed")))
            .unwrap();
        let recorder = Recorder::new();
        let _sub = recorder.attach(&action);

        action.invoke((7,));

        assert_eq!(recorder.calls(), vec![(7,)]);
        assert_eq!(
            reporter.errors(),
            vec![DispatchError::Hook {
                action: "page".to_string(),
                message: "hook failed".to_string(),
            }]
        );
    }

    #[test]
    fn test_listener_added_during_dispatch_waits_for_next_dispatch() {
        let (registry, _) = registry();
        let action = registry.action::<(u32,)>("tick").unwrap();
        let late = Recorder::<(u32,)>::new();
        let added = Rc::new(RefCell::new(Vec::new()));

        let _adder = {
            let action = action.clone();
            let late = late.clone();
            let added = added.clone();
            action.clone().subscribe(move |_| {
                if added.borrow().is_empty() {
                    added.borrow_mut().push(late.attach(&action));
                }
            })
        };

        action.invoke((1,));
        assert!(late.is_empty());

        action.invoke((2,));
        assert_eq!(late.calls(), vec![(2,)]);
    }

    #[test]
    fn test_listener_cancelled_during_dispatch_is_skipped() {
        let (registry, _) = registry();
        let action = registry.action::<(u32,)>("tick").unwrap();
        let victim = Recorder::<(u32,)>::new();
        let victim_sub: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let _killer = {
            let victim_sub = victim_sub.clone();
            action.subscribe(move |_| {
                if let Some(sub) = victim_sub.borrow_mut().take() {
                    sub.cancel();
                }
            })
        };
        *victim_sub.borrow_mut() = Some(victim.attach(&action));

        action.invoke((1,));
        assert!(victim.is_empty());
        assert_eq!(action.listener_count(), 1);
    }

    #[test]
    fn test_listener_can_cancel_itself() {
        let (registry, _) = registry();
        let action = registry.action::<(u32,)>("tick").unwrap();
        let calls = Rc::new(Cell::new(0));
        let own: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let sub = {
            let calls = calls.clone();
            let own = own.clone();
            action.subscribe(move |_| {
                calls.set(calls.get() + 1);
                if let Some(sub) = own.borrow_mut().take() {
                    sub.cancel();
                }
            })
        };
        *own.borrow_mut() = Some(sub);

        action.invoke((1,));
        action.invoke((2,));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_nested_dispatch_runs_depth_first() {
        let (registry, _) = registry();
        let outer = registry.action::<(u32,)>("outer").unwrap();
        let inner = registry.action::<(u32,)>("inner").unwrap();
        let trace = Rc::new(RefCell::new(Vec::new()));

        let _o1 = {
            let trace = trace.clone();
            let inner = inner.clone();
            outer.subscribe(move |(n,)| {
                trace.borrow_mut().push(format!("outer1:{n}"));
                inner.invoke((n * 10,));
            })
        };
        let _o2 = {
            let trace = trace.clone();
            outer.subscribe(move |(n,)| trace.borrow_mut().push(format!("outer2:{n}")))
        };
        let _i = {
            let trace = trace.clone();
            inner.subscribe(move |(n,)| trace.borrow_mut().push(format!("inner:{n}")))
        };

        outer.invoke((1,));
        assert_eq!(*trace.borrow(), vec!["outer1:1", "inner:10", "outer2:1"]);
    }

    #[test]
    fn test_recursive_dispatch_on_same_action() {
        let (registry, _) = registry();
        let countdown = registry.action::<(u32,)>("countdown").unwrap();
        let recorder = Recorder::new();

        let _recurse = {
            let countdown = countdown.clone();
            countdown.clone().subscribe(move |(n,)| {
                if *n > 0 {
                    countdown.invoke((n - 1,));
                }
            })
        };
        let _rec = recorder.attach(&countdown);

        countdown.invoke((2,));
        // Deepest dispatch reaches the recorder first
        assert_eq!(recorder.calls(), vec![(0,), (1,), (2,)]);
    }

    #[test]
    fn test_subscribe_once() {
        let (registry, _) = registry();
        let action = registry.action::<(u32,)>("tick").unwrap();
        let recorder = Recorder::<(u32,)>::new();
        let listener = recorder.listener();
        let sub = action.subscribe_once(listener);

        action.invoke((1,));
        action.invoke((2,));

        assert_eq!(recorder.calls(), vec![(1,)]);
        assert!(!sub.is_active());
        assert_eq!(action.listener_count(), 0);
    }

    #[test]
    fn test_guard_cancels_on_drop() {
        let (registry, _) = registry();
        let action = registry.action::<(u32,)>("tick").unwrap();
        let recorder = Recorder::new();
        {
            let _guard = recorder.attach(&action).guard();
            action.invoke((1,));
        }
        action.invoke((2,));
        assert_eq!(recorder.calls(), vec![(1,)]);
    }

    #[test]
    fn test_detach_drops_listener_captures_outside_borrow() {
        let (registry, _) = registry();
        let action = registry.action::<()>("refresh").unwrap();
        let other = Recorder::<()>::new();
        let guard = other.attach(&action).guard();

        // This listener owns a guard for another listener on the same action.
        let owner = action.subscribe(move |_| {
            let _keep = &guard;
        });
        assert_eq!(action.listener_count(), 2);

        owner.cancel();
        assert_eq!(action.listener_count(), 0);
    }

    #[test]
    fn test_handle_debug_and_accessors() {
        let (registry, _) = registry();
        let action = registry
            .define(ActionDef::<(String,)>::new("namespaceChanged").args(["namespace"]))
            .unwrap();
        assert_eq!(action.name(), "namespaceChanged");
        assert_eq!(action.shape(), ["namespace".to_string()]);
        let debug = format!("{action:?}");
        assert!(debug.contains("namespaceChanged"));
        assert!(debug.contains("listeners: 0"));
    }

    #[cfg(feature = "channels")]
    #[test]
    fn test_forward_sends_clones_into_channel() {
        let (registry, reporter) = registry();
        let action = registry.action::<(String,)>("filterChanged").unwrap();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let _fwd = action.forward(tx);

        action.invoke(("{}".to_string(),));
        assert_eq!(rx.try_recv().unwrap(), ("{}".to_string(),));

        drop(rx);
        action.invoke(("{a: 1}".to_string(),));
        assert_eq!(reporter.len(), 1);
        assert_eq!(reporter.errors()[0].message(), "forward channel closed");
    }
}
