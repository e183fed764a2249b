//! Document actions - Minimal flux-actions example
//!
//! A document browser's action set, driven by a scripted session:
//! - Actions: What can happen (declared with #[derive(ActionSet)])
//! - Store: listeners that keep the browser state current
//! - Forward: a tokio channel that receives every filter change
//!
//! Run with `--list` to print the action descriptions as JSON, or
//! `--log "-fetchNextDocuments"` to silence one action's log line.

use std::cell::RefCell;
use std::rc::Rc;

use clap::Parser;
use flux_actions::prelude::*;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Actions - What can happen
// ============================================================================

#[derive(ActionSet)]
struct DocumentActions {
    #[action(args = "component", log = "Component {component} registered.")]
    component_registered: ActionHandle<(String,)>,

    #[action(args = "component", log = "Component {component} deregistered.")]
    component_deregistered: ActionHandle<(String,)>,

    #[action(args = "page", log_with = "fetching_page")]
    fetch_next_documents: ActionHandle<(u32,)>,

    #[action(args = "filter", log = "Filter changed to: {filter}.")]
    filter_changed: ActionHandle<(String,)>,

    #[action(args = "namespace", log = "Namespace changed to: {namespace}.")]
    namespace_changed: ActionHandle<(String,)>,
}

/// Pages are zero-based internally, one-based for people
fn fetching_page((page,): &(u32,)) -> String {
    format!("Fetching the documents on page: {}.", page + 1)
}

// ============================================================================
// State - What the browser knows
// ============================================================================

#[derive(Debug, Default)]
struct BrowserState {
    components: Vec<String>,
    namespace: String,
    filter: String,
    pages_loaded: u32,
}

/// Subscribe the store listeners. Changing the namespace or the filter
/// restarts paging with a nested fetch.
fn connect_store(
    actions: &DocumentActions,
    state: &Rc<RefCell<BrowserState>>,
) -> Vec<Subscription> {
    let mut subs = Vec::new();

    let s = Rc::clone(state);
    subs.push(actions.component_registered.subscribe(move |(component,)| {
        s.borrow_mut().components.push(component.clone());
    }));

    let s = Rc::clone(state);
    subs.push(actions.component_deregistered.subscribe(move |(component,)| {
        s.borrow_mut().components.retain(|c| c != component);
    }));

    let s = Rc::clone(state);
    subs.push(actions.fetch_next_documents.subscribe(move |(page,)| {
        s.borrow_mut().pages_loaded = page + 1;
    }));

    let s = Rc::clone(state);
    let fetch = actions.fetch_next_documents.clone();
    subs.push(actions.namespace_changed.subscribe(move |(namespace,)| {
        {
            let mut state = s.borrow_mut();
            state.namespace = namespace.clone();
            state.pages_loaded = 0;
        }
        fetch.invoke((0,));
    }));

    let s = Rc::clone(state);
    let fetch = actions.fetch_next_documents.clone();
    subs.push(actions.filter_changed.try_subscribe(
        move |(filter,): &(String,)| -> Result<(), serde_json::Error> {
            serde_json::from_str::<serde_json::Value>(filter)?;
            {
                let mut state = s.borrow_mut();
                state.filter = filter.clone();
                state.pages_loaded = 0;
            }
            fetch.invoke((0,));
            Ok(())
        },
    ));

    subs
}

// ============================================================================
// Main - Register, run the scripted session, report
// ============================================================================

#[derive(Parser, Debug)]
#[command(about = "Scripted document browser session built on flux-actions")]
struct Cli {
    /// Log filter, e.g. "filter*,namespace*" or "-fetchNextDocuments"
    #[arg(long)]
    log: Option<String>,

    /// Number of log lines kept in the in-memory history
    #[arg(long, default_value_t = 20)]
    history: usize,

    /// Print the action descriptions as JSON and exit
    #[arg(long)]
    list: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,flux_actions::action=debug")),
        )
        .init();

    let mut config = RegistryConfig::from_env().with_history(cli.history);
    if let Some(spec) = cli.log.as_deref() {
        config = config.with_log(LogFilter::parse(spec));
    }
    let registry = ActionRegistry::with_config(config);
    let actions = DocumentActions::register(&registry)?;

    if cli.list {
        println!("{}", serde_json::to_string_pretty(&actions.specs())?);
        return Ok(());
    }

    let state = Rc::new(RefCell::new(BrowserState::default()));
    let subs = connect_store(&actions, &state);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let forward = actions.filter_changed.forward(tx);

    // Scripted session
    actions
        .component_registered
        .invoke(("Document list".to_string(),));
    actions
        .component_registered
        .invoke(("Filter bar".to_string(),));
    actions.namespace_changed.invoke(("team-a".to_string(),));
    actions.fetch_next_documents.invoke((1,));
    actions
        .filter_changed
        .invoke((r#"{"status": "draft"}"#.to_string(),));
    actions.filter_changed.invoke(("not json".to_string(),));
    actions
        .component_deregistered
        .invoke(("Filter bar".to_string(),));

    forward.cancel();
    for sub in subs {
        sub.cancel();
    }

    while let Some((filter,)) = rx.recv().await {
        tracing::info!(%filter, "forwarded filter change");
    }

    tracing::info!(state = ?state.borrow(), "session finished");
    for entry in registry.history() {
        println!("#{:<3} {:<22} {}", entry.sequence, entry.action, entry.message);
    }

    Ok(())
}
