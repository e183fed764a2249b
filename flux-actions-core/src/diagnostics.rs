//! Diagnostic channel for pre-dispatch log lines
//!
//! Log lines produced by the built-in logging hook pass through a
//! [`LogFilter`] (glob patterns over action names) before being emitted to
//! `tracing` and, optionally, appended to an in-memory [`DispatchLog`].
//!
//! # Example
//!
//! ```
//! use flux_actions_core::diagnostics::LogFilter;
//!
//! // Log document actions, except the noisy pagination one
//! let filter = LogFilter::parse("*Documents*,filter*,-fetchNext*");
//! assert!(filter.should_log("filterChanged"));
//! assert!(!filter.should_log("fetchNextDocuments"));
//! assert!(!filter.should_log("namespaceChanged"));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Instant;

/// Environment variable read by [`LogFilter::from_env`]
pub const LOG_ENV: &str = "FLUX_ACTIONS_LOG";

/// `tracing` target used for pre-dispatch log lines
pub const LOG_TARGET: &str = "flux_actions::action";

/// Glob-pattern filter deciding which actions emit log lines.
///
/// Patterns support:
/// - `*` matches any sequence of characters
/// - `?` matches any single character
/// - Literal text matches exactly
///
/// An empty filter logs every action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogFilter {
    /// If non-empty, only log actions matching these patterns
    pub include: Vec<String>,
    /// Exclude actions matching these patterns (applied after include)
    pub exclude: Vec<String>,
}

impl LogFilter {
    /// Create a filter from comma-separated include and exclude patterns
    ///
    /// ```
    /// use flux_actions_core::diagnostics::LogFilter;
    ///
    /// let filter = LogFilter::new(Some("component*"), Some("componentDeregistered"));
    /// assert!(filter.should_log("componentRegistered"));
    /// assert!(!filter.should_log("componentDeregistered"));
    /// ```
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Self {
        Self {
            include: include.map(split_patterns).unwrap_or_default(),
            exclude: exclude.map(split_patterns).unwrap_or_default(),
        }
    }

    /// Parse a single comma-separated spec where `-pattern` excludes.
    ///
    /// A lone `*` (or an empty spec) includes everything.
    pub fn parse(spec: &str) -> Self {
        let mut filter = Self::default();
        for pattern in split_patterns(spec) {
            if let Some(excluded) = pattern.strip_prefix('-') {
                filter.exclude.push(excluded.to_string());
            } else if pattern != "*" {
                filter.include.push(pattern);
            }
        }
        filter
    }

    /// Read the filter from `FLUX_ACTIONS_LOG`, defaulting to log everything
    pub fn from_env() -> Self {
        std::env::var(LOG_ENV)
            .map(|spec| Self::parse(&spec))
            .unwrap_or_default()
    }

    /// Filter that suppresses every log line
    pub fn silent() -> Self {
        Self {
            include: Vec::new(),
            exclude: vec!["*".to_string()],
        }
    }

    /// Check if an action name should be logged
    pub fn should_log(&self, action: &str) -> bool {
        if !self.include.is_empty() && !self.include.iter().any(|p| glob_match(p, action)) {
            return false;
        }
        !self.exclude.iter().any(|p| glob_match(p, action))
    }
}

fn split_patterns(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// In-Memory Dispatch Log
// ============================================================================

/// One emitted log line
#[derive(Debug, Clone, Serialize)]
pub struct DispatchLogEntry {
    /// Name of the dispatched action
    pub action: String,
    /// Rendered log message
    pub message: String,
    /// Sequence number for ordering
    pub sequence: u64,
    /// When the line was emitted
    #[serde(skip)]
    pub timestamp: Instant,
}

impl DispatchLogEntry {
    fn new(action: &str, message: String, sequence: u64) -> Self {
        Self {
            action: action.to_string(),
            message,
            sequence,
            timestamp: Instant::now(),
        }
    }

    /// Time since this line was emitted
    pub fn elapsed(&self) -> std::time::Duration {
        self.timestamp.elapsed()
    }
}

/// Bounded ring buffer of recent log lines.
///
/// Older entries are discarded once capacity is reached.
#[derive(Debug, Clone)]
pub struct DispatchLog {
    entries: VecDeque<DispatchLogEntry>,
    capacity: usize,
    next_sequence: u64,
}

impl DispatchLog {
    /// Default number of retained entries
    pub const DEFAULT_CAPACITY: usize = 100;

    /// Create a log retaining at most `capacity` entries (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_sequence: 0,
        }
    }

    /// Append a line, evicting the oldest entry when full
    pub fn push(&mut self, action: &str, message: String) {
        let entry = DispatchLogEntry::new(action, message, self.next_sequence);
        self.next_sequence += 1;

        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// All entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &DispatchLogEntry> {
        self.entries.iter()
    }

    /// Most recent `count` entries, newest first
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &DispatchLogEntry> {
        self.entries.iter().rev().take(count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for DispatchLog {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

/// Match an action name against a glob pattern.
///
/// `*` matches any run of characters (including none) and `?` matches a
/// single character. The pattern is split on `*`: the first piece anchors at
/// the start, the last at the end, and the pieces between are found left to
/// right in what remains.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pieces: Vec<Vec<char>> = pattern.split('*').map(|p| p.chars().collect()).collect();

    let (head, rest) = match pieces.split_first() {
        Some(split) => split,
        None => return text.is_empty(),
    };
    let Some((tail, middle)) = rest.split_last() else {
        // No `*`: the whole name must match
        return head.len() == text.len() && piece_matches(head, &text);
    };

    if head.len() + tail.len() > text.len()
        || !piece_matches(head, &text)
        || !piece_matches(tail, &text[text.len() - tail.len()..])
    {
        return false;
    }

    let mut window = &text[head.len()..text.len() - tail.len()];
    for piece in middle {
        match find_piece(piece, window) {
            Some(at) => window = &window[at + piece.len()..],
            None => return false,
        }
    }
    true
}

/// `piece` matches the start of `text` (`?` matches any character)
fn piece_matches(piece: &[char], text: &[char]) -> bool {
    text.len() >= piece.len() && piece.iter().zip(text).all(|(p, t)| *p == '?' || p == t)
}

fn find_piece(piece: &[char], text: &[char]) -> Option<usize> {
    let last = text.len().checked_sub(piece.len())?;
    (0..=last).find(|&at| piece_matches(piece, &text[at..]))
}
