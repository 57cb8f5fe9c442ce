//! Change tracking for optimization passes.
//!
//! Every rewrite a pass performs is recorded as an [`Event`] in an [`EventLog`].
//! Passes collect their events in a local log and merge it into the method's log
//! only when they changed something, so an empty log means "no change".
//!
//! ```rust
//! use tacopt::compiler::{EventKind, EventLog};
//! use tacopt::prelude::NodeId;
//!
//! let mut log = EventLog::new();
//! log.record(EventKind::ConstantFolded)
//!     .at(NodeId::new(2))
//!     .message("v2.1 = 15");
//!
//! assert_eq!(log.count(EventKind::ConstantFolded), 1);
//! assert_eq!(log.iter().next().and_then(|e| e.node), Some(NodeId::new(2)));
//! ```

use std::{collections::BTreeMap, fmt};

use strum::{Display, EnumIter};

use crate::utils::graph::NodeId;

/// The kind of change an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum EventKind {
    /// An instruction whose result is never read was removed.
    InstructionRemoved,
    /// A phi-function whose result is never read was removed.
    PhiRemoved,
    /// A phi-function whose operands all carry the same constant was folded.
    PhiFolded,
    /// A phi operand for an edge that no longer exists was dropped.
    PhiOperandPruned,
    /// An instruction was evaluated at compile time.
    ConstantFolded,
    /// A constant was substituted for a variable use.
    ConstantSubstituted,
    /// A compare-branch with constant operands was resolved.
    BranchFolded,
    /// A node without predecessors, or unreachable from any start, was removed.
    BlockRemoved,
    /// A label with a single predecessor and a single successor was removed.
    LabelRemoved,
}

/// A single recorded change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// What happened.
    pub kind: EventKind,
    /// The node the change applies to, if any.
    pub node: Option<NodeId>,
    /// Free-form detail for diagnostics.
    pub message: String,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(node) = self.node {
            write!(f, " at {node}")?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

/// An ordered log of [`Event`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event of `kind` and returns a builder to fill in its details.
    pub fn record(&mut self, kind: EventKind) -> EventBuilder<'_> {
        self.events.push(Event {
            kind,
            node: None,
            message: String::new(),
        });
        EventBuilder { log: self }
    }

    /// Moves every event of `other` to the end of this log.
    pub fn merge(&mut self, other: EventLog) {
        self.events.extend(other.events);
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns the number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns the number of events of `kind`.
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    /// Returns the number of events per kind, for kinds that occurred.
    #[must_use]
    pub fn counts(&self) -> BTreeMap<EventKind, usize> {
        let mut counts = BTreeMap::new();
        for event in &self.events {
            *counts.entry(event.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Iterates over the events in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Fills in the event most recently added by [`EventLog::record`].
pub struct EventBuilder<'a> {
    log: &'a mut EventLog,
}

impl EventBuilder<'_> {
    /// Attaches the node the change applies to.
    #[must_use]
    pub fn at(self, node: NodeId) -> Self {
        if let Some(event) = self.log.events.last_mut() {
            event.node = Some(node);
        }
        self
    }

    /// Attaches a diagnostic message.
    #[allow(clippy::return_self_not_must_use)]
    pub fn message(self, message: impl Into<String>) -> Self {
        if let Some(event) = self.log.events.last_mut() {
            event.message = message.into();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_count() {
        let mut log = EventLog::new();
        assert!(log.is_empty());

        log.record(EventKind::PhiRemoved).at(NodeId::new(4));
        log.record(EventKind::PhiRemoved);
        log.record(EventKind::BranchFolded).message("bge_i4 5, 3 taken");

        assert_eq!(log.len(), 3);
        assert_eq!(log.count(EventKind::PhiRemoved), 2);
        assert_eq!(log.count(EventKind::LabelRemoved), 0);
        assert_eq!(log.counts().get(&EventKind::BranchFolded), Some(&1));
    }

    #[test]
    fn test_merge_keeps_order() {
        let mut first = EventLog::new();
        first.record(EventKind::ConstantFolded);
        let mut second = EventLog::new();
        second.record(EventKind::InstructionRemoved);

        first.merge(second);
        let kinds: Vec<EventKind> = first.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::ConstantFolded, EventKind::InstructionRemoved]);
    }

    #[test]
    fn test_event_display() {
        let mut log = EventLog::new();
        log.record(EventKind::LabelRemoved)
            .at(NodeId::new(6))
            .message("label 2");
        let event = log.iter().next().unwrap();
        assert_eq!(event.to_string(), "label-removed at n6: label 2");
    }
}
