//! Trigger Dispatcher (C7): an id-ordered table of text/line/delay/event triggers, independent
//! of the foreground call stack (§4.7). `TriggerTable` only tracks registrations; actual
//! dispatch against incoming text lives on `Vm` since it needs to run handler bodies.

use std::collections::BTreeMap;
use std::time::Instant;

#[derive(Debug, Clone)]
pub enum TriggerKind {
    TextMatch { pattern: String },
    TextLine { pattern: String },
    Delay { deadline: Instant },
    Event { name: String },
}

#[derive(Debug, Clone)]
pub struct Trigger {
    pub id: i64,
    pub kind: TriggerKind,
    pub handler: String,
}

/// Keyed by a `BTreeMap` so iteration is naturally ascending-id order (§4.7's firing-order
/// requirement), with no separate sort step needed.
#[derive(Debug, Default)]
pub struct TriggerTable {
    triggers: BTreeMap<i64, Trigger>,
}

impl TriggerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, id: i64, kind: TriggerKind, handler: impl Into<String>) {
        self.triggers.insert(id, Trigger { id, kind, handler: handler.into() });
    }

    pub fn kill(&mut self, id: i64) {
        self.triggers.remove(&id);
    }

    pub fn kill_all(&mut self) {
        self.triggers.clear();
    }

    pub fn get(&self, id: i64) -> Option<&Trigger> {
        self.triggers.get(&id)
    }

    /// A snapshot of ids in ascending order, safe to iterate over while handlers mutate the
    /// live table underneath (§4.7's mutation-during-dispatch note).
    pub fn snapshot_ids(&self) -> Vec<i64> {
        self.triggers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_ascending_and_stable_under_mutation() {
        let mut table = TriggerTable::new();
        table.set(5, TriggerKind::Event { name: "a".into() }, "H1");
        table.set(1, TriggerKind::Event { name: "b".into() }, "H2");
        table.set(3, TriggerKind::Event { name: "c".into() }, "H3");
        let ids = table.snapshot_ids();
        assert_eq!(ids, vec![1, 3, 5]);

        table.kill(1);
        // the already-taken snapshot is unaffected
        assert_eq!(ids, vec![1, 3, 5]);
        assert_eq!(table.snapshot_ids(), vec![3, 5]);
    }

    #[test]
    fn kill_all_empties_the_table() {
        let mut table = TriggerTable::new();
        table.set(1, TriggerKind::Event { name: "a".into() }, "H");
        table.kill_all();
        assert!(table.is_empty());
    }
}
