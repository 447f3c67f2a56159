//! Mutation observation.
//!
//! Every structural or attribute change made through [`crate::Dom`] is turned
//! into a [`MutationRecord`] and queued for each registered observer whose
//! registration covers the changed node. Queues are drained explicitly with
//! [`MutationRegistry::take_records`]; an observer can supply a notify hook
//! that fires when its queue goes from empty to non-empty, which is where a
//! host schedules delivery.
//!
//! The notify hook runs while the tree is mutably borrowed and must not touch
//! the document.

use std::collections::HashMap;
use std::rc::Rc;

use crate::node::NodeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MutationObserverId(u32);

/// What an observer wants to hear about for one registered target.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MutationObserverInit {
    pub child_list: bool,
    pub attributes: bool,
    /// Also observe every node below the target.
    pub subtree: bool,
    /// When set, only attribute changes to these (lowercase) names are recorded.
    pub attribute_filter: Option<Vec<String>>,
    pub attribute_old_value: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationRecord {
    ChildList {
        target: NodeId,
        added_nodes: Vec<NodeId>,
        removed_nodes: Vec<NodeId>,
    },
    Attributes {
        target: NodeId,
        attribute_name: String,
        old_value: Option<String>,
    },
}

impl MutationRecord {
    pub fn target(&self) -> NodeId {
        match self {
            MutationRecord::ChildList { target, .. } | MutationRecord::Attributes { target, .. } => {
                *target
            }
        }
    }
}

type NotifyHook = Rc<dyn Fn()>;

#[derive(Default)]
struct Registration {
    targets: Vec<(NodeId, MutationObserverInit)>,
    records: Vec<MutationRecord>,
    notify: Option<NotifyHook>,
}

impl Registration {
    fn wants(&self, inclusive_ancestors: &[NodeId], record: &MutationRecord) -> bool {
        let target = record.target();
        self.targets.iter().any(|(root, init)| {
            let covers = if init.subtree {
                inclusive_ancestors.contains(root)
            } else {
                *root == target
            };
            covers
                && match record {
                    MutationRecord::ChildList { .. } => init.child_list,
                    MutationRecord::Attributes { attribute_name, .. } => {
                        init.attributes
                            && init
                                .attribute_filter
                                .as_ref()
                                .is_none_or(|names| names.iter().any(|n| n == attribute_name))
                    }
                }
        })
    }

    fn keeps_old_value(&self, inclusive_ancestors: &[NodeId]) -> bool {
        self.targets
            .iter()
            .any(|(root, init)| init.attribute_old_value && inclusive_ancestors.contains(root))
    }
}

/// All mutation observers attached to one tree.
#[derive(Default)]
pub struct MutationRegistry {
    observers: HashMap<MutationObserverId, Registration>,
    next_id: u32,
}

impl MutationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an observer with no targets yet.
    pub fn register(&mut self, notify: Option<Rc<dyn Fn()>>) -> MutationObserverId {
        let id = MutationObserverId(self.next_id);
        self.next_id += 1;
        self.observers.insert(
            id,
            Registration {
                notify,
                ..Registration::default()
            },
        );
        id
    }

    /// Start observing `target`. Observing the same target again replaces its options.
    pub fn observe(&mut self, id: MutationObserverId, target: NodeId, init: MutationObserverInit) {
        let Some(reg) = self.observers.get_mut(&id) else {
            return;
        };
        match reg.targets.iter_mut().find(|(t, _)| *t == target) {
            Some(slot) => slot.1 = init,
            None => reg.targets.push((target, init)),
        }
    }

    /// Stop observing every target and drop queued records.
    pub fn disconnect(&mut self, id: MutationObserverId) {
        if let Some(reg) = self.observers.get_mut(&id) {
            reg.targets.clear();
            reg.records.clear();
        }
    }

    /// Forget the observer entirely.
    pub fn unregister(&mut self, id: MutationObserverId) {
        self.observers.remove(&id);
    }

    pub fn take_records(&mut self, id: MutationObserverId) -> Vec<MutationRecord> {
        self.observers
            .get_mut(&id)
            .map(|reg| std::mem::take(&mut reg.records))
            .unwrap_or_default()
    }

    pub fn is_observing(&self, id: MutationObserverId) -> bool {
        self.observers.get(&id).is_some_and(|reg| !reg.targets.is_empty())
    }

    /// Queue `record` for every interested observer. `inclusive_ancestors`
    /// starts with the record target and walks up to its tree root.
    pub(crate) fn enqueue(&mut self, inclusive_ancestors: &[NodeId], record: MutationRecord) {
        let mut to_notify = Vec::new();
        for reg in self.observers.values_mut() {
            if !reg.wants(inclusive_ancestors, &record) {
                continue;
            }
            let mut record = record.clone();
            if let MutationRecord::Attributes { old_value, .. } = &mut record {
                if !reg.keeps_old_value(inclusive_ancestors) {
                    *old_value = None;
                }
            }
            let was_empty = reg.records.is_empty();
            reg.records.push(record);
            if was_empty {
                if let Some(notify) = &reg.notify {
                    to_notify.push(notify.clone());
                }
            }
        }
        for notify in to_notify {
            notify();
        }
    }

    pub(crate) fn has_observers(&self) -> bool {
        self.observers.values().any(|reg| !reg.targets.is_empty())
    }
}

impl std::fmt::Debug for MutationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationRegistry")
            .field("observers", &self.observers.len())
            .finish()
    }
}
