//! Binding records and scope inheritance.
//!
//! Every element carrying the controllers attribute owns one binding record.
//! Records form a chain through `parent`, which points at the record of the
//! nearest ancestor element that has one. Resolving the controllers visible
//! at a node follows that chain instead of walking the tree, and the merged
//! result is cached until the arena generation moves.

use std::{collections::HashMap, fmt, rc::Rc};

use indexmap::IndexMap;
use taproot_types::{Document, NodeId};
use tracing::{debug, trace};

use crate::controller::ControllerInstance;

/// Descriptor → element owning the nearest instance of it.
pub type VisibleControllers = IndexMap<String, NodeId>;

/// Identity of one binding record. Replacing a node's record yields a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u64);

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "binding#{}", self.0)
    }
}

#[derive(Debug)]
pub(crate) struct BindingRecord {
    node: NodeId,
    pub(crate) instances: IndexMap<String, ControllerInstance>,
    parent: Option<BindingId>,
    cache: Option<(u64, Rc<VisibleControllers>)>,
}

#[derive(Debug, Default)]
pub(crate) struct ScopeArena {
    records: HashMap<BindingId, BindingRecord>,
    by_node: HashMap<NodeId, BindingId>,
    next_id: u64,
    generation: u64,
}

impl ScopeArena {
    pub(crate) fn binding_of(&self, node: NodeId) -> Option<BindingId> {
        self.by_node.get(&node).copied()
    }

    pub(crate) fn record(&self, node: NodeId) -> Option<&BindingRecord> {
        self.records.get(self.by_node.get(&node)?)
    }

    pub(crate) fn record_mut(&mut self, node: NodeId) -> Option<&mut BindingRecord> {
        self.records.get_mut(self.by_node.get(&node)?)
    }

    /// Marks every cached resolution as stale.
    pub(crate) fn touch(&mut self) {
        self.generation += 1;
    }

    /// Returns the record of `node`, creating one linked to its nearest bound ancestor.
    pub(crate) fn ensure(&mut self, document: &dyn Document, node: NodeId) -> BindingId {
        if let Some(id) = self.binding_of(node) {
            return id;
        }

        self.next_id += 1;
        let id = BindingId(self.next_id);
        let parent = self.nearest_ancestor_binding(document, node);
        self.records.insert(
            id,
            BindingRecord {
                node,
                instances: IndexMap::new(),
                parent,
                cache: None,
            },
        );
        self.by_node.insert(node, id);
        self.touch();
        trace!(node = %node, binding = %id, "created binding record");
        id
    }

    pub(crate) fn remove(&mut self, node: NodeId) -> Option<BindingRecord> {
        let id = self.by_node.remove(&node)?;
        self.touch();
        self.records.remove(&id)
    }

    /// Re-links the record of `node` against its current ancestry.
    pub(crate) fn relink(&mut self, document: &dyn Document, node: NodeId) {
        let Some(id) = self.binding_of(node) else {
            return;
        };
        let parent = self.nearest_ancestor_binding(document, node);
        if let Some(record) = self.records.get_mut(&id)
            && record.parent != parent
        {
            record.parent = parent;
            self.touch();
        }
    }

    /// Re-links every record strictly below `node`. Lifecycle hooks are not involved.
    pub(crate) fn rebase(&mut self, document: &dyn Document, node: NodeId) {
        let mut rebased = 0_usize;
        for descendant in document.subtree(node).into_iter().skip(1) {
            if self.by_node.contains_key(&descendant) {
                self.relink(document, descendant);
                rebased += 1;
            }
        }
        self.touch();
        debug!(node = %node, rebased, "rebased descendant scopes");
    }

    /// Controllers visible at `node`: its own and every ancestor's, nearest first.
    pub(crate) fn resolve_visible(&mut self, document: &dyn Document, node: NodeId) -> Rc<VisibleControllers> {
        let start = match self.binding_of(node) {
            Some(id) => Some(id),
            None => self.nearest_ancestor_binding(document, node),
        };
        let Some(start) = start else {
            return Rc::new(VisibleControllers::new());
        };

        if let Some(record) = self.records.get(&start)
            && let Some((generation, visible)) = &record.cache
            && *generation == self.generation
        {
            return Rc::clone(visible);
        }

        let mut visible = VisibleControllers::new();
        let mut current = Some(start);
        let mut remaining = self.records.len();
        while let Some(id) = current {
            let Some(record) = self.records.get(&id) else {
                break;
            };
            if remaining == 0 {
                break;
            }
            remaining -= 1;
            for descriptor in record.instances.keys() {
                visible.entry(descriptor.clone()).or_insert(record.node);
            }
            let (owner, parent) = (record.node, record.parent);

            current = match parent {
                Some(parent) if self.records.contains_key(&parent) => Some(parent),
                Some(_) => {
                    // The parent record was dropped or replaced since this link was made.
                    self.relink(document, owner);
                    self.records.get(&id).and_then(|record| record.parent)
                }
                None => None,
            };
        }

        let visible = Rc::new(visible);
        let generation = self.generation;
        if let Some(record) = self.records.get_mut(&start) {
            record.cache = Some((generation, Rc::clone(&visible)));
        }
        visible
    }

    fn nearest_ancestor_binding(&self, document: &dyn Document, node: NodeId) -> Option<BindingId> {
        document
            .ancestors(node)
            .into_iter()
            .find_map(|ancestor| self.binding_of(ancestor))
    }
}
