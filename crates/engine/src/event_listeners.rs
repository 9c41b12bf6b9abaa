//! Per-element tables of action listeners.

use std::collections::HashMap;

use indexmap::{IndexMap, map::Entry};
use taproot_types::{Document, ListenerId, NodeId};
use tracing::trace;

use crate::event_listener::{EventListenerEntry, Handler, ListenerKey, parse_actions};

#[derive(Debug)]
pub(crate) struct EventListenerRegistry {
    attribute: String,
    by_node: HashMap<NodeId, IndexMap<ListenerKey, EventListenerEntry>>,
    by_listener: HashMap<ListenerId, (NodeId, ListenerKey)>,
}

impl EventListenerRegistry {
    pub(crate) fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            by_node: HashMap::new(),
            by_listener: HashMap::new(),
        }
    }

    /// Parses the actions of an element entering the document.
    ///
    /// An element re-entering with a table is re-parsed too: unchanged keys
    /// keep their listener, edits made while it was detached take effect.
    pub(crate) fn create(&mut self, document: &mut dyn Document, node: NodeId) {
        self.update(document, node);
    }

    pub(crate) fn is_tracking(&self, node: NodeId) -> bool {
        self.by_node.contains_key(&node)
    }

    /// Re-parses the action attribute of `node`.
    ///
    /// Listeners whose key is still declared are reused with a fresh handler
    /// list; listeners left without handlers are detached.
    pub(crate) fn update(&mut self, document: &mut dyn Document, node: NodeId) {
        let Some(value) = document.attribute(node, &self.attribute) else {
            self.destroy(document, node);
            return;
        };

        let entries = self.by_node.entry(node).or_default();
        for entry in entries.values_mut() {
            entry.handlers.clear();
        }

        for binding in parse_actions(&value, node) {
            for key in binding.events {
                let entry = match entries.entry(key) {
                    Entry::Occupied(occupied) => occupied.into_mut(),
                    Entry::Vacant(vacant) => {
                        let entry = EventListenerEntry::attach(document, node, vacant.key());
                        self.by_listener.insert(entry.listener(), (node, vacant.key().clone()));
                        vacant.insert(entry)
                    }
                };
                entry.handlers.extend(binding.handlers.iter().cloned());
            }
        }

        let by_listener = &mut self.by_listener;
        entries.retain(|_, entry| {
            if entry.handlers.is_empty() {
                by_listener.remove(&entry.listener());
                entry.detach(document);
                false
            } else {
                true
            }
        });
    }

    /// Detaches every listener of `node` and forgets its table.
    pub(crate) fn destroy(&mut self, document: &mut dyn Document, node: NodeId) {
        let Some(entries) = self.by_node.remove(&node) else {
            return;
        };
        for entry in entries.values() {
            self.by_listener.remove(&entry.listener());
            entry.detach(document);
        }
    }

    /// The element a listener was declared on and its current handlers.
    pub(crate) fn handlers(&self, listener: ListenerId) -> Option<(NodeId, Vec<Handler>)> {
        let (node, key) = self.by_listener.get(&listener)?;
        let entry = self.by_node.get(node)?.get(key)?;
        Some((*node, entry.handlers.clone()))
    }

    /// Forgets `listener` if it was a `once` listener, which the host drops
    /// as soon as it is scheduled for a dispatch.
    pub(crate) fn release_once(&mut self, listener: ListenerId) {
        let Some((node, key)) = self.by_listener.get(&listener) else {
            return;
        };
        if !key.options.once {
            return;
        }
        let (node, key) = (*node, key.clone());
        self.by_listener.remove(&listener);
        if let Some(entries) = self.by_node.get_mut(&node) {
            entries.shift_remove(&key);
            if entries.is_empty() {
                self.by_node.remove(&node);
            }
        }
        trace!(node = %node, event_type = %key.event_type, "released once listener");
    }

    /// Listener keys declared on `node`, in first-declaration order.
    pub(crate) fn keys_on(&self, node: NodeId) -> Vec<ListenerKey> {
        self.by_node
            .get(&node)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }
}
