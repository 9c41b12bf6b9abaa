//! Per-element observation of data attributes that have change hooks.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use taproot_types::{Document, MutationRecord, NodeId, ObserveOptions, ObserverId};
use tracing::trace;

/// One observer per element, watching exactly the attributes its controllers hook.
#[derive(Debug, Default)]
pub(crate) struct AttributeObservers {
    by_node: HashMap<NodeId, ObserverId>,
    by_observer: HashMap<ObserverId, NodeId>,
}

impl AttributeObservers {
    /// Replaces the watched attribute set of `node`. An empty set stops observation.
    pub(crate) fn observe<I>(&mut self, document: &mut dyn Document, node: NodeId, names: I)
    where
        I: IntoIterator<Item = String>,
    {
        let names: IndexSet<String> = names.into_iter().collect();
        if names.is_empty() {
            self.unobserve(document, node);
            return;
        }

        let observer = match self.by_node.get(&node) {
            Some(observer) => *observer,
            None => {
                let observer = document.create_observer();
                self.by_node.insert(node, observer);
                self.by_observer.insert(observer, node);
                observer
            }
        };
        trace!(node = %node, observer = %observer, attributes = names.len(), "observing data attributes");
        document.observe(observer, node, ObserveOptions::attributes(names));
    }

    pub(crate) fn unobserve(&mut self, document: &mut dyn Document, node: NodeId) {
        if let Some(observer) = self.by_node.remove(&node) {
            self.by_observer.remove(&observer);
            document.disconnect_observer(observer);
        }
    }

    pub(crate) fn node_for(&self, observer: ObserverId) -> Option<NodeId> {
        self.by_observer.get(&observer).copied()
    }
}

/// Attributes whose value at the start of the batch differs from their live value.
///
/// Only the first record per name matters: its old value is the value before
/// the batch, so overwrites that end where they started cancel out.
pub(crate) fn changed_attributes(document: &dyn Document, records: &[MutationRecord]) -> Vec<String> {
    let mut changed: IndexMap<&str, bool> = IndexMap::new();
    for record in records {
        if let MutationRecord::Attributes { target, name, old_value } = record {
            changed
                .entry(name.as_str())
                .or_insert_with(|| old_value.as_deref() != document.attribute(*target, name).as_deref());
        }
    }

    changed
        .into_iter()
        .filter(|(_, changed)| *changed)
        .map(|(name, _)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use taproot_dom::MemoryDocument;

    use super::*;

    #[test]
    fn overwrites_that_return_to_the_start_cancel_out() {
        let mut document = MemoryDocument::new();
        let body = document.body();
        document.set_attribute(body, "data-x-greeting", "A");

        let mut observers = AttributeObservers::default();
        observers.observe(&mut document, body, ["data-x-greeting".to_string(), "data-x-count".to_string()]);
        for value in ["B", "C", "A"] {
            document.set_attribute(body, "data-x-greeting", value);
        }
        document.set_attribute(body, "data-x-count", "1");
        document.set_attribute(body, "data-x-ignored", "1");

        let batches = document.take_records();
        assert_eq!(batches.len(), 1);
        assert_eq!(observers.node_for(batches[0].observer), Some(body));
        assert_eq!(changed_attributes(&document, &batches[0].records), vec!["data-x-count"]);
    }

    #[test]
    fn reobserving_replaces_names_and_empty_sets_disconnect() {
        let mut document = MemoryDocument::new();
        let body = document.body();
        let mut observers = AttributeObservers::default();

        observers.observe(&mut document, body, ["data-a".to_string()]);
        let observer = *observers.by_node.get(&body).expect("observer");
        observers.observe(&mut document, body, ["data-b".to_string(), "data-b".to_string()]);
        assert_eq!(document.observed_attributes(observer, body), Some(vec!["data-b".to_string()]));
        assert_eq!(document.observer_count(), 1);

        observers.observe(&mut document, body, Vec::new());
        assert!(!observers.by_node.contains_key(&body));
        assert_eq!(document.observer_count(), 0);
    }
}
