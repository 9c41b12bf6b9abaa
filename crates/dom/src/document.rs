use indexmap::IndexMap;
use taproot_types::{
    DispatchStep, Document, EventPhase, ListenerId, ListenerOptions, ListenerTarget, MutationBatch, MutationRecord, NodeId,
    ObserveOptions, ObserverId, ReadyState,
};
use tracing::trace;

use crate::markup::{MarkupError, MarkupNode, parse_fragment};

#[derive(Debug, Clone)]
struct NodeData {
    tag: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: IndexMap<String, String>,
    text: String,
}

#[derive(Debug, Default)]
struct ObserverState {
    registrations: IndexMap<NodeId, ObserveOptions>,
    queue: Vec<MutationRecord>,
}

#[derive(Debug, Clone)]
struct ListenerEntry {
    target: ListenerTarget,
    event_type: String,
    options: ListenerOptions,
}

/// Arena-backed document implementing the [`Document`] port.
///
/// The document element is `<html>` with a single `<body>` child. Nodes are
/// never freed; detached nodes keep their subtree and can be re-inserted.
#[derive(Debug)]
pub struct MemoryDocument {
    nodes: Vec<NodeData>,
    root: NodeId,
    body: NodeId,
    ready_state: ReadyState,
    observers: IndexMap<ObserverId, ObserverState>,
    next_observer: u64,
    listeners: IndexMap<ListenerId, ListenerEntry>,
    next_listener: u64,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// Creates a fully loaded document.
    pub fn new() -> Self {
        Self::with_ready_state(ReadyState::Complete)
    }

    /// Creates a document that is still loading; call
    /// [`finish_loading`](Self::finish_loading) to signal content-loaded.
    pub fn loading() -> Self {
        Self::with_ready_state(ReadyState::Loading)
    }

    fn with_ready_state(ready_state: ReadyState) -> Self {
        let mut document = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            body: NodeId(0),
            ready_state,
            observers: IndexMap::new(),
            next_observer: 0,
            listeners: IndexMap::new(),
            next_listener: 0,
        };
        document.root = document.create_element("html");
        document.body = document.create_element("body");
        document.nodes[document.body.0].parent = Some(document.root);
        document.nodes[document.root.0].children.push(document.body);
        document
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Moves the document out of the loading state.
    pub fn finish_loading(&mut self) {
        if self.ready_state == ReadyState::Loading {
            self.ready_state = ReadyState::Interactive;
        }
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            tag: tag.to_ascii_lowercase(),
            parent: None,
            children: Vec::new(),
            attributes: IndexMap::new(),
            text: String::new(),
        });
        id
    }

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.node(node).map(|data| data.tag.as_str())
    }

    /// Attribute names of `node` in insertion order.
    pub fn attribute_names(&self, node: NodeId) -> Vec<String> {
        self.node(node)
            .map(|data| data.attributes.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Appends `child` to `parent`, detaching it from its current parent first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_child(parent, child, None);
    }

    /// Inserts `child` into `parent` before `reference`, or at the end when
    /// `reference` is not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        self.insert_child(parent, child, Some(reference));
    }

    /// Detaches `node` from its parent. Detached nodes are left untouched.
    pub fn remove(&mut self, node: NodeId) {
        let Some(parent) = self.node(node).and_then(|data| data.parent) else {
            return;
        };
        self.nodes[parent.0].children.retain(|child| *child != node);
        self.nodes[node.0].parent = None;
        self.record(MutationRecord::ChildList {
            target: parent,
            added: Vec::new(),
            removed: vec![node],
        });
    }

    /// Parses `markup` and appends the resulting elements to `parent`.
    ///
    /// Returns every created element in document order, top-level elements
    /// first within each subtree.
    pub fn append_html(&mut self, parent: NodeId, markup: &str) -> Result<Vec<NodeId>, MarkupError> {
        let fragment = parse_fragment(markup)?;
        let mut created = Vec::new();
        for node in &fragment {
            let element = self.materialize(node, &mut created);
            self.append_child(parent, element);
        }
        Ok(created)
    }

    /// Number of listeners currently attached.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Listeners attached to `target`, as `(event type, options)` pairs.
    pub fn listeners_on(&self, target: ListenerTarget) -> Vec<(String, ListenerOptions)> {
        self.listeners
            .values()
            .filter(|entry| entry.target == target)
            .map(|entry| (entry.event_type.clone(), entry.options))
            .collect()
    }

    /// Number of observers that have not been disconnected.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Attribute names `observer` currently reports for `node`.
    pub fn observed_attributes(&self, observer: ObserverId, node: NodeId) -> Option<Vec<String>> {
        self.observers
            .get(&observer)?
            .registrations
            .get(&node)?
            .attribute_filter
            .clone()
    }

    fn materialize(&mut self, markup: &MarkupNode, created: &mut Vec<NodeId>) -> NodeId {
        let element = self.create_element(&markup.tag);
        created.push(element);
        let data = &mut self.nodes[element.0];
        data.attributes = markup.attributes.clone();
        data.text = markup.text.clone();
        for child in &markup.children {
            let child_id = self.materialize(child, created);
            self.nodes[child_id.0].parent = Some(element);
            self.nodes[element.0].children.push(child_id);
        }
        element
    }

    fn insert_child(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if self.node(parent).is_none() || self.node(child).is_none() || self.is_inclusive_ancestor(child, parent) {
            return;
        }
        self.remove(child);
        let siblings = &mut self.nodes[parent.0].children;
        let position = reference
            .and_then(|reference| siblings.iter().position(|sibling| *sibling == reference))
            .unwrap_or(siblings.len());
        siblings.insert(position, child);
        self.nodes[child.0].parent = Some(parent);
        self.record(MutationRecord::ChildList {
            target: parent,
            added: vec![child],
            removed: Vec::new(),
        });
    }

    fn node(&self, node: NodeId) -> Option<&NodeData> {
        self.nodes.get(node.0)
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(candidate) = current {
            if candidate == ancestor {
                return true;
            }
            current = self.node(candidate).and_then(|data| data.parent);
        }
        false
    }

    fn registration_matches(&self, observed: NodeId, options: &ObserveOptions, target: NodeId) -> bool {
        observed == target || (options.subtree && self.is_inclusive_ancestor(observed, target))
    }

    fn record(&mut self, record: MutationRecord) {
        let target = record.target();
        let mut deliveries = Vec::new();

        for (observer_id, observer) in &self.observers {
            let mut wants = false;
            let mut wants_old_value = false;
            for (observed, options) in &observer.registrations {
                if !self.registration_matches(*observed, options, target) {
                    continue;
                }
                match &record {
                    MutationRecord::ChildList { .. } => wants |= options.child_list,
                    MutationRecord::Attributes { name, .. } => {
                        if options.observes_attribute(name) {
                            wants = true;
                            wants_old_value |= options.attribute_old_value;
                        }
                    }
                }
            }
            if wants {
                deliveries.push((*observer_id, wants_old_value));
            }
        }

        for (observer_id, wants_old_value) in deliveries {
            let delivered = match &record {
                MutationRecord::Attributes { target, name, old_value } if !wants_old_value => MutationRecord::Attributes {
                    target: *target,
                    name: name.clone(),
                    old_value: None,
                },
                _ => record.clone(),
            };
            trace!(observer = %observer_id, target = %target, "queued mutation record");
            if let Some(observer) = self.observers.get_mut(&observer_id) {
                observer.queue.push(delivered);
            }
        }
    }

    fn propagation_path(&self, target: NodeId) -> Vec<ListenerTarget> {
        let mut path = vec![ListenerTarget::Node(target)];
        path.extend(self.ancestors(target).into_iter().map(ListenerTarget::Node));
        if self.is_connected(target) {
            path.push(ListenerTarget::Document);
            path.push(ListenerTarget::Window);
        }
        path
    }

    fn plan_on(&self, target: ListenerTarget, event_type: &str, phase: EventPhase, plan: &mut Vec<DispatchStep>) {
        for (listener, entry) in &self.listeners {
            if entry.target != target || entry.event_type != event_type {
                continue;
            }
            let included = match phase {
                EventPhase::Capturing => entry.options.capture,
                EventPhase::Bubbling => !entry.options.capture,
                EventPhase::AtTarget => true,
            };
            if included {
                plan.push(DispatchStep {
                    listener: *listener,
                    current_target: target,
                    phase,
                });
            }
        }
    }
}

impl Document for MemoryDocument {
    fn document_element(&self) -> NodeId {
        self.root
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|data| data.parent)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node).map(|data| data.children.clone()).unwrap_or_default()
    }

    fn is_connected(&self, node: NodeId) -> bool {
        self.node(node).is_some() && self.is_inclusive_ancestor(self.root, node)
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.node(node)?.attributes.get(name).cloned()
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(data) = self.nodes.get_mut(node.0) else {
            return;
        };
        let old_value = data.attributes.insert(name.to_string(), value.to_string());
        self.record(MutationRecord::Attributes {
            target: node,
            name: name.to_string(),
            old_value,
        });
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        let Some(data) = self.nodes.get_mut(node.0) else {
            return;
        };
        let Some(old_value) = data.attributes.shift_remove(name) else {
            return;
        };
        self.record(MutationRecord::Attributes {
            target: node,
            name: name.to_string(),
            old_value: Some(old_value),
        });
    }

    fn text_content(&self, node: NodeId) -> String {
        let Some(data) = self.node(node) else {
            return String::new();
        };
        let mut text = data.text.clone();
        for child in &data.children {
            text.push_str(&self.text_content(*child));
        }
        text
    }

    fn set_text_content(&mut self, node: NodeId, text: &str) {
        if self.node(node).is_none() {
            return;
        }
        for child in self.children(node) {
            self.remove(child);
        }
        self.nodes[node.0].text = text.to_string();
    }

    fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    fn create_observer(&mut self) -> ObserverId {
        self.next_observer += 1;
        let id = ObserverId(self.next_observer);
        self.observers.insert(id, ObserverState::default());
        id
    }

    fn observe(&mut self, observer: ObserverId, node: NodeId, options: ObserveOptions) {
        if let Some(state) = self.observers.get_mut(&observer) {
            state.registrations.insert(node, options);
        }
    }

    fn disconnect_observer(&mut self, observer: ObserverId) {
        self.observers.shift_remove(&observer);
    }

    fn take_records(&mut self) -> Vec<MutationBatch> {
        self.observers
            .iter_mut()
            .filter(|(_, state)| !state.queue.is_empty())
            .map(|(observer, state)| MutationBatch {
                observer: *observer,
                records: std::mem::take(&mut state.queue),
            })
            .collect()
    }

    fn add_listener(&mut self, target: ListenerTarget, event_type: &str, options: ListenerOptions) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.insert(
            id,
            ListenerEntry {
                target,
                event_type: event_type.to_string(),
                options,
            },
        );
        id
    }

    fn remove_listener(&mut self, listener: ListenerId) {
        self.listeners.shift_remove(&listener);
    }

    fn dispatch_plan(&mut self, target: NodeId, event_type: &str) -> Vec<DispatchStep> {
        let path = self.propagation_path(target);
        let mut plan = Vec::new();

        for current in path.iter().skip(1).rev() {
            self.plan_on(*current, event_type, EventPhase::Capturing, &mut plan);
        }
        self.plan_on(path[0], event_type, EventPhase::AtTarget, &mut plan);
        for current in path.iter().skip(1) {
            self.plan_on(*current, event_type, EventPhase::Bubbling, &mut plan);
        }

        for step in &plan {
            if self.listeners.get(&step.listener).is_some_and(|entry| entry.options.once) {
                self.listeners.shift_remove(&step.listener);
            }
        }
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attribute_records(batches: &[MutationBatch]) -> Vec<(String, Option<String>)> {
        batches
            .iter()
            .flat_map(|batch| batch.records.iter())
            .filter_map(|record| match record {
                MutationRecord::Attributes { name, old_value, .. } => Some((name.clone(), old_value.clone())),
                MutationRecord::ChildList { .. } => None,
            })
            .collect()
    }

    #[test]
    fn subtree_observer_queues_child_list_and_filtered_attributes() {
        let mut document = MemoryDocument::new();
        let observer = document.create_observer();
        document.observe(observer, document.document_element(), ObserveOptions::subtree(["data-controllers"]));

        let nodes = document
            .append_html(document.body(), r#"<div data-controllers="a"><p></p></div>"#)
            .expect("append markup");
        document.set_attribute(nodes[1], "data-controllers", "b");
        document.set_attribute(nodes[1], "data-ignored", "x");

        let batches = document.take_records();
        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0].records[0],
            MutationRecord::ChildList {
                target: document.body(),
                added: vec![nodes[0]],
                removed: vec![],
            }
        );
        assert_eq!(attribute_records(&batches), vec![("data-controllers".to_string(), None)]);
        assert!(document.take_records().is_empty());
    }

    #[test]
    fn attribute_observer_reports_old_values_and_replaces_filters() {
        let mut document = MemoryDocument::new();
        let node = document.create_element("div");
        let observer = document.create_observer();
        document.observe(observer, node, ObserveOptions::attributes(["data-a"]));
        document.observe(observer, node, ObserveOptions::attributes(["data-b"]));

        document.set_attribute(node, "data-a", "1");
        document.set_attribute(node, "data-b", "1");
        document.set_attribute(node, "data-b", "2");
        document.remove_attribute(node, "data-b");

        assert_eq!(
            attribute_records(&document.take_records()),
            vec![
                ("data-b".to_string(), None),
                ("data-b".to_string(), Some("1".to_string())),
                ("data-b".to_string(), Some("2".to_string())),
            ]
        );
    }

    #[test]
    fn removed_subtrees_stay_intact_and_can_be_reinserted() {
        let mut document = MemoryDocument::new();
        let nodes = document
            .append_html(document.body(), "<section><p>hi</p></section>")
            .expect("append markup");

        document.remove(nodes[0]);
        assert!(!document.is_connected(nodes[0]));
        assert!(!document.is_connected(nodes[1]));
        assert_eq!(document.parent(nodes[1]), Some(nodes[0]));

        document.append_child(document.body(), nodes[0]);
        assert!(document.is_connected(nodes[1]));
        assert_eq!(document.text_content(nodes[0]), "hi");
    }

    #[test]
    fn dispatch_plan_orders_capture_target_bubble_and_drops_once() {
        let mut document = MemoryDocument::new();
        let nodes = document
            .append_html(document.body(), "<div><button></button></div>")
            .expect("append markup");
        let (outer, button) = (nodes[0], nodes[1]);

        let bubble = document.add_listener(ListenerTarget::Node(outer), "click", ListenerOptions::default());
        let capture = document.add_listener(
            ListenerTarget::Node(outer),
            "click",
            ListenerOptions {
                capture: true,
                ..ListenerOptions::default()
            },
        );
        let at_target = document.add_listener(
            ListenerTarget::Node(button),
            "click",
            ListenerOptions {
                once: true,
                ..ListenerOptions::default()
            },
        );
        let window = document.add_listener(ListenerTarget::Window, "click", ListenerOptions::default());
        document.add_listener(ListenerTarget::Node(button), "keydown", ListenerOptions::default());

        let order: Vec<_> = document
            .dispatch_plan(button, "click")
            .into_iter()
            .map(|step| step.listener)
            .collect();
        assert_eq!(order, vec![capture, at_target, bubble, window]);

        let second: Vec<_> = document
            .dispatch_plan(button, "click")
            .into_iter()
            .map(|step| step.listener)
            .collect();
        assert_eq!(second, vec![capture, bubble, window]);
    }

    #[test]
    fn set_text_content_replaces_children() {
        let mut document = MemoryDocument::new();
        let nodes = document
            .append_html(document.body(), "<p><span>a</span></p>")
            .expect("append markup");
        document.set_text_content(nodes[0], "b");
        assert_eq!(document.text_content(nodes[0]), "b");
        assert!(document.children(nodes[0]).is_empty());
    }
}
